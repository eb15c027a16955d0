//! Entity implementation

use std::fmt;

/// Entity identifier
///
/// The generation distinguishes a destroyed entity from a later entity that
/// reuses the same slot, so stale identifiers never alias live ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: u32,
    generation: u32,
}

impl Entity {
    /// Create a new entity with the given ID and generation
    pub(super) fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    /// Get the entity ID (slot index)
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the slot generation
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation)
    }
}
