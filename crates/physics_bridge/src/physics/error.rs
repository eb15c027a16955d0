//! Physics bridge error types

use thiserror::Error;

use super::{BodyHandle, ShapeHandle};

/// Failures reported across the ECS/engine boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Collider data cannot describe a shape (bad dimensions, sample count, radius)
    #[error("Invalid collider geometry: {0}")]
    GeometryInvalid(String),

    /// The engine refused to allocate a shape or body
    #[error("Engine allocation failed: {0}")]
    EngineAllocationFailure(String),

    /// A body handle that the engine does not know
    #[error("Unknown body handle: {0}")]
    UnknownBody(BodyHandle),

    /// A shape handle that the engine does not know
    #[error("Unknown shape handle: {0}")]
    UnknownShape(ShapeHandle),
}

impl PhysicsError {
    /// Whether retrying next tick may succeed without the collider changing
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EngineAllocationFailure(_))
    }
}

/// Physics result type
pub type PhysicsResult<T> = Result<T, PhysicsError>;
