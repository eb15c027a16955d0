//! Rigid body component
//!
//! Selects how a sphere collider's body moves. Height-fields ignore it and are
//! always static terrain.

use crate::ecs::Component;
use crate::physics::BodyKind;

/// Body type input for the physics sync system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigidBodyComponent {
    /// Motion type of the engine body
    pub kind: BodyKind,
}

impl Component for RigidBodyComponent {}

impl RigidBodyComponent {
    /// Immovable body
    pub fn fixed() -> Self {
        Self { kind: BodyKind::Static }
    }

    /// Body moved by gameplay through its transform
    pub fn kinematic() -> Self {
        Self { kind: BodyKind::Kinematic }
    }

    /// Body moved by the simulation
    pub fn dynamic() -> Self {
        Self { kind: BodyKind::Dynamic }
    }
}
