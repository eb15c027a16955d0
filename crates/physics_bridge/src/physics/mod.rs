//! Rigid-body engine side of the bridge
//!
//! [`backend`] defines what the bridge needs from an engine, [`shape_bake`]
//! turns collider data into engine shapes and [`registry`] tracks the body
//! owned for each entity. The ECS-facing driver lives in
//! [`crate::ecs::systems::PhysicsSyncSystem`].

pub mod backend;
pub mod error;
pub mod reference_backend;
pub mod registry;
pub mod shape_bake;

pub use backend::{BodyHandle, BodyKind, BodyTransform, HeightFieldDesc, PhysicsBackend, ShapeHandle};
pub use error::{PhysicsError, PhysicsResult};
pub use reference_backend::{BackendStats, ReferenceBackend, ShapeGeometry};
pub use registry::{BodyBinding, BodyRegistry, ReleasedBinding};
pub use shape_bake::{BakeOutcome, BakeSource, ColliderSignature, ShapeBaker, ShapeSignature};
