//! ECS Components module
//!
//! Pure data components read and written by the physics sync system.

pub mod transform;
pub mod collider;
pub mod rigid_body;

pub use transform::TransformComponent;
pub use collider::{
    ColliderKind, HeightFieldColliderComponent, SphereColliderComponent, DEFAULT_SPHERE_RADIUS,
};
pub use rigid_body::RigidBodyComponent;
