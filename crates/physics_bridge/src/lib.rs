//! # Physics Bridge
//!
//! Keeps ECS collider and transform components in step with a rigid-body
//! physics engine.
//!
//! ## Features
//!
//! - **Shape baking**: collider data becomes an engine shape once per geometry
//! - **Body lifecycle**: bodies follow components being added, edited and removed
//! - **Transform sync**: ECS pushes static/kinematic poses, engine drives dynamic ones
//! - **Fixed stepping**: frame deltas are turned into whole simulation steps
//! - **Engine agnostic**: any engine implementing [`physics::PhysicsBackend`]
//!
//! ## Quick Start
//!
//! ```rust
//! use physics_bridge::prelude::*;
//!
//! let mut world = World::new();
//! let ball = world.create_entity();
//! world.add_component(ball, TransformComponent::from_position(Vec3::new(0.0, 5.0, 0.0)));
//! world.add_component(ball, SphereColliderComponent::new(1.0));
//! world.add_component(ball, RigidBodyComponent::dynamic());
//!
//! let mut physics = PhysicsSyncSystem::with_reference_backend(PhysicsConfig::default())?;
//! for _ in 0..60 {
//!     physics.run(&mut world, 1.0 / 60.0);
//! }
//!
//! let height = world.get_component::<TransformComponent>(ball).map(|t| t.position.y);
//! assert!(height.is_some_and(|y| y < 5.0));
//! physics.shutdown(&mut world);
//! # Ok::<(), physics_bridge::config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod ecs;
pub mod physics;
pub mod assets;

/// Common imports for bridge users
pub mod prelude {
    pub use crate::{
        assets::{AlphaMode, BlendMode, Material, TextureSlot},
        config::{Config, ConfigError, PhysicsConfig},
        ecs::{
            components::{HeightFieldColliderComponent, RigidBodyComponent, SphereColliderComponent, TransformComponent},
            systems::{PhysicsSyncSystem, SyncReport},
            Component, Entity, System, World,
        },
        foundation::math::{Quat, Vec3},
        physics::{
            BodyHandle, BodyKind, BodyTransform, PhysicsBackend, PhysicsError, PhysicsResult, ReferenceBackend,
            ShapeHandle,
        },
    };
}
