//! ECS Systems module

pub mod physics_sync;

pub use physics_sync::{PhysicsSyncSystem, SyncReport};
