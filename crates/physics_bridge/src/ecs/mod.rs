//! Entity-Component-System implementation
//!
//! A small generational ECS holding the components the physics bridge reads
//! and writes.

pub mod world;
pub mod entity;
pub mod component;
pub mod system;
pub mod storage;
pub mod components;
pub mod systems;

#[cfg(test)]
mod tests;

pub use world::World;
pub use entity::Entity;
pub use component::Component;
pub use system::System;
pub use storage::ComponentStorage;
