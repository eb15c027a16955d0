//! System trait

/// System trait for processing entities and components
pub trait System {
    /// Run the system for one frame
    fn run(&mut self, world: &mut crate::ecs::World, delta_time: f32);
}
