//! ECS World implementation

use super::storage::{ComponentStorage, ErasedStorage};
use super::{Component, Entity};
use std::any::TypeId;
use std::collections::HashMap;

/// ECS World containing all entities and components
pub struct World {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_ids: Vec<u32>,
    live_count: usize,
    component_storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_ids: Vec::new(),
            live_count: 0,
            component_storages: HashMap::new(),
        }
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        let id = if let Some(id) = self.free_ids.pop() {
            self.alive[id as usize] = true;
            id
        } else {
            let id = u32::try_from(self.generations.len()).unwrap_or(u32::MAX);
            self.generations.push(0);
            self.alive.push(true);
            id
        };
        self.live_count += 1;
        Entity::new(id, self.generations[id as usize])
    }

    /// Destroy an entity and all of its components
    ///
    /// Returns false if the entity was already dead.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        for storage in self.component_storages.values_mut() {
            storage.remove_entity(entity);
        }

        let index = entity.id() as usize;
        self.alive[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_ids.push(entity.id());
        self.live_count -= 1;
        true
    }

    /// Whether the entity exists and has not been destroyed
    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.id() as usize;
        index < self.alive.len()
            && self.alive[index]
            && self.generations[index] == entity.generation()
    }

    /// Add a component to an entity, returning the component it replaced
    ///
    /// Components added to dead entities are dropped.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Option<T> {
        if !self.is_alive(entity) {
            log::warn!(
                "Ignoring {} added to dead entity {}",
                std::any::type_name::<T>(),
                entity
            );
            return None;
        }
        self.storage_mut_or_insert::<T>().insert(entity, component)
    }

    /// Remove a component from an entity
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.storage_mut::<T>()?.remove(entity)
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity)
    }

    /// Whether the entity has a component of type `T`
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|storage| storage.contains(entity))
    }

    /// All entities carrying a component of type `T`
    pub fn query<T: Component>(&self) -> Vec<(Entity, &T)> {
        self.storage::<T>()
            .map(|storage| storage.iter().collect())
            .unwrap_or_default()
    }

    /// All entities carrying a component of type `T`, mutably
    pub fn query_mut<T: Component>(&mut self) -> Vec<(Entity, &mut T)> {
        self.storage_mut::<T>()
            .map(|storage| storage.iter_mut().collect())
            .unwrap_or_default()
    }

    /// Get an iterator over all live entities
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| Entity::new(index as u32, self.generations[index]))
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.live_count
    }

    /// Typed storage for `T`, if any component of that type was ever added
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.component_storages
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        self.component_storages
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
    }

    fn storage_mut_or_insert<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let storage = self
            .component_storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStorage::<T>::new()));
        match storage.as_any_mut().downcast_mut::<ComponentStorage<T>>() {
            Some(typed) => typed,
            None => unreachable!("component storage registered under a foreign TypeId"),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
