//! Entity to engine body bookkeeping
//!
//! One [`BodyBinding`] per bound entity. The registry is the only place that
//! knows which body and shape belong to an entity, so it is also the place
//! that tears them down again, always body first.

use std::collections::HashMap;

use super::backend::{BodyHandle, BodyKind, BodyTransform, PhysicsBackend, ShapeHandle};
use super::shape_bake::{ColliderSignature, ShapeBaker};
use crate::ecs::components::ColliderKind;
use crate::ecs::Entity;

/// Engine resources owned on behalf of one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyBinding {
    /// Engine body
    pub body: BodyHandle,
    /// Shape the body currently uses
    pub shape: ShapeHandle,
    /// Collider component the body was built from
    pub collider: ColliderKind,
    /// Collider state the body was built from
    pub signature: ColliderSignature,
    /// Motion type the body was created with
    pub kind: BodyKind,
    /// Last pose exchanged with the engine, in either direction
    pub last_synced: BodyTransform,
}

/// What [`BodyRegistry::release`] tore down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleasedBinding {
    /// The forgotten binding
    pub binding: BodyBinding,
    /// Whether the baker destroyed the binding's shape
    pub shape_destroyed: bool,
}

/// Map from entity to its engine body
#[derive(Debug, Default)]
pub struct BodyRegistry {
    bindings: HashMap<Entity, BodyBinding>,
    shape_owners: HashMap<ShapeHandle, Entity>,
}

impl BodyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound entities
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no entity is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binding of an entity
    pub fn get(&self, entity: Entity) -> Option<&BodyBinding> {
        self.bindings.get(&entity)
    }

    /// Mutable binding of an entity; the shape must only change through [`Self::replace_shape`]
    pub(crate) fn get_mut(&mut self, entity: Entity) -> Option<&mut BodyBinding> {
        self.bindings.get_mut(&entity)
    }

    /// Whether the entity is bound
    pub fn contains(&self, entity: Entity) -> bool {
        self.bindings.contains_key(&entity)
    }

    /// Entity whose body uses `shape`
    pub fn owner_of_shape(&self, shape: ShapeHandle) -> Option<Entity> {
        if shape.is_none() {
            return None;
        }
        self.shape_owners.get(&shape).copied()
    }

    /// Bound entities in ascending order
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.bindings.keys().copied().collect();
        entities.sort_unstable();
        entities
    }

    /// Iterate over all bindings
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &BodyBinding)> {
        self.bindings.iter().map(|(entity, binding)| (*entity, binding))
    }

    /// Record a new binding, returning the one it replaced
    pub(crate) fn bind(&mut self, entity: Entity, binding: BodyBinding) -> Option<BodyBinding> {
        let previous = self.unbind(entity);
        self.shape_owners.insert(binding.shape, entity);
        self.bindings.insert(entity, binding);
        previous
    }

    /// Forget a binding without touching the engine
    pub(crate) fn unbind(&mut self, entity: Entity) -> Option<BodyBinding> {
        let binding = self.bindings.remove(&entity)?;
        if self.shape_owners.get(&binding.shape) == Some(&entity) {
            self.shape_owners.remove(&binding.shape);
        }
        Some(binding)
    }

    /// Point a binding at a new shape, returning the old one
    pub(crate) fn replace_shape(&mut self, entity: Entity, shape: ShapeHandle) -> Option<ShapeHandle> {
        let binding = self.bindings.get_mut(&entity)?;
        let old = std::mem::replace(&mut binding.shape, shape);
        if self.shape_owners.get(&old) == Some(&entity) {
            self.shape_owners.remove(&old);
        }
        self.shape_owners.insert(shape, entity);
        Some(old)
    }

    /// Record the pose last exchanged with the engine
    pub(crate) fn set_last_synced(&mut self, entity: Entity, transform: BodyTransform) {
        if let Some(binding) = self.bindings.get_mut(&entity) {
            binding.last_synced = transform;
        }
    }

    /// Destroy an entity's body, then its shape, and forget the binding
    ///
    /// Returns what was released; calling it again is a no-op.
    pub fn release<B: PhysicsBackend + ?Sized>(
        &mut self,
        entity: Entity,
        baker: &mut ShapeBaker,
        backend: &mut B,
    ) -> Option<ReleasedBinding> {
        let binding = self.unbind(entity)?;
        backend.destroy_body(binding.body);
        let shape_destroyed = baker.release(binding.shape, backend);
        log::debug!("Released {} and {} of entity {entity}", binding.body, binding.shape);
        Some(ReleasedBinding {
            binding,
            shape_destroyed,
        })
    }

    /// Release every binding
    pub fn release_all<B: PhysicsBackend + ?Sized>(&mut self, baker: &mut ShapeBaker, backend: &mut B) -> usize {
        let entities = self.entities();
        for entity in &entities {
            self.release(*entity, baker, backend);
        }
        entities.len()
    }
}
