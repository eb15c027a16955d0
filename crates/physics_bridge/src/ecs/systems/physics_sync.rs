//! ECS physics sync system
//!
//! Drives the engine from the ECS once per frame:
//! 1. Structural pass: release bindings of entities that lost their transform
//!    or collider, bake colliders, create missing bodies and push the
//!    transforms of static and kinematic bodies.
//! 2. Step the engine a whole number of fixed steps.
//! 3. Pull the pose of every dynamic body back into its `TransformComponent`.
//!
//! A dynamic body's pose belongs to the engine: ECS edits to its transform
//! are overwritten by the next pull.
//!
//! A collider's `shape_handle` is either [`ShapeHandle::NONE`] or a live engine
//! shape once a pass returns. Handles of shapes destroyed during the pass are
//! reset on the component that still carries them.

use std::collections::HashSet;

use crate::config::{ConfigError, PhysicsConfig};
use crate::ecs::components::{
    HeightFieldColliderComponent, RigidBodyComponent, SphereColliderComponent, TransformComponent,
};
use crate::ecs::{Entity, System, World};
use crate::foundation::time::FixedStepAccumulator;
use crate::physics::{
    BakeOutcome, BakeSource, BodyBinding, BodyHandle, BodyKind, BodyRegistry, BodyTransform,
    PhysicsBackend, PhysicsError, PhysicsResult, ReferenceBackend, ShapeBaker, ShapeHandle,
};

/// Poses closer than this are not pushed to the engine again
const TRANSFORM_EPSILON: f32 = 1.0e-6;

/// What one sync tick changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Bodies created for newly bound entities
    pub bodies_created: usize,
    /// Bodies destroyed together with their binding
    pub bodies_destroyed: usize,
    /// Bodies recreated after a sensor, kind or collider change
    pub bodies_rebuilt: usize,
    /// Shapes created by the baker
    pub shapes_baked: usize,
    /// Shapes destroyed by the baker
    pub shapes_released: usize,
    /// ECS transforms written to the engine
    pub transforms_pushed: usize,
    /// Engine transforms written to the ECS
    pub transforms_pulled: usize,
    /// Fixed simulation steps taken
    pub steps: u32,
    /// Entities that could not be synced this tick
    pub failures: Vec<(Entity, PhysicsError)>,
}

impl SyncReport {
    /// Whether the tick created, destroyed or rebuilt anything
    pub fn has_structural_changes(&self) -> bool {
        self.bodies_created + self.bodies_destroyed + self.bodies_rebuilt + self.shapes_baked + self.shapes_released
            > 0
    }
}

/// Keeps engine bodies in step with ECS colliders and transforms
///
/// All access goes through `&mut self`, so the system needs no lock of its
/// own. It is `Send` whenever its backend is.
pub struct PhysicsSyncSystem<B: PhysicsBackend = ReferenceBackend> {
    backend: B,
    baker: ShapeBaker,
    registry: BodyRegistry,
    stepper: FixedStepAccumulator,
    config: PhysicsConfig,
    dual_collider_warned: HashSet<Entity>,
    released_shapes: Vec<(Entity, ShapeHandle)>,
    last_report: SyncReport,
}

impl PhysicsSyncSystem<ReferenceBackend> {
    /// Create a system driving a [`ReferenceBackend`] built from `config`
    pub fn with_reference_backend(config: PhysicsConfig) -> Result<Self, ConfigError> {
        let backend = ReferenceBackend::from_config(&config);
        Self::new(backend, config)
    }
}

impl<B: PhysicsBackend> PhysicsSyncSystem<B> {
    /// Create a system driving `backend`
    pub fn new(backend: B, config: PhysicsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "Physics sync: {:.4}s fixed step, up to {} steps per frame",
            config.fixed_timestep,
            config.max_substeps
        );
        Ok(Self {
            backend,
            baker: ShapeBaker::new(),
            registry: BodyRegistry::new(),
            stepper: FixedStepAccumulator::new(config.fixed_timestep, config.max_substeps),
            config,
            dual_collider_warned: HashSet::new(),
            released_shapes: Vec::new(),
            last_report: SyncReport::default(),
        })
    }

    /// Engine this system drives
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the engine, e.g. to set velocities
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Entity to body bindings
    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    /// Shape baker
    pub fn baker(&self) -> &ShapeBaker {
        &self.baker
    }

    /// Active configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Report of the last [`System::run`]
    pub fn last_report(&self) -> &SyncReport {
        &self.last_report
    }

    /// Body bound to an entity
    pub fn body_of(&self, entity: Entity) -> Option<BodyHandle> {
        self.registry.get(entity).map(|binding| binding.body)
    }

    /// Run one full tick: structural pass, engine step, pull
    pub fn run_tick(&mut self, world: &mut World, delta_time: f32) -> SyncReport {
        let mut report = SyncReport::default();

        // Step 1: bodies follow the ECS
        self.sync_structure(world, &mut report);

        // Step 2: advance the engine
        report.steps = self.step(delta_time);

        // Step 3: the ECS follows dynamic bodies
        self.pull_transforms(world, &mut report);

        if report.has_structural_changes() {
            log::debug!(
                "Physics sync: +{} -{} ~{} bodies, +{} -{} shapes, {} failures",
                report.bodies_created,
                report.bodies_destroyed,
                report.bodies_rebuilt,
                report.shapes_baked,
                report.shapes_released,
                report.failures.len()
            );
        }
        report
    }

    /// Run only the structural pass, without stepping the engine
    pub fn sync(&mut self, world: &mut World) -> SyncReport {
        let mut report = SyncReport::default();
        self.sync_structure(world, &mut report);
        report
    }

    /// Eagerly release an entity's body and shape
    ///
    /// The entity's collider forgets the released shape. Returns `false` when
    /// the entity had no body.
    pub fn release_entity(&mut self, world: &mut World, entity: Entity) -> bool {
        let mut report = SyncReport::default();
        self.release_binding(entity, &mut report);
        self.forget_released_shapes(world);
        report.bodies_destroyed > 0
    }

    /// Release every body and every shape the system still owns
    ///
    /// Colliders in `world` that carry one of those shapes are reset to
    /// [`ShapeHandle::NONE`].
    pub fn shutdown(&mut self, world: &mut World) {
        for (_, sphere) in world.query_mut::<SphereColliderComponent>() {
            if self.baker.owns(sphere.shape_handle) {
                sphere.shape_handle = ShapeHandle::NONE;
            }
        }
        for (_, field) in world.query_mut::<HeightFieldColliderComponent>() {
            if self.baker.owns(field.shape_handle) {
                field.shape_handle = ShapeHandle::NONE;
            }
        }

        let bodies = self.registry.release_all(&mut self.baker, &mut self.backend);
        let shapes = self.baker.release_all(&mut self.backend);
        self.dual_collider_warned.clear();
        self.released_shapes.clear();
        self.stepper.reset();
        log::info!("Physics sync shut down: released {bodies} bodies and {shapes} unbound shapes");
    }

    fn sync_structure(&mut self, world: &mut World, report: &mut SyncReport) {
        for entity in self.registry.entities() {
            if !Self::is_bindable(world, entity) {
                self.release_binding(entity, report);
            }
        }

        for entity in Self::candidates(world) {
            if let Err(err) = self.sync_entity(world, entity, report) {
                if !matches!(err, PhysicsError::GeometryInvalid(_)) {
                    log::warn!("Physics sync of entity {entity} failed, retrying next tick: {err}");
                }
                report.failures.push((entity, err));
            }
        }

        self.forget_released_shapes(world);
    }

    /// Reset collider handles that still point at shapes released this pass
    fn forget_released_shapes(&mut self, world: &mut World) {
        for (entity, shape) in self.released_shapes.drain(..) {
            if let Some(sphere) = world.get_component_mut::<SphereColliderComponent>(entity) {
                if sphere.shape_handle == shape {
                    sphere.shape_handle = ShapeHandle::NONE;
                }
            }
            if let Some(field) = world.get_component_mut::<HeightFieldColliderComponent>(entity) {
                if field.shape_handle == shape {
                    field.shape_handle = ShapeHandle::NONE;
                }
            }
        }
    }

    /// Destroy a baker-owned shape on behalf of an entity
    fn release_shape(&mut self, entity: Entity, shape: ShapeHandle, report: &mut SyncReport) -> bool {
        if !self.baker.release(shape, &mut self.backend) {
            return false;
        }
        self.released_shapes.push((entity, shape));
        report.shapes_released += 1;
        true
    }

    fn step(&mut self, delta_time: f32) -> u32 {
        let steps = self.stepper.advance(delta_time);
        let fixed_timestep = self.stepper.fixed_timestep();
        for _ in 0..steps {
            self.backend.step_simulation(fixed_timestep);
        }
        steps
    }

    fn pull_transforms(&mut self, world: &mut World, report: &mut SyncReport) {
        let simulated: Vec<(Entity, BodyHandle)> = self
            .registry
            .iter()
            .filter(|(_, binding)| binding.kind.is_simulated())
            .map(|(entity, binding)| (entity, binding.body))
            .collect();

        for (entity, body) in simulated {
            let Some(pose) = self.backend.body_transform(body) else {
                log::warn!("Engine has no {body} for entity {entity}");
                continue;
            };
            let Some(transform) = world.get_component_mut::<TransformComponent>(entity) else {
                continue;
            };
            // compared against the ECS, so gameplay edits to a resting body are undone too
            if pose.approx_eq(&BodyTransform::from_component(transform), TRANSFORM_EPSILON) {
                continue;
            }
            pose.write_to(transform);
            self.registry.set_last_synced(entity, pose);
            report.transforms_pulled += 1;
        }
    }

    fn is_bindable(world: &World, entity: Entity) -> bool {
        world.is_alive(entity)
            && world.has_component::<TransformComponent>(entity)
            && (world.has_component::<SphereColliderComponent>(entity)
                || world.has_component::<HeightFieldColliderComponent>(entity))
    }

    fn candidates(world: &World) -> Vec<Entity> {
        let mut entities: Vec<Entity> = world
            .query::<SphereColliderComponent>()
            .into_iter()
            .map(|(entity, _)| entity)
            .chain(world.query::<HeightFieldColliderComponent>().into_iter().map(|(entity, _)| entity))
            .filter(|entity| world.has_component::<TransformComponent>(*entity))
            .collect();
        entities.sort_unstable();
        entities.dedup();
        entities
    }

    fn release_binding(&mut self, entity: Entity, report: &mut SyncReport) {
        if let Some(released) = self.registry.release(entity, &mut self.baker, &mut self.backend) {
            report.bodies_destroyed += 1;
            if released.shape_destroyed {
                self.released_shapes.push((entity, released.binding.shape));
                report.shapes_released += 1;
            }
        }
        self.dual_collider_warned.remove(&entity);
    }

    fn sync_entity(&mut self, world: &mut World, entity: Entity, report: &mut SyncReport) -> PhysicsResult<()> {
        let Some(pose) = world.get_component::<TransformComponent>(entity).map(BodyTransform::from_component) else {
            return Ok(());
        };
        let requested = world.get_component::<RigidBodyComponent>(entity).map(|body| body.kind);

        if world.has_component::<HeightFieldColliderComponent>(entity) {
            if world.has_component::<SphereColliderComponent>(entity) && self.dual_collider_warned.insert(entity) {
                log::warn!("Entity {entity} has both sphere and height-field colliders, using the height-field");
            }
            let Some(collider) = world.get_component_mut::<HeightFieldColliderComponent>(entity) else {
                return Ok(());
            };
            return self.sync_collider(entity, collider, BodyKind::Static, pose, report);
        }

        let kind = requested.unwrap_or(self.config.default_sphere_body);
        let Some(collider) = world.get_component_mut::<SphereColliderComponent>(entity) else {
            return Ok(());
        };
        self.sync_collider(entity, collider, kind, pose, report)
    }

    fn sync_collider<C: BakeSource>(
        &mut self,
        entity: Entity,
        collider: &mut C,
        kind: BodyKind,
        pose: BodyTransform,
        report: &mut SyncReport,
    ) -> PhysicsResult<()> {
        // a shape bound to another entity's body is never shared
        let handle = collider.shape_handle();
        if self.registry.owner_of_shape(handle).is_some_and(|owner| owner != entity) {
            collider.set_shape_handle(ShapeHandle::NONE);
        }

        match self.registry.get(entity).copied() {
            None => self.bind(entity, collider, kind, pose, report),
            Some(binding) => self.update_binding(entity, binding, collider, kind, pose, report),
        }
    }

    fn bind<C: BakeSource>(
        &mut self,
        entity: Entity,
        collider: &mut C,
        kind: BodyKind,
        pose: BodyTransform,
        report: &mut SyncReport,
    ) -> PhysicsResult<()> {
        let fresh = !self.baker.is_current(collider);
        if fresh && self.baker.owns(collider.shape_handle()) {
            report.shapes_released += 1;
        }
        let shape = self.baker.bake_or_reuse(collider, &mut self.backend)?;
        if fresh {
            report.shapes_baked += 1;
        }

        match self.backend.create_body(shape, &pose, kind, collider.is_sensor()) {
            Ok(body) => {
                self.registry.bind(
                    entity,
                    BodyBinding {
                        body,
                        shape,
                        collider: C::KIND,
                        signature: collider.collider_signature(),
                        kind,
                        last_synced: pose,
                    },
                );
                report.bodies_created += 1;
                log::debug!("Bound entity {entity} to {body} ({:?} {kind:?})", C::KIND);
                Ok(())
            }
            Err(err) => {
                if fresh && self.baker.release(shape, &mut self.backend) {
                    collider.set_shape_handle(ShapeHandle::NONE);
                    report.shapes_released += 1;
                }
                Err(err)
            }
        }
    }

    fn update_binding<C: BakeSource>(
        &mut self,
        entity: Entity,
        binding: BodyBinding,
        collider: &mut C,
        kind: BodyKind,
        pose: BodyTransform,
        report: &mut SyncReport,
    ) -> PhysicsResult<()> {
        let geometry_current =
            binding.collider == C::KIND && collider.shape_handle() == binding.shape && self.baker.is_current(collider);
        if !geometry_current {
            self.rebake(entity, &binding, collider, report)?;
        }

        let Some(binding) = self.registry.get(entity).copied() else {
            return Ok(());
        };
        if binding.collider != C::KIND || binding.kind != kind || binding.signature.is_sensor != collider.is_sensor() {
            return self.rebuild(entity, binding, collider, kind, pose, report);
        }

        if !kind.is_simulated() && !pose.approx_eq(&binding.last_synced, TRANSFORM_EPSILON) {
            self.backend.set_body_transform(binding.body, &pose);
            self.registry.set_last_synced(entity, pose);
            report.transforms_pushed += 1;
        }
        Ok(())
    }

    /// Move a bound body onto a shape matching the collider's geometry
    fn rebake<C: BakeSource>(
        &mut self,
        entity: Entity,
        binding: &BodyBinding,
        collider: &mut C,
        report: &mut SyncReport,
    ) -> PhysicsResult<()> {
        let outcome = match self.baker.bake_replacement(collider, &mut self.backend) {
            Ok(outcome) => outcome,
            Err(err) => {
                // invalid geometry must not leave a body behind
                if !err.is_transient() {
                    self.release_binding(entity, report);
                }
                return Err(err);
            }
        };

        let shape = outcome.handle();
        if shape != binding.shape {
            if let Err(err) = self.backend.set_body_shape(binding.body, shape) {
                self.release_binding(entity, report);
                if matches!(outcome, BakeOutcome::Baked { .. }) && self.release_shape(entity, shape, report) {
                    collider.set_shape_handle(ShapeHandle::NONE);
                }
                return Err(err);
            }
            self.registry.replace_shape(entity, shape);
            // the old shape may still sit on the entity's other collider
            self.release_shape(entity, binding.shape, report);
        }

        if let BakeOutcome::Baked { previous, .. } = outcome {
            report.shapes_baked += 1;
            if previous != binding.shape && self.registry.owner_of_shape(previous).is_none() {
                self.release_shape(entity, previous, report);
            }
        }

        if let Some(bound) = self.registry.get_mut(entity) {
            bound.signature.geometry = collider.geometry_signature();
        }
        log::debug!("Rebaked {:?} collider of entity {entity}: {} -> {shape}", C::KIND, binding.shape);
        Ok(())
    }

    /// Recreate a body whose creation-time parameters changed
    fn rebuild<C: BakeSource>(
        &mut self,
        entity: Entity,
        binding: BodyBinding,
        collider: &mut C,
        kind: BodyKind,
        pose: BodyTransform,
        report: &mut SyncReport,
    ) -> PhysicsResult<()> {
        self.backend.destroy_body(binding.body);

        match self.backend.create_body(binding.shape, &pose, kind, collider.is_sensor()) {
            Ok(body) => {
                if let Some(bound) = self.registry.get_mut(entity) {
                    bound.body = body;
                    bound.kind = kind;
                    bound.collider = C::KIND;
                    bound.signature = collider.collider_signature();
                    bound.last_synced = pose;
                }
                report.bodies_rebuilt += 1;
                log::debug!("Rebuilt entity {entity} as {body} ({:?} {kind:?})", C::KIND);
                Ok(())
            }
            Err(err) => {
                if let Some(old) = self.registry.unbind(entity) {
                    report.bodies_destroyed += 1;
                    self.release_shape(entity, old.shape, report);
                }
                collider.set_shape_handle(ShapeHandle::NONE);
                Err(err)
            }
        }
    }
}

impl<B: PhysicsBackend> System for PhysicsSyncSystem<B> {
    fn run(&mut self, world: &mut World, delta_time: f32) {
        self.last_report = self.run_tick(world, delta_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn system() -> PhysicsSyncSystem {
        PhysicsSyncSystem::with_reference_backend(PhysicsConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PhysicsConfig {
            max_substeps: 0,
            ..PhysicsConfig::default()
        };
        assert!(PhysicsSyncSystem::with_reference_backend(config).is_err());
    }

    #[test]
    fn test_system_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<PhysicsSyncSystem>();
    }

    #[test]
    fn test_candidates_need_transform() {
        let mut world = World::new();
        let with_transform = world.create_entity();
        world.add_component(with_transform, TransformComponent::identity());
        world.add_component(with_transform, SphereColliderComponent::new(1.0));
        let without_transform = world.create_entity();
        world.add_component(without_transform, SphereColliderComponent::new(1.0));

        let candidates = PhysicsSyncSystem::<ReferenceBackend>::candidates(&world);

        assert_eq!(candidates, vec![with_transform]);
    }

    #[test]
    fn test_dual_collider_entity_listed_once() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, TransformComponent::identity());
        world.add_component(entity, SphereColliderComponent::new(1.0));
        world.add_component(entity, HeightFieldColliderComponent::new(1, 1, vec![0.0]));

        assert_eq!(PhysicsSyncSystem::<ReferenceBackend>::candidates(&world), vec![entity]);
    }

    #[test]
    fn test_sync_does_not_step() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, TransformComponent::from_position(Vec3::new(0.0, 5.0, 0.0)));
        world.add_component(entity, SphereColliderComponent::new(1.0));
        world.add_component(entity, RigidBodyComponent::dynamic());
        let mut system = system();

        let report = system.sync(&mut world);

        assert_eq!(report.bodies_created, 1);
        assert_eq!(report.steps, 0);
        assert_eq!(system.backend().stats().steps, 0);
    }

    #[test]
    fn test_run_stores_last_report() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, TransformComponent::identity());
        world.add_component(entity, SphereColliderComponent::new(1.0));
        let mut system = system();

        system.run(&mut world, 1.0 / 60.0);

        assert_eq!(system.last_report().bodies_created, 1);
        assert!(system.body_of(entity).is_some());
    }
}
