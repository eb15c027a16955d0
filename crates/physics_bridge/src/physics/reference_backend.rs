//! In-process reference engine
//!
//! A minimal implementation of [`PhysicsBackend`] backed by slot maps. It
//! keeps real shape and body registries, enforces the engine rules the bridge
//! must respect (bodies released before the shapes they use, capacity limits),
//! and integrates gravity for dynamic bodies. There is no collision detection
//! or response.

use slotmap::SlotMap;

use super::backend::{BodyHandle, BodyKind, BodyTransform, HeightFieldDesc, PhysicsBackend, ShapeHandle};
use super::{PhysicsError, PhysicsResult};
use crate::config::PhysicsConfig;
use crate::foundation::collections::{key_to_raw, raw_to_key};
use crate::foundation::math::{is_finite_vec3, Vec3};

slotmap::new_key_type! {
    struct ShapeKey;
    struct BodyKey;
}

/// Geometry stored for a live shape
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// Sphere in body space
    Sphere {
        /// Radius
        radius: f32,
        /// Body space center
        center: Vec3,
    },
    /// Height-field grid
    HeightField {
        /// Samples along X
        width: u32,
        /// Samples along Z
        height: u32,
        /// Sample spacing along X
        cell_size_x: f32,
        /// Sample spacing along Z
        cell_size_z: f32,
        /// Scaled and offset samples
        samples: Vec<f32>,
    },
}

struct ShapeEntry {
    geometry: ShapeGeometry,
    body_refs: u32,
}

struct BodyEntry {
    shape: ShapeKey,
    transform: BodyTransform,
    kind: BodyKind,
    is_sensor: bool,
    linear_velocity: Vec3,
}

/// Running totals of engine calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Shapes created
    pub shapes_created: u64,
    /// Shapes destroyed
    pub shapes_destroyed: u64,
    /// Bodies created
    pub bodies_created: u64,
    /// Bodies destroyed
    pub bodies_destroyed: u64,
    /// Body shape swaps
    pub shape_swaps: u64,
    /// Explicit body teleports
    pub transforms_set: u64,
    /// Simulation steps
    pub steps: u64,
    /// Shapes destroyed while still referenced by a body (refused)
    pub ordering_violations: u64,
}

/// Reference rigid-body engine
pub struct ReferenceBackend {
    shapes: SlotMap<ShapeKey, ShapeEntry>,
    bodies: SlotMap<BodyKey, BodyEntry>,
    gravity: Vec3,
    max_shapes: Option<usize>,
    max_bodies: Option<usize>,
    stats: BackendStats,
}

impl ReferenceBackend {
    /// Create an engine with standard gravity and no capacity limits
    pub fn new() -> Self {
        Self::from_config(&PhysicsConfig::default())
    }

    /// Create an engine from configuration
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self {
            shapes: SlotMap::with_key(),
            bodies: SlotMap::with_key(),
            gravity: config.gravity_vector(),
            max_shapes: config.max_shapes,
            max_bodies: config.max_bodies,
            stats: BackendStats::default(),
        }
    }

    /// Change the shape capacity (`None` = unlimited)
    pub fn set_max_shapes(&mut self, max_shapes: Option<usize>) {
        self.max_shapes = max_shapes;
    }

    /// Change the body capacity (`None` = unlimited)
    pub fn set_max_bodies(&mut self, max_bodies: Option<usize>) {
        self.max_bodies = max_bodies;
    }

    /// Change gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Running totals of engine calls
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Number of live shapes
    pub fn live_shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of live bodies
    pub fn live_body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the shape is alive
    pub fn contains_shape(&self, shape: ShapeHandle) -> bool {
        self.shape_key(shape).is_some()
    }

    /// Whether the body is alive
    pub fn contains_body(&self, body: BodyHandle) -> bool {
        self.body_key(body).is_some()
    }

    /// Geometry of a live shape
    pub fn shape_geometry(&self, shape: ShapeHandle) -> Option<&ShapeGeometry> {
        let key = self.shape_key(shape)?;
        self.shapes.get(key).map(|entry| &entry.geometry)
    }

    /// Shape used by a live body
    pub fn body_shape(&self, body: BodyHandle) -> Option<ShapeHandle> {
        let entry = self.bodies.get(self.body_key(body)?)?;
        Some(ShapeHandle::from_raw(key_to_raw(entry.shape)))
    }

    /// Motion type of a live body
    pub fn body_kind(&self, body: BodyHandle) -> Option<BodyKind> {
        Some(self.bodies.get(self.body_key(body)?)?.kind)
    }

    /// Sensor flag of a live body
    pub fn body_is_sensor(&self, body: BodyHandle) -> Option<bool> {
        Some(self.bodies.get(self.body_key(body)?)?.is_sensor)
    }

    /// Linear velocity of a live body
    pub fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        Some(self.bodies.get(self.body_key(body)?)?.linear_velocity)
    }

    /// Set the linear velocity of a live dynamic body
    pub fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> PhysicsResult<()> {
        let key = self.body_key(body).ok_or(PhysicsError::UnknownBody(body))?;
        if let Some(entry) = self.bodies.get_mut(key) {
            entry.linear_velocity = velocity;
        }
        Ok(())
    }

    fn shape_key(&self, shape: ShapeHandle) -> Option<ShapeKey> {
        let key: ShapeKey = raw_to_key(shape.raw())?;
        self.shapes.contains_key(key).then_some(key)
    }

    fn body_key(&self, body: BodyHandle) -> Option<BodyKey> {
        let key: BodyKey = raw_to_key(body.raw())?;
        self.bodies.contains_key(key).then_some(key)
    }

    fn insert_shape(&mut self, geometry: ShapeGeometry) -> PhysicsResult<ShapeHandle> {
        if let Some(max) = self.max_shapes {
            if self.shapes.len() >= max {
                return Err(PhysicsError::EngineAllocationFailure(format!(
                    "shape capacity of {max} reached"
                )));
            }
        }
        let key = self.shapes.insert(ShapeEntry {
            geometry,
            body_refs: 0,
        });
        self.stats.shapes_created += 1;
        Ok(ShapeHandle::from_raw(key_to_raw(key)))
    }
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for ReferenceBackend {
    fn create_sphere_shape(&mut self, radius: f32, center: Vec3) -> PhysicsResult<ShapeHandle> {
        if !radius.is_finite() || radius <= 0.0 || !is_finite_vec3(&center) {
            return Err(PhysicsError::GeometryInvalid(format!(
                "sphere radius {radius} / center {center:?} rejected"
            )));
        }
        self.insert_shape(ShapeGeometry::Sphere { radius, center })
    }

    fn create_height_field_shape(&mut self, desc: &HeightFieldDesc<'_>) -> PhysicsResult<ShapeHandle> {
        desc.validate()?;
        let samples = desc
            .samples
            .iter()
            .map(|h| h * desc.height_scale + desc.height_offset)
            .collect();
        self.insert_shape(ShapeGeometry::HeightField {
            width: desc.width,
            height: desc.height,
            cell_size_x: desc.cell_size_x,
            cell_size_z: desc.cell_size_z,
            samples,
        })
    }

    fn destroy_shape(&mut self, shape: ShapeHandle) {
        let Some(key) = self.shape_key(shape) else {
            return;
        };
        let refs = self.shapes.get(key).map_or(0, |entry| entry.body_refs);
        if refs > 0 {
            log::error!("Refusing to destroy {shape}: still used by {refs} bodies");
            self.stats.ordering_violations += 1;
            return;
        }
        self.shapes.remove(key);
        self.stats.shapes_destroyed += 1;
    }

    fn create_body(
        &mut self,
        shape: ShapeHandle,
        transform: &BodyTransform,
        kind: BodyKind,
        is_sensor: bool,
    ) -> PhysicsResult<BodyHandle> {
        let shape_key = self.shape_key(shape).ok_or(PhysicsError::UnknownShape(shape))?;
        if let Some(max) = self.max_bodies {
            if self.bodies.len() >= max {
                return Err(PhysicsError::EngineAllocationFailure(format!(
                    "body capacity of {max} reached"
                )));
            }
        }

        let key = self.bodies.insert(BodyEntry {
            shape: shape_key,
            transform: *transform,
            kind,
            is_sensor,
            linear_velocity: Vec3::zeros(),
        });
        if let Some(entry) = self.shapes.get_mut(shape_key) {
            entry.body_refs += 1;
        }
        self.stats.bodies_created += 1;
        Ok(BodyHandle::from_raw(key_to_raw(key)))
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        let Some(key) = self.body_key(body) else {
            return;
        };
        if let Some(entry) = self.bodies.remove(key) {
            if let Some(shape) = self.shapes.get_mut(entry.shape) {
                shape.body_refs = shape.body_refs.saturating_sub(1);
            }
            self.stats.bodies_destroyed += 1;
        }
    }

    fn set_body_shape(&mut self, body: BodyHandle, shape: ShapeHandle) -> PhysicsResult<()> {
        let body_key = self.body_key(body).ok_or(PhysicsError::UnknownBody(body))?;
        let shape_key = self.shape_key(shape).ok_or(PhysicsError::UnknownShape(shape))?;

        let previous = match self.bodies.get_mut(body_key) {
            Some(entry) => std::mem::replace(&mut entry.shape, shape_key),
            None => return Err(PhysicsError::UnknownBody(body)),
        };
        if previous != shape_key {
            if let Some(old) = self.shapes.get_mut(previous) {
                old.body_refs = old.body_refs.saturating_sub(1);
            }
            if let Some(new) = self.shapes.get_mut(shape_key) {
                new.body_refs += 1;
            }
        }
        self.stats.shape_swaps += 1;
        Ok(())
    }

    fn set_body_transform(&mut self, body: BodyHandle, transform: &BodyTransform) {
        let Some(key) = self.body_key(body) else {
            return;
        };
        if let Some(entry) = self.bodies.get_mut(key) {
            entry.transform = *transform;
            self.stats.transforms_set += 1;
        }
    }

    fn body_transform(&self, body: BodyHandle) -> Option<BodyTransform> {
        Some(self.bodies.get(self.body_key(body)?)?.transform)
    }

    fn step_simulation(&mut self, delta_time: f32) {
        if !delta_time.is_finite() || delta_time <= 0.0 {
            return;
        }
        for entry in self.bodies.values_mut() {
            if entry.kind.is_simulated() {
                // Semi-implicit Euler
                entry.linear_velocity += self.gravity * delta_time;
                entry.transform.position += entry.linear_velocity * delta_time;
            }
        }
        self.stats.steps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    fn sphere(backend: &mut ReferenceBackend) -> ShapeHandle {
        backend.create_sphere_shape(1.0, Vec3::zeros()).unwrap()
    }

    #[test]
    fn test_handles_are_non_zero_and_distinct() {
        let mut backend = ReferenceBackend::new();
        let a = sphere(&mut backend);
        let b = sphere(&mut backend);

        assert!(a.is_some());
        assert!(b.is_some());
        assert_ne!(a, b);
        assert_eq!(backend.live_shape_count(), 2);
    }

    #[test]
    fn test_rejects_bad_sphere() {
        let mut backend = ReferenceBackend::new();
        assert!(matches!(
            backend.create_sphere_shape(0.0, Vec3::zeros()),
            Err(PhysicsError::GeometryInvalid(_))
        ));
        assert_eq!(backend.stats().shapes_created, 0);
    }

    #[test]
    fn test_height_field_applies_scale_and_offset() {
        let mut backend = ReferenceBackend::new();
        let samples = [0.0, 1.0, 1.0, 2.0];
        let shape = backend
            .create_height_field_shape(&HeightFieldDesc {
                width: 2,
                height: 2,
                cell_size_x: 1.0,
                cell_size_z: 1.0,
                height_scale: 2.0,
                height_offset: 1.0,
                samples: &samples,
            })
            .unwrap();

        match backend.shape_geometry(shape) {
            Some(ShapeGeometry::HeightField { samples, .. }) => {
                assert_eq!(samples, &vec![1.0, 3.0, 3.0, 5.0]);
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_shape_in_use_cannot_be_destroyed() {
        let mut backend = ReferenceBackend::new();
        let shape = sphere(&mut backend);
        let body = backend
            .create_body(shape, &BodyTransform::default(), BodyKind::Static, false)
            .unwrap();

        backend.destroy_shape(shape);
        assert!(backend.contains_shape(shape));
        assert_eq!(backend.stats().ordering_violations, 1);

        backend.destroy_body(body);
        backend.destroy_shape(shape);
        assert!(!backend.contains_shape(shape));
        assert_eq!(backend.stats().shapes_destroyed, 1);
    }

    #[test]
    fn test_double_destroy_is_noop() {
        let mut backend = ReferenceBackend::new();
        let shape = sphere(&mut backend);
        let body = backend
            .create_body(shape, &BodyTransform::default(), BodyKind::Static, false)
            .unwrap();

        backend.destroy_body(body);
        backend.destroy_body(body);
        backend.destroy_body(BodyHandle::NONE);
        backend.destroy_shape(shape);
        backend.destroy_shape(shape);
        backend.destroy_shape(ShapeHandle::NONE);

        let stats = backend.stats();
        assert_eq!(stats.bodies_destroyed, 1);
        assert_eq!(stats.shapes_destroyed, 1);
        assert_eq!(stats.ordering_violations, 0);
    }

    #[test]
    fn test_capacity_limits() {
        let mut backend = ReferenceBackend::new();
        backend.set_max_shapes(Some(1));
        backend.set_max_bodies(Some(0));

        let shape = sphere(&mut backend);
        assert!(matches!(
            backend.create_sphere_shape(1.0, Vec3::zeros()),
            Err(PhysicsError::EngineAllocationFailure(_))
        ));
        assert!(matches!(
            backend.create_body(shape, &BodyTransform::default(), BodyKind::Static, false),
            Err(PhysicsError::EngineAllocationFailure(_))
        ));
    }

    #[test]
    fn test_dynamic_body_falls_static_does_not() {
        let mut backend = ReferenceBackend::new();
        backend.set_gravity(Vec3::new(0.0, -10.0, 0.0));
        let shape = sphere(&mut backend);
        let start = BodyTransform::new(Vec3::new(0.0, 5.0, 0.0), Quat::identity());
        let falling = backend.create_body(shape, &start, BodyKind::Dynamic, false).unwrap();
        let fixed = backend.create_body(shape, &start, BodyKind::Static, false).unwrap();

        backend.step_simulation(0.5);

        // v = -5, y = 5 - 2.5
        assert_relative_eq!(backend.body_transform(falling).unwrap().position.y, 2.5);
        assert_relative_eq!(backend.body_transform(fixed).unwrap().position.y, 5.0);
    }

    #[test]
    fn test_shape_swap_keeps_pose_and_velocity() {
        let mut backend = ReferenceBackend::new();
        let old = sphere(&mut backend);
        let new = backend.create_sphere_shape(2.0, Vec3::zeros()).unwrap();
        let start = BodyTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::identity());
        let body = backend.create_body(old, &start, BodyKind::Dynamic, false).unwrap();
        backend.set_linear_velocity(body, Vec3::new(0.0, 4.0, 0.0)).unwrap();

        backend.set_body_shape(body, new).unwrap();
        backend.destroy_shape(old);

        assert_eq!(backend.body_shape(body), Some(new));
        assert_eq!(backend.body_transform(body), Some(start));
        assert_eq!(backend.linear_velocity(body), Some(Vec3::new(0.0, 4.0, 0.0)));
        assert_eq!(backend.stats().ordering_violations, 0);
        assert!(!backend.contains_shape(old));
    }
}
