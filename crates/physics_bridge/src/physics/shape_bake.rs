//! Shape bake layer
//!
//! Turns collider component data into engine shapes. A shape is built at
//! most once per geometry signature: as long as the component's geometry
//! hashes to the signature recorded when its current handle was baked, the
//! handle is reused and the engine is not called.
//!
//! The baker owns every shape it creates. Components only carry a copy of the
//! handle, so a handle the baker does not know is never destroyed by it.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

use super::backend::{HeightFieldDesc, PhysicsBackend, ShapeHandle};
use super::{PhysicsError, PhysicsResult};
use crate::ecs::components::{ColliderKind, HeightFieldColliderComponent, SphereColliderComponent};
use crate::foundation::math::{is_finite_vec3, Vec3};

/// Hash of a collider's geometric fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeSignature(u64);

impl ShapeSignature {
    /// Raw hash value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Everything about a collider that decides how its body is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColliderSignature {
    /// Geometry hash
    pub geometry: ShapeSignature,
    /// Sensor flag, consumed at body creation
    pub is_sensor: bool,
}

/// Collider data the baker can turn into an engine shape
pub trait BakeSource {
    /// Which collider kind this is
    const KIND: ColliderKind;

    /// Handle currently cached on the component
    fn shape_handle(&self) -> ShapeHandle;

    /// Store a handle on the component
    fn set_shape_handle(&mut self, handle: ShapeHandle);

    /// Sensor flag
    fn is_sensor(&self) -> bool;

    /// Hash of the geometric fields, computed whether or not they are valid
    fn geometry_signature(&self) -> ShapeSignature;

    /// Reject geometry the engine cannot represent
    fn validate(&self) -> PhysicsResult<()>;

    /// Ask the engine for a shape matching the current fields
    fn create_shape<B: PhysicsBackend + ?Sized>(&self, backend: &mut B) -> PhysicsResult<ShapeHandle>;

    /// Full signature including the sensor flag
    fn collider_signature(&self) -> ColliderSignature {
        ColliderSignature {
            geometry: self.geometry_signature(),
            is_sensor: self.is_sensor(),
        }
    }
}

fn write_vec3(hasher: &mut DefaultHasher, v: &Vec3) {
    for component in v.iter() {
        hasher.write_u32(component.to_bits());
    }
}

impl BakeSource for SphereColliderComponent {
    const KIND: ColliderKind = ColliderKind::Sphere;

    fn shape_handle(&self) -> ShapeHandle {
        self.shape_handle
    }

    fn set_shape_handle(&mut self, handle: ShapeHandle) {
        self.shape_handle = handle;
    }

    fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    fn geometry_signature(&self) -> ShapeSignature {
        let mut hasher = DefaultHasher::new();
        hasher.write_u8(0);
        hasher.write_u32(self.radius.to_bits());
        write_vec3(&mut hasher, &self.center);
        ShapeSignature(hasher.finish())
    }

    fn validate(&self) -> PhysicsResult<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(PhysicsError::GeometryInvalid(format!(
                "sphere radius must be positive, got {}",
                self.radius
            )));
        }
        if !is_finite_vec3(&self.center) {
            return Err(PhysicsError::GeometryInvalid(format!(
                "sphere center must be finite, got {:?}",
                self.center
            )));
        }
        Ok(())
    }

    fn create_shape<B: PhysicsBackend + ?Sized>(&self, backend: &mut B) -> PhysicsResult<ShapeHandle> {
        backend.create_sphere_shape(self.radius, self.center)
    }
}

impl HeightFieldColliderComponent {
    fn desc(&self) -> HeightFieldDesc<'_> {
        HeightFieldDesc {
            width: self.width,
            height: self.height,
            cell_size_x: self.cell_size_x,
            cell_size_z: self.cell_size_z,
            height_scale: self.height_scale,
            height_offset: self.height_offset,
            samples: &self.heights,
        }
    }
}

impl BakeSource for HeightFieldColliderComponent {
    const KIND: ColliderKind = ColliderKind::HeightField;

    fn shape_handle(&self) -> ShapeHandle {
        self.shape_handle
    }

    fn set_shape_handle(&mut self, handle: ShapeHandle) {
        self.shape_handle = handle;
    }

    fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    fn geometry_signature(&self) -> ShapeSignature {
        let mut hasher = DefaultHasher::new();
        hasher.write_u8(1);
        hasher.write_u32(self.width);
        hasher.write_u32(self.height);
        hasher.write_u32(self.cell_size_x.to_bits());
        hasher.write_u32(self.cell_size_z.to_bits());
        hasher.write_u32(self.height_scale.to_bits());
        hasher.write_u32(self.height_offset.to_bits());
        hasher.write_usize(self.heights.len());
        hasher.write(bytemuck::cast_slice::<f32, u8>(&self.heights));
        ShapeSignature(hasher.finish())
    }

    fn validate(&self) -> PhysicsResult<()> {
        self.desc().validate()
    }

    fn create_shape<B: PhysicsBackend + ?Sized>(&self, backend: &mut B) -> PhysicsResult<ShapeHandle> {
        backend.create_height_field_shape(&self.desc())
    }
}

/// Result of [`ShapeBaker::bake_replacement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeOutcome {
    /// The cached handle still matches the geometry
    Reused(ShapeHandle),
    /// A new shape was created; `previous` is still alive and must be released by the caller
    Baked {
        /// Newly created shape, already stored on the component
        handle: ShapeHandle,
        /// Handle the component carried before, possibly [`ShapeHandle::NONE`]
        previous: ShapeHandle,
    },
}

impl BakeOutcome {
    /// Handle now stored on the component
    pub fn handle(self) -> ShapeHandle {
        match self {
            Self::Reused(handle) | Self::Baked { handle, .. } => handle,
        }
    }
}

/// Builds and owns engine shapes for collider components
#[derive(Debug, Default)]
pub struct ShapeBaker {
    baked: HashMap<ShapeHandle, ShapeSignature>,
    reported_invalid: HashSet<ShapeSignature>,
}

impl ShapeBaker {
    /// Create an empty baker
    pub fn new() -> Self {
        Self::default()
    }

    /// Validated geometry signature of a collider
    pub fn signature_of<C: BakeSource>(&self, collider: &C) -> PhysicsResult<ShapeSignature> {
        collider.validate()?;
        Ok(collider.geometry_signature())
    }

    /// Whether the collider's cached handle was baked from its current geometry
    pub fn is_current<C: BakeSource>(&self, collider: &C) -> bool {
        let handle = collider.shape_handle();
        handle.is_some() && self.baked.get(&handle) == Some(&collider.geometry_signature())
    }

    /// Whether this baker created the shape and has not released it
    pub fn owns(&self, handle: ShapeHandle) -> bool {
        self.baked.contains_key(&handle)
    }

    /// Number of live shapes owned by the baker
    pub fn live_shape_count(&self) -> usize {
        self.baked.len()
    }

    /// Distinct invalid geometries already warned about
    pub(crate) fn reported_invalid_count(&self) -> usize {
        self.reported_invalid.len()
    }

    /// Return the collider's shape, baking it if its geometry changed
    ///
    /// A stale shape is released before the new one is created, so a collider
    /// never holds more than one engine shape. Invalid geometry releases the
    /// stale shape, leaves the handle at [`ShapeHandle::NONE`] and makes no
    /// engine call.
    pub fn bake_or_reuse<C, B>(&mut self, collider: &mut C, backend: &mut B) -> PhysicsResult<ShapeHandle>
    where
        C: BakeSource,
        B: PhysicsBackend + ?Sized,
    {
        if let Err(err) = collider.validate() {
            self.release(collider.shape_handle(), backend);
            collider.set_shape_handle(ShapeHandle::NONE);
            return Err(self.reject::<C>(collider.geometry_signature(), err));
        }
        if self.is_current(collider) {
            return Ok(collider.shape_handle());
        }

        self.release(collider.shape_handle(), backend);
        collider.set_shape_handle(ShapeHandle::NONE);

        let handle = collider.create_shape(backend)?;
        self.record(collider, handle);
        Ok(handle)
    }

    /// Bake the collider's current geometry without releasing its old shape
    ///
    /// Used when a body still references the old shape: the caller moves the
    /// body to the new shape first, then releases `previous`. Invalid geometry
    /// clears the component handle; an engine failure leaves it untouched.
    pub fn bake_replacement<C, B>(&mut self, collider: &mut C, backend: &mut B) -> PhysicsResult<BakeOutcome>
    where
        C: BakeSource,
        B: PhysicsBackend + ?Sized,
    {
        if let Err(err) = collider.validate() {
            collider.set_shape_handle(ShapeHandle::NONE);
            return Err(self.reject::<C>(collider.geometry_signature(), err));
        }
        if self.is_current(collider) {
            return Ok(BakeOutcome::Reused(collider.shape_handle()));
        }

        let previous = collider.shape_handle();
        let handle = collider.create_shape(backend)?;
        self.record(collider, handle);
        Ok(BakeOutcome::Baked { handle, previous })
    }

    /// Destroy a shape this baker owns
    ///
    /// [`ShapeHandle::NONE`], already released and foreign handles are ignored.
    /// Returns whether an engine shape was destroyed.
    pub fn release<B: PhysicsBackend + ?Sized>(&mut self, handle: ShapeHandle, backend: &mut B) -> bool {
        if handle.is_none() || self.baked.remove(&handle).is_none() {
            return false;
        }
        backend.destroy_shape(handle);
        log::trace!("Released {handle}");
        true
    }

    /// Destroy every shape this baker still owns
    pub fn release_all<B: PhysicsBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let handles: Vec<ShapeHandle> = self.baked.keys().copied().collect();
        for handle in &handles {
            self.release(*handle, backend);
        }
        handles.len()
    }

    fn record<C: BakeSource>(&mut self, collider: &mut C, handle: ShapeHandle) {
        let signature = collider.geometry_signature();
        self.baked.insert(handle, signature);
        collider.set_shape_handle(handle);
        log::debug!("Baked {:?} collider into {handle}", C::KIND);
    }

    fn reject<C: BakeSource>(&mut self, signature: ShapeSignature, err: PhysicsError) -> PhysicsError {
        if self.reported_invalid.insert(signature) {
            log::warn!("Skipping {:?} collider bake: {err}", C::KIND);
        }
        err
    }
}
