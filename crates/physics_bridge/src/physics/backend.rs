//! Physics engine capability
//!
//! The bridge talks to the rigid-body engine only through [`PhysicsBackend`].
//! Nothing engine-specific leaks into the ECS components: they see the plain
//! [`ShapeHandle`] value and nothing else.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{PhysicsError, PhysicsResult};
use crate::ecs::components::TransformComponent;
use crate::foundation::math::{euler_from_quat, Quat, Vec3};

/// Opaque identifier of an engine shape
///
/// Zero is the "absent" sentinel shared by every collider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ShapeHandle(u64);

impl ShapeHandle {
    /// No shape
    pub const NONE: Self = Self(0);

    /// Wrap a raw engine value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw engine value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the absent sentinel
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Whether this refers to a shape
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ShapeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{:x}", self.0)
    }
}

/// Opaque identifier of an engine body
///
/// Zero is the "absent" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BodyHandle(u64);

impl BodyHandle {
    /// No body
    pub const NONE: Self = Self(0);

    /// Wrap a raw engine value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw engine value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the absent sentinel
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{:x}", self.0)
    }
}

/// Motion type of an engine body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves once created, except when explicitly teleported
    #[default]
    Static,
    /// Moved by gameplay; the engine does not integrate it
    Kinematic,
    /// Simulated by the engine
    Dynamic,
}

impl BodyKind {
    /// Whether the engine owns this body's transform
    pub const fn is_simulated(self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

/// Rigid pose of an engine body
///
/// Scale is an ECS-only concept and never reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTransform {
    /// World space position
    pub position: Vec3,
    /// World space rotation
    pub rotation: Quat,
}

impl Default for BodyTransform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl BodyTransform {
    /// Create a pose
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose of an ECS transform
    pub fn from_component(transform: &TransformComponent) -> Self {
        Self {
            position: transform.position,
            rotation: transform.rotation_quat(),
        }
    }

    /// Write this pose into an ECS transform, leaving its scale untouched
    pub fn write_to(&self, transform: &mut TransformComponent) {
        transform.position = self.position;
        transform.rotation = euler_from_quat(&self.rotation);
    }

    /// Whether two poses are the same within `epsilon`
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.position - other.position).amax() <= epsilon
            && self.rotation.angle_to(&other.rotation) <= epsilon
    }
}

/// Height-field shape description handed to the engine
#[derive(Debug, Clone, Copy)]
pub struct HeightFieldDesc<'a> {
    /// Samples along X
    pub width: u32,
    /// Samples along Z
    pub height: u32,
    /// Sample spacing along X
    pub cell_size_x: f32,
    /// Sample spacing along Z
    pub cell_size_z: f32,
    /// Multiplier applied to every sample
    pub height_scale: f32,
    /// Offset added after scaling
    pub height_offset: f32,
    /// Row-major samples, `width * height` of them
    pub samples: &'a [f32],
}

impl HeightFieldDesc<'_> {
    /// Reject grids the engine cannot represent
    pub fn validate(&self) -> PhysicsResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PhysicsError::GeometryInvalid(format!(
                "height-field dimensions must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.width as usize * self.height as usize;
        if self.samples.len() != expected {
            return Err(PhysicsError::GeometryInvalid(format!(
                "height-field {}x{} needs {} samples, got {}",
                self.width,
                self.height,
                expected,
                self.samples.len()
            )));
        }
        if !(self.cell_size_x.is_finite() && self.cell_size_x > 0.0)
            || !(self.cell_size_z.is_finite() && self.cell_size_z > 0.0)
        {
            return Err(PhysicsError::GeometryInvalid(format!(
                "height-field cell size must be positive, got {}x{}",
                self.cell_size_x, self.cell_size_z
            )));
        }
        if !self.height_scale.is_finite() || !self.height_offset.is_finite() {
            return Err(PhysicsError::GeometryInvalid(format!(
                "height-field scale/offset must be finite, got {}/{}",
                self.height_scale, self.height_offset
            )));
        }
        if self.samples.iter().any(|s| !s.is_finite()) {
            return Err(PhysicsError::GeometryInvalid(
                "height-field samples must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Capability the bridge needs from a rigid-body engine
///
/// Destroy calls accept [`ShapeHandle::NONE`], [`BodyHandle::NONE`] and
/// handles that were already destroyed, and do nothing for them. A shape
/// must not be destroyed while a body still references it; callers destroy
/// the body first.
pub trait PhysicsBackend: Send {
    /// Create a sphere shape centered at `center` in body space
    fn create_sphere_shape(&mut self, radius: f32, center: Vec3) -> PhysicsResult<ShapeHandle>;

    /// Create a height-field shape
    fn create_height_field_shape(&mut self, desc: &HeightFieldDesc<'_>) -> PhysicsResult<ShapeHandle>;

    /// Destroy a shape
    fn destroy_shape(&mut self, shape: ShapeHandle);

    /// Create a body using `shape` at `transform`
    fn create_body(
        &mut self,
        shape: ShapeHandle,
        transform: &BodyTransform,
        kind: BodyKind,
        is_sensor: bool,
    ) -> PhysicsResult<BodyHandle>;

    /// Destroy a body
    fn destroy_body(&mut self, body: BodyHandle);

    /// Swap the shape a body uses, keeping its pose and velocity
    fn set_body_shape(&mut self, body: BodyHandle, shape: ShapeHandle) -> PhysicsResult<()>;

    /// Teleport a body
    fn set_body_transform(&mut self, body: BodyHandle, transform: &BodyTransform);

    /// Current pose of a body
    fn body_transform(&self, body: BodyHandle) -> Option<BodyTransform>;

    /// Advance the simulation by `delta_time` seconds
    fn step_simulation(&mut self, delta_time: f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn desc(width: u32, height: u32, samples: &[f32]) -> HeightFieldDesc<'_> {
        HeightFieldDesc {
            width,
            height,
            cell_size_x: 1.0,
            cell_size_z: 1.0,
            height_scale: 1.0,
            height_offset: 0.0,
            samples,
        }
    }

    #[test]
    fn test_handle_sentinels() {
        assert!(ShapeHandle::NONE.is_none());
        assert!(ShapeHandle::default().is_none());
        assert!(ShapeHandle::from_raw(3).is_some());
        assert!(BodyHandle::NONE.is_none());
        assert_eq!(BodyHandle::from_raw(9).raw(), 9);
    }

    #[test]
    fn test_height_field_validation() {
        assert!(desc(2, 2, &[0.0, 1.0, 1.0, 2.0]).validate().is_ok());
        assert!(matches!(
            desc(2, 2, &[0.0, 1.0, 1.0]).validate(),
            Err(PhysicsError::GeometryInvalid(_))
        ));
        assert!(desc(0, 0, &[]).validate().is_err());
        assert!(desc(1, 1, &[f32::NAN]).validate().is_err());

        let mut bad_cells = desc(1, 1, &[0.0]);
        bad_cells.cell_size_z = 0.0;
        assert!(bad_cells.validate().is_err());
    }

    #[test]
    fn test_body_transform_component_roundtrip() {
        let component = TransformComponent::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation_euler(0.1, 0.2, 0.3)
            .with_uniform_scale(4.0);

        let pose = BodyTransform::from_component(&component);
        let mut written = TransformComponent::identity().with_uniform_scale(4.0);
        pose.write_to(&mut written);

        assert_relative_eq!(written.position, component.position, epsilon = 1e-6);
        assert_relative_eq!(written.rotation, component.rotation, epsilon = 1e-5);
        assert_eq!(written.scale, component.scale);
    }

    #[test]
    fn test_body_transform_approx_eq() {
        let a = BodyTransform::new(Vec3::new(0.0, 1.0, 0.0), Quat::identity());
        let mut b = a;
        assert!(a.approx_eq(&b, 1e-6));

        b.position.y += 0.5;
        assert!(!a.approx_eq(&b, 1e-6));
    }

    #[test]
    fn test_only_dynamic_is_simulated() {
        assert!(BodyKind::Dynamic.is_simulated());
        assert!(!BodyKind::Kinematic.is_simulated());
        assert!(!BodyKind::Static.is_simulated());
    }
}
