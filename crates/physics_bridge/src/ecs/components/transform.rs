//! Transform component for the ECS system
//!
//! Pure data component. Gameplay and animation write it; the physics sync
//! system reads it for non-simulated bodies and writes it back for dynamic ones.

use crate::ecs::Component;
use crate::foundation::math::{quat_from_euler, Mat4, Quat, Vec3};

/// ECS Transform component
///
/// World space position, rotation as Euler angles in radians
/// (roll about X, pitch about Y, yaw about Z) and scale.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    /// World space position (Y-up right-handed)
    pub position: Vec3,

    /// World space rotation as Euler angles in radians
    pub rotation: Vec3,

    /// World space scale factors
    pub scale: Vec3,
}

impl Component for TransformComponent {}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl TransformComponent {
    /// Create identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create from position and Euler rotation
    pub fn from_position_rotation(position: Vec3, rotation: Vec3) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Rotation as a unit quaternion
    pub fn rotation_quat(&self) -> Quat {
        quat_from_euler(self.rotation)
    }

    /// Convert to transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation_quat().to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Builder pattern: Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder pattern: Set rotation from Euler angles (radians)
    pub fn with_rotation_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vec3::new(x, y, z);
        self
    }

    /// Builder pattern: Set scale (uniform)
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Builder pattern: Set scale (non-uniform)
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}
