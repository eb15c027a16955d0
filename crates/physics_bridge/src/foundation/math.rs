//! Math utilities and types
//!
//! Thin aliases over nalgebra shared by the ECS components, the shape bake
//! layer and the physics backends.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Build a rotation from Euler angles in radians (roll about X, pitch about Y, yaw about Z)
pub fn quat_from_euler(euler: Vec3) -> Quat {
    Quat::from_euler_angles(euler.x, euler.y, euler.z)
}

/// Decompose a rotation into Euler angles in radians (roll, pitch, yaw)
pub fn euler_from_quat(rotation: &Quat) -> Vec3 {
    let (roll, pitch, yaw) = rotation.euler_angles();
    Vec3::new(roll, pitch, yaw)
}

/// Returns true if every component of the vector is finite
pub fn is_finite_vec3(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Standard gravity along -Y in m/s²
    pub const STANDARD_GRAVITY: f32 = 9.81;
}
