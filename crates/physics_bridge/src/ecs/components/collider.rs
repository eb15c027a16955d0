//! Collider components for ECS
//!
//! Colliders only record intent. Editing a field never talks to the engine;
//! the shape bake layer notices the change by comparing geometry signatures
//! on the next sync pass.
//!
//! `shape_handle` is a value copy of an engine handle, not ownership. The
//! physics sync system is the only code that creates or destroys the shape
//! behind it, and [`ShapeHandle::NONE`] means "not baked".

use crate::ecs::Component;
use crate::foundation::math::Vec3;
use crate::physics::ShapeHandle;

/// Default sphere radius in meters
pub const DEFAULT_SPHERE_RADIUS: f32 = 0.5;

/// Kind of collider attached to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    /// [`SphereColliderComponent`]
    Sphere,
    /// [`HeightFieldColliderComponent`]
    HeightField,
}

/// Sphere collision geometry
#[derive(Debug, Clone, PartialEq)]
pub struct SphereColliderComponent {
    /// Radius in meters, must be positive to bake
    pub radius: f32,

    /// Local offset of the sphere center from the entity origin
    pub center: Vec3,

    /// Sensors report overlaps but take no part in collision response
    pub is_sensor: bool,

    /// Engine shape baked from this component, or [`ShapeHandle::NONE`]
    pub shape_handle: ShapeHandle,
}

impl Component for SphereColliderComponent {}

impl Default for SphereColliderComponent {
    fn default() -> Self {
        Self {
            radius: DEFAULT_SPHERE_RADIUS,
            center: Vec3::zeros(),
            is_sensor: false,
            shape_handle: ShapeHandle::NONE,
        }
    }
}

impl SphereColliderComponent {
    /// Create a sphere collider with the given radius
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            ..Default::default()
        }
    }

    /// Builder pattern: Set local center offset
    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    /// Builder pattern: Mark as sensor
    pub fn as_sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    /// Reset geometry to defaults and forget the baked handle
    ///
    /// The engine shape is not released here.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Height-field terrain collision geometry
///
/// `heights` is row-major with `width` samples per row and `height` rows.
/// The grid must hold exactly `width * height` samples to bake.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightFieldColliderComponent {
    /// Number of samples along X
    pub width: u32,

    /// Number of samples along Z
    pub height: u32,

    /// Distance between samples along X
    pub cell_size_x: f32,

    /// Distance between samples along Z
    pub cell_size_z: f32,

    /// Multiplier applied to every sample
    pub height_scale: f32,

    /// Offset added after scaling
    pub height_offset: f32,

    /// Raw height samples
    pub heights: Vec<f32>,

    /// Sensors report overlaps but take no part in collision response
    pub is_sensor: bool,

    /// Engine shape baked from this component, or [`ShapeHandle::NONE`]
    pub shape_handle: ShapeHandle,
}

impl Component for HeightFieldColliderComponent {}

impl Default for HeightFieldColliderComponent {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            cell_size_x: 1.0,
            cell_size_z: 1.0,
            height_scale: 1.0,
            height_offset: 0.0,
            heights: Vec::new(),
            is_sensor: false,
            shape_handle: ShapeHandle::NONE,
        }
    }
}

impl HeightFieldColliderComponent {
    /// Create a height-field from a sample grid
    pub fn new(width: u32, height: u32, heights: Vec<f32>) -> Self {
        Self {
            width,
            height,
            heights,
            ..Default::default()
        }
    }

    /// Builder pattern: Set sample spacing
    pub fn with_cell_size(mut self, cell_size_x: f32, cell_size_z: f32) -> Self {
        self.cell_size_x = cell_size_x;
        self.cell_size_z = cell_size_z;
        self
    }

    /// Builder pattern: Set vertical scale and offset
    pub fn with_height_mapping(mut self, height_scale: f32, height_offset: f32) -> Self {
        self.height_scale = height_scale;
        self.height_offset = height_offset;
        self
    }

    /// Builder pattern: Mark as sensor
    pub fn as_sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    /// Number of samples the grid dimensions call for
    pub fn expected_sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Sample at grid coordinates, after scale and offset
    pub fn sample(&self, x: u32, z: u32) -> Option<f32> {
        if x >= self.width || z >= self.height {
            return None;
        }
        let index = z as usize * self.width as usize + x as usize;
        self.heights
            .get(index)
            .map(|h| h * self.height_scale + self.height_offset)
    }

    /// Reset geometry to defaults and forget the baked handle
    ///
    /// The engine shape is not released here.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
