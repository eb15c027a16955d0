//! Configuration system
//!
//! File-backed configuration shared by the physics bridge and the assets it
//! references. Format is chosen from the file extension (`.toml` or `.ron`).

pub use serde::{Deserialize, Serialize};

use crate::physics::BodyKind;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Physics bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World gravity in m/s²
    pub gravity: [f32; 3],

    /// Duration of one simulation step in seconds
    pub fixed_timestep: f32,

    /// Upper bound on simulation steps per frame
    pub max_substeps: u32,

    /// Shape capacity of the reference backend (`None` = unlimited)
    pub max_shapes: Option<usize>,

    /// Body capacity of the reference backend (`None` = unlimited)
    pub max_bodies: Option<usize>,

    /// Body kind for sphere colliders on entities without a `RigidBodyComponent`
    pub default_sphere_body: BodyKind,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -crate::foundation::math::constants::STANDARD_GRAVITY, 0.0],
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            max_shapes: None,
            max_bodies: None,
            default_sphere_body: BodyKind::Static,
        }
    }
}

impl Config for PhysicsConfig {}

impl PhysicsConfig {
    /// Check value ranges that would make stepping meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "fixed_timestep",
                reason: format!("must be a positive number of seconds, got {}", self.fixed_timestep),
            });
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_substeps",
                reason: "must allow at least one step per frame".to_string(),
            });
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "gravity",
                reason: format!("must be finite, got {:?}", self.gravity),
            });
        }
        Ok(())
    }

    /// Gravity as a vector
    pub fn gravity_vector(&self) -> crate::foundation::math::Vec3 {
        crate::foundation::math::Vec3::new(self.gravity[0], self.gravity[1], self.gravity[2])
    }
}
