//! Asset data referenced by physics-driven entities

pub mod material;

pub use material::{
    AlphaMode, BlendMode, Material, MaterialOptions, MaterialParams, MaterialTexture, TextureSlot,
    TEXTURE_SLOT_COUNT,
};
