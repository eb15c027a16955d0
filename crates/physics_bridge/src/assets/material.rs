//! Material asset
//!
//! Plain data describing how an entity is shaded: scalar parameters, render
//! options and one optional texture per [`TextureSlot`]. Materials are
//! loaded from and saved to `.toml` / `.ron` files through [`Config`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Number of texture slots on a material
pub const TEXTURE_SLOT_COUNT: usize = 6;

/// Texture binding points of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TextureSlot {
    /// Albedo
    #[default]
    BaseColor,
    /// Tangent-space normal map
    Normal,
    /// Metallic in B, roughness in G
    MetallicRoughness,
    /// Ambient occlusion
    AmbientOcclusion,
    /// Emission color
    Emission,
    /// Separate opacity mask
    Opacity,
}

impl TextureSlot {
    /// Every slot, in index order
    pub const ALL: [Self; TEXTURE_SLOT_COUNT] = [
        Self::BaseColor,
        Self::Normal,
        Self::MetallicRoughness,
        Self::AmbientOcclusion,
        Self::Emission,
        Self::Opacity,
    ];

    /// Slot at a raw index; out-of-range indices fall back to [`TextureSlot::BaseColor`]
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    /// Index of this slot in the texture array
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name used in material files
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseColor => "base_color",
            Self::Normal => "normal",
            Self::MetallicRoughness => "metallic_roughness",
            Self::AmbientOcclusion => "ambient_occlusion",
            Self::Emission => "emission",
            Self::Opacity => "opacity",
        }
    }

    /// Slot with the given file name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

/// How the alpha channel is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlphaMode {
    /// Alpha ignored
    #[default]
    Opaque,
    /// Alpha tested against `alpha_cutoff`
    Mask,
    /// Alpha blended
    Blend,
}

impl AlphaMode {
    /// Decode a raw value as stored by exporters; unknown values are opaque
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Mask,
            2 => Self::Blend,
            _ => Self::Opaque,
        }
    }
}

/// Blend state the renderer uses for a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// No blending, depth write on
    #[default]
    Opaque,
    /// Alpha test, depth write on
    Masked,
    /// Alpha blending, sorted back to front
    Translucent,
}

impl From<AlphaMode> for BlendMode {
    fn from(mode: AlphaMode) -> Self {
        match mode {
            AlphaMode::Opaque => Self::Opaque,
            AlphaMode::Mask => Self::Masked,
            AlphaMode::Blend => Self::Translucent,
        }
    }
}

/// Texture bound to a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialTexture {
    /// File the texture is loaded from
    pub source_path: PathBuf,
    /// Whether texels are sRGB encoded
    pub is_srgb: bool,
}

/// Scalar shading parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialParams {
    /// Base color RGBA
    pub base_color: [f32; 4],
    /// Metallic factor (0.0 = dielectric, 1.0 = metallic)
    pub metallic: f32,
    /// Roughness factor (0.0 = mirror, 1.0 = completely rough)
    pub roughness: f32,
    /// Emission color
    pub emission: [f32; 3],
    /// Emission strength
    pub emission_strength: f32,
    /// Normal map scale factor
    pub normal_scale: f32,
    /// Ambient occlusion strength
    pub occlusion_strength: f32,
    /// Alpha below this is discarded in [`AlphaMode::Mask`]
    pub alpha_cutoff: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            emission: [0.0, 0.0, 0.0],
            emission_strength: 0.0,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            alpha_cutoff: 0.5,
        }
    }
}

/// Render state options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialOptions {
    /// Alpha interpretation
    pub alpha_mode: AlphaMode,
    /// Derived blend state, see [`Material::apply_alpha_mode_to_blend_mode`]
    pub blend_mode: BlendMode,
    /// Disable back-face culling
    pub double_sided: bool,
    /// Render into shadow maps
    pub cast_shadows: bool,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        Self {
            alpha_mode: AlphaMode::Opaque,
            blend_mode: BlendMode::Opaque,
            double_sided: false,
            cast_shadows: true,
        }
    }
}

/// Material asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Name for debugging
    pub name: String,
    /// Scalar parameters
    pub params: MaterialParams,
    /// Render options
    pub options: MaterialOptions,
    #[serde(with = "texture_slots")]
    textures: [Option<MaterialTexture>; TEXTURE_SLOT_COUNT],
}

impl Config for Material {}

impl Material {
    /// Create a material with default parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the alpha mode and derive the blend mode from it
    pub fn with_alpha_mode(mut self, alpha_mode: AlphaMode) -> Self {
        self.options.alpha_mode = alpha_mode;
        self.apply_alpha_mode_to_blend_mode();
        self
    }

    /// Attach a texture to a slot, replacing any previous one
    pub fn set_texture(&mut self, slot: TextureSlot, path: impl Into<PathBuf>, is_srgb: bool) {
        self.textures[slot.index()] = Some(MaterialTexture {
            source_path: path.into(),
            is_srgb,
        });
    }

    /// Detach the texture from a slot
    pub fn clear_texture(&mut self, slot: TextureSlot) -> Option<MaterialTexture> {
        self.textures[slot.index()].take()
    }

    /// Texture attached to a slot
    pub fn get_texture(&self, slot: TextureSlot) -> Option<&MaterialTexture> {
        self.textures[slot.index()].as_ref()
    }

    /// Path of the texture attached to a slot
    pub fn texture_path(&self, slot: TextureSlot) -> Option<&Path> {
        self.get_texture(slot).map(|texture| texture.source_path.as_path())
    }

    /// Iterate over attached textures in slot order
    pub fn textures(&self) -> impl Iterator<Item = (TextureSlot, &MaterialTexture)> {
        TextureSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get_texture(slot).map(|texture| (slot, texture)))
    }

    /// Number of attached textures
    pub fn texture_count(&self) -> usize {
        self.textures.iter().flatten().count()
    }

    /// Derive `options.blend_mode` from `options.alpha_mode`
    pub fn apply_alpha_mode_to_blend_mode(&mut self) -> BlendMode {
        self.options.blend_mode = BlendMode::from(self.options.alpha_mode);
        self.options.blend_mode
    }

    /// Reset every field to its default and drop all textures
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether the material can be handed to the renderer
    ///
    /// Parameters are not range checked here; the renderer clamps them.
    pub fn is_valid(&self) -> bool {
        true
    }
}

/// Textures are written as a table keyed by slot name, omitting empty slots
mod texture_slots {
    use super::{BTreeMap, MaterialTexture, TextureSlot, TEXTURE_SLOT_COUNT};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    type Slots = [Option<MaterialTexture>; TEXTURE_SLOT_COUNT];

    pub fn serialize<S: Serializer>(textures: &Slots, serializer: S) -> Result<S::Ok, S::Error> {
        let named: BTreeMap<&'static str, &MaterialTexture> = TextureSlot::ALL
            .into_iter()
            .filter_map(|slot| textures[slot.index()].as_ref().map(|texture| (slot.name(), texture)))
            .collect();
        named.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Slots, D::Error> {
        let named = BTreeMap::<String, MaterialTexture>::deserialize(deserializer)?;
        let mut textures: Slots = Default::default();
        for (name, texture) in named {
            let slot = TextureSlot::from_name(&name)
                .ok_or_else(|| D::Error::custom(format!("unknown texture slot `{name}`")))?;
            textures[slot.index()] = Some(texture);
        }
        Ok(textures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_round_trip_every_slot() {
        let mut material = Material::new("rock");
        for slot in TextureSlot::ALL {
            material.set_texture(slot, "p", true);
            let texture = material.get_texture(slot).unwrap();
            assert_eq!(texture.source_path, Path::new("p"));
            assert!(texture.is_srgb);
        }
        assert_eq!(material.texture_count(), TEXTURE_SLOT_COUNT);
    }

    #[test]
    fn test_out_of_range_slot_aliases_base_color() {
        assert_eq!(TextureSlot::from_index(TEXTURE_SLOT_COUNT), TextureSlot::BaseColor);
        assert_eq!(TextureSlot::from_index(usize::MAX), TextureSlot::BaseColor);

        let mut material = Material::default();
        material.set_texture(TextureSlot::from_index(42), "albedo.png", true);

        assert_eq!(material.texture_path(TextureSlot::BaseColor), Some(Path::new("albedo.png")));
        assert_eq!(material.texture_count(), 1);
    }

    #[test]
    fn test_slot_index_round_trip() {
        for (index, slot) in TextureSlot::ALL.into_iter().enumerate() {
            assert_eq!(slot.index(), index);
            assert_eq!(TextureSlot::from_index(index), slot);
            assert_eq!(TextureSlot::from_name(slot.name()), Some(slot));
        }
    }

    #[test]
    fn test_clear_texture() {
        let mut material = Material::default();
        material.set_texture(TextureSlot::Normal, "normal.png", false);

        let removed = material.clear_texture(TextureSlot::Normal);

        assert_eq!(removed.map(|t| t.is_srgb), Some(false));
        assert!(material.get_texture(TextureSlot::Normal).is_none());
        assert!(material.clear_texture(TextureSlot::Normal).is_none());
    }

    #[test]
    fn test_alpha_to_blend_mapping() {
        let mut material = Material::default();
        for (alpha, blend) in [
            (AlphaMode::Opaque, BlendMode::Opaque),
            (AlphaMode::Mask, BlendMode::Masked),
            (AlphaMode::Blend, BlendMode::Translucent),
        ] {
            material.options.alpha_mode = alpha;
            assert_eq!(material.apply_alpha_mode_to_blend_mode(), blend);
            assert_eq!(material.options.blend_mode, blend);
        }
    }

    #[test]
    fn test_unknown_raw_alpha_mode_is_opaque() {
        assert_eq!(AlphaMode::from_raw(0), AlphaMode::Opaque);
        assert_eq!(AlphaMode::from_raw(1), AlphaMode::Mask);
        assert_eq!(AlphaMode::from_raw(2), AlphaMode::Blend);
        assert_eq!(AlphaMode::from_raw(7), AlphaMode::Opaque);
        assert_eq!(BlendMode::from(AlphaMode::from_raw(u32::MAX)), BlendMode::Opaque);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut material = Material::new("glass").with_alpha_mode(AlphaMode::Blend);
        material.params.roughness = 0.1;
        material.options.double_sided = true;
        material.set_texture(TextureSlot::Emission, "glow.png", true);

        material.clear();

        assert_eq!(material, Material::default());
        assert_eq!(material.texture_count(), 0);
        assert_eq!(material.options.blend_mode, BlendMode::Opaque);
    }

    #[test]
    fn test_is_valid_is_permissive() {
        let mut material = Material::default();
        material.params.alpha_cutoff = 7.0;
        material.options.alpha_mode = AlphaMode::Mask;
        assert!(material.is_valid());
    }

    #[test]
    fn test_material_file_round_trip() {
        let mut material = Material::new("terrain").with_alpha_mode(AlphaMode::Mask);
        material.set_texture(TextureSlot::BaseColor, "grass.png", true);
        material.set_texture(TextureSlot::Normal, "grass_n.png", false);

        let dir = std::env::temp_dir();
        for ext in ["toml", "ron"] {
            let path = dir.join(format!("physics_bridge_material_{}.{ext}", std::process::id()));
            let path = path.to_string_lossy().into_owned();

            material.save_to_file(&path).unwrap();
            let loaded = Material::load_from_file(&path).unwrap();
            let _ = std::fs::remove_file(&path);

            assert_eq!(loaded, material);
        }
    }

    #[test]
    fn test_unknown_slot_name_is_rejected() {
        let result: Result<Material, _> = ron::from_str(r#"(textures: {"sheen": (source_path: "x.png", is_srgb: true)})"#);
        assert!(result.is_err());
    }
}
