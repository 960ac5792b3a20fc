//! Texture map classification and per-image naming.
//!
//! Every texture an artist attaches to a material arrives here as a
//! [`RenderableImage`] tagged with a [`MapType`]. The map type selects one
//! row of a static name table; those names are the single source of truth
//! for every per-image GLSL identifier, shared by the generator (which
//! declares them) and the binder (which writes them). Neither side ever
//! builds an image uniform name by hand.

use glam::{Mat4, Vec2};

use crate::context::TextureHandle;

/// Semantic role a texture map plays in the material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapType {
    /// Custom-material texture with no fixed semantic; sampled and bound
    /// but never consumed by the built-in lighting code.
    Unknown,
    Diffuse,
    Opacity,
    Specular,
    Emissive,
    Bump,
    SpecularAmountMap,
    Normal,
    Translucency,
    LightmapIndirect,
    LightmapRadiosity,
    LightmapShadow,
    Roughness,
    BaseColor,
    Metalness,
    Occlusion,
}

impl MapType {
    pub const COUNT: usize = 16;

    pub const ALL: [MapType; Self::COUNT] = [
        MapType::Unknown,
        MapType::Diffuse,
        MapType::Opacity,
        MapType::Specular,
        MapType::Emissive,
        MapType::Bump,
        MapType::SpecularAmountMap,
        MapType::Normal,
        MapType::Translucency,
        MapType::LightmapIndirect,
        MapType::LightmapRadiosity,
        MapType::LightmapShadow,
        MapType::Roughness,
        MapType::BaseColor,
        MapType::Metalness,
        MapType::Occlusion,
    ];

    /// Name set for this map type's GLSL identifiers.
    #[inline]
    #[must_use]
    pub const fn names(self) -> &'static ImageNameSet {
        &IMAGE_NAME_TABLE[self as usize]
    }
}

/// The six derived GLSL identifiers of one map type.
#[derive(Debug)]
pub struct ImageNameSet {
    /// Sampler uniform.
    pub sampler: &'static str,
    /// Fragment-stage coordinate variable (varying or local).
    pub uv_coords: &'static str,
    /// Vertex-stage scratch variable used while transforming coordinates.
    pub uv_coords_temp: &'static str,
    /// Offset uniform; `z` carries the premultiplied-alpha flag.
    pub offsets: &'static str,
    /// Rotation uniform holding the upper 2x2 of the texture transform.
    pub rotations: &'static str,
    /// Texture pixel-size uniform (bump map gradients need it).
    pub size: &'static str,
}

const fn name_set(
    sampler: &'static str,
    uv_coords: &'static str,
    uv_coords_temp: &'static str,
    offsets: &'static str,
    rotations: &'static str,
    size: &'static str,
) -> ImageNameSet {
    ImageNameSet {
        sampler,
        uv_coords,
        uv_coords_temp,
        offsets,
        rotations,
        size,
    }
}

/// Static identifier table, indexed by `MapType as usize`.
static IMAGE_NAME_TABLE: [ImageNameSet; MapType::COUNT] = [
    name_set(
        "unknown_sampler",
        "unknown_uv_coords",
        "unknown_uv_coords_temp",
        "unknown_offsets",
        "unknown_rotations",
        "unknown_size",
    ),
    name_set(
        "diffuse_sampler",
        "diffuse_uv_coords",
        "diffuse_uv_coords_temp",
        "diffuse_offsets",
        "diffuse_rotations",
        "diffuse_size",
    ),
    name_set(
        "opacity_sampler",
        "opacity_uv_coords",
        "opacity_uv_coords_temp",
        "opacity_offsets",
        "opacity_rotations",
        "opacity_size",
    ),
    name_set(
        "specular_sampler",
        "specular_uv_coords",
        "specular_uv_coords_temp",
        "specular_offsets",
        "specular_rotations",
        "specular_size",
    ),
    name_set(
        "emissive_sampler",
        "emissive_uv_coords",
        "emissive_uv_coords_temp",
        "emissive_offsets",
        "emissive_rotations",
        "emissive_size",
    ),
    name_set(
        "bump_sampler",
        "bump_uv_coords",
        "bump_uv_coords_temp",
        "bump_offsets",
        "bump_rotations",
        "bump_size",
    ),
    name_set(
        "specular_amount_sampler",
        "specular_amount_uv_coords",
        "specular_amount_uv_coords_temp",
        "specular_amount_offsets",
        "specular_amount_rotations",
        "specular_amount_size",
    ),
    name_set(
        "normal_sampler",
        "normal_uv_coords",
        "normal_uv_coords_temp",
        "normal_offsets",
        "normal_rotations",
        "normal_size",
    ),
    name_set(
        "translucency_sampler",
        "translucency_uv_coords",
        "translucency_uv_coords_temp",
        "translucency_offsets",
        "translucency_rotations",
        "translucency_size",
    ),
    name_set(
        "lightmap_indirect_sampler",
        "lightmap_indirect_uv_coords",
        "lightmap_indirect_uv_coords_temp",
        "lightmap_indirect_offsets",
        "lightmap_indirect_rotations",
        "lightmap_indirect_size",
    ),
    name_set(
        "lightmap_radiosity_sampler",
        "lightmap_radiosity_uv_coords",
        "lightmap_radiosity_uv_coords_temp",
        "lightmap_radiosity_offsets",
        "lightmap_radiosity_rotations",
        "lightmap_radiosity_size",
    ),
    name_set(
        "lightmap_shadow_sampler",
        "lightmap_shadow_uv_coords",
        "lightmap_shadow_uv_coords_temp",
        "lightmap_shadow_offsets",
        "lightmap_shadow_rotations",
        "lightmap_shadow_size",
    ),
    name_set(
        "roughness_sampler",
        "roughness_uv_coords",
        "roughness_uv_coords_temp",
        "roughness_offsets",
        "roughness_rotations",
        "roughness_size",
    ),
    name_set(
        "base_color_sampler",
        "base_color_uv_coords",
        "base_color_uv_coords_temp",
        "base_color_offsets",
        "base_color_rotations",
        "base_color_size",
    ),
    name_set(
        "metalness_sampler",
        "metalness_uv_coords",
        "metalness_uv_coords_temp",
        "metalness_offsets",
        "metalness_rotations",
        "metalness_size",
    ),
    name_set(
        "occlusion_sampler",
        "occlusion_uv_coords",
        "occlusion_uv_coords_temp",
        "occlusion_offsets",
        "occlusion_rotations",
        "occlusion_size",
    ),
];

static TEXCOORD_VARS: [&str; 9] = [
    "var_tex_coord0",
    "var_tex_coord1",
    "var_tex_coord2",
    "var_tex_coord3",
    "var_tex_coord4",
    "var_tex_coord5",
    "var_tex_coord6",
    "var_tex_coord7",
    "var_tex_coord8",
];

/// Varying name for a UV channel.
///
/// # Panics
///
/// UV set indices above 8 are a caller bug.
#[must_use]
pub fn texture_coord_variable_name(uv_set: u8) -> &'static str {
    assert!(uv_set < 9, "UV set index out of range: {uv_set}");
    TEXCOORD_VARS[uv_set as usize]
}

/// How an image's texture coordinates are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MappingMode {
    /// Mesh UV attribute, optionally run through the texture transform.
    #[default]
    UvCoords,
    /// Coordinates derived from the reflection vector (environment maps).
    EnvironmentReflection,
}

/// One texture attachment, snapshotted for a single pass.
#[derive(Debug, Clone)]
pub struct RenderableImage {
    pub map_type: MapType,
    /// Which mesh UV channel feeds this image (mapping mode permitting).
    pub uv_set: u8,
    /// Full texture transform (scale, rotation, offset) in UV space.
    pub texture_transform: Mat4,
    /// Texture data carries premultiplied alpha.
    pub premultiplied: bool,
    /// Flip the V axis when sampling.
    pub invert_uv: bool,
    pub mapping_mode: MappingMode,
    pub texture: Option<TextureHandle>,
    /// Pixel dimensions of the texture; bump-map gradients need them.
    pub texture_size: Vec2,
}

impl RenderableImage {
    #[must_use]
    pub fn new(map_type: MapType) -> Self {
        Self {
            map_type,
            uv_set: 0,
            texture_transform: Mat4::IDENTITY,
            premultiplied: false,
            invert_uv: false,
            mapping_mode: MappingMode::UvCoords,
            texture: None,
            texture_size: Vec2::ONE,
        }
    }

    /// Whether the image can sample the shared UV varying directly.
    ///
    /// Identity-transform images skip the per-image coordinate variable and
    /// its offset/rotation uniforms entirely.
    #[must_use]
    pub fn is_transform_identity(&self) -> bool {
        self.texture_transform == Mat4::IDENTITY && !self.invert_uv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_map_type_has_a_distinct_name_row() {
        let mut samplers: Vec<&str> = MapType::ALL.iter().map(|t| t.names().sampler).collect();
        samplers.sort_unstable();
        samplers.dedup();
        assert_eq!(samplers.len(), MapType::COUNT, "duplicate sampler names");
    }

    #[test]
    fn name_rows_share_their_base() {
        for map_type in MapType::ALL {
            let names = map_type.names();
            let base = names.sampler.strip_suffix("_sampler").unwrap();
            assert_eq!(names.uv_coords, format!("{base}_uv_coords"));
            assert_eq!(names.uv_coords_temp, format!("{base}_uv_coords_temp"));
            assert_eq!(names.offsets, format!("{base}_offsets"));
            assert_eq!(names.rotations, format!("{base}_rotations"));
            assert_eq!(names.size, format!("{base}_size"));
        }
    }

    #[test]
    fn texcoord_names_cover_all_nine_sets() {
        for uv_set in 0..9u8 {
            let name = texture_coord_variable_name(uv_set);
            assert!(name.ends_with(char::from(b'0' + uv_set)));
        }
    }

    #[test]
    #[should_panic(expected = "UV set index out of range")]
    fn texcoord_name_rejects_out_of_range_sets() {
        let _ = texture_coord_variable_name(9);
    }

    #[test]
    fn identity_detection_accounts_for_uv_flip() {
        let mut image = RenderableImage::new(MapType::BaseColor);
        assert!(image.is_transform_identity());

        image.invert_uv = true;
        assert!(!image.is_transform_identity());

        image.invert_uv = false;
        image.texture_transform = Mat4::from_translation(glam::Vec3::new(0.5, 0.0, 0.0));
        assert!(!image.is_transform_identity());
    }
}
