//! Material descriptions and the adapter interface.
//!
//! The generator and binder never look at a concrete material type; they
//! dispatch through [`MaterialAdapter`] only. The three built-in
//! implementations cover the classic diffuse/specular material, the
//! metallic-roughness PBR material, and user-authored custom materials.

mod adapter;
mod custom;
mod default;
mod principled;

pub use adapter::MaterialAdapter;
pub use custom::{CustomMaterial, CustomShadingMode};
pub use default::DefaultMaterial;
pub use principled::PrincipledMaterial;

/// Alpha handling modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    /// Backend decides based on opacity.
    #[default]
    Default,
    /// Fragments below the cutoff are discarded.
    Mask,
    /// Alpha blending.
    Blend,
    /// Alpha forced to one.
    Opaque,
}

/// Specular BRDF selection for non-principled materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecularModel {
    /// Classic normalized specular BSDF.
    #[default]
    Default,
    /// Anisotropy-capable GGX variant.
    KGgx,
}

/// Shader stage a custom snippet targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}
