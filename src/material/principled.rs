//! Metallic-roughness PBR material.

use glam::{Vec3, Vec4};

use crate::context::LightProbe;
use crate::material::{AlphaMode, MaterialAdapter, SpecularModel};

/// The physically based material: base color, metalness, roughness.
///
/// Fresnel is always active for this material; the caller sets the
/// corresponding key flag when building the shader key.
#[derive(Debug, Clone)]
pub struct PrincipledMaterial {
    pub base_color: Vec4,
    pub emissive_color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    pub specular_amount: f32,
    pub specular_tint: Vec3,
    pub ior: f32,
    pub fresnel_power: f32,
    pub bump_amount: f32,
    pub occlusion_amount: f32,
    pub vertex_colors: bool,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub point_size: f32,
    pub line_width: f32,
    /// Per-material IBL probe override.
    pub light_probe: Option<LightProbe>,
}

impl Default for PrincipledMaterial {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            emissive_color: Vec3::ZERO,
            metalness: 0.0,
            roughness: 0.0,
            specular_amount: 0.5,
            specular_tint: Vec3::ONE,
            ior: 1.45,
            fresnel_power: 1.0,
            bump_amount: 1.0,
            occlusion_amount: 1.0,
            vertex_colors: false,
            alpha_mode: AlphaMode::Default,
            alpha_cutoff: 0.5,
            point_size: 1.0,
            line_width: 1.0,
            light_probe: None,
        }
    }
}

impl MaterialAdapter for PrincipledMaterial {
    fn has_lighting(&self) -> bool {
        true
    }

    fn is_principled(&self) -> bool {
        true
    }

    fn is_metalness_enabled(&self) -> bool {
        self.metalness > 0.0
    }

    fn is_vertex_colors_enabled(&self) -> bool {
        self.vertex_colors
    }

    fn is_specular_enabled(&self) -> bool {
        true
    }

    fn specular_model(&self) -> SpecularModel {
        SpecularModel::Default
    }

    fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }

    fn emissive_color(&self) -> Vec3 {
        self.emissive_color
    }

    fn base_color(&self) -> Vec4 {
        self.base_color
    }

    fn specular_tint(&self) -> Vec3 {
        self.specular_tint
    }

    fn ior(&self) -> f32 {
        self.ior
    }

    fn metalness_amount(&self) -> f32 {
        self.metalness
    }

    fn specular_amount(&self) -> f32 {
        self.specular_amount
    }

    fn roughness(&self) -> f32 {
        self.roughness
    }

    fn fresnel_power(&self) -> f32 {
        self.fresnel_power
    }

    fn bump_amount(&self) -> f32 {
        self.bump_amount
    }

    fn occlusion_amount(&self) -> f32 {
        self.occlusion_amount
    }

    fn alpha_cutoff(&self) -> f32 {
        self.alpha_cutoff
    }

    fn point_size(&self) -> f32 {
        self.point_size
    }

    fn line_width(&self) -> f32 {
        self.line_width
    }

    fn ibl_probe(&self) -> Option<&LightProbe> {
        self.light_probe.as_ref()
    }
}
