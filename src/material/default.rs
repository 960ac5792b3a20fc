//! Classic diffuse/specular material.

use glam::{Vec3, Vec4};

use crate::material::{AlphaMode, MaterialAdapter, SpecularModel};

/// The non-PBR material: diffuse color plus an optional specular layer.
#[derive(Debug, Clone)]
pub struct DefaultMaterial {
    pub lighting: bool,
    pub diffuse_color: Vec4,
    pub emissive_color: Vec3,
    pub specular_tint: Vec3,
    pub specular_amount: f32,
    pub specular_model: SpecularModel,
    pub specular_roughness: f32,
    pub fresnel_power: f32,
    pub ior: f32,
    pub bump_amount: f32,
    pub translucent_falloff: f32,
    pub diffuse_light_wrap: f32,
    pub vertex_colors: bool,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub point_size: f32,
    pub line_width: f32,
}

impl Default for DefaultMaterial {
    fn default() -> Self {
        Self {
            lighting: true,
            diffuse_color: Vec4::ONE,
            emissive_color: Vec3::ZERO,
            specular_tint: Vec3::ONE,
            specular_amount: 0.0,
            specular_model: SpecularModel::Default,
            specular_roughness: 50.0,
            fresnel_power: 0.0,
            ior: 1.45,
            bump_amount: 0.0,
            translucent_falloff: 1.0,
            diffuse_light_wrap: 0.0,
            vertex_colors: false,
            alpha_mode: AlphaMode::Default,
            alpha_cutoff: 0.5,
            point_size: 1.0,
            line_width: 1.0,
        }
    }
}

impl MaterialAdapter for DefaultMaterial {
    fn has_lighting(&self) -> bool {
        self.lighting
    }

    fn is_vertex_colors_enabled(&self) -> bool {
        self.vertex_colors
    }

    fn is_specular_enabled(&self) -> bool {
        self.specular_amount > 0.01
    }

    fn specular_model(&self) -> SpecularModel {
        self.specular_model
    }

    fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }

    fn emissive_color(&self) -> Vec3 {
        self.emissive_color
    }

    fn base_color(&self) -> Vec4 {
        self.diffuse_color
    }

    fn specular_tint(&self) -> Vec3 {
        self.specular_tint
    }

    fn ior(&self) -> f32 {
        self.ior
    }

    fn specular_amount(&self) -> f32 {
        self.specular_amount
    }

    fn roughness(&self) -> f32 {
        self.specular_roughness
    }

    fn fresnel_power(&self) -> f32 {
        self.fresnel_power
    }

    fn bump_amount(&self) -> f32 {
        self.bump_amount
    }

    fn translucent_falloff(&self) -> f32 {
        self.translucent_falloff
    }

    fn diffuse_light_wrap(&self) -> f32 {
        self.diffuse_light_wrap
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
}
