//! Capability and property interface over concrete materials.

use glam::{Vec3, Vec4};

use crate::context::LightProbe;
use crate::material::{AlphaMode, ShaderStage, SpecularModel};
use crate::program::CompiledProgram;

/// Read-only view of one material during generation and binding.
///
/// Implementations must answer identically for the whole lifetime of a
/// generated program; a changed answer requires a new shader key.
pub trait MaterialAdapter {
    // ── Capability queries ───────────────────────────────────────────────

    /// Whether the built-in lighting model runs at all.
    fn has_lighting(&self) -> bool;

    /// Metallic-roughness material (Burley diffuse, metalness pipeline).
    fn is_principled(&self) -> bool {
        false
    }

    fn is_metalness_enabled(&self) -> bool {
        false
    }

    fn is_vertex_colors_enabled(&self) -> bool {
        false
    }

    fn is_specular_enabled(&self) -> bool;

    /// Custom material whose fragment snippet fully owns the output.
    fn is_unshaded(&self) -> bool {
        false
    }

    fn has_custom_shader_snippet(&self, _stage: ShaderStage) -> bool {
        false
    }

    /// Raw snippet text for a stage; empty when none exists.
    fn custom_shader_snippet(&self, _stage: ShaderStage) -> &str {
        ""
    }

    /// Whether the material supplies a named library-function override
    /// (ambient or per-light processor hooks).
    fn has_custom_function(&self, _name: &str) -> bool {
        false
    }

    fn specular_model(&self) -> SpecularModel {
        SpecularModel::Default
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Default
    }

    // ── Property accessors ───────────────────────────────────────────────

    fn emissive_color(&self) -> Vec3;

    fn base_color(&self) -> Vec4;

    fn specular_tint(&self) -> Vec3;

    fn ior(&self) -> f32;

    fn metalness_amount(&self) -> f32 {
        0.0
    }

    fn specular_amount(&self) -> f32;

    fn roughness(&self) -> f32;

    fn fresnel_power(&self) -> f32;

    fn bump_amount(&self) -> f32 {
        0.0
    }

    fn translucent_falloff(&self) -> f32 {
        0.0
    }

    fn diffuse_light_wrap(&self) -> f32 {
        0.0
    }

    fn occlusion_amount(&self) -> f32 {
        1.0
    }

    fn alpha_cutoff(&self) -> f32 {
        0.5
    }

    fn point_size(&self) -> f32 {
        1.0
    }

    fn line_width(&self) -> f32 {
        1.0
    }

    /// Material-level IBL probe; overrides the scene probe when valid.
    fn ibl_probe(&self) -> Option<&LightProbe> {
        None
    }

    /// Lets custom materials write their user-declared uniforms after the
    /// built-in ones have been bound. Default materials bind nothing here.
    fn set_custom_property_uniforms(&self, _program: &mut CompiledProgram) {}
}
