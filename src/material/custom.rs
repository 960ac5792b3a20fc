//! User-authored custom materials.

use glam::{Vec3, Vec4};

use crate::context::LightProbe;
use crate::material::{AlphaMode, MaterialAdapter, ShaderStage, SpecularModel};
use crate::program::{CompiledProgram, UniformValue};

/// Whether a custom material augments or replaces the built-in shading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CustomShadingMode {
    /// Snippets run inside the standard lighting flow.
    #[default]
    Shaded,
    /// The fragment snippet alone produces the output color.
    Unshaded,
}

/// A material driven by user shader snippets and user uniforms.
#[derive(Debug, Clone)]
pub struct CustomMaterial {
    pub shading_mode: CustomShadingMode,
    pub vertex_snippet: String,
    pub fragment_snippet: String,
    /// Library-function override hooks the snippets provide (ambient and
    /// per-light processors).
    pub custom_functions: Vec<String>,
    /// User-declared uniforms, bound verbatim after the built-in ones.
    pub properties: Vec<(String, UniformValue)>,
    pub base_color: Vec4,
    pub emissive_color: Vec3,
    pub specular_tint: Vec3,
    pub specular_amount: f32,
    pub specular_model: SpecularModel,
    pub metalness: f32,
    pub roughness: f32,
    pub ior: f32,
    pub fresnel_power: f32,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub point_size: f32,
    pub line_width: f32,
    pub light_probe: Option<LightProbe>,
}

impl Default for CustomMaterial {
    fn default() -> Self {
        Self {
            shading_mode: CustomShadingMode::Shaded,
            vertex_snippet: String::new(),
            fragment_snippet: String::new(),
            custom_functions: Vec::new(),
            properties: Vec::new(),
            base_color: Vec4::ONE,
            emissive_color: Vec3::ZERO,
            specular_tint: Vec3::ONE,
            specular_amount: 0.5,
            specular_model: SpecularModel::Default,
            metalness: 0.0,
            roughness: 0.0,
            ior: 1.45,
            fresnel_power: 1.0,
            alpha_mode: AlphaMode::Default,
            alpha_cutoff: 0.5,
            point_size: 1.0,
            line_width: 1.0,
            light_probe: None,
        }
    }
}

impl MaterialAdapter for CustomMaterial {
    fn has_lighting(&self) -> bool {
        self.shading_mode == CustomShadingMode::Shaded
    }

    fn is_principled(&self) -> bool {
        // Custom shaded materials run the metallic-roughness flow.
        self.shading_mode == CustomShadingMode::Shaded
    }

    fn is_metalness_enabled(&self) -> bool {
        self.metalness > 0.0
    }

    fn is_specular_enabled(&self) -> bool {
        self.shading_mode == CustomShadingMode::Shaded
    }

    fn is_unshaded(&self) -> bool {
        self.shading_mode == CustomShadingMode::Unshaded
    }

    fn has_custom_shader_snippet(&self, stage: ShaderStage) -> bool {
        !self.custom_shader_snippet(stage).is_empty()
    }

    fn custom_shader_snippet(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex_snippet,
            ShaderStage::Fragment => &self.fragment_snippet,
        }
    }

    fn has_custom_function(&self, name: &str) -> bool {
        self.custom_functions.iter().any(|f| f == name)
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

    fn set_custom_property_uniforms(&self, program: &mut CompiledProgram) {
        for (name, value) in &self.properties {
            let _ = program.set_uniform(name, value.clone(), None);
        }
    }
}
