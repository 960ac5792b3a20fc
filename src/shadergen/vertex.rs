//! Vertex pipeline: stage lifecycle and derived-quantity generation.
//!
//! The pipeline owns both stage generators and enforces the generation
//! order: `begin_vertex_generation`, `begin_fragment_generation`,
//! `end_vertex_generation`, `end_fragment_generation`. The fragment
//! synthesizer runs between the two begin/end pairs and pulls derived
//! quantities (world position, normals, UV coordinates and so on) through
//! the methods here; each one is generated at most once per pass.

use bitflags::bitflags;
use rustc_hash::FxHashSet;

use crate::image::{texture_coord_variable_name, MapType, MappingMode, RenderableImage};
use crate::key::{MaterialKey, VertexAttributes};
use crate::material::{MaterialAdapter, ShaderStage};

use super::stage::StageGenerator;
use super::GeneratedShader;

/// Upper bound on the skinning palette; the binder truncates to this.
pub const MAX_BONE_COUNT: usize = 96;

bitflags! {
    /// Derived quantities already emitted this pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct GenerationFlags: u16 {
        const WORLD_POSITION = 1 << 0;
        const WORLD_NORMAL = 1 << 1;
        const VIEW_VECTOR = 1 << 2;
        const TANGENT_BINORMAL = 1 << 3;
        const VERTEX_COLOR = 1 << 4;
        const DEPTH = 1 << 5;
        const SHADOW_WORLD_POSITION = 1 << 6;
        const ENV_REFLECTION = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    VertexOpen,
    FragmentOpen,
    VertexClosed,
    Closed,
}

/// Owns both stage generators for one generation pass.
#[derive(Debug)]
pub struct VertexPipeline {
    key: MaterialKey,
    vertex: StageGenerator,
    fragment: StageGenerator,
    phase: Phase,
    flags: GenerationFlags,
    /// Bit per UV set whose shared varying has been emitted.
    uv_mask: u16,
    /// Map types whose per-image coordinate variable has been emitted.
    image_coords_generated: FxHashSet<MapType>,
}

impl VertexPipeline {
    #[must_use]
    pub fn new(key: MaterialKey) -> Self {
        Self {
            key,
            vertex: StageGenerator::new(),
            fragment: StageGenerator::new(),
            phase: Phase::Idle,
            flags: GenerationFlags::empty(),
            uv_mask: 0,
            image_coords_generated: FxHashSet::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &MaterialKey {
        &self.key
    }

    #[inline]
    pub fn vertex_mut(&mut self) -> &mut StageGenerator {
        &mut self.vertex
    }

    #[inline]
    pub fn fragment_mut(&mut self) -> &mut StageGenerator {
        &mut self.fragment
    }

    #[inline]
    #[must_use]
    pub fn fragment(&self) -> &StageGenerator {
        &self.fragment
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Opens the vertex stage: position input, the always-present camera
    /// and transform uniforms, skinning and point size when the key asks
    /// for them, and the custom vertex snippet.
    pub fn begin_vertex_generation(&mut self, adapter: &dyn MaterialAdapter) {
        debug_assert_eq!(self.phase, Phase::Idle, "pipeline reused without reset");
        self.vertex = StageGenerator::new();
        self.fragment = StageGenerator::new();
        self.flags = GenerationFlags::empty();
        self.uv_mask = 0;
        self.image_coords_generated.clear();
        self.phase = Phase::VertexOpen;

        self.vertex.add_incoming("attr_pos", "vec3");
        self.vertex.add_uniform("camera_position", "vec3");
        self.vertex.add_uniform("camera_direction", "vec3");
        self.vertex.add_uniform("camera_properties", "vec2");
        self.vertex.add_uniform("model_view_projection", "mat4");
        self.vertex.add_uniform("normal_matrix", "mat3");
        self.vertex.add_uniform("model_matrix", "mat4");
        if self.key.uses_projection_matrix() {
            self.vertex.add_uniform("projection_matrix", "mat4");
        }
        if self.key.uses_inverse_projection_matrix() {
            self.vertex.add_uniform("inverse_projection_matrix", "mat4");
        }

        self.vertex.append("vec3 local_pos = attr_pos;");

        if self.key.has_attribute(VertexAttributes::JOINT_AND_WEIGHT) {
            self.vertex.add_incoming("attr_joints", "ivec4");
            self.vertex.add_incoming("attr_weights", "vec4");
            self.vertex
                .add_uniform("bone_transforms", &format!("mat4[{MAX_BONE_COUNT}]"));
            self.vertex
                .add_uniform("bone_normal_transforms", &format!("mat3[{MAX_BONE_COUNT}]"));
            self.vertex
                .append("mat4 skin_matrix = attr_weights.x * bone_transforms[attr_joints.x]");
            self.vertex
                .append("    + attr_weights.y * bone_transforms[attr_joints.y]");
            self.vertex
                .append("    + attr_weights.z * bone_transforms[attr_joints.z]");
            self.vertex
                .append("    + attr_weights.w * bone_transforms[attr_joints.w];");
            self.vertex
                .append("local_pos = (skin_matrix * vec4(local_pos, 1.0)).xyz;");
        }

        if self.key.uses_points_topology() {
            self.vertex.add_uniform("material_point_size", "float");
            self.vertex.append("gl_PointSize = material_point_size;");
        }

        if adapter.has_custom_shader_snippet(ShaderStage::Vertex) {
            for line in adapter
                .custom_shader_snippet(ShaderStage::Vertex)
                .lines()
            {
                self.vertex.append(line);
            }
        }
    }

    /// Opens the fragment stage. Declares the shared material-properties
    /// vector and the object opacity local every material body reads.
    pub fn begin_fragment_generation(&mut self, adapter: &dyn MaterialAdapter) {
        debug_assert_eq!(self.phase, Phase::VertexOpen, "begin order violated");
        self.phase = Phase::FragmentOpen;

        self.fragment.add_uniform("material_properties", "vec4");
        self.fragment
            .append("float object_opacity = material_properties.w;");

        if adapter.has_custom_shader_snippet(ShaderStage::Fragment) {
            for line in adapter
                .custom_shader_snippet(ShaderStage::Fragment)
                .lines()
            {
                self.fragment.append(line);
            }
        }
    }

    /// Closes the vertex stage body and forwards its varyings to the
    /// fragment stage.
    pub fn end_vertex_generation(&mut self) {
        debug_assert_eq!(self.phase, Phase::FragmentOpen, "end order violated");
        self.phase = Phase::VertexClosed;

        self.vertex
            .append("gl_Position = model_view_projection * vec4(local_pos, 1.0);");

        let varyings: Vec<(String, String)> = self
            .vertex
            .outgoing()
            .iter()
            .map(|(n, t)| (n.clone(), t.clone()))
            .collect();
        for (name, glsl_type) in varyings {
            self.fragment.add_incoming(&name, &glsl_type);
        }
    }

    pub fn end_fragment_generation(&mut self) {
        debug_assert_eq!(self.phase, Phase::VertexClosed, "end order violated");
        self.phase = Phase::Closed;
    }

    // ── Derived quantities (idempotent per pass) ─────────────────────────

    /// World-space position varying.
    pub fn generate_world_position(&mut self) -> &'static str {
        if !self.flags.contains(GenerationFlags::WORLD_POSITION) {
            self.flags.insert(GenerationFlags::WORLD_POSITION);
            self.vertex
                .append("vec3 world_pos = (model_matrix * vec4(local_pos, 1.0)).xyz;");
            self.vertex.add_outgoing("var_world_pos", "vec3");
            self.vertex.append("var_world_pos = world_pos;");
        }
        "var_world_pos"
    }

    /// Interpolated world-space normal varying. The caller is responsible
    /// for checking the key's normal-attribute bit first.
    pub fn generate_world_normal(&mut self) -> &'static str {
        if !self.flags.contains(GenerationFlags::WORLD_NORMAL) {
            self.flags.insert(GenerationFlags::WORLD_NORMAL);
            self.vertex.add_incoming("attr_norm", "vec3");
            self.vertex.add_outgoing("var_world_normal", "vec3");
            if self.key.has_attribute(VertexAttributes::JOINT_AND_WEIGHT) {
                self.vertex.append(
                    "mat3 skin_normal_matrix = attr_weights.x * bone_normal_transforms[attr_joints.x]",
                );
                self.vertex
                    .append("    + attr_weights.y * bone_normal_transforms[attr_joints.y]");
                self.vertex
                    .append("    + attr_weights.z * bone_normal_transforms[attr_joints.z]");
                self.vertex
                    .append("    + attr_weights.w * bone_normal_transforms[attr_joints.w];");
                self.vertex.append(
                    "var_world_normal = normalize(normal_matrix * skin_normal_matrix * attr_norm);",
                );
            } else {
                self.vertex
                    .append("var_world_normal = normalize(normal_matrix * attr_norm);");
            }
        }
        "var_world_normal"
    }

    /// Fragment-stage view vector.
    pub fn generate_view_vector(&mut self) -> &'static str {
        if !self.flags.contains(GenerationFlags::VIEW_VECTOR) {
            self.flags.insert(GenerationFlags::VIEW_VECTOR);
            self.generate_world_position();
            self.fragment.add_uniform("camera_position", "vec3");
            self.fragment
                .append("vec3 view_vector = normalize(camera_position - var_world_pos);");
        }
        "view_vector"
    }

    /// Tangent and binormal varyings plus their fragment-stage
    /// normalizations. Requires the tangent attribute.
    pub fn generate_tangent_binormal(&mut self) -> (&'static str, &'static str) {
        if !self.flags.contains(GenerationFlags::TANGENT_BINORMAL) {
            self.flags.insert(GenerationFlags::TANGENT_BINORMAL);
            self.vertex.add_incoming("attr_textan", "vec3");
            self.vertex.add_outgoing("var_tangent", "vec3");
            self.vertex
                .append("var_tangent = normalize(normal_matrix * attr_textan);");
            if self.key.has_attribute(VertexAttributes::BINORMAL) {
                self.vertex.add_incoming("attr_binormal", "vec3");
                self.vertex.add_outgoing("var_binormal", "vec3");
                self.vertex
                    .append("var_binormal = normalize(normal_matrix * attr_binormal);");
                self.fragment
                    .append("vec3 binormal = normalize(var_binormal);");
            } else {
                self.fragment
                    .append("vec3 binormal = cross(world_normal, normalize(var_tangent));");
            }
            self.fragment
                .append("vec3 tangent = normalize(var_tangent);");
        }
        ("tangent", "binormal")
    }

    /// Vertex color varying; white when the attribute is missing is the
    /// caller's concern.
    pub fn generate_vertex_color(&mut self) -> &'static str {
        if !self.flags.contains(GenerationFlags::VERTEX_COLOR) {
            self.flags.insert(GenerationFlags::VERTEX_COLOR);
            self.vertex.add_incoming("attr_color", "vec4");
            self.vertex.add_outgoing("var_color", "vec4");
            self.vertex.append("var_color = attr_color;");
        }
        "var_color"
    }

    /// Clip-space depth varying for orthographic shadow passes.
    pub fn generate_depth(&mut self) -> &'static str {
        if !self.flags.contains(GenerationFlags::DEPTH) {
            self.flags.insert(GenerationFlags::DEPTH);
            self.vertex.add_outgoing("var_depth", "float");
            self.vertex
                .append("var_depth = (model_view_projection * vec4(local_pos, 1.0)).z;");
        }
        "var_depth"
    }

    /// World position varying for cube shadow distance output.
    pub fn generate_shadow_world_position(&mut self) -> &'static str {
        if !self.flags.contains(GenerationFlags::SHADOW_WORLD_POSITION) {
            self.flags.insert(GenerationFlags::SHADOW_WORLD_POSITION);
            self.vertex.add_outgoing("var_shadow_world_pos", "vec3");
            self.vertex
                .append("var_shadow_world_pos = (model_matrix * vec4(local_pos, 1.0)).xyz;");
        }
        "var_shadow_world_pos"
    }

    /// Screen-projected reflection coordinates for environment-mapped
    /// images. The fragment stage must have `world_normal` in scope.
    pub fn generate_env_map_reflection(&mut self) -> &'static str {
        if !self.flags.contains(GenerationFlags::ENV_REFLECTION) {
            self.flags.insert(GenerationFlags::ENV_REFLECTION);
            self.generate_world_position();
            self.vertex.add_outgoing("var_object_to_camera", "vec3");
            self.vertex.add_uniform("camera_position", "vec3");
            self.vertex
                .append("var_object_to_camera = world_pos - camera_position;");
            self.fragment.append(
                "vec2 environment_map_reflection = normalize(reflect(normalize(var_object_to_camera), world_normal)).xy * 0.5 + vec2(0.5);",
            );
        }
        "environment_map_reflection"
    }

    /// Shared pass-through varying for one UV set.
    pub fn generate_uv_coords(&mut self, uv_set: u8) -> &'static str {
        let name = texture_coord_variable_name(uv_set);
        let bit = 1u16 << u16::from(uv_set);
        if self.uv_mask & bit == 0 {
            self.uv_mask |= bit;
            let attr = format!("attr_uv{uv_set}");
            self.vertex.add_incoming(&attr, "vec2");
            self.vertex.add_outgoing(name, "vec2");
            self.vertex.append(format!("{name} = {attr};"));
        }
        name
    }

    // ── Per-image coordinates ────────────────────────────────────────────

    /// Fragment coordinate expression for an identity-transform image: the
    /// shared UV varying, with no per-image uniforms.
    pub fn generate_image_uv_sampler(&mut self, image: &RenderableImage) -> String {
        match image.mapping_mode {
            MappingMode::UvCoords => self.generate_uv_coords(image.uv_set).to_owned(),
            MappingMode::EnvironmentReflection => {
                self.generate_env_map_reflection().to_owned()
            }
        }
    }

    /// Fragment coordinate variable for a transformed image: per-image
    /// offset/rotation uniforms applied in the vertex stage.
    pub fn generate_image_uv_coordinates(&mut self, image: &RenderableImage) -> String {
        let names = image.map_type.names();
        if image.mapping_mode == MappingMode::EnvironmentReflection {
            return self.generate_env_map_reflection().to_owned();
        }
        if self.image_coords_generated.insert(image.map_type) {
            let attr = format!("attr_uv{}", image.uv_set);
            self.vertex.add_incoming(&attr, "vec2");
            self.vertex.add_uniform(names.offsets, "vec3");
            self.vertex.add_uniform(names.rotations, "vec4");
            self.vertex.add_function("get_transformed_uv_coords");
            self.vertex.append(format!(
                "vec2 {temp} = get_transformed_uv_coords(vec3({attr}, 1.0), mat2({rot}.x, {rot}.y, {rot}.z, {rot}.w), {off});",
                temp = names.uv_coords_temp,
                rot = names.rotations,
                off = names.offsets,
            ));
            if image.invert_uv {
                self.vertex.append(format!(
                    "{temp}.y = 1.0 - {temp}.y;",
                    temp = names.uv_coords_temp
                ));
            }
            self.vertex.add_outgoing(names.uv_coords, "vec2");
            self.vertex.append(format!(
                "{} = {};",
                names.uv_coords, names.uv_coords_temp
            ));
        }
        names.uv_coords.to_owned()
    }

    // ── Output ───────────────────────────────────────────────────────────

    /// Renders both stages and merges their declaration tables.
    #[must_use]
    pub fn finalize_sources(&self) -> GeneratedShader {
        debug_assert_eq!(self.phase, Phase::Closed, "finalize before end of pass");

        let mut uniforms: Vec<(String, String)> = Vec::new();
        for (name, glsl_type) in self.vertex.uniforms().iter().chain(self.fragment.uniforms()) {
            if !uniforms.iter().any(|(n, _)| n == name) {
                uniforms.push((name.clone(), glsl_type.clone()));
            }
        }
        let mut includes: Vec<String> = Vec::new();
        for name in self.vertex.includes().iter().chain(self.fragment.includes()) {
            if !includes.contains(name) {
                includes.push(name.clone());
            }
        }
        let mut functions: Vec<String> = Vec::new();
        for name in self.vertex.functions().iter().chain(self.fragment.functions()) {
            if !functions.contains(name) {
                functions.push(name.clone());
            }
        }

        GeneratedShader {
            vertex_source: self.vertex.finalize(),
            fragment_source: self.fragment.finalize(),
            uniforms,
            includes,
            functions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::DefaultMaterial;

    fn run_empty_pass(pipeline: &mut VertexPipeline) {
        let material = DefaultMaterial::default();
        pipeline.begin_vertex_generation(&material);
        pipeline.begin_fragment_generation(&material);
        pipeline.end_vertex_generation();
        pipeline.end_fragment_generation();
    }

    #[test]
    fn derived_quantities_are_emitted_once() {
        let material = DefaultMaterial::default();
        let mut pipeline = VertexPipeline::new(MaterialKey::default());
        pipeline.begin_vertex_generation(&material);
        pipeline.begin_fragment_generation(&material);
        pipeline.generate_world_position();
        pipeline.generate_world_position();
        pipeline.generate_uv_coords(0);
        pipeline.generate_uv_coords(0);
        pipeline.end_vertex_generation();
        pipeline.end_fragment_generation();

        let shader = pipeline.finalize_sources();
        assert_eq!(
            shader.vertex_source.matches("var_world_pos = world_pos;").count(),
            1
        );
        assert_eq!(
            shader.vertex_source.matches("var_tex_coord0 = attr_uv0;").count(),
            1
        );
    }

    #[test]
    fn varyings_flow_into_the_fragment_stage() {
        let material = DefaultMaterial::default();
        let mut pipeline = VertexPipeline::new(MaterialKey::default());
        pipeline.begin_vertex_generation(&material);
        pipeline.begin_fragment_generation(&material);
        pipeline.generate_world_position();
        pipeline.end_vertex_generation();
        pipeline.end_fragment_generation();

        let shader = pipeline.finalize_sources();
        assert!(shader.vertex_source.contains("out vec3 var_world_pos;"));
        assert!(shader.fragment_source.contains("in vec3 var_world_pos;"));
    }

    #[test]
    fn skinning_is_gated_on_the_joint_weight_attribute() {
        use crate::key::MaterialFlags;

        let mut plain = VertexPipeline::new(MaterialKey::default());
        run_empty_pass(&mut plain);
        assert!(!plain.finalize_sources().vertex_source.contains("bone_transforms"));

        let skinned_key = MaterialKey::new(
            MaterialFlags::empty(),
            VertexAttributes::JOINT_AND_WEIGHT,
        );
        let mut skinned = VertexPipeline::new(skinned_key);
        run_empty_pass(&mut skinned);
        let source = skinned.finalize_sources().vertex_source;
        assert!(source.contains("bone_transforms"));
        assert!(source.contains("skin_matrix"));
    }

    #[test]
    fn identity_images_share_the_uv_varying() {
        let material = DefaultMaterial::default();
        let mut pipeline = VertexPipeline::new(MaterialKey::default());
        pipeline.begin_vertex_generation(&material);
        pipeline.begin_fragment_generation(&material);

        let image = RenderableImage::new(MapType::BaseColor);
        let coord = pipeline.generate_image_uv_sampler(&image);
        assert_eq!(coord, "var_tex_coord0");

        let mut transformed = RenderableImage::new(MapType::Emissive);
        transformed.invert_uv = true;
        let coord = pipeline.generate_image_uv_coordinates(&transformed);
        assert_eq!(coord, "emissive_uv_coords");

        pipeline.end_vertex_generation();
        pipeline.end_fragment_generation();
        let shader = pipeline.finalize_sources();
        assert!(shader.vertex_source.contains("uniform vec3 emissive_offsets;"));
        assert!(!shader.vertex_source.contains("base_color_offsets"));
    }
}
