//! Runtime shader source generation.
//!
//! [`generate_material_shader`] is the front door: it drives the vertex
//! pipeline and the fragment synthesizer for one (material, key, features,
//! lights) configuration, then resolves the text through the program cache.
//! Identical inputs produce byte-identical text, so the cache key built
//! here is the only identity a program needs.

mod fragment;
mod library;
mod plan;
mod stage;
mod vertex;

pub use library::ShaderLibrary;
pub use plan::ShadingPlan;
pub use stage::StageGenerator;
pub use vertex::{VertexPipeline, MAX_BONE_COUNT};

use std::fmt::Write as _;

use crate::features::FeatureSet;
use crate::image::{MappingMode, RenderableImage};
use crate::key::MaterialKey;
use crate::light::ShaderLight;
use crate::material::{AlphaMode, MaterialAdapter, ShaderStage, SpecularModel};
use crate::program::{ProgramCache, ProgramId};

/// Finished stage text plus everything the compiler needs to resolve it.
#[derive(Debug, Clone)]
pub struct GeneratedShader {
    pub vertex_source: String,
    pub fragment_source: String,
    /// Declared uniforms, in declaration order: (name, GLSL type).
    pub uniforms: Vec<(String, String)>,
    /// Library includes both stages requested, in request order.
    pub includes: Vec<String>,
    /// Library functions both stages requested, in request order.
    pub functions: Vec<String>,
}

/// Builds the full program cache key for one configuration.
///
/// Layout: caller prefix, key fingerprint, feature fingerprint, adapter
/// fingerprint, one tag per light (kind character, `!` when it casts
/// shadow), then one record per image. Every generation input that changes
/// the emitted text is covered here except custom snippet and hook
/// function *bodies*; the caller's prefix must distinguish materials whose
/// snippet text differs.
#[must_use]
pub fn build_cache_key(
    key_prefix: &str,
    key: &MaterialKey,
    features: &FeatureSet,
    adapter: &dyn MaterialAdapter,
    lights: &[ShaderLight],
    images: &[RenderableImage],
) -> String {
    let mut cache_key = String::from(key_prefix);
    key.append_cache_string(&mut cache_key);
    features.append_cache_string(&mut cache_key);
    append_adapter_fingerprint(&mut cache_key, adapter);
    cache_key.push_str(";lights=");
    for light in lights {
        cache_key.push(light.kind.tag());
        if light.cast_shadow {
            cache_key.push('!');
        }
    }
    cache_key.push_str(";images=");
    for image in images {
        let _ = write!(
            cache_key,
            "{}:{}{}{}{};",
            image.map_type as usize,
            image.uv_set,
            if image.is_transform_identity() { 'i' } else { 't' },
            if image.premultiplied { 'p' } else { '-' },
            match image.mapping_mode {
                MappingMode::UvCoords => 'u',
                MappingMode::EnvironmentReflection => 'e',
            },
        );
    }
    cache_key
}

/// Adapter answers that steer generated text, rendered as a stable tag
/// string.
fn append_adapter_fingerprint(out: &mut String, adapter: &dyn MaterialAdapter) {
    out.push_str(";mat=");
    let bits = [
        ('l', adapter.has_lighting()),
        ('p', adapter.is_principled()),
        ('u', adapter.is_unshaded()),
        ('m', adapter.is_metalness_enabled()),
        ('v', adapter.is_vertex_colors_enabled()),
        ('s', adapter.is_specular_enabled()),
        ('w', adapter.diffuse_light_wrap() > 0.0),
        ('V', adapter.has_custom_shader_snippet(ShaderStage::Vertex)),
        ('F', adapter.has_custom_shader_snippet(ShaderStage::Fragment)),
        ('A', adapter.has_custom_function("custom_ambient_light_processor")),
        ('D', adapter.has_custom_function("custom_diffuse_light_processor")),
        ('S', adapter.has_custom_function("custom_specular_light_processor")),
    ];
    for (tag, set) in bits {
        if set {
            out.push(tag);
        }
    }
    out.push(':');
    out.push(match adapter.alpha_mode() {
        AlphaMode::Default => 'd',
        AlphaMode::Mask => 'k',
        AlphaMode::Blend => 'b',
        AlphaMode::Opaque => 'o',
    });
    out.push(match adapter.specular_model() {
        SpecularModel::Default => 'd',
        SpecularModel::KGgx => 'g',
    });
}

/// Generates and compiles the shader program for one material pass.
///
/// A cache hit short-circuits before any text is produced.
///
/// # Errors
///
/// Propagates compile-time resolution failures from the program cache
/// (unknown includes or library functions).
#[allow(clippy::too_many_arguments)]
pub fn generate_material_shader(
    key_prefix: &str,
    pipeline: &mut VertexPipeline,
    key: &MaterialKey,
    features: &FeatureSet,
    adapter: &dyn MaterialAdapter,
    lights: &[ShaderLight],
    images: &[RenderableImage],
    library: &ShaderLibrary,
    cache: &mut ProgramCache,
) -> crate::errors::Result<ProgramId> {
    debug_assert_eq!(pipeline.key(), key, "pipeline built for a different key");

    let cache_key = build_cache_key(key_prefix, key, features, adapter, lights, images);
    if let Some(id) = cache.lookup(&cache_key) {
        log::trace!("material shader cache hit: {cache_key}");
        return Ok(id);
    }

    let plan = ShadingPlan::build(key, features, adapter, images);
    fragment::generate_fragment_shader(pipeline, key, adapter, lights, images, &plan);
    let shader = pipeline.finalize_sources();

    cache.compile_generated_shader(&cache_key, library, &shader)
}
