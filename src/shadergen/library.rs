//! Registry of shader library includes and functions.
//!
//! Generated stages never embed shared GLSL; they request it by name and
//! the compiler inlines the text from this registry. Custom materials can
//! register additional functions before generation.

use rustc_hash::FxHashMap;

/// Named GLSL snippets available to generated stages.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    includes: FxHashMap<String, String>,
    functions: FxHashMap<String, String>,
}

impl ShaderLibrary {
    /// Empty library; generated code resolves nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Library preloaded with every include and function the built-in
    /// materials can request.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        for &(name, source) in BUILTIN_INCLUDES {
            library.register_include(name, source);
        }
        for &(name, source) in BUILTIN_FUNCTIONS {
            library.register_function(name, source);
        }
        library
    }

    pub fn register_include(&mut self, name: &str, source: &str) {
        self.includes.insert(name.to_owned(), source.to_owned());
    }

    pub fn register_function(&mut self, name: &str, source: &str) {
        self.functions.insert(name.to_owned(), source.to_owned());
    }

    #[must_use]
    pub fn include_source(&self, name: &str) -> Option<&str> {
        self.includes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn function_source(&self, name: &str) -> Option<&str> {
        self.functions.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

static BUILTIN_INCLUDES: &[(&str, &str)] = &[
    (
        "tonemapping.glsllib",
        "vec4 tonemap(vec4 c) { return vec4(c.rgb / (vec3(1.0) + c.rgb), c.a); }\n",
    ),
    (
        "shadow_mapping.glsllib",
        concat!(
            "float sample_orthographic_shadow(sampler2D map, vec4 control, vec4 pos) {\n",
            "    vec3 coord = pos.xyz / pos.w * 0.5 + 0.5;\n",
            "    float depth = texture(map, coord.xy).r;\n",
            "    return clamp(1.0 - control.y * exp(control.x * (coord.z - depth - control.z)), 0.0, 1.0);\n",
            "}\n",
            "float sample_cubemap_shadow(samplerCube map, vec4 control, vec3 dir) {\n",
            "    float depth = texture(map, dir).r * control.w;\n",
            "    return clamp(1.0 - control.y * exp(control.x * (length(dir) - depth - control.z)), 0.0, 1.0);\n",
            "}\n",
        ),
    ),
    (
        "ssao.glsllib",
        concat!(
            "float sample_ambient_occlusion(sampler2D ao, vec2 props, vec4 frag_coord) {\n",
            "    return texture(ao, frag_coord.xy * props).r;\n",
            "}\n",
        ),
    ),
    (
        "light_probe.glsllib",
        concat!(
            "vec3 sample_probe_diffuse(samplerCube probe, mat4 orient, vec3 n, vec4 props) {\n",
            "    return textureLod(probe, mat3(orient) * n, props.x).rgb * props.w;\n",
            "}\n",
            "vec3 sample_probe_glossy(samplerCube probe, mat4 orient, vec3 r, vec4 props, float rough) {\n",
            "    return textureLod(probe, mat3(orient) * r, rough * props.x).rgb * props.w;\n",
            "}\n",
        ),
    ),
];

static BUILTIN_FUNCTIONS: &[(&str, &str)] = &[
    (
        "srgb_to_linear",
        "vec3 srgb_to_linear(vec3 c) { return c * (c * (c * 0.305306011 + 0.682171111) + 0.012522878); }\n",
    ),
    (
        "diffuse_reflection_bsdf",
        concat!(
            "vec4 diffuse_reflection_bsdf(vec3 n, vec3 l, vec3 color) {\n",
            "    return vec4(color * max(0.0, dot(n, l)), 1.0);\n",
            "}\n",
        ),
    ),
    (
        "diffuse_reflection_wrap_bsdf",
        concat!(
            "vec4 diffuse_reflection_wrap_bsdf(vec3 n, vec3 l, vec3 color, float wrap) {\n",
            "    return vec4(color * max(0.0, (dot(n, l) + wrap) / (1.0 + wrap)), 1.0);\n",
            "}\n",
        ),
    ),
    (
        "diffuse_burley_bsdf",
        concat!(
            "vec4 diffuse_burley_bsdf(vec3 n, vec3 l, vec3 v, vec3 color, float rough) {\n",
            "    float n_l = max(0.0, dot(n, l));\n",
            "    vec3 h = normalize(v + l);\n",
            "    float l_h = max(0.0, dot(l, h));\n",
            "    float fd90 = 0.5 + 2.0 * rough * l_h * l_h;\n",
            "    float lf = 1.0 + (fd90 - 1.0) * pow(1.0 - n_l, 5.0);\n",
            "    float vf = 1.0 + (fd90 - 1.0) * pow(1.0 - max(0.0, dot(n, v)), 5.0);\n",
            "    return vec4(color * n_l * lf * vf, 1.0);\n",
            "}\n",
        ),
    ),
    (
        "specular_bsdf",
        concat!(
            "vec3 specular_bsdf(vec3 n, vec3 l, vec3 v, vec3 color, float shininess) {\n",
            "    vec3 h = normalize(v + l);\n",
            "    return color * pow(max(0.0, dot(n, h)), shininess);\n",
            "}\n",
        ),
    ),
    (
        "specular_ggx_bsdf",
        concat!(
            "vec3 specular_ggx_bsdf(vec3 n, vec3 l, vec3 v, vec3 color, float rough) {\n",
            "    vec3 h = normalize(v + l);\n",
            "    float a2 = rough * rough;\n",
            "    float n_h = max(0.0, dot(n, h));\n",
            "    float d = a2 / max(1e-6, 3.14159265 * pow(n_h * n_h * (a2 - 1.0) + 1.0, 2.0));\n",
            "    return color * d * max(0.0, dot(n, l));\n",
            "}\n",
        ),
    ),
    (
        "specular_kggx_bsdf",
        concat!(
            "vec3 specular_kggx_bsdf(vec3 n, vec3 l, vec3 v, vec3 color, float rough, float ior) {\n",
            "    vec3 h = normalize(v + l);\n",
            "    float f = pow(1.0 - max(0.0, dot(v, h)), 5.0) * (1.0 - ior) + ior;\n",
            "    float a2 = rough * rough;\n",
            "    float n_h = max(0.0, dot(n, h));\n",
            "    float d = a2 / max(1e-6, 3.14159265 * pow(n_h * n_h * (a2 - 1.0) + 1.0, 2.0));\n",
            "    return color * f * d * max(0.0, dot(n, l));\n",
            "}\n",
        ),
    ),
    (
        "default_material_simple_fresnel",
        concat!(
            "float default_material_simple_fresnel(vec3 n, vec3 v, float metal, float power) {\n",
            "    float f0 = mix(0.04, 1.0, metal);\n",
            "    return f0 + (1.0 - f0) * pow(1.0 - max(0.0, dot(n, v)), power);\n",
            "}\n",
        ),
    ),
    (
        "default_material_fresnel",
        concat!(
            "float default_material_fresnel(vec3 n, vec3 v, float ior, float power) {\n",
            "    float f0 = pow((ior - 1.0) / (ior + 1.0), 2.0);\n",
            "    return f0 + (1.0 - f0) * pow(1.0 - max(0.0, dot(n, v)), power);\n",
            "}\n",
        ),
    ),
    (
        "calculate_point_light_attenuation",
        concat!(
            "float calculate_point_light_attenuation(vec3 fade, float dist) {\n",
            "    return 1.0 / (fade.x + fade.y * dist + fade.z * dist * dist);\n",
            "}\n",
        ),
    ),
    (
        "get_transformed_uv_coords",
        concat!(
            "vec2 get_transformed_uv_coords(vec3 uv, mat2 rot, vec3 offset) {\n",
            "    return rot * uv.xy + offset.xy;\n",
            "}\n",
        ),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_cover_the_generated_universe() {
        let library = ShaderLibrary::with_builtins();
        for name in [
            "tonemapping.glsllib",
            "shadow_mapping.glsllib",
            "ssao.glsllib",
            "light_probe.glsllib",
        ] {
            assert!(library.include_source(name).is_some(), "missing include {name}");
        }
        for name in [
            "diffuse_burley_bsdf",
            "diffuse_reflection_bsdf",
            "specular_ggx_bsdf",
            "calculate_point_light_attenuation",
            "get_transformed_uv_coords",
        ] {
            assert!(library.has_function(name), "missing function {name}");
        }
    }

    #[test]
    fn custom_registrations_shadow_nothing_by_default() {
        let mut library = ShaderLibrary::new();
        assert!(library.function_source("user_fn").is_none());
        library.register_function("user_fn", "float user_fn() { return 1.0; }\n");
        assert!(library.has_function("user_fn"));
    }
}
