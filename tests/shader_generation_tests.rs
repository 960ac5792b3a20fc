//! End-to-end shader generation tests: text structure, determinism and
//! cache behavior across representative material configurations.

use glam::Vec3;

use lustre::{
    generate_material_shader, AlphaMode, CustomMaterial, DefaultMaterial, Feature, FeatureSet,
    MapType, MaterialAdapter, MaterialFlags, MaterialKey, PrincipledMaterial, ProgramCache,
    RenderableImage, ShaderLibrary, ShaderLight, VertexAttributes, VertexPipeline,
};

fn lit_key() -> MaterialKey {
    MaterialKey::new(
        MaterialFlags::FRESNEL_ENABLED,
        VertexAttributes::NORMAL | VertexAttributes::TEXCOORD0,
    )
}

fn generate(
    key: MaterialKey,
    features: &FeatureSet,
    adapter: &dyn MaterialAdapter,
    lights: &[ShaderLight],
    images: &[RenderableImage],
) -> (String, String) {
    let _ = env_logger::builder().is_test(true).try_init();
    let library = ShaderLibrary::with_builtins();
    let mut cache = ProgramCache::new();
    let mut pipeline = VertexPipeline::new(key);
    let id = generate_material_shader(
        "test_material",
        &mut pipeline,
        &key,
        features,
        adapter,
        lights,
        images,
        &library,
        &mut cache,
    )
    .expect("generation should succeed with the builtin library");
    let program = cache.get(id);
    (
        program.vertex_source().to_owned(),
        program.fragment_source().to_owned(),
    )
}

#[test]
fn identical_inputs_produce_byte_identical_text() {
    let material = PrincipledMaterial::default();
    let lights = vec![
        ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE),
        ShaderLight::point(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE),
    ];
    let images = vec![RenderableImage::new(MapType::BaseColor)];
    let features = FeatureSet::from(&[(Feature::Ssao, true)][..]);

    let (vert_a, frag_a) = generate(lit_key(), &features, &material, &lights, &images);
    let (vert_b, frag_b) = generate(lit_key(), &features, &material, &lights, &images);
    assert_eq!(vert_a, vert_b, "vertex text must be deterministic");
    assert_eq!(frag_a, frag_b, "fragment text must be deterministic");
}

#[test]
fn per_light_blocks_scale_with_the_light_list() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::new();

    let one = vec![ShaderLight::point(Vec3::ZERO, Vec3::ONE)];
    let three = vec![
        ShaderLight::point(Vec3::ZERO, Vec3::ONE),
        ShaderLight::point(Vec3::X, Vec3::ONE),
        ShaderLight::point(Vec3::Y, Vec3::ONE),
    ];

    let (_, frag_one) = generate(lit_key(), &features, &material, &one, &[]);
    let (_, frag_three) = generate(lit_key(), &features, &material, &three, &[]);

    assert!(frag_one.contains("light0_relative_direction"));
    assert!(!frag_one.contains("light1_relative_direction"));
    assert!(frag_three.contains("light2_relative_direction"));
    assert!(frag_three.contains("light_source lights[3]"));
}

#[test]
fn light_index_suffixes_follow_caller_order() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::new();
    let lights = vec![
        ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE),
        ShaderLight::spot(Vec3::ZERO, Vec3::NEG_Z, Vec3::ONE, 45.0),
    ];

    let (_, frag) = generate(lit_key(), &features, &material, &lights, &[]);
    // Index 0 is the directional light, index 1 the spot.
    assert!(frag.contains("lights[0].diffuse"));
    assert!(frag.contains("light1_spot_angle"));
    assert!(!frag.contains("light0_spot_angle"));
}

#[test]
fn depth_pass_suppresses_all_shading() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::from(&[(Feature::DepthPass, true)][..]);
    let lights = vec![ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE)];
    let images = vec![RenderableImage::new(MapType::BaseColor)];

    let (_, frag) = generate(lit_key(), &features, &material, &lights, &images);
    assert!(!frag.contains("global_diffuse_light"), "no lighting in a depth pass");
    assert!(!frag.contains("base_color_sampler"), "no image sampling in a depth pass");
}

#[test]
fn ortho_shadow_pass_emits_adjusted_depth() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::from(&[(Feature::OrthoShadowPass, true)][..]);

    let (vert, frag) = generate(lit_key(), &features, &material, &[], &[]);
    assert!(vert.contains("var_depth"));
    assert!(frag.contains("shadow_depth_adjust"));
    assert!(frag.contains("frag_output = vec4(depth);"));
}

#[test]
fn cube_shadow_pass_emits_normalized_distance() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::from(&[(Feature::CubeShadowPass, true)][..]);

    let (vert, frag) = generate(lit_key(), &features, &material, &[], &[]);
    assert!(vert.contains("var_shadow_world_pos"));
    assert!(frag.contains("length(from_light) / camera_properties.y"));
}

#[test]
fn masked_alpha_mode_emits_the_cutoff_discard() {
    let material = PrincipledMaterial {
        alpha_mode: AlphaMode::Mask,
        ..PrincipledMaterial::default()
    };
    let images = vec![RenderableImage::new(MapType::BaseColor)];

    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &material, &[], &images);
    assert!(frag.contains("< material_properties3.y"), "cutoff test missing");
    assert!(frag.contains("frag_output = vec4(0.0);"));
    assert!(frag.contains("return;"));

    let opaque = PrincipledMaterial::default();
    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &opaque, &[], &images);
    assert!(!frag.contains("< material_properties3.y"));
}

#[test]
fn spot_lights_cull_on_the_outer_cone_and_smoothstep_the_edge() {
    let material = PrincipledMaterial::default();
    let lights = vec![ShaderLight::spot(Vec3::ZERO, Vec3::NEG_Z, Vec3::ONE, 50.0)];

    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &material, &lights, &[]);
    assert!(frag.contains("if (light0_spot_angle > lights[0].cone.x)"));
    assert!(frag.contains("smoothstep(lights[0].cone.x, lights[0].cone.y"));
}

#[test]
fn shadowed_lights_declare_index_suffixed_shadow_uniforms() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::from(&[(Feature::ShadowMaps, true)][..]);
    let mut directional = ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE);
    directional.cast_shadow = true;
    let mut point = ShaderLight::point(Vec3::ZERO, Vec3::ONE);
    point.cast_shadow = true;
    let lights = vec![directional, point];

    let (_, frag) = generate(lit_key(), &features, &material, &lights, &[]);
    assert!(frag.contains("uniform sampler2D shadowmap0;"));
    assert!(frag.contains("uniform mat4 shadowmap0_matrix;"));
    assert!(frag.contains("uniform samplerCube shadowcube1;"));
    assert!(frag.contains("sample_orthographic_shadow"));
    assert!(frag.contains("sample_cubemap_shadow"));
}

#[test]
fn unlit_material_generates_a_minimal_body() {
    let material = DefaultMaterial {
        lighting: false,
        ..DefaultMaterial::default()
    };
    let images = vec![RenderableImage::new(MapType::Diffuse)];

    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &material, &[], &images);
    assert!(frag.contains("diffuse_sampler"));
    assert!(frag.contains("tonemap"));
    assert!(!frag.contains("global_diffuse_light"));
    assert!(!frag.contains("light_ambient_total"));
}

#[test]
fn every_map_type_generates_without_panicking() {
    let material = PrincipledMaterial::default();
    let lights = vec![ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE)];
    let images: Vec<RenderableImage> =
        MapType::ALL.iter().map(|&t| RenderableImage::new(t)).collect();

    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &material, &lights, &images);
    // A few spot checks across the classification groups.
    assert!(frag.contains("metalness_sampler"));
    assert!(frag.contains("occlusion_sampler"));
    assert!(frag.contains("lightmap_shadow_sampler"));
    assert!(frag.contains("unknown_sampler"));
}

#[test]
fn transformed_images_declare_per_image_uniforms_and_identity_images_do_not() {
    let material = PrincipledMaterial::default();
    let mut transformed = RenderableImage::new(MapType::Emissive);
    transformed.invert_uv = true;
    let images = vec![RenderableImage::new(MapType::BaseColor), transformed];
    let lights = vec![ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE)];

    let (vert, frag) = generate(lit_key(), &FeatureSet::new(), &material, &lights, &images);
    assert!(vert.contains("uniform vec3 emissive_offsets;"));
    assert!(vert.contains("uniform vec4 emissive_rotations;"));
    assert!(!vert.contains("base_color_offsets"));
    assert!(frag.contains("var_tex_coord0"), "identity image should share the UV varying");
}

#[test]
fn cache_hits_return_the_same_program() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::new();
    let key = lit_key();
    let library = ShaderLibrary::with_builtins();
    let mut cache = ProgramCache::new();

    let mut pipeline = VertexPipeline::new(key);
    let first = generate_material_shader(
        "m",
        &mut pipeline,
        &key,
        &features,
        &material,
        &[],
        &[],
        &library,
        &mut cache,
    )
    .unwrap();

    let mut pipeline = VertexPipeline::new(key);
    let second = generate_material_shader(
        "m",
        &mut pipeline,
        &key,
        &features,
        &material,
        &[],
        &[],
        &library,
        &mut cache,
    )
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.len(), 1, "second generation must be a cache hit");
}

#[test]
fn cache_keys_distinguish_light_kind_and_shadow_state() {
    use lustre::build_cache_key;

    let key = lit_key();
    let features = FeatureSet::new();
    let material = PrincipledMaterial::default();
    let point = vec![ShaderLight::point(Vec3::ZERO, Vec3::ONE)];
    let mut shadowed = vec![ShaderLight::point(Vec3::ZERO, Vec3::ONE)];
    shadowed[0].cast_shadow = true;
    let spot = vec![ShaderLight::spot(Vec3::ZERO, Vec3::NEG_Z, Vec3::ONE, 30.0)];

    let a = build_cache_key("m", &key, &features, &material, &point, &[]);
    let b = build_cache_key("m", &key, &features, &material, &shadowed, &[]);
    let c = build_cache_key("m", &key, &features, &material, &spot, &[]);
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_ne!(b, c);
}

#[test]
fn cache_keys_distinguish_image_sets_and_material_answers() {
    use lustre::build_cache_key;

    let key = lit_key();
    let features = FeatureSet::new();
    let material = PrincipledMaterial::default();

    let base = vec![RenderableImage::new(MapType::BaseColor)];
    let mut transformed = RenderableImage::new(MapType::BaseColor);
    transformed.invert_uv = true;
    let mut second_set = RenderableImage::new(MapType::BaseColor);
    second_set.uv_set = 1;

    let none = build_cache_key("m", &key, &features, &material, &[], &[]);
    let with_base = build_cache_key("m", &key, &features, &material, &[], &base);
    let with_transform = build_cache_key("m", &key, &features, &material, &[], &[transformed]);
    let with_uv1 = build_cache_key("m", &key, &features, &material, &[], &[second_set]);
    assert_ne!(none, with_base);
    assert_ne!(with_base, with_transform);
    assert_ne!(with_base, with_uv1);

    let classic = DefaultMaterial::default();
    let masked = PrincipledMaterial {
        alpha_mode: AlphaMode::Mask,
        ..PrincipledMaterial::default()
    };
    let classic_key = build_cache_key("m", &key, &features, &classic, &[], &[]);
    let masked_key = build_cache_key("m", &key, &features, &masked, &[], &[]);
    assert_ne!(none, classic_key);
    assert_ne!(none, masked_key);
}

#[test]
fn programs_with_different_image_sets_do_not_share_a_cache_entry() {
    let material = PrincipledMaterial::default();
    let features = FeatureSet::new();
    let key = lit_key();
    let lights = vec![ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE)];
    let images = vec![RenderableImage::new(MapType::BaseColor)];
    let library = ShaderLibrary::with_builtins();
    let mut cache = ProgramCache::new();

    let mut pipeline = VertexPipeline::new(key);
    let plain = generate_material_shader(
        "m",
        &mut pipeline,
        &key,
        &features,
        &material,
        &lights,
        &[],
        &library,
        &mut cache,
    )
    .unwrap();

    let mut pipeline = VertexPipeline::new(key);
    let textured = generate_material_shader(
        "m",
        &mut pipeline,
        &key,
        &features,
        &material,
        &lights,
        &images,
        &library,
        &mut cache,
    )
    .unwrap();

    assert_ne!(plain, textured, "image set must be part of the program identity");
    assert_eq!(cache.len(), 2);
    assert!(!cache.get(plain).fragment_source().contains("base_color_sampler"));
    assert!(cache.get(textured).fragment_source().contains("base_color_sampler"));
}

#[test]
fn specular_amount_map_turns_specular_on_and_seeds_its_base() {
    // Default material with specular dialed to zero; the map alone must
    // activate the specular path.
    let material = DefaultMaterial::default();
    let lights = vec![ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE)];
    let images = vec![RenderableImage::new(MapType::SpecularAmountMap)];

    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &material, &lights, &images);
    let seed = frag
        .find("specular_base = diffuse_color.rgb;")
        .expect("specular base must be assigned");
    let modulate = frag
        .find("specular_base *= texture(specular_amount_sampler")
        .expect("specular amount map must modulate the base");
    assert!(seed < modulate, "base must be assigned before the map multiplies it");
}

#[test]
fn emissive_map_seeds_emission_from_the_custom_override() {
    let material = CustomMaterial {
        fragment_snippet: String::from(
            "vec4 custom_base_color = vec4(1.0);\n\
             vec3 custom_emissive_color = vec3(0.3, 0.0, 0.0);\n\
             float custom_specular_amount = 1.0;\n\
             float custom_metalness_amount = 0.0;\n\
             float custom_roughness_amount = 0.4;\n",
        ),
        ..CustomMaterial::default()
    };
    let lights = vec![ShaderLight::directional(Vec3::NEG_Y, Vec3::ONE)];
    let images = vec![RenderableImage::new(MapType::Emissive)];

    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &material, &lights, &images);
    assert!(frag.contains("vec3 global_emission = custom_emissive_color;"));
    assert!(!frag.contains("vec3 global_emission = material_emissive_color;"));

    let plain = PrincipledMaterial::default();
    let (_, frag) = generate(lit_key(), &FeatureSet::new(), &plain, &lights, &images);
    assert!(frag.contains("vec3 global_emission = material_emissive_color;"));
}
