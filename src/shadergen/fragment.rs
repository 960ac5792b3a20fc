//! Fragment shader synthesis.
//!
//! Emits the whole fragment-stage body for one material configuration, in
//! a fixed order: image classification has already happened in the shading
//! plan; this module walks the plan, the key and the light list and writes
//! straight-line accumulation code. The only early exits in the generated
//! logic are the masked-alpha discard and the depth/shadow-pass outputs.

use std::fmt::Write as _;

use crate::image::{MapType, RenderableImage};
use crate::key::{ChannelProperty, MaterialKey, VertexAttributes};
use crate::light::{LightKind, ShaderLight};
use crate::material::{AlphaMode, MaterialAdapter, ShaderStage, SpecularModel};

use super::plan::ShadingPlan;
use super::vertex::VertexPipeline;

/// Fragment coordinate expression for an image, routed through the shared
/// varying when the transform is identity.
fn image_frag_coords(pipeline: &mut VertexPipeline, image: &RenderableImage) -> String {
    if image.is_transform_identity() {
        pipeline.generate_image_uv_sampler(image)
    } else {
        pipeline.generate_image_uv_coordinates(image)
    }
}

fn channel_swizzle(key: &MaterialKey, property: ChannelProperty) -> &'static str {
    key.texture_channel(property).swizzle()
}

/// Drives the full generation pass for one material.
pub(crate) fn generate_fragment_shader(
    pipeline: &mut VertexPipeline,
    key: &MaterialKey,
    adapter: &dyn MaterialAdapter,
    lights: &[ShaderLight],
    images: &[RenderableImage],
    plan: &ShadingPlan,
) {
    pipeline.begin_vertex_generation(adapter);
    pipeline.begin_fragment_generation(adapter);

    // Unshaded custom materials own the output entirely; the snippet was
    // inserted by begin_fragment_generation.
    if adapter.is_unshaded() {
        pipeline.fragment_mut().add_outgoing("frag_output", "vec4");
        pipeline.end_vertex_generation();
        pipeline.end_fragment_generation();
        return;
    }

    if plan.is_depth_or_shadow_pass() {
        generate_pass_output(pipeline, plan);
        pipeline.end_vertex_generation();
        pipeline.end_fragment_generation();
        return;
    }

    let has_custom_frag = adapter.has_custom_shader_snippet(ShaderStage::Fragment);
    let has_image = (0..images.len()).any(|i| plan.image_is_sampled(i, images));
    let has_emissive_map = plan.slots.emissive.is_some();

    {
        let frag = pipeline.fragment_mut();
        frag.add_outgoing("frag_output", "vec4");
        // Declared unconditionally; unused ones are stripped downstream.
        frag.add_uniform("material_emissive_color", "vec3");
        frag.add_uniform("material_base_color", "vec4");
        frag.add_uniform("material_properties2", "vec4");
        frag.add_uniform("material_properties3", "vec4");
    }

    // Diffuse color seed: material base times vertex color.
    if plan.vertex_colors_enabled {
        pipeline.generate_vertex_color();
        pipeline
            .fragment_mut()
            .append("vec4 vertex_color = var_color;");
    } else {
        pipeline
            .fragment_mut()
            .append("vec4 vertex_color = vec4(1.0);");
    }
    if has_custom_frag {
        pipeline
            .fragment_mut()
            .append("vec4 diffuse_color = custom_base_color * vertex_color;");
    } else {
        pipeline
            .fragment_mut()
            .append("vec4 diffuse_color = material_base_color * vertex_color;");
    }

    if plan.has_lighting {
        generate_lit_body(
            pipeline,
            key,
            adapter,
            lights,
            images,
            plan,
            has_custom_frag,
            has_image,
            has_emissive_map,
        );
    } else {
        generate_unlit_body(pipeline, adapter, images, plan);
    }

    pipeline.end_vertex_generation();
    pipeline.end_fragment_generation();
}

/// Depth and shadow passes: position-derived output only.
fn generate_pass_output(pipeline: &mut VertexPipeline, plan: &ShadingPlan) {
    if plan.ortho_shadow_pass {
        pipeline.generate_depth();
        let frag = pipeline.fragment_mut();
        frag.add_outgoing("frag_output", "vec4");
        frag.add_uniform("shadow_depth_adjust", "vec2");
        frag.append("float depth = (var_depth + shadow_depth_adjust.x) * shadow_depth_adjust.y;");
        frag.append("frag_output = vec4(depth);");
    } else if plan.cube_shadow_pass {
        pipeline.generate_shadow_world_position();
        let frag = pipeline.fragment_mut();
        frag.add_outgoing("frag_output", "vec4");
        frag.add_uniform("camera_position", "vec3");
        frag.add_uniform("camera_properties", "vec2");
        frag.append("vec3 from_light = var_shadow_world_pos - camera_position;");
        frag.append("float dist = length(from_light) / camera_properties.y;");
        frag.append("frag_output = vec4(dist);");
    } else {
        let frag = pipeline.fragment_mut();
        frag.add_outgoing("frag_output", "vec4");
        frag.append("frag_output = vec4(0.0);");
    }
}

/// Unlit path: base image modulation and tonemapped diffuse output.
fn generate_unlit_body(
    pipeline: &mut VertexPipeline,
    adapter: &dyn MaterialAdapter,
    images: &[RenderableImage],
    plan: &ShadingPlan,
) {
    if let Some(base) = plan.slots.base {
        let image = &images[base];
        let coords = image_frag_coords(pipeline, image);
        let names = image.map_type.names();
        let frag = pipeline.fragment_mut();
        frag.add_uniform(names.sampler, "sampler2D");
        frag.add_function("srgb_to_linear");
        frag.append(format!(
            "vec4 base_texture_color = texture({}, {coords});",
            names.sampler
        ));
        frag.append("base_texture_color.rgb = srgb_to_linear(base_texture_color.rgb);");
        frag.append("diffuse_color *= base_texture_color;");
        if image.map_type == MapType::BaseColor && adapter.alpha_mode() == AlphaMode::Mask {
            frag.append("if ((base_texture_color.a * material_base_color.a) < material_properties3.y) {");
            frag.append("    frag_output = vec4(0.0);");
            frag.append("    return;");
            frag.append("}");
        }
    }
    let frag = pipeline.fragment_mut();
    frag.add_include("tonemapping.glsllib");
    frag.append("frag_output = tonemap(vec4(diffuse_color.rgb, diffuse_color.a * object_opacity));");
}

#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
fn generate_lit_body(
    pipeline: &mut VertexPipeline,
    key: &MaterialKey,
    adapter: &dyn MaterialAdapter,
    lights: &[ShaderLight],
    images: &[RenderableImage],
    plan: &ShadingPlan,
    has_custom_frag: bool,
    has_image: bool,
    has_emissive_map: bool,
) {
    let principled = adapter.is_principled();
    let double_sided = key.is_double_sided();

    // World normal, with the double-sided facing flip.
    pipeline.generate_world_position();
    if key.has_attribute(VertexAttributes::NORMAL) {
        pipeline.generate_world_normal();
        pipeline
            .fragment_mut()
            .append("vec3 org_normal = normalize(var_world_normal);");
    } else {
        pipeline.fragment_mut().append(
            "vec3 org_normal = normalize(cross(dFdx(var_world_pos), dFdy(var_world_pos)));",
        );
    }
    if double_sided {
        pipeline.generate_view_vector();
        let frag = pipeline.fragment_mut();
        frag.append("float facing = step(0.0, dot(view_vector, org_normal)) * 2.0 - 1.0;");
        frag.append("vec3 world_normal = org_normal * facing;");
    } else {
        pipeline
            .fragment_mut()
            .append("vec3 world_normal = org_normal;");
    }

    // Surface-detail map: perturb the normal through a tangent frame.
    if let Some((detail_index, is_bump)) = plan.bump_or_normal() {
        let image = images[detail_index].clone();
        let coords = image_frag_coords(pipeline, &image);
        if key.has_attribute(VertexAttributes::TANGENT) {
            pipeline.generate_tangent_binormal();
        } else {
            let frag = pipeline.fragment_mut();
            frag.append("vec3 dp1 = dFdx(var_world_pos);");
            frag.append("vec3 dp2 = dFdy(var_world_pos);");
            frag.append(format!("vec2 duv1 = dFdx({coords});"));
            frag.append(format!("vec2 duv2 = dFdy({coords});"));
            frag.append("vec3 tangent = normalize(dp1 * duv2.y - dp2 * duv1.y);");
            frag.append("vec3 binormal = normalize(-dp1 * duv2.x + dp2 * duv1.x);");
        }
        let names = image.map_type.names();
        let frag = pipeline.fragment_mut();
        frag.add_uniform(names.sampler, "sampler2D");
        if is_bump {
            frag.add_uniform(names.size, "vec2");
            frag.append(format!("vec2 bump_step = vec2(1.0) / {};", names.size));
            frag.append(format!(
                "float bump_center = texture({}, {coords}).r;",
                names.sampler
            ));
            frag.append(format!(
                "float bump_dx = texture({}, {coords} + vec2(bump_step.x, 0.0)).r - bump_center;",
                names.sampler
            ));
            frag.append(format!(
                "float bump_dy = texture({}, {coords} + vec2(0.0, bump_step.y)).r - bump_center;",
                names.sampler
            ));
            frag.append(
                "world_normal = normalize(world_normal - material_properties2.y * (bump_dx * tangent + bump_dy * binormal));",
            );
        } else {
            frag.append(format!(
                "vec3 normal_sample = texture({}, {coords}).xyz * 2.0 - vec3(1.0);",
                names.sampler
            ));
            frag.append(
                "world_normal = normalize(mat3(tangent, binormal, world_normal) * (normal_sample * vec3(material_properties2.y, material_properties2.y, 1.0)));",
            );
        }
        if double_sided {
            pipeline.fragment_mut().append("world_normal *= facing;");
        }
    }

    // Specular base and tint exist whenever specular or any image runs.
    if plan.specular_enabled || has_image {
        let frag = pipeline.fragment_mut();
        frag.add_uniform("material_specular", "vec4");
        frag.append("vec3 specular_base;");
        if has_custom_frag {
            frag.append("vec3 specular_tint = vec3(1.0);");
        } else {
            frag.append("vec3 specular_tint = material_specular.rgb;");
        }
    }

    // Metalness feeds ambient, fresnel and energy conservation below.
    if has_custom_frag {
        pipeline
            .fragment_mut()
            .append("float metalness_amount = custom_metalness_amount;");
    } else {
        pipeline
            .fragment_mut()
            .append("float metalness_amount = material_properties.z;");
    }
    if let Some(index) = plan.slots.metalness {
        if plan.image_is_sampled(index, images) {
            let image = images[index].clone();
            let coords = image_frag_coords(pipeline, &image);
            let names = image.map_type.names();
            let sw = channel_swizzle(key, ChannelProperty::Metalness);
            let frag = pipeline.fragment_mut();
            frag.add_uniform(names.sampler, "sampler2D");
            frag.append(format!(
                "float sampled_metalness = texture({}, {coords}){sw};",
                names.sampler
            ));
            frag.append("metalness_amount = clamp(metalness_amount * sampled_metalness, 0.0, 1.0);");
        }
    }

    // Ambient accumulation seeds the diffuse total.
    pipeline
        .fragment_mut()
        .add_uniform("light_ambient_total", "vec3");
    if adapter.has_custom_function("custom_ambient_light_processor") {
        let frag = pipeline.fragment_mut();
        frag.add_function("custom_ambient_light_processor");
        frag.append(
            "vec4 global_diffuse_light = vec4(custom_ambient_light_processor(light_ambient_total, diffuse_color.rgb), diffuse_color.a);",
        );
    } else {
        pipeline.fragment_mut().append(
            "vec4 global_diffuse_light = vec4(light_ambient_total * (1.0 - metalness_amount) * diffuse_color.rgb, diffuse_color.a);",
        );
    }
    {
        let frag = pipeline.fragment_mut();
        frag.append("vec3 global_specular_light = vec3(0.0);");
        // Same emissive source as the map-less path below.
        if has_emissive_map {
            if has_custom_frag {
                frag.append("vec3 global_emission = custom_emissive_color;");
            } else {
                frag.append("vec3 global_emission = material_emissive_color;");
            }
        }
        frag.append("vec3 tmp_light_color;");
    }

    // Lightmaps accumulate before direct lights.
    for slot in [plan.slots.lightmap_indirect, plan.slots.lightmap_radiosity] {
        if let Some(index) = slot {
            let image = images[index].clone();
            let coords = image_frag_coords(pipeline, &image);
            let names = image.map_type.names();
            let frag = pipeline.fragment_mut();
            frag.add_uniform(names.sampler, "sampler2D");
            frag.append(format!(
                "global_diffuse_light.rgb += texture({}, {coords}).rgb;",
                names.sampler
            ));
        }
    }

    // Translucency thickness drives the per-light transmission term.
    let has_translucency = plan.slots.translucency.is_some();
    if let Some(index) = plan.slots.translucency {
        let image = images[index].clone();
        let coords = image_frag_coords(pipeline, &image);
        let names = image.map_type.names();
        let sw = channel_swizzle(key, ChannelProperty::Translucency);
        let frag = pipeline.fragment_mut();
        frag.add_uniform(names.sampler, "sampler2D");
        frag.append(format!(
            "float translucent_thickness = texture({}, {coords}){sw};",
            names.sampler
        ));
        frag.append(
            "float translucent_thickness_exp = exp(translucent_thickness * material_properties2.z);",
        );
    }

    // Screen-space ambient occlusion factor.
    if plan.ssao_enabled {
        let frag = pipeline.fragment_mut();
        frag.add_include("ssao.glsllib");
        frag.add_uniform("ssao_texture", "sampler2D");
        frag.add_uniform("camera_properties", "vec2");
        frag.append(
            "float ao_factor = sample_ambient_occlusion(ssao_texture, camera_properties, gl_FragCoord);",
        );
    } else {
        pipeline.fragment_mut().append("float ao_factor = 1.0;");
    }

    // Roughness, optionally texture-modulated.
    if has_custom_frag {
        pipeline
            .fragment_mut()
            .append("float roughness_amount = custom_roughness_amount;");
    } else {
        pipeline
            .fragment_mut()
            .append("float roughness_amount = material_properties.y;");
    }
    if let Some(index) = plan.slots.roughness {
        if plan.image_is_sampled(index, images) {
            let image = images[index].clone();
            let coords = image_frag_coords(pipeline, &image);
            let names = image.map_type.names();
            let sw = channel_swizzle(key, ChannelProperty::Roughness);
            let frag = pipeline.fragment_mut();
            frag.add_uniform(names.sampler, "sampler2D");
            frag.append(format!(
                "roughness_amount *= texture({}, {coords}){sw};",
                names.sampler
            ));
        }
    }

    // Base color/diffuse map modulates the diffuse seed.
    if let Some(base) = plan.slots.base {
        let image = images[base].clone();
        let coords = image_frag_coords(pipeline, &image);
        let names = image.map_type.names();
        let frag = pipeline.fragment_mut();
        frag.add_uniform(names.sampler, "sampler2D");
        frag.add_function("srgb_to_linear");
        frag.append(format!(
            "vec4 base_texture_color = texture({}, {coords});",
            names.sampler
        ));
        frag.append("base_texture_color.rgb = srgb_to_linear(base_texture_color.rgb);");
        frag.append("diffuse_color *= base_texture_color;");
    }

    if plan.specular_enabled {
        pipeline.generate_view_vector();
        let frag = pipeline.fragment_mut();
        if principled {
            frag.append("specular_base = vec3(1.0);");
        } else {
            frag.append("specular_base = diffuse_color.rgb;");
        }
        if has_custom_frag {
            frag.append("float specular_factor = custom_specular_amount;");
        } else {
            frag.append("float specular_factor = material_properties.x;");
        }
    }
    if let Some(index) = plan.slots.specular_amount {
        let image = images[index].clone();
        let coords = image_frag_coords(pipeline, &image);
        let names = image.map_type.names();
        let frag = pipeline.fragment_mut();
        frag.add_uniform(names.sampler, "sampler2D");
        frag.append(format!(
            "specular_base *= texture({}, {coords}).rgb;",
            names.sampler
        ));
    }

    // Fresnel attenuation of the specular factor.
    if key.fresnel_enabled() && plan.specular_enabled {
        pipeline.generate_view_vector();
        let frag = pipeline.fragment_mut();
        if principled {
            frag.add_function("default_material_simple_fresnel");
            frag.append(
                "specular_factor *= default_material_simple_fresnel(world_normal, view_vector, metalness_amount, material_properties2.x);",
            );
            frag.append("specular_tint = mix(vec3(1.0), diffuse_color.rgb, metalness_amount);");
        } else if plan.metalness_enabled {
            frag.add_function("default_material_simple_fresnel");
            frag.append(
                "specular_factor *= default_material_simple_fresnel(world_normal, view_vector, metalness_amount, material_properties2.x);",
            );
        } else {
            frag.add_function("default_material_fresnel");
            frag.append(
                "specular_factor *= default_material_fresnel(world_normal, view_vector, material_properties3.z, material_properties2.x);",
            );
            frag.append("diffuse_color.rgb *= (1.0 - specular_factor);");
        }
    }

    generate_light_loop(
        pipeline,
        adapter,
        lights,
        plan,
        principled,
        has_translucency,
    );

    // Post-loop accumulation.
    {
        let frag = pipeline.fragment_mut();
        frag.append("global_diffuse_light.rgb *= ao_factor;");
        frag.append("global_diffuse_light.a = object_opacity * diffuse_color.a;");
    }
    if !has_emissive_map {
        if has_custom_frag {
            pipeline
                .fragment_mut()
                .append("global_diffuse_light.rgb += custom_emissive_color;");
        } else {
            pipeline
                .fragment_mut()
                .append("global_diffuse_light.rgb += material_emissive_color;");
        }
    }

    // Lightmap-only illumination needs the base color factored back in.
    let has_lightmaps =
        plan.slots.lightmap_indirect.is_some() || plan.slots.lightmap_radiosity.is_some();
    if has_lightmaps && lights.is_empty() && !plan.has_ibl {
        pipeline
            .fragment_mut()
            .append("global_diffuse_light.rgb *= diffuse_color.rgb;");
    }

    // Image-based lighting.
    if plan.has_ibl {
        pipeline.generate_view_vector();
        let frag = pipeline.fragment_mut();
        frag.add_include("light_probe.glsllib");
        frag.add_uniform("light_probe", "samplerCube");
        frag.add_uniform("light_probe_properties", "vec4");
        frag.add_uniform("light_probe_orientation", "mat4");
        frag.append(
            "global_diffuse_light.rgb += diffuse_color.rgb * (1.0 - metalness_amount) * sample_probe_diffuse(light_probe, light_probe_orientation, world_normal, light_probe_properties);",
        );
        if plan.specular_enabled {
            frag.append(
                "global_specular_light += specular_tint * specular_factor * sample_probe_glossy(light_probe, light_probe_orientation, reflect(-view_vector, world_normal), light_probe_properties, roughness_amount);",
            );
        }
    }

    generate_remaining_images(pipeline, key, adapter, images, plan);

    // Occlusion map lerps between occluded and unoccluded diffuse.
    if let Some(index) = plan.slots.occlusion {
        let image = images[index].clone();
        let coords = image_frag_coords(pipeline, &image);
        let names = image.map_type.names();
        let sw = channel_swizzle(key, ChannelProperty::Occlusion);
        let frag = pipeline.fragment_mut();
        frag.add_uniform(names.sampler, "sampler2D");
        frag.append(format!(
            "float occlusion_sample = texture({}, {coords}){sw};",
            names.sampler
        ));
        frag.append(
            "global_diffuse_light.rgb = mix(global_diffuse_light.rgb, global_diffuse_light.rgb * occlusion_sample, material_properties3.x);",
        );
    }

    // Metals have no diffuse term.
    if principled {
        pipeline
            .fragment_mut()
            .append("global_diffuse_light.rgb *= 1.0 - metalness_amount;");
    }

    if has_emissive_map {
        pipeline
            .fragment_mut()
            .append("global_diffuse_light.rgb += global_emission.rgb;");
    }

    let frag = pipeline.fragment_mut();
    frag.add_include("tonemapping.glsllib");
    frag.append(
        "frag_output = tonemap(vec4(global_diffuse_light.rgb + global_specular_light.rgb, global_diffuse_light.a));",
    );
}

/// Emits the per-light accumulation loop, unrolled with index-suffixed
/// variable names. The light order is the caller's; renumbering between
/// frames breaks program caching, not correctness.
fn generate_light_loop(
    pipeline: &mut VertexPipeline,
    adapter: &dyn MaterialAdapter,
    lights: &[ShaderLight],
    plan: &ShadingPlan,
    principled: bool,
    has_translucency: bool,
) {
    if lights.is_empty() {
        return;
    }

    let custom_diffuse = adapter.has_custom_function("custom_diffuse_light_processor");
    let custom_specular = adapter.has_custom_function("custom_specular_light_processor");
    let wrap = adapter.diffuse_light_wrap() > 0.0;

    {
        let frag = pipeline.fragment_mut();
        frag.add_definition(
            "struct light_source { vec4 position; vec4 direction; vec4 diffuse; vec4 specular; vec4 attenuation; vec4 cone; };",
        );
        frag.add_definition(format!(
            "layout(std140) uniform light_block {{ light_source lights[{}]; }};",
            lights.len()
        ));
        frag.append("float shadow_map_occl = 1.0;");
        frag.append("float light_attenuation = 1.0;");
        if custom_diffuse {
            frag.add_function("custom_diffuse_light_processor");
        }
        if custom_specular {
            frag.add_function("custom_specular_light_processor");
        }
    }
    pipeline.generate_world_position();
    if plan.specular_enabled {
        pipeline.generate_view_vector();
    }

    for (i, light) in lights.iter().enumerate() {
        let shadowed = plan.shadow_maps_enabled && light.cast_shadow;
        let mut body: Vec<String> = Vec::new();
        let mut indent = String::new();

        match light.kind {
            LightKind::Directional => {
                if shadowed {
                    let frag = pipeline.fragment_mut();
                    frag.add_include("shadow_mapping.glsllib");
                    frag.add_uniform(&format!("shadowmap{i}"), "sampler2D");
                    frag.add_uniform(&format!("shadowmap{i}_matrix"), "mat4");
                    frag.add_uniform(&format!("shadowmap{i}_control"), "vec4");
                    body.push(format!(
                        "vec4 shadow_coord{i} = shadowmap{i}_matrix * vec4(var_world_pos, 1.0);"
                    ));
                    body.push(format!(
                        "shadow_map_occl = sample_orthographic_shadow(shadowmap{i}, shadowmap{i}_control, shadow_coord{i});"
                    ));
                } else {
                    body.push("shadow_map_occl = 1.0;".to_owned());
                }
                body.push(format!(
                    "tmp_light_color = lights[{i}].diffuse.rgb * shadow_map_occl;"
                ));
                push_diffuse_accumulation(
                    &mut body,
                    pipeline,
                    &format!("-lights[{i}].direction.xyz"),
                    "",
                    principled,
                    custom_diffuse,
                    wrap,
                );
                if plan.specular_enabled {
                    push_specular_accumulation(
                        &mut body,
                        pipeline,
                        adapter,
                        i,
                        &format!("-lights[{i}].direction.xyz"),
                        "shadow_map_occl",
                        "",
                        principled,
                        custom_specular,
                    );
                }
            }
            LightKind::Point | LightKind::Spot => {
                body.push(format!(
                    "vec3 light{i}_relative_direction = var_world_pos - lights[{i}].position.xyz;"
                ));
                body.push(format!(
                    "float light{i}_distance = length(light{i}_relative_direction);"
                ));
                body.push(format!(
                    "vec3 light{i}_direction_normalized = light{i}_relative_direction / max(light{i}_distance, 0.0001);"
                ));
                if light.kind == LightKind::Spot {
                    // Cone cull runs per fragment; the smoothstep softens
                    // the edge between inner and outer cones.
                    body.push(format!(
                        "float light{i}_spot_angle = dot(light{i}_direction_normalized, normalize(lights[{i}].direction.xyz));"
                    ));
                    body.push(format!(
                        "if (light{i}_spot_angle > lights[{i}].cone.x) {{"
                    ));
                    indent = "    ".to_owned();
                    body.push(format!(
                        "{indent}float spot_factor = smoothstep(lights[{i}].cone.x, lights[{i}].cone.y, light{i}_spot_angle);"
                    ));
                }
                if shadowed {
                    let frag = pipeline.fragment_mut();
                    frag.add_include("shadow_mapping.glsllib");
                    frag.add_uniform(&format!("shadowcube{i}"), "samplerCube");
                    frag.add_uniform(&format!("shadowmap{i}_control"), "vec4");
                    body.push(format!(
                        "{indent}shadow_map_occl = sample_cubemap_shadow(shadowcube{i}, shadowmap{i}_control, light{i}_relative_direction);"
                    ));
                } else {
                    body.push(format!("{indent}shadow_map_occl = 1.0;"));
                }
                pipeline
                    .fragment_mut()
                    .add_function("calculate_point_light_attenuation");
                body.push(format!(
                    "{indent}light_attenuation = calculate_point_light_attenuation(lights[{i}].attenuation.xyz, light{i}_distance);"
                ));
                let scale = if light.kind == LightKind::Spot {
                    "light_attenuation * spot_factor"
                } else {
                    "light_attenuation"
                };
                if has_translucency {
                    body.push(format!(
                        "{indent}global_diffuse_light.rgb += {scale} * shadow_map_occl * translucent_thickness_exp * diffuse_color.rgb * lights[{i}].diffuse.rgb * max(0.0, dot(-world_normal, light{i}_direction_normalized)) * material_properties2.w;"
                    ));
                }
                body.push(format!(
                    "{indent}tmp_light_color = lights[{i}].diffuse.rgb * shadow_map_occl * {scale};"
                ));
                push_diffuse_accumulation(
                    &mut body,
                    pipeline,
                    &format!("-light{i}_direction_normalized"),
                    &indent,
                    principled,
                    custom_diffuse,
                    wrap,
                );
                if plan.specular_enabled {
                    push_specular_accumulation(
                        &mut body,
                        pipeline,
                        adapter,
                        i,
                        &format!("-light{i}_direction_normalized"),
                        &format!("shadow_map_occl * {scale}"),
                        &indent,
                        principled,
                        custom_specular,
                    );
                }
                if light.kind == LightKind::Spot {
                    body.push("}".to_owned());
                }
            }
        }

        let frag = pipeline.fragment_mut();
        for line in body {
            frag.append(line);
        }
    }
}

/// Diffuse BRDF line for one light; `indent` is non-empty inside a spot
/// cone conditional.
fn push_diffuse_accumulation(
    body: &mut Vec<String>,
    pipeline: &mut VertexPipeline,
    light_dir: &str,
    indent: &str,
    principled: bool,
    custom: bool,
    wrap: bool,
) {
    if custom {
        body.push(format!(
            "{indent}global_diffuse_light.rgb += diffuse_color.rgb * custom_diffuse_light_processor(world_normal, {light_dir}, tmp_light_color).rgb;"
        ));
    } else if principled {
        pipeline.fragment_mut().add_function("diffuse_burley_bsdf");
        body.push(format!(
            "{indent}global_diffuse_light.rgb += diffuse_color.rgb * diffuse_burley_bsdf(world_normal, {light_dir}, view_vector, tmp_light_color, roughness_amount).rgb;"
        ));
    } else if wrap {
        pipeline
            .fragment_mut()
            .add_function("diffuse_reflection_wrap_bsdf");
        body.push(format!(
            "{indent}global_diffuse_light.rgb += diffuse_color.rgb * diffuse_reflection_wrap_bsdf(world_normal, {light_dir}, tmp_light_color, material_properties2.w).rgb;"
        ));
    } else {
        pipeline
            .fragment_mut()
            .add_function("diffuse_reflection_bsdf");
        body.push(format!(
            "{indent}global_diffuse_light.rgb += diffuse_color.rgb * diffuse_reflection_bsdf(world_normal, {light_dir}, tmp_light_color).rgb;"
        ));
    }
}

#[allow(clippy::too_many_arguments)]
fn push_specular_accumulation(
    body: &mut Vec<String>,
    pipeline: &mut VertexPipeline,
    adapter: &dyn MaterialAdapter,
    index: usize,
    light_dir: &str,
    scale: &str,
    indent: &str,
    principled: bool,
    custom: bool,
) {
    let mut line = String::new();
    let _ = write!(
        line,
        "{indent}global_specular_light += specular_base * specular_tint * specular_factor * {scale} * "
    );
    if custom {
        let _ = write!(
            line,
            "custom_specular_light_processor(world_normal, {light_dir}, view_vector, lights[{index}].specular.rgb, roughness_amount);"
        );
    } else if principled {
        pipeline.fragment_mut().add_function("specular_ggx_bsdf");
        let _ = write!(
            line,
            "specular_ggx_bsdf(world_normal, {light_dir}, view_vector, lights[{index}].specular.rgb, roughness_amount);"
        );
    } else {
        match adapter.specular_model() {
            SpecularModel::KGgx => {
                pipeline.fragment_mut().add_function("specular_kggx_bsdf");
                let _ = write!(
                    line,
                    "specular_kggx_bsdf(world_normal, {light_dir}, view_vector, lights[{index}].specular.rgb, roughness_amount, material_properties3.z);"
                );
            }
            SpecularModel::Default => {
                pipeline.fragment_mut().add_function("specular_bsdf");
                let _ = write!(
                    line,
                    "specular_bsdf(world_normal, {light_dir}, view_vector, lights[{index}].specular.rgb, max(1.0, 256.0 * (1.0 - roughness_amount)));"
                );
            }
        }
    }
    body.push(line);
}

/// The remaining-images pass: every sampled image whose type was not
/// consumed by a dedicated step above gets sampled and applied here.
fn generate_remaining_images(
    pipeline: &mut VertexPipeline,
    key: &MaterialKey,
    adapter: &dyn MaterialAdapter,
    images: &[RenderableImage],
    plan: &ShadingPlan,
) {
    let remaining: Vec<usize> = (0..images.len())
        .filter(|&i| {
            plan.image_is_sampled(i, images)
                && !matches!(
                    images[i].map_type,
                    MapType::Bump
                        | MapType::Normal
                        | MapType::SpecularAmountMap
                        | MapType::Roughness
                        | MapType::Translucency
                        | MapType::Metalness
                        | MapType::Occlusion
                        | MapType::LightmapIndirect
                        | MapType::LightmapRadiosity
                )
        })
        .collect();
    if remaining.is_empty() {
        return;
    }

    pipeline.fragment_mut().append("vec4 texture_color;");
    for index in remaining {
        let image = images[index].clone();
        let coords = image_frag_coords(pipeline, &image);
        let names = image.map_type.names();
        let frag = pipeline.fragment_mut();
        frag.add_uniform(names.sampler, "sampler2D");
        frag.append(format!(
            "texture_color = texture({}, {coords});",
            names.sampler
        ));
        if image.premultiplied {
            frag.append(
                "texture_color.rgb = texture_color.a > 0.0 ? texture_color.rgb / texture_color.a : vec3(0.0);",
            );
        }
        match image.map_type {
            MapType::BaseColor => {
                // Color was folded into diffuse earlier; only the cutoff
                // test remains.
                if adapter.alpha_mode() == AlphaMode::Mask {
                    frag.append(
                        "if ((texture_color.a * material_base_color.a) < material_properties3.y) {",
                    );
                    frag.append("    frag_output = vec4(0.0);");
                    frag.append("    return;");
                    frag.append("}");
                }
            }
            MapType::Diffuse => {
                frag.append(
                    "global_diffuse_light.a *= material_base_color.a * texture_color.a;",
                );
            }
            MapType::LightmapShadow => {
                frag.append("global_diffuse_light *= texture_color;");
            }
            MapType::Specular => {
                frag.add_function("srgb_to_linear");
                frag.append(
                    "global_specular_light.rgb += srgb_to_linear(texture_color.rgb) * specular_tint;",
                );
                frag.append("global_diffuse_light.a *= texture_color.a;");
            }
            MapType::Opacity => {
                let sw = channel_swizzle(key, ChannelProperty::Opacity);
                frag.append(format!("global_diffuse_light.a *= texture_color{sw};"));
            }
            MapType::Emissive => {
                frag.add_function("srgb_to_linear");
                frag.append(
                    "global_emission *= srgb_to_linear(texture_color.rgb) * texture_color.a;",
                );
            }
            MapType::Unknown => {
                // Custom-material maps are sampled and bound but have no
                // built-in consumer.
            }
            MapType::Bump
            | MapType::Normal
            | MapType::SpecularAmountMap
            | MapType::Roughness
            | MapType::Translucency
            | MapType::Metalness
            | MapType::Occlusion
            | MapType::LightmapIndirect
            | MapType::LightmapRadiosity => unreachable!("consumed by dedicated steps"),
        }
    }
}
