//! Per-frame uniform binding.
//!
//! [`set_material_uniforms`] populates every uniform slot the generator
//! could have declared for the same (material, key, features, lights)
//! tuple. The shading plan recomputed here is identical to the one the
//! generator used, so every conditional write below mirrors a conditional
//! declaration in the generated text. Shadow uniforms are the one
//! exception to "write iff declared": they are always written for lights
//! that declared them, real or zeroed, so the binding layout stays stable
//! while `receives_shadows` toggles.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::context::{LayerRenderProperties, PipelineState, RenderCamera};
use crate::features::FeatureSet;
use crate::image::{MapType, MappingMode, RenderableImage};
use crate::key::{MaterialKey, VertexAttributes};
use crate::light::{LightKind, LightRecord, ShaderLight};
use crate::material::MaterialAdapter;
use crate::program::{CompiledProgram, UniformValue};
use crate::shadergen::{ShadingPlan, MAX_BONE_COUNT};
use crate::trig::fast_cos;

/// Shadow matrix bias: clip space to [0, 1] texture space.
fn shadow_bias_matrix() -> Mat4 {
    Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5))
}

fn spot_cone_cosines(light: &ShaderLight) -> (f32, f32) {
    let outer = light.cone_angle;
    let inner = if light.inner_cone_angle < 0.0 {
        outer * 0.7
    } else {
        light.inner_cone_angle.min(outer)
    };
    (fast_cos(outer.to_radians()), fast_cos(inner.to_radians()))
}

fn light_record(light: &ShaderLight) -> LightRecord {
    let brightness = if light.enabled { light.brightness } else { 0.0 };
    let diffuse = light.diffuse_color * brightness;
    let specular = light.specular_color * brightness;
    let (cone_cos, inner_cone_cos) = match light.kind {
        LightKind::Spot => spot_cone_cosines(light),
        LightKind::Directional | LightKind::Point => (-1.0, -1.0),
    };
    LightRecord {
        position: light.position.extend(1.0).to_array(),
        direction: light.direction.extend(0.0).to_array(),
        diffuse: diffuse.extend(1.0).to_array(),
        specular: specular.extend(1.0).to_array(),
        // The fade coefficients arrive in UI units; translate to the
        // shader's world-distance polynomial.
        attenuation: [
            light.constant_fade,
            light.linear_fade * 0.01,
            light.quadratic_fade * 0.0001,
            0.0,
        ],
        cone: [cone_cos, inner_cone_cos, 0.0, 0.0],
    }
}

/// Binds all frame- and material-level uniforms for one renderable.
///
/// Must be called with the identical (adapter, key, features, lights,
/// images) tuple the program was generated from; the plan derived here
/// otherwise diverges from the declarations in the program text.
#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
pub fn set_material_uniforms(
    program: &mut CompiledProgram,
    pipeline_state: &mut PipelineState,
    adapter: &dyn MaterialAdapter,
    key: &MaterialKey,
    features: &FeatureSet,
    camera: &RenderCamera,
    model_view_projection: &Mat4,
    normal_matrix: &Mat3,
    global_transform: &Mat4,
    clip_correction: &Mat4,
    bone_globals: &[Mat4],
    bone_normals: &[Mat3],
    images: &[RenderableImage],
    opacity: f32,
    layer: &LayerRenderProperties,
    lights: &[ShaderLight],
    receives_shadows: bool,
    shadow_depth_adjust: Vec2,
) {
    let plan = ShadingPlan::build(key, features, adapter, images);
    let unshaded = adapter.is_unshaded();

    // Camera block, written for every program.
    program.common_indices.camera_position = program.set_uniform(
        "camera_position",
        UniformValue::Vec3(camera.global_position),
        program.common_indices.camera_position,
    );
    program.common_indices.camera_direction = program.set_uniform(
        "camera_direction",
        UniformValue::Vec3(layer.camera_direction),
        program.common_indices.camera_direction,
    );
    program.common_indices.camera_properties = program.set_uniform(
        "camera_properties",
        UniformValue::Vec2(Vec2::new(camera.clip_near, camera.clip_far)),
        program.common_indices.camera_properties,
    );

    // Projection matrices only exist when a custom material asked.
    if key.uses_projection_matrix() {
        program.common_indices.projection_matrix = program.set_uniform(
            "projection_matrix",
            UniformValue::Mat4(*clip_correction * camera.projection),
            program.common_indices.projection_matrix,
        );
    }
    if key.uses_inverse_projection_matrix() {
        program.common_indices.inverse_projection_matrix = program.set_uniform(
            "inverse_projection_matrix",
            UniformValue::Mat4((*clip_correction * camera.projection).inverse()),
            program.common_indices.inverse_projection_matrix,
        );
    }

    program.common_indices.model_view_projection = program.set_uniform(
        "model_view_projection",
        UniformValue::Mat4(*clip_correction * *model_view_projection),
        program.common_indices.model_view_projection,
    );
    program.common_indices.normal_matrix = program.set_uniform(
        "normal_matrix",
        UniformValue::Mat3(*normal_matrix),
        program.common_indices.normal_matrix,
    );
    program.common_indices.model_matrix = program.set_uniform(
        "model_matrix",
        UniformValue::Mat4(*global_transform),
        program.common_indices.model_matrix,
    );

    if key.has_attribute(VertexAttributes::JOINT_AND_WEIGHT) {
        let count = bone_globals.len().min(MAX_BONE_COUNT);
        program.common_indices.bone_transforms = program.set_uniform(
            "bone_transforms",
            UniformValue::Mat4Array(bone_globals[..count].to_vec()),
            program.common_indices.bone_transforms,
        );
        let normal_count = bone_normals.len().min(MAX_BONE_COUNT);
        program.common_indices.bone_normal_transforms = program.set_uniform(
            "bone_normal_transforms",
            UniformValue::Mat3Array(bone_normals[..normal_count].to_vec()),
            program.common_indices.bone_normal_transforms,
        );
    }

    // material_properties is declared by every fragment stage.
    program.common_indices.material_properties = program.set_uniform(
        "material_properties",
        UniformValue::Vec4(Vec4::new(
            adapter.specular_amount(),
            adapter.roughness(),
            adapter.metalness_amount(),
            opacity,
        )),
        program.common_indices.material_properties,
    );

    if key.uses_points_topology() {
        program.common_indices.material_point_size = program.set_uniform(
            "material_point_size",
            UniformValue::Float(adapter.point_size()),
            program.common_indices.material_point_size,
        );
    }
    pipeline_state.line_width = adapter.line_width();

    if plan.ortho_shadow_pass {
        program.common_indices.shadow_depth_adjust = program.set_uniform(
            "shadow_depth_adjust",
            UniformValue::Vec2(shadow_depth_adjust),
            program.common_indices.shadow_depth_adjust,
        );
    }

    if unshaded || plan.is_depth_or_shadow_pass() {
        adapter.set_custom_property_uniforms(program);
        return;
    }

    // Material vectors of the shaded path.
    program.common_indices.material_emissive_color = program.set_uniform(
        "material_emissive_color",
        UniformValue::Vec3(adapter.emissive_color()),
        program.common_indices.material_emissive_color,
    );
    program.common_indices.material_base_color = program.set_uniform(
        "material_base_color",
        UniformValue::Vec4(adapter.base_color()),
        program.common_indices.material_base_color,
    );
    program.common_indices.material_properties2 = program.set_uniform(
        "material_properties2",
        UniformValue::Vec4(Vec4::new(
            adapter.fresnel_power(),
            adapter.bump_amount(),
            adapter.translucent_falloff(),
            adapter.diffuse_light_wrap(),
        )),
        program.common_indices.material_properties2,
    );
    program.common_indices.material_properties3 = program.set_uniform(
        "material_properties3",
        UniformValue::Vec4(Vec4::new(
            adapter.occlusion_amount(),
            adapter.alpha_cutoff(),
            adapter.ior(),
            0.0,
        )),
        program.common_indices.material_properties3,
    );

    let has_sampled_image = (0..images.len()).any(|i| plan.image_is_sampled(i, images));
    if plan.has_lighting && (plan.specular_enabled || has_sampled_image) {
        program.common_indices.material_specular = program.set_uniform(
            "material_specular",
            UniformValue::Vec4(adapter.specular_tint().extend(adapter.ior())),
            program.common_indices.material_specular,
        );
    }

    if plan.has_lighting {
        bind_lights(program, &plan, layer, lights, receives_shadows);
        bind_light_probe(program, adapter, layer, &plan);
    }

    bind_images(program, &plan, images);

    if plan.ssao_enabled {
        let _ = program.set_uniform(
            "ssao_texture",
            UniformValue::Texture(layer.ssao_texture),
            None,
        );
    }

    adapter.set_custom_property_uniforms(program);
}

fn bind_lights(
    program: &mut CompiledProgram,
    plan: &ShadingPlan,
    layer: &LayerRenderProperties,
    lights: &[ShaderLight],
    receives_shadows: bool,
) {
    let mut ambient_total = Vec3::ZERO;
    for light in lights {
        if light.enabled {
            ambient_total += light.ambient_color;
        }
    }
    program.common_indices.light_ambient_total = program.set_uniform(
        "light_ambient_total",
        UniformValue::Vec3(ambient_total),
        program.common_indices.light_ambient_total,
    );

    program.light_records.clear();
    program.light_records.extend(lights.iter().map(light_record));

    // Shadow uniforms: one set per shadow-declaring light, written real or
    // zeroed so the binding layout never changes shape between frames.
    for (i, light) in lights.iter().enumerate() {
        if !(plan.shadow_maps_enabled && light.cast_shadow) {
            continue;
        }
        let entry = layer.shadow_map_manager.entry(i);
        let active = receives_shadows && entry.is_some();
        let control = if active {
            Vec4::new(
                light.shadow_factor,
                1.0,
                light.shadow_bias,
                light.shadow_map_far,
            )
        } else {
            Vec4::ZERO
        };
        match light.kind {
            LightKind::Directional => {
                let matrix = entry
                    .filter(|_| active)
                    .map_or(Mat4::ZERO, |e| shadow_bias_matrix() * e.light_view_projection);
                let texture = entry.filter(|_| active).and_then(|e| e.depth_map);
                let _ = program.set_uniform(
                    &format!("shadowmap{i}"),
                    UniformValue::Texture(texture),
                    None,
                );
                let _ = program.set_uniform(
                    &format!("shadowmap{i}_matrix"),
                    UniformValue::Mat4(matrix),
                    None,
                );
            }
            LightKind::Point | LightKind::Spot => {
                let texture = entry.filter(|_| active).and_then(|e| e.depth_cube);
                let _ = program.set_uniform(
                    &format!("shadowcube{i}"),
                    UniformValue::Texture(texture),
                    None,
                );
            }
        }
        let _ = program.set_uniform(
            &format!("shadowmap{i}_control"),
            UniformValue::Vec4(control),
            None,
        );
    }
}

/// IBL probe selection: material probe wins over the scene probe; with no
/// valid probe a sentinel properties vector tells the shader "no probe".
fn bind_light_probe(
    program: &mut CompiledProgram,
    adapter: &dyn MaterialAdapter,
    layer: &LayerRenderProperties,
    plan: &ShadingPlan,
) {
    if !plan.has_ibl {
        return;
    }
    let probe = adapter
        .ibl_probe()
        .filter(|p| p.texture.is_some())
        .or(layer.light_probe.as_ref().filter(|p| p.texture.is_some()));

    let properties = match probe {
        Some(probe) => Vec4::new(
            probe.mipmap_count as f32,
            0.0,
            layer.probe_horizon,
            layer.probe_exposure,
        ),
        None => Vec4::new(0.0, 0.0, -1.0, 0.0),
    };
    program.common_indices.light_probe_properties = program.set_uniform(
        "light_probe_properties",
        UniformValue::Vec4(properties),
        program.common_indices.light_probe_properties,
    );
    program.common_indices.light_probe_orientation = program.set_uniform(
        "light_probe_orientation",
        UniformValue::Mat4(layer.probe_orientation),
        program.common_indices.light_probe_orientation,
    );
    program.common_indices.light_probe_sampler = program.set_uniform(
        "light_probe",
        UniformValue::Texture(probe.and_then(|p| p.texture)),
        program.common_indices.light_probe_sampler,
    );
}

/// Per-image uniforms for every image the generated code samples.
/// Identity-transform images declared no offset/rotation uniforms, so none
/// are written for them.
fn bind_images(program: &mut CompiledProgram, plan: &ShadingPlan, images: &[RenderableImage]) {
    for (i, image) in images.iter().enumerate() {
        if !plan.image_is_sampled(i, images) {
            continue;
        }
        let names = image.map_type.names();
        let _ = program.set_uniform(
            names.sampler,
            UniformValue::Texture(image.texture),
            None,
        );
        if !image.is_transform_identity() && image.mapping_mode == MappingMode::UvCoords {
            let transform = &image.texture_transform;
            let offsets = Vec3::new(
                transform.w_axis.x,
                transform.w_axis.y,
                if image.premultiplied { 1.0 } else { 0.0 },
            );
            let rotations = Vec4::new(
                transform.x_axis.x,
                transform.y_axis.x,
                transform.x_axis.y,
                transform.y_axis.y,
            );
            let _ = program.set_uniform(names.offsets, UniformValue::Vec3(offsets), None);
            let _ = program.set_uniform(names.rotations, UniformValue::Vec4(rotations), None);
        }
        if image.map_type == MapType::Bump && plan.bump_or_normal() == Some((i, true)) {
            let _ = program.set_uniform(
                names.size,
                UniformValue::Vec2(image.texture_size),
                None,
            );
        }
    }
}
