//! External-collaborator data carriers.
//!
//! This crate emits shader text and uniform values; the GPU device, render
//! passes and texture resources live in the rendering backend. The types
//! here are the read-only views of that backend state which the generator
//! and binder consume: the active camera, the scene's global render
//! properties, the shadow-map manager's per-light entries, and opaque
//! texture handles.

use glam::{Mat4, Vec3};

/// Opaque handle to a backend-owned texture resource.
///
/// The binder only forwards handles; it never dereferences them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Camera state for the pass being prepared.
#[derive(Debug, Clone)]
pub struct RenderCamera {
    pub global_position: Vec3,
    pub global_transform: Mat4,
    pub projection: Mat4,
    pub clip_near: f32,
    pub clip_far: f32,
}

impl RenderCamera {
    /// View-projection matrix, before clip-space correction.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.global_transform.inverse()
    }
}

/// Pre-filtered environment probe used for image-based lighting.
#[derive(Debug, Clone)]
pub struct LightProbe {
    /// Backend texture; `None` means the probe has no valid data yet and
    /// must be ignored during binding.
    pub texture: Option<TextureHandle>,
    pub mipmap_count: u32,
}

/// One light's shadow-map resources, owned by the backend.
#[derive(Debug, Clone)]
pub struct ShadowMapEntry {
    /// Light view matrix (cube shadows sample with this).
    pub light_view: Mat4,
    /// Light view-projection matrix (orthographic shadows sample with this).
    pub light_view_projection: Mat4,
    /// Depth map for directional lights.
    pub depth_map: Option<TextureHandle>,
    /// Depth cube for point and spot lights.
    pub depth_cube: Option<TextureHandle>,
}

/// Lookup of shadow-map entries by light index.
#[derive(Debug, Default)]
pub struct ShadowMapManager {
    entries: Vec<Option<ShadowMapEntry>>,
}

impl ShadowMapManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set_entry(&mut self, light_index: usize, entry: ShadowMapEntry) {
        if self.entries.len() <= light_index {
            self.entries.resize(light_index + 1, None);
        }
        self.entries[light_index] = Some(entry);
    }

    #[must_use]
    pub fn entry(&self, light_index: usize) -> Option<&ShadowMapEntry> {
        self.entries.get(light_index).and_then(Option::as_ref)
    }
}

/// Scene-level render properties shared by every material in a pass.
#[derive(Debug)]
pub struct LayerRenderProperties {
    pub camera_direction: Vec3,
    /// Scene light probe; a material-level probe overrides it.
    pub light_probe: Option<LightProbe>,
    pub probe_orientation: Mat4,
    pub probe_horizon: f32,
    pub probe_exposure: f32,
    pub shadow_map_manager: ShadowMapManager,
    pub depth_texture: Option<TextureHandle>,
    pub ssao_texture: Option<TextureHandle>,
    pub screen_texture: Option<TextureHandle>,
    /// Framebuffer Y orientation of the active graphics backend.
    pub is_y_up_in_framebuffer: bool,
    /// Whether clip-space depth runs zero-to-one (D3D/Vulkan/Metal) or
    /// minus-one-to-one (OpenGL).
    pub is_clip_depth_zero_to_one: bool,
}

impl Default for LayerRenderProperties {
    fn default() -> Self {
        Self {
            camera_direction: Vec3::NEG_Z,
            light_probe: None,
            probe_orientation: Mat4::IDENTITY,
            probe_horizon: -1.0,
            probe_exposure: 1.0,
            shadow_map_manager: ShadowMapManager::new(),
            depth_texture: None,
            ssao_texture: None,
            screen_texture: None,
            is_y_up_in_framebuffer: true,
            is_clip_depth_zero_to_one: true,
        }
    }
}

/// Mutable fixed-function state the binder feeds back to the backend.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub line_width: f32,
}
