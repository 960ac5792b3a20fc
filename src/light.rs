//! Per-frame light snapshots.
//!
//! A [`ShaderLight`] captures everything the generator and binder need to
//! know about one scene light. The list is rebuilt from the live scene each
//! frame and is read-only to this crate. The position of a light in the
//! list becomes its variable-name suffix in the generated shader, so the
//! caller must keep the ordering stable across frames for a given program
//! (renumbering forces a cache miss, not incorrect rendering, but wastes
//! the program cache).

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Scene light categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

impl LightKind {
    /// Short tag used in cache-key construction.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            LightKind::Directional => 'd',
            LightKind::Point => 'p',
            LightKind::Spot => 's',
        }
    }
}

/// Snapshot of one light, taken at pass-preparation time.
#[derive(Debug, Clone)]
pub struct ShaderLight {
    pub kind: LightKind,
    /// Disabled lights keep their slot in the generated code; the binder
    /// zeroes their brightness instead of renumbering the list.
    pub enabled: bool,
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub ambient_color: Vec3,
    /// World-space direction the light points in (directional and spot).
    pub direction: Vec3,
    /// World-space position (point and spot).
    pub position: Vec3,
    pub brightness: f32,
    pub constant_fade: f32,
    pub linear_fade: f32,
    pub quadratic_fade: f32,
    /// Outer cone angle in degrees (spot only).
    pub cone_angle: f32,
    /// Inner cone angle in degrees; negative means "derive from outer".
    pub inner_cone_angle: f32,
    pub cast_shadow: bool,
    pub shadow_bias: f32,
    pub shadow_factor: f32,
    pub shadow_map_far: f32,
}

/// Packed per-light uniform record, laid out to match the generated
/// `light_source` struct (six vec4 fields, std140-compatible).
///
/// The binder fills one record per light slot in the program; the backend
/// uploads the whole array with a single byte-cast.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    /// World position; w unused.
    pub position: [f32; 4],
    /// World direction; w unused.
    pub direction: [f32; 4],
    /// Diffuse color pre-multiplied by brightness.
    pub diffuse: [f32; 4],
    /// Specular color pre-multiplied by brightness.
    pub specular: [f32; 4],
    /// Constant, linear, quadratic attenuation; w unused.
    pub attenuation: [f32; 4],
    /// x = cos(outer cone), y = cos(inner cone); zw unused.
    pub cone: [f32; 4],
}

impl ShaderLight {
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            direction: direction.normalize_or_zero(),
            diffuse_color: color,
            ..Self::base()
        }
    }

    #[must_use]
    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            diffuse_color: color,
            ..Self::base()
        }
    }

    #[must_use]
    pub fn spot(position: Vec3, direction: Vec3, color: Vec3, cone_angle: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            position,
            direction: direction.normalize_or_zero(),
            diffuse_color: color,
            cone_angle,
            ..Self::base()
        }
    }

    fn base() -> Self {
        Self {
            kind: LightKind::Directional,
            enabled: true,
            diffuse_color: Vec3::ONE,
            specular_color: Vec3::ONE,
            ambient_color: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            position: Vec3::ZERO,
            brightness: 1.0,
            constant_fade: 1.0,
            linear_fade: 0.0,
            quadratic_fade: 1.0,
            cone_angle: 40.0,
            inner_cone_angle: -1.0,
            cast_shadow: false,
            shadow_bias: 0.0,
            shadow_factor: 5.0,
            shadow_map_far: 2000.0,
        }
    }
}
