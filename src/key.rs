//! Bit-packed material shader key.
//!
//! A [`MaterialKey`] is the compact fingerprint of every material/geometry
//! flag that influences generated shader text. Identical key + identical
//! material adapter + identical feature/light inputs must produce
//! byte-identical shader source — the program cache depends on it — so the
//! key also renders itself into the canonical [`MaterialKey::cache_string`]
//! fingerprint appended to every cache key.
//!
//! The key is immutable for the duration of a generation pass.

use std::fmt::Write as _;

use bitflags::bitflags;

bitflags! {
    /// Material-level feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u16 {
        /// Fresnel attenuation of the specular amount is enabled.
        const FRESNEL_ENABLED = 1 << 0;
        /// Geometry is rendered double-sided; back faces flip the normal.
        const DOUBLE_SIDED = 1 << 1;
        /// An image-based-lighting probe is active for this material.
        const HAS_IBL = 1 << 2;
        /// Geometry uses points topology (enables point-size output).
        const USES_POINTS_TOPOLOGY = 1 << 3;
        /// Custom material requested the projection matrix uniform.
        const USES_PROJECTION_MATRIX = 1 << 4;
        /// Custom material requested the inverse projection matrix uniform.
        const USES_INVERSE_PROJECTION_MATRIX = 1 << 5;
    }
}

bitflags! {
    /// Vertex attributes present in the mesh this key was built for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VertexAttributes: u16 {
        const NORMAL = 1 << 0;
        const TEXCOORD0 = 1 << 1;
        const TEXCOORD1 = 1 << 2;
        const TANGENT = 1 << 3;
        const BINORMAL = 1 << 4;
        const COLOR = 1 << 5;
        const JOINT_AND_WEIGHT = 1 << 6;
    }
}

/// Texture channel selector for single-channel map lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureChannel {
    #[default]
    R = 0,
    G = 1,
    B = 2,
    A = 3,
}

impl TextureChannel {
    /// GLSL component swizzle for this channel.
    #[must_use]
    pub const fn swizzle(self) -> &'static str {
        match self {
            TextureChannel::R => ".r",
            TextureChannel::G => ".g",
            TextureChannel::B => ".b",
            TextureChannel::A => ".a",
        }
    }

    const fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => TextureChannel::R,
            1 => TextureChannel::G,
            2 => TextureChannel::B,
            _ => TextureChannel::A,
        }
    }
}

/// Material properties whose texture lookups are channel-selected.
///
/// Channel selection is always read from the key through this table; the
/// generator never hardcodes a swizzle for these maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelProperty {
    Opacity = 0,
    Roughness = 1,
    Metalness = 2,
    Occlusion = 3,
    Translucency = 4,
}

impl ChannelProperty {
    pub const ALL: [ChannelProperty; 5] = [
        ChannelProperty::Opacity,
        ChannelProperty::Roughness,
        ChannelProperty::Metalness,
        ChannelProperty::Occlusion,
        ChannelProperty::Translucency,
    ];

    const fn label(self) -> &'static str {
        match self {
            ChannelProperty::Opacity => "opacity",
            ChannelProperty::Roughness => "roughness",
            ChannelProperty::Metalness => "metalness",
            ChannelProperty::Occlusion => "occlusion",
            ChannelProperty::Translucency => "translucency",
        }
    }
}

/// Fixed-size bit-packed material shader key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialKey {
    flags: MaterialFlags,
    attributes: VertexAttributes,
    /// Five 2-bit channel selectors, indexed by [`ChannelProperty`].
    channels: u16,
}

impl MaterialKey {
    #[must_use]
    pub fn new(flags: MaterialFlags, attributes: VertexAttributes) -> Self {
        Self {
            flags,
            attributes,
            channels: 0,
        }
    }

    // ── Flag queries ─────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn fresnel_enabled(&self) -> bool {
        self.flags.contains(MaterialFlags::FRESNEL_ENABLED)
    }

    #[inline]
    #[must_use]
    pub fn is_double_sided(&self) -> bool {
        self.flags.contains(MaterialFlags::DOUBLE_SIDED)
    }

    #[inline]
    #[must_use]
    pub fn has_ibl(&self) -> bool {
        self.flags.contains(MaterialFlags::HAS_IBL)
    }

    #[inline]
    #[must_use]
    pub fn uses_points_topology(&self) -> bool {
        self.flags.contains(MaterialFlags::USES_POINTS_TOPOLOGY)
    }

    #[inline]
    #[must_use]
    pub fn uses_projection_matrix(&self) -> bool {
        self.flags.contains(MaterialFlags::USES_PROJECTION_MATRIX)
    }

    #[inline]
    #[must_use]
    pub fn uses_inverse_projection_matrix(&self) -> bool {
        self.flags
            .contains(MaterialFlags::USES_INVERSE_PROJECTION_MATRIX)
    }

    #[inline]
    #[must_use]
    pub fn has_attribute(&self, attribute: VertexAttributes) -> bool {
        self.attributes.contains(attribute)
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> VertexAttributes {
        self.attributes
    }

    // ── Channel selectors ────────────────────────────────────────────────

    /// Channel the given single-channel map samples from.
    #[must_use]
    pub fn texture_channel(&self, property: ChannelProperty) -> TextureChannel {
        TextureChannel::from_bits(self.channels >> (2 * property as u16))
    }

    pub fn set_texture_channel(&mut self, property: ChannelProperty, channel: TextureChannel) {
        let shift = 2 * property as u16;
        self.channels = (self.channels & !(0b11 << shift)) | ((channel as u16) << shift);
    }

    // ── Cache fingerprint ────────────────────────────────────────────────

    /// Appends the canonical key fingerprint to a program cache key.
    ///
    /// The rendering is stable across runs: same key, same string.
    pub fn append_cache_string(&self, out: &mut String) {
        let _ = write!(
            out,
            ";key:flags={:04x}:attrs={:04x}",
            self.flags.bits(),
            self.attributes.bits()
        );
        for property in ChannelProperty::ALL {
            let _ = write!(
                out,
                ":{}={}",
                property.label(),
                self.texture_channel(property).swizzle().trim_start_matches('.')
            );
        }
    }

    /// Canonical fingerprint as an owned string.
    #[must_use]
    pub fn cache_string(&self) -> String {
        let mut out = String::new();
        self.append_cache_string(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_packing_round_trips() {
        let mut key = MaterialKey::default();
        key.set_texture_channel(ChannelProperty::Roughness, TextureChannel::G);
        key.set_texture_channel(ChannelProperty::Metalness, TextureChannel::B);
        key.set_texture_channel(ChannelProperty::Opacity, TextureChannel::A);

        assert_eq!(key.texture_channel(ChannelProperty::Roughness), TextureChannel::G);
        assert_eq!(key.texture_channel(ChannelProperty::Metalness), TextureChannel::B);
        assert_eq!(key.texture_channel(ChannelProperty::Opacity), TextureChannel::A);
        // Untouched selectors default to R.
        assert_eq!(key.texture_channel(ChannelProperty::Occlusion), TextureChannel::R);
    }

    #[test]
    fn overwriting_a_channel_does_not_disturb_neighbors() {
        let mut key = MaterialKey::default();
        key.set_texture_channel(ChannelProperty::Roughness, TextureChannel::A);
        key.set_texture_channel(ChannelProperty::Metalness, TextureChannel::G);
        key.set_texture_channel(ChannelProperty::Roughness, TextureChannel::R);

        assert_eq!(key.texture_channel(ChannelProperty::Roughness), TextureChannel::R);
        assert_eq!(key.texture_channel(ChannelProperty::Metalness), TextureChannel::G);
    }

    #[test]
    fn cache_string_is_deterministic() {
        let mut key = MaterialKey::new(
            MaterialFlags::FRESNEL_ENABLED | MaterialFlags::DOUBLE_SIDED,
            VertexAttributes::NORMAL | VertexAttributes::TEXCOORD0,
        );
        key.set_texture_channel(ChannelProperty::Occlusion, TextureChannel::G);

        let a = key.cache_string();
        let b = key.cache_string();
        assert_eq!(a, b);
        assert!(a.contains("occlusion=g"), "fingerprint was: {a}");
    }

    #[test]
    fn different_flags_produce_different_fingerprints() {
        let plain = MaterialKey::default();
        let double_sided =
            MaterialKey::new(MaterialFlags::DOUBLE_SIDED, VertexAttributes::empty());
        assert_ne!(plain.cache_string(), double_sided.cache_string());
    }
}
