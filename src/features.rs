//! Optional-pass feature flags.
//!
//! A [`FeatureSet`] is the ordered list of (feature, enabled) pairs handed
//! to both the shader generator and the uniform binder for one pass. The
//! ordering participates in the program cache key, so callers must build
//! the set the same way every frame.

use std::fmt::Write as _;

use smallvec::SmallVec;

/// Optional shader regions that can be compiled in per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Screen-space ambient occlusion sampling.
    Ssao,
    /// Shadow map sampling for shadow-casting lights.
    ShadowMaps,
    /// Depth-only pre-pass.
    DepthPass,
    /// Orthographic (directional light) shadow render pass.
    OrthoShadowPass,
    /// Cube (point/spot light) shadow render pass.
    CubeShadowPass,
}

impl Feature {
    /// Stable name used for lookup and cache-key construction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Feature::Ssao => "SSAO",
            Feature::ShadowMaps => "SSM",
            Feature::DepthPass => "DEPTH_PASS",
            Feature::OrthoShadowPass => "ORTHO_SHADOW_PASS",
            Feature::CubeShadowPass => "CUBE_SHADOW_PASS",
        }
    }
}

/// Ordered collection of per-pass feature flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    entries: SmallVec<[(Feature, bool); 8]>,
}

impl FeatureSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    /// Appends or updates a feature flag, preserving first-set ordering.
    pub fn set(&mut self, feature: Feature, enabled: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|(f, _)| *f == feature) {
            entry.1 = enabled;
        } else {
            self.entries.push((feature, enabled));
        }
    }

    /// Whether a feature is present and enabled.
    #[must_use]
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.entries
            .iter()
            .any(|&(f, enabled)| f == feature && enabled)
    }

    /// Name-based lookup, mirroring how generated defines are resolved.
    #[must_use]
    pub fn is_enabled_by_name(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|&(f, enabled)| f.as_str() == name && enabled)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &(Feature, bool)> {
        self.entries.iter()
    }

    /// Appends a canonical fingerprint of the set to a cache key.
    pub fn append_cache_string(&self, out: &mut String) {
        for &(feature, enabled) in &self.entries {
            let _ = write!(out, ";{}={}", feature.as_str(), u8::from(enabled));
        }
    }
}

impl From<&[(Feature, bool)]> for FeatureSet {
    fn from(entries: &[(Feature, bool)]) -> Self {
        let mut set = Self::new();
        for &(feature, enabled) in entries {
            set.set(feature, enabled);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_lookup() {
        let mut features = FeatureSet::new();
        features.set(Feature::Ssao, true);
        features.set(Feature::ShadowMaps, false);

        assert!(features.is_enabled(Feature::Ssao));
        assert!(!features.is_enabled(Feature::ShadowMaps));
        assert!(!features.is_enabled(Feature::DepthPass));
        assert!(features.is_enabled_by_name("SSAO"));
    }

    #[test]
    fn update_preserves_order() {
        let mut features = FeatureSet::new();
        features.set(Feature::Ssao, false);
        features.set(Feature::DepthPass, true);
        features.set(Feature::Ssao, true);

        let order: Vec<_> = features.iter().map(|&(f, _)| f).collect();
        assert_eq!(order, vec![Feature::Ssao, Feature::DepthPass]);
        assert!(features.is_enabled(Feature::Ssao));
    }

    #[test]
    fn cache_string_reflects_order_and_state() {
        let features =
            FeatureSet::from(&[(Feature::ShadowMaps, true), (Feature::Ssao, false)][..]);
        let mut key = String::new();
        features.append_cache_string(&mut key);
        assert_eq!(key, ";SSM=1;SSAO=0");
    }
}
