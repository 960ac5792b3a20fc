//! Shared generator/binder shading decisions.
//!
//! The uniform binder must mirror the generator's conditionals exactly: a
//! uniform is written if and only if the generated text declared it. Both
//! sides therefore derive their control flow from one [`ShadingPlan`],
//! built from the identical (key, features, adapter, images) inputs.

use crate::features::{Feature, FeatureSet};
use crate::image::{MapType, RenderableImage};
use crate::key::{MaterialKey, VertexAttributes};
use crate::material::MaterialAdapter;

/// Classification of the image list into semantic slots.
///
/// Slots hold indices into the image slice handed to generation. When two
/// images claim the same slot the later one wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSlots {
    /// Diffuse or base-color map; both share this slot.
    pub base: Option<usize>,
    pub bump: Option<usize>,
    pub normal: Option<usize>,
    pub specular_amount: Option<usize>,
    pub roughness: Option<usize>,
    pub metalness: Option<usize>,
    pub occlusion: Option<usize>,
    pub emissive: Option<usize>,
    pub translucency: Option<usize>,
    pub lightmap_indirect: Option<usize>,
    pub lightmap_radiosity: Option<usize>,
    pub lightmap_shadow: Option<usize>,
}

/// The control-flow booleans and image classification for one pass.
#[derive(Debug, Clone)]
pub struct ShadingPlan {
    pub has_lighting: bool,
    pub specular_enabled: bool,
    pub metalness_enabled: bool,
    pub vertex_colors_enabled: bool,
    pub ssao_enabled: bool,
    pub shadow_maps_enabled: bool,
    pub depth_pass: bool,
    pub ortho_shadow_pass: bool,
    pub cube_shadow_pass: bool,
    pub has_ibl: bool,
    pub slots: ImageSlots,
}

impl ShadingPlan {
    /// Derives the plan for one (key, features, adapter, images) tuple.
    ///
    /// Depth and shadow passes override everything: lighting, SSAO, shadow
    /// sampling, specular, metalness and vertex colors are forced off and
    /// the base-image slot is cleared, leaving only position output.
    #[must_use]
    pub fn build(
        key: &MaterialKey,
        features: &FeatureSet,
        adapter: &dyn MaterialAdapter,
        images: &[RenderableImage],
    ) -> Self {
        let depth_pass = features.is_enabled(Feature::DepthPass);
        let ortho_shadow_pass = features.is_enabled(Feature::OrthoShadowPass);
        let cube_shadow_pass = features.is_enabled(Feature::CubeShadowPass);
        let pass_override = depth_pass || ortho_shadow_pass || cube_shadow_pass;

        let mut slots = ImageSlots::default();
        for (index, image) in images.iter().enumerate() {
            match image.map_type {
                MapType::Diffuse | MapType::BaseColor => slots.base = Some(index),
                MapType::Bump => slots.bump = Some(index),
                MapType::Normal => slots.normal = Some(index),
                MapType::SpecularAmountMap => slots.specular_amount = Some(index),
                MapType::Roughness => slots.roughness = Some(index),
                MapType::Metalness => slots.metalness = Some(index),
                MapType::Occlusion => slots.occlusion = Some(index),
                MapType::Emissive => slots.emissive = Some(index),
                MapType::Translucency => slots.translucency = Some(index),
                MapType::LightmapIndirect => slots.lightmap_indirect = Some(index),
                MapType::LightmapRadiosity => slots.lightmap_radiosity = Some(index),
                MapType::LightmapShadow => slots.lightmap_shadow = Some(index),
                MapType::Unknown | MapType::Opacity | MapType::Specular => {}
            }
        }
        if pass_override {
            slots.base = None;
        }

        // A specular-amount map modulates the specular base, so attaching
        // one turns specular shading on even when the material alone would
        // leave it off.
        let specular_enabled =
            (adapter.is_specular_enabled() || slots.specular_amount.is_some()) && !pass_override;

        Self {
            has_lighting: adapter.has_lighting() && !pass_override,
            specular_enabled,
            metalness_enabled: adapter.is_metalness_enabled() && !pass_override,
            vertex_colors_enabled: adapter.is_vertex_colors_enabled()
                && key.has_attribute(VertexAttributes::COLOR)
                && !pass_override,
            ssao_enabled: features.is_enabled(Feature::Ssao) && !pass_override,
            shadow_maps_enabled: features.is_enabled(Feature::ShadowMaps) && !pass_override,
            depth_pass,
            ortho_shadow_pass,
            cube_shadow_pass,
            has_ibl: key.has_ibl() && !pass_override,
            slots,
        }
    }

    /// Whether this pass only produces depth or distance output.
    #[inline]
    #[must_use]
    pub fn is_depth_or_shadow_pass(&self) -> bool {
        self.depth_pass || self.ortho_shadow_pass || self.cube_shadow_pass
    }

    /// The surface-detail map in effect: bump wins over normal when both
    /// are attached. Returns the index and whether it is a bump map.
    #[must_use]
    pub fn bump_or_normal(&self) -> Option<(usize, bool)> {
        match (self.slots.bump, self.slots.normal) {
            (Some(bump), _) => Some((bump, true)),
            (None, Some(normal)) => Some((normal, false)),
            (None, None) => None,
        }
    }

    /// Whether the fragment stage samples the image at `index`.
    ///
    /// The binder uses this to decide which offset/rotation uniforms were
    /// declared; it must match what the synthesizer emits, branch by
    /// branch.
    #[must_use]
    pub fn image_is_sampled(&self, index: usize, images: &[RenderableImage]) -> bool {
        if self.is_depth_or_shadow_pass() {
            return false;
        }
        if !self.has_lighting {
            return self.slots.base == Some(index);
        }
        if self.slots.base == Some(index) {
            return true;
        }
        if self.bump_or_normal().map(|(i, _)| i) == Some(index) {
            return true;
        }
        if (self.slots.metalness == Some(index) || self.slots.roughness == Some(index))
            && self.specular_enabled
        {
            return true;
        }
        if self.slots.specular_amount == Some(index)
            || self.slots.occlusion == Some(index)
            || self.slots.translucency == Some(index)
            || self.slots.lightmap_indirect == Some(index)
            || self.slots.lightmap_radiosity == Some(index)
        {
            return true;
        }
        // Everything else goes through the remaining-images pass, except
        // the single-purpose types consumed above.
        !matches!(
            images[index].map_type,
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PrincipledMaterial;

    #[test]
    fn depth_pass_overrides_lighting_and_base_image() {
        let key = MaterialKey::default();
        let mut features = FeatureSet::new();
        features.set(Feature::DepthPass, true);
        features.set(Feature::Ssao, true);
        let material = PrincipledMaterial::default();
        let images = vec![RenderableImage::new(MapType::BaseColor)];

        let plan = ShadingPlan::build(&key, &features, &material, &images);
        assert!(plan.is_depth_or_shadow_pass());
        assert!(!plan.has_lighting);
        assert!(!plan.ssao_enabled);
        assert!(plan.slots.base.is_none());
        assert!(!plan.image_is_sampled(0, &images));
    }

    #[test]
    fn later_image_wins_a_contested_slot() {
        let key = MaterialKey::default();
        let features = FeatureSet::new();
        let material = PrincipledMaterial::default();
        let images = vec![
            RenderableImage::new(MapType::Diffuse),
            RenderableImage::new(MapType::BaseColor),
        ];

        let plan = ShadingPlan::build(&key, &features, &material, &images);
        assert_eq!(plan.slots.base, Some(1));
    }

    #[test]
    fn bump_beats_normal_when_both_are_attached() {
        let key = MaterialKey::default();
        let features = FeatureSet::new();
        let material = PrincipledMaterial::default();
        let images = vec![
            RenderableImage::new(MapType::Normal),
            RenderableImage::new(MapType::Bump),
        ];

        let plan = ShadingPlan::build(&key, &features, &material, &images);
        assert_eq!(plan.bump_or_normal(), Some((1, true)));
        assert!(plan.image_is_sampled(1, &images));
        assert!(!plan.image_is_sampled(0, &images), "shadowed normal map must not sample");
    }

    #[test]
    fn specular_amount_map_forces_specular_on() {
        use crate::material::DefaultMaterial;

        let key = MaterialKey::default();
        let features = FeatureSet::new();
        // Default material keeps specular off on its own.
        let material = DefaultMaterial::default();
        assert!(!material.is_specular_enabled());
        let images = vec![RenderableImage::new(MapType::SpecularAmountMap)];

        let plan = ShadingPlan::build(&key, &features, &material, &images);
        assert!(plan.specular_enabled, "map attachment must enable specular");
        assert!(plan.image_is_sampled(0, &images));

        let mut features = FeatureSet::new();
        features.set(Feature::DepthPass, true);
        let plan = ShadingPlan::build(&key, &features, &material, &images);
        assert!(!plan.specular_enabled, "pass override still wins");
    }

    #[test]
    fn unlit_material_samples_only_the_base_image() {
        use crate::material::DefaultMaterial;

        let key = MaterialKey::default();
        let features = FeatureSet::new();
        let material = DefaultMaterial {
            lighting: false,
            ..DefaultMaterial::default()
        };
        let images = vec![
            RenderableImage::new(MapType::Diffuse),
            RenderableImage::new(MapType::Emissive),
        ];

        let plan = ShadingPlan::build(&key, &features, &material, &images);
        assert!(plan.image_is_sampled(0, &images));
        assert!(!plan.image_is_sampled(1, &images));
    }
}
