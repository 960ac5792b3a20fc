#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::too_many_lines)]

pub mod binder;
pub mod context;
pub mod errors;
pub mod features;
pub mod image;
pub mod key;
pub mod light;
pub mod material;
pub mod program;
pub mod shadergen;
pub mod trig;

pub use binder::set_material_uniforms;
pub use context::{
    LayerRenderProperties, LightProbe, PipelineState, RenderCamera, ShadowMapEntry,
    ShadowMapManager, TextureHandle,
};
pub use errors::{LustreError, Result};
pub use features::{Feature, FeatureSet};
pub use image::{texture_coord_variable_name, MapType, MappingMode, RenderableImage};
pub use key::{ChannelProperty, MaterialFlags, MaterialKey, TextureChannel, VertexAttributes};
pub use light::{LightKind, LightRecord, ShaderLight};
pub use material::{
    AlphaMode, CustomMaterial, CustomShadingMode, DefaultMaterial, MaterialAdapter,
    PrincipledMaterial, ShaderStage, SpecularModel,
};
pub use program::{CompiledProgram, ProgramCache, ProgramId, UniformValue};
pub use shadergen::{
    build_cache_key, generate_material_shader, GeneratedShader, ShaderLibrary, ShadingPlan,
    StageGenerator, VertexPipeline,
};
