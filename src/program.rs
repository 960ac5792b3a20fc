//! Compiled-program representation and the program cache.
//!
//! A [`CompiledProgram`] is the CPU-side image of one generated shader:
//! its source text, the uniform slots the generator declared, and the
//! values the binder wrote this frame. The backend consumes the slot table
//! wholesale after binding.
//!
//! Programs live in a [`ProgramCache`] keyed by the full material cache
//! string; stable [`ProgramId`] handles index into it so render lists never
//! store strings.

use rustc_hash::FxHashMap;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use log::{debug, trace};

use crate::context::TextureHandle;
use crate::errors::{LustreError, Result};
use crate::light::LightRecord;
use crate::shadergen::{GeneratedShader, ShaderLibrary};

/// One uniform value as the binder hands it to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Mat4Array(Vec<Mat4>),
    Mat3Array(Vec<Mat3>),
    /// Sampler binding; `None` asks the backend for its dummy texture.
    Texture(Option<TextureHandle>),
}

/// One named uniform slot in a compiled program.
#[derive(Debug, Clone)]
pub struct UniformSlot {
    pub name: String,
    /// GLSL type as declared; empty for slots created by a write.
    pub glsl_type: String,
    /// Whether the generator declared this slot (as opposed to a custom
    /// property registered on first write).
    pub declared: bool,
    pub value: Option<UniformValue>,
}

/// Slot indices for the uniforms the binder writes every frame.
///
/// Resolved by name once per program, then reused. Only a recompile of the
/// owning program invalidates these.
#[derive(Debug, Clone, Default)]
pub struct CommonUniformIndices {
    pub camera_position: Option<u32>,
    pub camera_direction: Option<u32>,
    pub camera_properties: Option<u32>,
    pub model_view_projection: Option<u32>,
    pub normal_matrix: Option<u32>,
    pub model_matrix: Option<u32>,
    pub projection_matrix: Option<u32>,
    pub inverse_projection_matrix: Option<u32>,
    pub bone_transforms: Option<u32>,
    pub bone_normal_transforms: Option<u32>,
    pub material_emissive_color: Option<u32>,
    pub material_base_color: Option<u32>,
    pub material_specular: Option<u32>,
    pub material_properties: Option<u32>,
    pub material_properties2: Option<u32>,
    pub material_properties3: Option<u32>,
    pub material_point_size: Option<u32>,
    pub light_ambient_total: Option<u32>,
    pub light_probe_properties: Option<u32>,
    pub light_probe_orientation: Option<u32>,
    pub light_probe_sampler: Option<u32>,
    pub shadow_depth_adjust: Option<u32>,
}

/// CPU-side image of one generated, backend-compiled shader program.
#[derive(Debug)]
pub struct CompiledProgram {
    cache_key: String,
    vertex_source: String,
    fragment_source: String,
    slots: Vec<UniformSlot>,
    lookup: FxHashMap<String, u32>,
    /// Memoized indices for the per-frame uniforms.
    pub common_indices: CommonUniformIndices,
    /// Per-light uniform block payload, one record per light slot. The
    /// backend uploads it with `bytemuck::cast_slice`.
    pub light_records: Vec<LightRecord>,
}

impl CompiledProgram {
    fn new(cache_key: String, vertex_source: String, fragment_source: String) -> Self {
        Self {
            cache_key,
            vertex_source,
            fragment_source,
            slots: Vec::new(),
            lookup: FxHashMap::default(),
            common_indices: CommonUniformIndices::default(),
            light_records: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    #[inline]
    #[must_use]
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    #[inline]
    #[must_use]
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// Registers a generator-declared uniform slot.
    fn declare_uniform(&mut self, name: &str, glsl_type: &str) {
        if let Some(&index) = self.lookup.get(name) {
            self.slots[index as usize].declared = true;
            return;
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.lookup.insert(name.to_owned(), index);
        self.slots.push(UniformSlot {
            name: name.to_owned(),
            glsl_type: glsl_type.to_owned(),
            declared: true,
            value: None,
        });
    }

    /// Writes a uniform value, memoizing the slot index.
    ///
    /// When `cached` carries an index from an earlier write of the same
    /// name the hash lookup is skipped entirely. Unknown names register a
    /// new, undeclared slot (custom-material properties arrive this way).
    pub fn set_uniform(
        &mut self,
        name: &str,
        value: UniformValue,
        cached: Option<u32>,
    ) -> Option<u32> {
        let index = match cached {
            Some(index) => {
                debug_assert_eq!(
                    self.slots.get(index as usize).map(|s| s.name.as_str()),
                    Some(name),
                    "stale cached uniform index"
                );
                index
            }
            None => match self.lookup.get(name) {
                Some(&index) => index,
                None => {
                    let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
                    self.lookup.insert(name.to_owned(), index);
                    self.slots.push(UniformSlot {
                        name: name.to_owned(),
                        glsl_type: String::new(),
                        declared: false,
                        value: None,
                    });
                    index
                }
            },
        };
        self.slots[index as usize].value = Some(value);
        Some(index)
    }

    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.lookup
            .get(name)
            .is_some_and(|&i| self.slots[i as usize].declared)
    }

    /// Last value written to a named slot, if any.
    #[must_use]
    pub fn uniform_value(&self, name: &str) -> Option<&UniformValue> {
        self.lookup
            .get(name)
            .and_then(|&i| self.slots[i as usize].value.as_ref())
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    /// Names of slots that have received a value this frame.
    pub fn written_names(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|s| s.value.is_some())
            .map(|s| s.name.as_str())
    }
}

/// Stable handle into the [`ProgramCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u32);

/// Cache of compiled programs keyed by the material cache string.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: Vec<CompiledProgram>,
    lookup: FxHashMap<String, ProgramId>,
}

impl ProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lookup(&self, cache_key: &str) -> Option<ProgramId> {
        self.lookup.get(cache_key).copied()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: ProgramId) -> &CompiledProgram {
        &self.programs[id.0 as usize]
    }

    #[inline]
    #[must_use]
    pub fn get_mut(&mut self, id: ProgramId) -> &mut CompiledProgram {
        &mut self.programs[id.0 as usize]
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Resolves a generated shader to a compiled program.
    ///
    /// Pure function of the cache key: a hit returns the existing program
    /// untouched. A miss validates every include and library function the
    /// stages requested, inlines the resolved library text, declares the
    /// uniform slots and inserts the program.
    ///
    /// # Errors
    ///
    /// Fails when a stage references an include or function the library
    /// does not provide.
    pub fn compile_generated_shader(
        &mut self,
        cache_key: &str,
        library: &ShaderLibrary,
        shader: &GeneratedShader,
    ) -> Result<ProgramId> {
        if let Some(id) = self.lookup(cache_key) {
            trace!("program cache hit: {cache_key}");
            return Ok(id);
        }
        debug!("program cache miss, compiling: {cache_key}");

        let mut preamble = String::new();
        for include in &shader.includes {
            let text = library
                .include_source(include)
                .ok_or_else(|| LustreError::UnknownInclude(include.clone()))?;
            preamble.push_str(text);
            preamble.push('\n');
        }
        for function in &shader.functions {
            let text = library
                .function_source(function)
                .ok_or_else(|| LustreError::UnknownFunction(function.clone()))?;
            preamble.push_str(text);
            preamble.push('\n');
        }

        // Both stages receive the same resolved preamble.
        let (vertex_source, fragment_source) = if preamble.is_empty() {
            (shader.vertex_source.clone(), shader.fragment_source.clone())
        } else {
            (
                format!("{preamble}{}", shader.vertex_source),
                format!("{preamble}{}", shader.fragment_source),
            )
        };

        let mut program =
            CompiledProgram::new(cache_key.to_owned(), vertex_source, fragment_source);
        for (name, glsl_type) in &shader.uniforms {
            program.declare_uniform(name, glsl_type);
        }

        let id = ProgramId(u32::try_from(self.programs.len()).unwrap_or(u32::MAX));
        self.programs.push(program);
        self.lookup.insert(cache_key.to_owned(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_shader() -> GeneratedShader {
        GeneratedShader {
            vertex_source: "void main() {}\n".into(),
            fragment_source: "void main() {}\n".into(),
            uniforms: vec![
                ("model_view_projection".into(), "mat4".into()),
                ("material_base_color".into(), "vec4".into()),
            ],
            includes: Vec::new(),
            functions: Vec::new(),
        }
    }

    #[test]
    fn cache_returns_same_program_for_same_key() {
        let library = ShaderLibrary::with_builtins();
        let mut cache = ProgramCache::new();
        let shader = sample_shader();

        let a = cache
            .compile_generated_shader("key-a", &library, &shader)
            .unwrap();
        let b = cache
            .compile_generated_shader("key-a", &library, &shader)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_include_is_an_error() {
        let library = ShaderLibrary::with_builtins();
        let mut cache = ProgramCache::new();
        let mut shader = sample_shader();
        shader.includes.push("no_such_library.glsllib".into());

        let err = cache
            .compile_generated_shader("key-b", &library, &shader)
            .unwrap_err();
        assert!(matches!(err, LustreError::UnknownInclude(name) if name.contains("no_such")));
    }

    #[test]
    fn set_uniform_memoizes_the_slot_index() {
        let library = ShaderLibrary::with_builtins();
        let mut cache = ProgramCache::new();
        let id = cache
            .compile_generated_shader("key-c", &library, &sample_shader())
            .unwrap();
        let program = cache.get_mut(id);

        let index = program.set_uniform(
            "material_base_color",
            UniformValue::Vec4(Vec4::ONE),
            None,
        );
        assert!(index.is_some());
        let again = program.set_uniform(
            "material_base_color",
            UniformValue::Vec4(Vec4::ZERO),
            index,
        );
        assert_eq!(index, again);
        assert_eq!(
            program.uniform_value("material_base_color"),
            Some(&UniformValue::Vec4(Vec4::ZERO))
        );
    }

    #[test]
    fn writes_to_unknown_names_register_undeclared_slots() {
        let library = ShaderLibrary::with_builtins();
        let mut cache = ProgramCache::new();
        let id = cache
            .compile_generated_shader("key-d", &library, &sample_shader())
            .unwrap();
        let program = cache.get_mut(id);

        program.set_uniform("user_wobble", UniformValue::Float(0.25), None);
        assert!(!program.is_declared("user_wobble"));
        assert!(program.is_declared("model_view_projection"));
    }
}
