//! Single-stage source accumulator.
//!
//! A [`StageGenerator`] collects the declarations and body text of one
//! shader stage during generation. Declarations deduplicate silently on
//! re-add; body lines keep exactly the order they were appended in. The
//! final text is rendered once, at the end of the pass.

/// Accumulates declarations and body text for one shader stage.
#[derive(Debug, Default)]
pub struct StageGenerator {
    uniforms: Vec<(String, String)>,
    incoming: Vec<(String, String)>,
    outgoing: Vec<(String, String)>,
    includes: Vec<String>,
    functions: Vec<String>,
    definitions: Vec<String>,
    body: Vec<String>,
}

impl StageGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a uniform. Re-adding the same name is a silent no-op; the
    /// type of the first declaration wins.
    pub fn add_uniform(&mut self, name: &str, glsl_type: &str) {
        if !self.uniforms.iter().any(|(n, _)| n == name) {
            self.uniforms.push((name.to_owned(), glsl_type.to_owned()));
        }
    }

    /// Declares a stage input (vertex attribute or fragment varying).
    pub fn add_incoming(&mut self, name: &str, glsl_type: &str) {
        if !self.incoming.iter().any(|(n, _)| n == name) {
            self.incoming.push((name.to_owned(), glsl_type.to_owned()));
        }
    }

    /// Declares a stage output (varying or fragment color).
    pub fn add_outgoing(&mut self, name: &str, glsl_type: &str) {
        if !self.outgoing.iter().any(|(n, _)| n == name) {
            self.outgoing.push((name.to_owned(), glsl_type.to_owned()));
        }
    }

    /// Requests a library include for this stage.
    pub fn add_include(&mut self, name: &str) {
        if !self.includes.iter().any(|n| n == name) {
            self.includes.push(name.to_owned());
        }
    }

    /// Requests a library function for this stage.
    pub fn add_function(&mut self, name: &str) {
        if !self.functions.iter().any(|n| n == name) {
            self.functions.push(name.to_owned());
        }
    }

    /// Adds a raw top-level definition (struct or uniform-block text).
    pub fn add_definition(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !self.definitions.contains(&text) {
            self.definitions.push(text);
        }
    }

    /// Appends one body line, preserving caller order.
    pub fn append(&mut self, line: impl Into<String>) {
        self.body.push(line.into());
    }

    #[must_use]
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|(n, _)| n == name)
    }

    #[must_use]
    pub fn has_outgoing(&self, name: &str) -> bool {
        self.outgoing.iter().any(|(n, _)| n == name)
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &[(String, String)] {
        &self.uniforms
    }

    #[inline]
    #[must_use]
    pub fn outgoing(&self) -> &[(String, String)] {
        &self.outgoing
    }

    #[inline]
    #[must_use]
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    #[inline]
    #[must_use]
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Renders the stage text: definitions, declarations, then the body
    /// wrapped in `main`. Requested includes and functions are not part of
    /// the stage text; the program compiler resolves and prepends them.
    #[must_use]
    pub fn finalize(&self) -> String {
        let mut out = String::new();
        for definition in &self.definitions {
            out.push_str(definition);
            out.push('\n');
        }
        for (name, glsl_type) in &self.uniforms {
            out.push_str("uniform ");
            out.push_str(glsl_type);
            out.push(' ');
            out.push_str(name);
            out.push_str(";\n");
        }
        for (name, glsl_type) in &self.incoming {
            out.push_str("in ");
            out.push_str(glsl_type);
            out.push(' ');
            out.push_str(name);
            out.push_str(";\n");
        }
        for (name, glsl_type) in &self.outgoing {
            out.push_str("out ");
            out.push_str(glsl_type);
            out.push(' ');
            out.push_str(name);
            out.push_str(";\n");
        }
        out.push_str("void main()\n{\n");
        for line in &self.body {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_deduplicate_but_keep_first_order() {
        let mut stage = StageGenerator::new();
        stage.add_uniform("model_matrix", "mat4");
        stage.add_uniform("camera_position", "vec3");
        stage.add_uniform("model_matrix", "mat4");
        stage.add_outgoing("var_world_pos", "vec3");
        stage.add_outgoing("var_world_pos", "vec3");

        assert_eq!(
            stage.uniforms(),
            &[
                ("model_matrix".to_owned(), "mat4".to_owned()),
                ("camera_position".to_owned(), "vec3".to_owned()),
            ]
        );
        assert_eq!(stage.outgoing().len(), 1);
    }

    #[test]
    fn body_lines_keep_append_order() {
        let mut stage = StageGenerator::new();
        stage.append("vec3 a = vec3(0.0);");
        stage.append("vec3 b = a;");
        let text = stage.finalize();
        let a_at = text.find("vec3 a").unwrap();
        let b_at = text.find("vec3 b").unwrap();
        assert!(a_at < b_at, "append order must survive finalize");
    }

    #[test]
    fn finalize_is_stable_across_calls() {
        let mut stage = StageGenerator::new();
        stage.add_include("tonemapping.glsllib");
        stage.add_uniform("material_base_color", "vec4");
        stage.append("frag_output = material_base_color;");
        assert_eq!(stage.finalize(), stage.finalize());
    }
}
