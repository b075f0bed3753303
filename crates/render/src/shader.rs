use std::path::Path;

use glam::Mat4;
use overdrive_gpu::{GraphicsContext, ProgramId, ShaderStage};

use crate::RenderError;

/// A linked vertex + fragment program.
///
/// Compile and link failures are logged and kept in [`Shader::diagnostics`];
/// the program object is still created so the caller can carry on (drawing
/// with it renders nothing useful).
#[derive(Debug)]
pub struct Shader {
    program: ProgramId,
    diagnostics: Vec<String>,
}

impl Shader {
    pub fn from_source(
        ctx: &mut dyn GraphicsContext,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, RenderError> {
        let mut diagnostics = Vec::new();
        let mut stages = Vec::with_capacity(2);
        for (stage, source) in [
            (ShaderStage::Vertex, vertex_source),
            (ShaderStage::Fragment, fragment_source),
        ] {
            let shader = ctx.compile_shader(stage, source)?;
            if let Some(log) = ctx.shader_diagnostics(shader) {
                tracing::error!(stage = stage.name(), "shader compilation error\n{log}");
                diagnostics.push(format!("{}: {log}", stage.name()));
            }
            stages.push(shader);
        }

        let program = ctx.link_program(&stages);
        for shader in stages {
            ctx.delete_shader(shader);
        }
        let program = program?;
        if let Some(log) = ctx.program_diagnostics(program) {
            tracing::error!(stage = "PROGRAM", "program linking error\n{log}");
            diagnostics.push(format!("PROGRAM: {log}"));
        }

        Ok(Self {
            program,
            diagnostics,
        })
    }

    /// Build from source files. An unreadable file is logged and compiled as
    /// an empty source, which then fails with a compile diagnostic.
    pub fn from_files(
        ctx: &mut dyn GraphicsContext,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> Result<Self, RenderError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).unwrap_or_else(|e| {
                tracing::error!(path = %path.display(), "failed to read shader file: {e}");
                String::new()
            })
        };
        Self::from_source(ctx, &read(vertex_path), &read(fragment_path))
    }

    pub fn id(&self) -> ProgramId {
        self.program
    }

    /// Compile and link messages, empty when the program is usable.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn use_program(&self, ctx: &mut dyn GraphicsContext) {
        ctx.use_program(Some(self.program));
    }

    pub fn set_bool(&self, ctx: &mut dyn GraphicsContext, name: &str, value: bool) {
        ctx.set_uniform_i32(self.program, name, i32::from(value));
    }

    pub fn set_int(&self, ctx: &mut dyn GraphicsContext, name: &str, value: i32) {
        ctx.set_uniform_i32(self.program, name, value);
    }

    pub fn set_float(&self, ctx: &mut dyn GraphicsContext, name: &str, value: f32) {
        ctx.set_uniform_f32(self.program, name, value);
    }

    pub fn set_mat4(&self, ctx: &mut dyn GraphicsContext, name: &str, value: &Mat4) {
        ctx.set_uniform_mat4(self.program, name, &value.to_cols_array());
    }

    pub fn destroy(self, ctx: &mut dyn GraphicsContext) {
        ctx.delete_program(self.program);
    }
}
