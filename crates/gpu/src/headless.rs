//! A context that records every call instead of talking to a device.
//!
//! Used by tests and by the CLI to exercise the full load/draw path without a
//! window. Handles are allocated from one counter so ids never collide across
//! resource types.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::*;

/// A uniform value as last written to a program.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Mat4([f32; 16]),
}

/// One recorded context call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    DeleteVertexArray(VertexArrayId),
    CreateBuffer(BufferId),
    UploadBuffer {
        target: BufferTarget,
        buffer: BufferId,
        bytes: usize,
    },
    DeleteBuffer(BufferId),
    VertexAttribute {
        attribute: VertexAttribute,
        stride: i32,
    },
    CreateTexture(TextureId),
    UploadTexture {
        texture: TextureId,
        width: u32,
        height: u32,
        format: PixelFormat,
        srgb: bool,
    },
    SetSampler {
        texture: TextureId,
        params: SamplerParams,
    },
    GenerateMipmaps(TextureId),
    DeleteTexture(TextureId),
    ActiveTexture(u32),
    BindTexture(Option<TextureId>),
    CompileShader {
        shader: ShaderId,
        stage: ShaderStage,
    },
    DeleteShader(ShaderId),
    LinkProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    DeleteProgram(ProgramId),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    DrawElements {
        vertex_array: Option<VertexArrayId>,
        index_count: u32,
    },
    DrawArrays {
        vertex_array: Option<VertexArrayId>,
        first: u32,
        count: u32,
    },
}

/// Size and format of a live headless texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub mipmapped: bool,
}

/// Recording graphics context.
#[derive(Debug)]
pub struct HeadlessContext {
    next_id: u32,
    max_texture_units: u32,
    commands: Vec<Command>,
    vertex_arrays: BTreeSet<VertexArrayId>,
    buffers: BTreeMap<BufferId, usize>,
    textures: BTreeMap<TextureId, Option<TextureInfo>>,
    shaders: BTreeMap<ShaderId, Option<String>>,
    programs: BTreeMap<ProgramId, Option<String>>,
    uniforms: BTreeMap<(ProgramId, String), UniformValue>,
    bound_vertex_array: Option<VertexArrayId>,
    active_unit: u32,
    unit_bindings: BTreeMap<u32, TextureId>,
    current_program: Option<ProgramId>,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessContext {
    /// Default unit count matches the minimum a GL 3.3 core fragment stage exposes.
    pub const DEFAULT_TEXTURE_UNITS: u32 = 16;

    pub fn new() -> Self {
        Self {
            next_id: 1,
            max_texture_units: Self::DEFAULT_TEXTURE_UNITS,
            commands: Vec::new(),
            vertex_arrays: BTreeSet::new(),
            buffers: BTreeMap::new(),
            textures: BTreeMap::new(),
            shaders: BTreeMap::new(),
            programs: BTreeMap::new(),
            uniforms: BTreeMap::new(),
            bound_vertex_array: None,
            active_unit: 0,
            unit_bindings: BTreeMap::new(),
            current_program: None,
        }
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    /// Every call recorded since creation or the last [`clear_commands`](Self::clear_commands).
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded commands matching `pred`.
    pub fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    pub fn draw_calls(&self) -> usize {
        self.count(|c| matches!(c, Command::DrawElements { .. } | Command::DrawArrays { .. }))
    }

    /// Last value written to `name` on `program`.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(&(program, name.to_string()))
    }

    pub fn active_unit(&self) -> u32 {
        self.active_unit
    }

    /// Texture bound to `unit`, if any.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.unit_bindings.get(&unit).copied()
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.bound_vertex_array
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    pub fn texture_info(&self, texture: TextureId) -> Option<TextureInfo> {
        self.textures.get(&texture).copied().flatten()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, command: Command) {
        tracing::trace!(?command, "headless");
        self.commands.push(command);
    }
}

fn compile_diagnostics(source: &str) -> Option<String> {
    if source.trim().is_empty() {
        return Some("0:0: error: empty shader source".into());
    }
    if !source.contains("void main") {
        return Some("0:0: error: missing entry point `main`".into());
    }
    None
}

impl GraphicsContext for HeadlessContext {
    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn create_vertex_array(&mut self) -> GpuResult<VertexArrayId> {
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id);
        self.record(Command::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array;
        self.record(Command::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
        self.record(Command::DeleteVertexArray(vertex_array));
    }

    fn create_buffer(&mut self) -> GpuResult<BufferId> {
        let id = BufferId(self.next());
        self.buffers.insert(id, 0);
        self.record(Command::CreateBuffer(id));
        Ok(id)
    }

    fn upload_buffer(&mut self, target: BufferTarget, buffer: BufferId, data: &[u8]) {
        match self.buffers.get_mut(&buffer) {
            Some(size) => *size = data.len(),
            None => tracing::warn!(?buffer, "upload to unknown buffer"),
        }
        self.record(Command::UploadBuffer {
            target,
            buffer,
            bytes: data.len(),
        });
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.record(Command::DeleteBuffer(buffer));
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: i32) {
        if self.bound_vertex_array.is_none() {
            tracing::warn!(location = attribute.location, "attribute declared without a bound vertex array");
        }
        self.record(Command::VertexAttribute {
            attribute: *attribute,
            stride,
        });
    }

    fn create_texture(&mut self) -> GpuResult<TextureId> {
        let id = TextureId(self.next());
        self.textures.insert(id, None);
        self.record(Command::CreateTexture(id));
        Ok(id)
    }

    fn upload_texture_2d(&mut self, texture: TextureId, upload: &TextureUpload<'_>) {
        if let Err(e) = upload.validate() {
            tracing::error!(?texture, "rejected texture upload: {e}");
            return;
        }
        self.unit_bindings.insert(self.active_unit, texture);
        if let Some(info) = self.textures.get_mut(&texture) {
            *info = Some(TextureInfo {
                width: upload.width,
                height: upload.height,
                format: upload.format,
                mipmapped: false,
            });
        }
        self.record(Command::UploadTexture {
            texture,
            width: upload.width,
            height: upload.height,
            format: upload.format,
            srgb: upload.srgb,
        });
    }

    fn set_sampler(&mut self, texture: TextureId, params: &SamplerParams) {
        self.record(Command::SetSampler {
            texture,
            params: *params,
        });
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        if let Some(Some(info)) = self.textures.get_mut(&texture) {
            info.mipmapped = true;
        }
        self.record(Command::GenerateMipmaps(texture));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.unit_bindings.retain(|_, bound| *bound != texture);
        self.record(Command::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        if unit >= self.max_texture_units {
            tracing::error!(unit, max = self.max_texture_units, "texture unit out of range");
        }
        self.active_unit = unit;
        self.record(Command::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        match texture {
            Some(id) => {
                self.unit_bindings.insert(self.active_unit, id);
            }
            None => {
                self.unit_bindings.remove(&self.active_unit);
            }
        }
        self.record(Command::BindTexture(texture));
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> GpuResult<ShaderId> {
        let id = ShaderId(self.next());
        self.shaders.insert(id, compile_diagnostics(source));
        self.record(Command::CompileShader { shader: id, stage });
        Ok(id)
    }

    fn shader_diagnostics(&self, shader: ShaderId) -> Option<String> {
        self.shaders.get(&shader).cloned().flatten()
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
        self.record(Command::DeleteShader(shader));
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> GpuResult<ProgramId> {
        let id = ProgramId(self.next());
        let failed = shaders
            .iter()
            .filter(|s| !matches!(self.shaders.get(*s), Some(None)))
            .count();
        let diagnostics = if shaders.is_empty() {
            Some("error: no shaders attached".to_string())
        } else if failed > 0 {
            Some(format!("error: {failed} attached shader(s) failed to compile"))
        } else {
            None
        };
        self.programs.insert(id, diagnostics);
        self.record(Command::LinkProgram(id));
        Ok(id)
    }

    fn program_diagnostics(&self, program: ProgramId) -> Option<String> {
        self.programs.get(&program).cloned().flatten()
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
        self.record(Command::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.uniforms.retain(|(p, _), _| *p != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.record(Command::DeleteProgram(program));
    }

    fn set_uniform_i32(&mut self, program: ProgramId, name: &str, value: i32) {
        self.set_uniform(program, name, UniformValue::Int(value));
    }

    fn set_uniform_f32(&mut self, program: ProgramId, name: &str, value: f32) {
        self.set_uniform(program, name, UniformValue::Float(value));
    }

    fn set_uniform_mat4(&mut self, program: ProgramId, name: &str, value: &[f32; 16]) {
        self.set_uniform(program, name, UniformValue::Mat4(*value));
    }

    fn draw_elements(&mut self, index_count: u32) {
        self.record(Command::DrawElements {
            vertex_array: self.bound_vertex_array,
            index_count,
        });
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        self.record(Command::DrawArrays {
            vertex_array: self.bound_vertex_array,
            first,
            count,
        });
    }
}

impl HeadlessContext {
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        if self.current_program != Some(program) {
            tracing::warn!(?program, name, "uniform written to a program that is not in use");
        }
        self.uniforms
            .insert((program, name.to_string()), value.clone());
        self.record(Command::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }
}
