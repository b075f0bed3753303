//! OpenGL 3.3 core context backed by `glow`.
//!
//! The caller owns window and context creation and hands over a loaded
//! `glow::Context`. Every call below is a plain GL entry point; they are
//! `unsafe` only because the context must be current on this thread, which
//! `GlowContext` assumes for its whole lifetime.

use std::num::NonZeroU32;

use glow::HasContext;

use crate::context::*;

pub struct GlowContext {
    gl: glow::Context,
    max_texture_units: u32,
}

fn nz(id: u32) -> Option<NonZeroU32> {
    NonZeroU32::new(id)
}

fn creation(kind: &'static str) -> impl FnOnce(String) -> GpuError {
    move |message| GpuError::Creation { kind, message }
}

impl GlowContext {
    pub fn new(gl: glow::Context) -> Self {
        let units = unsafe { gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS) };
        let max_texture_units = u32::try_from(units).unwrap_or(16).max(1);
        tracing::info!(max_texture_units, "gl context ready");
        Self {
            gl,
            max_texture_units,
        }
    }

    /// The wrapped context, for state this abstraction does not cover
    /// (viewport, clear, depth test).
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn buffer(id: BufferId) -> Option<glow::NativeBuffer> {
        nz(id.0).map(glow::NativeBuffer)
    }

    fn vertex_array(id: VertexArrayId) -> Option<glow::NativeVertexArray> {
        nz(id.0).map(glow::NativeVertexArray)
    }

    fn texture(id: TextureId) -> Option<glow::NativeTexture> {
        nz(id.0).map(glow::NativeTexture)
    }

    fn shader(id: ShaderId) -> Option<glow::NativeShader> {
        nz(id.0).map(glow::NativeShader)
    }

    fn program(id: ProgramId) -> Option<glow::NativeProgram> {
        nz(id.0).map(glow::NativeProgram)
    }

    fn location(&self, program: ProgramId, name: &str) -> Option<glow::NativeUniformLocation> {
        let native = Self::program(program)?;
        let location = unsafe { self.gl.get_uniform_location(native, name) };
        if location.is_none() {
            tracing::trace!(name, "uniform not active in program");
        }
        location
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn wrap(mode: TextureWrap) -> i32 {
    (match mode {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
    }) as i32
}

fn filter(mode: TextureFilter) -> i32 {
    (match mode {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

/// (internal format, pixel format) for an upload.
fn formats(format: PixelFormat, srgb: bool) -> (u32, u32) {
    match (format, srgb) {
        (PixelFormat::Red, _) => (glow::R8, glow::RED),
        (PixelFormat::Rgb, false) => (glow::RGB8, glow::RGB),
        (PixelFormat::Rgb, true) => (glow::SRGB8, glow::RGB),
        (PixelFormat::Rgba, false) => (glow::RGBA8, glow::RGBA),
        (PixelFormat::Rgba, true) => (glow::SRGB8_ALPHA8, glow::RGBA),
    }
}

impl GraphicsContext for GlowContext {
    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn create_vertex_array(&mut self) -> GpuResult<VertexArrayId> {
        let native = unsafe { self.gl.create_vertex_array() }.map_err(creation("vertex array"))?;
        Ok(VertexArrayId(native.0.get()))
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        unsafe {
            self.gl
                .bind_vertex_array(vertex_array.and_then(Self::vertex_array))
        };
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if let Some(native) = Self::vertex_array(vertex_array) {
            unsafe { self.gl.delete_vertex_array(native) };
        }
    }

    fn create_buffer(&mut self) -> GpuResult<BufferId> {
        let native = unsafe { self.gl.create_buffer() }.map_err(creation("buffer"))?;
        Ok(BufferId(native.0.get()))
    }

    fn upload_buffer(&mut self, target: BufferTarget, buffer: BufferId, data: &[u8]) {
        let target = buffer_target(target);
        unsafe {
            self.gl.bind_buffer(target, Self::buffer(buffer));
            self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(native) = Self::buffer(buffer) {
            unsafe { self.gl.delete_buffer(native) };
        }
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: i32) {
        unsafe {
            self.gl.enable_vertex_attrib_array(attribute.location);
            match attribute.ty {
                AttributeType::Float => self.gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    attribute.normalized,
                    stride,
                    attribute.offset,
                ),
                AttributeType::Int => self.gl.vertex_attrib_pointer_i32(
                    attribute.location,
                    attribute.components,
                    glow::INT,
                    stride,
                    attribute.offset,
                ),
            }
        }
    }

    fn create_texture(&mut self) -> GpuResult<TextureId> {
        let native = unsafe { self.gl.create_texture() }.map_err(creation("texture"))?;
        Ok(TextureId(native.0.get()))
    }

    fn upload_texture_2d(&mut self, texture: TextureId, upload: &TextureUpload<'_>) {
        if let Err(e) = upload.validate() {
            tracing::error!(?texture, "rejected texture upload: {e}");
            return;
        }
        let (internal, format) = formats(upload.format, upload.srgb);
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
            // Rows of 1- and 3-channel images are not 4-byte aligned in general.
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                upload.width as i32,
                upload.height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                Some(upload.pixels),
            );
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
        }
    }

    fn set_sampler(&mut self, texture: TextureId, params: &SamplerParams) {
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap(params.wrap_s));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap(params.wrap_t));
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                filter(params.min_filter),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                filter(params.mag_filter),
            );
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(native) = Self::texture(texture) {
            unsafe { self.gl.delete_texture(native) };
        }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, texture.and_then(Self::texture))
        };
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> GpuResult<ShaderId> {
        let ty = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let native = unsafe { self.gl.create_shader(ty) }.map_err(creation("shader"))?;
        unsafe {
            self.gl.shader_source(native, source);
            self.gl.compile_shader(native);
        }
        Ok(ShaderId(native.0.get()))
    }

    fn shader_diagnostics(&self, shader: ShaderId) -> Option<String> {
        let native = Self::shader(shader)?;
        unsafe {
            if self.gl.get_shader_compile_status(native) {
                None
            } else {
                Some(self.gl.get_shader_info_log(native))
            }
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if let Some(native) = Self::shader(shader) {
            unsafe { self.gl.delete_shader(native) };
        }
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> GpuResult<ProgramId> {
        let program = unsafe { self.gl.create_program() }.map_err(creation("program"))?;
        unsafe {
            for native in shaders.iter().copied().filter_map(Self::shader) {
                self.gl.attach_shader(program, native);
            }
            self.gl.link_program(program);
            for native in shaders.iter().copied().filter_map(Self::shader) {
                self.gl.detach_shader(program, native);
            }
        }
        Ok(ProgramId(program.0.get()))
    }

    fn program_diagnostics(&self, program: ProgramId) -> Option<String> {
        let native = Self::program(program)?;
        unsafe {
            if self.gl.get_program_link_status(native) {
                None
            } else {
                Some(self.gl.get_program_info_log(native))
            }
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        unsafe { self.gl.use_program(program.and_then(Self::program)) };
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(native) = Self::program(program) {
            unsafe { self.gl.delete_program(native) };
        }
    }

    fn set_uniform_i32(&mut self, program: ProgramId, name: &str, value: i32) {
        let location = self.location(program, name);
        unsafe { self.gl.uniform_1_i32(location.as_ref(), value) };
    }

    fn set_uniform_f32(&mut self, program: ProgramId, name: &str, value: f32) {
        let location = self.location(program, name);
        unsafe { self.gl.uniform_1_f32(location.as_ref(), value) };
    }

    fn set_uniform_mat4(&mut self, program: ProgramId, name: &str, value: &[f32; 16]) {
        let location = self.location(program, name);
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(location.as_ref(), false, value)
        };
    }

    fn draw_elements(&mut self, index_count: u32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_INT, 0)
        };
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        unsafe {
            self.gl
                .draw_arrays(glow::TRIANGLES, first as i32, count as i32)
        };
    }
}
