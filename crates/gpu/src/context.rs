//! The graphics context contract consumed by the render core.

use thiserror::Error;

/// Errors raised while allocating GPU objects.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create {kind}: {message}")]
    Creation { kind: &'static str, message: String },
    #[error("invalid texture upload: {0}")]
    InvalidUpload(String),
}

pub type GpuResult<T> = Result<T, GpuError>;

/// Handle to a vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Handle to a vertex array (attribute binding state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayId(pub u32);

/// Handle to a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Handle to a single compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Vertex,
    Index,
}

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Float,
    /// Integer attribute, read by the shader without conversion to float.
    Int,
}

/// One vertex attribute inside an interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub ty: AttributeType,
    pub normalized: bool,
    /// Byte offset from the start of the vertex.
    pub offset: i32,
}

/// Layout of decoded pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Red,
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// Pick the format for an interleaved image with `channels` components.
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Red),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// A 2D image ready for upload.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Store color data in an sRGB internal format.
    pub srgb: bool,
    pub pixels: &'a [u8],
}

impl TextureUpload<'_> {
    /// Check that the pixel buffer matches the declared dimensions.
    pub fn validate(&self) -> GpuResult<()> {
        let expected = self.width as usize * self.height as usize * self.format.channels();
        if self.width == 0 || self.height == 0 {
            return Err(GpuError::InvalidUpload(format!(
                "zero-sized image {}x{}",
                self.width, self.height
            )));
        }
        if self.pixels.len() != expected {
            return Err(GpuError::InvalidUpload(format!(
                "expected {expected} bytes for {}x{} {:?}, got {}",
                self.width,
                self.height,
                self.format,
                self.pixels.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Wrap and filter state of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerParams {
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Stage label used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
        }
    }
}

/// A graphics device context.
///
/// Every object created through a context is only valid on that context, and
/// the context is only usable from the thread that owns it. Methods take
/// `&mut self` because almost all of them mutate global binding state.
pub trait GraphicsContext {
    /// Number of texture units a single draw can sample from.
    fn max_texture_units(&self) -> u32;

    fn create_vertex_array(&mut self) -> GpuResult<VertexArrayId>;
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn create_buffer(&mut self) -> GpuResult<BufferId>;
    /// Bind `buffer` to `target` and fill it with immutable contents.
    fn upload_buffer(&mut self, target: BufferTarget, buffer: BufferId, data: &[u8]);
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Declare and enable an attribute of the bound vertex array, reading from
    /// the bound vertex buffer.
    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: i32);

    fn create_texture(&mut self) -> GpuResult<TextureId>;
    /// Bind `texture` and upload level 0 of a 2D image.
    fn upload_texture_2d(&mut self, texture: TextureId, upload: &TextureUpload<'_>);
    fn set_sampler(&mut self, texture: TextureId, params: &SamplerParams);
    fn generate_mipmaps(&mut self, texture: TextureId);
    fn delete_texture(&mut self, texture: TextureId);

    fn active_texture(&mut self, unit: u32);
    /// Bind a 2D texture to the active unit.
    fn bind_texture(&mut self, texture: Option<TextureId>);

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> GpuResult<ShaderId>;
    /// Compiler output when the stage failed to compile.
    fn shader_diagnostics(&self, shader: ShaderId) -> Option<String>;
    fn delete_shader(&mut self, shader: ShaderId);

    fn link_program(&mut self, shaders: &[ShaderId]) -> GpuResult<ProgramId>;
    /// Linker output when the program failed to link.
    fn program_diagnostics(&self, program: ProgramId) -> Option<String>;
    fn use_program(&mut self, program: Option<ProgramId>);
    fn delete_program(&mut self, program: ProgramId);

    fn set_uniform_i32(&mut self, program: ProgramId, name: &str, value: i32);
    fn set_uniform_f32(&mut self, program: ProgramId, name: &str, value: f32);
    /// Column-major 4x4 matrix.
    fn set_uniform_mat4(&mut self, program: ProgramId, name: &str, value: &[f32; 16]);

    /// Draw `index_count` indices of the bound vertex array as triangles.
    fn draw_elements(&mut self, index_count: u32);
    /// Draw `count` vertices of the bound vertex array as triangles.
    fn draw_arrays(&mut self, first: u32, count: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_from_channels() {
        assert_eq!(PixelFormat::from_channels(1), Some(PixelFormat::Red));
        assert_eq!(PixelFormat::from_channels(3), Some(PixelFormat::Rgb));
        assert_eq!(PixelFormat::from_channels(4), Some(PixelFormat::Rgba));
        assert_eq!(PixelFormat::from_channels(2), None);
    }

    #[test]
    fn upload_validation() {
        let pixels = [0u8; 12];
        let ok = TextureUpload {
            width: 2,
            height: 2,
            format: PixelFormat::Rgb,
            srgb: false,
            pixels: &pixels,
        };
        assert!(ok.validate().is_ok());

        let short = TextureUpload {
            format: PixelFormat::Rgba,
            ..ok
        };
        assert!(matches!(short.validate(), Err(GpuError::InvalidUpload(_))));
    }

    #[test]
    fn default_sampler_repeats_and_filters_linearly() {
        let params = SamplerParams::default();
        assert_eq!(params.wrap_s, TextureWrap::Repeat);
        assert_eq!(params.wrap_t, TextureWrap::Repeat);
        assert_eq!(params.mag_filter, TextureFilter::Linear);
        assert_eq!(params.min_filter, TextureFilter::Linear);
    }
}
