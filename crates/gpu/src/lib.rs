//! Graphics context abstraction.
//!
//! The render core talks to the device only through [`GraphicsContext`].
//! [`HeadlessContext`] records calls for tests and offline runs; with the
//! `gl` feature, [`GlowContext`] drives a real OpenGL 3.3 core context.

mod context;
#[cfg(feature = "gl")]
mod glow_backend;
mod headless;

pub use context::{
    AttributeType, BufferId, BufferTarget, GpuError, GpuResult, GraphicsContext, PixelFormat,
    ProgramId, SamplerParams, ShaderId, ShaderStage, TextureFilter, TextureId, TextureUpload,
    TextureWrap, VertexArrayId, VertexAttribute,
};
#[cfg(feature = "gl")]
pub use glow_backend::GlowContext;
pub use headless::{Command, HeadlessContext, TextureInfo, UniformValue};

pub fn crate_info() -> &'static str {
    concat!("overdrive-gpu v", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("gpu"));
    }
}
