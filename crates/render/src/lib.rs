//! Render core: camera, meshes, textures and model loading.
//!
//! Everything here talks to the device through
//! [`overdrive_gpu::GraphicsContext`] and to files through the
//! [`overdrive_assets`] collaborator traits.
//!
//! # Resource ownership
//! - A [`Model`] owns its meshes and its texture pool.
//! - Meshes share textures through `Rc`, so models stay on the thread that
//!   owns the context.
//! - GPU objects are released explicitly with `destroy(ctx)`.

mod camera;
mod error;
mod mesh;
mod model;
mod shader;
mod texture;
mod vertex;

pub use camera::{Camera, CameraConfig, PITCH_LIMIT, ZOOM_MAX, ZOOM_MIN};
pub use error::{LoadError, RenderError};
pub use mesh::Mesh;
pub use model::{Model, ModelLoader};
pub use shader::Shader;
pub use texture::{Texture, TextureCache};
pub use vertex::{MAX_BONE_INFLUENCE, VERTEX_LAYOUT, VERTEX_STRIDE, Vertex};

pub fn crate_info() -> &'static str {
    concat!("overdrive-render v", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
