//! Scene import and image decoding.
//!
//! Importers turn a model file into an [`ImportedScene`]: a node arena with a
//! flat mesh list and per-mesh texture references. The render core consumes
//! them only through [`SceneImporter`] and [`ImageDecoder`], so tests can
//! substitute stubs.
//!
//! # Formats
//! - Wavefront OBJ with MTL materials ([`ObjImporter`])
//! - glTF 2.0, text or binary ([`GltfImporter`])

use std::path::PathBuf;

mod decode;
mod gltf_import;
mod obj;
mod scene;
pub mod tangent;

pub use decode::{DecodedImage, ImageDecoder, ImageFileDecoder};
pub use gltf_import::GltfImporter;
pub use obj::ObjImporter;
pub use scene::{
    FileImporter, ImportFlags, ImportedMesh, ImportedNode, ImportedScene, SceneFlags,
    SceneImporter, TextureRef,
};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("glTF error in {}: {source}", path.display())]
    Gltf { path: PathBuf, source: gltf::Error },
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("node {node} of {} is reachable more than once (cycle or shared child)", path.display())]
    NodeCycle { path: PathBuf, node: usize },
    #[error("unsupported model format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

pub fn crate_info() -> &'static str {
    concat!("overdrive-assets v", env!("CARGO_PKG_VERSION"))
}
