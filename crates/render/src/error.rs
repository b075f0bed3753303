use std::path::PathBuf;

use overdrive_assets::AssetError;
use overdrive_gpu::GpuError;

/// Errors raised while building GPU-side render objects.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("mesh uses {count} textures but the context has {max} texture units")]
    TextureUnitsExceeded { count: usize, max: u32 },
    #[error("mesh has {vertices} vertices, more than a u32 index can address")]
    TooManyVertices { vertices: usize },
}

/// Fatal model load failures. No GPU resources outlive a failed load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to import {}: {source}", path.display())]
    Import { path: PathBuf, source: AssetError },
    #[error("{} has no root node", path.display())]
    NoRoot { path: PathBuf },
    #[error("node {node} of {} is reachable more than once", path.display())]
    NodeCycle { path: PathBuf, node: usize },
    #[error("{} imported incomplete", path.display())]
    Incomplete { path: PathBuf },
    #[error("failed to build mesh {mesh} of {}: {source}", path.display())]
    Mesh {
        path: PathBuf,
        mesh: String,
        source: RenderError,
    },
}
