use std::path::{Path, PathBuf};

use anyhow::Context;
use overdrive_assets::ImportFlags;
use overdrive_input::KeyBindings;
use overdrive_render::CameraConfig;
use serde::{Deserialize, Serialize};

/// Viewer settings, loaded from JSON. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub import: ImportFlags,
    /// Flip decoded images so row 0 is the bottom row.
    pub flip_textures: bool,
    /// Store diffuse textures as sRGB and gamma-correct in the shader.
    pub gamma: bool,
    /// Texture units the headless context reports.
    pub max_texture_units: u32,
    pub viewport: Viewport,
    pub bindings: KeyBindings,
    /// Custom shader sources; the built-in model shader is used otherwise.
    pub shaders: Option<ShaderPaths>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            import: ImportFlags::default(),
            flip_textures: false,
            gamma: false,
            max_texture_units: 16,
            viewport: Viewport::default(),
            bindings: KeyBindings::default(),
            shaders: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ViewerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(?config, "loaded viewer config");
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
