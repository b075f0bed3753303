use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a keyboard-driven camera translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Semantic role of a texture within a material.
///
/// The role decides the sampler uniform a mesh binds the texture to:
/// the n-th texture of a kind is bound to `"{prefix}{n}"`, counting from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureKind {
    /// Every kind, in the order a mesh lists its textures.
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Normal,
        TextureKind::Height,
    ];

    /// Sampler uniform prefix used by the model shaders.
    pub fn uniform_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Normal => "texture_normal",
            TextureKind::Height => "texture_height",
        }
    }

    /// Sampler uniform name for the `number`-th texture of this kind (1-based).
    pub fn uniform_name(self, number: u32) -> String {
        format!("{}{number}", self.uniform_prefix())
    }

    /// Whether this kind carries color data that should be gamma-decoded.
    pub fn is_color(self) -> bool {
        matches!(self, TextureKind::Diffuse)
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
            TextureKind::Normal => "normal",
            TextureKind::Height => "height",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_names_are_one_based() {
        assert_eq!(TextureKind::Diffuse.uniform_name(1), "texture_diffuse1");
        assert_eq!(TextureKind::Specular.uniform_name(2), "texture_specular2");
        assert_eq!(TextureKind::Height.uniform_name(1), "texture_height1");
    }

    #[test]
    fn only_diffuse_is_color() {
        assert!(TextureKind::Diffuse.is_color());
        assert!(!TextureKind::Normal.is_color());
        assert!(!TextureKind::Specular.is_color());
    }

    #[test]
    fn display_names() {
        assert_eq!(TextureKind::Normal.to_string(), "normal");
        assert_eq!(TextureKind::Diffuse.to_string(), "diffuse");
    }
}
