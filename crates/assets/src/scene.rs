//! Imported scene graph: a node arena plus a flat mesh list.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use overdrive_common::TextureKind;
use serde::{Deserialize, Serialize};

use crate::AssetError;

/// Post-processing requested from an importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportFlags {
    /// Split polygons into triangles.
    pub triangulate: bool,
    /// Deliver texture coordinates with a top-left origin, matching image
    /// row order. OBJ stores them bottom-left and gets `v = 1 - v`.
    pub flip_uvs: bool,
    /// Generate tangents and bitangents when the source lacks them.
    pub calc_tangent_space: bool,
}

impl Default for ImportFlags {
    fn default() -> Self {
        Self {
            triangulate: true,
            flip_uvs: true,
            calc_tangent_space: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneFlags {
    /// The importer could not produce a usable scene.
    pub incomplete: bool,
}

/// A material texture reference, resolved against the model's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub kind: TextureKind,
    pub path: PathBuf,
}

/// Geometry of one mesh as produced by an importer.
///
/// Per-vertex attribute arrays are either empty (attribute absent) or exactly
/// as long as `positions`. Faces index into those arrays.
#[derive(Debug, Clone, Default)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub bone_ids: Vec<[i32; 4]>,
    pub bone_weights: Vec<[f32; 4]>,
    pub faces: Vec<Vec<u32>>,
    pub textures: Vec<TextureRef>,
}

impl ImportedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Textures of `kind`, in material order.
    pub fn textures_of(&self, kind: TextureKind) -> impl Iterator<Item = &TextureRef> {
        self.textures.iter().filter(move |t| t.kind == kind)
    }

    /// Fill tangents and bitangents from positions and texture coordinates.
    ///
    /// No-op when they are already present or there are no texture
    /// coordinates to derive them from.
    pub(crate) fn ensure_tangent_space(&mut self) {
        if !self.tangents.is_empty() || self.tex_coords.is_empty() {
            return;
        }
        let (tangents, bitangents) =
            crate::tangent::compute_tangents(&self.positions, &self.tex_coords, &self.faces);
        self.tangents = tangents;
        self.bitangents = bitangents;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportedNode {
    pub name: String,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    /// Indices into [`ImportedScene::nodes`].
    pub children: Vec<usize>,
}

/// Result of importing a model file.
#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub nodes: Vec<ImportedNode>,
    pub root: Option<usize>,
    pub meshes: Vec<ImportedMesh>,
    pub flags: SceneFlags,
}

impl ImportedScene {
    pub fn root_node(&self) -> Option<&ImportedNode> {
        self.root.and_then(|i| self.nodes.get(i))
    }

    /// Flag the scene incomplete when it carries nothing to draw.
    pub(crate) fn finish(mut self) -> Self {
        if self.meshes.is_empty() {
            tracing::warn!("imported scene has no meshes");
            self.flags.incomplete = true;
        }
        self
    }
}

/// Scene-import collaborator.
pub trait SceneImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, AssetError>;
}

/// Picks an importer from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImporter;

impl SceneImporter for FileImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, AssetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("obj") => crate::ObjImporter.import(path, flags),
            Some("gltf" | "glb") => crate::GltfImporter.import(path, flags),
            _ => Err(AssetError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}
