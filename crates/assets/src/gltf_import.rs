//! glTF 2.0 import via the `gltf` crate.
//!
//! Node transforms are accumulated down the hierarchy and baked into each
//! primitive's geometry, so the resulting scene carries no transforms. Every
//! (node, primitive) pair becomes one [`ImportedMesh`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use gltf::mesh::Mode;
use overdrive_common::TextureKind;

use crate::scene::{
    ImportFlags, ImportedMesh, ImportedNode, ImportedScene, SceneImporter, TextureRef,
};
use crate::AssetError;

#[derive(Debug, Clone, Copy, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, AssetError> {
        let _span = tracing::debug_span!("gltf_import", path = %path.display()).entered();
        let gltf_err = |source| AssetError::Gltf {
            path: path.to_path_buf(),
            source,
        };
        let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(gltf_err)?;
        let dir = path.parent().unwrap_or(Path::new(""));
        let buffers = gltf::import_buffers(&document, Some(dir), blob).map_err(gltf_err)?;

        let Some(scene) = document
            .default_scene()
            .or_else(|| document.scenes().next())
        else {
            tracing::warn!("glTF file has no scenes");
            return Ok(ImportedScene::default().finish());
        };

        let mut out = ImportedScene {
            nodes: vec![ImportedNode {
                name: scene.name().unwrap_or("scene").to_string(),
                ..Default::default()
            }],
            root: Some(0),
            ..Default::default()
        };

        let mut stack: Vec<(gltf::Node<'_>, Mat4, usize)> = scene
            .nodes()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|n| (n, Mat4::IDENTITY, 0))
            .collect();

        let mut visited = BTreeSet::new();
        while let Some((node, parent_transform, parent)) = stack.pop() {
            if !visited.insert(node.index()) {
                return Err(AssetError::NodeCycle {
                    path: path.to_path_buf(),
                    node: node.index(),
                });
            }
            let transform =
                parent_transform * Mat4::from_cols_array_2d(&node.transform().matrix());
            let index = out.nodes.len();
            out.nodes.push(ImportedNode {
                name: node
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("node{}", node.index())),
                ..Default::default()
            });
            out.nodes[parent].children.push(index);

            if let Some(mesh) = node.mesh() {
                for primitive in mesh.primitives() {
                    let name = match mesh.name() {
                        Some(n) => format!("{n}.{}", primitive.index()),
                        None => format!("mesh{}.{}", mesh.index(), primitive.index()),
                    };
                    match read_primitive(&primitive, &buffers, transform, dir, flags, name) {
                        Some(imported) => {
                            out.nodes[index].meshes.push(out.meshes.len());
                            out.meshes.push(imported);
                        }
                        None => continue,
                    }
                }
            }

            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, transform, index));
            }
        }

        Ok(out.finish())
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    transform: Mat4,
    dir: &Path,
    flags: ImportFlags,
    name: String,
) -> Option<ImportedMesh> {
    let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| &d.0[..]));
    let Some(positions) = reader.read_positions() else {
        tracing::warn!(%name, "primitive without positions skipped");
        return None;
    };
    let positions: Vec<Vec3> = positions
        .map(|p| transform.transform_point3(Vec3::from(p)))
        .collect();
    let count = positions.len() as u32;

    let indices: Vec<u32> = match reader.read_indices() {
        Some(i) => i.into_u32().collect(),
        None => (0..count).collect(),
    };
    let faces = match triangles(primitive.mode(), &indices) {
        Some(faces) => faces,
        None => {
            tracing::debug!(%name, mode = ?primitive.mode(), "non-triangle primitive skipped");
            return None;
        }
    };

    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
    let mut mesh = ImportedMesh {
        name,
        positions,
        faces,
        ..Default::default()
    };
    if let Some(normals) = reader.read_normals() {
        mesh.normals = normals
            .map(|n| (normal_matrix * Vec3::from(n)).normalize_or_zero())
            .collect();
    }
    if let Some(uvs) = reader.read_tex_coords(0) {
        // glTF already puts the UV origin at the top-left.
        mesh.tex_coords = uvs
            .into_f32()
            .map(|[u, v]| Vec2::new(u, if flags.flip_uvs { v } else { 1.0 - v }))
            .collect();
    }
    if let Some(tangents) = reader.read_tangents() {
        let tangents: Vec<Vec4> = tangents.map(Vec4::from).collect();
        mesh.tangents = tangents
            .iter()
            .map(|t| transform.transform_vector3(t.truncate()).normalize_or_zero())
            .collect();
        if mesh.normals.len() == tangents.len() {
            mesh.bitangents = mesh
                .normals
                .iter()
                .zip(mesh.tangents.iter().zip(&tangents))
                .map(|(n, (t, raw))| n.cross(*t) * raw.w)
                .collect();
        }
    }
    if let Some(joints) = reader.read_joints(0) {
        mesh.bone_ids = joints
            .into_u16()
            .map(|j| j.map(i32::from))
            .collect();
    }
    if let Some(weights) = reader.read_weights(0) {
        mesh.bone_weights = weights.into_f32().collect();
    }
    if flags.calc_tangent_space {
        mesh.ensure_tangent_space();
    }

    mesh.textures = material_textures(&primitive.material(), dir);
    tracing::debug!(
        name = %mesh.name,
        vertices = mesh.vertex_count(),
        faces = mesh.faces.len(),
        textures = mesh.textures.len(),
        "gltf primitive"
    );
    Some(mesh)
}

/// Convert an index stream to triangle faces, or `None` for point/line modes.
fn triangles(mode: Mode, indices: &[u32]) -> Option<Vec<Vec<u32>>> {
    let faces = match mode {
        Mode::Triangles => indices.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    vec![w[0], w[1], w[2]]
                } else {
                    vec![w[1], w[0], w[2]]
                }
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&first, rest)) => rest
                .windows(2)
                .map(|w| vec![first, w[0], w[1]])
                .collect(),
            None => Vec::new(),
        },
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => return None,
    };
    Some(faces)
}

fn material_textures(material: &gltf::Material<'_>, dir: &Path) -> Vec<TextureRef> {
    let pbr = material.pbr_metallic_roughness();
    let slots = [
        (TextureKind::Diffuse, pbr.base_color_texture().map(|i| i.texture())),
        (
            TextureKind::Specular,
            pbr.metallic_roughness_texture().map(|i| i.texture()),
        ),
        (TextureKind::Normal, material.normal_texture().map(|n| n.texture())),
        (
            TextureKind::Height,
            material.occlusion_texture().map(|o| o.texture()),
        ),
    ];

    let mut refs = Vec::new();
    for (kind, texture) in slots {
        let Some(texture) = texture else { continue };
        match texture.source().source() {
            gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                refs.push(TextureRef {
                    kind,
                    path: uri_path(dir, uri),
                });
            }
            _ => tracing::warn!(
                %kind,
                image = texture.source().index(),
                "embedded glTF image has no file path, skipped"
            ),
        }
    }
    refs
}

/// Resolve a relative image URI against the model directory, undoing
/// `%XX` escapes.
fn uri_path(dir: &Path, uri: &str) -> PathBuf {
    let bytes = uri.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = match bytes.get(i..i + 3) {
            Some(&[b'%', hi, lo]) => std::str::from_utf8(&[hi, lo])
                .ok()
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok()),
            _ => None,
        };
        match escaped {
            Some(byte) => {
                decoded.push(byte);
                i += 3;
            }
            None => {
                decoded.push(bytes[i]);
                i += 1;
            }
        }
    }
    dir.join(String::from_utf8_lossy(&decoded).as_ref())
}
