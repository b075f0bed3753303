//! Wavefront OBJ and MTL import.
//!
//! Each `o`/`g` group becomes a child node of the root; `usemtl` starts a new
//! mesh inside the current group. Positions, normals and texture coordinates
//! are de-indexed into one vertex per distinct `v/vt/vn` triple.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use overdrive_common::TextureKind;

use crate::scene::{
    ImportFlags, ImportedMesh, ImportedNode, ImportedScene, SceneImporter, TextureRef,
};
use crate::AssetError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjImporter;

impl SceneImporter for ObjImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, AssetError> {
        let _span = tracing::debug_span!("obj_import", path = %path.display()).entered();
        let source = read(path)?;
        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("root")
            .to_string();
        parse_obj(&source, path, &dir, &name, flags)
    }
}

fn read(path: &Path) -> Result<String, AssetError> {
    std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

type VertexKey = (usize, Option<usize>, Option<usize>);

/// Mesh under construction for the current group/material.
#[derive(Default)]
struct MeshBuilder {
    name: String,
    material: Option<String>,
    lookup: HashMap<VertexKey, u32>,
    keys: Vec<VertexKey>,
    faces: Vec<Vec<u32>>,
}

impl MeshBuilder {
    fn vertex(&mut self, key: VertexKey) -> u32 {
        if let Some(&i) = self.lookup.get(&key) {
            return i;
        }
        let i = self.keys.len() as u32;
        self.keys.push(key);
        self.lookup.insert(key, i);
        i
    }

    fn build(
        self,
        data: &Attributes,
        materials: &HashMap<String, Vec<TextureRef>>,
        flags: ImportFlags,
    ) -> ImportedMesh {
        let has_uvs = self.keys.iter().any(|k| k.1.is_some());
        let has_normals = self.keys.iter().any(|k| k.2.is_some());

        let mut mesh = ImportedMesh {
            name: self.name,
            faces: self.faces,
            ..Default::default()
        };
        for &(p, t, n) in &self.keys {
            mesh.positions.push(data.positions[p]);
            if has_uvs {
                let mut uv = t.map(|t| data.tex_coords[t]).unwrap_or(Vec2::ZERO);
                if flags.flip_uvs {
                    uv.y = 1.0 - uv.y;
                }
                mesh.tex_coords.push(uv);
            }
            if has_normals {
                mesh.normals
                    .push(n.map(|n| data.normals[n]).unwrap_or(Vec3::ZERO));
            }
        }

        if let Some(material) = &self.material {
            match materials.get(material) {
                Some(textures) => mesh.textures = textures.clone(),
                None => tracing::warn!(material, "material not defined by any mtllib"),
            }
        }
        if flags.calc_tangent_space {
            mesh.ensure_tangent_space();
        }
        mesh
    }
}

#[derive(Default)]
struct Attributes {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
}

struct Group {
    name: String,
    meshes: Vec<usize>,
}

struct Parser<'a> {
    path: &'a Path,
    flags: ImportFlags,
    data: Attributes,
    materials: HashMap<String, Vec<TextureRef>>,
    groups: Vec<Group>,
    meshes: Vec<ImportedMesh>,
    current: MeshBuilder,
}

impl Parser<'_> {
    /// Move the mesh under construction into the scene, if it has faces.
    fn flush(&mut self) {
        let next = MeshBuilder {
            name: self.current.name.clone(),
            material: self.current.material.clone(),
            ..Default::default()
        };
        let done = std::mem::replace(&mut self.current, next);
        if done.faces.is_empty() {
            return;
        }
        let mesh = done.build(&self.data, &self.materials, self.flags);
        tracing::debug!(
            name = %mesh.name,
            vertices = mesh.vertex_count(),
            faces = mesh.faces.len(),
            "obj mesh"
        );
        let index = self.meshes.len();
        self.meshes.push(mesh);
        if let Some(group) = self.groups.last_mut() {
            group.meshes.push(index);
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> AssetError {
        AssetError::Parse {
            path: self.path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    fn floats<const N: usize>(&self, line: usize, args: &[&str]) -> Result<[f32; N], AssetError> {
        self.floats_at_least::<N>(line, args, N)
    }

    /// Like [`Parser::floats`], but only the first `required` components must
    /// be present; the rest default to zero.
    fn floats_at_least<const N: usize>(
        &self,
        line: usize,
        args: &[&str],
        required: usize,
    ) -> Result<[f32; N], AssetError> {
        let mut out = [0.0; N];
        if args.len() < required {
            return Err(self.error(line, format!("expected {N} components, got {}", args.len())));
        }
        for (slot, token) in out.iter_mut().zip(args) {
            *slot = token
                .parse()
                .map_err(|_| self.error(line, format!("invalid number `{token}`")))?;
        }
        Ok(out)
    }

    /// Resolve a 1-based or negative (relative) OBJ index.
    fn index(&self, line: usize, token: &str, len: usize) -> Result<usize, AssetError> {
        let raw: i64 = token
            .parse()
            .map_err(|_| self.error(line, format!("invalid index `{token}`")))?;
        let resolved = match raw {
            0 => None,
            i if i > 0 => Some(i - 1),
            i => Some(len as i64 + i),
        };
        match resolved {
            Some(i) if i >= 0 && (i as usize) < len => Ok(i as usize),
            _ => Err(self.error(line, format!("index {raw} out of range (have {len})"))),
        }
    }

    fn face(&mut self, line: usize, args: &[&str]) -> Result<(), AssetError> {
        if args.len() < 3 {
            return Err(self.error(line, "face needs at least 3 vertices"));
        }
        let mut corners = Vec::with_capacity(args.len());
        for arg in args {
            let mut parts = arg.split('/');
            let p = parts.next().unwrap_or("");
            let p = self.index(line, p, self.data.positions.len())?;
            let t = match parts.next() {
                Some("") | None => None,
                Some(t) => Some(self.index(line, t, self.data.tex_coords.len())?),
            };
            let n = match parts.next() {
                Some("") | None => None,
                Some(n) => Some(self.index(line, n, self.data.normals.len())?),
            };
            corners.push(self.current.vertex((p, t, n)));
        }

        if self.flags.triangulate {
            for i in 1..corners.len() - 1 {
                self.current
                    .faces
                    .push(vec![corners[0], corners[i], corners[i + 1]]);
            }
        } else {
            self.current.faces.push(corners);
        }
        Ok(())
    }
}

fn parse_obj(
    source: &str,
    path: &Path,
    dir: &Path,
    name: &str,
    flags: ImportFlags,
) -> Result<ImportedScene, AssetError> {
    let mut parser = Parser {
        path,
        flags,
        data: Attributes::default(),
        materials: HashMap::new(),
        groups: vec![Group {
            name: name.to_string(),
            meshes: Vec::new(),
        }],
        meshes: Vec::new(),
        current: MeshBuilder {
            name: name.to_string(),
            ..Default::default()
        },
    };

    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        let mut tokens = content.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();
        match keyword {
            "v" => {
                let [x, y, z] = parser.floats::<3>(line, &args)?;
                parser.data.positions.push(Vec3::new(x, y, z));
            }
            "vn" => {
                let [x, y, z] = parser.floats::<3>(line, &args)?;
                parser.data.normals.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parser.floats_at_least::<2>(line, &args, 1)?;
                parser.data.tex_coords.push(Vec2::new(u, v));
            }
            "f" => parser.face(line, &args)?,
            "o" | "g" => {
                parser.flush();
                let group = args.join(" ");
                let group = if group.is_empty() {
                    format!("group{}", parser.groups.len())
                } else {
                    group
                };
                parser.current.name = group.clone();
                parser.groups.push(Group {
                    name: group,
                    meshes: Vec::new(),
                });
            }
            "usemtl" => {
                parser.flush();
                parser.current.material = args.first().map(|s| s.to_string());
            }
            "mtllib" => {
                for lib in &args {
                    let lib_path = dir.join(lib);
                    match read(&lib_path) {
                        Ok(text) => parser.materials.extend(parse_mtl(&text, dir)),
                        Err(e) => tracing::warn!("skipping material library: {e}"),
                    }
                }
            }
            "s" | "l" | "p" => {}
            other => tracing::trace!(line, keyword = other, "ignored obj statement"),
        }
    }
    parser.flush();

    let mut groups = parser.groups.into_iter();
    let root_group = groups.next().map(|g| g.meshes).unwrap_or_default();
    let mut nodes = vec![ImportedNode {
        name: name.to_string(),
        meshes: root_group,
        children: Vec::new(),
    }];
    for group in groups.filter(|g| !g.meshes.is_empty()) {
        let index = nodes.len();
        nodes.push(ImportedNode {
            name: group.name,
            meshes: group.meshes,
            children: Vec::new(),
        });
        nodes[0].children.push(index);
    }

    Ok(ImportedScene {
        nodes,
        root: Some(0),
        meshes: parser.meshes,
        flags: Default::default(),
    }
    .finish())
}

/// Texture kind for an MTL map statement, if it is one we bind.
fn map_kind(keyword: &str) -> Option<TextureKind> {
    match keyword.to_ascii_lowercase().as_str() {
        "map_kd" => Some(TextureKind::Diffuse),
        "map_ks" => Some(TextureKind::Specular),
        "map_bump" | "bump" | "norm" | "map_kn" => Some(TextureKind::Normal),
        "disp" | "map_disp" | "map_ka" => Some(TextureKind::Height),
        _ => None,
    }
}

/// File name of a map statement: option flags (`-bm 0.5`, `-o u v w`) come
/// first, everything after them is the name, spaces included.
fn map_file(args: &[&str]) -> Option<String> {
    let mut i = 0;
    while let Some(option) = args.get(i).filter(|a| a.len() > 1 && a.starts_with('-')) {
        let max_values = match option.to_ascii_lowercase().as_str() {
            "-o" | "-s" | "-t" => 3,
            "-mm" => 2,
            _ => 1,
        };
        i += 1;
        for _ in 0..max_values {
            match args.get(i) {
                Some(value) if max_values == 1 || value.parse::<f32>().is_ok() => i += 1,
                _ => break,
            }
        }
    }
    let file = args.get(i..)?.join(" ");
    (!file.is_empty()).then_some(file)
}

/// Parse an MTL file into material name -> texture references.
pub(crate) fn parse_mtl(source: &str, dir: &Path) -> HashMap<String, Vec<TextureRef>> {
    let mut materials: HashMap<String, Vec<TextureRef>> = HashMap::new();
    let mut current: Option<String> = None;

    for raw in source.lines() {
        let content = raw.split('#').next().unwrap_or("").trim();
        let mut tokens = content.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        if keyword == "newmtl" {
            let name = tokens.collect::<Vec<_>>().join(" ");
            materials.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let (Some(kind), Some(material)) = (map_kind(keyword), current.as_ref()) else {
            continue;
        };
        if let Some(file) = map_file(&tokens.collect::<Vec<_>>()) {
            let path: PathBuf = dir.join(file.replace('\\', "/"));
            if let Some(textures) = materials.get_mut(material) {
                textures.push(TextureRef { kind, path });
            }
        }
    }
    materials
}
