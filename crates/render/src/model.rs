//! Model loading: imported scene graph -> flat list of drawable meshes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use overdrive_assets::{ImageDecoder, ImportFlags, ImportedMesh, ImportedScene, SceneImporter};
use overdrive_common::TextureKind;
use overdrive_gpu::GraphicsContext;

use crate::mesh::Mesh;
use crate::shader::Shader;
use crate::texture::{Texture, TextureCache};
use crate::vertex::Vertex;
use crate::LoadError;

/// Everything loaded from one model file.
///
/// Meshes are stored in depth-first pre-order of the scene's node tree.
/// Call [`Model::destroy`] to release GPU resources; dropping a model
/// without it leaks them on the context.
#[derive(Debug)]
pub struct Model {
    path: PathBuf,
    gamma: bool,
    meshes: Vec<Mesh>,
    textures: TextureCache,
}

/// Import options for [`Model`] construction.
pub struct ModelLoader<'a> {
    pub importer: &'a dyn SceneImporter,
    pub decoder: &'a dyn ImageDecoder,
    pub flags: ImportFlags,
    /// Store diffuse textures in sRGB format.
    pub gamma: bool,
}

impl<'a> ModelLoader<'a> {
    pub fn new(importer: &'a dyn SceneImporter, decoder: &'a dyn ImageDecoder) -> Self {
        Self {
            importer,
            decoder,
            flags: ImportFlags::default(),
            gamma: false,
        }
    }

    pub fn with_flags(mut self, flags: ImportFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_gamma(mut self, gamma: bool) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn load(&self, ctx: &mut dyn GraphicsContext, path: &Path) -> Result<Model, LoadError> {
        let _span = tracing::info_span!("model_load", path = %path.display()).entered();

        let scene = self
            .importer
            .import(path, self.flags)
            .map_err(|source| LoadError::Import {
                path: path.to_path_buf(),
                source,
            })
            .inspect_err(|e| tracing::error!("{e}"))?;

        let root = match scene.root {
            Some(root) if root < scene.nodes.len() => root,
            _ => {
                let err = LoadError::NoRoot {
                    path: path.to_path_buf(),
                };
                tracing::error!("{err}");
                return Err(err);
            }
        };
        if scene.flags.incomplete {
            let err = LoadError::Incomplete {
                path: path.to_path_buf(),
            };
            tracing::error!("{err}");
            return Err(err);
        }

        let mut model = Model {
            path: path.to_path_buf(),
            gamma: self.gamma,
            meshes: Vec::new(),
            textures: TextureCache::new(),
        };
        if let Err(err) = self.process_nodes(ctx, &scene, root, &mut model) {
            tracing::error!("{err}");
            model.destroy(ctx);
            return Err(err);
        }

        tracing::info!(
            meshes = model.meshes.len(),
            textures = model.textures.len(),
            vertices = model.vertex_count(),
            triangles = model.triangle_count(),
            "model loaded"
        );
        Ok(model)
    }

    /// Walk the node tree depth-first, children in importer order. A node
    /// reached twice means the graph is not a tree and fails the load.
    fn process_nodes(
        &self,
        ctx: &mut dyn GraphicsContext,
        scene: &ImportedScene,
        root: usize,
        model: &mut Model,
    ) -> Result<(), LoadError> {
        let mut stack = vec![root];
        let mut visited = BTreeSet::new();
        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                return Err(LoadError::NodeCycle {
                    path: model.path.clone(),
                    node: index,
                });
            }
            let Some(node) = scene.nodes.get(index) else {
                tracing::warn!(index, "dangling node reference skipped");
                continue;
            };
            for &mesh_index in &node.meshes {
                let Some(imported) = scene.meshes.get(mesh_index) else {
                    tracing::warn!(node = %node.name, mesh_index, "dangling mesh reference skipped");
                    continue;
                };
                let mesh = self.process_mesh(ctx, imported, model)?;
                model.meshes.push(mesh);
            }
            stack.extend(node.children.iter().rev());
        }
        Ok(())
    }

    fn process_mesh(
        &self,
        ctx: &mut dyn GraphicsContext,
        imported: &ImportedMesh,
        model: &mut Model,
    ) -> Result<Mesh, LoadError> {
        let vertices = convert_vertices(imported);

        let mut indices = Vec::with_capacity(imported.faces.len() * 3);
        let mut skipped = 0usize;
        for face in &imported.faces {
            if face.len() == 3 && face.iter().all(|&i| (i as usize) < vertices.len()) {
                indices.extend_from_slice(face);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!(mesh = %imported.name, skipped, "non-triangle or out-of-range faces skipped");
        }

        let mut textures: Vec<Rc<Texture>> = Vec::new();
        for kind in TextureKind::ALL {
            for texture_ref in imported.textures_of(kind) {
                let loaded =
                    model
                        .textures
                        .load(ctx, self.decoder, &texture_ref.path, kind, self.gamma);
                if let Some(texture) = loaded {
                    textures.push(texture);
                }
            }
        }

        Mesh::new(ctx, &vertices, &indices, textures).map_err(|source| LoadError::Mesh {
            path: model.path.clone(),
            mesh: imported.name.clone(),
            source,
        })
    }
}

/// Interleave an imported mesh's attribute arrays. Missing attributes are zero.
fn convert_vertices(mesh: &ImportedMesh) -> Vec<Vertex> {
    (0..mesh.positions.len())
        .map(|i| {
            let mut vertex = Vertex {
                position: mesh.positions[i].to_array(),
                ..Default::default()
            };
            if let Some(n) = mesh.normals.get(i) {
                vertex.normal = n.to_array();
            }
            if let Some(uv) = mesh.tex_coords.get(i) {
                vertex.uv = uv.to_array();
            }
            if let Some(t) = mesh.tangents.get(i) {
                vertex.tangent = t.to_array();
            }
            if let Some(b) = mesh.bitangents.get(i) {
                vertex.bitangent = b.to_array();
            }
            if let Some(ids) = mesh.bone_ids.get(i) {
                vertex.bone_ids = *ids;
            }
            if let Some(weights) = mesh.bone_weights.get(i) {
                vertex.bone_weights = *weights;
            }
            vertex
        })
        .collect()
}

impl Model {
    /// Import `path` with default flags.
    pub fn load(
        ctx: &mut dyn GraphicsContext,
        importer: &dyn SceneImporter,
        decoder: &dyn ImageDecoder,
        path: &Path,
        gamma: bool,
    ) -> Result<Self, LoadError> {
        ModelLoader::new(importer, decoder)
            .with_gamma(gamma)
            .load(ctx, path)
    }

    pub fn draw(&self, ctx: &mut dyn GraphicsContext, shader: &Shader) {
        for mesh in &self.meshes {
            mesh.draw(ctx, shader);
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// The deduplicated texture pool.
    pub fn textures(&self) -> impl Iterator<Item = &Rc<Texture>> {
        self.textures.iter()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn gamma(&self) -> bool {
        self.gamma
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> u64 {
        self.meshes.iter().map(|m| u64::from(m.triangle_count())).sum()
    }

    /// Release every mesh, then every texture.
    pub fn destroy(mut self, ctx: &mut dyn GraphicsContext) {
        for mesh in self.meshes.drain(..) {
            mesh.destroy(ctx);
        }
        self.textures.destroy(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::tests::{FS, VS};
    use crate::texture::tests::StubDecoder;
    use crate::RenderError;
    use glam::Vec3;
    use overdrive_assets::{AssetError, ImportedNode, TextureRef};
    use overdrive_gpu::HeadlessContext;

    /// Importer returning a fixed scene regardless of the path.
    struct StubImporter(ImportedScene);

    impl SceneImporter for StubImporter {
        fn import(&self, _path: &Path, _flags: ImportFlags) -> Result<ImportedScene, AssetError> {
            Ok(self.0.clone())
        }
    }

    struct FailingImporter;

    impl SceneImporter for FailingImporter {
        fn import(&self, path: &Path, _flags: ImportFlags) -> Result<ImportedScene, AssetError> {
            Err(AssetError::UnsupportedFormat(path.to_path_buf()))
        }
    }

    /// A mesh with `n` triangles that don't share vertices.
    fn mesh(name: &str, triangles: u32, textures: &[(&str, TextureKind)]) -> ImportedMesh {
        let mut m = ImportedMesh {
            name: name.to_string(),
            ..Default::default()
        };
        for t in 0..triangles {
            let base = t as f32;
            m.positions
                .extend([Vec3::new(base, 0.0, 0.0), Vec3::new(base + 1.0, 0.0, 0.0), Vec3::Y]);
            m.faces.push(vec![t * 3, t * 3 + 1, t * 3 + 2]);
        }
        m.textures = textures
            .iter()
            .map(|(p, k)| TextureRef {
                kind: *k,
                path: PathBuf::from(p),
            })
            .collect();
        m
    }

    fn node(name: &str, meshes: Vec<usize>, children: Vec<usize>) -> ImportedNode {
        ImportedNode {
            name: name.to_string(),
            meshes,
            children,
        }
    }

    /// root(m0) -> [a(m1) -> [c(m2)], b(m3)]
    fn tree_scene() -> ImportedScene {
        ImportedScene {
            nodes: vec![
                node("root", vec![0], vec![1, 3]),
                node("a", vec![1], vec![2]),
                node("c", vec![2], vec![]),
                node("b", vec![3], vec![]),
            ],
            root: Some(0),
            meshes: vec![
                mesh("m0", 1, &[]),
                mesh("m1", 2, &[]),
                mesh("m2", 3, &[]),
                mesh("m3", 4, &[]),
            ],
            flags: Default::default(),
        }
    }

    fn load(
        ctx: &mut HeadlessContext,
        scene: ImportedScene,
        decoder: &StubDecoder,
    ) -> Result<Model, LoadError> {
        Model::load(ctx, &StubImporter(scene), decoder, Path::new("scene.obj"), false)
    }

    #[test]
    fn meshes_follow_depth_first_preorder() {
        let mut ctx = HeadlessContext::new();
        let model = load(&mut ctx, tree_scene(), &StubDecoder::rgba()).unwrap();
        let triangles: Vec<u32> = model.meshes().iter().map(Mesh::triangle_count).collect();
        assert_eq!(triangles, vec![1, 2, 3, 4]);
        assert_eq!(model.vertex_count(), 30);
        assert_eq!(model.triangle_count(), 10);
        assert_eq!(model.path(), Path::new("scene.obj"));
    }

    #[test]
    fn incomplete_scene_allocates_nothing() {
        let mut ctx = HeadlessContext::new();
        let mut scene = tree_scene();
        scene.flags.incomplete = true;
        let err = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap_err();
        assert!(matches!(err, LoadError::Incomplete { .. }));
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
        assert_eq!(ctx.live_textures(), 0);
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn missing_root_is_fatal() {
        let mut ctx = HeadlessContext::new();
        let mut scene = tree_scene();
        scene.root = None;
        let err = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap_err();
        assert!(matches!(err, LoadError::NoRoot { .. }));
    }

    #[test]
    fn cyclic_node_graph_fails_without_leaking() {
        let mut ctx = HeadlessContext::new();
        let mut scene = tree_scene();
        // c points back at a
        scene.nodes[2].children.push(1);
        let err = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap_err();
        assert!(matches!(err, LoadError::NodeCycle { node: 1, .. }));
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
    }

    #[test]
    fn shared_child_node_is_rejected() {
        let mut ctx = HeadlessContext::new();
        let mut scene = tree_scene();
        // b also lists c, so c would be drawn twice
        scene.nodes[3].children.push(2);
        let err = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap_err();
        assert!(matches!(err, LoadError::NodeCycle { node: 2, .. }));
    }

    #[test]
    fn importer_failure_is_fatal() {
        let mut ctx = HeadlessContext::new();
        let err = Model::load(
            &mut ctx,
            &FailingImporter,
            &StubDecoder::rgba(),
            Path::new("x.fbx"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Import { .. }));
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn shared_texture_decoded_once() {
        let mut ctx = HeadlessContext::new();
        let decoder = StubDecoder::rgba();
        let scene = ImportedScene {
            nodes: vec![node("root", vec![0, 1], vec![])],
            root: Some(0),
            meshes: vec![
                mesh("left", 1, &[("brick.png", TextureKind::Diffuse)]),
                mesh("right", 1, &[("brick.png", TextureKind::Diffuse)]),
            ],
            flags: Default::default(),
        };
        let model = load(&mut ctx, scene, &decoder).unwrap();

        assert_eq!(decoder.decode_count(), 1);
        assert_eq!(model.texture_count(), 1);
        let a = &model.meshes()[0].textures()[0];
        let b = &model.meshes()[1].textures()[0];
        assert!(Rc::ptr_eq(a, b));
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn undecodable_texture_slot_is_skipped() {
        let mut ctx = HeadlessContext::new();
        let scene = ImportedScene {
            nodes: vec![node("root", vec![0], vec![])],
            root: Some(0),
            meshes: vec![mesh(
                "m",
                1,
                &[
                    ("missing_spec.png", TextureKind::Specular),
                    ("diffuse.png", TextureKind::Diffuse),
                ],
            )],
            flags: Default::default(),
        };
        let model = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap();
        let textures = model.meshes()[0].textures();
        assert_eq!(textures.len(), 1);
        assert_eq!(textures[0].kind(), TextureKind::Diffuse);
    }

    #[test]
    fn textures_ordered_by_kind() {
        let mut ctx = HeadlessContext::new();
        let scene = ImportedScene {
            nodes: vec![node("root", vec![0], vec![])],
            root: Some(0),
            meshes: vec![mesh(
                "m",
                1,
                &[
                    ("h.png", TextureKind::Height),
                    ("n.png", TextureKind::Normal),
                    ("d.png", TextureKind::Diffuse),
                    ("s.png", TextureKind::Specular),
                ],
            )],
            flags: Default::default(),
        };
        let model = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap();
        let kinds: Vec<_> = model.meshes()[0].textures().iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, TextureKind::ALL.to_vec());
    }

    #[test]
    fn failure_mid_load_releases_everything() {
        let mut ctx = HeadlessContext::new().with_max_texture_units(1);
        let scene = ImportedScene {
            nodes: vec![node("root", vec![0, 1], vec![])],
            root: Some(0),
            meshes: vec![
                mesh("ok", 1, &[("a.png", TextureKind::Diffuse)]),
                mesh(
                    "overflow",
                    1,
                    &[("b.png", TextureKind::Diffuse), ("c.png", TextureKind::Normal)],
                ),
            ],
            flags: Default::default(),
        };
        let err = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap_err();
        match err {
            LoadError::Mesh { mesh, source, .. } => {
                assert_eq!(mesh, "overflow");
                assert!(matches!(source, RenderError::TextureUnitsExceeded { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
        assert_eq!(ctx.live_textures(), 0);
    }

    #[test]
    fn non_triangle_faces_are_dropped() {
        let mut ctx = HeadlessContext::new();
        let mut m = mesh("m", 2, &[]);
        m.faces.push(vec![0, 1, 2, 3]);
        m.faces.push(vec![0, 1]);
        let scene = ImportedScene {
            nodes: vec![node("root", vec![0], vec![])],
            root: Some(0),
            meshes: vec![m],
            flags: Default::default(),
        };
        let model = load(&mut ctx, scene, &StubDecoder::rgba()).unwrap();
        assert_eq!(model.meshes()[0].index_count(), 6);
    }

    #[test]
    fn draw_and_destroy_cover_every_mesh() {
        let mut ctx = HeadlessContext::new();
        let model = load(&mut ctx, tree_scene(), &StubDecoder::rgba()).unwrap();
        let shader = Shader::from_source(&mut ctx, VS, FS).unwrap();
        shader.use_program(&mut ctx);
        model.draw(&mut ctx, &shader);
        assert_eq!(ctx.draw_calls(), 4);

        model.destroy(&mut ctx);
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
    }

    #[test]
    fn loads_obj_from_disk() {
        use overdrive_assets::{FileImporter, ImageFileDecoder};

        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::new(4, 4)
            .save(dir.path().join("crate.png"))
            .unwrap();
        std::fs::write(dir.path().join("crate.mtl"), "newmtl wood\nmap_Kd crate.png\n").unwrap();
        std::fs::write(
            dir.path().join("crate.obj"),
            "mtllib crate.mtl\n\
             v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             o front\nusemtl wood\nf 1/1 2/2 3/3 4/4\n\
             o back\nusemtl wood\nf 4/4 3/3 2/2 1/1\n",
        )
        .unwrap();

        let mut ctx = HeadlessContext::new();
        let model = Model::load(
            &mut ctx,
            &FileImporter,
            &ImageFileDecoder::default(),
            &dir.path().join("crate.obj"),
            true,
        )
        .unwrap();

        assert_eq!(model.meshes().len(), 2);
        assert_eq!(model.triangle_count(), 4);
        assert_eq!(model.texture_count(), 1);
        assert!(model.gamma());
        assert!(Rc::ptr_eq(
            &model.meshes()[0].textures()[0],
            &model.meshes()[1].textures()[0]
        ));
    }
}
