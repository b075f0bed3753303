use std::rc::Rc;

use overdrive_common::TextureKind;
use overdrive_gpu::{BufferId, BufferTarget, GraphicsContext, VertexArrayId};

use crate::shader::Shader;
use crate::texture::Texture;
use crate::vertex::{VERTEX_LAYOUT, VERTEX_STRIDE, Vertex};
use crate::RenderError;

/// Indexed triangle geometry uploaded to the GPU, with its texture bindings.
///
/// Textures are shared with other meshes of the same model; a mesh never
/// deletes them.
#[derive(Debug)]
pub struct Mesh {
    vertex_array: VertexArrayId,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    vertex_count: usize,
    index_count: u32,
    textures: Vec<Rc<Texture>>,
}

impl Mesh {
    /// Upload `vertices` and `indices` and declare the vertex layout.
    ///
    /// Fails without allocating anything when the mesh needs more texture
    /// units than the context offers.
    pub fn new(
        ctx: &mut dyn GraphicsContext,
        vertices: &[Vertex],
        indices: &[u32],
        textures: Vec<Rc<Texture>>,
    ) -> Result<Self, RenderError> {
        let max = ctx.max_texture_units();
        if textures.len() > max as usize {
            return Err(RenderError::TextureUnitsExceeded {
                count: textures.len(),
                max,
            });
        }
        if u32::try_from(vertices.len()).is_err() {
            return Err(RenderError::TooManyVertices {
                vertices: vertices.len(),
            });
        }
        let index_count = u32::try_from(indices.len()).map_err(|_| RenderError::TooManyVertices {
            vertices: vertices.len(),
        })?;

        let vertex_array = ctx.create_vertex_array()?;
        let vertex_buffer = match ctx.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                ctx.delete_vertex_array(vertex_array);
                return Err(e.into());
            }
        };
        let index_buffer = match ctx.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                ctx.delete_buffer(vertex_buffer);
                ctx.delete_vertex_array(vertex_array);
                return Err(e.into());
            }
        };

        ctx.bind_vertex_array(Some(vertex_array));
        ctx.upload_buffer(BufferTarget::Vertex, vertex_buffer, bytemuck::cast_slice(vertices));
        ctx.upload_buffer(BufferTarget::Index, index_buffer, bytemuck::cast_slice(indices));
        for attribute in &VERTEX_LAYOUT {
            ctx.vertex_attribute(attribute, VERTEX_STRIDE);
        }
        ctx.bind_vertex_array(None);

        tracing::debug!(
            vertices = vertices.len(),
            indices = indices.len(),
            textures = textures.len(),
            "uploaded mesh"
        );
        Ok(Self {
            vertex_array,
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len(),
            index_count,
            textures,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }

    pub fn textures(&self) -> &[Rc<Texture>] {
        &self.textures
    }

    /// Bind textures to consecutive units and draw every index.
    ///
    /// The i-th texture goes to unit i, and the sampler uniform for it is
    /// named by kind with a 1-based per-kind counter (`texture_diffuse1`,
    /// `texture_diffuse2`, `texture_specular1`, ...).
    pub fn draw(&self, ctx: &mut dyn GraphicsContext, shader: &Shader) {
        let mut counters = [0u32; TextureKind::ALL.len()];
        for (unit, texture) in self.textures.iter().enumerate() {
            let unit = unit as u32;
            let slot = TextureKind::ALL
                .iter()
                .position(|k| *k == texture.kind())
                .unwrap_or(0);
            counters[slot] += 1;

            ctx.active_texture(unit);
            shader.set_int(ctx, &texture.kind().uniform_name(counters[slot]), unit as i32);
            ctx.bind_texture(Some(texture.id()));
        }

        ctx.bind_vertex_array(Some(self.vertex_array));
        ctx.draw_elements(self.index_count);
        ctx.bind_vertex_array(None);
        ctx.active_texture(0);
    }

    /// Release the buffers and vertex array. Textures are left alone.
    pub fn destroy(self, ctx: &mut dyn GraphicsContext) {
        ctx.delete_buffer(self.vertex_buffer);
        ctx.delete_buffer(self.index_buffer);
        ctx.delete_vertex_array(self.vertex_array);
    }
}
