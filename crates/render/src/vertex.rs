//! Interleaved vertex format shared by every mesh.
//!
//! ```text
//! location  attribute     components  offset (floats)
//! 0         position      3 x f32      0
//! 1         normal        3 x f32      3
//! 2         uv            2 x f32      6
//! 3         tangent       3 x f32      8
//! 4         bitangent     3 x f32     11
//! 5         bone_ids      4 x i32     14
//! 6         bone_weights  4 x f32     18
//! stride 22 x 4 = 88 bytes
//! ```

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use overdrive_gpu::{AttributeType, VertexAttribute};

/// Maximum number of bones that can influence one vertex.
pub const MAX_BONE_INFLUENCE: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    /// Indices of influencing bones; read by the shader as integers.
    pub bone_ids: [i32; MAX_BONE_INFLUENCE],
    /// Sum to 1.0 when skinning is used.
    pub bone_weights: [f32; MAX_BONE_INFLUENCE],
}

/// Byte distance between consecutive vertices.
pub const VERTEX_STRIDE: i32 = size_of::<Vertex>() as i32;

const fn float(location: u32, components: i32, offset: usize) -> VertexAttribute {
    VertexAttribute {
        location,
        components,
        ty: AttributeType::Float,
        normalized: false,
        offset: offset as i32,
    }
}

/// Attribute table for [`Vertex`], in location order.
pub const VERTEX_LAYOUT: [VertexAttribute; 7] = [
    float(0, 3, offset_of!(Vertex, position)),
    float(1, 3, offset_of!(Vertex, normal)),
    float(2, 2, offset_of!(Vertex, uv)),
    float(3, 3, offset_of!(Vertex, tangent)),
    float(4, 3, offset_of!(Vertex, bitangent)),
    VertexAttribute {
        location: 5,
        components: MAX_BONE_INFLUENCE as i32,
        ty: AttributeType::Int,
        normalized: false,
        offset: offset_of!(Vertex, bone_ids) as i32,
    },
    float(6, MAX_BONE_INFLUENCE as i32, offset_of!(Vertex, bone_weights)),
];
