use glam::{Vec2, Vec3};

/// Tangent and bitangent of one triangle from its edge and UV deltas.
///
/// Returns `None` when the UV mapping is degenerate.
pub fn triangle_tangent_bitangent(vs: &[Vec3; 3], uvs: &[Vec2; 3]) -> Option<(Vec3, Vec3)> {
    let duv1 = uvs[1] - uvs[0];
    let duv2 = uvs[2] - uvs[0];
    let edge1 = vs[1] - vs[0];
    let edge2 = vs[2] - vs[0];

    let det = duv1.x * duv2.y - duv2.x * duv1.y;
    if det.abs() <= f32::EPSILON {
        return None;
    }
    let f = 1.0 / det;

    let tangent = f * (duv2.y * edge1 - duv1.y * edge2);
    let bitangent = f * (-duv2.x * edge1 + duv1.x * edge2);
    Some((tangent, bitangent))
}

/// Per-vertex tangents and bitangents, averaged over adjacent triangles.
///
/// Only triangular faces contribute. Vertices with no usable triangle get
/// zero vectors.
pub fn compute_tangents(
    positions: &[Vec3],
    tex_coords: &[Vec2],
    faces: &[Vec<u32>],
) -> (Vec<Vec3>, Vec<Vec3>) {
    let mut tangents = vec![Vec3::ZERO; positions.len()];
    let mut bitangents = vec![Vec3::ZERO; positions.len()];

    for face in faces {
        let [a, b, c] = match face.as_slice() {
            &[a, b, c] => [a as usize, b as usize, c as usize],
            _ => continue,
        };
        let (Some(&pa), Some(&pb), Some(&pc)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let (Some(&ua), Some(&ub), Some(&uc)) = (tex_coords.get(a), tex_coords.get(b), tex_coords.get(c))
        else {
            continue;
        };
        let Some((t, bt)) = triangle_tangent_bitangent(&[pa, pb, pc], &[ua, ub, uc]) else {
            continue;
        };
        for i in [a, b, c] {
            tangents[i] += t;
            bitangents[i] += bt;
        }
    }

    for v in tangents.iter_mut().chain(bitangents.iter_mut()) {
        *v = v.normalize_or_zero();
    }
    (tangents, bitangents)
}
