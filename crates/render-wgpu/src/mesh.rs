use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// (outward normal, face up) for each cube face.
const FACES: [(Vec3, Vec3); 6] = [
    (Vec3::NEG_Z, Vec3::Y),
    (Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::NEG_X, Vec3::Y),
    (Vec3::X, Vec3::Y),
];

/// Cube spanning `[-1, 1]` on every axis, four vertices per face so each face
/// carries its own normal and full texture.
///
/// Each face's "right" is `normal × up`, which is screen-right for the
/// left-handed camera looking at that face from outside. Triangles wind
/// bottom-left, bottom-right, top-right, so outer faces are counter-clockwise
/// on screen.
pub fn cube_mesh() -> (Vec<Vertex>, Vec<u16>) {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, up) in FACES {
        let right = normal.cross(up);
        let base = vertices.len() as u16;
        #[rustfmt::skip]
        let corners = [
            (normal - right - up, [0.0, 1.0]),
            (normal + right - up, [1.0, 1.0]),
            (normal + right + up, [1.0, 0.0]),
            (normal - right + up, [0.0, 0.0]),
        ];
        for (position, uv) in corners {
            vertices.push(Vertex {
                position: position.to_array(),
                uv,
                normal: normal.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_24_vertices_36_indices() {
        let (v, i) = cube_mesh();
        assert_eq!(v.len(), 24);
        assert_eq!(i.len(), 36);
        assert!(i.iter().all(|&idx| (idx as usize) < v.len()));
    }

    #[test]
    fn corners_lie_on_unit_cube() {
        let (v, _) = cube_mesh();
        for vert in &v {
            assert!(vert.position.iter().all(|c| c.abs() == 1.0));
        }
    }

    #[test]
    fn faces_wind_for_left_handed_view() {
        let (v, i) = cube_mesh();
        for tri in i.chunks(3) {
            let a = Vec3::from(v[tri[0] as usize].position);
            let b = Vec3::from(v[tri[1] as usize].position);
            let c = Vec3::from(v[tri[2] as usize].position);
            let n = Vec3::from(v[tri[0] as usize].normal);
            // Right-handed cross product points inward, which is
            // counter-clockwise once the left-handed view mirrors it.
            assert!((b - a).cross(c - a).dot(n) < 0.0);
        }
    }

    #[test]
    fn normals_point_outward() {
        let (v, _) = cube_mesh();
        for vert in &v {
            let p = Vec3::from(vert.position);
            let n = Vec3::from(vert.normal);
            assert_eq!(p.dot(n), 1.0);
        }
    }
}
