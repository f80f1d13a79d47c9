use glam::Vec3;

/// Interleaved vertex consumed by both the WebGPU and WebGL2 pipelines.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;
    pub const UV_OFFSET: u64 = 12;
}

/// Axis-aligned cube centred on the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxGeometry {
    pub size: f32,
}

// (outward normal, right, up) per face; right x up == normal
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

impl BoxGeometry {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    pub fn edge_length(&self) -> f32 {
        self.size
    }

    /// Build 4 vertices per face and two counter-clockwise triangles per face,
    /// wound to face outward.
    pub fn build(&self) -> (Vec<Vertex>, Vec<u16>) {
        let half = self.size * 0.5;
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, right, up) in FACES {
            let (n, r, u) = (Vec3::from(normal), Vec3::from(right), Vec3::from(up));
            let base = vertices.len() as u16;
            for (sr, su) in CORNERS {
                let p = (n + r * sr + u * su) * half;
                vertices.push(Vertex {
                    position: p.to_array(),
                    uv: [(sr + 1.0) * 0.5, 1.0 - (su + 1.0) * 0.5],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        (vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_four_vertices_and_two_triangles_per_face() {
        let (v, i) = BoxGeometry::new(0.25).build();
        assert_eq!(v.len(), 24);
        assert_eq!(i.len(), 36);
        assert!(i.iter().all(|&idx| (idx as usize) < v.len()));
    }

    #[test]
    fn vertices_sit_on_the_box_surface() {
        let (v, _) = BoxGeometry::new(5.0).build();
        for vert in &v {
            for c in vert.position {
                assert!((c.abs() - 2.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn triangles_face_outward() {
        let (v, i) = BoxGeometry::new(1.0).build();
        for tri in i.chunks(3) {
            let a = Vec3::from(v[tri[0] as usize].position);
            let b = Vec3::from(v[tri[1] as usize].position);
            let c = Vec3::from(v[tri[2] as usize].position);
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn uvs_cover_unit_square() {
        let (v, _) = BoxGeometry::new(1.0).build();
        for vert in &v {
            assert!(vert.uv[0] == 0.0 || vert.uv[0] == 1.0);
            assert!(vert.uv[1] == 0.0 || vert.uv[1] == 1.0);
        }
    }
}
