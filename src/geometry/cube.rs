//! Axis-aligned unit cube with per-face normals.

use glam::Vec3;

use crate::gpu::RenderContext;

use super::{Drawable, MeshBuffers, MeshData};

/// A cube spanning `[-1, 1]` on each axis around its center. Each face owns
/// its four vertices so normals stay flat across the face.
pub struct Cube {
    center: Vec3,
    mesh: MeshData,
    buffers: Option<MeshBuffers>,
}

/// Four corners per face, counter-clockwise seen from outside, followed by
/// the face normal. Face order: +Z, -Z, +X, -X, +Y, -Y.
#[rustfmt::skip]
const FACES: [([[f32; 3]; 4], [f32; 3]); 6] = [
    ([[-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0]], [ 0.0,  0.0,  1.0]),
    ([[ 1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0]], [ 0.0,  0.0, -1.0]),
    ([[ 1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0]], [ 1.0,  0.0,  0.0]),
    ([[-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0]], [-1.0,  0.0,  0.0]),
    ([[-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0]], [ 0.0,  1.0,  0.0]),
    ([[-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0]], [ 0.0, -1.0,  0.0]),
];

impl Cube {
    /// A cube centered at `center`, with no mesh yet; call [`Cube::create`].
    pub fn new(center: Vec3) -> Self {
        Self {
            center,
            mesh: MeshData::default(),
            buffers: None,
        }
    }

    /// Generate the 24-vertex, 36-index mesh.
    pub fn create(&mut self) {
        let mut mesh = MeshData::default();
        for (corners, normal) in &FACES {
            let base = mesh.positions.len() as u32;
            for corner in corners {
                mesh.positions.push([
                    corner[0] + self.center.x,
                    corner[1] + self.center.y,
                    corner[2] + self.center.z,
                    1.0,
                ]);
                mesh.normals.push([normal[0], normal[1], normal[2], 0.0]);
            }
            // Two triangles fanning from the face's first corner.
            mesh.indices.extend_from_slice(&[
                base,
                base + 1,
                base + 2,
                base,
                base + 2,
                base + 3,
            ]);
        }
        self.mesh = mesh;
        self.buffers = None;
    }

    /// The current CPU mesh.
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }
}

impl Drawable for Cube {
    fn create_buffers(&mut self, ctx: &RenderContext) {
        self.buffers = Some(MeshBuffers::upload(ctx, "Cube", &self.mesh));
    }

    fn buffers(&self) -> Option<&MeshBuffers> {
        self.buffers.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn cube_has_duplicated_face_vertices() {
        let mut cube = Cube::new(Vec3::ZERO);
        cube.create();
        let mesh = cube.mesh();
        assert_eq!(mesh.positions.len(), 24);
        assert_eq!(mesh.normals.len(), 24);
        assert_eq!(mesh.indices.len(), 36);

        // Eight distinct corners, each shared by three faces.
        let mut seen: HashMap<[i32; 3], u32> = HashMap::new();
        for p in &mesh.positions {
            let key = [p[0] as i32, p[1] as i32, p[2] as i32];
            *seen.entry(key).or_insert(0) += 1;
        }
        assert_eq!(seen.len(), 8);
        assert!(seen.values().all(|&count| count == 3));
    }

    #[test]
    fn each_corner_is_indexed_four_to_five_times() {
        let mut cube = Cube::new(Vec3::ZERO);
        cube.create();
        let mesh = cube.mesh();

        // Walk the index buffer and tally references per unique corner.
        let mut refs: HashMap<[i32; 3], u32> = HashMap::new();
        for &i in &mesh.indices {
            let p = mesh.positions[i as usize];
            let key = [p[0] as i32, p[1] as i32, p[2] as i32];
            *refs.entry(key).or_insert(0) += 1;
        }
        assert_eq!(refs.len(), 8);
        assert!(refs.values().all(|&count| (4..=5).contains(&count)));
        assert_eq!(refs.values().sum::<u32>(), 36);
    }

    #[test]
    fn normals_are_axis_aligned_per_face() {
        let mut cube = Cube::new(Vec3::ZERO);
        cube.create();
        for quad in cube.mesh().normals.chunks_exact(4) {
            // Flat across the face.
            assert!(quad.iter().all(|n| n == &quad[0]));
            let axis_hits =
                quad[0][..3].iter().filter(|c| c.abs() == 1.0).count();
            assert_eq!(axis_hits, 1);
        }
    }

    #[test]
    fn faces_wind_outward() {
        let mut cube = Cube::new(Vec3::ZERO);
        cube.create();
        let mesh = cube.mesh();
        for tri in mesh.indices.chunks_exact(3) {
            let p = |i: u32| {
                let v = mesh.positions[i as usize];
                Vec3::new(v[0], v[1], v[2])
            };
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            let face_normal = (b - a).cross(c - a);
            let stored = mesh.normals[tri[0] as usize];
            let stored = Vec3::new(stored[0], stored[1], stored[2]);
            assert!(face_normal.dot(stored) > 0.0);
        }
    }

    #[test]
    fn center_offsets_every_vertex() {
        let mut cube = Cube::new(Vec3::new(0.0, 3.0, 0.0));
        cube.create();
        for p in &cube.mesh().positions {
            assert!(p[1] >= 2.0 && p[1] <= 4.0);
        }
    }
}
