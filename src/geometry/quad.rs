//! A unit quad in the XY plane, facing +Z.

use glam::Vec3;

use crate::gpu::RenderContext;

use super::{Drawable, MeshBuffers, MeshData};

/// Two-triangle quad spanning `[-1, 1]` in X and Y around its center.
pub struct Quad {
    center: Vec3,
    mesh: MeshData,
    buffers: Option<MeshBuffers>,
}

impl Quad {
    /// A quad centered at `center`, with no mesh yet; call [`Quad::create`].
    pub fn new(center: Vec3) -> Self {
        Self {
            center,
            mesh: MeshData::default(),
            buffers: None,
        }
    }

    /// Generate the four-vertex mesh.
    pub fn create(&mut self) {
        let corners = [
            [-1.0, -1.0],
            [1.0, -1.0],
            [1.0, 1.0],
            [-1.0, 1.0],
        ];
        self.mesh = MeshData {
            positions: corners
                .iter()
                .map(|[x, y]| {
                    [x + self.center.x, y + self.center.y, self.center.z, 1.0]
                })
                .collect(),
            normals: vec![[0.0, 0.0, 1.0, 0.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        };
        self.buffers = None;
    }

    /// The current CPU mesh.
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }
}

impl Drawable for Quad {
    fn create_buffers(&mut self, ctx: &RenderContext) {
        self.buffers = Some(MeshBuffers::upload(ctx, "Quad", &self.mesh));
    }

    fn buffers(&self) -> Option<&MeshBuffers> {
        self.buffers.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_is_two_triangles_over_four_vertices() {
        let mut quad = Quad::new(Vec3::ZERO);
        quad.create();
        let mesh = quad.mesh();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 0.0, 1.0, 0.0]));
    }

    #[test]
    fn quad_is_flat_at_its_center_depth() {
        let mut quad = Quad::new(Vec3::new(0.0, 0.0, -2.0));
        quad.create();
        assert!(quad
            .mesh()
            .positions
            .iter()
            .all(|p| (p[2] + 2.0).abs() < f32::EPSILON));
    }
}
