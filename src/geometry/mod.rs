//! Drawable geometry: mesh data on the CPU, buffer upload, and the shape
//! generators.

mod cube;
mod icosphere;
mod quad;

pub use cube::Cube;
pub use icosphere::{Icosphere, MAX_LEVEL};
pub use quad::Quad;

use wgpu::util::DeviceExt;

use crate::gpu::RenderContext;

/// CPU-side mesh arrays. Positions carry `w = 1`, normals `w = 0`, so both
/// can run through the same 4-float attribute layout and the same matrix
/// transforms do the right thing for each.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Homogeneous vertex positions.
    pub positions: Vec<[f32; 4]>,
    /// Homogeneous vertex normals.
    pub normals: Vec<[f32; 4]>,
    /// Triangle-list indices into the vertex arrays.
    pub indices: Vec<u32>,
}

/// GPU buffers for one mesh, uploaded once. Regeneration (a tessellation
/// change, say) replaces the whole set.
#[derive(Debug)]
pub struct MeshBuffers {
    position: wgpu::Buffer,
    normal: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    /// Upload `mesh` to the device as one buffer per attribute plus the
    /// index buffer.
    pub fn upload(ctx: &RenderContext, label: &str, mesh: &MeshData) -> Self {
        let device = &ctx.device;
        let position =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Positions")),
                contents: bytemuck::cast_slice(&mesh.positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let normal =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Normals")),
                contents: bytemuck::cast_slice(&mesh.normals),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let index_count = mesh.indices.len() as u32;
        log::debug!(
            "uploaded '{label}': {} vertices, {} indices",
            mesh.positions.len(),
            index_count
        );
        Self {
            position,
            normal,
            index,
            index_count,
        }
    }
}

/// Something a [`ShaderProgram`](crate::gpu::ShaderProgram) can draw.
///
/// A drawable starts life as CPU data; [`Drawable::create_buffers`] uploads
/// it. Until then every buffer accessor returns `None` and a draw against it
/// is skipped.
pub trait Drawable {
    /// Upload (or re-upload) this drawable's mesh to the GPU.
    fn create_buffers(&mut self, ctx: &RenderContext);

    /// The uploaded buffers, if [`Drawable::create_buffers`] has run.
    fn buffers(&self) -> Option<&MeshBuffers>;

    /// Position attribute buffer.
    fn position_buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffers().map(|b| &b.position)
    }

    /// Normal attribute buffer.
    fn normal_buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffers().map(|b| &b.normal)
    }

    /// Index buffer (always `u32` indices).
    fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffers().map(|b| &b.index)
    }

    /// Number of indices to draw.
    fn index_count(&self) -> u32 {
        self.buffers().map_or(0, |b| b.index_count)
    }

    /// Primitive topology of the index data.
    fn topology(&self) -> wgpu::PrimitiveTopology {
        wgpu::PrimitiveTopology::TriangleList
    }
}
