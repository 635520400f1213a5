//! Frame orchestration: clear, depth buffer, and the per-drawable draw loop.

use glam::Mat4;

use crate::camera::Camera;
use crate::geometry::Drawable;
use crate::gpu::{RenderContext, ShaderProgram};

/// Depth buffer format shared by every pipeline in the crate.
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Depth32Float;

/// Owns the clear color and the depth attachment; drives render passes.
pub struct Renderer {
    clear_color: wgpu::Color,
    depth_view: wgpu::TextureView,
}

fn create_depth_view(
    ctx: &RenderContext,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl Renderer {
    /// A renderer sized to the context's current surface, clearing to
    /// opaque black.
    pub fn new(ctx: &RenderContext) -> Self {
        Self {
            clear_color: wgpu::Color::BLACK,
            depth_view: create_depth_view(
                ctx,
                ctx.config.width,
                ctx.config.height,
            ),
        }
    }

    /// Set the color the next clear or render uses.
    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    /// Resize the depth attachment to match a resized surface.
    pub fn set_size(&mut self, ctx: &RenderContext, width: u32, height: u32) {
        self.depth_view = create_depth_view(ctx, width, height);
    }

    /// Clear color and depth without drawing anything, then present.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] when the swapchain cannot hand out a
    /// frame; the caller decides whether to reconfigure or bail.
    pub fn clear(&self, ctx: &RenderContext) -> Result<(), wgpu::SurfaceError> {
        let frame = ctx.acquire_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx.create_encoder();
        drop(self.begin_pass(&mut encoder, &view));
        ctx.submit(encoder);
        frame.present();
        Ok(())
    }

    /// Draw `drawables` with `program` from `camera`'s point of view into
    /// one freshly cleared frame, then present it.
    ///
    /// Both matrices are uploaded once per frame. All geometry is
    /// world-positioned at generation time, so the model matrix is a single
    /// shared identity; the program stages its uniforms in one buffer, and
    /// `queue.write_buffer` calls all land before the submit, so per-object
    /// transforms would need per-drawable dynamic offsets rather than
    /// rewrites between draws.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] when frame acquisition fails.
    pub fn render(
        &self,
        ctx: &RenderContext,
        camera: &Camera,
        program: &mut ShaderProgram,
        drawables: &[&dyn Drawable],
    ) -> Result<(), wgpu::SurfaceError> {
        program.set_view_proj_matrix(ctx, &camera.view_proj());
        program.set_model_matrix(ctx, &Mat4::IDENTITY);

        let frame = ctx.acquire_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx.create_encoder();
        {
            let mut pass = self.begin_pass(&mut encoder, &view);
            for drawable in drawables {
                program.draw(ctx, &mut pass, *drawable);
            }
        }
        ctx.submit(encoder);
        frame.present();
        Ok(())
    }

    fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                },
            ),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}
