//! The shader-program abstraction: a linked GPU pipeline plus its reflected
//! uniform/attribute interface and the draw-binding protocol.

use glam::{Mat4, Vec4};

use crate::geometry::Drawable;
use crate::renderer::DEPTH_FORMAT;

use super::composer::ShaderComposer;
use super::reflect::{self, UniformTable};
use super::render_context::{ProgramId, RenderContext};
use super::shader::{ShaderError, ShaderStage, StageKind};
use super::uniforms::{normal_matrix, UniformBlock};

/// Vertex attributes are tightly packed float32x4 (positions carry w = 1,
/// normals w = 0), one buffer per attribute.
const ATTRIBUTE_STRIDE: wgpu::BufferAddress = 16;

/// Pipeline slot indices for the attributes a program declares, assigned in
/// contract order (position, normal, color) over the declared subset.
#[derive(Debug, Clone, Copy, Default)]
struct VertexSlots {
    position: Option<u32>,
    normal: Option<u32>,
    color: Option<u32>,
}

/// A linked shader program.
///
/// Owns the render pipeline compiled from an ordered list of shader stages,
/// the uniform staging block and its GPU buffer, and the attribute/uniform
/// tables resolved once at link time. Construction is all-or-nothing: a
/// stage that fails to compile or a pair that fails to link aborts with a
/// [`ShaderError`] and no partial program is ever returned.
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    block: UniformBlock,
    uniforms: UniformTable,
    slots: VertexSlots,
    topology: wgpu::PrimitiveTopology,
}

impl ShaderProgram {
    /// Link `stages` (one vertex, one fragment) into a program.
    ///
    /// Locations are resolved here, exactly once; they are never
    /// re-resolved. Uniforms or attributes the stages do not declare become
    /// unbound slots — setters for those silently no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::ProgramLink`] when the stage set is incomplete
    /// or the stages' interfaces do not match.
    pub fn new(
        ctx: &RenderContext,
        label: &str,
        stages: Vec<ShaderStage>,
    ) -> Result<Self, ShaderError> {
        let mut vertex = None;
        let mut fragment = None;
        for stage in stages {
            match stage.kind {
                StageKind::Vertex => vertex = Some(stage),
                StageKind::Fragment => fragment = Some(stage),
            }
        }
        let missing = |kind: StageKind| ShaderError::ProgramLink {
            label: label.to_owned(),
            reason: format!("no {kind} stage attached"),
        };
        let vertex = vertex.ok_or_else(|| missing(StageKind::Vertex))?;
        let fragment = fragment.ok_or_else(|| missing(StageKind::Fragment))?;

        let interface =
            reflect::link(&vertex.module, &fragment.module, label)?;

        let device = &ctx.device;
        let vs_module = ShaderComposer::create_shader_module(
            device,
            &format!("{label} VS"),
            vertex.module,
        );
        let fs_module = ShaderComposer::create_shader_module(
            device,
            &format!("{label} FS"),
            fragment.module,
        );

        let block = UniformBlock::new(interface.uniforms.span);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniforms")),
            size: block.bytes().len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} Bind Group Layout")),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: reflect::UNIFORM_BINDING,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} Bind Group")),
                layout: &bind_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: reflect::UNIFORM_BINDING,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{label} Pipeline Layout")),
                bind_group_layouts: &[&bind_layout],
                push_constant_ranges: &[],
            });

        // One vertex buffer per declared attribute, slots in contract order.
        let mut slots = VertexSlots::default();
        let mut locations = Vec::new();
        if let Some(loc) = interface.attributes.position {
            slots.position = Some(locations.len() as u32);
            locations.push(loc);
        }
        if let Some(loc) = interface.attributes.normal {
            slots.normal = Some(locations.len() as u32);
            locations.push(loc);
        }
        if let Some(loc) = interface.attributes.color {
            slots.color = Some(locations.len() as u32);
            locations.push(loc);
        }
        let vertex_attrs: Vec<[wgpu::VertexAttribute; 1]> = locations
            .iter()
            .map(|&shader_location| {
                [wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 0,
                    shader_location,
                }]
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout<'_>> = vertex_attrs
            .iter()
            .map(|attrs| wgpu::VertexBufferLayout {
                array_stride: ATTRIBUTE_STRIDE,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let topology = wgpu::PrimitiveTopology::TriangleList;
        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{label} Pipeline")),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vs_module,
                    entry_point: Some(&interface.vs_entry),
                    buffers: &vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fs_module,
                    entry_point: Some(&interface.fs_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.format(),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        log::debug!("linked shader program '{label}'");

        Ok(Self {
            id: ctx.active_program.allocate(),
            label: label.to_owned(),
            pipeline,
            bind_group,
            uniform_buffer,
            block,
            uniforms: interface.uniforms,
            slots,
            topology,
        })
    }

    /// Make this the active program (the analogue of binding it). Idempotent:
    /// returns `true` only when a switch actually occurred.
    pub fn activate(&self, ctx: &RenderContext) -> bool {
        ctx.active_program.switch_to(self.id)
    }

    fn flush(&self, ctx: &RenderContext) {
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, self.block.bytes());
    }

    /// Upload the model matrix, and — when the shader binds it — the
    /// inverse-transpose normal matrix derived from it.
    pub fn set_model_matrix(&mut self, ctx: &RenderContext, model: &Mat4) {
        let _ = self.activate(ctx);
        let mut wrote = self.block.write_mat4(self.uniforms.model, model);
        if self.uniforms.model_inv_tr.is_some() {
            wrote |= self
                .block
                .write_mat4(self.uniforms.model_inv_tr, &normal_matrix(model));
        }
        if wrote {
            self.flush(ctx);
        }
    }

    /// Upload the combined view-projection matrix.
    pub fn set_view_proj_matrix(&mut self, ctx: &RenderContext, vp: &Mat4) {
        let _ = self.activate(ctx);
        if self.block.write_mat4(self.uniforms.view_proj, vp) {
            self.flush(ctx);
        }
    }

    /// Upload the base geometry color.
    pub fn set_geometry_color(&mut self, ctx: &RenderContext, color: Vec4) {
        let _ = self.activate(ctx);
        if self.block.write_vec4(self.uniforms.color, color) {
            self.flush(ctx);
        }
    }

    /// Upload the gradient end color.
    pub fn set_color_gradient(&mut self, ctx: &RenderContext, color: Vec4) {
        let _ = self.activate(ctx);
        if self.block.write_vec4(self.uniforms.color_gradient, color) {
            self.flush(ctx);
        }
    }

    /// Upload the elapsed time in seconds.
    pub fn set_time(&mut self, ctx: &RenderContext, t: f32) {
        let _ = self.activate(ctx);
        if self.block.write_f32(self.uniforms.time, t) {
            self.flush(ctx);
        }
    }

    /// Upload the vertex-displacement noise parameters.
    pub fn set_noise(
        &mut self,
        ctx: &RenderContext,
        amp: f32,
        freq: f32,
        speed: f32,
    ) {
        let _ = self.activate(ctx);
        let mut wrote = self.block.write_f32(self.uniforms.amp, amp);
        wrote |= self.block.write_f32(self.uniforms.freq, freq);
        wrote |= self.block.write_f32(self.uniforms.speed, speed);
        if wrote {
            self.flush(ctx);
        }
    }

    /// Upload the fragment-noise parameters.
    pub fn set_noise_frag(
        &mut self,
        ctx: &RenderContext,
        scale: f32,
        strength: f32,
        speed: f32,
    ) {
        let _ = self.activate(ctx);
        let mut wrote =
            self.block.write_f32(self.uniforms.noise_scale, scale);
        wrote |= self.block.write_f32(self.uniforms.noise_strength, strength);
        wrote |= self.block.write_f32(self.uniforms.noise_speed, speed);
        if wrote {
            self.flush(ctx);
        }
    }

    /// Enable or disable gradient color blending.
    pub fn set_use_gradient(&mut self, ctx: &RenderContext, enabled: bool) {
        let _ = self.activate(ctx);
        if self
            .block
            .write_u32(self.uniforms.use_gradient, u32::from(enabled))
        {
            self.flush(ctx);
        }
    }

    /// Enable or disable the rainbow palette.
    pub fn set_use_rainbow(&mut self, ctx: &RenderContext, enabled: bool) {
        let _ = self.activate(ctx);
        if self
            .block
            .write_f32(self.uniforms.use_rainbow, f32::from(u8::from(enabled)))
        {
            self.flush(ctx);
        }
    }

    /// Bind the drawable's buffers to this program's attribute slots and
    /// issue one indexed draw.
    ///
    /// Attributes are bound only when the program declares them *and* the
    /// drawable provides the buffer; a declared attribute the drawable
    /// cannot feed skips the draw defensively (every pipeline slot must be
    /// bound). Attribute bindings are scoped to the pass — nothing leaks
    /// past the call.
    pub fn draw(
        &self,
        ctx: &RenderContext,
        pass: &mut wgpu::RenderPass<'_>,
        drawable: &dyn Drawable,
    ) {
        let _ = self.activate(ctx);

        if drawable.topology() != self.topology {
            log::warn!(
                "'{}': drawable topology {:?} does not match pipeline {:?}",
                self.label,
                drawable.topology(),
                self.topology
            );
            return;
        }

        let Some(index_buffer) = drawable.index_buffer() else {
            log::warn!(
                "'{}': drawable has no buffers (create_buffers not called?)",
                self.label
            );
            return;
        };

        if let Some(slot) = self.slots.position {
            let Some(buffer) = drawable.position_buffer() else {
                log::warn!(
                    "'{}': program wants positions the drawable lacks",
                    self.label
                );
                return;
            };
            pass.set_vertex_buffer(slot, buffer.slice(..));
        }
        if let Some(slot) = self.slots.normal {
            let Some(buffer) = drawable.normal_buffer() else {
                log::debug!(
                    "'{}': program wants normals the drawable lacks",
                    self.label
                );
                return;
            };
            pass.set_vertex_buffer(slot, buffer.slice(..));
        }
        if self.slots.color.is_some() {
            // No geometry producer supplies a color buffer; a program
            // declaring the attribute cannot be fed.
            log::debug!(
                "'{}': color attribute declared but drawables carry none",
                self.label
            );
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..drawable.index_count(), 0, 0..1);
    }
}
