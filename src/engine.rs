//! The frame controller: owns the GPU context, shader programs, scene
//! geometry, and the per-frame update/render cycle.

use std::time::Instant;

use glam::Vec3;

use crate::camera::Camera;
use crate::error::PyreError;
use crate::geometry::{Cube, Drawable, Icosphere, Quad};
use crate::gpu::{
    RenderContext, ShaderComposer, ShaderProgram, ShaderStage, StageKind,
};
use crate::options::Options;
use crate::renderer::Renderer;
use crate::util::frame_timing::FrameTiming;

/// Vertex displacement amplitude.
const NOISE_AMP: f32 = 0.16;
/// Temporal speed of the displacement field.
const NOISE_SPEED: f32 = 1.3;
/// Spatial scale of the per-fragment grain.
const FRAG_NOISE_SCALE: f32 = 2.5;
/// Strength of the per-fragment grain.
const FRAG_NOISE_STRENGTH: f32 = 0.8;
/// Temporal speed of the per-fragment grain.
const FRAG_NOISE_SPEED: f32 = 2.0;

const FIREBALL_VERT: &str =
    include_str!("../assets/shaders/fireball.vert.wgsl");
const FIREBALL_FRAG: &str =
    include_str!("../assets/shaders/fireball.frag.wgsl");
const LAMBERT_VERT: &str = include_str!("../assets/shaders/lambert.vert.wgsl");
const LAMBERT_FRAG: &str = include_str!("../assets/shaders/lambert.frag.wgsl");

/// The loaded geometry set. Exists only after
/// [`RenderEngine::load_scene`] has run.
struct Scene {
    icosphere: Icosphere,
    cube: Cube,
    quad: Quad,
}

/// Owns everything a running frame loop needs.
///
/// An engine starts *uninitialized*: frames clear to the background color
/// but draw nothing until [`RenderEngine::load_scene`] moves it to the
/// running state. Tessellation changes are picked up at the start of the
/// next [`RenderEngine::update`], regenerating the sphere before the same
/// frame draws.
pub struct RenderEngine {
    /// GPU device/surface context.
    pub context: RenderContext,
    renderer: Renderer,
    camera: Camera,
    fireball: ShaderProgram,
    lambert: ShaderProgram,
    scene: Option<Scene>,
    options: Options,
    prev_tessellation: u32,
    start: Instant,
    frame_timing: FrameTiming,
}

impl RenderEngine {
    /// Build the engine: GPU context, both shader programs, camera, and
    /// renderer. No geometry is loaded yet.
    ///
    /// # Errors
    ///
    /// Returns [`PyreError`] if GPU initialization or shader
    /// compilation/linking fails.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        initial_size: (u32, u32),
        options: Options,
    ) -> Result<Self, PyreError> {
        let context = RenderContext::new(window, initial_size).await?;

        let mut composer = ShaderComposer::new()?;
        let mut compile = |kind, source, path| {
            ShaderStage::compile(&mut composer, kind, source, path)
        };
        let fireball_stages = vec![
            compile(StageKind::Vertex, FIREBALL_VERT, "fireball.vert.wgsl")?,
            compile(StageKind::Fragment, FIREBALL_FRAG, "fireball.frag.wgsl")?,
        ];
        let lambert_stages = vec![
            compile(StageKind::Vertex, LAMBERT_VERT, "lambert.vert.wgsl")?,
            compile(StageKind::Fragment, LAMBERT_FRAG, "lambert.frag.wgsl")?,
        ];
        let fireball =
            ShaderProgram::new(&context, "Fireball", fireball_stages)?;
        let lambert = ShaderProgram::new(&context, "Lambert", lambert_stages)?;

        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        camera.set_aspect_ratio(
            initial_size.0 as f32 / initial_size.1.max(1) as f32,
        );

        let mut renderer = Renderer::new(&context);
        renderer.set_clear_color(0.2, 0.2, 0.2, 1.0);

        let prev_tessellation = options.tessellation;
        log::info!("engine initialized ({}x{})", initial_size.0, initial_size.1);

        Ok(Self {
            context,
            renderer,
            camera,
            fireball,
            lambert,
            scene: None,
            options,
            prev_tessellation,
            start: Instant::now(),
            frame_timing: FrameTiming::new(),
        })
    }

    /// Generate and upload the scene geometry, moving the engine from
    /// uninitialized to running. Also restarts the animation clock. Safe to
    /// call again to rebuild the scene from scratch.
    pub fn load_scene(&mut self) {
        let mut icosphere = Icosphere::new(Vec3::ZERO);
        icosphere.create(self.options.tessellation);
        icosphere.create_buffers(&self.context);

        let mut cube = Cube::new(Vec3::new(3.0, 0.0, 0.0));
        cube.create();
        cube.create_buffers(&self.context);

        let mut quad = Quad::new(Vec3::new(-3.0, 0.0, 0.0));
        quad.create();
        quad.create_buffers(&self.context);

        self.prev_tessellation = self.options.tessellation;
        self.scene = Some(Scene {
            icosphere,
            cube,
            quad,
        });
        self.start = Instant::now();
        log::info!(
            "scene loaded at tessellation level {}",
            self.options.tessellation
        );
    }

    /// Per-frame update: regenerate the sphere if the tessellation level
    /// changed, then push the frame's uniforms. A no-op while uninitialized.
    pub fn update(&mut self) {
        let Some(scene) = &mut self.scene else { return };

        if self.options.tessellation != self.prev_tessellation {
            // A new generation is a new instance with fresh buffers; the old
            // sphere and its buffers are dropped, never mutated in place.
            let mut sphere = Icosphere::new(Vec3::ZERO);
            sphere.create(self.options.tessellation);
            sphere.create_buffers(&self.context);
            scene.icosphere = sphere;
            self.prev_tessellation = self.options.tessellation;
            log::debug!(
                "tessellation changed to level {}",
                self.options.tessellation
            );
        }

        self.camera.update();

        let ctx = &self.context;
        let time = self.start.elapsed().as_secs_f32();
        self.fireball.set_time(ctx, time);
        self.fireball.set_noise(
            ctx,
            NOISE_AMP,
            self.options.noise_frequency,
            NOISE_SPEED,
        );
        self.fireball.set_noise_frag(
            ctx,
            FRAG_NOISE_SCALE,
            FRAG_NOISE_STRENGTH,
            FRAG_NOISE_SPEED,
        );
        self.fireball
            .set_geometry_color(ctx, self.options.base_color.to_vec4());
        self.fireball
            .set_color_gradient(ctx, self.options.gradient_color.to_vec4());
        self.fireball
            .set_use_gradient(ctx, self.options.use_gradient);
        self.fireball
            .set_use_rainbow(ctx, self.options.use_rainbow);

        // The reference shader only carries the base color; its unbound
        // noise and palette slots swallow nothing here.
        self.lambert
            .set_geometry_color(ctx, self.options.base_color.to_vec4());
    }

    /// Render one frame. While uninitialized this clears and presents;
    /// once running it draws the fireball sphere (plus the reference
    /// geometry when enabled).
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] when the swapchain fails; callers
    /// typically resize/reconfigure on `Lost`/`Outdated`.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let result = match &self.scene {
            None => self.renderer.clear(&self.context),
            Some(scene) => {
                let mut drawables: Vec<&dyn Drawable> =
                    vec![&scene.icosphere];
                if self.options.show_reference {
                    drawables.push(&scene.cube);
                    drawables.push(&scene.quad);
                }
                self.renderer.render(
                    &self.context,
                    &self.camera,
                    &mut self.fireball,
                    &drawables,
                )
            }
        };
        self.frame_timing.end_frame();
        result
    }

    /// Resize the surface, depth buffer, and camera. Zero-sized dimensions
    /// are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.context.resize(width, height);
        self.renderer.set_size(&self.context, width, height);
        self.camera
            .set_aspect_ratio(width as f32 / height as f32);
    }

    /// Current control values.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable control values; changes take effect on the next update.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Restore every control to its default value.
    pub fn reset_options(&mut self) {
        self.options = self.options.clone().reset();
        log::info!("options reset to defaults");
    }

    /// Smoothed frames-per-second readout.
    pub fn fps(&self) -> f32 {
        self.frame_timing.fps()
    }
}
