//! Standalone visualization window backed by winit.
//!
//! ```no_run
//! # use pyre::Viewer;
//! Viewer::builder()
//!     .with_title("Fireball")
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::PyreError;
use crate::geometry::MAX_LEVEL;
use crate::options::Options;
use crate::RenderEngine;

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    options: Option<Options>,
    title: String,
}

impl ViewerBuilder {
    /// Create a builder with sensible defaults (title "Pyre", default
    /// options).
    fn new() -> Self {
        Self {
            options: None,
            title: "Pyre".into(),
        }
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            options: self.options,
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window that displays the fireball scene.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
///
/// Keys: `R` resets options, `L` reloads the scene, up/down arrows change
/// the tessellation level, `B` toggles the rainbow palette, `G` toggles the
/// gradient, `V` toggles the reference geometry, `S` saves the current
/// options as a preset.
pub struct Viewer {
    options: Option<Options>,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`PyreError::Viewer`] if the event loop cannot be created or
    /// fails while running.
    pub fn run(self) -> Result<(), PyreError> {
        let event_loop =
            EventLoop::new().map_err(|e| PyreError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            engine: None,
            options: self.options,
            title: self.title,
            last_title_update: Instant::now(),
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| PyreError::Viewer(e.to_string()))
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

/// Internal winit application handler.
struct ViewerApp {
    window: Option<Arc<Window>>,
    engine: Option<RenderEngine>,
    options: Option<Options>,
    title: String,
    last_title_update: Instant,
}

/// Clamp the window's inner size to something the surface accepts.
fn viewport_size(inner: winit::dpi::PhysicalSize<u32>) -> (u32, u32) {
    (inner.width.max(1), inner.height.max(1))
}

impl ViewerApp {
    fn handle_key(&mut self, code: KeyCode) {
        let Some(engine) = &mut self.engine else {
            return;
        };
        match code {
            KeyCode::KeyR => engine.reset_options(),
            KeyCode::KeyL => engine.load_scene(),
            KeyCode::ArrowUp => {
                let options = engine.options_mut();
                options.tessellation =
                    (options.tessellation + 1).min(MAX_LEVEL);
            }
            KeyCode::ArrowDown => {
                let options = engine.options_mut();
                options.tessellation = options.tessellation.saturating_sub(1);
            }
            KeyCode::KeyB => {
                let options = engine.options_mut();
                options.use_rainbow = !options.use_rainbow;
            }
            KeyCode::KeyG => {
                let options = engine.options_mut();
                options.use_gradient = !options.use_gradient;
            }
            KeyCode::KeyV => {
                let options = engine.options_mut();
                options.show_reference = !options.show_reference;
            }
            KeyCode::KeyS => {
                let path = Path::new("pyre-preset.toml");
                match engine.options().save(path) {
                    Ok(()) => {
                        log::info!("options saved to {}", path.display());
                    }
                    Err(e) => log::error!("failed to save options: {e}"),
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());
        let attrs = if let Some(mon) = &monitor {
            let mon_size = mon.size();
            let scale = mon.scale_factor();
            #[allow(clippy::cast_possible_truncation)]
            let logical_w = (mon_size.width as f64 / scale * 0.75) as u32;
            #[allow(clippy::cast_possible_truncation)]
            let logical_h = (mon_size.height as f64 / scale * 0.75) as u32;
            Window::default_attributes()
                .with_title(&self.title)
                .with_inner_size(winit::dpi::LogicalSize::new(
                    logical_w, logical_h,
                ))
        } else {
            Window::default_attributes().with_title(&self.title)
        };

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let (vp_w, vp_h) = viewport_size(window.inner_size());
        let options = self.options.take().unwrap_or_default();

        let mut engine = match pollster::block_on(RenderEngine::new(
            window.clone(),
            (vp_w, vp_h),
            options,
        )) {
            Ok(e) => e,
            Err(e) => {
                log::error!("Failed to initialize engine: {e}");
                event_loop.exit();
                return;
            }
        };

        engine.load_scene();

        window.request_redraw();
        self.window = Some(window);
        self.engine = Some(engine);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
            return;
        }

        // Guard: both window and engine must be initialised.
        if self.window.is_none() || self.engine.is_none() {
            return;
        }

        match event {
            WindowEvent::Resized(event_size) => {
                let (vp_w, vp_h) = viewport_size(event_size);
                if let Some(engine) = &mut self.engine {
                    engine.resize(vp_w, vp_h);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(engine) = &mut self.engine {
                    engine.update();
                    match engine.render() {
                        Ok(()) => {}
                        Err(
                            wgpu::SurfaceError::Outdated
                            | wgpu::SurfaceError::Lost,
                        ) => {
                            if let Some(w) = &self.window {
                                let (vp_w, vp_h) =
                                    viewport_size(w.inner_size());
                                engine.resize(vp_w, vp_h);
                            }
                        }
                        Err(e) => {
                            log::error!("render error: {e:?}");
                        }
                    }

                    // Refresh the FPS readout in the title at ~4 Hz.
                    let now = Instant::now();
                    if now.duration_since(self.last_title_update)
                        >= Duration::from_millis(250)
                    {
                        if let Some(w) = &self.window {
                            w.set_title(&format!(
                                "{} — {:.0} fps",
                                self.title,
                                engine.fps()
                            ));
                        }
                        self.last_title_update = now;
                    }
                }
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                self.handle_key(code);
            }

            _ => (),
        }
    }
}
