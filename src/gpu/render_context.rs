//! Core wgpu resources and the process-wide active-program state.

use std::cell::Cell;
use std::fmt;
use std::num::NonZeroU64;

/// Errors that can occur during GPU context initialization.
#[derive(Debug)]
pub enum RenderContextError {
    /// Failed to create a wgpu surface from the window handle.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
    /// Surface configuration not supported by the selected adapter.
    UnsupportedSurface,
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceCreation(e) => {
                write!(f, "surface creation failed: {e}")
            }
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            Self::UnsupportedSurface => {
                write!(f, "surface configuration not supported by adapter")
            }
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SurfaceCreation(e) => Some(e),
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
            Self::UnsupportedSurface => None,
        }
    }
}

/// Identity of a linked shader program, allocated by the owning
/// [`RenderContext`]. Used to track which program is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramId(NonZeroU64);

/// Tracker for the single currently-active shader program.
///
/// Exactly one program may be active at a time; switching is observable and
/// idempotent. All mutation happens within a frame's single-threaded
/// execution, so a `Cell` suffices — there is no concurrent writer.
#[derive(Debug, Default)]
pub(crate) struct ActiveProgram {
    current: Cell<Option<ProgramId>>,
    next_id: Cell<u64>,
}

impl ActiveProgram {
    /// Hand out a fresh program identity.
    pub(crate) fn allocate(&self) -> ProgramId {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        // next_id starts at 0 and only increments, so n is never zero.
        ProgramId(NonZeroU64::new(n).unwrap_or(NonZeroU64::MIN))
    }

    /// Make `id` the active program. Returns `true` if a switch actually
    /// occurred, `false` when `id` was already active.
    pub(crate) fn switch_to(&self, id: ProgramId) -> bool {
        if self.current.get() == Some(id) {
            return false;
        }
        self.current.set(Some(id));
        true
    }

    pub(crate) fn current(&self) -> Option<ProgramId> {
        self.current.get()
    }
}

/// Owns the core wgpu resources: device, queue, surface, and configuration,
/// plus the process-wide active-program state shared by all
/// [`ShaderProgram`](crate::gpu::ShaderProgram)s.
pub struct RenderContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    /// The window surface for presentation.
    pub surface: wgpu::Surface<'static>,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    pub(crate) active_program: ActiveProgram,
}

impl RenderContext {
    /// Create a new render context from the given window surface target and
    /// initial size.
    ///
    /// # Errors
    ///
    /// Returns [`RenderContextError`] if surface creation, adapter request,
    /// device request, or surface configuration fails.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        initial_size: (u32, u32),
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(RenderContextError::SurfaceCreation)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::AdapterRequest)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Pyre Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::DeviceRequest)?;

        let mut config = surface
            .get_default_config(&adapter, initial_size.0, initial_size.1)
            .ok_or(RenderContextError::UnsupportedSurface)?;
        // Fifo blocks presentation on the display refresh — the frame loop's
        // only suspension point.
        config.present_mode = wgpu::PresentMode::Fifo;

        surface.configure(&device, &config);

        Ok(Self {
            device,
            queue,
            surface,
            config,
            active_program: ActiveProgram::default(),
        })
    }

    /// The surface texture format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Reconfigure the surface for the new window size. Ignores zero-sized
    /// dimensions.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Acquire the next swapchain texture for rendering.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] if the surface is lost, outdated, or
    /// timed out.
    pub fn acquire_frame(
        &self,
    ) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    /// Create a new command encoder for recording GPU commands.
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pyre Encoder"),
            })
    }

    /// Finish the encoder and submit its command buffer to the GPU queue.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_hands_out_distinct_ids() {
        let active = ActiveProgram::default();
        let a = active.allocate();
        let b = active.allocate();
        assert_ne!(a, b);
    }

    #[test]
    fn switch_to_is_idempotent() {
        let active = ActiveProgram::default();
        let a = active.allocate();
        assert!(active.switch_to(a));
        assert!(!active.switch_to(a));
        assert_eq!(active.current(), Some(a));
    }

    #[test]
    fn switching_programs_is_observable() {
        let active = ActiveProgram::default();
        let a = active.allocate();
        let b = active.allocate();
        assert!(active.switch_to(a));
        assert!(active.switch_to(b));
        assert!(active.switch_to(a));
        assert_eq!(active.current(), Some(a));
    }
}
