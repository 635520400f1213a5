//! Real-time procedural fireball renderer built on wgpu.
//!
//! Pyre displays procedurally generated geometry (an icosphere, optionally a
//! reference cube and quad) shaded with a time-varying, noise-driven
//! "fireball" effect. The crate is organized around three contracts:
//!
//! - [`gpu::ShaderProgram`] — owns a linked GPU pipeline, the reflected
//!   uniform/attribute interface, and the draw-binding protocol.
//! - [`geometry::Drawable`] — the capability set every renderable geometry
//!   satisfies (position/normal/index buffers, element count, topology).
//! - [`renderer::Renderer`] — the single per-frame entry point tying camera,
//!   shader program, and drawables together.
//!
//! The frame loop lives in [`engine::RenderEngine`]; the optional `viewer`
//! feature adds a winit-backed window around it.
//!
//! Shader stages are WGSL, composed with `naga_oil` (`#import pyre::noise`)
//! and reflected through naga IR: uniforms a shader does not declare resolve
//! to unbound slots whose setters silently no-op, so one program interface
//! serves shader variants implementing any subset of the uniform contract.

pub mod camera;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod options;
pub mod renderer;
pub mod util;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use engine::RenderEngine;
pub use error::PyreError;
pub use options::Options;
#[cfg(feature = "viewer")]
pub use viewer::Viewer;
