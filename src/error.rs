//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;
use crate::gpu::shader::ShaderError;

/// Errors produced by the pyre crate.
#[derive(Debug)]
pub enum PyreError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Shader stage compilation or program link failure.
    Shader(ShaderError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for PyreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Shader(e) => write!(f, "shader error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for PyreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Shader(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for PyreError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<ShaderError> for PyreError {
    fn from(e: ShaderError) -> Self {
        Self::Shader(e)
    }
}

impl From<std::io::Error> for PyreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
