//! Shader stage compilation and the shader error taxonomy.
//!
//! A [`ShaderStage`] is WGSL source composed (resolving `#import` directives)
//! and validated into naga IR. Both failure modes are fatal construction
//! errors: a stage that does not compile aborts program construction, and a
//! program whose stages do not link is never returned in a partial state.

use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::composer::ShaderComposer;

/// The pipeline stage a shader module feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Vertex stage (`vs_main` entry point).
    Vertex,
    /// Fragment stage (`fs_main` entry point).
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

/// Errors surfaced while constructing a shader program.
///
/// Uniform or attribute lookups that miss are *not* errors — they resolve to
/// unbound slots and dependent setters no-op. Only compilation and linking
/// fail, and both are non-recoverable.
#[derive(Debug)]
pub enum ShaderError {
    /// A shader stage's source failed to compose or validate. `log` carries
    /// the rendered compiler output.
    StageCompile {
        /// Which stage failed.
        kind: StageKind,
        /// Source path of the failing stage (for diagnostics).
        path: String,
        /// Rendered compiler/validator log.
        log: String,
    },
    /// The attached stages failed to link into a program.
    ProgramLink {
        /// Label of the program under construction.
        label: String,
        /// Human-readable link failure description.
        reason: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageCompile { kind, path, log } => {
                write!(f, "{kind} stage '{path}' failed to compile:\n{log}")
            }
            Self::ProgramLink { label, reason } => {
                write!(f, "program '{label}' failed to link: {reason}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// Flatten an error and its sources into one log string, deepest cause
/// last. Validation errors bury the interesting detail in their source
/// chain.
fn render_error_chain(err: &dyn std::error::Error) -> String {
    let mut log = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        log.push_str("\n  caused by: ");
        log.push_str(&cause.to_string());
        source = cause.source();
    }
    log
}

/// A compiled shader stage: validated naga IR plus its stage kind.
#[derive(Debug)]
pub struct ShaderStage {
    pub(crate) kind: StageKind,
    pub(crate) module: naga::Module,
}

impl ShaderStage {
    /// Compose and validate WGSL source into a stage.
    ///
    /// `path` is used for `#import` resolution and diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::StageCompile`] when composition or validation
    /// fails; the error log includes the full compiler output.
    pub fn compile(
        composer: &mut ShaderComposer,
        kind: StageKind,
        source: &str,
        path: &str,
    ) -> Result<Self, ShaderError> {
        let module = composer.compose(source, path).map_err(|log| {
            ShaderError::StageCompile {
                kind,
                path: path.to_owned(),
                log,
            }
        })?;

        let mut validator =
            Validator::new(ValidationFlags::all(), Capabilities::default());
        if let Err(e) = validator.validate(&module) {
            return Err(ShaderError::StageCompile {
                kind,
                path: path.to_owned(),
                log: render_error_chain(&e),
            });
        }

        Ok(Self { kind, module })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_wgsl_compiles() {
        let mut composer = ShaderComposer::new().unwrap();
        let stage = ShaderStage::compile(
            &mut composer,
            StageKind::Vertex,
            r"
            @vertex
            fn vs_main(@location(0) position: vec4<f32>)
                -> @builtin(position) vec4<f32> {
                return position;
            }
            ",
            "test.vert.wgsl",
        );
        assert!(stage.is_ok());
    }

    #[test]
    fn bad_wgsl_is_a_compile_error_with_log() {
        let mut composer = ShaderComposer::new().unwrap();
        let err = ShaderStage::compile(
            &mut composer,
            StageKind::Fragment,
            "fn broken( { nope",
            "broken.frag.wgsl",
        )
        .unwrap_err();
        match err {
            ShaderError::StageCompile { kind, path, log } => {
                assert_eq!(kind, StageKind::Fragment);
                assert_eq!(path, "broken.frag.wgsl");
                assert!(!log.is_empty());
            }
            ShaderError::ProgramLink { .. } => {
                panic!("expected a stage compile error")
            }
        }
    }

    #[test]
    fn noise_module_import_resolves() {
        let mut composer = ShaderComposer::new().unwrap();
        let stage = ShaderStage::compile(
            &mut composer,
            StageKind::Fragment,
            r"
            #import pyre::noise::{fbm31}

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                let n = fbm31(vec3<f32>(0.5, 0.5, 0.5));
                return vec4<f32>(n, n, n, 1.0);
            }
            ",
            "noise_user.frag.wgsl",
        );
        assert!(stage.is_ok());
    }
}
