//! GPU resource management: device/surface context, shader composition,
//! stage compilation, and the shader-program abstraction.

pub mod composer;
pub mod program;
pub mod render_context;
pub mod shader;

pub(crate) mod reflect;
pub(crate) mod uniforms;

pub use composer::ShaderComposer;
pub use program::ShaderProgram;
pub use render_context::{ProgramId, RenderContext, RenderContextError};
pub use shader::{ShaderError, ShaderStage, StageKind};
