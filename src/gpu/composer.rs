//! WGSL composition with `#import` support.

use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use super::shader::{ShaderError, StageKind};

/// Shared module definition: source plus its virtual file path.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Stage sources use
/// `#import pyre::<module>` to pull in shared code. The composer produces
/// `naga::Module` IR directly, so pipeline creation skips a WGSL re-parse.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Build a composer with all shared modules registered.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::StageCompile`] if a shared module fails to
    /// parse — a broken embedded asset, surfaced at startup.
    pub fn new() -> Result<Self, ShaderError> {
        let mut composer = Composer::default();

        // Register shared modules in dependency order.
        let modules: &[ModuleDef] = &[ModuleDef {
            source: include_str!("../../assets/shaders/modules/noise.wgsl"),
            file_path: "modules/noise.wgsl",
        }];

        for m in modules {
            let result =
                composer.add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                });
            if let Err(e) = result {
                let log = e.emit_to_string(&composer);
                return Err(ShaderError::StageCompile {
                    kind: StageKind::Vertex,
                    path: m.file_path.to_owned(),
                    log,
                });
            }
        }

        Ok(Self { composer })
    }

    /// Compose a shader source string (which may contain `#import`
    /// directives) into naga IR.
    ///
    /// # Errors
    ///
    /// Returns the composer's rendered error log on failure.
    pub(crate) fn compose(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, String> {
        let result = self.composer.make_naga_module(NagaModuleDescriptor {
            source,
            file_path,
            shader_type: ShaderType::Wgsl,
            ..Default::default()
        });
        match result {
            Ok(module) => Ok(module),
            Err(e) => Err(e.emit_to_string(&self.composer)),
        }
    }

    /// Hand a composed module to wgpu as IR (requires the `naga-ir`
    /// feature on wgpu, skipping a runtime WGSL re-parse).
    pub(crate) fn create_shader_module(
        device: &wgpu::Device,
        label: &str,
        module: naga::Module,
    ) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        })
    }
}
