//! Uniform and attribute reflection over naga IR.
//!
//! The uniform contract is a single struct at `@group(0) @binding(0)` whose
//! members are looked up by name exactly once, at link time. A member the
//! shader does not declare resolves to `None` — an unbound slot whose
//! setters silently no-op. The same applies to vertex attributes, looked up
//! by entry-point argument name (`position`, `normal`, `color`).

use std::collections::BTreeMap;

use naga::{AddressSpace, Binding, Module, ShaderStage as NagaStage};

use super::shader::ShaderError;

/// The bind group/binding every program's uniform struct occupies.
pub(crate) const UNIFORM_GROUP: u32 = 0;
pub(crate) const UNIFORM_BINDING: u32 = 0;

/// A resolved uniform member: byte offset and size inside the uniform
/// struct. Absence (an unbound uniform) is represented as `Option::None`
/// at the table level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UniformSlot {
    pub offset: u32,
    pub size: u32,
}

/// The fixed, enumerated uniform interface of a linked program. Each slot is
/// `None` when the shader pair does not declare that member.
#[derive(Debug, Clone, Default)]
pub(crate) struct UniformTable {
    pub model: Option<UniformSlot>,
    pub model_inv_tr: Option<UniformSlot>,
    pub view_proj: Option<UniformSlot>,
    pub color: Option<UniformSlot>,
    pub color_gradient: Option<UniformSlot>,
    pub time: Option<UniformSlot>,
    pub amp: Option<UniformSlot>,
    pub freq: Option<UniformSlot>,
    pub speed: Option<UniformSlot>,
    pub noise_scale: Option<UniformSlot>,
    pub noise_strength: Option<UniformSlot>,
    pub noise_speed: Option<UniformSlot>,
    pub use_gradient: Option<UniformSlot>,
    pub use_rainbow: Option<UniformSlot>,
    /// Byte span of the merged uniform struct (0 when neither stage
    /// declares one).
    pub span: u32,
}

/// Reflected vertex attribute shader locations, by contract name.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AttributeTable {
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub color: Option<u32>,
}

/// The full linked interface of a program: uniforms, attributes, and the
/// resolved entry point names.
#[derive(Debug, Clone)]
pub(crate) struct ProgramInterface {
    pub uniforms: UniformTable,
    pub attributes: AttributeTable,
    pub vs_entry: String,
    pub fs_entry: String,
}

fn link_err(label: &str, reason: impl Into<String>) -> ShaderError {
    ShaderError::ProgramLink {
        label: label.to_owned(),
        reason: reason.into(),
    }
}

/// Entry point for the given stage, or a link error if the module has none.
fn entry_point<'m>(
    module: &'m Module,
    stage: NagaStage,
    label: &str,
) -> Result<&'m naga::EntryPoint, ShaderError> {
    module.entry_points.iter().find(|ep| ep.stage == stage).ok_or_else(|| {
        link_err(label, format!("module declares no {stage:?} entry point"))
    })
}

/// Collect the uniform struct members of the module's `(0, 0)` binding as a
/// name → slot map, plus the struct's span. Modules may also declare no
/// uniforms at all; any *other* binding is a link error since the pipeline
/// layout only carries the contract binding.
fn uniform_members(
    module: &Module,
    label: &str,
) -> Result<(BTreeMap<String, UniformSlot>, u32), ShaderError> {
    let mut members = BTreeMap::new();
    let mut span = 0;

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        if binding.group != UNIFORM_GROUP || binding.binding != UNIFORM_BINDING
        {
            return Err(link_err(
                label,
                format!(
                    "unsupported binding @group({}) @binding({}); the \
                     uniform contract is a single struct at @group({}) \
                     @binding({})",
                    binding.group,
                    binding.binding,
                    UNIFORM_GROUP,
                    UNIFORM_BINDING
                ),
            ));
        }
        if var.space != AddressSpace::Uniform {
            return Err(link_err(
                label,
                "the contract binding must be in the uniform address space",
            ));
        }

        let naga::TypeInner::Struct {
            members: ty_members,
            span: struct_span,
        } = &module.types[var.ty].inner
        else {
            return Err(link_err(
                label,
                "the contract uniform binding must be a struct",
            ));
        };

        span = *struct_span;
        for member in ty_members {
            let Some(name) = &member.name else { continue };
            let size = module.types[member.ty].inner.size(module.to_ctx());
            let _ = members.insert(
                name.clone(),
                UniformSlot {
                    offset: member.offset,
                    size,
                },
            );
        }
    }

    Ok((members, span))
}

/// Merge the uniform member maps of the two stages. A member declared by
/// both stages must agree on offset and size — a mismatch means the stage
/// sources were written against different struct layouts.
fn merge_uniforms(
    vs: BTreeMap<String, UniformSlot>,
    fs: BTreeMap<String, UniformSlot>,
    label: &str,
) -> Result<BTreeMap<String, UniformSlot>, ShaderError> {
    let mut merged = vs;
    for (name, slot) in fs {
        match merged.get(&name) {
            Some(existing) if *existing != slot => {
                return Err(link_err(
                    label,
                    format!(
                        "uniform '{name}' has conflicting layouts across \
                         stages (offset {} vs {})",
                        existing.offset, slot.offset
                    ),
                ));
            }
            _ => {
                let _ = merged.insert(name, slot);
            }
        }
    }
    Ok(merged)
}

/// Per-location sizes of a stage boundary (vertex outputs or fragment
/// inputs), builtins excluded.
fn io_locations(
    module: &Module,
    args: bool,
    ep: &naga::EntryPoint,
) -> BTreeMap<u32, u32> {
    let mut locations = BTreeMap::new();
    let mut push = |binding: Option<&Binding>, ty: naga::Handle<naga::Type>| {
        if let Some(Binding::Location { location, .. }) = binding {
            let size = module.types[ty].inner.size(module.to_ctx());
            let _ = locations.insert(*location, size);
        }
    };

    if args {
        for arg in &ep.function.arguments {
            match &arg.binding {
                Some(b) => push(Some(b), arg.ty),
                None => {
                    if let naga::TypeInner::Struct { members, .. } =
                        &module.types[arg.ty].inner
                    {
                        for m in members {
                            push(m.binding.as_ref(), m.ty);
                        }
                    }
                }
            }
        }
    } else if let Some(result) = &ep.function.result {
        match &result.binding {
            Some(b) => push(Some(b), result.ty),
            None => {
                if let naga::TypeInner::Struct { members, .. } =
                    &module.types[result.ty].inner
                {
                    for m in members {
                        push(m.binding.as_ref(), m.ty);
                    }
                }
            }
        }
    }

    locations
}

/// Vertex attribute locations by argument/member name.
fn vertex_attributes(module: &Module, ep: &naga::EntryPoint) -> AttributeTable {
    let mut by_name: BTreeMap<String, u32> = BTreeMap::new();
    let mut push = |name: Option<&String>, binding: Option<&Binding>| {
        if let (Some(name), Some(Binding::Location { location, .. })) =
            (name, binding)
        {
            let _ = by_name.insert(name.clone(), *location);
        }
    };

    for arg in &ep.function.arguments {
        match &arg.binding {
            Some(b) => push(arg.name.as_ref(), Some(b)),
            None => {
                if let naga::TypeInner::Struct { members, .. } =
                    &module.types[arg.ty].inner
                {
                    for m in members {
                        push(m.name.as_ref(), m.binding.as_ref());
                    }
                }
            }
        }
    }

    AttributeTable {
        position: by_name.get("position").copied(),
        normal: by_name.get("normal").copied(),
        color: by_name.get("color").copied(),
    }
}

impl UniformTable {
    fn from_members(members: &BTreeMap<String, UniformSlot>, span: u32) -> Self {
        let slot = |name: &str| members.get(name).copied();
        Self {
            model: slot("model"),
            model_inv_tr: slot("model_inv_tr"),
            view_proj: slot("view_proj"),
            color: slot("color"),
            color_gradient: slot("color_gradient"),
            time: slot("time"),
            amp: slot("amp"),
            freq: slot("freq"),
            speed: slot("speed"),
            noise_scale: slot("noise_scale"),
            noise_strength: slot("noise_strength"),
            noise_speed: slot("noise_speed"),
            use_gradient: slot("use_gradient"),
            use_rainbow: slot("use_rainbow"),
            span,
        }
    }
}

/// Link the vertex and fragment modules: resolve entry points, check the
/// inter-stage interface, and reflect the merged uniform and attribute
/// tables. This runs exactly once per program, immediately after stage
/// compilation; the resulting locations are never re-resolved.
pub(crate) fn link(
    vs: &Module,
    fs: &Module,
    label: &str,
) -> Result<ProgramInterface, ShaderError> {
    let vs_ep = entry_point(vs, NagaStage::Vertex, label)?;
    let fs_ep = entry_point(fs, NagaStage::Fragment, label)?;

    // Every fragment input must be fed by a matching vertex output.
    let vs_outputs = io_locations(vs, false, vs_ep);
    let fs_inputs = io_locations(fs, true, fs_ep);
    for (location, size) in &fs_inputs {
        match vs_outputs.get(location) {
            None => {
                return Err(link_err(
                    label,
                    format!(
                        "fragment input @location({location}) has no \
                         matching vertex output"
                    ),
                ));
            }
            Some(out_size) if out_size != size => {
                return Err(link_err(
                    label,
                    format!(
                        "inter-stage @location({location}) size mismatch \
                         ({out_size} vs {size} bytes)"
                    ),
                ));
            }
            Some(_) => {}
        }
    }

    let (vs_uniforms, vs_span) = uniform_members(vs, label)?;
    let (fs_uniforms, fs_span) = uniform_members(fs, label)?;
    let merged = merge_uniforms(vs_uniforms, fs_uniforms, label)?;
    let span = vs_span.max(fs_span);

    Ok(ProgramInterface {
        uniforms: UniformTable::from_members(&merged, span),
        attributes: vertex_attributes(vs, vs_ep),
        vs_entry: vs_ep.name.clone(),
        fs_entry: fs_ep.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::composer::ShaderComposer;
    use crate::gpu::shader::{ShaderStage, StageKind};

    fn compile(kind: StageKind, source: &str) -> Module {
        let mut composer = ShaderComposer::new().unwrap();
        ShaderStage::compile(&mut composer, kind, source, "test.wgsl")
            .unwrap()
            .module
    }

    const FULL_VERT: &str = include_str!(
        "../../assets/shaders/fireball.vert.wgsl"
    );
    const FULL_FRAG: &str = include_str!(
        "../../assets/shaders/fireball.frag.wgsl"
    );
    const LAMBERT_VERT: &str = include_str!(
        "../../assets/shaders/lambert.vert.wgsl"
    );
    const LAMBERT_FRAG: &str = include_str!(
        "../../assets/shaders/lambert.frag.wgsl"
    );

    fn compile_pair(vert: &str, frag: &str) -> (Module, Module) {
        let mut composer = ShaderComposer::new().unwrap();
        let vs = ShaderStage::compile(
            &mut composer,
            StageKind::Vertex,
            vert,
            "test.vert.wgsl",
        )
        .unwrap();
        let fs = ShaderStage::compile(
            &mut composer,
            StageKind::Fragment,
            frag,
            "test.frag.wgsl",
        )
        .unwrap();
        (vs.module, fs.module)
    }

    #[test]
    fn fireball_reflects_the_full_uniform_contract() {
        let (vs, fs) = compile_pair(FULL_VERT, FULL_FRAG);
        let iface = link(&vs, &fs, "fireball").unwrap();
        let u = &iface.uniforms;

        // mat4x4 members are 64 bytes, 16-byte aligned, declared first.
        assert_eq!(u.model, Some(UniformSlot { offset: 0, size: 64 }));
        assert_eq!(
            u.model_inv_tr,
            Some(UniformSlot { offset: 64, size: 64 })
        );
        assert_eq!(u.view_proj, Some(UniformSlot { offset: 128, size: 64 }));
        assert_eq!(u.color, Some(UniformSlot { offset: 192, size: 16 }));
        assert_eq!(
            u.color_gradient,
            Some(UniformSlot { offset: 208, size: 16 })
        );
        assert_eq!(u.time, Some(UniformSlot { offset: 224, size: 4 }));
        assert!(u.amp.is_some());
        assert!(u.freq.is_some());
        assert!(u.speed.is_some());
        assert!(u.noise_scale.is_some());
        assert!(u.noise_strength.is_some());
        assert!(u.noise_speed.is_some());
        assert!(u.use_gradient.is_some());
        assert!(u.use_rainbow.is_some());
        assert!(u.span >= 260);

        assert_eq!(iface.attributes.position, Some(0));
        assert_eq!(iface.attributes.normal, Some(1));
        assert_eq!(iface.attributes.color, None);
        assert_eq!(iface.vs_entry, "vs_main");
        assert_eq!(iface.fs_entry, "fs_main");
    }

    #[test]
    fn lambert_leaves_undeclared_uniforms_unbound() {
        let (vs, fs) = compile_pair(LAMBERT_VERT, LAMBERT_FRAG);
        let iface = link(&vs, &fs, "lambert").unwrap();
        let u = &iface.uniforms;

        assert!(u.model.is_some());
        assert!(u.model_inv_tr.is_some());
        assert!(u.view_proj.is_some());
        assert!(u.color.is_some());
        // The subset struct never mentions the noise family.
        assert!(u.time.is_none());
        assert!(u.amp.is_none());
        assert!(u.noise_scale.is_none());
        assert!(u.use_rainbow.is_none());
    }

    #[test]
    fn fragment_input_without_vertex_output_fails_to_link() {
        let vs = compile(
            StageKind::Vertex,
            r"
            @vertex
            fn vs_main(@location(0) position: vec4<f32>)
                -> @builtin(position) vec4<f32> {
                return position;
            }
            ",
        );
        let fs = compile(
            StageKind::Fragment,
            r"
            @fragment
            fn fs_main(@location(0) normal: vec4<f32>)
                -> @location(0) vec4<f32> {
                return normal;
            }
            ",
        );
        let err = link(&vs, &fs, "mismatched").unwrap_err();
        assert!(matches!(err, ShaderError::ProgramLink { .. }));
    }

    #[test]
    fn conflicting_uniform_layouts_fail_to_link() {
        let vs = compile(
            StageKind::Vertex,
            r"
            struct Uniforms { time: f32, color: vec4<f32> }
            @group(0) @binding(0) var<uniform> u: Uniforms;

            @vertex
            fn vs_main(@location(0) position: vec4<f32>)
                -> @builtin(position) vec4<f32> {
                return position * u.time;
            }
            ",
        );
        let fs = compile(
            StageKind::Fragment,
            r"
            struct Uniforms { color: vec4<f32>, time: f32 }
            @group(0) @binding(0) var<uniform> u: Uniforms;

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return u.color;
            }
            ",
        );
        let err = link(&vs, &fs, "conflicting").unwrap_err();
        assert!(matches!(err, ShaderError::ProgramLink { .. }));
    }

    #[test]
    fn extra_bindings_are_rejected() {
        let vs = compile(
            StageKind::Vertex,
            r"
            @group(1) @binding(0) var<uniform> extra: vec4<f32>;

            @vertex
            fn vs_main(@location(0) position: vec4<f32>)
                -> @builtin(position) vec4<f32> {
                return position + extra;
            }
            ",
        );
        let fs = compile(
            StageKind::Fragment,
            r"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
            ",
        );
        let err = link(&vs, &fs, "extra").unwrap_err();
        assert!(matches!(err, ShaderError::ProgramLink { .. }));
    }

    #[test]
    fn missing_entry_point_fails_to_link() {
        let vs = compile(
            StageKind::Vertex,
            r"
            @vertex
            fn vs_main(@location(0) position: vec4<f32>)
                -> @builtin(position) vec4<f32> {
                return position;
            }
            ",
        );
        // A fragment-less module used in the fragment slot.
        let err = link(&vs, &vs.clone(), "no-fragment").unwrap_err();
        assert!(matches!(err, ShaderError::ProgramLink { .. }));
    }
}
