//! Compiles a vertex/fragment pair into naga modules and resolves the
//! viewer's named uniforms against the result.
//!
//! Everything here runs on the CPU, so a broken shader is reported before a
//! window or GPU device exists.

mod preprocess;

use std::fmt;

use tracing::debug;
use wgpu::naga::{self, front::glsl, valid, AddressSpace, ResourceBinding, Scalar, TypeInner};

use crate::uniforms::{Uniform, UniformSlot, UniformTable};
use preprocess::PreparedStage;

/// Vertex attribute that receives the quad corners.
pub const POSITION_ATTRIBUTE: &str = "vPosition";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            Stage::Vertex => naga::ShaderStage::Vertex,
            Stage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// Line numbers in `diagnostic` count the `header_lines` generated lines
    /// placed in front of the user's source.
    #[error("{stage} shader failed to compile (subtract {header_lines} generated header lines from reported line numbers):\n{diagnostic}")]
    Compile {
        stage: Stage,
        header_lines: usize,
        diagnostic: String,
    },
    #[error("{stage} shader failed validation (subtract {header_lines} generated header lines from reported line numbers):\n{diagnostic}")]
    Validate {
        stage: Stage,
        header_lines: usize,
        diagnostic: String,
    },
    #[error("{stage} shader line {line}: uniform initialisers are not supported: `{declaration}`")]
    UnsupportedUniform {
        stage: Stage,
        line: usize,
        declaration: String,
    },
    #[error("failed to link shader program: {0}")]
    Link(String),
    #[error("shader program does not declare uniform `{0}`")]
    MissingUniform(Uniform),
    #[error("uniform `{uniform}` must be a float with {expected} component(s)")]
    UniformTypeMismatch { uniform: Uniform, expected: u32 },
    #[error("vertex shader does not declare input `{0}`")]
    MissingAttribute(&'static str),
}

/// A compiled, validated pair of stages plus the layout of their uniforms.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    vertex: naga::Module,
    fragment: naga::Module,
    uniforms: UniformTable,
    position_location: u32,
}

impl ShaderProgram {
    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    pub fn position_location(&self) -> u32 {
        self.position_location
    }

    pub(crate) fn vertex_module(&self) -> &naga::Module {
        &self.vertex
    }

    pub(crate) fn fragment_module(&self) -> &naga::Module {
        &self.fragment
    }
}

/// Compiles both stages and checks that every [`Uniform`] and the position
/// attribute are declared with the expected types.
pub fn compile_program(vertex: &str, fragment: &str) -> Result<ShaderProgram, ProgramError> {
    let prepared = preprocess::prepare(vertex, fragment)?;
    debug!(
        uniforms = prepared.uniforms.len(),
        "collected loose uniforms into {}",
        preprocess::UNIFORM_BLOCK_NAME
    );

    let vertex_module = compile_stage(Stage::Vertex, &prepared.vertex)?;
    let fragment_module = compile_stage(Stage::Fragment, &prepared.fragment)?;

    let uniforms = resolve_uniforms(&fragment_module)?;
    let position_location = prepared
        .vertex
        .input_location(POSITION_ATTRIBUTE)
        .ok_or(ProgramError::MissingAttribute(POSITION_ATTRIBUTE))?;

    Ok(ShaderProgram {
        vertex: vertex_module,
        fragment: fragment_module,
        uniforms,
        position_location,
    })
}

fn compile_stage(stage: Stage, prepared: &PreparedStage) -> Result<naga::Module, ProgramError> {
    let source = prepared.source.as_str();
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage.naga()), source)
        .map_err(|errors| ProgramError::Compile {
            stage,
            header_lines: prepared.header_lines,
            diagnostic: errors.emit_to_string(source),
        })?;

    valid::Validator::new(valid::ValidationFlags::all(), valid::Capabilities::all())
        .validate(&module)
        .map_err(|error| ProgramError::Validate {
            stage,
            header_lines: prepared.header_lines,
            diagnostic: error.emit_to_string(source),
        })?;

    Ok(module)
}

fn resolve_uniforms(module: &naga::Module) -> Result<UniformTable, ProgramError> {
    let block_binding = ResourceBinding {
        group: 0,
        binding: 0,
    };
    let block = module.global_variables.iter().find_map(|(_, var)| {
        if var.space != AddressSpace::Uniform || var.binding.as_ref() != Some(&block_binding) {
            return None;
        }
        match &module.types[var.ty].inner {
            TypeInner::Struct { members, span } => Some((members, *span)),
            _ => None,
        }
    });
    let Some((members, span)) = block else {
        return Err(ProgramError::MissingUniform(Uniform::ALL[0]));
    };

    let mut slots = [UniformSlot {
        offset: 0,
        components: 0,
    }; 5];
    for (slot, uniform) in slots.iter_mut().zip(Uniform::ALL) {
        let member = members
            .iter()
            .find(|member| member.name.as_deref() == Some(uniform.name()))
            .ok_or(ProgramError::MissingUniform(uniform))?;
        let components = float_components(&module.types[member.ty].inner);
        if components != Some(uniform.components()) {
            return Err(ProgramError::UniformTypeMismatch {
                uniform,
                expected: uniform.components(),
            });
        }
        *slot = UniformSlot {
            offset: member.offset,
            components: uniform.components(),
        };
    }

    Ok(UniformTable::new(slots, span))
}

fn float_components(inner: &TypeInner) -> Option<u32> {
    match *inner {
        TypeInner::Scalar(scalar) if scalar == Scalar::F32 => Some(1),
        TypeInner::Vector { size, scalar } if scalar == Scalar::F32 => Some(size as u32),
        _ => None,
    }
}
