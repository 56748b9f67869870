//! Per-material shader state
//!
//! Every material owns its own [`ShaderState`]. Two drawables sharing one
//! [`Shader`] still keep separate uniform values and attribute bindings, so
//! setting a uniform on one node never leaks into another.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::shader::{ProgramId, Shader};
use super::uniform::{UniformSet, UniformType, UniformValue};
use crate::render::primitives::VertexLayoutId;

/// Result type for shader state mutation
pub type ShaderStateResult<T> = Result<T, ShaderStateError>;

/// Failures when mutating shader state
///
/// None of these mutate the state they were raised on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderStateError {
    /// Per-program state was set while no custom shader is bound
    #[error("No custom shader is bound")]
    NoShaderBound,

    /// The shader failed to link; the previous shader stays active
    #[error("Shader '{0}' is not linked")]
    NotLinked(String),

    /// The bound shader has no such uniform
    #[error("Unknown uniform {}{name}", block.as_ref().map(|b| format!("{b}.")).unwrap_or_default())]
    UnknownUniform {
        /// Requested block
        block: Option<String>,
        /// Requested uniform
        name: String,
    },

    /// The bound shader has no such attribute
    #[error("Unknown attribute {0}")]
    UnknownAttribute(String),

    /// Value type or component count does not match the declaration
    #[error("Uniform {name} is {expected:?}, got {components} component(s)")]
    TypeMismatch {
        /// Uniform name
        name: String,
        /// Declared type
        expected: UniformType,
        /// Components supplied by the caller
        components: usize,
    },
}

/// Stride/offset pair describing where an attribute lives in the vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeBinding {
    /// Bytes between consecutive vertices
    pub stride: u32,
    /// Byte offset of the attribute inside a vertex
    pub offset: u32,
}

/// Shader selection, uniform values and attribute bindings of one material
#[derive(Debug, Clone)]
pub struct ShaderState {
    shader: Option<Arc<Shader>>,
    builtin: ProgramId,
    uniforms: UniformSet,
    attributes: BTreeMap<u32, AttributeBinding>,
}

impl ShaderState {
    /// State that renders with a built-in program
    pub fn new(builtin: ProgramId) -> Self {
        Self {
            shader: None,
            builtin,
            uniforms: UniformSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Custom shader, if any
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }

    /// Built-in program used when no custom shader is set
    pub fn builtin_program(&self) -> ProgramId {
        self.builtin
    }

    /// Program that will actually render
    pub fn program(&self) -> ProgramId {
        self.shader.as_ref().map_or(self.builtin, |shader| shader.program())
    }

    /// Switch to a custom shader, or back to the built-in program with `None`
    ///
    /// Returns whether the active shader changed. Uniform values and
    /// attribute bindings belong to the old program and are cleared on change.
    /// An unlinked shader is rejected and the current state is kept.
    pub fn set_shader(&mut self, shader: Option<Arc<Shader>>) -> ShaderStateResult<bool> {
        let changed = match (&self.shader, &shader) {
            (Some(current), Some(next)) => !Arc::ptr_eq(current, next),
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return Ok(false);
        }
        if let Some(next) = &shader {
            if !next.is_linked() {
                log::warn!("Refusing unlinked shader '{}', keeping {:?}", next.label(), self.program());
                return Err(ShaderStateError::NotLinked(next.label().to_string()));
            }
        }

        self.shader = shader;
        self.uniforms.clear();
        self.attributes.clear();
        Ok(true)
    }

    fn bound_shader(&self) -> ShaderStateResult<&Arc<Shader>> {
        self.shader.as_ref().ok_or(ShaderStateError::NoShaderBound)
    }

    fn set_uniform(&mut self, block: Option<&str>, name: &str, value: Option<UniformValue>, components: usize) -> ShaderStateResult<()> {
        let info = self.bound_shader()?.uniform(block, name).ok_or_else(|| ShaderStateError::UnknownUniform {
            block: block.map(str::to_string),
            name: name.to_string(),
        })?;
        let value = value.filter(|value| value.matches(info.ty)).ok_or_else(|| ShaderStateError::TypeMismatch {
            name: name.to_string(),
            expected: info.ty,
            components,
        })?;
        self.uniforms.insert(info.slot, value);
        Ok(())
    }

    /// Set an integer uniform (1-4 components), optionally inside a block
    pub fn set_uniform_int(&mut self, block: Option<&str>, name: &str, values: &[i32]) -> ShaderStateResult<()> {
        self.set_uniform(block, name, UniformValue::ints(values), values.len())
    }

    /// Set a float uniform (1-4 components, or 16 for a `mat4`), optionally inside a block
    pub fn set_uniform_float(&mut self, block: Option<&str>, name: &str, values: &[f32]) -> ShaderStateResult<()> {
        self.set_uniform(block, name, UniformValue::floats(values), values.len())
    }

    /// Describe where an attribute of the bound shader lives in the vertex buffer
    pub fn set_attribute(&mut self, name: &str, stride: u32, offset: u32) -> ShaderStateResult<()> {
        let info = self
            .bound_shader()?
            .attribute(name)
            .ok_or_else(|| ShaderStateError::UnknownAttribute(name.to_string()))?;
        self.attributes.insert(info.location, AttributeBinding { stride, offset });
        Ok(())
    }

    /// Current uniform values by slot
    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    /// Vertex layout implied by the attribute bindings
    pub fn vertex_layout(&self) -> VertexLayoutId {
        if self.attributes.is_empty() {
            return VertexLayoutId::STANDARD;
        }
        let mut hasher = DefaultHasher::new();
        self.attributes.hash(&mut hasher);
        VertexLayoutId::custom(hasher.finish())
    }
}
