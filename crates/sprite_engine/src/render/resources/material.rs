//! # Materials
//!
//! A [`Material`] is the live, mutable rendering state of one drawable: its
//! shader state, texture and blend mode. A [`MaterialDescriptor`] is the
//! immutable value snapshot of that state taken when a drawable is submitted.
//!
//! ## Batch compatibility
//!
//! Two descriptors may share one draw call when program, texture, blend mode
//! and vertex layout are equal. Uniform values must also be equal unless the
//! batcher uploads them as per-instance arrays
//! ([`UniformBatchPolicy::PerInstanceArrays`]).
//!
//! Descriptors hold no GPU objects, so all of this is testable without a
//! device.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::shader::{ProgramId, Shader};
use super::shader_state::{ShaderState, ShaderStateResult};
use super::texture::{TextureId, TextureInfo};
use super::uniform::UniformSet;
use super::ResourceError;
use crate::core::config::UniformBatchPolicy;
use crate::render::primitives::VertexLayoutId;

/// Fixed-function blending applied when a draw call writes its pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlendMode {
    /// No blending, the source replaces the destination
    Opaque,
    /// `src * a + dst * (1 - a)`
    Alpha,
    /// `src + dst * (1 - a)` for premultiplied sources
    PremultipliedAlpha,
    /// `src * a + dst`
    Additive,
    /// `src * dst`
    Multiply,
}

impl BlendMode {
    /// Sort partition of this blend mode
    pub fn blend_class(self) -> BlendClass {
        match self {
            Self::Opaque => BlendClass::Opaque,
            _ => BlendClass::Transparent,
        }
    }
}

/// Opaque commands draw before transparent ones within a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlendClass {
    /// Drawn front-to-back, grouped by material
    Opaque = 0,
    /// Drawn back-to-front regardless of material
    Transparent = 1,
}

/// Immutable rendering identity of one submitted drawable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialDescriptor {
    /// Program that renders the geometry
    pub program: ProgramId,
    /// Bound texture, if any
    pub texture: Option<TextureId>,
    /// Blending
    pub blend_mode: BlendMode,
    /// Attribute layout of the vertex data
    pub vertex_layout: VertexLayoutId,
    /// Uniform values by slot
    pub uniforms: UniformSet,
    invalid: Option<ResourceError>,
}

impl MaterialDescriptor {
    /// Create a valid descriptor
    pub fn new(
        program: ProgramId,
        texture: Option<TextureId>,
        blend_mode: BlendMode,
        vertex_layout: VertexLayoutId,
        uniforms: UniformSet,
    ) -> Self {
        Self { program, texture, blend_mode, vertex_layout, uniforms, invalid: None }
    }

    /// Builder pattern: flag the descriptor as unusable
    #[must_use]
    pub fn with_invalid(mut self, reason: ResourceError) -> Self {
        self.invalid = Some(reason);
        self
    }

    /// Why the descriptor cannot be rendered, `None` when it can
    pub fn invalid_reason(&self) -> Option<&ResourceError> {
        self.invalid.as_ref()
    }

    /// Whether the descriptor can be rendered
    pub fn is_valid(&self) -> bool {
        self.invalid.is_none()
    }

    /// `Ok` for a renderable descriptor, otherwise the reason it is not
    pub fn validity(&self) -> Result<(), ResourceError> {
        self.invalid.clone().map_or(Ok(()), Err)
    }

    /// Sort partition derived from the blend mode
    pub fn blend_class(&self) -> BlendClass {
        self.blend_mode.blend_class()
    }

    /// Whether both descriptors share program, texture, blend mode and layout
    pub fn shares_pipeline_state(&self, other: &Self) -> bool {
        self.program == other.program
            && self.texture == other.texture
            && self.blend_mode == other.blend_mode
            && self.vertex_layout == other.vertex_layout
    }

    /// Batch compatibility requiring equal uniform values
    pub fn is_batch_compatible_with(&self, other: &Self) -> bool {
        self.is_batch_compatible_under(other, UniformBatchPolicy::RequireEqual)
    }

    /// Batch compatibility under a uniform batching policy
    pub fn is_batch_compatible_under(&self, other: &Self, policy: UniformBatchPolicy) -> bool {
        self.shares_pipeline_state(other)
            && match policy {
                UniformBatchPolicy::RequireEqual => self.uniforms == other.uniforms,
                UniformBatchPolicy::PerInstanceArrays => true,
            }
    }

    /// Deep copy decoupled from the live material
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Hash used as the material part of a sort key
    ///
    /// Equal for any two descriptors that are batch compatible under `policy`,
    /// so compatible commands sort next to each other.
    pub fn batch_hash(&self, policy: UniformBatchPolicy) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.program.hash(&mut hasher);
        self.texture.hash(&mut hasher);
        self.blend_mode.hash(&mut hasher);
        self.vertex_layout.hash(&mut hasher);
        if policy == UniformBatchPolicy::RequireEqual {
            self.uniforms.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Live rendering state owned by a drawable
///
/// Mutations only affect descriptors taken afterwards; commands already in
/// a render queue keep their snapshot.
#[derive(Debug, Clone)]
pub struct Material {
    shader_state: ShaderState,
    texture: Option<TextureInfo>,
    blend_mode: BlendMode,
    requires_texture: bool,
}

impl Material {
    /// Material rendering with a built-in program
    ///
    /// Textures with an alpha channel default to alpha blending.
    pub fn new(builtin: ProgramId, texture: Option<TextureInfo>) -> Self {
        let blend_mode = match texture {
            Some(texture) if texture.has_alpha() => BlendMode::Alpha,
            _ => BlendMode::Opaque,
        };
        Self {
            shader_state: ShaderState::new(builtin),
            texture,
            blend_mode,
            requires_texture: true,
        }
    }

    /// Material that renders vertex colors only
    pub fn untextured(builtin: ProgramId) -> Self {
        Self {
            requires_texture: false,
            ..Self::new(builtin, None)
        }
    }

    /// Shader state
    pub fn shader_state(&self) -> &ShaderState {
        &self.shader_state
    }

    /// Mutable shader state
    pub fn shader_state_mut(&mut self) -> &mut ShaderState {
        &mut self.shader_state
    }

    /// Switch to a custom shader, `None` restores the built-in program
    pub fn set_shader(&mut self, shader: Option<Arc<Shader>>) -> ShaderStateResult<bool> {
        self.shader_state.set_shader(shader)
    }

    /// Set an integer uniform of the custom shader
    pub fn set_uniform_int(&mut self, block: Option<&str>, name: &str, values: &[i32]) -> ShaderStateResult<()> {
        self.shader_state.set_uniform_int(block, name, values)
    }

    /// Set a float uniform of the custom shader
    pub fn set_uniform_float(&mut self, block: Option<&str>, name: &str, values: &[f32]) -> ShaderStateResult<()> {
        self.shader_state.set_uniform_float(block, name, values)
    }

    /// Bind a vertex attribute of the custom shader
    pub fn set_attribute(&mut self, name: &str, stride: u32, offset: u32) -> ShaderStateResult<()> {
        self.shader_state.set_attribute(name, stride, offset)
    }

    /// Texture, if any
    pub fn texture(&self) -> Option<&TextureInfo> {
        self.texture.as_ref()
    }

    /// Replace the texture; the blend mode is left untouched
    pub fn set_texture(&mut self, texture: Option<TextureInfo>) {
        self.texture = texture;
    }

    /// Blend mode
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Change the blend mode
    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    /// Value snapshot of the current state
    pub fn descriptor(&self) -> MaterialDescriptor {
        let descriptor = MaterialDescriptor::new(
            self.shader_state.program(),
            self.texture.map(|texture| texture.id),
            self.blend_mode,
            self.shader_state.vertex_layout(),
            self.shader_state.uniforms().clone(),
        );
        if self.requires_texture && self.texture.is_none() {
            descriptor.with_invalid(ResourceError::MissingTexture)
        } else {
            descriptor
        }
    }
}
