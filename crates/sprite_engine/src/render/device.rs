//! # Graphics Device Abstraction
//!
//! The render pipeline talks to the GPU exclusively through [`GfxDevice`].
//! Window and context creation are the application's business; the device
//! exposes only what the pipeline consumes: viewport, projection, program
//! linking, state binding primitives, buffer upload, draw and present.

use crate::foundation::math::{Mat4, Rect};
use crate::render::primitives::{VertexData, VertexLayoutId};
use crate::render::resources::{BlendMode, ProgramId, ProgramInterface, ShaderSource, TextureId, UniformSet};

/// Result type for device calls
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors reported by a graphics device
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Program compilation or linking failed
    #[error("Failed to link program {program:?}: {log}")]
    LinkFailed {
        /// Program that failed
        program: ProgramId,
        /// Compiler/linker info log
        log: String,
    },

    /// A buffer or uniform upload failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// The context is gone; nothing can be drawn until the application recreates it
    #[error("Graphics context lost")]
    ContextLost,
}

impl DeviceError {
    /// Whether the error ends the frame
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContextLost)
    }
}

/// GPU state binding and draw primitives consumed by the render pipeline
pub trait GfxDevice {
    /// Current viewport in pixels
    fn viewport(&self) -> Rect;

    /// Projection from world space to clip space
    fn projection(&self) -> Mat4;

    /// Compile and link a program, returning its introspected interface
    fn link_program(&mut self, program: ProgramId, source: &ShaderSource) -> DeviceResult<ProgramInterface>;

    /// Make `program` current
    fn bind_program(&mut self, program: ProgramId) -> DeviceResult<()>;

    /// Bind a texture to unit zero, `None` unbinds
    fn bind_texture(&mut self, texture: Option<TextureId>) -> DeviceResult<()>;

    /// Change blending
    fn set_blend_mode(&mut self, mode: BlendMode) -> DeviceResult<()>;

    /// Select the vertex attribute layout
    fn set_vertex_layout(&mut self, layout: VertexLayoutId) -> DeviceResult<()>;

    /// Upload uniform values of the current program
    fn upload_uniforms(&mut self, program: ProgramId, uniforms: &UniformSet) -> DeviceResult<()>;

    /// Upload per-instance uniform arrays of the current program
    fn upload_instance_uniforms(&mut self, program: ProgramId, instances: &[UniformSet]) -> DeviceResult<()>;

    /// Upload the vertex and index buffer for the next draw
    fn upload_vertices(&mut self, data: &VertexData) -> DeviceResult<()>;

    /// Draw `index_count` indices as a triangle list
    fn draw_indexed(&mut self, index_count: u32) -> DeviceResult<()>;

    /// Present the finished frame
    fn present(&mut self) -> DeviceResult<()>;
}
