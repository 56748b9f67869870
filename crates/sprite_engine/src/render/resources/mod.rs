//! GPU resource handles and the material model built on top of them
//!
//! Textures and shader programs are owned by external loaders and the
//! graphics device; this module only keeps handles, introspection tables and
//! per-material state. Nothing here talks to the GPU directly except
//! [`registry::ResourceRegistry`], which asks the device to link programs.

pub mod material;
pub mod registry;
pub mod shader;
pub mod shader_state;
pub mod texture;
pub mod uniform;

pub use material::{BlendClass, BlendMode, Material, MaterialDescriptor};
pub use registry::{RelinkReport, ResourceRegistry};
pub use shader::{LinkStatus, LoadMode, ProgramId, ProgramInterface, Shader, ShaderSource};
pub use shader_state::{ShaderState, ShaderStateError, ShaderStateResult};
pub use texture::{TextureId, TextureInfo};
pub use uniform::{UniformSet, UniformSlot, UniformType, UniformValue};

/// Result type for resource validation
pub type ResourceResult<T> = Result<T, ResourceError>;

/// A drawable references a resource it cannot render with
///
/// These are never fatal: the affected command is dropped from the frame and
/// rendering continues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ResourceError {
    /// The drawable needs a texture and none is set
    #[error("No texture is set")]
    MissingTexture,

    /// The texture id is not registered
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),

    /// The program is neither built in nor a linked custom program
    #[error("Unknown or unlinked program {0:?}")]
    UnknownProgram(ProgramId),

    /// The drawable produced no triangles
    #[error("Drawable produced no geometry")]
    EmptyGeometry,

    /// Mesh indices reference a vertex that does not exist
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Number of vertices in the mesh
        vertex_count: usize,
    },

    /// Index count is not a multiple of three
    #[error("{0} indices do not form whole triangles")]
    IncompleteTriangles(usize),
}
