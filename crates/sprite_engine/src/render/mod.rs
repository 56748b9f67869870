//! Rendering system
//!
//! Turns a scene graph into an ordered, batched stream of GPU calls. The
//! pipeline is a fixed chain of stages, each in its own module:
//!
//! - [`render_queue`]: snapshot visible drawables into render commands
//! - [`sorter`]: order commands by layer, blend class, material and depth
//! - [`batch_renderer`]: merge adjacent compatible commands into batches
//! - [`executor`]: bind only changed state and issue one draw per batch
//! - [`frame`]: run the stages once per frame
//!
//! The GPU is reached only through the [`device::GfxDevice`] trait. The
//! [`backends::headless`] backend records calls instead of drawing.

pub mod backends;
pub mod batch_renderer;
pub mod device;
pub mod drawable;
pub mod executor;
pub mod frame;
pub mod primitives;
pub mod render_queue;
pub mod resources;
pub mod sorter;

#[cfg(test)]
mod tests;

pub use batch_renderer::{BatchRenderer, BatchStats, RenderBatch};
pub use device::{DeviceError, DeviceResult, GfxDevice};
pub use drawable::{Drawable, DrawableKind};
pub use executor::{CommandExecutor, ExecutionStats, StateChanges};
pub use frame::{FrameRenderer, FrameStats};
pub use primitives::{Vertex, VertexData, VertexLayoutId};
pub use render_queue::{RenderCommand, RenderQueue, SortKey};
pub use resources::{Material, MaterialDescriptor, ResourceError, ResourceRegistry};
pub use sorter::CommandSorter;

use crate::config::ConfigError;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors surfaced by the frame pipeline
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The graphics context is gone
    ///
    /// The only error that ends a frame. The application must recreate the
    /// context and call [`FrameRenderer::reload_resources`] before rendering again.
    #[error("Graphics device lost")]
    DeviceLost,

    /// A recoverable device failure
    #[error("Device error: {0}")]
    Device(DeviceError),

    /// A drawable referenced an unusable resource
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Scene graph mutation failed
    #[error("Scene error: {0}")]
    Scene(#[from] crate::scene::SceneError),

    /// Shader state update failed
    #[error("Shader state error: {0}")]
    ShaderState(#[from] resources::ShaderStateError),

    /// Invalid renderer configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The worker thread pool could not be created
    #[error("Thread pool creation failed: {0}")]
    ThreadPool(String),
}

impl RenderError {
    /// Whether rendering cannot continue without recreating the device
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceLost)
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::ContextLost => Self::DeviceLost,
            other => Self::Device(other),
        }
    }
}
