//! # Unified Configuration System
//!
//! All configuration structures for the engine live here. Every struct
//! deserializes with defaults for missing fields, so a config file only needs
//! to name what it overrides.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging and debug behaviour
//! - **Renderer Config**: batching, parallelism and culling of the render pipeline
//! - **Application Config**: the top-level tree loaded by applications

use std::time::Duration;

use serde::{Serialize, Deserialize};

// Re-export the config trait for convenience
pub use crate::config::{Config, ConfigError, ConfigFormat};

/// How uniform values take part in batch compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UniformBatchPolicy {
    /// Two commands only share a batch when their uniform values are equal
    #[default]
    RequireEqual,
    /// Uniform values may differ; each batch member gets a slot in a
    /// per-instance uniform array indexed by the vertex `instance` attribute
    PerInstanceArrays,
}

/// # Batching Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Merge adjacent compatible commands into one draw call
    pub enabled: bool,
    /// Upper bound of vertices in a merged vertex buffer
    ///
    /// A single command larger than this still gets its own batch.
    pub max_batch_vertices: usize,
    /// Uniform compatibility rule
    pub uniform_policy: UniformBatchPolicy,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_batch_vertices: 65_536,
            uniform_policy: UniformBatchPolicy::RequireEqual,
        }
    }
}

/// # Parallelism Configuration
///
/// Vertex production and sorting fall back to a single thread below their
/// thresholds, where spawning work costs more than it saves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads for the vertex production pool, `None` lets rayon decide
    pub worker_threads: Option<usize>,
    /// Minimum number of visible drawables before vertex data is produced in parallel
    pub parallel_vertex_threshold: usize,
    /// Minimum number of commands before the stable sort runs in parallel
    pub parallel_sort_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            parallel_vertex_threshold: 256,
            parallel_sort_threshold: 4096,
        }
    }
}

/// # Renderer Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Batching behaviour
    pub batching: BatchingConfig,
    /// Thread pool and thresholds
    pub parallel: ParallelConfig,
    /// Skip drawables whose bounds fall outside clip space under the device projection
    pub cull_offscreen: bool,
}

impl RendererConfig {
    /// Builder pattern: enable or disable batching
    pub fn with_batching(mut self, enabled: bool) -> Self {
        self.batching.enabled = enabled;
        self
    }

    /// Builder pattern: set the uniform batching policy
    pub fn with_uniform_policy(mut self, policy: UniformBatchPolicy) -> Self {
        self.batching.uniform_policy = policy;
        self
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batching.max_batch_vertices == 0 {
            return Err(ConfigError::Invalid("batching.max_batch_vertices must be > 0".to_string()));
        }
        if self.parallel.worker_threads == Some(0) {
            return Err(ConfigError::Invalid("parallel.worker_threads must be > 0".to_string()));
        }
        Ok(())
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level filter handed to env_logger (`RUST_LOG` wins when set)
    pub log_level: String,
    /// Report statistics of every frame rather than a periodic summary
    pub debug_mode: bool,
    /// Pace the frame loop at this rate; `None` runs unpaced
    pub target_fps: Option<u32>,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            target_fps: None,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Builder pattern: pace frames at `fps`
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }

    /// Wall-clock time one frame may take under `target_fps`
    pub fn frame_budget(&self) -> Option<Duration> {
        self.target_fps
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_secs(1) / fps)
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_fps == Some(0) {
            return Err(ConfigError::Invalid("engine.target_fps must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering pipeline configuration
    pub renderer: RendererConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}
