//! # Core Engine Module
//!
//! Shared configuration used by every subsystem.

pub mod config;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    EngineConfig,
    RendererConfig,
    BatchingConfig,
    ParallelConfig,
    UniformBatchPolicy,
    Config,
    ConfigError,
};
