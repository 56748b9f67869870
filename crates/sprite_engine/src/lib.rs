//! # Sprite Engine
//!
//! A scene graph of 2D drawables rendered through a sorted, batched command
//! pipeline.
//!
//! ## Features
//!
//! - **Scene Graph**: arena-allocated node hierarchy with cached world transforms
//! - **Drawables**: sprites, mesh sprites, text and particle systems
//! - **Materials**: custom shaders with introspected uniforms and attributes
//! - **Batching**: adjacent compatible draws merged into single draw calls
//! - **Minimal State Changes**: executor re-binds only what changed
//! - **Backends**: any [`render::GfxDevice`]; a headless recording device is included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sprite_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut device = RecordingDevice::new(800, 600);
//!     let mut registry = ResourceRegistry::new();
//!     let texture = registry.register_texture(TextureInfo::new(TextureId(1), 64, 64, 4));
//!
//!     let mut scene = SceneGraph::new();
//!     let node = SceneNode::with_drawable(Transform::from_2d(400.0, 300.0, 0.0, 0.0, 1.0), Sprite::new(Some(texture)));
//!     scene.add_child(scene.root(), node)?;
//!
//!     let mut renderer = FrameRenderer::new(RendererConfig::default())?;
//!     let stats = renderer.render_frame(&mut scene, &registry, &mut device)?;
//!     println!("{} draw calls", stats.draw_calls);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, BatchingConfig, EngineConfig, ParallelConfig, RendererConfig, UniformBatchPolicy},
        config::Config,
        foundation::math::{Mat4, Rect, Transform, Vec2, Vec3},
        render::{
            backends::headless::RecordingDevice,
            drawable::{Alignment, EmitterSettings, GlyphTable, MeshSprite, MeshVertex, ParticleSystem, Sprite, Text},
            resources::{BlendMode, ProgramId, ShaderSource, TextureId, TextureInfo},
            Drawable, FrameRenderer, FrameStats, GfxDevice, Material, RenderError, RenderResult, ResourceRegistry,
        },
        scene::{NodeHandle, SceneGraph, SceneNode},
    };
}
