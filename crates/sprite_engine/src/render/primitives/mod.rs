//! Core primitive types for rendering
//!
//! This module contains the vertex data shared by drawables, the batcher
//! and the graphics device.

pub mod vertex;

pub use vertex::{Vertex, VertexData, VertexLayoutId};
