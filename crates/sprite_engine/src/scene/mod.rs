//! Scene management
//!
//! The scene graph owns every node of the scene, drawable or not, and
//! provides the transform hierarchy the render pipeline consumes.

pub mod bounds;
pub mod scene_graph;

pub use bounds::AABB;
pub use scene_graph::{SceneGraph, SceneNode, SceneError, SceneResult};
pub use crate::foundation::collections::NodeHandle;
