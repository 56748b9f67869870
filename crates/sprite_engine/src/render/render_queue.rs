//! # Render Queue System
//!
//! Collects one [`RenderCommand`] per visible drawable for the current frame.
//! A command is a self-contained snapshot: material descriptor, world-space
//! vertex data and world transform are copied at submission, so mutating a
//! node afterwards never changes an already queued command.
//!
//! ## Architecture
//!
//! - **RenderQueue**: frame-scoped list of commands, cleared every frame
//! - **RenderCommand**: snapshot of one drawable plus its [`SortKey`]
//! - **SortKey**: layer, blend class, depth and material hash
//!
//! Commands whose material is invalid or that produce no geometry are
//! dropped at submission and counted; they never reach the sorter.

use crate::core::config::UniformBatchPolicy;
use crate::foundation::collections::NodeHandle;
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::render::drawable::Drawable;
use crate::render::primitives::VertexData;
use crate::render::resources::{BlendClass, MaterialDescriptor, ResourceError, ResourceResult};

/// Ordering key of a command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortKey {
    /// Render layer, lower layers draw first
    pub layer: i32,
    /// Opaque before transparent
    pub blend_class: BlendClass,
    /// World-space z; smaller is nearer under the device projection
    pub depth: f32,
    /// Material identity; equal for batch-compatible descriptors
    pub material_hash: u64,
}

/// One drawable's snapshot for the current frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCommand {
    /// Ordering key
    pub sort_key: SortKey,
    /// Material snapshot
    pub material: MaterialDescriptor,
    /// World-space geometry
    pub vertex_data: VertexData,
    /// World transform the geometry was produced with
    pub transform: Mat4,
    /// Position in scene traversal; the final sort tie-break
    pub submission_index: u32,
    /// Scene node the command came from, if any
    pub node: Option<NodeHandle>,
}

impl RenderCommand {
    /// Snapshot a drawable
    ///
    /// Fails when the drawable's material is invalid or it has no geometry.
    pub fn build(
        drawable: &Drawable,
        transform: Mat4,
        layer: i32,
        submission_index: u32,
        policy: UniformBatchPolicy,
    ) -> ResourceResult<Self> {
        let (material, vertex_data) = drawable.prepare(&transform)?;
        Ok(Self::from_parts(material, vertex_data, transform, layer, submission_index, policy))
    }

    /// Assemble a command from an already produced snapshot
    pub fn from_parts(
        material: MaterialDescriptor,
        vertex_data: VertexData,
        transform: Mat4,
        layer: i32,
        submission_index: u32,
        policy: UniformBatchPolicy,
    ) -> Self {
        let sort_key = SortKey {
            layer,
            blend_class: material.blend_class(),
            depth: transform.translation_part().z,
            material_hash: material.batch_hash(policy),
        };
        Self { sort_key, material, vertex_data, transform, submission_index, node: None }
    }

    /// Builder pattern: remember the source node
    #[must_use]
    pub fn from_node(mut self, node: NodeHandle) -> Self {
        self.node = Some(node);
        self
    }
}

/// Frame-scoped collection of render commands
#[derive(Debug)]
pub struct RenderQueue {
    commands: Vec<RenderCommand>,
    policy: UniformBatchPolicy,
    next_submission: u32,
    dropped: usize,
}

impl RenderQueue {
    /// Create an empty queue
    pub fn new(policy: UniformBatchPolicy) -> Self {
        Self::with_capacity(policy, 0)
    }

    /// Create a queue with pre-allocated capacity
    pub fn with_capacity(policy: UniformBatchPolicy, capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            policy,
            next_submission: 0,
            dropped: 0,
        }
    }

    /// Uniform policy used for material hashes
    pub fn policy(&self) -> UniformBatchPolicy {
        self.policy
    }

    /// Snapshot a drawable and append it in submission order
    ///
    /// Unrenderable drawables are dropped, logged and counted.
    pub fn submit(&mut self, drawable: &Drawable, transform: Mat4, layer: i32) -> ResourceResult<()> {
        let index = self.next_submission;
        let command = RenderCommand::build(drawable, transform, layer, index, self.policy);
        self.push(command)
    }

    /// Append a command built elsewhere, e.g. on a worker thread
    ///
    /// Later submissions are numbered after the highest index seen.
    pub fn push(&mut self, command: ResourceResult<RenderCommand>) -> ResourceResult<()> {
        match command {
            Ok(command) => {
                self.next_submission = self.next_submission.max(command.submission_index + 1);
                self.commands.push(command);
                Ok(())
            }
            Err(err) => {
                self.next_submission += 1;
                self.record_drop(&err);
                Err(err)
            }
        }
    }

    /// Count a drawable that was rejected before reaching the queue
    pub fn record_drop(&mut self, reason: &ResourceError) {
        self.dropped += 1;
        match reason {
            ResourceError::EmptyGeometry => log::trace!("Skipping drawable without geometry"),
            other => log::warn!("Dropping render command: {}", other),
        }
    }

    /// Commands in their current order
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Mutable commands, used by the sorter
    pub fn commands_mut(&mut self) -> &mut [RenderCommand] {
        &mut self.commands
    }

    /// Number of queued commands
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Number of drawables dropped since the last clear
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// Clear all commands for the next frame
    pub fn clear(&mut self) {
        self.commands.clear();
        self.next_submission = 0;
        self.dropped = 0;
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new(UniformBatchPolicy::default())
    }
}
