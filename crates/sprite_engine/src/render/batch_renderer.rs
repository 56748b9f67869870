//! # Batch Renderer
//!
//! Merges runs of adjacent, batch-compatible commands from the sorted
//! command list into [`RenderBatch`]es. Each batch becomes one draw call
//! with one merged vertex buffer.
//!
//! ## Architecture
//!
//! - **BatchRenderer**: single left-to-right pass over sorted commands
//! - **RenderBatch**: shared material plus the concatenated vertex data
//! - **BatchStats**: per-frame batching statistics
//!
//! Only neighbours are merged, so the batch sequence draws exactly what the
//! sorted commands would draw one by one, in the same order. World
//! transforms are already baked into the vertices.

use std::ops::Range;

use crate::core::config::{BatchingConfig, UniformBatchPolicy};
use crate::render::primitives::VertexData;
use crate::render::render_queue::RenderCommand;
use crate::render::resources::{MaterialDescriptor, UniformSet};

/// A merged run of compatible commands, drawn with one draw call
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBatch {
    /// Material shared by every member; the first member's uniforms
    pub material: MaterialDescriptor,
    /// Concatenated world-space vertex data of all members
    pub vertex_data: VertexData,
    /// Number of triangles drawn
    pub draw_count: usize,
    /// Positions of the members in the sorted command slice
    pub command_range: Range<usize>,
    /// Per-member uniforms, indexed by the vertex `instance` attribute
    ///
    /// Empty unless the batch was built with per-instance uniform arrays.
    pub instance_uniforms: Vec<UniformSet>,
}

impl RenderBatch {
    /// Start a batch from its first command
    fn start(index: usize, command: &RenderCommand, policy: UniformBatchPolicy) -> Self {
        let mut batch = Self {
            material: command.material.clone(),
            vertex_data: VertexData::default(),
            draw_count: 0,
            command_range: index..index,
            instance_uniforms: Vec::new(),
        };
        batch.push(command, policy);
        batch
    }

    fn push(&mut self, command: &RenderCommand, policy: UniformBatchPolicy) {
        let instance = match policy {
            UniformBatchPolicy::RequireEqual => 0,
            UniformBatchPolicy::PerInstanceArrays => {
                self.instance_uniforms.push(command.material.uniforms.clone());
                self.command_count() as u32
            }
        };
        self.vertex_data.append(&command.vertex_data, instance);
        self.draw_count += command.vertex_data.triangle_count();
        self.command_range.end += 1;
    }

    /// Whether `command` may join this batch
    fn accepts(&self, command: &RenderCommand, config: &BatchingConfig) -> bool {
        config.enabled
            && self.material.is_batch_compatible_under(&command.material, config.uniform_policy)
            && self.vertex_data.vertices.len() + command.vertex_data.vertices.len() <= config.max_batch_vertices
    }

    /// Number of merged commands
    pub fn command_count(&self) -> usize {
        self.command_range.len()
    }

    /// Number of indices the draw call covers
    pub fn index_count(&self) -> usize {
        self.draw_count * 3
    }

    /// Check if this batch merged nothing
    pub fn is_empty(&self) -> bool {
        self.command_range.is_empty()
    }
}

/// Statistics for batching performance monitoring
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// Total number of render commands processed
    pub total_commands: usize,

    /// Number of batches created
    pub batch_count: usize,

    /// Vertices across all batches
    pub vertex_count: usize,

    /// Size of the largest batch in commands
    pub largest_batch: usize,

    /// Time spent building batches (microseconds)
    pub build_time_us: u64,
}

impl BatchStats {
    /// Calculate average commands per batch
    pub fn avg_commands_per_batch(&self) -> f32 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.total_commands as f32 / self.batch_count as f32
        }
    }
}

/// Batching stage of the frame pipeline
#[derive(Debug, Clone, Default)]
pub struct BatchRenderer {
    config: BatchingConfig,
    stats: BatchStats,
}

impl BatchRenderer {
    /// Create a batch renderer with custom configuration
    pub fn new(config: BatchingConfig) -> Self {
        Self { config, stats: BatchStats::default() }
    }

    /// Batching configuration
    pub fn config(&self) -> &BatchingConfig {
        &self.config
    }

    /// Statistics of the last [`build_batches`](Self::build_batches)
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Merge sorted commands into batches
    ///
    /// A batch is closed when the next command is incompatible or would push
    /// it past `max_batch_vertices`. A single oversized command still gets a
    /// batch of its own. With batching disabled every command is its own batch.
    pub fn build_batches(&mut self, commands: &[RenderCommand]) -> Vec<RenderBatch> {
        let start_time = std::time::Instant::now();
        let policy = self.config.uniform_policy;
        let mut batches: Vec<RenderBatch> = Vec::new();

        for (index, command) in commands.iter().enumerate() {
            match batches.last_mut() {
                Some(batch) if batch.accepts(command, &self.config) => batch.push(command, policy),
                _ => batches.push(RenderBatch::start(index, command, policy)),
            }
        }

        for batch in &batches {
            log::trace!(
                "Batch {:?}: program {:?}, texture {:?}, {:?}, {} commands, {} triangles",
                batch.command_range,
                batch.material.program,
                batch.material.texture,
                batch.material.blend_mode,
                batch.command_count(),
                batch.draw_count
            );
        }

        self.stats = BatchStats {
            total_commands: commands.len(),
            batch_count: batches.len(),
            vertex_count: batches.iter().map(|b| b.vertex_data.vertices.len()).sum(),
            largest_batch: batches.iter().map(RenderBatch::command_count).max().unwrap_or(0),
            build_time_us: start_time.elapsed().as_micros() as u64,
        };
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Transform};
    use crate::render::drawable::{Drawable, Sprite};
    use crate::render::resources::{TextureId, TextureInfo};

    fn command(texture: u32, alpha: bool, x: f32, index: u32) -> RenderCommand {
        let info = TextureInfo::new(TextureId(texture), 8, 8, if alpha { 4 } else { 3 });
        let drawable: Drawable = Sprite::new(Some(info)).into();
        let world: Mat4 = Transform::from_2d(x, 0.0, 0.0, 0.0, 1.0).to_matrix();
        RenderCommand::build(&drawable, world, 0, index, UniformBatchPolicy::RequireEqual).unwrap()
    }

    #[test]
    fn test_adjacent_compatible_commands_merge() {
        let commands = vec![command(1, false, 0.0, 0), command(1, false, 10.0, 1), command(1, false, 20.0, 2)];
        let mut batcher = BatchRenderer::default();
        let batches = batcher.build_batches(&commands);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].command_range, 0..3);
        assert_eq!(batches[0].draw_count, 6);
        assert_eq!(batches[0].vertex_data.vertices.len(), 12);
        // indices of the second sprite are rebased after the first
        assert_eq!(batches[0].vertex_data.indices[6], 4);
        assert_eq!(batcher.stats().avg_commands_per_batch(), 3.0);
    }

    #[test]
    fn test_only_neighbours_merge() {
        let commands = vec![command(1, false, 0.0, 0), command(2, false, 0.0, 1), command(1, false, 0.0, 2)];
        let batches = BatchRenderer::default().build_batches(&commands);
        let ranges: Vec<_> = batches.iter().map(|b| b.command_range.clone()).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_disabled_batching_yields_one_batch_per_command() {
        let commands = vec![command(1, false, 0.0, 0), command(1, false, 5.0, 1)];
        let config = BatchingConfig { enabled: false, ..BatchingConfig::default() };
        let batches = BatchRenderer::new(config).build_batches(&commands);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.command_count() == 1));
    }

    #[test]
    fn test_vertex_limit_closes_batches() {
        let commands: Vec<_> = (0..5).map(|i| command(1, false, i as f32, i)).collect();
        let config = BatchingConfig { max_batch_vertices: 8, ..BatchingConfig::default() };
        let batches = BatchRenderer::new(config).build_batches(&commands);
        let sizes: Vec<_> = batches.iter().map(RenderBatch::command_count).collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        // a command above the limit still draws, alone
        let config = BatchingConfig { max_batch_vertices: 2, ..BatchingConfig::default() };
        let batches = BatchRenderer::new(config).build_batches(&commands[..2]);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_per_instance_uniform_arrays() {
        let mut commands = vec![command(1, true, 0.0, 0), command(1, true, 1.0, 1)];
        let slot = crate::render::resources::UniformSlot(0);
        for (i, c) in commands.iter_mut().enumerate() {
            c.material.uniforms.insert(slot, crate::render::resources::UniformValue::floats(&[i as f32]).unwrap());
        }

        let strict = BatchRenderer::default().build_batches(&commands);
        assert_eq!(strict.len(), 2);
        assert!(strict[0].instance_uniforms.is_empty());

        let config = BatchingConfig { uniform_policy: UniformBatchPolicy::PerInstanceArrays, ..BatchingConfig::default() };
        let merged = BatchRenderer::new(config).build_batches(&commands);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].instance_uniforms.len(), 2);
        assert_eq!(merged[0].vertex_data.vertices[0].instance, 0);
        assert_eq!(merged[0].vertex_data.vertices[4].instance, 1);
    }

    #[test]
    fn test_empty_input() {
        let mut batcher = BatchRenderer::default();
        assert!(batcher.build_batches(&[]).is_empty());
        assert_eq!(batcher.stats().avg_commands_per_batch(), 0.0);
    }
}
