//! # Command Executor
//!
//! Issues GPU calls for an ordered batch list. A [`BoundState`] cache
//! mirrors what the device currently has bound, so only state that actually
//! differs from the previous batch is re-bound: program, texture, blend
//! mode, vertex layout and uniform values.
//!
//! The cache survives across frames. Anything that changes device state
//! behind the executor's back (a reload, a failed upload) must call
//! [`CommandExecutor::invalidate`].

use std::collections::HashMap;

use bitflags::bitflags;

use crate::render::batch_renderer::RenderBatch;
use crate::render::device::{DeviceError, DeviceResult, GfxDevice};
use crate::render::primitives::VertexLayoutId;
use crate::render::resources::{BlendMode, ProgramId, TextureId, UniformSet};
use crate::render::{RenderError, RenderResult};

bitflags! {
    /// State re-bound before a draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StateChanges: u32 {
        /// Program bound
        const PROGRAM = 1 << 0;
        /// Texture bound
        const TEXTURE = 1 << 1;
        /// Blend mode set
        const BLEND = 1 << 2;
        /// Vertex layout selected
        const LAYOUT = 1 << 3;
        /// Uniforms uploaded
        const UNIFORMS = 1 << 4;
        /// Per-instance uniform arrays uploaded
        const INSTANCE_UNIFORMS = 1 << 5;
    }
}

/// Device state as last set by the executor
///
/// `None` means unknown, which forces the next bind.
#[derive(Debug, Clone, Default)]
pub struct BoundState {
    program: Option<ProgramId>,
    texture: Option<Option<TextureId>>,
    blend_mode: Option<BlendMode>,
    vertex_layout: Option<VertexLayoutId>,
    uniforms: HashMap<ProgramId, UniformSet>,
    instance_uniforms: HashMap<ProgramId, Vec<UniformSet>>,
}

impl BoundState {
    /// Currently bound program
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Currently bound texture; `None` if unknown
    pub fn texture(&self) -> Option<Option<TextureId>> {
        self.texture
    }

    /// Current blend mode
    pub fn blend_mode(&self) -> Option<BlendMode> {
        self.blend_mode
    }

    fn uniforms_current(&self, program: ProgramId, uniforms: &UniformSet) -> bool {
        self.uniforms.get(&program).map_or(uniforms.is_empty(), |bound| bound == uniforms)
    }

    fn instance_uniforms_current(&self, program: ProgramId, instances: &[UniformSet]) -> bool {
        self.instance_uniforms
            .get(&program)
            .map_or(instances.is_empty(), |bound| bound.as_slice() == instances)
    }
}

/// Per-frame execution statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Draw calls issued
    pub draw_calls: usize,
    /// Batches skipped after a recoverable device error
    pub skipped_batches: usize,
    /// Triangles drawn
    pub triangles: usize,
    /// Vertices uploaded
    pub vertices: usize,
    /// Program binds
    pub program_binds: usize,
    /// Texture binds
    pub texture_binds: usize,
    /// Blend mode changes
    pub blend_changes: usize,
    /// Vertex layout changes
    pub layout_changes: usize,
    /// Uniform and instance uniform uploads
    pub uniform_uploads: usize,
}

impl ExecutionStats {
    /// Total GPU state changes
    pub fn state_changes(&self) -> usize {
        self.program_binds + self.texture_binds + self.blend_changes + self.layout_changes + self.uniform_uploads
    }

    fn record(&mut self, changes: StateChanges) {
        self.program_binds += usize::from(changes.contains(StateChanges::PROGRAM));
        self.texture_binds += usize::from(changes.contains(StateChanges::TEXTURE));
        self.blend_changes += usize::from(changes.contains(StateChanges::BLEND));
        self.layout_changes += usize::from(changes.contains(StateChanges::LAYOUT));
        self.uniform_uploads += usize::from(changes.contains(StateChanges::UNIFORMS))
            + usize::from(changes.contains(StateChanges::INSTANCE_UNIFORMS));
    }
}

/// Final stage of the frame pipeline
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    bound: BoundState,
}

impl CommandExecutor {
    /// Create an executor with an empty state cache
    pub fn new() -> Self {
        Self::default()
    }

    /// State the executor believes is bound
    pub fn bound_state(&self) -> &BoundState {
        &self.bound
    }

    /// Forget the cached device state; the next batch re-binds everything
    pub fn invalidate(&mut self) {
        self.bound = BoundState::default();
    }

    /// Draw every batch in order
    ///
    /// A recoverable device error skips the affected batch and invalidates
    /// the cache. A lost context aborts with [`RenderError::DeviceLost`].
    pub fn execute(&mut self, device: &mut dyn GfxDevice, batches: &[RenderBatch]) -> RenderResult<ExecutionStats> {
        let mut stats = ExecutionStats::default();
        for batch in batches {
            let mut changes = StateChanges::empty();
            match self.execute_batch(device, batch, &mut changes) {
                Ok(()) => {
                    stats.draw_calls += 1;
                    stats.triangles += batch.draw_count;
                    stats.vertices += batch.vertex_data.vertices.len();
                }
                Err(err) if err.is_fatal() => return Err(RenderError::DeviceLost),
                Err(err) => {
                    log::warn!("Skipping batch {:?}: {}", batch.command_range, err);
                    stats.skipped_batches += 1;
                    self.invalidate();
                }
            }
            stats.record(changes);
        }
        Ok(stats)
    }

    fn execute_batch(
        &mut self,
        device: &mut dyn GfxDevice,
        batch: &RenderBatch,
        changes: &mut StateChanges,
    ) -> DeviceResult<()> {
        let material = &batch.material;
        let program = material.program;

        if self.bound.program != Some(program) {
            device.bind_program(program)?;
            self.bound.program = Some(program);
            changes.insert(StateChanges::PROGRAM);
        }
        if self.bound.texture != Some(material.texture) {
            device.bind_texture(material.texture)?;
            self.bound.texture = Some(material.texture);
            changes.insert(StateChanges::TEXTURE);
        }
        if self.bound.blend_mode != Some(material.blend_mode) {
            device.set_blend_mode(material.blend_mode)?;
            self.bound.blend_mode = Some(material.blend_mode);
            changes.insert(StateChanges::BLEND);
        }
        if self.bound.vertex_layout != Some(material.vertex_layout) {
            device.set_vertex_layout(material.vertex_layout)?;
            self.bound.vertex_layout = Some(material.vertex_layout);
            changes.insert(StateChanges::LAYOUT);
        }
        if !self.bound.uniforms_current(program, &material.uniforms) {
            device.upload_uniforms(program, &material.uniforms)?;
            self.bound.uniforms.insert(program, material.uniforms.clone());
            changes.insert(StateChanges::UNIFORMS);
        }
        if !self.bound.instance_uniforms_current(program, &batch.instance_uniforms) {
            device.upload_instance_uniforms(program, &batch.instance_uniforms)?;
            self.bound.instance_uniforms.insert(program, batch.instance_uniforms.clone());
            changes.insert(StateChanges::INSTANCE_UNIFORMS);
        }

        device.upload_vertices(&batch.vertex_data)?;
        let index_count = u32::try_from(batch.index_count())
            .map_err(|_| DeviceError::UploadFailed(format!("{} indices exceed one draw call", batch.index_count())))?;
        device.draw_indexed(index_count)?;

        log::trace!("Drew batch {:?} with changes {:?}", batch.command_range, changes);
        Ok(())
    }
}
