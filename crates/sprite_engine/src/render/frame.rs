//! # Frame Renderer
//!
//! Runs the per-frame pipeline in its fixed order:
//!
//! 1. update world transforms of dirty scene nodes
//! 2. cull and snapshot visible drawables into the render queue
//! 3. sort the queue
//! 4. merge sorted commands into batches
//! 5. execute batches on the device and present
//!
//! Vertex production in step 2 runs on a rayon pool once enough drawables
//! are visible. Each worker returns its own command and the results are
//! appended in traversal order, so the queue never depends on scheduling.
//!
//! Resource reloads take `&mut self`, which rules out running one in the
//! middle of a frame.

use std::time::Instant;

use rayon::prelude::*;

use crate::core::config::RendererConfig;
use crate::foundation::collections::NodeHandle;
use crate::foundation::math::{Mat4, Rect};
use crate::render::batch_renderer::{BatchRenderer, RenderBatch};
use crate::render::device::GfxDevice;
use crate::render::drawable::Drawable;
use crate::render::executor::{CommandExecutor, ExecutionStats};
use crate::render::render_queue::{RenderCommand, RenderQueue};
use crate::render::resources::{RelinkReport, ResourceRegistry, ResourceResult};
use crate::render::sorter::CommandSorter;
use crate::render::{RenderError, RenderResult};
use crate::scene::SceneGraph;

/// Clip-space square every on-screen primitive overlaps
const CLIP_RECT: Rect = Rect::new(-1.0, -1.0, 2.0, 2.0);

/// Statistics of one rendered frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at zero
    pub frame: u64,
    /// Visible drawable nodes found in the scene
    pub visible: usize,
    /// Drawables skipped because their bounds were off screen
    pub culled: usize,
    /// Commands that reached the render queue
    pub submitted: usize,
    /// Drawables dropped for invalid resources or empty geometry
    pub dropped: usize,
    /// Batches built from the sorted queue
    pub batches: usize,
    /// Draw calls issued
    pub draw_calls: usize,
    /// Batches skipped after a recoverable device error
    pub skipped_batches: usize,
    /// GPU state changes issued
    pub state_changes: usize,
    /// Triangles drawn
    pub triangles: usize,
    /// Vertices uploaded
    pub vertices: usize,
    /// Time spent collecting commands (microseconds)
    pub collect_time_us: u64,
    /// Time spent sorting (microseconds)
    pub sort_time_us: u64,
    /// Time spent batching (microseconds)
    pub batch_time_us: u64,
    /// Time spent executing batches (microseconds)
    pub execute_time_us: u64,
}

impl FrameStats {
    /// Get total frame time in microseconds
    pub fn total_time_us(&self) -> u64 {
        self.collect_time_us + self.sort_time_us + self.batch_time_us + self.execute_time_us
    }
}

/// A visible drawable waiting for its command to be built
struct Candidate<'a> {
    index: u32,
    node: NodeHandle,
    layer: i32,
    world: Mat4,
    drawable: &'a Drawable,
}

/// Owns every pipeline stage and runs them once per frame
pub struct FrameRenderer {
    config: RendererConfig,
    queue: RenderQueue,
    sorter: CommandSorter,
    batcher: BatchRenderer,
    executor: CommandExecutor,
    batches: Vec<RenderBatch>,
    pool: rayon::ThreadPool,
    frame: u64,
    visible: usize,
    culled: usize,
}

impl FrameRenderer {
    /// Create a renderer and its worker pool
    pub fn new(config: RendererConfig) -> RenderResult<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel.worker_threads.unwrap_or(0))
            .thread_name(|i| format!("sprite-worker-{i}"))
            .build()
            .map_err(|e| RenderError::ThreadPool(e.to_string()))?;
        log::info!(
            "Frame renderer ready: {} worker threads, batching {}",
            pool.current_num_threads(),
            if config.batching.enabled { "on" } else { "off" }
        );

        Ok(Self {
            queue: RenderQueue::new(config.batching.uniform_policy),
            sorter: CommandSorter::new(config.parallel.parallel_sort_threshold),
            batcher: BatchRenderer::new(config.batching.clone()),
            executor: CommandExecutor::new(),
            batches: Vec::new(),
            pool,
            frame: 0,
            visible: 0,
            culled: 0,
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Render queue of the current frame
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Batches of the current frame
    pub fn batches(&self) -> &[RenderBatch] {
        &self.batches
    }

    /// Number of frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Clear the queue and snapshot every visible drawable of `scene`
    ///
    /// Returns the number of queued commands.
    pub fn collect(&mut self, scene: &mut SceneGraph, registry: &ResourceRegistry, device: &dyn GfxDevice) -> usize {
        self.queue.clear();
        self.batches.clear();
        scene.update_world_transforms();

        let handles = scene.visible_drawables();
        self.visible = handles.len();
        self.culled = 0;
        let projection = device.projection();

        let mut candidates = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let (Ok(node), Some(world)) = (scene.node(handle), scene.cached_world_transform(handle)) else {
                continue;
            };
            let Some(drawable) = node.drawable() else { continue };

            if self.config.cull_offscreen && Self::is_offscreen(drawable, &(projection * world)) {
                self.culled += 1;
                continue;
            }
            candidates.push(Candidate { index: index as u32, node: handle, layer: node.layer(), world, drawable });
        }

        let policy = self.queue.policy();
        let build = |c: &Candidate<'_>| -> ResourceResult<RenderCommand> {
            let (material, vertex_data) = c.drawable.prepare(&c.world)?;
            registry.validate(&material)?;
            Ok(RenderCommand::from_parts(material, vertex_data, c.world, c.layer, c.index, policy).from_node(c.node))
        };

        let commands: Vec<_> = if candidates.len() >= self.config.parallel.parallel_vertex_threshold {
            self.pool.install(|| candidates.par_iter().map(build).collect::<Vec<_>>())
        } else {
            candidates.iter().map(build).collect()
        };

        for command in commands {
            // drops are logged and counted by the queue
            let _ = self.queue.push(command);
        }
        self.queue.command_count()
    }

    fn is_offscreen(drawable: &Drawable, clip_from_local: &Mat4) -> bool {
        let bounds = drawable.bounding_box();
        !bounds.is_empty() && !bounds.transformed(clip_from_local).xy_rect().intersects(&CLIP_RECT)
    }

    /// Sort the queued commands into draw order
    pub fn sort(&mut self) {
        let sorter = &self.sorter;
        let commands = self.queue.commands_mut();
        self.pool.install(|| sorter.sort(commands));
        debug_assert!(CommandSorter::is_sorted(self.queue.commands()));
    }

    /// Merge the sorted commands into batches
    pub fn batch(&mut self) -> &[RenderBatch] {
        self.batches = self.batcher.build_batches(self.queue.commands());
        &self.batches
    }

    /// Draw the current batches
    pub fn execute(&mut self, device: &mut dyn GfxDevice) -> RenderResult<ExecutionStats> {
        self.executor.execute(device, &self.batches)
    }

    /// Run the whole pipeline for one frame and present it
    ///
    /// Only a lost device fails the frame; everything else is logged and
    /// reflected in the returned statistics.
    pub fn render_frame(
        &mut self,
        scene: &mut SceneGraph,
        registry: &ResourceRegistry,
        device: &mut dyn GfxDevice,
    ) -> RenderResult<FrameStats> {
        let collect_start = Instant::now();
        self.collect(scene, registry, device);
        let collect_time = collect_start.elapsed();

        let sort_start = Instant::now();
        self.sort();
        let sort_time = sort_start.elapsed();

        let batch_start = Instant::now();
        self.batch();
        let batch_time = batch_start.elapsed();

        let execute_start = Instant::now();
        let execution = self.execute(device)?;
        device.present()?;
        let execute_time = execute_start.elapsed();

        let stats = FrameStats {
            frame: self.frame,
            visible: self.visible,
            culled: self.culled,
            submitted: self.queue.command_count(),
            dropped: self.queue.dropped_count(),
            batches: self.batches.len(),
            draw_calls: execution.draw_calls,
            skipped_batches: execution.skipped_batches,
            state_changes: execution.state_changes(),
            triangles: execution.triangles,
            vertices: execution.vertices,
            collect_time_us: collect_time.as_micros() as u64,
            sort_time_us: sort_time.as_micros() as u64,
            batch_time_us: batch_time.as_micros() as u64,
            execute_time_us: execute_time.as_micros() as u64,
        };
        self.frame += 1;

        log::debug!(
            "Frame {}: {} commands ({} dropped, {} culled) -> {} batches, {} draw calls, {} state changes, {}us",
            stats.frame,
            stats.submitted,
            stats.dropped,
            stats.culled,
            stats.batches,
            stats.draw_calls,
            stats.state_changes,
            stats.total_time_us()
        );
        Ok(stats)
    }

    /// Relink every custom program between frames
    ///
    /// Used after a context was recreated. The executor's bound-state cache is
    /// dropped because nothing on the device can be assumed bound any more.
    pub fn reload_resources(
        &mut self,
        registry: &mut ResourceRegistry,
        device: &mut dyn GfxDevice,
    ) -> RenderResult<RelinkReport> {
        let report = registry.relink_all(device)?;
        self.executor.invalidate();
        log::debug!("Executor state cache invalidated after reload");
        Ok(report)
    }
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("config", &self.config)
            .field("frame", &self.frame)
            .field("queued", &self.queue.command_count())
            .field("batches", &self.batches.len())
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}
