//! # Command Sorting
//!
//! Orders a frame's commands for drawing:
//!
//! 1. layer, ascending
//! 2. opaque before transparent
//! 3. opaque: material hash, then depth ascending (front to back)
//! 4. transparent: depth descending (back to front), then material hash
//! 5. submission index
//!
//! The last key makes the order total, so equal keys keep scene traversal
//! order and the result is the same on every run.

use std::cmp::Ordering;

use rayon::slice::ParallelSliceMut;

use crate::render::render_queue::RenderCommand;
use crate::render::resources::BlendClass;

/// Stable command sorter
#[derive(Debug, Clone)]
pub struct CommandSorter {
    parallel_threshold: usize,
}

impl CommandSorter {
    /// Create a sorter; slices of at least `parallel_threshold` commands sort on the rayon pool
    pub fn new(parallel_threshold: usize) -> Self {
        Self { parallel_threshold }
    }

    /// Draw order of two commands
    pub fn compare(a: &RenderCommand, b: &RenderCommand) -> Ordering {
        let (ka, kb) = (&a.sort_key, &b.sort_key);
        ka.layer
            .cmp(&kb.layer)
            .then(ka.blend_class.cmp(&kb.blend_class))
            .then_with(|| match ka.blend_class {
                BlendClass::Opaque => ka
                    .material_hash
                    .cmp(&kb.material_hash)
                    .then(ka.depth.total_cmp(&kb.depth)),
                BlendClass::Transparent => kb
                    .depth
                    .total_cmp(&ka.depth)
                    .then(ka.material_hash.cmp(&kb.material_hash)),
            })
            .then(a.submission_index.cmp(&b.submission_index))
    }

    /// Sort in place
    ///
    /// Uses rayon's stable parallel sort when called from inside a pool
    /// (or the global one) and the slice is large enough.
    pub fn sort(&self, commands: &mut [RenderCommand]) {
        if commands.len() >= self.parallel_threshold {
            commands.par_sort_by(Self::compare);
        } else {
            commands.sort_by(Self::compare);
        }
    }

    /// Whether a slice is already in draw order
    pub fn is_sorted(commands: &[RenderCommand]) -> bool {
        commands.windows(2).all(|pair| Self::compare(&pair[0], &pair[1]) != Ordering::Greater)
    }
}

impl Default for CommandSorter {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}
