//! Interleaved vertex format shared by every drawable
//!
//! Drawables bake their world transform into positions, so a batch can
//! concatenate the vertex data of many nodes and draw it with one call.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, Point3, Vec2};

/// World-space vertex uploaded to the GPU
///
/// `instance` indexes per-instance uniform arrays when a batch merges
/// members with different uniform values. It is zero everywhere else.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// World-space position, z is the depth
    pub position: [f32; 3],
    /// Normalized texture coordinates
    pub tex_coords: [f32; 2],
    /// Linear RGBA color
    pub color: [f32; 4],
    /// Member index inside a batch
    pub instance: u32,
}

impl Vertex {
    /// Create a vertex with instance zero
    pub fn new(position: [f32; 3], tex_coords: [f32; 2], color: [f32; 4]) -> Self {
        Self { position, tex_coords, color, instance: 0 }
    }

    /// Transform a local 2D point into a world-space vertex
    pub fn from_local(world: &Mat4, local: Vec2, tex_coords: [f32; 2], color: [f32; 4]) -> Self {
        let p = world.transform_point(&Point3::new(local.x, local.y, 0.0));
        Self::new([p.x, p.y, p.z], tex_coords, color)
    }
}

/// Identifier of the attribute layout a program reads vertices with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexLayoutId(pub u64);

impl VertexLayoutId {
    /// The interleaved [`Vertex`] layout used by every built-in program
    pub const STANDARD: VertexLayoutId = VertexLayoutId(0);

    /// Layout derived from custom attribute bindings, never equal to [`Self::STANDARD`]
    pub fn custom(hash: u64) -> Self {
        Self(hash | 1_u64 << 63)
    }
}

/// Indexed triangle list produced by a drawable
///
/// Indices are local to `vertices`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexData {
    /// Vertices in world space
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl VertexData {
    /// Create from explicit vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Pre-allocate room for `quads` quads
    pub fn with_quad_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            indices: Vec::with_capacity(quads * 6),
        }
    }

    /// Append one quad given corners in order top-left, bottom-left, top-right, bottom-right
    pub fn push_quad(&mut self, corners: [Vertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices.extend([0, 1, 2, 2, 1, 3].map(|i| base + i));
    }

    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() || self.vertices.is_empty()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append `other`, rebasing its indices and tagging its vertices with `instance`
    pub fn append(&mut self, other: &VertexData, instance: u32) {
        let base = self.vertices.len() as u32;
        self.vertices
            .extend(other.vertices.iter().map(|v| Vertex { instance, ..*v }));
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }

    /// De-indexed triangle stream, used to compare draws independent of batching
    pub fn triangle_stream(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.indices
            .iter()
            .filter_map(|&i| self.vertices.get(i as usize).copied())
    }

    /// Raw vertex bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes for upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
