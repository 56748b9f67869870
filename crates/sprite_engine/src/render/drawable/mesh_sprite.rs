//! Sprites with arbitrary geometry

use crate::foundation::math::{Mat4, Vec2, Vec3};
use crate::render::primitives::{Vertex, VertexData};
use crate::render::resources::{Material, ProgramId, ResourceError, ResourceResult, TextureInfo};
use crate::scene::AABB;

/// A local-space vertex of a mesh sprite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    /// Position relative to the node origin
    pub position: Vec2,
    /// Normalized texture coordinates
    pub tex_coords: [f32; 2],
}

impl MeshVertex {
    /// Create a vertex
    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { position: Vec2::new(x, y), tex_coords: [u, v] }
    }
}

/// An indexed triangle mesh drawn with a single texture
#[derive(Debug, Clone)]
pub struct MeshSprite {
    material: Material,
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
    color: [f32; 4],
}

impl MeshSprite {
    /// Empty textured mesh; give it geometry before it is drawn
    pub fn new(texture: Option<TextureInfo>) -> Self {
        Self::with_material(Material::new(ProgramId::MESH_SPRITE, texture))
    }

    /// Empty mesh that renders vertex colors only
    pub fn untextured() -> Self {
        Self::with_material(Material::untextured(ProgramId::MESH_SPRITE))
    }

    fn with_material(material: Material) -> Self {
        Self { material, vertices: Vec::new(), indices: Vec::new(), color: [1.0; 4] }
    }

    /// Live material
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Mutable live material
    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    /// Vertex color
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Change the vertex color
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// Local vertices
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    /// Triangle list indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Replace the geometry with an indexed triangle list
    ///
    /// The mesh is left unchanged when an index is out of range or the
    /// index count does not form whole triangles.
    pub fn set_vertices(&mut self, vertices: Vec<MeshVertex>, indices: Vec<u32>) -> ResourceResult<()> {
        if indices.len() % 3 != 0 {
            return Err(ResourceError::IncompleteTriangles(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(ResourceError::IndexOutOfRange { index, vertex_count: vertices.len() });
        }
        self.vertices = vertices;
        self.indices = indices;
        Ok(())
    }

    /// Replace the geometry with a triangle strip
    pub fn set_triangle_strip(&mut self, vertices: Vec<MeshVertex>) -> ResourceResult<()> {
        let indices = strip_to_list(vertices.len());
        if indices.is_empty() {
            return Err(ResourceError::EmptyGeometry);
        }
        self.set_vertices(vertices, indices)
    }

    /// Build a triangle strip from points given in texels of the current texture
    ///
    /// Positions are centered on the texture, with y pointing up; texture
    /// coordinates are the normalized texels.
    pub fn create_vertices_from_texels(&mut self, texels: &[Vec2]) -> ResourceResult<()> {
        let texture = *self.material.texture().ok_or(ResourceError::MissingTexture)?;
        let half = texture.size() * 0.5;
        let vertices = texels
            .iter()
            .map(|texel| MeshVertex {
                position: Vec2::new(texel.x - half.x, half.y - texel.y),
                tex_coords: texture.normalize(*texel),
            })
            .collect();
        self.set_triangle_strip(vertices)
    }

    /// World-space triangles
    pub fn produce_vertex_data(&self, world: &Mat4) -> VertexData {
        let vertices = self
            .vertices
            .iter()
            .map(|v| Vertex::from_local(world, v.position, v.tex_coords, self.color))
            .collect();
        VertexData::new(vertices, self.indices.clone())
    }

    /// Local-space bounds
    pub fn bounding_box(&self) -> AABB {
        AABB::from_points(self.vertices.iter().map(|v| Vec3::new(v.position.x, v.position.y, 0.0)))
    }
}

/// Triangle list indices for a strip of `count` vertices, keeping a consistent winding
fn strip_to_list(count: usize) -> Vec<u32> {
    (0..count.saturating_sub(2) as u32)
        .flat_map(|i| if i % 2 == 0 { [i, i + 1, i + 2] } else { [i + 1, i, i + 2] })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::resources::TextureId;

    const TEXTURE: TextureInfo = TextureInfo::new(TextureId(1), 128, 128, 4);

    #[test]
    fn test_strip_winding() {
        assert_eq!(strip_to_list(2), Vec::<u32>::new());
        assert_eq!(strip_to_list(5), vec![0, 1, 2, 2, 1, 3, 2, 3, 4]);
    }

    #[test]
    fn test_vertices_from_texels() {
        let mut mesh = MeshSprite::new(Some(TEXTURE));
        let texels = [Vec2::new(4.0, 2.0), Vec2::new(124.0, 2.0), Vec2::new(64.0, 122.0)];
        mesh.create_vertices_from_texels(&texels).unwrap();

        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(mesh.vertices()[0].position, Vec2::new(-60.0, 62.0));
        assert_eq!(mesh.vertices()[2].tex_coords, [0.5, 122.0 / 128.0]);

        let bounds = mesh.bounding_box();
        assert_eq!(bounds.min, Vec3::new(-60.0, -58.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(60.0, 62.0, 0.0));
    }

    #[test]
    fn test_texels_need_a_texture() {
        let mut mesh = MeshSprite::untextured();
        assert_eq!(
            mesh.create_vertices_from_texels(&[Vec2::zeros(); 3]),
            Err(ResourceError::MissingTexture)
        );
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let mut mesh = MeshSprite::untextured();
        let triangle = vec![MeshVertex::new(0.0, 0.0, 0.0, 0.0); 3];

        assert_eq!(
            mesh.set_vertices(triangle.clone(), vec![0, 1, 3]),
            Err(ResourceError::IndexOutOfRange { index: 3, vertex_count: 3 })
        );
        assert_eq!(mesh.set_vertices(triangle.clone(), vec![0, 1]), Err(ResourceError::IncompleteTriangles(2)));
        assert_eq!(mesh.set_triangle_strip(triangle[..2].to_vec()), Err(ResourceError::EmptyGeometry));
        assert!(mesh.vertices().is_empty());

        mesh.set_vertices(triangle, vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.produce_vertex_data(&Mat4::identity()).triangle_count(), 1);
    }
}
