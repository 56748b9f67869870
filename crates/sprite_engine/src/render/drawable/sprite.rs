//! Textured quads

use crate::foundation::math::{Mat4, Rect, Vec2, Vec3};
use crate::render::primitives::{Vertex, VertexData};
use crate::render::resources::{Material, ProgramId, TextureInfo};
use crate::scene::AABB;

/// A single textured quad
///
/// The quad is `size` units large and placed so that `anchor` (normalized,
/// `(0.5, 0.5)` is the center) sits on the node origin. `tex_rect` selects
/// the texels it shows.
#[derive(Debug, Clone)]
pub struct Sprite {
    material: Material,
    tex_rect: Rect,
    size: Vec2,
    anchor: Vec2,
    color: [f32; 4],
    flip_x: bool,
    flip_y: bool,
}

impl Sprite {
    /// Sprite showing the whole texture at its native size
    pub fn new(texture: Option<TextureInfo>) -> Self {
        let mut sprite = Self {
            material: Material::new(ProgramId::SPRITE, texture),
            tex_rect: Rect::default(),
            size: Vec2::zeros(),
            anchor: Vec2::new(0.5, 0.5),
            color: [1.0; 4],
            flip_x: false,
            flip_y: false,
        };
        sprite.reset_to_texture();
        sprite
    }

    fn reset_to_texture(&mut self) {
        let size = self.material.texture().map_or_else(Vec2::zeros, TextureInfo::size);
        self.tex_rect = Rect::new(0.0, 0.0, size.x, size.y);
        self.size = size;
    }

    /// Builder pattern: set the quad size
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    /// Builder pattern: set the vertex color
    #[must_use]
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Live material
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Mutable live material
    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    /// Replace the texture and show all of it at its native size
    pub fn set_texture(&mut self, texture: Option<TextureInfo>) {
        self.material.set_texture(texture);
        self.reset_to_texture();
    }

    /// Texel rectangle shown by the quad
    pub fn tex_rect(&self) -> Rect {
        self.tex_rect
    }

    /// Select the texels to show; the quad takes the rectangle's size
    pub fn set_tex_rect(&mut self, rect: Rect) {
        self.tex_rect = rect;
        self.size = Vec2::new(rect.w, rect.h);
    }

    /// Quad size
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Resize the quad without changing the texel rectangle
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    /// Normalized anchor point
    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    /// Move the anchor point, `(0, 0)` is the bottom-left corner
    pub fn set_anchor(&mut self, x: f32, y: f32) {
        self.anchor = Vec2::new(x, y);
    }

    /// Vertex color
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Change the vertex color
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// Mirror the texture horizontally
    pub fn set_flipped_x(&mut self, flipped: bool) {
        self.flip_x = flipped;
    }

    /// Mirror the texture vertically
    pub fn set_flipped_y(&mut self, flipped: bool) {
        self.flip_y = flipped;
    }

    fn extents(&self) -> (f32, f32, f32, f32) {
        let left = -self.anchor.x * self.size.x;
        let bottom = -self.anchor.y * self.size.y;
        (left, bottom, left + self.size.x, bottom + self.size.y)
    }

    /// World-space quad
    pub fn produce_vertex_data(&self, world: &Mat4) -> VertexData {
        let (left, bottom, right, top) = self.extents();

        let rect = self.tex_rect;
        let ([mut u0, mut v0], [mut u1, mut v1]) = match self.material.texture() {
            Some(texture) => (
                texture.normalize(Vec2::new(rect.x, rect.y)),
                texture.normalize(Vec2::new(rect.x + rect.w, rect.y + rect.h)),
            ),
            None => ([0.0, 0.0], [1.0, 1.0]),
        };
        if self.flip_x {
            std::mem::swap(&mut u0, &mut u1);
        }
        if self.flip_y {
            std::mem::swap(&mut v0, &mut v1);
        }

        let corner = |x: f32, y: f32, uv: [f32; 2]| Vertex::from_local(world, Vec2::new(x, y), uv, self.color);
        let mut data = VertexData::with_quad_capacity(1);
        data.push_quad([
            corner(left, top, [u0, v0]),
            corner(left, bottom, [u0, v1]),
            corner(right, top, [u1, v0]),
            corner(right, bottom, [u1, v1]),
        ]);
        data
    }

    /// Local-space bounds
    pub fn bounding_box(&self) -> AABB {
        let (left, bottom, right, top) = self.extents();
        AABB::new(Vec3::new(left, bottom, 0.0), Vec3::new(right, top, 0.0))
    }
}
