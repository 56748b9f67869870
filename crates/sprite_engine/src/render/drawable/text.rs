//! Text runs
//!
//! Font loading and rasterization happen outside the engine. The loader
//! hands over a [`GlyphTable`]: the glyph atlas texture plus per-glyph
//! metrics and kerning pairs. [`Text`] lays out one quad per visible glyph.

use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::math::{Mat4, Rect, Vec2, Vec3};
use crate::render::primitives::{Vertex, VertexData};
use crate::render::resources::{Material, ProgramId, TextureInfo};
use crate::scene::AABB;

/// Metrics of one glyph in the atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// Texels of the glyph in the atlas
    pub tex_rect: Rect,
    /// Offset from the pen position to the glyph's top-left corner, y down
    pub offset: Vec2,
    /// Horizontal pen advance after the glyph
    pub advance: f32,
}

/// Glyph atlas and metrics supplied by the font loader
#[derive(Debug, Clone)]
pub struct GlyphTable {
    texture: TextureInfo,
    line_height: f32,
    glyphs: HashMap<char, Glyph>,
    kerning: HashMap<(char, char), f32>,
}

impl GlyphTable {
    /// Create an empty table for an atlas texture
    pub fn new(texture: TextureInfo, line_height: f32) -> Self {
        Self { texture, line_height, glyphs: HashMap::new(), kerning: HashMap::new() }
    }

    /// Add or replace a glyph
    pub fn insert_glyph(&mut self, ch: char, glyph: Glyph) {
        self.glyphs.insert(ch, glyph);
    }

    /// Add a kerning adjustment applied between `first` and `second`
    pub fn insert_kerning(&mut self, first: char, second: char, amount: f32) {
        self.kerning.insert((first, second), amount);
    }

    /// Atlas texture
    pub fn texture(&self) -> TextureInfo {
        self.texture
    }

    /// Distance between baselines
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Metrics of a character, `None` if the font lacks it
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    /// Kerning between two consecutive characters
    pub fn kerning(&self, first: char, second: char) -> f32 {
        self.kerning.get(&(first, second)).copied().unwrap_or(0.0)
    }

    /// Width of one line of text
    pub fn line_width(&self, line: &str) -> f32 {
        let mut width = 0.0;
        let mut previous = None;
        for ch in line.chars() {
            if let Some(prev) = previous {
                width += self.kerning(prev, ch);
            }
            width += self.glyph(ch).map_or(0.0, |g| g.advance);
            previous = Some(ch);
        }
        width
    }
}

/// Horizontal alignment of lines inside a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Lines start at the left edge
    #[default]
    Left,
    /// Lines are centered
    Center,
    /// Lines end at the right edge
    Right,
}

/// A block of text centered on its node
#[derive(Debug, Clone)]
pub struct Text {
    material: Material,
    font: Arc<GlyphTable>,
    string: String,
    alignment: Alignment,
    color: [f32; 4],
}

impl Text {
    /// Empty text using `font`
    pub fn new(font: Arc<GlyphTable>) -> Self {
        Self {
            material: Material::new(ProgramId::TEXT, Some(font.texture())),
            font,
            string: String::new(),
            alignment: Alignment::Left,
            color: [1.0; 4],
        }
    }

    /// Builder pattern: set the string
    #[must_use]
    pub fn with_string(mut self, string: impl Into<String>) -> Self {
        self.string = string.into();
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

    /// Displayed string
    pub fn string(&self) -> &str {
        &self.string
    }

    /// Replace the displayed string
    pub fn set_string(&mut self, string: impl Into<String>) {
        self.string = string.into();
    }

    /// Line alignment
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Change line alignment
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    /// Vertex color
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// Width and height of the laid out block
    pub fn block_size(&self) -> Vec2 {
        if self.string.is_empty() {
            return Vec2::zeros();
        }
        let (count, width) = self.string.split('\n').fold((0_usize, 0.0_f32), |(count, width), line| {
            (count + 1, width.max(self.font.line_width(line)))
        });
        Vec2::new(width, count as f32 * self.font.line_height())
    }

    /// World-space quads, one per visible glyph
    pub fn produce_vertex_data(&self, world: &Mat4) -> VertexData {
        let block = self.block_size();
        let texture = self.font.texture();
        let mut data = VertexData::with_quad_capacity(self.string.len());

        for (row, line) in self.string.split('\n').enumerate() {
            let slack = block.x - self.font.line_width(line);
            let mut pen_x = -block.x * 0.5
                + match self.alignment {
                    Alignment::Left => 0.0,
                    Alignment::Center => slack * 0.5,
                    Alignment::Right => slack,
                };
            let line_top = block.y * 0.5 - row as f32 * self.font.line_height();

            let mut previous = None;
            for ch in line.chars() {
                if let Some(prev) = previous {
                    pen_x += self.font.kerning(prev, ch);
                }
                previous = Some(ch);
                let Some(glyph) = self.font.glyph(ch) else { continue };

                let rect = glyph.tex_rect;
                if rect.w > 0.0 && rect.h > 0.0 {
                    let left = pen_x + glyph.offset.x;
                    let top = line_top - glyph.offset.y;
                    let (right, bottom) = (left + rect.w, top - rect.h);
                    let [u0, v0] = texture.normalize(Vec2::new(rect.x, rect.y));
                    let [u1, v1] = texture.normalize(Vec2::new(rect.x + rect.w, rect.y + rect.h));

                    let corner = |x: f32, y: f32, uv: [f32; 2]| Vertex::from_local(world, Vec2::new(x, y), uv, self.color);
                    data.push_quad([
                        corner(left, top, [u0, v0]),
                        corner(left, bottom, [u0, v1]),
                        corner(right, top, [u1, v0]),
                        corner(right, bottom, [u1, v1]),
                    ]);
                }
                pen_x += glyph.advance;
            }
        }
        data
    }

    /// Local-space bounds of the text block
    pub fn bounding_box(&self) -> AABB {
        let half = self.block_size() * 0.5;
        AABB::new(Vec3::new(-half.x, -half.y, 0.0), Vec3::new(half.x, half.y, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::resources::TextureId;

    fn font() -> Arc<GlyphTable> {
        let mut table = GlyphTable::new(TextureInfo::new(TextureId(5), 64, 64, 4), 10.0);
        let glyph = |x: f32| Glyph { tex_rect: Rect::new(x, 0.0, 8.0, 10.0), offset: Vec2::zeros(), advance: 8.0 };
        table.insert_glyph('A', glyph(0.0));
        table.insert_glyph('V', glyph(8.0));
        table.insert_glyph(' ', Glyph { tex_rect: Rect::default(), offset: Vec2::zeros(), advance: 4.0 });
        table.insert_kerning('A', 'V', -2.0);
        Arc::new(table)
    }

    #[test]
    fn test_one_quad_per_visible_glyph() {
        let text = Text::new(font()).with_string("A V?");
        let data = text.produce_vertex_data(&Mat4::identity());
        // the space has no texels and '?' is missing from the font
        assert_eq!(data.vertices.len(), 8);
        assert_eq!(data.triangle_count(), 4);
    }

    #[test]
    fn test_kerning_shrinks_lines() {
        let font = font();
        assert_eq!(font.line_width("AV"), 14.0);
        assert_eq!(font.line_width("VA"), 16.0);
    }

    #[test]
    fn test_block_is_centered_and_lines_aligned() {
        let mut text = Text::new(font()).with_string("AA\nA");
        assert_eq!(text.block_size(), Vec2::new(16.0, 20.0));

        text.set_alignment(Alignment::Right);
        let data = text.produce_vertex_data(&Mat4::identity());
        // first quad: top-left corner of the first line
        assert_eq!(data.vertices[0].position, [-8.0, 10.0, 0.0]);
        // third quad: the single glyph of the right-aligned second line
        assert_eq!(data.vertices[8].position, [0.0, 0.0, 0.0]);

        let bounds = text.bounding_box();
        assert_eq!(bounds.min, Vec3::new(-8.0, -10.0, 0.0));
    }

    #[test]
    fn test_empty_text_has_no_geometry() {
        let text = Text::new(font());
        assert!(text.produce_vertex_data(&Mat4::identity()).is_empty());
        assert!(text.bounding_box().xy_rect().w.abs() < f32::EPSILON);
    }
}
