//! Texture handles
//!
//! Textures are loaded by an external loader; the engine only sees the opaque
//! id and the metadata needed to compute texture coordinates.

use crate::foundation::math::Vec2;

/// Opaque texture identifier handed out by the texture loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Texture handle plus the metadata the render pipeline needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureInfo {
    /// Loader-assigned id
    pub id: TextureId,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Number of color channels (4 means the texture carries alpha)
    pub channels: u8,
}

impl TextureInfo {
    /// Create a texture handle
    pub const fn new(id: TextureId, width: u32, height: u32, channels: u8) -> Self {
        Self { id, width, height, channels }
    }

    /// Size in texels as a float vector
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Whether the texture has an alpha channel
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Normalize a texel coordinate to `[0, 1]` texture space
    ///
    /// Zero-sized textures map everything to the origin.
    pub fn normalize(&self, texel: Vec2) -> [f32; 2] {
        let size = self.size();
        if size.x <= 0.0 || size.y <= 0.0 {
            return [0.0, 0.0];
        }
        [texel.x / size.x, texel.y / size.y]
    }
}
