//! # Drawables
//!
//! The closed set of things a scene node can draw. Every variant offers the
//! same capabilities, dispatched with a `match`:
//!
//! - **material descriptor**: snapshot of the live [`Material`]
//! - **vertex data**: world-space triangles for a given world transform
//! - **bounding box**: local-space bounds used for culling
//!
//! Vertex production is a pure function of the drawable and the transform,
//! so it can run on worker threads.

pub mod mesh_sprite;
pub mod particles;
pub mod sprite;
pub mod text;

pub use mesh_sprite::{MeshSprite, MeshVertex};
pub use particles::{EmitterSettings, ParticleSystem};
pub use sprite::Sprite;
pub use text::{Alignment, Glyph, GlyphTable, Text};

use crate::foundation::math::Mat4;
use crate::render::primitives::VertexData;
use crate::render::resources::{Material, MaterialDescriptor, ResourceError};
use crate::scene::AABB;

/// Variant tag of a [`Drawable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawableKind {
    /// [`Sprite`]
    Sprite,
    /// [`MeshSprite`]
    MeshSprite,
    /// [`Text`]
    Text,
    /// [`ParticleSystem`]
    Particles,
}

/// Anything a scene node can render
#[derive(Debug, Clone)]
pub enum Drawable {
    /// Textured quad
    Sprite(Sprite),
    /// Arbitrary triangle mesh
    MeshSprite(MeshSprite),
    /// Glyph run
    Text(Text),
    /// Particle emitter
    Particles(ParticleSystem),
}

impl Drawable {
    /// Variant tag
    pub fn kind(&self) -> DrawableKind {
        match self {
            Self::Sprite(_) => DrawableKind::Sprite,
            Self::MeshSprite(_) => DrawableKind::MeshSprite,
            Self::Text(_) => DrawableKind::Text,
            Self::Particles(_) => DrawableKind::Particles,
        }
    }

    /// Live material
    pub fn material(&self) -> &Material {
        match self {
            Self::Sprite(d) => d.material(),
            Self::MeshSprite(d) => d.material(),
            Self::Text(d) => d.material(),
            Self::Particles(d) => d.material(),
        }
    }

    /// Mutable live material
    pub fn material_mut(&mut self) -> &mut Material {
        match self {
            Self::Sprite(d) => d.material_mut(),
            Self::MeshSprite(d) => d.material_mut(),
            Self::Text(d) => d.material_mut(),
            Self::Particles(d) => d.material_mut(),
        }
    }

    /// Snapshot of the material, flagged invalid when it cannot render
    pub fn material_descriptor(&self) -> MaterialDescriptor {
        self.material().descriptor()
    }

    /// World-space triangles
    pub fn produce_vertex_data(&self, world: &Mat4) -> VertexData {
        match self {
            Self::Sprite(d) => d.produce_vertex_data(world),
            Self::MeshSprite(d) => d.produce_vertex_data(world),
            Self::Text(d) => d.produce_vertex_data(world),
            Self::Particles(d) => d.produce_vertex_data(world),
        }
    }

    /// Local-space bounds
    pub fn bounding_box(&self) -> AABB {
        match self {
            Self::Sprite(d) => d.bounding_box(),
            Self::MeshSprite(d) => d.bounding_box(),
            Self::Text(d) => d.bounding_box(),
            Self::Particles(d) => d.bounding_box(),
        }
    }

    /// Advance time-dependent state; only particle systems have any
    pub fn update(&mut self, dt: f32) {
        if let Self::Particles(particles) = self {
            particles.update(dt);
        }
    }

    /// Descriptor and vertex data together, or the reason the drawable cannot render
    pub fn prepare(&self, world: &Mat4) -> Result<(MaterialDescriptor, VertexData), ResourceError> {
        let descriptor = self.material_descriptor();
        descriptor.validity()?;
        let data = self.produce_vertex_data(world);
        if data.is_empty() {
            return Err(ResourceError::EmptyGeometry);
        }
        Ok((descriptor, data))
    }
}

impl From<Sprite> for Drawable {
    fn from(sprite: Sprite) -> Self {
        Self::Sprite(sprite)
    }
}

impl From<MeshSprite> for Drawable {
    fn from(mesh: MeshSprite) -> Self {
        Self::MeshSprite(mesh)
    }
}

impl From<Text> for Drawable {
    fn from(text: Text) -> Self {
        Self::Text(text)
    }
}

impl From<ParticleSystem> for Drawable {
    fn from(particles: ParticleSystem) -> Self {
        Self::Particles(particles)
    }
}
