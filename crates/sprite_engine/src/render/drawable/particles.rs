//! Particle systems
//!
//! A fixed-capacity pool of particles simulated in the node's local space.
//! Each live particle is drawn as one textured quad whose size and color are
//! interpolated over its lifetime. Emission draws from a seeded generator so
//! a simulation replays identically.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::foundation::math::utils::{lerp, lerp_color};
use crate::foundation::math::{Mat4, Vec2, Vec3};
use crate::render::primitives::{Vertex, VertexData};
use crate::render::resources::{Material, ProgramId, TextureInfo};
use crate::scene::AABB;

/// Ranges and curves used for newly emitted particles
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterSettings {
    /// Lifetime range in seconds
    pub life: (f32, f32),
    /// Lower corner of the initial velocity range
    pub velocity_min: Vec2,
    /// Upper corner of the initial velocity range
    pub velocity_max: Vec2,
    /// Constant acceleration, e.g. gravity
    pub acceleration: Vec2,
    /// Quad size at birth
    pub start_size: f32,
    /// Quad size at death
    pub end_size: f32,
    /// Color at birth
    pub start_color: [f32; 4],
    /// Color at death
    pub end_color: [f32; 4],
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            life: (1.0, 1.0),
            velocity_min: Vec2::new(-10.0, 20.0),
            velocity_max: Vec2::new(10.0, 40.0),
            acceleration: Vec2::zeros(),
            start_size: 8.0,
            end_size: 2.0,
            start_color: [1.0; 4],
            end_color: [1.0, 1.0, 1.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Particle {
    position: Vec2,
    velocity: Vec2,
    remaining: f32,
    lifetime: f32,
}

impl Particle {
    /// Age in `[0, 1]`, 0 at birth
    fn age(&self) -> f32 {
        if self.lifetime <= 0.0 {
            1.0
        } else {
            1.0 - (self.remaining / self.lifetime).clamp(0.0, 1.0)
        }
    }
}

/// A pooled particle emitter
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    material: Material,
    settings: EmitterSettings,
    particles: Vec<Particle>,
    capacity: usize,
    rng: StdRng,
}

impl ParticleSystem {
    /// Create an emitter holding at most `capacity` live particles
    pub fn new(capacity: usize, texture: Option<TextureInfo>, settings: EmitterSettings, seed: u64) -> Self {
        Self {
            material: Material::new(ProgramId::PARTICLE, texture),
            settings,
            particles: Vec::with_capacity(capacity),
            capacity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Live material
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Mutable live material
    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    /// Emission settings
    pub fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    /// Replace emission settings; live particles keep their state
    pub fn set_settings(&mut self, settings: EmitterSettings) {
        self.settings = settings;
    }

    /// Number of live particles
    pub fn alive(&self) -> usize {
        self.particles.len()
    }

    /// Maximum number of live particles
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Emit up to `count` particles at the node origin, limited by free capacity
    ///
    /// Returns the number actually emitted.
    pub fn emit(&mut self, count: usize) -> usize {
        let count = count.min(self.capacity - self.particles.len());
        for _ in 0..count {
            let s = &self.settings;
            let lifetime = lerp(s.life.0, s.life.1, self.rng.gen::<f32>());
            let velocity = Vec2::new(
                lerp(s.velocity_min.x, s.velocity_max.x, self.rng.gen::<f32>()),
                lerp(s.velocity_min.y, s.velocity_max.y, self.rng.gen::<f32>()),
            );
            self.particles.push(Particle { position: Vec2::zeros(), velocity, remaining: lifetime, lifetime });
        }
        count
    }

    /// Advance the simulation by `dt` seconds and retire dead particles
    pub fn update(&mut self, dt: f32) {
        let acceleration = self.settings.acceleration;
        for particle in &mut self.particles {
            particle.velocity += acceleration * dt;
            particle.position += particle.velocity * dt;
            particle.remaining -= dt;
        }
        self.particles.retain(|particle| particle.remaining > 0.0);
    }

    fn particle_size(&self, particle: &Particle) -> f32 {
        lerp(self.settings.start_size, self.settings.end_size, particle.age())
    }

    /// World-space quads, one per live particle
    pub fn produce_vertex_data(&self, world: &Mat4) -> VertexData {
        let mut data = VertexData::with_quad_capacity(self.particles.len());
        for particle in &self.particles {
            let age = particle.age();
            let half = self.particle_size(particle) * 0.5;
            let color = lerp_color(self.settings.start_color, self.settings.end_color, age);
            let p = particle.position;
            let corner = |dx: f32, dy: f32, uv: [f32; 2]| Vertex::from_local(world, Vec2::new(p.x + dx, p.y + dy), uv, color);
            data.push_quad([
                corner(-half, half, [0.0, 0.0]),
                corner(-half, -half, [0.0, 1.0]),
                corner(half, half, [1.0, 0.0]),
                corner(half, -half, [1.0, 1.0]),
            ]);
        }
        data
    }

    /// Local-space bounds of every live particle quad
    pub fn bounding_box(&self) -> AABB {
        self.particles.iter().fold(AABB::empty(), |bounds, particle| {
            let half = self.particle_size(particle) * 0.5;
            let center = Vec3::new(particle.position.x, particle.position.y, 0.0);
            let extent = Vec3::new(half, half, 0.0);
            bounds.union(&AABB::new(center - extent, center + extent))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::resources::TextureId;
    use approx::assert_relative_eq;

    fn system(capacity: usize, seed: u64) -> ParticleSystem {
        let settings = EmitterSettings { life: (0.5, 1.5), ..EmitterSettings::default() };
        ParticleSystem::new(capacity, Some(TextureInfo::new(TextureId(4), 16, 16, 4)), settings, seed)
    }

    #[test]
    fn test_emit_respects_capacity() {
        let mut particles = system(10, 1);
        assert_eq!(particles.emit(6), 6);
        assert_eq!(particles.emit(6), 4);
        assert_eq!(particles.alive(), 10);
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let (mut a, mut b) = (system(32, 7), system(32, 7));
        for _ in 0..5 {
            a.emit(4);
            b.emit(4);
            a.update(0.1);
            b.update(0.1);
        }
        let world = Mat4::identity();
        assert_eq!(a.produce_vertex_data(&world), b.produce_vertex_data(&world));
    }

    #[test]
    fn test_particles_expire() {
        let mut particles = system(16, 3);
        particles.emit(16);
        particles.update(0.25);
        assert_eq!(particles.alive(), 16);
        particles.update(1.5);
        assert_eq!(particles.alive(), 0);
        assert!(particles.produce_vertex_data(&Mat4::identity()).is_empty());
        assert!(particles.bounding_box().is_empty());
    }

    #[test]
    fn test_size_and_color_interpolate_over_lifetime() {
        let settings = EmitterSettings {
            life: (2.0, 2.0),
            velocity_min: Vec2::zeros(),
            velocity_max: Vec2::zeros(),
            ..EmitterSettings::default()
        };
        let mut particles = ParticleSystem::new(1, None, settings, 0);
        particles.emit(1);
        particles.update(1.0);

        let data = particles.produce_vertex_data(&Mat4::identity());
        // halfway: size 5, alpha 0.5
        assert_relative_eq!(data.vertices[0].position[0], -2.5);
        assert_relative_eq!(data.vertices[0].color[3], 0.5);
        assert_eq!(data.triangle_count(), 2);
    }
}
