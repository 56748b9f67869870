//! Shader and batching demo
//!
//! Builds a small scene of sprites cycling through four textures, a mesh
//! sprite cut out of a texture, a text label and a particle emitter. Two
//! drawables use custom shaders with uniform blocks. The scene is animated
//! for a fixed number of frames on the headless recording device and the
//! per-frame statistics are logged.
//!
//! Usage: `sprite_demo [config.toml | config.ron]`

use std::sync::Arc;
use std::time::Instant;

use rand::prelude::*;
use sprite_engine::config::ConfigError;
use sprite_engine::prelude::*;
use sprite_engine::render::drawable::Glyph;
use sprite_engine::render::resources::{Shader, ShaderStateError};
use sprite_engine::render::DeviceError;
use sprite_engine::scene::SceneError;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;
const NUM_SPRITES: usize = 8;
const NUM_FRAMES: u64 = 240;
const FRAME_TIME: f32 = 1.0 / 60.0;
/// Frame at which the custom shaders are dropped again
const RESET_SHADERS_AT: u64 = 120;
/// Frame at which a lost context is simulated
const LOSE_CONTEXT_AT: u64 = 180;

const TEXEL_POINTS: [(f32, f32); 3] = [(4.0, 2.0), (124.0, 2.0), (64.0, 122.0)];

const SPRITE_VS: &str = r"
uniform mat4 projection;
uniform mat4 modelView;
layout (std140) uniform SpriteBlock
{
	vec4 color;
	vec4 texRect;
	vec2 spriteSize;
};
out vec2 vTexCoords;
out vec4 vColor;
void main()
{
	vec2 aPosition = vec2(0.5 - float(gl_VertexID >> 1), -0.5 + float(gl_VertexID % 2));
	vec2 aTexCoords = vec2(1.0 - float(gl_VertexID >> 1), 1.0 - float(gl_VertexID % 2));
	vec4 position = vec4(aPosition.x * spriteSize.x, aPosition.y * spriteSize.y, 0.0, 1.0);
	gl_Position = projection * modelView * position;
	vTexCoords = vec2(aTexCoords.x * texRect.x + texRect.y, aTexCoords.y * texRect.z + texRect.w);
	vColor = color;
}
";

const SPRITE_FS: &str = r"
#ifdef GL_ES
precision mediump float;
#endif
uniform sampler2D uTexture;
in vec2 vTexCoords;
in vec4 vColor;
out vec4 fragColor;
void main()
{
	const vec2 onePixel = vec2(1.0 / 128.0, 1.0 / 128.0);
	vec4 color;
	color.rgb = vec3(0.5);
	float alpha = texture(uTexture, vTexCoords).a;
	color -= texture(uTexture, vTexCoords - onePixel) * 5.0;
	color += texture(uTexture, vTexCoords + onePixel) * 5.0;
	color.rgb = vec3((color.r + color.g + color.b) / 3.0);
	fragColor = vec4(color.rgb, alpha);
}
";

const MESH_VS: &str = r"
uniform mat4 projection;
uniform mat4 modelView;
layout (std140) uniform MeshSpriteBlock
{
	vec4 color;
	vec4 texRect;
	vec2 spriteSize;
};
in vec2 aPosition;
in vec2 aTexCoords;
out vec2 vTexCoords;
out vec4 vColor;
void main()
{
	vec4 position = vec4(aPosition.x * spriteSize.x, aPosition.y * spriteSize.y, 0.0, 1.0);
	gl_Position = projection * modelView * position;
	vTexCoords = vec2(aTexCoords.x * texRect.x + texRect.y, aTexCoords.y * texRect.z + texRect.w);
	vColor = color;
}
";

const MESH_FS: &str = r"
#ifdef GL_ES
precision mediump float;
#endif
uniform sampler2D uTexture;
in vec2 vTexCoords;
in vec4 vColor;
out vec4 fragColor;
void main()
{
	vec4 color = texture(uTexture, vTexCoords);
	float lum = dot(vec3(0.30, 0.59, 0.11), color.xyz);
	fragColor = vec4(vec3(lum) * vColor.rgb, color.a);
}
";

/// Errors that end the demo
#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Shader state error: {0}")]
    ShaderState(#[from] ShaderStateError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

struct ShaderDemo {
    engine: EngineConfig,
    scene: SceneGraph,
    registry: ResourceRegistry,
    device: RecordingDevice,
    renderer: FrameRenderer,
    sprites: Vec<(NodeHandle, f32)>,
    mesh: NodeHandle,
    label: NodeHandle,
    emitter: NodeHandle,
    angle: f32,
}

impl ShaderDemo {
    fn new(config: &ApplicationConfig) -> Result<Self, DemoError> {
        let mut device = RecordingDevice::new(WIDTH, HEIGHT);
        let mut registry = ResourceRegistry::new();
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let (width, height) = (WIDTH as f32, HEIGHT as f32);

        let textures: Vec<_> = (1..=4)
            .map(|id| registry.register_texture(TextureInfo::new(TextureId(id), 128, 128, 4)))
            .collect();

        let mut sprites = Vec::with_capacity(NUM_SPRITES);
        for i in 0..NUM_SPRITES {
            let x = width * 0.15 + width * 0.1 * i as f32;
            let sprite = Sprite::new(Some(textures[i % textures.len()]));
            let node = SceneNode::with_drawable(Transform::from_2d(x, 300.0, 0.0, 0.0, 0.5), sprite).named(format!("sprite{i}"));
            sprites.push((scene.add_child(root, node)?, x));
        }

        let (last, _) = sprites[NUM_SPRITES - 1];
        let sprite_shader = Self::link(&mut registry, &mut device, "sprite_emboss", SPRITE_VS, SPRITE_FS)?
            .filter(|shader| Self::has_block(shader, "SpriteBlock"));
        if let Some(sprite_shader) = sprite_shader {
            let material = scene.material_mut(last)?;
            let texture = material.texture().copied().unwrap_or(textures[0]);
            material.set_shader(Some(sprite_shader))?;
            material.set_uniform_int(None, "uTexture", &[0])?;
            material.set_uniform_float(Some("SpriteBlock"), "color", &[0.0, 1.0, 1.0, 1.0])?;
            material.set_uniform_float(Some("SpriteBlock"), "texRect", &[1.0, 0.0, 1.0, 0.0])?;
            let size = texture.size() * 0.5;
            material.set_uniform_float(Some("SpriteBlock"), "spriteSize", &[size.x, size.y])?;
        }

        let mut mesh = MeshSprite::new(Some(textures[0]));
        let texels: Vec<_> = TEXEL_POINTS.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
        mesh.create_vertices_from_texels(&texels).map_err(RenderError::from)?;
        let mesh_shader = Self::link(&mut registry, &mut device, "mesh_luminance", MESH_VS, MESH_FS)?
            .filter(|shader| Self::has_block(shader, "MeshSpriteBlock"));
        if let Some(mesh_shader) = mesh_shader {
            let material = mesh.material_mut();
            material.set_shader(Some(mesh_shader))?;
            material.set_uniform_int(None, "uTexture", &[0])?;
            material.set_uniform_float(Some("MeshSpriteBlock"), "color", &[1.0, 1.0, 1.0, 1.0])?;
            material.set_uniform_float(Some("MeshSpriteBlock"), "texRect", &[1.0, 0.0, 1.0, 0.0])?;
            material.set_uniform_float(Some("MeshSpriteBlock"), "spriteSize", &[1.0, 1.0])?;
            material.set_attribute("aPosition", 4 * 4, 0)?;
            material.set_attribute("aTexCoords", 4 * 4, 2 * 4)?;
        }
        let mesh = scene.add_child(root, SceneNode::with_drawable(Transform::from_2d(width * 0.5, height * 0.8, 0.0, 0.0, 1.0), mesh))?;

        let font = Arc::new(Self::block_font(registry.register_texture(TextureInfo::new(TextureId(5), 256, 256, 4))));
        let mut text = Text::new(font).with_string("frame 0");
        text.set_alignment(Alignment::Center);
        let label = scene.add_child(root, SceneNode::with_drawable(Transform::from_2d(width * 0.5, 40.0, -1.0, 0.0, 1.0), text).on_layer(1))?;

        let settings = EmitterSettings { acceleration: Vec2::new(0.0, -30.0), ..EmitterSettings::default() };
        let particles = ParticleSystem::new(256, Some(textures[3]), settings, thread_rng().gen());
        let emitter = scene.add_child(root, SceneNode::with_drawable(Transform::from_2d(width * 0.85, 80.0, 0.5, 0.0, 1.0), particles))?;

        Ok(Self {
            engine: config.engine.clone(),
            scene,
            registry,
            device,
            renderer: FrameRenderer::new(config.renderer.clone())?,
            sprites,
            mesh,
            label,
            emitter,
            angle: 0.0,
        })
    }

    fn link(
        registry: &mut ResourceRegistry,
        device: &mut RecordingDevice,
        label: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<Option<Arc<Shader>>, DemoError> {
        let shader = registry.create_shader(device, label, ShaderSource::from_strings(vertex, fragment))?;
        if !shader.is_linked() {
            log::warn!("Shader '{}' did not link, its drawable keeps the default program", label);
            return Ok(None);
        }
        Ok(Some(shader))
    }

    fn has_block(shader: &Shader, block: &str) -> bool {
        let found = shader.has_block(block);
        if !found {
            log::warn!("Shader '{}' has no uniform block '{}'", shader.label(), block);
        }
        found
    }

    /// A fixed-width font: printable ASCII laid out on a 16x16 grid of 16 px cells
    fn block_font(atlas: TextureInfo) -> GlyphTable {
        let mut table = GlyphTable::new(atlas, 16.0);
        for code in 32_u8..127 {
            let cell = f32::from(code - 32);
            let rect = if code == b' ' { Rect::default() } else { Rect::new((cell % 16.0) * 16.0, (cell / 16.0).floor() * 16.0, 12.0, 16.0) };
            table.insert_glyph(char::from(code), Glyph { tex_rect: rect, offset: Vec2::zeros(), advance: 12.0 });
        }
        table
    }

    fn animate(&mut self, frame: u64) -> Result<(), DemoError> {
        let height = HEIGHT as f32;
        self.angle += FRAME_TIME;
        if self.angle > 360.0 {
            self.angle -= 360.0;
        }
        let angle = self.angle;

        for (i, &(node, x)) in self.sprites.iter().enumerate() {
            let i = i as f32;
            let y = height * 0.3 + (angle + 5.0 * i).sin().abs() * (height * (0.25 + 0.02 * i));
            self.scene.set_local_transform(node, Transform::from_2d(x, y, 0.0, angle * 20.0, 0.5))?;
        }
        self.scene.update_local_transform(self.mesh, |t| *t = t.clone().with_rotation_z(angle * 20.0))?;
        let material = self.scene.material_mut(self.mesh)?;
        if material.shader_state().shader().is_some() {
            material.set_uniform_float(Some("MeshSpriteBlock"), "color", &[angle.sin(), 1.0 - angle.sin(), 1.0, 1.0])?;
        }

        if let Drawable::Particles(particles) = self.scene.drawable_mut(self.emitter)? {
            particles.emit(4);
        }
        self.scene.update_drawables(FRAME_TIME);

        if let Drawable::Text(text) = self.scene.drawable_mut(self.label)? {
            text.set_string(format!("frame {frame}"));
        }
        Ok(())
    }

    fn reset_shaders(&mut self) -> Result<(), DemoError> {
        let mut nodes: Vec<_> = self.sprites.iter().map(|&(node, _)| node).collect();
        nodes.push(self.mesh);
        for node in nodes {
            let material = self.scene.material_mut(node)?;
            if material.set_shader(None)? {
                log::info!("Node restored to built-in program {:?}", material.shader_state().builtin_program());
            }
        }
        Ok(())
    }

    fn recover_context(&mut self) -> Result<(), DemoError> {
        log::info!("Recreating the graphics context");
        self.device.restore_context();
        let report = self.renderer.reload_resources(&mut self.registry, &mut self.device)?;
        if !report.failed.is_empty() {
            log::warn!("{} program(s) failed to relink", report.failed.len());
        }
        Ok(())
    }

    fn run(&mut self, frames: u64) -> Result<FrameStats, DemoError> {
        let mut totals = FrameStats::default();
        for frame in 0..frames {
            let frame_start = Instant::now();
            if frame == RESET_SHADERS_AT {
                self.reset_shaders()?;
            }
            if frame == LOSE_CONTEXT_AT {
                self.device.lose_context();
            }
            self.animate(frame)?;

            let stats = match self.renderer.render_frame(&mut self.scene, &self.registry, &mut self.device) {
                Ok(stats) => stats,
                Err(err) if err.is_fatal() => {
                    log::warn!("Frame {} lost: {}", frame, err);
                    self.recover_context()?;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if self.engine.debug_mode {
                let sizes: Vec<_> = self.renderer.batches().iter().map(|batch| batch.command_count()).collect();
                log::info!("Frame {}: {:?}, batch sizes {:?}", frame, stats, sizes);
            } else if frame % 60 == 0 {
                log::info!(
                    "Frame {}: {} commands in {} batches, {} state changes, {} triangles, {}us",
                    frame,
                    stats.submitted,
                    stats.batches,
                    stats.state_changes,
                    stats.triangles,
                    stats.total_time_us()
                );
            }
            totals.submitted += stats.submitted;
            totals.batches += stats.batches;
            totals.draw_calls += stats.draw_calls;
            totals.state_changes += stats.state_changes;
            totals.dropped += stats.dropped;

            if let Some(budget) = self.engine.frame_budget() {
                if let Some(rest) = budget.checked_sub(frame_start.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }
        totals.frame = self.renderer.frame_count();
        Ok(totals)
    }
}

fn load_config() -> Result<ApplicationConfig, ConfigError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ApplicationConfig::load_from_file(path)?,
        None => ApplicationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    // Initialize logging
    sprite_engine::foundation::logging::init_with_level(&config.engine.log_level);

    log::info!("Starting sprite shader demo");
    let mut demo = ShaderDemo::new(&config)?;
    let totals = demo.run(NUM_FRAMES)?;

    log::info!(
        "Rendered {} frames: {} commands merged into {} draw calls ({} state changes, {} dropped), {} frames presented",
        totals.frame,
        totals.submitted,
        totals.draw_calls,
        totals.state_changes,
        totals.dropped,
        demo.device.frames_presented()
    );
    Ok(())
}
