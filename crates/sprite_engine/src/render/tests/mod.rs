//! Whole-pipeline tests driven through the headless recording device

mod pipeline;
mod shaders;

use crate::core::config::RendererConfig;
use crate::foundation::math::Transform;
use crate::render::backends::headless::{DeviceCall, RecordingDevice};
use crate::render::drawable::{Drawable, Sprite};
use crate::render::frame::{FrameRenderer, FrameStats};
use crate::render::resources::{ResourceRegistry, TextureId, TextureInfo};
use crate::scene::{NodeHandle, SceneGraph, SceneNode};

/// Scene, registry and device of one test
struct Fixture {
    scene: SceneGraph,
    registry: ResourceRegistry,
    device: RecordingDevice,
}

impl Fixture {
    fn new() -> Self {
        Self {
            scene: SceneGraph::new(),
            registry: ResourceRegistry::new(),
            device: RecordingDevice::new(800, 600),
        }
    }

    /// Register a 16x16 texture; RGBA textures make their sprites transparent
    fn texture(&mut self, id: u32, alpha: bool) -> TextureInfo {
        self.registry.register_texture(TextureInfo::new(TextureId(id), 16, 16, if alpha { 4 } else { 3 }))
    }

    fn add(&mut self, drawable: impl Into<Drawable>, x: f32, y: f32, depth: f32, layer: i32) -> NodeHandle {
        let node = SceneNode::with_drawable(Transform::from_2d(x, y, depth, 0.0, 1.0), drawable).on_layer(layer);
        self.scene.add_child(self.scene.root(), node).unwrap()
    }

    fn add_sprite(&mut self, texture: TextureInfo, x: f32, depth: f32) -> NodeHandle {
        self.add(Sprite::new(Some(texture)), x, 300.0, depth, 0)
    }

    fn render(&mut self, renderer: &mut FrameRenderer) -> FrameStats {
        renderer.render_frame(&mut self.scene, &self.registry, &mut self.device).unwrap()
    }

    fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.device.count_calls(predicate)
    }

    /// Textures of the recorded draws, in draw order
    fn drawn_textures(&self) -> Vec<Option<TextureId>> {
        self.device.draws().iter().map(|draw| draw.texture).collect()
    }
}

fn renderer(config: RendererConfig) -> FrameRenderer {
    FrameRenderer::new(config).unwrap()
}
