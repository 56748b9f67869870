//! Custom shaders, uniform batching and device failures

use std::sync::Arc;

use super::*;
use crate::core::config::UniformBatchPolicy;
use crate::foundation::math::Vec2;
use crate::render::drawable::MeshSprite;
use crate::render::primitives::VertexLayoutId;
use crate::render::resources::{ProgramId, Shader, ShaderSource, ShaderStateError};
use crate::render::RenderError;

const SPRITE_VS: &str = r"
uniform mat4 projection;
layout (std140) uniform SpriteBlock
{
	vec4 color;
	vec4 texRect;
};
in vec2 aPosition;
in vec2 aTexCoords;
out vec2 vTexCoords;
void main()
{
	gl_Position = projection * vec4(aPosition, 0.0, 1.0);
	vTexCoords = aTexCoords;
}
";

const SPRITE_FS: &str = r"
uniform sampler2D uTexture;
in vec2 vTexCoords;
out vec4 fragColor;
void main() { fragColor = texture(uTexture, vTexCoords); }
";

fn tinted_shader(fx: &mut Fixture) -> Arc<Shader> {
    fx.registry
        .create_shader(&mut fx.device, "tinted", ShaderSource::from_strings(SPRITE_VS, SPRITE_FS))
        .unwrap()
}

fn tinted_sprite(texture: TextureInfo, shader: &Arc<Shader>, red: f32) -> Sprite {
    let mut sprite = Sprite::new(Some(texture));
    let material = sprite.material_mut();
    material.set_shader(Some(Arc::clone(shader))).unwrap();
    material.set_uniform_float(Some("SpriteBlock"), "color", &[red, 0.0, 0.0, 1.0]).unwrap();
    sprite
}

#[test]
fn test_custom_shader_draws_with_its_uniforms() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    let shader = tinted_shader(&mut fx);
    fx.add(tinted_sprite(texture, &shader, 1.0), 100.0, 100.0, 0.0, 0);

    let stats = fx.render(&mut renderer(RendererConfig::default()));

    assert_eq!(stats.draw_calls, 1);
    let draw = &fx.device.draws()[0];
    assert_eq!(draw.program, Some(shader.program()));
    assert_eq!(draw.uniforms.len(), 1);
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::UploadUniforms { .. })), 1);
}

#[test]
fn test_differing_uniforms_split_batches_unless_per_instance() {
    let build = || {
        let mut fx = Fixture::new();
        let texture = fx.texture(1, false);
        let shader = tinted_shader(&mut fx);
        fx.add(tinted_sprite(texture, &shader, 0.25), 100.0, 100.0, 0.0, 0);
        fx.add(tinted_sprite(texture, &shader, 0.75), 200.0, 100.0, 0.0, 0);
        fx
    };

    let mut strict = build();
    let stats = strict.render(&mut renderer(RendererConfig::default()));
    assert_eq!(stats.batches, 2);
    assert_eq!(strict.count(|c| matches!(c, DeviceCall::UploadUniforms { .. })), 2);

    let mut instanced = build();
    let config = RendererConfig::default().with_uniform_policy(UniformBatchPolicy::PerInstanceArrays);
    let stats = instanced.render(&mut renderer(config));
    assert_eq!(stats.batches, 1);

    let draw = &instanced.device.draws()[0];
    assert_eq!(draw.instance_uniforms.len(), 2);
    assert_ne!(draw.instance_uniforms[0], draw.instance_uniforms[1]);
    let instances: Vec<_> = draw.triangles.chunks(6).map(|quad| quad[0].instance).collect();
    assert_eq!(instances, vec![0, 1]);
}

#[test]
fn test_equal_uniforms_still_batch() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    let shader = tinted_shader(&mut fx);
    for i in 0..3 {
        fx.add(tinted_sprite(texture, &shader, 0.5), 100.0 + i as f32 * 50.0, 100.0, 0.0, 0);
    }

    let stats = fx.render(&mut renderer(RendererConfig::default()));
    assert_eq!(stats.batches, 1);
    assert!(fx.device.draws()[0].instance_uniforms.is_empty());
}

#[test]
fn test_failed_link_keeps_the_builtin_program() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    fx.device.fail_next_link("0:3: syntax error");
    let broken = tinted_shader(&mut fx);
    assert!(!broken.is_linked());

    let mut sprite = Sprite::new(Some(texture));
    assert!(matches!(
        sprite.material_mut().set_shader(Some(broken)),
        Err(ShaderStateError::NotLinked(_))
    ));
    fx.add(sprite, 100.0, 100.0, 0.0, 0);

    fx.render(&mut renderer(RendererConfig::default()));
    assert_eq!(fx.device.draws()[0].program, Some(ProgramId::SPRITE));
}

#[test]
fn test_clearing_the_shader_restores_the_builtin_program() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    let shader = tinted_shader(&mut fx);
    let node = fx.add(tinted_sprite(texture, &shader, 1.0), 100.0, 100.0, 0.0, 0);

    let mut renderer = renderer(RendererConfig::default());
    fx.render(&mut renderer);
    assert!(fx.scene.material_mut(node).unwrap().set_shader(None).unwrap());
    fx.device.clear_log();
    fx.render(&mut renderer);

    let draw = &fx.device.draws()[0];
    assert_eq!(draw.program, Some(ProgramId::SPRITE));
    assert!(draw.uniforms.is_empty());
}

#[test]
fn test_attribute_bindings_select_a_vertex_layout() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, true);
    let shader = tinted_shader(&mut fx);
    let texels = [Vec2::new(0.0, 0.0), Vec2::new(0.0, 16.0), Vec2::new(16.0, 0.0), Vec2::new(16.0, 16.0)];

    let mut plain = MeshSprite::new(Some(texture));
    plain.create_vertices_from_texels(&texels).unwrap();
    plain.material_mut().set_shader(Some(Arc::clone(&shader))).unwrap();
    let mut bound = plain.clone();
    bound.material_mut().set_attribute("aPosition", 40, 0).unwrap();
    bound.material_mut().set_attribute("aTexCoords", 40, 12).unwrap();

    fx.add(plain, 100.0, 100.0, 0.0, 0);
    fx.add(bound, 150.0, 100.0, 0.0, 0);
    let stats = fx.render(&mut renderer(RendererConfig::default()));

    assert_eq!(stats.batches, 2);
    let layouts: Vec<_> = fx.device.draws().iter().map(|d| d.vertex_layout).collect();
    let standard = layouts.iter().filter(|&&layout| layout == Some(VertexLayoutId::STANDARD)).count();
    assert_eq!(standard, 1);
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::SetVertexLayout(_))), 2);
}

#[test]
fn test_upload_failure_only_skips_its_batch() {
    let mut fx = Fixture::new();
    let a = fx.texture(1, false);
    let b = fx.texture(2, false);
    fx.add_sprite(a, 100.0, 0.0);
    fx.add_sprite(b, 200.0, 0.0);
    fx.device.fail_next_upload();

    let stats = fx.render(&mut renderer(RendererConfig::default()));
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.skipped_batches, 1);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(fx.device.frames_presented(), 1);
}

#[test]
fn test_lost_context_fails_the_frame_until_reloaded() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    let shader = tinted_shader(&mut fx);
    fx.add(tinted_sprite(texture, &shader, 1.0), 100.0, 100.0, 0.0, 0);

    let mut renderer = renderer(RendererConfig::default());
    fx.render(&mut renderer);

    fx.device.lose_context();
    let err = renderer.render_frame(&mut fx.scene, &fx.registry, &mut fx.device).unwrap_err();
    assert!(matches!(err, RenderError::DeviceLost));
    assert!(err.is_fatal());

    fx.device.restore_context();
    let report = renderer.reload_resources(&mut fx.registry, &mut fx.device).unwrap();
    assert_eq!(report.relinked, 1);
    assert!(report.failed.is_empty());

    fx.device.clear_log();
    let stats = fx.render(&mut renderer);
    assert_eq!(stats.draw_calls, 1);
    // nothing is assumed bound after a reload
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::BindProgram(_))), 1);
    assert_eq!(fx.device.draws()[0].uniforms.len(), 1);
}

#[test]
fn test_reload_failure_keeps_the_previous_program() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    let shader = tinted_shader(&mut fx);
    fx.add(tinted_sprite(texture, &shader, 1.0), 100.0, 100.0, 0.0, 0);

    let mut renderer = renderer(RendererConfig::default());
    fx.device.fail_next_link("driver update broke it");
    let report = renderer.reload_resources(&mut fx.registry, &mut fx.device).unwrap();
    assert_eq!(report.failed, vec![shader.program()]);

    let stats = fx.render(&mut renderer);
    assert_eq!(stats.dropped, 0);
    assert_eq!(fx.device.draws()[0].program, Some(shader.program()));
}

#[test]
fn test_reload_while_context_is_lost_is_fatal() {
    let mut fx = Fixture::new();
    tinted_shader(&mut fx);
    let mut renderer = renderer(RendererConfig::default());

    fx.device.lose_context();
    let err = renderer.reload_resources(&mut fx.registry, &mut fx.device).unwrap_err();
    assert!(err.is_fatal());
}
