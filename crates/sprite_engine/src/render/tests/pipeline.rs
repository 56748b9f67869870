//! Ordering and batching of whole frames

use super::*;
use crate::foundation::math::Point3;
use crate::render::device::GfxDevice;
use crate::render::resources::BlendMode;

#[test]
fn test_opaque_sprites_sharing_a_material_draw_once() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    fx.add_sprite(texture, 100.0, 1.0);
    fx.add_sprite(texture, 200.0, 2.0);
    fx.add_sprite(texture, 300.0, 3.0);

    let mut renderer = renderer(RendererConfig::default());
    let stats = fx.render(&mut renderer);

    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.batches, 1);
    assert_eq!(renderer.batches()[0].command_count(), 3);
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::BindProgram(_))), 1);
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::BindTexture(_))), 1);
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::Draw { .. })), 1);
    assert_eq!(fx.device.draws()[0].triangles.len(), 18);
}

#[test]
fn test_transparent_sprites_draw_back_to_front() {
    let mut fx = Fixture::new();
    let near = fx.texture(1, true);
    let far = fx.texture(2, true);
    fx.add_sprite(near, 100.0, 2.0);
    fx.add_sprite(far, 200.0, 5.0);

    let stats = fx.render(&mut renderer(RendererConfig::default()));

    assert_eq!(stats.batches, 2);
    assert_eq!(fx.drawn_textures(), vec![Some(far.id), Some(near.id)]);
}

#[test]
fn test_depth_order_agrees_with_the_device_projection() {
    let mut fx = Fixture::new();
    let glass = fx.texture(1, true);
    let wall = fx.texture(2, false);
    fx.add_sprite(glass, 100.0, 2.0);
    fx.add_sprite(glass, 200.0, 5.0);
    fx.add_sprite(wall, 300.0, 5.0);
    fx.add_sprite(wall, 400.0, 2.0);

    let mut renderer = renderer(RendererConfig::default().with_batching(false));
    fx.render(&mut renderer);

    let projection = fx.device.projection();
    let clip_z: Vec<_> = fx
        .device
        .draws()
        .iter()
        .map(|draw| {
            let [x, y, z] = draw.triangles[0].position;
            projection.transform_point(&Point3::new(x, y, z)).z
        })
        .collect();
    assert_eq!(clip_z.len(), 4);
    // opaque front to back, then transparent back to front
    assert!(clip_z[0] < clip_z[1]);
    assert!(clip_z[2] > clip_z[3]);
}

#[test]
fn test_transparent_depth_order_wins_over_batching() {
    let mut fx = Fixture::new();
    let a = fx.texture(1, true);
    let b = fx.texture(2, true);
    fx.add_sprite(a, 100.0, 4.0);
    fx.add_sprite(a, 200.0, 2.0);
    fx.add_sprite(b, 300.0, 3.0);

    let stats = fx.render(&mut renderer(RendererConfig::default()));

    // the two `a` sprites are not adjacent in depth order, so they cannot merge
    assert_eq!(stats.batches, 3);
    assert_eq!(fx.drawn_textures(), vec![Some(a.id), Some(b.id), Some(a.id)]);
}

#[test]
fn test_opaque_sprites_group_by_material() {
    let mut fx = Fixture::new();
    let a = fx.texture(1, false);
    let b = fx.texture(2, false);
    for (i, texture) in [a, b, a, b, a].into_iter().enumerate() {
        fx.add_sprite(texture, 100.0 + i as f32 * 50.0, i as f32);
    }

    let stats = fx.render(&mut renderer(RendererConfig::default()));

    assert_eq!(stats.batches, 2);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::BindTexture(_))), 2);
}

#[test]
fn test_opaque_before_transparent_and_layers_first() {
    let mut fx = Fixture::new();
    let glass = fx.texture(1, true);
    let wall = fx.texture(2, false);
    let overlay = fx.texture(3, false);
    fx.add(Sprite::new(Some(overlay)), 100.0, 300.0, 0.0, 1);
    fx.add_sprite(glass, 200.0, 0.0);
    fx.add_sprite(wall, 300.0, 9.0);

    fx.render(&mut renderer(RendererConfig::default()));

    assert_eq!(fx.drawn_textures(), vec![Some(wall.id), Some(glass.id), Some(overlay.id)]);
    let blends: Vec<_> = fx.device.draws().iter().map(|d| d.blend_mode).collect();
    assert_eq!(blends, vec![Some(BlendMode::Opaque), Some(BlendMode::Alpha), Some(BlendMode::Opaque)]);
}

#[test]
fn test_equal_keys_keep_traversal_order() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, true);
    let nodes: Vec<_> = (0..4).map(|i| fx.add_sprite(texture, 100.0 + i as f32 * 20.0, 1.0)).collect();

    let mut renderer = renderer(RendererConfig::default());
    fx.render(&mut renderer);

    let queued: Vec<_> = renderer.queue().commands().iter().filter_map(|c| c.node).collect();
    assert_eq!(queued, nodes);

    // one merged draw, sprites laid out left to right in submission order
    let triangles = &fx.device.draws()[0].triangles;
    let lefts: Vec<_> = triangles.chunks(6).map(|quad| quad[0].position[0]).collect();
    assert_eq!(lefts, vec![92.0, 112.0, 132.0, 152.0]);
}

#[test]
fn test_batched_and_unbatched_frames_draw_the_same_triangles() {
    let build = || {
        let mut fx = Fixture::new();
        let textures = [fx.texture(1, false), fx.texture(2, false), fx.texture(3, true), fx.texture(4, true)];
        for i in 0..24 {
            let texture = textures[i % textures.len()];
            fx.add(Sprite::new(Some(texture)), 20.0 + i as f32 * 30.0, 100.0, (i % 5) as f32, (i % 2) as i32);
        }
        fx
    };

    let mut batched = build();
    let batched_stats = batched.render(&mut renderer(RendererConfig::default()));
    let mut unbatched = build();
    let unbatched_stats = unbatched.render(&mut renderer(RendererConfig::default().with_batching(false)));

    assert_eq!(unbatched_stats.batches, 24);
    assert!(batched_stats.batches < unbatched_stats.batches);
    assert!(batched_stats.state_changes <= unbatched_stats.state_changes);
    assert_eq!(batched_stats.triangles, unbatched_stats.triangles);
    assert_eq!(batched.device.triangle_stream(), unbatched.device.triangle_stream());
}

#[test]
fn test_rendering_the_same_scene_twice_is_idempotent() {
    let mut fx = Fixture::new();
    let a = fx.texture(1, false);
    let b = fx.texture(2, true);
    for i in 0..6 {
        fx.add_sprite(if i % 2 == 0 { a } else { b }, 50.0 + i as f32 * 60.0, i as f32);
    }

    let mut renderer = renderer(RendererConfig::default());
    let first = fx.render(&mut renderer);
    let first_stream = fx.device.triangle_stream();
    let first_commands = renderer.queue().commands().to_vec();
    fx.device.clear_log();

    let second = fx.render(&mut renderer);
    assert_eq!(renderer.queue().commands(), first_commands.as_slice());
    assert_eq!(fx.device.triangle_stream(), first_stream);
    assert_eq!((first.submitted, first.batches), (second.submitted, second.batches));
    assert_eq!(second.frame, 1);
    // state bound at the end of the first frame carries over
    assert!(second.state_changes < first.state_changes);
}

#[test]
fn test_invalid_and_hidden_drawables_are_skipped() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    fx.add_sprite(texture, 100.0, 0.0);
    fx.add_sprite(TextureInfo::new(TextureId(99), 16, 16, 3), 200.0, 0.0);
    fx.add(Sprite::new(None).with_size(10.0, 10.0), 300.0, 300.0, 0.0, 0);
    let hidden = fx.add_sprite(texture, 400.0, 0.0);
    fx.scene.set_visible(hidden, false).unwrap();

    let stats = fx.render(&mut renderer(RendererConfig::default()));

    assert_eq!(stats.visible, 3);
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn test_hidden_parent_hides_subtree() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, false);
    let group = fx.scene.add_child(fx.scene.root(), SceneNode::new(Transform::identity())).unwrap();
    let child = SceneNode::with_drawable(Transform::from_2d(100.0, 100.0, 0.0, 0.0, 1.0), Sprite::new(Some(texture)));
    fx.scene.add_child(group, child).unwrap();
    fx.scene.set_visible(group, false).unwrap();

    let stats = fx.render(&mut renderer(RendererConfig::default()));
    assert_eq!(stats.visible, 0);
    assert_eq!(fx.count(|c| matches!(c, DeviceCall::Draw { .. })), 0);
    assert_eq!(fx.device.frames_presented(), 1);
}

#[test]
fn test_parallel_collection_matches_sequential() {
    let build = || {
        let mut fx = Fixture::new();
        let textures = [fx.texture(1, false), fx.texture(2, true)];
        for i in 0..64 {
            fx.add_sprite(textures[i % 2], 10.0 + i as f32 * 12.0, (i % 7) as f32);
        }
        fx
    };
    let mut parallel_config = RendererConfig::default();
    parallel_config.parallel.worker_threads = Some(4);
    parallel_config.parallel.parallel_vertex_threshold = 1;
    parallel_config.parallel.parallel_sort_threshold = 1;

    let mut sequential = build();
    sequential.render(&mut renderer(RendererConfig::default()));
    let mut parallel = build();
    parallel.render(&mut renderer(parallel_config));

    assert_eq!(sequential.device.triangle_stream(), parallel.device.triangle_stream());
}

#[test]
fn test_queued_commands_ignore_later_node_changes() {
    let mut fx = Fixture::new();
    let texture = fx.texture(1, true);
    let node = fx.add_sprite(texture, 100.0, 0.0);

    let mut renderer = renderer(RendererConfig::default());
    renderer.collect(&mut fx.scene, &fx.registry, &fx.device);
    fx.scene.material_mut(node).unwrap().set_blend_mode(BlendMode::Additive);
    fx.scene
        .update_local_transform(node, |t| *t = Transform::from_2d(500.0, 300.0, 0.0, 0.0, 1.0))
        .unwrap();

    renderer.sort();
    renderer.batch();
    renderer.execute(&mut fx.device).unwrap();

    let draw = &fx.device.draws()[0];
    assert_eq!(draw.blend_mode, Some(BlendMode::Alpha));
    assert_eq!(draw.triangles[0].position[0], 92.0);
}

#[test]
fn test_particles_advance_between_frames() {
    use crate::render::drawable::{EmitterSettings, ParticleSystem};

    let mut fx = Fixture::new();
    let texture = fx.texture(7, true);
    let mut particles = ParticleSystem::new(8, Some(texture), EmitterSettings::default(), 42);
    particles.emit(8);
    fx.add(particles, 400.0, 300.0, 0.0, 0);

    let mut renderer = renderer(RendererConfig::default());
    let first = fx.render(&mut renderer);
    assert_eq!(first.triangles, 16);
    assert_eq!(first.draw_calls, 1);

    fx.scene.update_drawables(2.0);
    let second = fx.render(&mut renderer);
    // every particle outlived its lifetime, leaving nothing to draw
    assert_eq!(second.dropped, 1);
    assert_eq!(second.draw_calls, 0);
}
