//! End-to-end host behavior: batching, draw order, lifecycle, compositions

use ember_core::{EmberError, Vec2};
use ember_particles::{
    Emitter, EmitterComposition, EmitterConfig, ParticleHost, ParticleTag, SpawnInfo,
};
use ember_render::{BlendMode, DrawRecorder, PrimitiveTopology, RenderStates, SceneNode};

/// A point emitter whose spawns are fully deterministic
fn point_config(depth: i32) -> EmitterConfig {
    EmitterConfig {
        depth,
        particles_per_spawn: 5,
        spawn_rate: 0.125,
        ttl_min: 1.0,
        ttl_max: 1.0,
        speed_min: 0.0,
        speed_max: 0.0,
        spread_deg: 0.0,
        ..Default::default()
    }
}

#[test]
fn identical_keys_share_one_buffer() {
    let mut host = ParticleHost::new();
    let first = host.add_emitter(Emitter::new(point_config(0))).unwrap();
    let second = host.add_emitter(Emitter::new(point_config(0))).unwrap();

    assert_eq!(host.buffer_count(), 1);
    assert_eq!(host.buffers_at_depth(0), 1);

    let buffer = host.emitter(first).unwrap().buffer().unwrap();
    assert_eq!(host.emitter(second).unwrap().buffer(), Some(buffer));
    assert_eq!(host.buffer_emitter_refs(buffer), Some(2));

    host.remove(first).unwrap();
    assert_eq!(host.buffer_count(), 1);
    assert_eq!(host.buffer_emitter_refs(buffer), Some(1));

    host.remove(second).unwrap();
    assert_eq!(host.buffer_count(), 0);
    assert_eq!(host.buffers_at_depth(0), 0);
}

#[test]
fn distinct_materials_get_distinct_buffers() {
    let mut host = ParticleHost::new();
    host.add_emitter(Emitter::new(point_config(0))).unwrap();
    host.add_emitter(Emitter::new(EmitterConfig {
        blend_mode: BlendMode::Additive,
        ..point_config(0)
    }))
    .unwrap();

    // Same depth, different blend mode: two buffers in one layer.
    assert_eq!(host.buffer_count(), 2);
    assert_eq!(host.buffers_at_depth(0), 2);
}

#[test]
fn draw_iterates_depth_layers_ascending() {
    let mut host = ParticleHost::new();
    // Registration order deliberately scrambled; each depth gets its own
    // blend mode so the recorded order is observable.
    host.add_emitter(Emitter::new(EmitterConfig {
        blend_mode: BlendMode::Multiply,
        ..point_config(5)
    }))
    .unwrap();
    host.add_emitter(Emitter::new(EmitterConfig {
        blend_mode: BlendMode::Additive,
        ..point_config(-1)
    }))
    .unwrap();
    host.add_emitter(Emitter::new(EmitterConfig {
        blend_mode: BlendMode::Alpha,
        ..point_config(3)
    }))
    .unwrap();

    let mut recorder = DrawRecorder::new();
    host.draw(&mut recorder, &RenderStates::default());

    let blends: Vec<BlendMode> = recorder
        .commands()
        .iter()
        .map(|command| command.states.blend_mode)
        .collect();
    assert_eq!(
        blends,
        vec![BlendMode::Additive, BlendMode::Alpha, BlendMode::Multiply]
    );
}

#[test]
fn trigger_on_non_looping_emitter_spawns_immediately() {
    let mut host = ParticleHost::new();
    let id = host
        .add_emitter(Emitter::new(EmitterConfig {
            looping: false,
            particles_per_spawn: 4,
            ..point_config(0)
        }))
        .unwrap();

    host.trigger(id).unwrap();
    // No update tick needed; the batch is already live.
    assert_eq!(host.emitter(id).unwrap().live_count(), 4);
    assert!(!host.triggered(id).unwrap());
}

#[test]
fn steady_state_population_and_single_buffer() {
    let mut host = ParticleHost::new();
    let id = host.add_emitter(Emitter::new(point_config(0))).unwrap();
    host.trigger(id).unwrap();

    // spawn_rate 0.125 at dt 0.125: one 5-particle batch per tick. A ttl of
    // 1.0 spans exactly 8 ticks (the expiry check is strict), so the
    // population climbs to 5 * floor(ttl / spawn_rate) = 40 and stays there.
    for frame in 1..=30 {
        host.update(0.125);
        let live = host.emitter(id).unwrap().live_count();
        if frame < 9 {
            assert_eq!(live, 5 * frame);
        } else {
            assert_eq!(live, 40, "population drifted at frame {frame}");
        }
        assert_eq!(host.buffer_count(), 1);
        assert_eq!(host.buffers_at_depth(0), 1);
    }
}

#[test]
fn removal_shelves_live_particles() {
    let mut host = ParticleHost::new();
    let id = host.add_emitter(Emitter::new(point_config(0))).unwrap();
    host.trigger(id).unwrap();
    host.update(0.125);
    assert_eq!(host.total_live(), 5);

    host.remove(id).unwrap();
    assert_eq!(host.total_live(), 0);
    assert_eq!(host.cache().cached(ParticleTag::Point), 5);
}

#[test]
fn unknown_ids_are_errors() {
    let mut host = ParticleHost::new();
    let id = host.add_emitter(Emitter::new(point_config(0))).unwrap();
    host.remove(id).unwrap();

    assert!(matches!(
        host.remove(id),
        Err(EmberError::EmitterNotFound(_))
    ));
    assert!(matches!(
        host.trigger(id),
        Err(EmberError::EmitterNotFound(_))
    ));
}

#[test]
fn composition_children_register_individually() {
    let mut composition = EmitterComposition::new();
    composition.add(Emitter::new(point_config(0)), Vec2::ZERO);
    composition.add(Emitter::new(point_config(0)), Vec2::new(10.0, 0.0));
    composition.add(Emitter::new(point_config(1)), Vec2::new(0.0, 10.0));

    let mut host = ParticleHost::new();
    let id = host.add_composition(composition).unwrap();

    // Three children, two share a (depth 0) buffer, one sits at depth 1.
    assert_eq!(host.emitter_count(), 3);
    assert_eq!(host.buffer_count(), 2);
    assert_eq!(host.buffers_at_depth(0), 1);
    assert_eq!(host.buffers_at_depth(1), 1);
    assert_eq!(host.composition_children(id).unwrap().len(), 3);
}

#[test]
fn composition_position_propagates_through_host() {
    let offsets = [Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, -4.0)];
    let mut composition = EmitterComposition::new();
    for offset in offsets {
        composition.add(Emitter::new(point_config(0)), offset);
    }

    let mut host = ParticleHost::new();
    let id = host.add_composition(composition).unwrap();
    host.set_composition_position(id, Vec2::new(50.0, 20.0))
        .unwrap();

    let children = host.composition_children(id).unwrap();
    for (child, offset) in children.iter().zip(offsets) {
        assert_eq!(
            host.emitter(*child).unwrap().position(),
            Vec2::new(50.0, 20.0) + offset
        );
    }
}

#[test]
fn composition_trigger_is_aggregate() {
    let mut composition = EmitterComposition::new();
    composition.add(Emitter::new(point_config(0)), Vec2::ZERO);
    composition.add(Emitter::new(point_config(0)), Vec2::ZERO);

    let mut host = ParticleHost::new();
    let id = host.add_composition(composition).unwrap();
    let children = host.composition_children(id).unwrap();

    assert!(!host.composition_triggered(id).unwrap());
    host.set_triggered(children[0], true).unwrap();
    assert!(!host.composition_triggered(id).unwrap());

    host.trigger_composition(id).unwrap();
    assert!(host.composition_triggered(id).unwrap());

    host.set_composition_triggered(id, false).unwrap();
    assert!(!host.composition_triggered(id).unwrap());
}

#[test]
fn composition_membership_is_checked() {
    let mut composition = EmitterComposition::new();
    composition.add(Emitter::new(point_config(0)), Vec2::ZERO);

    let mut host = ParticleHost::new();
    let id = host.add_composition(composition).unwrap();
    let outsider = host.add_emitter(Emitter::new(point_config(0))).unwrap();

    assert!(matches!(
        host.composition_remove(id, outsider),
        Err(EmberError::NotACompositionMember { .. })
    ));

    // A real member detaches cleanly.
    let member = host.composition_children(id).unwrap()[0];
    host.composition_remove(id, member).unwrap();
    assert!(host.composition_children(id).unwrap().is_empty());
    assert_eq!(host.emitter_count(), 1);
}

#[test]
fn composition_add_to_registered_composition() {
    let mut host = ParticleHost::new();
    let id = host
        .add_composition(EmitterComposition::new())
        .unwrap();
    host.set_composition_position(id, Vec2::new(7.0, 0.0)).unwrap();

    let child = host
        .composition_add(id, Emitter::new(point_config(0)), Vec2::new(0.0, 3.0))
        .unwrap();

    assert_eq!(host.emitter(child).unwrap().position(), Vec2::new(7.0, 3.0));
    assert_eq!(host.buffer_count(), 1);

    host.remove_composition(id).unwrap();
    assert_eq!(host.emitter_count(), 0);
    assert_eq!(host.buffer_count(), 0);
}

#[test]
fn removing_child_directly_updates_composition() {
    let mut composition = EmitterComposition::new();
    composition.add(Emitter::new(point_config(0)), Vec2::ZERO);
    composition.add(Emitter::new(point_config(0)), Vec2::ZERO);

    let mut host = ParticleHost::new();
    let id = host.add_composition(composition).unwrap();
    let children = host.composition_children(id).unwrap();

    // The host is oblivious to membership for update purposes, but direct
    // removal still has to keep the composition's child list honest.
    host.remove(children[0]).unwrap();
    assert_eq!(host.composition_children(id).unwrap(), vec![children[1]]);
}

#[test]
fn host_as_scene_node_draws_and_updates() {
    let mut host = ParticleHost::new();
    let id = host.add_emitter(Emitter::new(point_config(0))).unwrap();
    host.trigger(id).unwrap();

    let node: &mut dyn SceneNode = &mut host;
    node.update(0.125);

    // Transform accessors are deliberately inert on the host.
    node.set_position(Vec2::new(999.0, 999.0));
    assert_eq!(node.position(), Vec2::ZERO);

    let mut recorder = DrawRecorder::new();
    node.draw(&mut recorder, &RenderStates::default());
    assert_eq!(recorder.commands().len(), 1);
    assert_eq!(recorder.commands()[0].topology, PrimitiveTopology::Points);
    assert!(!recorder.commands()[0].vertices.is_empty());
}

#[test]
fn quad_emitters_batch_by_texture() {
    use ember_render::{TextureId, TextureRect};

    let quad_config = |texture: u32| EmitterConfig {
        kind: ember_particles::ParticleKind::Quad {
            texture: TextureId::from_raw(texture),
            rect: TextureRect::new(0.0, 0.0, 16.0, 16.0),
            origin: Vec2::new(8.0, 8.0),
            scale: Vec2::ONE,
            scale_velocity: Vec2::ZERO,
            rotation_rate_min: 0.0,
            rotation_rate_max: 0.0,
        },
        ..point_config(0)
    };

    let mut host = ParticleHost::new();
    host.add_emitter(Emitter::new(quad_config(1))).unwrap();
    host.add_emitter(Emitter::new(quad_config(1))).unwrap();
    host.add_emitter(Emitter::new(quad_config(2))).unwrap();

    // Same texture shares; a different texture splits the bucket.
    assert_eq!(host.buffer_count(), 2);
    assert_eq!(host.buffers_at_depth(0), 2);
}

#[test]
fn spawn_info_defaults_are_inert() {
    // A default bundle describes a stationary, opaque, one-second particle.
    let info = SpawnInfo::default();
    assert_eq!(info.velocity, Vec2::ZERO);
    assert_eq!(info.ttl, 1.0);
    assert!(!info.alpha_expires);
}
