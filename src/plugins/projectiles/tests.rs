//! Wave pipeline tests.
//!
//! No physics step runs here: waves are placed by the allocator and contacts are
//! decided by box overlap, so every test drives the systems directly.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::allocator::{allocate_waves_from_pool, ring_velocities};
use super::collision::process_wave_contacts;
use super::commit::{expire_waves, recall_waves, return_to_pool_commit};
use super::components::{PooledWave, Wave, WaveState};
use super::pool::{WavePool, init_wave_pool};
use crate::common::bounds::Hurtbox;
use crate::common::test_utils::{combat_world, drain, run_system_once, set_now};
use crate::common::tunables::Tunables;
use crate::plugins::combat::Team;
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::messages::{ActorDied, ActorHit, Victim, WaveBurstRequest};
use crate::plugins::combat::timeline::Timeline;
use crate::plugins::player::Player;

// ----- Helpers -----

fn pooled_world(capacity: usize) -> World {
    let mut world = combat_world(1000);
    world.insert_resource(WavePool::new(capacity));
    run_system_once(&mut world, init_wave_pool);
    world
}

fn spawn_player(world: &mut World, pos: Vec2) -> Entity {
    world
        .spawn((
            Player,
            Team::Player,
            ActorState::new(100.0, 100.0, 0),
            Hurtbox::from_size(23.0, 33.0),
            Transform::from_translation(pos.extend(1.0)),
            LinearVelocity::ZERO,
            Timeline::default(),
        ))
        .id()
}

fn fire(world: &mut World, source: Entity, origin: Vec2, burst: u32) {
    world.write_message(WaveBurstRequest { source, origin, burst });
    run_system_once(world, allocate_waves_from_pool);
}

fn states(world: &mut World) -> Vec<WaveState> {
    world
        .query_filtered::<&WaveState, With<PooledWave>>()
        .iter(world)
        .copied()
        .collect()
}

fn count(world: &mut World, wanted: WaveState) -> usize {
    states(world).into_iter().filter(|s| *s == wanted).count()
}

// ----- Ring -----

#[test]
fn ring_spreads_waves_evenly() {
    let t = Tunables::default().boss.transition;
    let v: Vec<Vec2> = ring_velocities(0, &t).collect();

    assert_eq!(v.len(), 4);
    assert!((v[0] - Vec2::new(50.0, 0.0)).length() < 1e-3);
    assert!((v[1] - Vec2::new(0.0, 50.0)).length() < 1e-3);
    assert!((v[2] - Vec2::new(-50.0, 0.0)).length() < 1e-3);
    for w in &v {
        assert!((w.length() - 50.0).abs() < 1e-3);
    }
}

#[test]
fn later_bursts_rotate_the_ring() {
    let t = Tunables::default().boss.transition;
    let first = ring_velocities(1, &t).next().unwrap();
    let expected = std::f32::consts::FRAC_PI_4 / 3.0;
    assert!((first.to_angle() - expected).abs() < 1e-4);
}

// ----- Allocation -----

#[test]
fn pool_prespawns_hidden_waves() {
    let mut world = pooled_world(8);
    assert_eq!(world.resource::<WavePool>().free_len(), 8);
    assert_eq!(count(&mut world, WaveState::Inactive), 8);
}

#[test]
fn burst_activates_one_ring_from_the_pool() {
    let mut world = pooled_world(8);
    let boss = world.spawn_empty().id();
    fire(&mut world, boss, Vec2::new(200.0, 80.0), 0);

    assert_eq!(world.resource::<WavePool>().free_len(), 4);
    let mut q = world.query::<(&WaveState, &Wave, &Transform, &Visibility)>();
    let active: Vec<_> = q.iter(&world).filter(|(s, ..)| **s == WaveState::Active).collect();
    assert_eq!(active.len(), 4);
    for (_, wave, tf, vis) in active {
        assert_eq!(wave.damage, 15.0);
        assert_eq!(wave.expires_at, 5000);
        assert_eq!(wave.source, Some(boss));
        assert_eq!(tf.translation.truncate(), Vec2::new(200.0, 80.0));
        assert_eq!(*vis, Visibility::Visible);
    }
}

#[test]
fn empty_pool_truncates_the_burst() {
    let mut world = pooled_world(3);
    let boss = world.spawn_empty().id();
    fire(&mut world, boss, Vec2::ZERO, 0);

    assert_eq!(world.resource::<WavePool>().free_len(), 0);
    assert_eq!(count(&mut world, WaveState::Active), 3);

    fire(&mut world, boss, Vec2::ZERO, 1);
    assert_eq!(count(&mut world, WaveState::Active), 3);
}

// ----- Contact -----

#[test]
fn first_contact_damages_and_consumes_the_wave() {
    let mut world = pooled_world(4);
    let boss = world.spawn_empty().id();
    let player = spawn_player(&mut world, Vec2::new(100.0, 50.0));
    fire(&mut world, boss, Vec2::new(100.0, 50.0), 0);

    run_system_once(&mut world, process_wave_contacts);

    assert_eq!(world.get::<ActorState>(player).unwrap().hp(), 85.0);
    assert_eq!(world.get::<LinearVelocity>(player).unwrap().x, 30.0);
    let hits = drain::<ActorHit>(&mut world);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, boss);
    assert_eq!(hits[0].damage, 15.0);

    // The other three overlapped during invincibility: consumed, no damage.
    assert_eq!(count(&mut world, WaveState::PendingReturn), 4);
    let mut q = world.query::<&Wave>();
    assert!(q.iter(&world).all(|w| w.already_hit));

    run_system_once(&mut world, process_wave_contacts);
    assert!(drain::<ActorHit>(&mut world).is_empty());
    assert_eq!(world.get::<ActorState>(player).unwrap().hp(), 85.0);
}

#[test]
fn distant_waves_stay_active() {
    let mut world = pooled_world(4);
    let boss = world.spawn_empty().id();
    spawn_player(&mut world, Vec2::new(100.0, 50.0));
    fire(&mut world, boss, Vec2::new(300.0, 50.0), 0);

    run_system_once(&mut world, process_wave_contacts);
    assert_eq!(count(&mut world, WaveState::Active), 4);
    assert!(drain::<ActorHit>(&mut world).is_empty());
}

#[test]
fn lethal_wave_reports_player_death() {
    let mut world = pooled_world(4);
    let boss = world.spawn_empty().id();
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().remove_hp(90.0);
    fire(&mut world, boss, Vec2::ZERO, 0);

    run_system_once(&mut world, process_wave_contacts);

    assert!(world.get::<ActorState>(player).unwrap().is_dead());
    let died = drain::<ActorDied>(&mut world);
    assert_eq!(died.len(), 1);
    assert_eq!(died[0].victim, Victim::Player);
    assert!(drain::<ActorHit>(&mut world)[0].lethal);
}

#[test]
fn dead_player_does_not_consume_waves() {
    let mut world = pooled_world(4);
    let boss = world.spawn_empty().id();
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().die();
    fire(&mut world, boss, Vec2::ZERO, 0);

    run_system_once(&mut world, process_wave_contacts);
    assert_eq!(count(&mut world, WaveState::Active), 4);
}

#[test]
fn no_player_is_a_no_op() {
    let mut world = pooled_world(4);
    let boss = world.spawn_empty().id();
    fire(&mut world, boss, Vec2::ZERO, 0);
    run_system_once(&mut world, process_wave_contacts);
    assert_eq!(count(&mut world, WaveState::Active), 4);
}

// ----- Return -----

#[test]
fn expired_waves_return_to_the_pool() {
    let mut world = pooled_world(4);
    let boss = world.spawn_empty().id();
    fire(&mut world, boss, Vec2::ZERO, 0);

    set_now(&mut world, 4999);
    run_system_once(&mut world, expire_waves);
    assert_eq!(count(&mut world, WaveState::Active), 4);

    set_now(&mut world, 5000);
    run_system_once(&mut world, expire_waves);
    run_system_once(&mut world, return_to_pool_commit);

    assert_eq!(count(&mut world, WaveState::Inactive), 4);
    assert_eq!(world.resource::<WavePool>().free_len(), 4);
    let mut q = world.query::<(&Visibility, &LinearVelocity)>();
    for (vis, vel) in q.iter(&world) {
        assert_eq!(*vis, Visibility::Hidden);
        assert_eq!(vel.0, Vec2::ZERO);
    }
}

#[test]
fn recall_parks_every_live_wave() {
    let mut world = pooled_world(8);
    let boss = world.spawn_empty().id();
    fire(&mut world, boss, Vec2::ZERO, 0);

    run_system_once(&mut world, recall_waves);
    run_system_once(&mut world, return_to_pool_commit);
    assert_eq!(count(&mut world, WaveState::Inactive), 8);
    assert_eq!(world.resource::<WavePool>().free_len(), 8);
}
