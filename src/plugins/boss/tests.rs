use avian2d::prelude::*;
use bevy::prelude::*;

use super::phase::{BossPhase, PhaseCue, Step, attack_interval_ms, teleport_cooldown_ms};
use super::*;
use crate::common::test_utils::{combat_world, drain, run_system_once, set_now};
use crate::common::tunables::{PhaseTuning, TransitionTuning};

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn transition() -> TransitionTuning {
    Tunables::default().boss.transition
}

fn phases() -> Vec<PhaseTuning> {
    Tunables::default().boss.phases
}

/// An awake boss (appearance finished at t = 1000) and the world clock at 1000.
fn world_with_boss(boss_at: Vec2, origin: Vec2) -> (World, Entity) {
    let mut world = combat_world(1000);
    let tunables = world.resource::<Tunables>().clone();
    let mut state = ActorState::new(100.0, 0.0, 2000);
    state.immune = false;
    let boss = world
        .spawn((
            EnemyKind::Boss,
            Team::Hostile,
            state,
            BossPhase::default(),
            BossBrain::new(origin, 0, &tunables.boss),
            Timeline::default(),
            Hurtbox::from_size(30.0, 40.0),
            Transform::from_translation(boss_at.extend(1.0)),
            LinearVelocity::ZERO,
            Opacity(1.0),
        ))
        .id();
    (world, boss)
}

fn place_player(world: &mut World, pos: Vec2) -> Entity {
    world
        .spawn((
            Player,
            Team::Player,
            ActorState::new(100.0, 100.0, 0),
            Hurtbox::from_size(23.0, 33.0),
            Transform::from_translation(pos.extend(1.0)),
            LinearVelocity::ZERO,
        ))
        .id()
}

fn run_ai_at(world: &mut World, now: u64) {
    set_now(world, now);
    run_system_once(world, super::boss_ai);
}

// -----------------------------------------------------------------------------
// Phase machine
// -----------------------------------------------------------------------------

#[test]
fn transition_script_runs_on_schedule() {
    let t = transition();
    let mut phase = BossPhase::default();
    assert!(phase.begin(2, 0, &t));

    assert!(phase.advance(499, &t).is_empty());
    assert_eq!(phase.transition().unwrap().step, Step::FadeOut);
    assert!(phase.advance(1999, &t).is_empty());
    assert_eq!(phase.advance(2000, &t), vec![PhaseCue::FireBurst(0)]);
    assert_eq!(phase.advance(3600, &t), vec![PhaseCue::FireBurst(1)]);
    assert_eq!(phase.advance(5200, &t), vec![PhaseCue::FireBurst(2)]);
    assert!(phase.advance(6699, &t).is_empty());
    assert_eq!(phase.advance(6700, &t), vec![PhaseCue::FadeIn]);
    assert!(phase.advance(7199, &t).is_empty());
    assert_eq!(phase.advance(7200, &t), vec![PhaseCue::Complete(2)]);
    assert_eq!(phase.phase(), 2);
    assert!(!phase.is_transitioning());
}

#[test]
fn late_advance_catches_up_in_order() {
    let t = transition();
    let mut phase = BossPhase::default();
    phase.begin(2, 0, &t);
    assert_eq!(
        phase.advance(60_000, &t),
        vec![
            PhaseCue::FireBurst(0),
            PhaseCue::FireBurst(1),
            PhaseCue::FireBurst(2),
            PhaseCue::FadeIn,
            PhaseCue::Complete(2),
        ]
    );
}

#[test]
fn transition_cannot_be_reentered() {
    let t = transition();
    let mut phase = BossPhase::default();
    assert_eq!(phase.due(0.66, &phases()), Some(2));
    assert_eq!(phase.due(0.67, &phases()), None);

    phase.begin(2, 0, &t);
    assert_eq!(phase.due(0.1, &phases()), None);
    assert!(!phase.begin(3, 100, &t));
    assert_eq!(phase.transition().unwrap().target, 2);
}

#[test]
fn thresholds_are_consumed_one_at_a_time() {
    let t = transition();
    let mut phase = BossPhase::default();
    assert_eq!(phase.due(0.1, &phases()), Some(2));
    phase.begin(2, 0, &t);
    phase.advance(10_000, &t);

    assert_eq!(phase.due(0.1, &phases()), Some(3));
    phase.begin(3, 10_000, &t);
    phase.advance(20_000, &t);
    assert_eq!(phase.phase(), 3);
    assert_eq!(phase.due(0.0, &phases()), None);
}

#[test]
fn alpha_fades_out_holds_and_fades_in() {
    let t = transition();
    let mut phase = BossPhase::default();
    assert_eq!(phase.alpha(0, &t), 1.0);
    phase.begin(2, 0, &t);

    assert!((phase.alpha(250, &t) - 0.7).abs() < 1e-5);
    phase.advance(3000, &t);
    assert!((phase.alpha(3000, &t) - 0.4).abs() < 1e-5);
    phase.advance(6700, &t);
    assert!((phase.alpha(6950, &t) - 0.7).abs() < 1e-5);
}

#[test]
fn phase_bonuses_scale_intervals() {
    let t = Tunables::default();
    assert_eq!(attack_interval_ms(2000, 1, &t.boss.phases), 2000);
    assert_eq!(attack_interval_ms(2000, 2, &t.boss.phases), 1700);
    assert_eq!(attack_interval_ms(2000, 3, &t.boss.phases), 1400);
    assert_eq!(teleport_cooldown_ms(&t.boss, 1), 2000);
    assert_eq!(teleport_cooldown_ms(&t.boss, 2), 1500);
    assert_eq!(teleport_cooldown_ms(&t.boss, 3), 1000);

    let mut aggressive = t.boss.clone();
    aggressive.phases[1].cooldown_reduction = 0.9;
    assert_eq!(teleport_cooldown_ms(&aggressive, 3), aggressive.min_teleport_cooldown_ms);
}

// -----------------------------------------------------------------------------
// Teleport rule
// -----------------------------------------------------------------------------

#[test]
fn teleport_rule_needs_cooldown_and_a_reason() {
    let t = Tunables::default().boss;
    let brain = BossBrain::new(Vec2::ZERO, 0, &t);
    // Awake at 1000; last landed counts from then.
    assert!(!brain.should_teleport(999, f32::INFINITY, &t));
    assert!(brain.should_teleport(1000, 151.0, &t));
    assert!(brain.should_teleport(1000, f32::INFINITY, &t));
    assert!(!brain.should_teleport(1000, 150.0, &t));
    assert!(!brain.should_teleport(9000, 40.0, &t));
    assert!(brain.should_teleport(9001, 40.0, &t));
}

#[test]
fn teleport_lands_beside_the_player() {
    let t = Tunables::default().boss;
    let mut rng = CombatRng::seeded(3);
    let player = Vec2::new(500.0, 80.0);
    for _ in 0..100 {
        let dest = teleport_target(player, &mut rng, &t);
        let dx = (dest.x - player.x).abs();
        assert!((60.0..=100.0).contains(&dx));
        assert!((dest.y - player.y).abs() <= 20.0);
    }
}

// -----------------------------------------------------------------------------
// Systems
// -----------------------------------------------------------------------------

#[test]
fn crossing_a_threshold_runs_the_whole_transition() {
    let origin = Vec2::new(300.0, 100.0);
    let (mut world, boss) = world_with_boss(Vec2::new(520.0, 100.0), origin);
    let player = place_player(&mut world, Vec2::new(540.0, 100.0));

    world.get_mut::<ActorState>(boss).unwrap().remove_hp(34.0);
    run_system_once(&mut world, super::enter_transitions);

    assert!(world.get::<BossPhase>(boss).unwrap().is_transitioning());
    assert!(world.get::<ActorState>(boss).unwrap().immune);
    assert_eq!(world.get::<Transform>(boss).unwrap().translation.truncate(), origin);

    // Damage during the script is silently dropped.
    world.write_message(AttackEvent {
        source: player,
        team: Team::Player,
        kind: AttackKind::PlayerBase,
        source_x: origin.x - 10.0,
        bounds: crate::common::bounds::Aabb::new(origin, Vec2::splat(80.0)),
        damage: 10.0,
        lifesteal: 0.0,
    });
    run_system_once(&mut world, resolve_attacks);
    assert_eq!(world.get::<ActorState>(boss).unwrap().hp(), 66.0);

    // Player dies mid-script; the script still finishes.
    world.get_mut::<ActorState>(player).unwrap().die();

    let mut bursts = 0;
    for now in (1000..=8200).step_by(100) {
        run_ai_at(&mut world, now);
        bursts += drain::<WaveBurstRequest>(&mut world).len();
        assert_eq!(world.get::<LinearVelocity>(boss).unwrap().0, Vec2::ZERO);
    }
    assert_eq!(bursts, 3);

    let changed = drain::<BossPhaseChanged>(&mut world);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].phase, 2);
    let state = world.get::<ActorState>(boss).unwrap();
    assert!(!state.immune);
    assert_eq!(state.attack_interval_ms, 1700);
    assert!(!world.get::<BossPhase>(boss).unwrap().is_transitioning());
}

#[test]
fn far_player_gets_teleported_to_then_attacked() {
    let (mut world, boss) = world_with_boss(Vec2::new(0.0, 100.0), Vec2::new(0.0, 100.0));
    let player = place_player(&mut world, Vec2::new(400.0, 100.0));

    run_ai_at(&mut world, 1000);
    assert_eq!(world.get::<BossBrain>(boss).unwrap().teleport, Teleport::Vanishing { until: 1500 });

    run_ai_at(&mut world, 1500);
    let x = world.get::<Transform>(boss).unwrap().translation.x;
    assert!((60.0..=100.0).contains(&(x - 400.0).abs()));

    // Arrival forces an attack even though one could be on cooldown.
    world.get_mut::<ActorState>(boss).unwrap().last_attack_at = Some(1900);
    run_ai_at(&mut world, 2000);
    assert!(world.get::<ActorState>(boss).unwrap().is_attacking());
    assert_eq!(drain::<ActorAttacked>(&mut world).len(), 1);
    let brain = world.get::<BossBrain>(boss).unwrap();
    assert_eq!(brain.teleport_ready_at, 4000);
    assert_eq!(brain.last_landed_at, 2000);

    // Player runs off again: the boss pursues until the cooldown allows another jump.
    world.get_mut::<Transform>(player).unwrap().translation.x = 1400.0;
    let act = world.get::<ActorState>(boss).unwrap().activation();
    world.get_mut::<ActorState>(boss).unwrap().end_attack(act);
    run_ai_at(&mut world, 3000);
    assert_eq!(world.get::<BossBrain>(boss).unwrap().teleport, Teleport::Ready);
    assert!(world.get::<LinearVelocity>(boss).unwrap().x > 0.0);

    run_ai_at(&mut world, 4000);
    assert!(matches!(world.get::<BossBrain>(boss).unwrap().teleport, Teleport::Vanishing { .. }));
}

#[test]
fn boss_halts_without_a_living_player() {
    let (mut world, boss) = world_with_boss(Vec2::ZERO, Vec2::ZERO);
    let player = place_player(&mut world, Vec2::new(100.0, 0.0));
    world.get_mut::<ActorState>(player).unwrap().die();
    world.get_mut::<LinearVelocity>(boss).unwrap().0 = Vec2::new(10.0, 10.0);

    run_ai_at(&mut world, 1000);
    assert_eq!(world.get::<LinearVelocity>(boss).unwrap().0, Vec2::ZERO);
    assert_eq!(world.get::<BossBrain>(boss).unwrap().teleport, Teleport::Ready);
}

#[test]
fn pursuit_is_slower_vertically() {
    let (mut world, boss) = world_with_boss(Vec2::ZERO, Vec2::ZERO);
    place_player(&mut world, Vec2::new(60.0, 80.0));

    run_ai_at(&mut world, 1000);
    let v = world.get::<LinearVelocity>(boss).unwrap().0;
    assert!((v.x - 0.6 * 50.0).abs() < 1e-4);
    assert!((v.y - 0.8 * 50.0 * 0.5).abs() < 1e-4);
}

#[test]
fn asleep_boss_is_immune_and_still() {
    let (mut world, boss) = world_with_boss(Vec2::ZERO, Vec2::ZERO);
    world.get_mut::<BossBrain>(boss).unwrap().awake_at = 5000;
    place_player(&mut world, Vec2::new(20.0, 0.0));

    run_ai_at(&mut world, 1000);
    let state = world.get::<ActorState>(boss).unwrap();
    assert!(state.immune && !state.is_attacking());
}

#[test]
fn landed_attack_requires_player_in_range_at_resolution() {
    let (mut world, boss) = world_with_boss(Vec2::ZERO, Vec2::ZERO);
    let player = place_player(&mut world, Vec2::new(40.0, 0.0));
    let boss_hit = AttackEvent {
        source: boss,
        team: Team::Hostile,
        kind: AttackKind::Boss,
        source_x: 0.0,
        bounds: crate::common::bounds::Aabb::new(Vec2::ZERO, Vec2::new(100.0, 60.0)),
        damage: 20.0,
        lifesteal: 0.0,
    };

    set_now(&mut world, 5000);
    world.write_message(boss_hit);
    run_system_once(&mut world, super::track_landed_attacks);
    assert_eq!(world.get::<BossBrain>(boss).unwrap().last_landed_at, 5000);

    world.get_mut::<Transform>(player).unwrap().translation.x = 200.0;
    set_now(&mut world, 6000);
    world.write_message(boss_hit);
    run_system_once(&mut world, super::track_landed_attacks);
    assert_eq!(world.get::<BossBrain>(boss).unwrap().last_landed_at, 5000);
}

#[test]
fn trigger_spawns_a_single_boss() {
    let mut world = combat_world(0);
    world.insert_resource(LevelLayout::default());
    world.write_message(BossTriggered);
    world.write_message(BossTriggered);
    run_system_once(&mut world, super::on_boss_triggered);
    assert_eq!(world.query::<&BossBrain>().iter(&world).count(), 1);

    world.write_message(BossTriggered);
    run_system_once(&mut world, super::on_boss_triggered);
    assert_eq!(world.query::<&BossBrain>().iter(&world).count(), 1);
}

#[test]
fn defeated_boss_does_not_return() {
    let mut world = combat_world(0);
    world.insert_resource(LevelLayout::default());
    world.write_message(BossDefeated { boss: Entity::PLACEHOLDER });
    run_system_once(&mut world, super::on_boss_defeated);
    assert!(world.resource::<SessionState>().boss_defeated);

    world.write_message(BossTriggered);
    run_system_once(&mut world, super::on_boss_triggered);
    assert_eq!(world.query::<&BossBrain>().iter(&world).count(), 0);
}

#[test]
fn opacity_follows_the_appearance() {
    let (mut world, boss) = world_with_boss(Vec2::ZERO, Vec2::ZERO);
    set_now(&mut world, 500);
    run_system_once(&mut world, super::boss_opacity);
    assert!((world.get::<Opacity>(boss).unwrap().0 - 0.5).abs() < 1e-5);

    set_now(&mut world, 1000);
    run_system_once(&mut world, super::boss_opacity);
    assert_eq!(world.get::<Opacity>(boss).unwrap().0, 1.0);
}
