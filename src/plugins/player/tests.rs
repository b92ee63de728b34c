use avian2d::prelude::*;
use bevy::prelude::*;

use super::*;
use crate::common::test_utils::{combat_world, drain, run_system_once, set_now};
use crate::plugins::combat::messages::AttackEvent;
use crate::plugins::combat::run_timelines;
use crate::plugins::session::{ModifierKind, Modifiers};

fn world_with_input(now: u64) -> World {
    let mut world = combat_world(now);
    world.init_resource::<PlayerInput>();
    world
}

fn spawn_player(world: &mut World, pos: Vec2) -> Entity {
    let tuning = world.resource::<Tunables>().player.clone();
    world
        .spawn((
            Player,
            Team::Player,
            ActorState::new(tuning.max_hp, tuning.max_sp, 0),
            PlayerMotion::new(0, &tuning),
            DerivedStats::compute(&tuning, &Modifiers::default()),
            Timeline::default(),
            Hurtbox::from_size(tuning.hurtbox.x, tuning.hurtbox.y),
            Transform::from_translation(pos.extend(1.0)),
            LinearVelocity::ZERO,
        ))
        .id()
}

fn left_wall_map() -> SolidMap {
    SolidMap::from_rows(&["#...", "#...", "#...", "#...", "...."])
}

#[test]
fn spawn_creates_player() {
    let mut world = combat_world(0);
    run_system_once(&mut world, super::spawn);
    let (state, _) = world
        .query::<(&ActorState, &Player)>()
        .single(&world)
        .expect("one player");
    assert_eq!(state.hp(), 100.0);
}

#[test]
fn base_attack_lays_out_its_timeline() {
    let t = Tunables::default();
    let spec = t.attack(AttackKind::PlayerBase).unwrap();
    let mut state = ActorState::new(100.0, 100.0, 0);
    let mut tl = Timeline::default();

    assert!(begin_base_attack(&mut state, &mut tl, spec, &t.player, 0));
    assert_eq!(tl.len(), 4);
    assert_eq!(state.sp(), 93.0);
    assert!(!begin_base_attack(&mut state, &mut tl, spec, &t.player, 10));

    let due = tl.take_due(240);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].action, TimedAction::Hitbox(AttackKind::PlayerBase));
    assert_eq!(tl.take_due(320)[0].action, TimedAction::ComboWindow { open: true });
}

#[test]
fn attack_press_is_consumed_once() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.resource_mut::<PlayerInput>().attack = true;

    run_system_once(&mut world, super::control);
    assert!(world.get::<ActorState>(player).unwrap().is_attacking());
    assert!(!world.resource::<PlayerInput>().attack);
    let attacked = drain::<ActorAttacked>(&mut world);
    assert_eq!(attacked.len(), 1);
    assert_eq!(attacked[0].kind, AttackKind::PlayerBase);
}

#[test]
fn full_combo_chain_through_the_timeline() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.resource_mut::<PlayerInput>().attack = true;
    run_system_once(&mut world, super::control);

    set_now(&mut world, 320);
    run_system_once(&mut world, run_timelines);
    assert_eq!(drain::<AttackEvent>(&mut world).len(), 1);
    assert!(world.get_mut::<ActorState>(player).unwrap().queue_combo(15.0));

    set_now(&mut world, 480);
    drain::<ActorAttacked>(&mut world);
    run_system_once(&mut world, run_timelines);
    let combo = drain::<AttackEvent>(&mut world);
    assert_eq!(combo.len(), 1);
    assert_eq!(combo[0].kind, AttackKind::PlayerCombo);
    assert_eq!(combo[0].damage, 15.0);
    assert_eq!(drain::<ActorAttacked>(&mut world)[0].kind, AttackKind::PlayerCombo);
    assert_eq!(world.get::<ActorState>(player).unwrap().sp(), 100.0 - 7.0 - 15.0);

    set_now(&mut world, 980);
    run_system_once(&mut world, run_timelines);
    assert!(!world.get::<ActorState>(player).unwrap().is_attacking());
}

#[test]
fn stunned_player_ignores_input_and_slows() {
    let mut world = world_with_input(100);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().stun(100, 500);
    world.get_mut::<LinearVelocity>(player).unwrap().x = 100.0;
    {
        let mut input = world.resource_mut::<PlayerInput>();
        input.move_x = -1.0;
        input.attack = true;
    }

    run_system_once(&mut world, super::control);
    let state = world.get::<ActorState>(player).unwrap();
    assert!(!state.is_attacking());
    assert_eq!(world.get::<LinearVelocity>(player).unwrap().x, 90.0);
}

#[test]
fn running_drains_stamina() {
    let mut world = world_with_input(1000);
    let player = spawn_player(&mut world, Vec2::ZERO);
    {
        let mut input = world.resource_mut::<PlayerInput>();
        input.move_x = 1.0;
        input.run = true;
    }

    run_system_once(&mut world, super::control);
    assert_eq!(world.get::<LinearVelocity>(player).unwrap().x, 200.0);
    assert_eq!(world.get::<ActorState>(player).unwrap().sp(), 90.0);
    assert!(world.get::<PlayerMotion>(player).unwrap().running);
}

#[test]
fn defending_slows_and_drops_at_zero_stamina() {
    let mut world = world_with_input(1000);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().spend_sp(95.0);
    {
        let mut input = world.resource_mut::<PlayerInput>();
        input.move_x = 1.0;
        input.defend = true;
    }

    run_system_once(&mut world, super::control);
    let state = world.get::<ActorState>(player).unwrap();
    assert_eq!(state.sp(), 0.0);
    assert!(!state.is_defending());
}

#[test]
fn jump_needs_ground() {
    let mut world = world_with_input(0);
    world.insert_resource(SolidMap::from_rows(&["....", "####"]));
    let grounded = spawn_player(&mut world, Vec2::new(30.0, 24.0 + 16.5));
    world.resource_mut::<PlayerInput>().jump = true;

    run_system_once(&mut world, super::control);
    let v = world.get::<LinearVelocity>(grounded).unwrap();
    assert!((v.y - (2.0_f32 * 500.0 * 50.0).sqrt()).abs() < 1e-3);
    assert_eq!(world.get::<ActorState>(grounded).unwrap().sp(), 95.0);
}

#[test]
fn no_map_means_no_jump_and_no_wall() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::new(30.0, 40.5));
    world.resource_mut::<PlayerInput>().jump = true;

    run_system_once(&mut world, super::control);
    assert_eq!(world.get::<LinearVelocity>(player).unwrap().y, 0.0);
    assert_eq!(world.get::<PlayerMotion>(player).unwrap().wall, None);
}

#[test]
fn wall_slide_caps_fall_speed() {
    let mut world = world_with_input(0);
    world.insert_resource(left_wall_map());
    let player = spawn_player(&mut world, Vec2::new(36.5, 60.0));
    world.get_mut::<LinearVelocity>(player).unwrap().y = -200.0;

    run_system_once(&mut world, super::control);
    assert_eq!(world.get::<PlayerMotion>(player).unwrap().wall, Some(WallSide::Left));
    assert_eq!(world.get::<LinearVelocity>(player).unwrap().y, -50.0);
}

#[test]
fn wall_jump_pushes_away_from_the_wall() {
    let mut world = world_with_input(0);
    world.insert_resource(left_wall_map());
    let player = spawn_player(&mut world, Vec2::new(36.5, 60.0));
    world.get_mut::<LinearVelocity>(player).unwrap().y = -20.0;
    {
        let mut input = world.resource_mut::<PlayerInput>();
        input.move_x = -1.0;
        input.jump = true;
    }

    run_system_once(&mut world, super::control);
    let v = world.get::<LinearVelocity>(player).unwrap();
    assert_eq!(v.x, 200.0);
    assert!((v.y - 200.0).abs() < 1e-3);
    assert_eq!(world.get::<ActorState>(player).unwrap().sp(), 95.0);
}

#[test]
fn stamina_recovers_in_fixed_steps() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().spend_sp(50.0);

    world.get_mut::<PlayerMotion>(player).unwrap().dt_ms = 60;
    run_system_once(&mut world, super::recover);
    assert_eq!(world.get::<ActorState>(player).unwrap().sp(), 50.0);

    run_system_once(&mut world, super::recover);
    assert!((world.get::<ActorState>(player).unwrap().sp() - 51.0).abs() < 1e-4);
}

#[test]
fn long_tick_recovers_every_whole_step() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().spend_sp(50.0);

    world.get_mut::<PlayerMotion>(player).unwrap().dt_ms = 250;
    run_system_once(&mut world, super::recover);
    assert!((world.get::<ActorState>(player).unwrap().sp() - 52.0).abs() < 1e-4);

    // The leftover 50 ms carries into the next tick.
    world.get_mut::<PlayerMotion>(player).unwrap().dt_ms = 50;
    run_system_once(&mut world, super::recover);
    assert!((world.get::<ActorState>(player).unwrap().sp() - 53.0).abs() < 1e-4);
}

#[test]
fn running_discards_partial_recovery() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().spend_sp(50.0);

    world.get_mut::<PlayerMotion>(player).unwrap().dt_ms = 90;
    run_system_once(&mut world, super::recover);
    world.get_mut::<PlayerMotion>(player).unwrap().running = true;
    run_system_once(&mut world, super::recover);
    world.get_mut::<PlayerMotion>(player).unwrap().running = false;

    world.get_mut::<PlayerMotion>(player).unwrap().dt_ms = 20;
    run_system_once(&mut world, super::recover);
    assert_eq!(world.get::<ActorState>(player).unwrap().sp(), 50.0);
}

#[test]
fn idle_regen_waits_for_stillness() {
    let mut world = world_with_input(1000);
    let player = spawn_player(&mut world, Vec2::ZERO);
    let mut modifiers = Modifiers::default();
    modifiers.add(ModifierKind::IdleRegen, 2.0);
    let stats = DerivedStats::compute(&world.resource::<Tunables>().player, &modifiers);
    world.entity_mut(player).insert(stats);
    world.get_mut::<ActorState>(player).unwrap().remove_hp(50.0);
    world.get_mut::<PlayerMotion>(player).unwrap().dt_ms = 100;

    run_system_once(&mut world, super::recover);
    assert_eq!(world.get::<ActorState>(player).unwrap().hp(), 50.0);

    set_now(&mut world, 2000);
    run_system_once(&mut world, super::recover);
    assert!((world.get::<ActorState>(player).unwrap().hp() - 50.2).abs() < 1e-4);
}

#[test]
fn death_counts_and_schedules_respawn() {
    let mut world = world_with_input(500);
    let player = spawn_player(&mut world, Vec2::ZERO);
    world.get_mut::<ActorState>(player).unwrap().die();
    world.get_mut::<LinearVelocity>(player).unwrap().x = 30.0;
    world.write_message(ActorDied { actor: player, victim: Victim::Player, position: Vec2::ZERO });

    run_system_once(&mut world, super::on_death);
    assert_eq!(world.resource::<SessionState>().deaths, 1);
    assert_eq!(world.get::<LinearVelocity>(player).unwrap().0, Vec2::ZERO);

    set_now(&mut world, 2500);
    let due = world.get_mut::<Timeline>(player).unwrap().take_due(2500);
    assert_eq!(due[0].action, TimedAction::RequestRespawn);
}

#[test]
fn respawn_restores_the_save() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::ZERO);
    {
        let mut state = world.get_mut::<ActorState>(player).unwrap();
        state.remove_hp(60.0);
        state.spend_sp(70.0);
    }
    let snapshot_state = world.get::<ActorState>(player).unwrap().clone();
    {
        let mut session = world.resource_mut::<SessionState>();
        session.currency = 5;
        session.modifiers.add(ModifierKind::Lifesteal, 0.1);
        session.capture(Vec2::new(300.0, 100.0), &snapshot_state);
        session.currency = 12;
        session.modifiers.add(ModifierKind::Lifesteal, 0.1);
    }
    world.get_mut::<ActorState>(player).unwrap().die();
    world.write_message(RespawnRequested { actor: player });

    run_system_once(&mut world, super::on_respawn);
    let state = world.get::<ActorState>(player).unwrap();
    assert!(!state.is_dead());
    assert_eq!(state.hp(), 40.0);
    assert_eq!(state.sp(), 30.0);
    assert_eq!(world.get::<Transform>(player).unwrap().translation.truncate(), Vec2::new(300.0, 100.0));
    assert_eq!(world.resource::<SessionState>().currency, 5);
    assert!((world.get::<DerivedStats>(player).unwrap().lifesteal - 0.1).abs() < 1e-6);
}

#[test]
fn respawn_without_save_starts_fresh() {
    let mut world = world_with_input(0);
    let player = spawn_player(&mut world, Vec2::new(900.0, 0.0));
    world.get_mut::<ActorState>(player).unwrap().die();
    world.write_message(RespawnRequested { actor: player });

    run_system_once(&mut world, super::on_respawn);
    let state = world.get::<ActorState>(player).unwrap();
    assert_eq!(state.hp(), 100.0);
    assert_eq!(state.sp(), 100.0);
    let spawn = world.resource::<Tunables>().player.spawn_point;
    assert_eq!(world.get::<Transform>(player).unwrap().translation.truncate(), spawn);
}
