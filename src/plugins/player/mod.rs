//! Player plugin.
//!
//! Pipeline:
//! - Update: sample keyboard into the `PlayerInput` resource (presses are latched until
//!   the next fixed step consumes them)
//! - FixedUpdate / Decide: stun, attack, defend, walk/run, jump, wall slide
//! - FixedUpdate / Aftermath: stamina recovery, idle regeneration, death and respawn
//!
//! API note (Bevy >= 0.18):
//! - Prefer `single_mut()` with `let Ok(..) else { return }` for single-entity access so
//!   a missing player is a no-op rather than a panic.

use std::time::Duration;

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::bounds::Hurtbox;
use crate::common::clock::GameClock;
use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::common::tunables::{AttackSpec, PlayerTuning, Tunables};
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::messages::{ActorAttacked, ActorDied, RespawnRequested, Victim};
use crate::plugins::combat::timeline::{TimedAction, Timeline};
use crate::plugins::combat::{AttackKind, CombatSet, Team};
use crate::plugins::physics::walker_body;
use crate::plugins::session::{DerivedStats, SessionState};
use crate::plugins::world::SolidMap;
use crate::plugins::world::probe::{self, WallSide};

#[derive(Component)]
pub struct Player;

/// Held buttons plus presses latched since the last fixed step.
#[derive(Resource, Default, Debug, Clone)]
pub struct PlayerInput {
    pub move_x: f32,
    pub run: bool,
    pub defend: bool,
    pub jump: bool,
    pub attack: bool,
    pub interact: bool,
}

/// Locomotion bookkeeping that does not belong in `ActorState`.
#[derive(Component, Debug, Clone)]
pub struct PlayerMotion {
    pub grounded: bool,
    pub wall: Option<WallSide>,
    pub running: bool,
    last_tick: u64,
    dt_ms: u64,
    still_since: u64,
    recovery: Timer,
}

impl PlayerMotion {
    pub fn new(now: u64, tuning: &PlayerTuning) -> Self {
        Self {
            grounded: false,
            wall: None,
            running: false,
            last_tick: now,
            dt_ms: 0,
            still_since: now,
            recovery: Timer::new(
                Duration::from_millis(tuning.recovery_tick_ms),
                TimerMode::Repeating,
            ),
        }
    }
}

pub fn plugin(app: &mut App) {
    app.init_resource::<PlayerInput>()
        .add_systems(OnEnter(GameState::InGame), spawn)
        .add_systems(Update, gather_input.run_if(resource_exists::<ButtonInput<KeyCode>>))
        .add_systems(FixedUpdate, control.in_set(CombatSet::Decide))
        .add_systems(
            FixedUpdate,
            (recover, on_death, on_respawn).chain().in_set(CombatSet::Aftermath),
        );
}

fn spawn(
    mut commands: Commands,
    tunables: Res<Tunables>,
    clock: Res<GameClock>,
    session: Res<SessionState>,
) {
    let tuning = &tunables.player;
    let size = tuning.hurtbox;
    let layers = CollisionLayers::new(Layer::Player, [Layer::World]);

    commands.spawn((
        Name::new("Player"),
        Player,
        Team::Player,
        ActorState::new(tuning.max_hp, tuning.max_sp, 0),
        PlayerMotion::new(clock.now(), tuning),
        DerivedStats::compute(tuning, &session.modifiers),
        Timeline::default(),
        Hurtbox::from_size(size.x, size.y),
        Sprite::from_color(Color::srgb(0.2, 0.75, 0.9), size),
        Transform::from_translation(tuning.spawn_point.extend(1.0)),
        walker_body(Collider::rectangle(size.x, size.y)),
        layers,
        DespawnOnExit(GameState::InGame),
    ));
}

fn gather_input(keys: Res<ButtonInput<KeyCode>>, mut input: ResMut<PlayerInput>) {
    let mut axis = 0.0;
    if keys.pressed(KeyCode::KeyA) {
        axis -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        axis += 1.0;
    }
    input.move_x = axis;
    input.run = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
    input.defend = keys.pressed(KeyCode::KeyK);

    // Latched: cleared by the fixed step that reads them.
    input.jump |= keys.just_pressed(KeyCode::Space);
    input.attack |= keys.just_pressed(KeyCode::KeyJ);
    input.interact |= keys.just_pressed(KeyCode::KeyE);
}

// ----- Attack -----

/// Start a base attack and lay out its timeline. Returns false when rejected.
pub fn begin_base_attack(
    state: &mut ActorState,
    timeline: &mut Timeline,
    spec: &AttackSpec,
    tuning: &PlayerTuning,
    now: u64,
) -> bool {
    let Some(act) = state.try_begin_attack(AttackKind::PlayerBase, spec, now) else {
        return false;
    };
    let (open, close) = tuning.combo_window_ms();
    timeline.after(now, spec.hitbox_delay_ms, TimedAction::Hitbox(AttackKind::PlayerBase), act);
    timeline.after(now, open, TimedAction::ComboWindow { open: true }, act);
    timeline.after(now, close, TimedAction::ComboWindow { open: false }, act);
    timeline.after(now, tuning.base_attack_ms(), TimedAction::FinishBaseAttack, act);
    true
}

// ----- Fixed step -----

fn control(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    map: Option<Res<SolidMap>>,
    mut input: ResMut<PlayerInput>,
    mut attacked: MessageWriter<ActorAttacked>,
    mut q: Query<
        (
            Entity,
            &mut ActorState,
            &mut PlayerMotion,
            &mut LinearVelocity,
            &mut Timeline,
            &Transform,
            &Hurtbox,
        ),
        With<Player>,
    >,
) {
    let jump_pressed = std::mem::take(&mut input.jump);
    let attack_pressed = std::mem::take(&mut input.attack);

    let Ok((entity, mut state, mut motion, mut vel, mut timeline, tf, hurtbox)) = q.single_mut()
    else {
        return;
    };

    let now = clock.now();
    let tuning = &tunables.player;
    motion.dt_ms = clock.since(motion.last_tick);
    motion.last_tick = now;
    let dt = motion.dt_ms as f32 / 1000.0;

    let map = map.as_deref();
    let body = hurtbox.at(tf.translation.truncate());
    motion.grounded = probe::grounded(map, &body);
    motion.wall = if motion.grounded { None } else { probe::wall_beside(map, &body) };
    motion.running = false;

    if state.is_dead() {
        return;
    }

    if state.is_stunned(now) {
        state.set_defending(false, now);
        vel.x *= 0.9;
        return;
    }

    // Attack or queue the follow-up.
    if attack_pressed {
        if state.is_attacking() {
            let combo_cost = tunables.attack(AttackKind::PlayerCombo).map_or(f32::INFINITY, |s| s.cost);
            if !state.queue_combo(combo_cost) {
                debug!("combo not queued");
            }
        } else {
            match tunables.attack(AttackKind::PlayerBase) {
                Ok(spec) => {
                    if begin_base_attack(&mut state, &mut timeline, spec, tuning, now) {
                        attacked.write(ActorAttacked { actor: entity, kind: AttackKind::PlayerBase });
                    } else {
                        debug!("attack rejected");
                    }
                }
                Err(err) => error!("player attack unavailable: {err}"),
            }
        }
    }

    // Defence drains stamina and drops when it runs out.
    if state.set_defending(input.defend, now) {
        state.spend_sp(tuning.sp_cost_defend_per_sec * dt);
        if state.sp() <= 0.0 {
            state.set_defending(false, now);
        }
    }

    if state.is_attacking() {
        vel.x *= 0.8;
    } else {
        let moving = input.move_x != 0.0;
        let speed = if state.is_defending() {
            tuning.defend_speed
        } else if input.run && moving && state.sp() > 0.0 {
            motion.running = true;
            tuning.run_speed
        } else {
            tuning.walk_speed
        };
        vel.x = input.move_x * speed;
        if moving {
            state.facing_right = input.move_x > 0.0;
        }
        if motion.running {
            state.spend_sp(tuning.sp_cost_run_per_sec * dt);
        }
    }

    if jump_pressed {
        jump(&mut state, &mut vel, &motion, input.move_x, tuning, tunables.gravity);
    }

    if !motion.grounded && motion.wall.is_some() && vel.y < 0.0 {
        vel.y = vel.y.max(-tuning.wall_slide_max_fall);
    }
}

/// Ground jump, wall jump, or letting go of a wall.
fn jump(
    state: &mut ActorState,
    vel: &mut LinearVelocity,
    motion: &PlayerMotion,
    move_x: f32,
    tuning: &PlayerTuning,
    gravity: f32,
) {
    if motion.grounded {
        if state.sp() >= tuning.sp_cost_jump {
            state.spend_sp(tuning.sp_cost_jump);
            vel.y = tuning.jump_velocity(gravity);
        }
        return;
    }

    let Some(wall) = motion.wall else {
        return;
    };
    if move_x == 0.0 {
        // Drop off the wall: keep falling, push away slightly.
        vel.x = match wall {
            WallSide::Left => 1.0,
            WallSide::Right => -1.0,
        };
        return;
    }
    if state.sp() < tuning.sp_cost_jump {
        return;
    }
    state.spend_sp(tuning.sp_cost_jump);
    let away = match wall {
        WallSide::Left => 1.0,
        WallSide::Right => -1.0,
    };
    vel.x = away * tuning.wall_jump_speed;
    vel.y = (2.0 * gravity * tuning.jump_height * 0.8).sqrt();
    state.facing_right = away > 0.0;
}

/// Stamina recovery and idle regeneration, in fixed 100 ms steps.
fn recover(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut q: Query<(&mut ActorState, &mut PlayerMotion, &LinearVelocity, &DerivedStats), With<Player>>,
) {
    let Ok((mut state, mut motion, vel, stats)) = q.single_mut() else {
        return;
    };
    if state.is_dead() {
        return;
    }
    let now = clock.now();
    let tuning = &tunables.player;

    let still = vel.x.abs() <= 5.0 && vel.y.abs() <= 50.0;
    let busy = motion.running || state.is_defending() || state.is_attacking();
    if !still || busy {
        motion.still_since = now;
    }
    if busy {
        motion.recovery.reset();
        return;
    }

    let dt_ms = motion.dt_ms;
    let steps = motion
        .recovery
        .tick(Duration::from_millis(dt_ms))
        .times_finished_this_tick();
    if steps == 0 {
        return;
    }
    let step_secs = steps as f32 * motion.recovery.duration().as_secs_f32();

    let rate = if vel.x.abs() > 10.0 {
        tuning.sp_recover_walk_per_sec
    } else {
        tuning.sp_recover_idle_per_sec
    };
    state.recover_sp(rate * stats.sp_regen_multiplier * step_secs);

    let idle_for = now.saturating_sub(motion.still_since);
    if stats.idle_regen_per_sec > 0.0 && idle_for >= tuning.idle_regen_delay_ms {
        state.heal(stats.idle_regen_per_sec * step_secs);
    }
}

fn on_death(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut session: ResMut<SessionState>,
    mut deaths: MessageReader<ActorDied>,
    mut q: Query<(&mut LinearVelocity, &mut Timeline), With<Player>>,
) {
    for died in deaths.read() {
        if died.victim != Victim::Player {
            continue;
        }
        let Ok((mut vel, mut timeline)) = q.get_mut(died.actor) else {
            continue;
        };
        session.deaths += 1;
        vel.0 = Vec2::ZERO;
        timeline.after_untracked(
            clock.now(),
            tunables.player.respawn_delay_ms,
            TimedAction::RequestRespawn,
        );
        info!("player died (deaths: {})", session.deaths);
    }
}

/// Bring the player back from the last save, or fresh at the spawn point.
fn on_respawn(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut session: ResMut<SessionState>,
    mut requests: MessageReader<RespawnRequested>,
    mut q: Query<
        (
            &mut ActorState,
            &mut PlayerMotion,
            &mut DerivedStats,
            &mut Timeline,
            &mut Transform,
            &mut LinearVelocity,
        ),
        With<Player>,
    >,
) {
    for req in requests.read() {
        let Ok((mut state, mut motion, mut stats, mut timeline, mut tf, mut vel)) =
            q.get_mut(req.actor)
        else {
            continue;
        };
        let tuning = &tunables.player;

        let position = match session.restore() {
            Some(snap) => {
                state.restore(snap.hp, snap.sp);
                info!("player respawned at save point");
                snap.position
            }
            None => {
                state.reset();
                info!("player respawned at level start");
                tuning.spawn_point
            }
        };

        *stats = DerivedStats::compute(tuning, &session.modifiers);
        *motion = PlayerMotion::new(clock.now(), tuning);
        timeline.clear();
        tf.translation = position.extend(tf.translation.z);
        vel.0 = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests;
