//! Boss plugin: trigger, pursuit, teleport rule and the scripted phase transitions.
//!
//! The boss is an enemy (`EnemyKind::Boss`, shared `ActorState`, shared damage pipeline)
//! with two extra components: `BossPhase` for the HP-gated script and `BossBrain` for
//! its own movement and teleport bookkeeping. Generic enemy AI never drives it.
//!
//! ```text
//! Decide:    on_boss_triggered -> boss_ai (script cues, teleport, attack, pursuit)
//! Resolve:   resolve_attacks -> enter_transitions, track_landed_attacks
//! Aftermath: on_boss_defeated, boss_opacity
//! ```

pub mod phase;

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::bounds::Hurtbox;
use crate::common::clock::GameClock;
use crate::common::layers::Layer;
use crate::common::rng::CombatRng;
use crate::common::state::GameState;
use crate::common::tunables::{BossTuning, Tunables};
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::messages::{
    ActorAttacked, AttackEvent, BossDefeated, BossPhaseChanged, BossTriggered, WaveBurstRequest,
};
use crate::plugins::combat::timeline::Timeline;
use crate::plugins::combat::{AttackKind, CombatSet, Team, resolve_attacks};
use crate::plugins::enemies::{EnemyKind, begin_enemy_attack, player_distance};
use crate::plugins::player::Player;
use crate::plugins::render::Opacity;
use crate::plugins::session::SessionState;
use crate::plugins::world::LevelLayout;

use phase::{BossPhase, PhaseCue, attack_interval_ms, teleport_cooldown_ms};

// ----- Components -----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teleport {
    Ready,
    Vanishing { until: u64 },
    Arriving { until: u64 },
}

#[derive(Component, Debug, Clone)]
pub struct BossBrain {
    /// Arena centre; phase transitions return here.
    pub origin: Vec2,
    pub appear_started: u64,
    pub awake_at: u64,
    pub last_landed_at: u64,
    pub teleport_ready_at: u64,
    pub teleport: Teleport,
}

impl BossBrain {
    pub fn new(origin: Vec2, now: u64, tuning: &BossTuning) -> Self {
        let awake_at = now + tuning.appear_ms;
        Self {
            origin,
            appear_started: now,
            awake_at,
            last_landed_at: awake_at,
            teleport_ready_at: awake_at,
            teleport: Teleport::Ready,
        }
    }

    /// Teleport when the player is out of reach or the boss has gone too long without
    /// landing a hit, cooldown permitting.
    pub fn should_teleport(&self, now: u64, distance: f32, tuning: &BossTuning) -> bool {
        now >= self.teleport_ready_at
            && (distance > tuning.teleport_distance
                || now.saturating_sub(self.last_landed_at) > tuning.no_attack_ms)
    }

    /// Appear / teleport fades outside phase transitions.
    pub fn alpha(&self, now: u64, tuning: &BossTuning) -> f32 {
        if now < self.awake_at {
            let span = tuning.appear_ms.max(1) as f32;
            return now.saturating_sub(self.appear_started) as f32 / span;
        }
        let fade = tuning.teleport_fade_ms.max(1) as f32;
        match self.teleport {
            Teleport::Ready => 1.0,
            Teleport::Vanishing { until } => until.saturating_sub(now) as f32 / fade,
            Teleport::Arriving { until } => 1.0 - until.saturating_sub(now) as f32 / fade,
        }
    }
}

/// Arrival point next to the player: random side, random gap, small vertical jitter.
pub fn teleport_target(player: Vec2, rng: &mut CombatRng, tuning: &BossTuning) -> Vec2 {
    let (near, far) = tuning.teleport_offset;
    let side = rng.sign();
    let gap = rng.range_f32(near, far);
    let jitter = rng.range_f32(-tuning.teleport_jitter, tuning.teleport_jitter);
    player + Vec2::new(side * gap, jitter)
}

// ----- Plugin -----

pub fn plugin(app: &mut App) {
    app.add_systems(
        FixedUpdate,
        (on_boss_triggered, boss_ai).chain().in_set(CombatSet::Decide),
    )
    .add_systems(
        FixedUpdate,
        (enter_transitions, track_landed_attacks)
            .after(resolve_attacks)
            .in_set(CombatSet::Resolve),
    )
    .add_systems(
        FixedUpdate,
        (on_boss_defeated, boss_opacity).in_set(CombatSet::Aftermath),
    );
}

// ----- Systems -----

fn on_boss_triggered(
    mut commands: Commands,
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    session: Res<SessionState>,
    layout: Option<Res<LevelLayout>>,
    mut triggers: MessageReader<BossTriggered>,
    existing: Query<(), With<BossBrain>>,
) {
    let mut present = !existing.is_empty();
    for _ in triggers.read() {
        if present || session.boss_defeated {
            debug!("boss trigger ignored");
            continue;
        }
        let Some(layout) = layout.as_deref() else {
            warn!("boss triggered without a level layout");
            continue;
        };
        spawn_boss(&mut commands, layout.boss_origin, clock.now(), &tunables);
        present = true;
        info!("boss awakened");
    }
}

pub fn spawn_boss(commands: &mut Commands, origin: Vec2, now: u64, tunables: &Tunables) -> Entity {
    let profile = &tunables.boss_profile;
    let size = profile.hurtbox;
    let mut state = ActorState::new(profile.max_hp, 0.0, profile.attack_interval_ms);
    state.immune = true;

    commands
        .spawn((
            Name::new("Boss"),
            EnemyKind::Boss,
            Team::Hostile,
            state,
            BossPhase::default(),
            BossBrain::new(origin, now, &tunables.boss),
            Timeline::default(),
            Hurtbox::from_size(size.x, size.y),
            Opacity(0.0),
            Sprite::from_color(Color::srgb(0.55, 0.2, 0.7), size),
            Transform::from_translation(origin.extend(1.0)),
            (
                RigidBody::Kinematic,
                Collider::rectangle(size.x, size.y),
                Sensor,
                CollisionLayers::new(Layer::Enemy, [Layer::Player]),
            ),
            DespawnOnExit(GameState::InGame),
        ))
        .id()
}

fn boss_ai(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut rng: ResMut<CombatRng>,
    mut bursts: MessageWriter<WaveBurstRequest>,
    mut phase_changed: MessageWriter<BossPhaseChanged>,
    mut attacked: MessageWriter<ActorAttacked>,
    q_player: Query<(&Transform, &ActorState), With<Player>>,
    mut q: Query<
        (
            Entity,
            &mut ActorState,
            &mut BossPhase,
            &mut BossBrain,
            &mut Transform,
            &mut LinearVelocity,
            &mut Timeline,
        ),
        Without<Player>,
    >,
) {
    let now = clock.now();
    let tuning = &tunables.boss;
    let profile = &tunables.boss_profile;
    let player = q_player
        .single()
        .ok()
        .filter(|(_, s)| !s.is_dead())
        .map(|(tf, _)| tf.translation.truncate());

    let spec = match tunables.attack(AttackKind::Boss) {
        Ok(spec) => *spec,
        Err(err) => {
            error!("boss cannot attack: {err}");
            return;
        }
    };

    for (entity, mut state, mut phase, mut brain, mut tf, mut vel, mut timeline) in &mut q {
        if state.is_dead() {
            vel.0 = Vec2::ZERO;
            continue;
        }
        if now < brain.awake_at {
            state.immune = true;
            vel.0 = Vec2::ZERO;
            continue;
        }

        // The script runs to the end regardless of the player.
        if phase.is_transitioning() {
            vel.0 = Vec2::ZERO;
            for cue in phase.advance(now, &tuning.transition) {
                match cue {
                    PhaseCue::FireBurst(burst) => {
                        let origin = tf.translation.truncate();
                        bursts.write(WaveBurstRequest { source: entity, origin, burst });
                    }
                    PhaseCue::FadeIn => debug!("boss fading back in"),
                    PhaseCue::Complete(p) => {
                        state.immune = false;
                        state.attack_interval_ms =
                            attack_interval_ms(profile.attack_interval_ms, p, &tuning.phases);
                        brain.last_landed_at = now;
                        brain.teleport_ready_at = now;
                        phase_changed.write(BossPhaseChanged { boss: entity, phase: p });
                        info!("boss entered phase {p}");
                    }
                }
            }
            continue;
        }
        state.immune = false;

        if state.is_stunned(now) {
            continue;
        }

        let pos = tf.translation.truncate();
        match brain.teleport {
            Teleport::Vanishing { until } => {
                vel.0 = Vec2::ZERO;
                if now >= until {
                    if let Some(p) = player {
                        let dest = teleport_target(p, &mut rng, tuning);
                        tf.translation = dest.extend(tf.translation.z);
                    }
                    brain.teleport = Teleport::Arriving { until: now + tuning.teleport_fade_ms };
                }
                continue;
            }
            Teleport::Arriving { until } => {
                vel.0 = Vec2::ZERO;
                if now < until {
                    continue;
                }
                brain.teleport = Teleport::Ready;
                brain.teleport_ready_at = now + teleport_cooldown_ms(tuning, phase.phase());
                brain.last_landed_at = now;
                // Forced follow-up: the attack cooldown does not apply.
                state.last_attack_at = None;
                if let Some(p) = player {
                    state.facing_right = p.x >= pos.x;
                }
                if begin_enemy_attack(&mut state, &mut timeline, AttackKind::Boss, &spec, now) {
                    attacked.write(ActorAttacked { actor: entity, kind: AttackKind::Boss });
                }
                continue;
            }
            Teleport::Ready => {}
        }

        if state.is_attacking() {
            vel.0 = Vec2::ZERO;
            continue;
        }
        let Some(target) = player else {
            vel.0 = Vec2::ZERO;
            continue;
        };

        let distance = player_distance(pos, Some(target), tunables.vertical_reach);
        if brain.should_teleport(now, distance, tuning) {
            debug!("boss teleporting (distance {distance})");
            brain.teleport = Teleport::Vanishing { until: now + tuning.teleport_fade_ms };
            vel.0 = Vec2::ZERO;
            continue;
        }

        if distance <= profile.attack_radius {
            vel.0 = Vec2::ZERO;
            state.facing_right = target.x >= pos.x;
            if begin_enemy_attack(&mut state, &mut timeline, AttackKind::Boss, &spec, now) {
                attacked.write(ActorAttacked { actor: entity, kind: AttackKind::Boss });
            }
            continue;
        }

        let dir = (target - pos).normalize_or_zero();
        vel.0 = Vec2::new(
            dir.x * tuning.move_speed,
            dir.y * tuning.move_speed * tuning.vertical_speed_factor,
        );
        if dir.x != 0.0 {
            state.facing_right = dir.x > 0.0;
        }
    }
}

/// Start the phase script as soon as a hit takes HP past the next threshold.
pub fn enter_transitions(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut q: Query<(&mut ActorState, &mut BossPhase, &mut BossBrain, &mut Transform, &mut LinearVelocity)>,
) {
    let now = clock.now();
    let tuning = &tunables.boss;

    for (mut state, mut phase, mut brain, mut tf, mut vel) in &mut q {
        if state.is_dead() {
            continue;
        }
        let Some(target) = phase.due(state.hp_fraction(), &tuning.phases) else {
            continue;
        };
        if !phase.begin(target, now, &tuning.transition) {
            continue;
        }

        let current = state.activation();
        state.end_attack(current);
        state.immune = true;
        brain.teleport = Teleport::Ready;
        tf.translation = brain.origin.extend(tf.translation.z);
        vel.0 = Vec2::ZERO;
        info!("boss phase {} -> {target}: transition started", phase.phase());
    }
}

/// A boss swing only counts as landed if the player is still in range when it resolves.
fn track_landed_attacks(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut reader: MessageReader<AttackEvent>,
    q_player: Query<(&Transform, &ActorState), With<Player>>,
    mut q_boss: Query<(&Transform, &mut BossBrain), Without<Player>>,
) {
    let player = q_player
        .single()
        .ok()
        .filter(|(_, s)| !s.is_dead())
        .map(|(tf, _)| tf.translation.truncate());

    for ev in reader.read() {
        if ev.kind != AttackKind::Boss {
            continue;
        }
        let Ok((tf, mut brain)) = q_boss.get_mut(ev.source) else {
            continue;
        };
        let distance = player_distance(tf.translation.truncate(), player, tunables.vertical_reach);
        if distance <= tunables.boss_profile.attack_radius {
            brain.last_landed_at = clock.now();
        }
    }
}

fn on_boss_defeated(mut session: ResMut<SessionState>, mut defeated: MessageReader<BossDefeated>) {
    for _ in defeated.read() {
        session.boss_defeated = true;
    }
}

fn boss_opacity(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut q: Query<(&BossPhase, &BossBrain, &mut Opacity)>,
) {
    let now = clock.now();
    for (phase, brain, mut opacity) in &mut q {
        let alpha = if phase.is_transitioning() {
            phase.alpha(now, &tunables.boss.transition)
        } else {
            brain.alpha(now, &tunables.boss)
        };
        if opacity.0 != alpha {
            opacity.0 = alpha;
        }
    }
}

#[cfg(test)]
mod tests;
