//! Combat core: actor state, attack timelines, hit resolution.
//!
//! Data flow, all inside `FixedUpdate`:
//! ```text
//!   CombatSet::Tick      advance clock, expire stun/invincibility
//!   CombatSet::Decide    player input / enemy AI / boss machine start attacks
//!   CombatSet::Timeline  due timeline entries fire (hitbox, combo window, end attack)
//!                        hitbox -> AttackEvent message
//!   CombatSet::Resolve   AttackEvent x opposing hurtboxes -> resolve_hit
//!                        -> ActorHit / ActorDied / BossDefeated
//!   CombatSet::Aftermath drops, respawns, PendingDespawn marking
//! ```
//! Structural despawn is deferred to `PostUpdate`.

pub mod actor;
pub mod damage;
pub mod messages;
pub mod timeline;

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::common::bounds::{Aabb, Hurtbox};
use crate::common::clock::{GameClock, advance_clock};
use crate::common::state::GameState;
use crate::common::tunables::{AttackSpec, Tunables};
use crate::plugins::enemies::EnemyKind;
use crate::plugins::session::DerivedStats;

use actor::ActorState;
use damage::{HitOutcome, IncomingHit, Toughness, resolve_hit};
use messages::{
    ActorAttacked, ActorDied, ActorHit, AttackEvent, BossDefeated, RespawnRequested, Victim,
};
use timeline::{TimedAction, Timeline};

// ----- Types -----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackKind {
    PlayerBase,
    PlayerCombo,
    Slime,
    Skeleton,
    Boss,
}

impl AttackKind {
    pub const ALL: [AttackKind; 5] = [
        AttackKind::PlayerBase,
        AttackKind::PlayerCombo,
        AttackKind::Slime,
        AttackKind::Skeleton,
        AttackKind::Boss,
    ];
}

/// Which side an actor fights for. Hitboxes only hurt the other side.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Player,
    Hostile,
}

/// Marker: entity should be removed from the world.
///
/// Despawning is centralized in `PostUpdate` so fixed-step systems never race a
/// structural change.
#[derive(Component, Debug, Clone, Copy)]
pub struct PendingDespawn;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    Tick,
    Decide,
    Timeline,
    Resolve,
    Aftermath,
}

// ----- Plugin -----

pub fn plugin(app: &mut App) {
    messages::add_messages(app);

    app.configure_sets(
        FixedUpdate,
        (
            CombatSet::Tick,
            CombatSet::Decide,
            CombatSet::Timeline,
            CombatSet::Resolve,
            CombatSet::Aftermath,
        )
            .chain()
            .run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        FixedUpdate,
        (advance_clock, expire_status).chain().in_set(CombatSet::Tick),
    )
    .add_systems(FixedUpdate, run_timelines.in_set(CombatSet::Timeline))
    .add_systems(FixedUpdate, resolve_attacks.in_set(CombatSet::Resolve))
    .add_systems(PostUpdate, despawn_pending);
}

// ----- Helpers -----

/// World-space hitbox in front of an actor.
#[inline]
pub fn hitbox_for(spec: &AttackSpec, pos: Vec2, facing_right: bool) -> Aabb {
    let dir = if facing_right { 1.0 } else { -1.0 };
    Aabb::new(pos + Vec2::new(dir * spec.reach, 0.0), spec.size)
}

/// Mitigation and reaction rules for a target. Player defence comes from its cached
/// `DerivedStats` when present.
pub fn toughness_for(
    enemy: Option<&EnemyKind>,
    tunables: &Tunables,
    stats: Option<&DerivedStats>,
) -> Toughness {
    match enemy {
        Some(kind) => Toughness::plain(tunables.enemy(*kind).reaction),
        None => Toughness {
            defense_reduction: stats.map_or(tunables.player.defense_reduction, |s| s.defend_factor),
            defense_bonus: 0.0,
            defense_floor: tunables.player.defense_floor,
            reaction: tunables.player.reaction,
            defend_reaction: tunables.player.defend_reaction,
        },
    }
}

/// Build the hitbox message for an activation that just claimed its hitbox.
fn emit_hitbox(
    source: Entity,
    team: Team,
    kind: AttackKind,
    spec: &AttackSpec,
    state: &ActorState,
    pos: Vec2,
    lifesteal: f32,
) -> AttackEvent {
    AttackEvent {
        source,
        team,
        kind,
        source_x: pos.x,
        bounds: hitbox_for(spec, pos, state.facing_right),
        damage: spec.damage,
        lifesteal,
    }
}

// ----- Systems -----

fn expire_status(clock: Res<GameClock>, mut q: Query<&mut ActorState>) {
    let now = clock.now();
    for mut state in &mut q {
        state.clear_expired(now);
    }
}

/// Fire due timeline entries.
pub fn run_timelines(
    mut commands: Commands,
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut attacks: MessageWriter<AttackEvent>,
    mut attacked: MessageWriter<ActorAttacked>,
    mut respawns: MessageWriter<RespawnRequested>,
    mut q: Query<(
        Entity,
        &mut Timeline,
        Option<&mut ActorState>,
        Option<&Team>,
        Option<&Transform>,
        Option<&mut LinearVelocity>,
        Option<&DerivedStats>,
    )>,
) {
    let now = clock.now();

    for (entity, mut timeline, mut state, team, tf, mut vel, stats) in &mut q {
        let lifesteal = stats.map_or(0.0, |s| s.lifesteal);

        for pending in timeline.take_due(now) {
            let activation = pending.activation.unwrap_or_default();

            match pending.action {
                TimedAction::Remove => {
                    commands.entity(entity).insert(PendingDespawn);
                }
                TimedAction::RequestRespawn => {
                    respawns.write(RespawnRequested { actor: entity });
                }
                TimedAction::DecayKnockback => {
                    let alive = state.as_ref().is_some_and(|s| !s.is_dead());
                    if let (true, Some(v)) = (alive, vel.as_mut()) {
                        v.x *= 0.5;
                    }
                }
                TimedAction::ComboWindow { open } => {
                    if let Some(s) = state.as_mut() {
                        s.set_combo_window(activation, open);
                    }
                }
                TimedAction::EndAttack => {
                    if let Some(s) = state.as_mut() {
                        s.end_attack(activation);
                    }
                }
                TimedAction::Hitbox(kind) => {
                    let (Some(s), Some(team), Some(tf)) = (state.as_mut(), team, tf) else {
                        continue;
                    };
                    if !s.claim_hitbox(activation) {
                        continue;
                    }
                    let spec = match tunables.attack(kind) {
                        Ok(spec) => spec,
                        Err(err) => {
                            error!("hitbox dropped: {err}");
                            continue;
                        }
                    };
                    let pos = tf.translation.truncate();
                    if let Some(v) = vel.as_mut() {
                        v.x += if s.facing_right { spec.dash } else { -spec.dash };
                    }
                    attacks.write(emit_hitbox(entity, *team, kind, spec, s, pos, lifesteal));
                }
                TimedAction::FinishBaseAttack => {
                    let (Some(s), Some(team), Some(tf)) = (state.as_mut(), team, tf) else {
                        continue;
                    };
                    let spec = match tunables.attack(AttackKind::PlayerCombo) {
                        Ok(spec) => spec,
                        Err(err) => {
                            error!("combo unavailable: {err}");
                            s.end_attack(activation);
                            continue;
                        }
                    };
                    let Some(combo) = s.begin_combo(activation, spec.cost, now) else {
                        continue;
                    };
                    attacked.write(ActorAttacked { actor: entity, kind: AttackKind::PlayerCombo });

                    // The combo's hit lands as its animation starts.
                    if s.claim_hitbox(combo) {
                        let pos = tf.translation.truncate();
                        if let Some(v) = vel.as_mut() {
                            v.x += if s.facing_right { spec.dash } else { -spec.dash };
                        }
                        attacks.write(emit_hitbox(
                            entity,
                            *team,
                            AttackKind::PlayerCombo,
                            spec,
                            s,
                            pos,
                            lifesteal,
                        ));
                    }
                    timeline.after(now, spec.duration_ms, TimedAction::EndAttack, combo);
                }
            }
        }
    }
}

/// Resolve every hitbox produced this tick against opposing actors.
pub fn resolve_attacks(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut reader: MessageReader<AttackEvent>,
    mut hits: MessageWriter<ActorHit>,
    mut deaths: MessageWriter<ActorDied>,
    mut defeated: MessageWriter<BossDefeated>,
    mut q: Query<(
        Entity,
        &mut ActorState,
        &Team,
        &Transform,
        &Hurtbox,
        Option<&mut LinearVelocity>,
        Option<&mut Timeline>,
        Option<&EnemyKind>,
        Option<&DerivedStats>,
    )>,
) {
    let now = clock.now();

    for ev in reader.read() {
        let hit = IncomingHit {
            base_damage: ev.damage,
            attacker_x: ev.source_x,
            lifesteal: ev.lifesteal,
        };
        let mut stolen = 0.0;

        for (entity, mut state, team, tf, hurtbox, vel, timeline, kind, stats) in &mut q {
            if *team == ev.team || entity == ev.source || state.is_dead() {
                continue;
            }
            let pos = tf.translation.truncate();
            if !ev.bounds.overlaps(&hurtbox.at(pos)) {
                continue;
            }

            let toughness = toughness_for(kind, &tunables, stats);
            let outcome = resolve_hit(&mut state, pos.x, &hit, &toughness, now);
            let HitOutcome::Landed { damage, knockback, lethal, lifesteal_heal } = outcome else {
                debug!("hit on {entity} ignored");
                continue;
            };

            let target = HitTarget { entity, pos, kind: kind.copied(), vel, timeline };
            let decay_ms = tunables.player.knockback_decay_ms;
            if let Some(died) = apply_hit_effects(target, knockback, lethal, decay_ms, now) {
                deaths.write(died);
            }

            hits.write(ActorHit { target: entity, source: ev.source, damage, lethal });
            if lethal && kind == Some(&EnemyKind::Boss) {
                info!("boss defeated");
                defeated.write(BossDefeated { boss: entity });
            }
            stolen += lifesteal_heal;
        }

        if stolen > 0.0 {
            if let Ok((_, mut attacker, ..)) = q.get_mut(ev.source) {
                attacker.heal(stolen);
            }
        }
    }
}

/// The actor a landed hit is applied to, borrowed for one resolution pass.
pub struct HitTarget<'w> {
    pub entity: Entity,
    pub pos: Vec2,
    /// `None` for the player.
    pub kind: Option<EnemyKind>,
    pub vel: Option<Mut<'w, LinearVelocity>>,
    pub timeline: Option<Mut<'w, Timeline>>,
}

/// Knockback + decay scheduling; returns the death notice for lethal hits.
pub fn apply_hit_effects(
    target: HitTarget<'_>,
    knockback: f32,
    lethal: bool,
    decay_ms: u64,
    now: u64,
) -> Option<ActorDied> {
    let HitTarget { entity, pos, kind, vel, timeline } = target;
    if let Some(mut v) = vel {
        // A lethal hit keeps its horizontal throw; everything else stops.
        v.x = knockback;
        if lethal {
            v.y = 0.0;
        }
    }

    if lethal {
        let victim = match kind {
            Some(k) => Victim::Enemy(k),
            None => Victim::Player,
        };
        return Some(ActorDied { actor: entity, victim, position: pos });
    }

    if let Some(mut t) = timeline {
        t.after_untracked(now, decay_ms, TimedAction::DecayKnockback);
    }
    None
}

/// Despawn everything marked for removal.
fn despawn_pending(mut commands: Commands, q: Query<Entity, With<PendingDespawn>>) {
    for e in &q {
        commands.entity(e).despawn();
    }
}
