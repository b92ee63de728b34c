//! Enemies plugin: patrol / chase / attack AI, death drops and timed respawns.
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! 1) FACTS live in components:
//!    - `EnemyKind` selects the profile in `Tunables` (speeds, radii, drops).
//!    - `ActorState` is the shared combat state; `Patrol` is the walker's beat.
//!    - `EnemySpawner` entities remember where an enemy belongs and when it returns.
//!
//! 2) RULES run in the combat sets:
//!    - Decide: `enemy_ai` picks attack / chase / patrol from the player distance.
//!    - Aftermath: `on_enemy_death` rolls drops and schedules corpse removal;
//!      `respawn_enemies` refills empty spawners.
//!
//! The boss carries `EnemyKind::Boss` but no `Patrol`, so `enemy_ai` never drives it.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::bounds::Hurtbox;
use crate::common::clock::GameClock;
use crate::common::layers::Layer;
use crate::common::rng::CombatRng;
use crate::common::state::GameState;
use crate::common::tunables::{AttackSpec, DropRange, DropTable, EnemyProfile, Tunables};
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::messages::{ActorAttacked, ActorDied, DropSpawned, PickupKind, Victim};
use crate::plugins::combat::timeline::{TimedAction, Timeline};
use crate::plugins::combat::{AttackKind, CombatSet, Team};
use crate::plugins::physics::walker_body;
use crate::plugins::player::Player;
use crate::plugins::session::SessionState;
use crate::plugins::world::probe;
use crate::plugins::world::{LevelLayout, SolidMap};

// -----------------------------------------------------------------------------
// Components
// -----------------------------------------------------------------------------

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    Slime,
    Skeleton,
    Boss,
}

impl EnemyKind {
    fn color(self) -> Color {
        match self {
            EnemyKind::Slime => Color::srgb(0.35, 0.8, 0.35),
            EnemyKind::Skeleton => Color::srgb(0.85, 0.85, 0.78),
            EnemyKind::Boss => Color::srgb(0.55, 0.2, 0.7),
        }
    }
}

/// Walk back and forth within `origin_x ± range`.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Patrol {
    pub origin_x: f32,
    pub range: f32,
    pub dir: f32,
}

/// Where an enemy lives, who currently occupies the spot, and when it comes back.
#[derive(Component, Debug, Clone, Copy)]
pub struct EnemySpawner {
    pub kind: EnemyKind,
    pub position: Vec2,
    pub occupant: Option<Entity>,
    pub respawn_at: Option<u64>,
}

/// What an enemy does this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Attack,
    Chase,
    Patrol,
}

// -----------------------------------------------------------------------------
// Plugin
// -----------------------------------------------------------------------------

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(GameState::InGame), spawn_sites)
        .add_systems(FixedUpdate, enemy_ai.in_set(CombatSet::Decide))
        .add_systems(
            FixedUpdate,
            (on_enemy_death, respawn_enemies).chain().in_set(CombatSet::Aftermath),
        );
}

// -----------------------------------------------------------------------------
// Pure rules
// -----------------------------------------------------------------------------

/// Horizontal distance to the player, or infinity when out of vertical reach.
#[inline]
pub fn player_distance(from: Vec2, player: Option<Vec2>, vertical_reach: f32) -> f32 {
    match player {
        Some(p) if (p.y - from.y).abs() <= vertical_reach => (p.x - from.x).abs(),
        _ => f32::INFINITY,
    }
}

#[inline]
pub fn choose_intent(distance: f32, profile: &EnemyProfile) -> Intent {
    if distance <= profile.attack_radius {
        Intent::Attack
    } else if distance <= profile.detect_radius {
        Intent::Chase
    } else {
        Intent::Patrol
    }
}

/// Next patrol direction: turn at the beat bounds and at platform edges.
#[inline]
pub fn patrol_dir(patrol: &Patrol, x: f32, edge_ahead: bool) -> f32 {
    let mut dir = patrol.dir;
    if x >= patrol.origin_x + patrol.range {
        dir = -1.0;
    } else if x <= patrol.origin_x - patrol.range {
        dir = 1.0;
    }
    if edge_ahead {
        dir = -dir;
    }
    dir
}

/// Start an enemy attack: hitbox after the wind-up, recovery at the end.
pub fn begin_enemy_attack(
    state: &mut ActorState,
    timeline: &mut Timeline,
    kind: AttackKind,
    spec: &AttackSpec,
    now: u64,
) -> bool {
    let Some(act) = state.try_begin_attack(kind, spec, now) else {
        return false;
    };
    timeline.after(now, spec.hitbox_delay_ms, TimedAction::Hitbox(kind), act);
    timeline.after(now, spec.duration_ms, TimedAction::EndAttack, act);
    true
}

fn roll(range: &DropRange, rng: &mut CombatRng) -> u32 {
    if rng.chance(range.rate) { rng.between(range.min, range.max) } else { 0 }
}

/// Coin and heart counts for one defeat.
pub fn roll_drops(table: &DropTable, rng: &mut CombatRng) -> (u32, u32) {
    (roll(&table.coins, rng), roll(&table.hearts, rng))
}

// -----------------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------------

/// Build a walking enemy. The boss is assembled by its own plugin.
pub fn spawn_enemy(commands: &mut Commands, kind: EnemyKind, position: Vec2, tunables: &Tunables) -> Entity {
    let profile = tunables.enemy(kind);
    let size = profile.hurtbox;
    let layers = CollisionLayers::new(Layer::Enemy, [Layer::World]);

    commands
        .spawn((
            Name::new(format!("{kind:?}")),
            kind,
            Team::Hostile,
            ActorState::new(profile.max_hp, 0.0, profile.attack_interval_ms),
            Patrol { origin_x: position.x, range: profile.patrol_range, dir: 1.0 },
            Timeline::default(),
            Hurtbox::from_size(size.x, size.y),
            Sprite::from_color(kind.color(), size),
            Transform::from_translation(position.extend(1.0)),
            walker_body(Collider::rectangle(size.x, size.y)),
            layers,
            DespawnOnExit(GameState::InGame),
        ))
        .id()
}

fn spawn_sites(mut commands: Commands, tunables: Res<Tunables>, layout: Option<Res<LevelLayout>>) {
    let Some(layout) = layout else {
        warn!("no level layout; no enemies spawned");
        return;
    };
    for &(kind, position) in &layout.enemies {
        let occupant = spawn_enemy(&mut commands, kind, position, &tunables);
        commands.spawn((
            Name::new(format!("{kind:?}Spawner")),
            EnemySpawner { kind, position, occupant: Some(occupant), respawn_at: None },
            DespawnOnExit(GameState::InGame),
        ));
    }
}

// -----------------------------------------------------------------------------
// Systems
// -----------------------------------------------------------------------------

fn enemy_ai(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    map: Option<Res<SolidMap>>,
    mut attacked: MessageWriter<ActorAttacked>,
    q_player: Query<(&Transform, &ActorState), With<Player>>,
    mut q: Query<
        (
            Entity,
            &EnemyKind,
            &mut ActorState,
            &mut Patrol,
            &mut LinearVelocity,
            &mut Timeline,
            &Transform,
            &Hurtbox,
        ),
        Without<Player>,
    >,
) {
    let now = clock.now();
    let map = map.as_deref();
    let player = q_player
        .single()
        .ok()
        .filter(|(_, s)| !s.is_dead())
        .map(|(tf, _)| tf.translation.truncate());

    for (entity, kind, mut state, mut patrol, mut vel, mut timeline, tf, hurtbox) in &mut q {
        if state.is_dead() {
            vel.x *= 0.9;
            continue;
        }
        if state.is_stunned(now) {
            continue;
        }
        if state.is_attacking() {
            vel.x = 0.0;
            continue;
        }

        let profile = tunables.enemy(*kind);
        let pos = tf.translation.truncate();
        let body = hurtbox.at(pos);
        let distance = player_distance(pos, player, tunables.vertical_reach);

        match choose_intent(distance, profile) {
            Intent::Attack => {
                vel.x = 0.0;
                if let Some(p) = player {
                    state.facing_right = p.x >= pos.x;
                }
                let spec = match tunables.attack(profile.attack) {
                    Ok(spec) => spec,
                    Err(err) => {
                        error!("{kind:?} cannot attack: {err}");
                        continue;
                    }
                };
                if begin_enemy_attack(&mut state, &mut timeline, profile.attack, spec, now) {
                    attacked.write(ActorAttacked { actor: entity, kind: profile.attack });
                }
            }
            Intent::Chase => {
                let dir = player.map_or(0.0, |p| (p.x - pos.x).signum());
                vel.x = if probe::edge_ahead(map, &body, dir) { 0.0 } else { dir * profile.chase_speed };
            }
            Intent::Patrol => {
                let edge = probe::edge_ahead(map, &body, patrol.dir);
                patrol.dir = patrol_dir(&patrol, pos.x, edge);
                vel.x = patrol.dir * profile.patrol_speed;
            }
        }

        if vel.x != 0.0 {
            state.facing_right = vel.x > 0.0;
        }
    }
}

fn on_enemy_death(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut rng: ResMut<CombatRng>,
    mut session: ResMut<SessionState>,
    mut deaths: MessageReader<ActorDied>,
    mut drops: MessageWriter<DropSpawned>,
    mut q_timeline: Query<&mut Timeline>,
    mut q_spawners: Query<&mut EnemySpawner>,
) {
    let now = clock.now();

    for died in deaths.read() {
        let Victim::Enemy(kind) = died.victim else {
            continue;
        };
        let profile = tunables.enemy(kind);
        session.kills += 1;

        let (coins, hearts) = roll_drops(&profile.drops, &mut rng);
        debug!("{kind:?} dropped {coins} coins, {hearts} hearts");
        for (pickup, count) in [(PickupKind::Coin, coins), (PickupKind::Heart, hearts)] {
            if count > 0 {
                drops.write(DropSpawned { kind: pickup, origin: died.position, count });
            }
        }

        if let Ok(mut timeline) = q_timeline.get_mut(died.actor) {
            timeline.after_untracked(now, profile.corpse_ms, TimedAction::Remove);
        }

        if let Some(delay) = profile.respawn_ms {
            for mut spawner in &mut q_spawners {
                if spawner.occupant == Some(died.actor) {
                    spawner.occupant = None;
                    spawner.respawn_at = Some(now + delay);
                }
            }
        }
    }
}

fn respawn_enemies(
    mut commands: Commands,
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut q: Query<&mut EnemySpawner>,
) {
    let now = clock.now();
    for mut spawner in &mut q {
        if spawner.respawn_at.is_some_and(|t| now >= t) {
            let id = spawn_enemy(&mut commands, spawner.kind, spawner.position, &tunables);
            spawner.occupant = Some(id);
            spawner.respawn_at = None;
            info!("{:?} respawned", spawner.kind);
        }
    }
}
