//! Pickups plugin: scattered coins and hearts with a timed lifecycle.
//!
//! ```text
//! Decide:    pickup_motion     ground settling, heart bob
//! Resolve:   collect_pickups   player hurtbox x pickup bounds -> PickupCollected
//! Aftermath: spawn_drops       DropSpawned -> scattered pickup entities
//!            pickup_lifecycle  warning blink, expiry, closing animation, removal
//! ```
//!
//! Anything may ask for drops by writing `DropSpawned`; only `spawn_drops` creates
//! pickup entities.

pub mod state;

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::bounds::{Aabb, Hurtbox};
use crate::common::clock::GameClock;
use crate::common::layers::Layer;
use crate::common::rng::CombatRng;
use crate::common::state::GameState;
use crate::common::tunables::Tunables;
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::messages::{DropSpawned, PickupCollected, PickupKind};
use crate::plugins::combat::{CombatSet, PendingDespawn};
use crate::plugins::physics::walker_body;
use crate::plugins::player::Player;
use crate::plugins::render::Opacity;
use crate::plugins::session::SessionState;
use crate::plugins::world::{SolidMap, probe};

pub use state::{PickupPhase, PickupState};

/// Horizontal damping per tick once a pickup touches the ground.
const GROUND_DAMPING: f32 = 0.8;
/// Upward drift of a collected pickup.
const COLLECT_RISE: f32 = 40.0;

pub fn plugin(app: &mut App) {
    app.add_systems(FixedUpdate, pickup_motion.in_set(CombatSet::Decide))
        .add_systems(FixedUpdate, collect_pickups.in_set(CombatSet::Resolve))
        .add_systems(
            FixedUpdate,
            (spawn_drops, pickup_lifecycle).chain().in_set(CombatSet::Aftermath),
        );
}

fn color(kind: PickupKind) -> Color {
    match kind {
        PickupKind::Coin => Color::srgb(1.0, 0.84, 0.2),
        PickupKind::Heart => Color::srgb(0.9, 0.2, 0.3),
    }
}

/// Launch velocity of drop `i` of `n`: a fan centred on straight up.
pub fn scatter_velocity(i: u32, n: u32, step_deg: f32, speed: f32) -> Vec2 {
    let start = -(n.saturating_sub(1) as f32) * step_deg * 0.5;
    let angle = (start + i as f32 * step_deg).to_radians();
    Vec2::new(angle.sin() * speed, (angle.cos() * speed).abs())
}

// ----- Systems -----

fn spawn_drops(
    mut commands: Commands,
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut rng: ResMut<CombatRng>,
    mut reader: MessageReader<DropSpawned>,
) {
    let now = clock.now();
    let tuning = &tunables.pickups;
    let (lo, hi) = tuning.scatter_speed;

    for drop in reader.read() {
        let spec = *tuning.spec(drop.kind);
        for i in 0..drop.count {
            let speed = rng.range_f32(lo, hi);
            let v = scatter_velocity(i, drop.count, tuning.scatter_step_deg, speed);
            commands.spawn((
                Name::new(format!("{:?}", drop.kind)),
                PickupState::new(drop.kind, spec, now),
                Sprite::from_color(color(drop.kind), spec.size),
                Opacity::default(),
                Transform::from_translation(drop.origin.extend(2.0)),
                walker_body(Collider::rectangle(spec.size.x, spec.size.y)),
                LinearVelocity(v),
                CollisionLayers::new(Layer::Pickup, [Layer::World]),
                DespawnOnExit(GameState::InGame),
            ));
        }
    }
}

fn pickup_motion(
    tunables: Res<Tunables>,
    map: Option<Res<SolidMap>>,
    mut q: Query<(&PickupState, &Transform, &mut LinearVelocity)>,
) {
    let map = map.as_deref();
    for (state, tf, mut vel) in &mut q {
        if !state.is_live() {
            continue;
        }
        let size = tunables.pickups.spec(state.kind).size;
        if !probe::grounded(map, &Aabb::new(tf.translation.truncate(), size)) {
            continue;
        }

        vel.x *= GROUND_DAMPING;
        if vel.x.abs() < 1.0 {
            vel.x = 0.0;
        }
        if state.kind == PickupKind::Heart && vel.y.abs() < 10.0 {
            vel.y = tunables.pickups.heart_bob_speed;
        }
    }
}

fn collect_pickups(
    mut commands: Commands,
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut session: ResMut<SessionState>,
    mut collected: MessageWriter<PickupCollected>,
    mut q_player: Query<(Entity, &mut ActorState, &Transform, &Hurtbox), With<Player>>,
    mut q: Query<(Entity, &mut PickupState, &Transform, &mut LinearVelocity), Without<Player>>,
) {
    let Ok((collector, mut actor, ptf, hurtbox)) = q_player.single_mut() else {
        return;
    };
    if actor.is_dead() {
        return;
    }

    let now = clock.now();
    let body = hurtbox.at(ptf.translation.truncate());

    for (pickup, mut state, tf, mut vel) in &mut q {
        if !state.is_live() {
            continue;
        }
        let size = tunables.pickups.spec(state.kind).size;
        if !Aabb::new(tf.translation.truncate(), size).overlaps(&body) {
            continue;
        }

        let Some(amount) = state.collect(&mut actor, &mut session, &tunables.pickups, now) else {
            debug!("{:?} left on the ground", state.kind);
            continue;
        };

        vel.0 = Vec2::new(0.0, COLLECT_RISE);
        commands
            .entity(pickup)
            .insert((GravityScale(0.0), CollisionLayers::new(Layer::Pickup, [] as [Layer; 0])));
        collected.write(PickupCollected { pickup, kind: state.kind, collector, amount });
    }
}

fn pickup_lifecycle(
    mut commands: Commands,
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut q: Query<(Entity, &mut PickupState, &mut Opacity, &mut Sprite), Without<PendingDespawn>>,
) {
    let now = clock.now();
    let fade = tunables.pickups.expire_fade_ms;

    for (e, mut state, mut opacity, mut sprite) in &mut q {
        if state.tick(now) {
            debug!("{:?} {e} expired", state.kind);
        }

        let alpha = state.alpha(now, fade);
        if opacity.0 != alpha {
            opacity.0 = alpha;
        }

        if state.phase(now) == PickupPhase::Collected {
            let p = state.closing_progress(now, fade).unwrap_or(1.0);
            sprite.custom_size = Some(tunables.pickups.spec(state.kind).size * (1.0 - p));
        }

        if state.should_remove(now, fade) {
            commands.entity(e).insert(PendingDespawn);
        }
    }
}
