//! Outward notifications and the hitbox hand-off.
//!
//! Producers write, any number of subscribers read. Nothing in the combat core
//! depends on a subscriber existing.

use bevy::ecs::message::Messages;
use bevy::prelude::*;

use crate::common::bounds::Aabb;
use crate::plugins::combat::{AttackKind, Team};
use crate::plugins::enemies::EnemyKind;

/// A live hitbox. Resolved once against every overlapping opposing actor, then gone.
#[derive(Message, Debug, Clone, Copy)]
pub struct AttackEvent {
    pub source: Entity,
    pub team: Team,
    pub kind: AttackKind,
    pub source_x: f32,
    pub bounds: Aabb,
    pub damage: f32,
    pub lifesteal: f32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct ActorAttacked {
    pub actor: Entity,
    pub kind: AttackKind,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct ActorHit {
    pub target: Entity,
    pub source: Entity,
    pub damage: f32,
    pub lethal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victim {
    Player,
    Enemy(EnemyKind),
}

#[derive(Message, Debug, Clone, Copy)]
pub struct ActorDied {
    pub actor: Entity,
    pub victim: Victim,
    pub position: Vec2,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct BossTriggered;

#[derive(Message, Debug, Clone, Copy)]
pub struct BossPhaseChanged {
    pub boss: Entity,
    pub phase: u32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct BossDefeated {
    pub boss: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Coin,
    Heart,
}

/// Request to scatter `count` pickups of one kind around `origin`.
#[derive(Message, Debug, Clone, Copy)]
pub struct DropSpawned {
    pub kind: PickupKind,
    pub origin: Vec2,
    pub count: u32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct PickupCollected {
    pub pickup: Entity,
    pub kind: PickupKind,
    pub collector: Entity,
    /// Currency gained or HP restored.
    pub amount: f32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct RespawnRequested {
    pub actor: Entity,
}

/// One ring of boss shock waves, consumed by the projectile spawner.
#[derive(Message, Debug, Clone, Copy)]
pub struct WaveBurstRequest {
    pub source: Entity,
    pub origin: Vec2,
    /// Index within the transition; rotates the ring.
    pub burst: u32,
}

/// Register message storage on an `App`.
pub fn add_messages(app: &mut App) {
    app.add_message::<AttackEvent>()
        .add_message::<ActorAttacked>()
        .add_message::<ActorHit>()
        .add_message::<ActorDied>()
        .add_message::<BossTriggered>()
        .add_message::<BossPhaseChanged>()
        .add_message::<BossDefeated>()
        .add_message::<DropSpawned>()
        .add_message::<PickupCollected>()
        .add_message::<RespawnRequested>()
        .add_message::<WaveBurstRequest>();
}

/// Register message storage directly on a `World` (unit tests without an `App`).
pub fn register_messages(world: &mut World) {
    world.init_resource::<Messages<AttackEvent>>();
    world.init_resource::<Messages<ActorAttacked>>();
    world.init_resource::<Messages<ActorHit>>();
    world.init_resource::<Messages<ActorDied>>();
    world.init_resource::<Messages<BossTriggered>>();
    world.init_resource::<Messages<BossPhaseChanged>>();
    world.init_resource::<Messages<BossDefeated>>();
    world.init_resource::<Messages<DropSpawned>>();
    world.init_resource::<Messages<PickupCollected>>();
    world.init_resource::<Messages<RespawnRequested>>();
    world.init_resource::<Messages<WaveBurstRequest>>();
}
