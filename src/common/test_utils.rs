//! Test helpers.
//!
//! Systems that use `Commands` enqueue structural changes; we call `world.flush()` after
//! running so queued commands are applied before assertions.

use bevy::ecs::message::Messages;
use bevy::ecs::system::{IntoSystem, RunSystemOnce};
use bevy::prelude::*;

use crate::common::clock::GameClock;
use crate::common::rng::CombatRng;
use crate::common::tunables::Tunables;
use crate::plugins::combat::messages::register_messages;
use crate::plugins::session::SessionState;

/// Run a system once on the given world, then flush deferred commands.
/// Returns the system output.
pub fn run_system_once<T, Out, Marker>(world: &mut World, system: T) -> Out
where
    T: IntoSystem<(), Out, Marker>,
{
    let out = world.run_system_once(system).expect("system run failed");
    world.flush();
    out
}

/// A world with the resources every combat system expects, clock set to `now_ms`.
pub fn combat_world(now_ms: u64) -> World {
    let mut world = World::new();
    world.insert_resource(Tunables::default());
    world.insert_resource(GameClock::at(now_ms));
    world.insert_resource(CombatRng::seeded(7));
    world.insert_resource(SessionState::default());
    register_messages(&mut world);
    world
}

/// Move the clock to an absolute time.
pub fn set_now(world: &mut World, now_ms: u64) {
    *world.resource_mut::<GameClock>() = GameClock::at(now_ms);
}

/// Drain every pending message of type `M` from the world.
pub fn drain<M: Message + Clone>(world: &mut World) -> Vec<M> {
    world.resource_mut::<Messages<M>>().drain().collect()
}
