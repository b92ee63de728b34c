//! Projectiles plugin: boss shock waves, message-driven and pooled.
//!
//! # Data flow
//! ```text
//!   Startup
//!     init_wave_pool            pre-spawns hidden waves into WavePool.free
//!
//!   FixedUpdate
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ CombatSet::Decide                                                    │
//! │   (A) Producer: boss_ai                                              │
//! │       - writes: WaveBurstRequest { source, origin, burst }           │
//! │                                                                      │
//! │ CombatSet::Resolve                                                   │
//! │   (B) Consumer: allocate_waves_from_pool                             │
//! │       - reads: WaveBurstRequest                                      │
//! │       - mutates: WavePool.free, WaveState, Wave, Transform,          │
//! │                  LinearVelocity, Visibility, CollisionLayers         │
//! │   (C) process_wave_contacts                                          │
//! │       - reads: player hurtbox, Wave bounds                           │
//! │       - resolve_hit on first contact, WaveState -> PendingReturn     │
//! │       - writes: ActorHit, ActorDied                                  │
//! │                                                                      │
//! │ CombatSet::Aftermath                                                 │
//! │   (D) expire_waves            lifetime over -> PendingReturn         │
//! │   (E) return_to_pool_commit   Inactive invariants, push free         │
//! └──────────────────────────────────────────────────────────────────────┘
//!
//! Feedback loop:
//!   commit pushes WaveEntity back into WavePool.free
//!   allocator pops WaveEntity from WavePool.free
//! ```
//!
//! The boss never borrows the pool. It only enqueues intent, and the allocator is
//! the single writer of `WavePool`. An empty pool truncates a burst.

pub mod allocator;
pub mod collision;
pub mod commit;
pub mod components;
pub mod pool;

use bevy::prelude::*;

use crate::common::state::GameState;
use crate::plugins::combat::CombatSet;

/// Two full transitions of waves with room to spare.
pub const POOL_CAPACITY: usize = 32;

pub struct ProjectilesPlugin;

impl Plugin for ProjectilesPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(pool::WavePool::new(POOL_CAPACITY))
            .add_systems(Startup, pool::init_wave_pool);

        app.add_systems(
            FixedUpdate,
            (allocator::allocate_waves_from_pool, collision::process_wave_contacts)
                .chain()
                .in_set(CombatSet::Resolve),
        )
        .add_systems(
            FixedUpdate,
            (commit::expire_waves, commit::return_to_pool_commit)
                .chain()
                .in_set(CombatSet::Aftermath),
        )
        .add_systems(
            OnExit(GameState::InGame),
            (commit::recall_waves, commit::return_to_pool_commit).chain(),
        );
    }
}

#[cfg(test)]
mod tests;
