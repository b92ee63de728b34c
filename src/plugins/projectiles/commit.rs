//! Return commit: recycle waves back into the pool.
//!
//! This system owns the Inactive invariants. Inactive waves are hidden, still, and
//! collide with nothing.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::{PooledWave, Wave, WaveEntity, WaveState};
use super::pool::{WavePool, inactive_wave_layers};
use crate::common::clock::GameClock;

/// Lifetime expiry: active waves past `expires_at` are queued for return.
pub fn expire_waves(clock: Res<GameClock>, mut q: Query<(&Wave, &mut WaveState), With<PooledWave>>) {
    let now = clock.now();
    for (wave, mut state) in &mut q {
        if *state == WaveState::Active && wave.expired(now) {
            *state = WaveState::PendingReturn;
        }
    }
}

/// Pull every live wave back, used when leaving the level.
pub fn recall_waves(mut q: Query<&mut WaveState, With<PooledWave>>) {
    for mut state in &mut q {
        if *state == WaveState::Active {
            *state = WaveState::PendingReturn;
        }
    }
}

pub fn return_to_pool_commit(
    mut pool: ResMut<WavePool>,
    mut q: Query<
        (
            Entity,
            &mut WaveState,
            &mut Visibility,
            &mut LinearVelocity,
            &mut CollisionLayers,
        ),
        With<PooledWave>,
    >,
) {
    for (e, mut state, mut vis, mut vel, mut layers) in &mut q {
        if *state != WaveState::PendingReturn {
            continue;
        }

        *state = WaveState::Inactive;
        *vis = Visibility::Hidden;
        vel.0 = Vec2::ZERO;
        *layers = inactive_wave_layers();

        pool.push_free(WaveEntity(e));
    }
}
