//! Spawn consumer: activate waves from the pool.
//!
//! The pool free list only ever holds entities spawned by `init_wave_pool`, so a
//! failed lookup means something else despawned a pooled wave. That is logged and
//! the slot is dropped rather than crashing mid-fight.

use std::f32::consts::{FRAC_PI_4, TAU};

use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::{PooledWave, Wave, WaveEntity, WaveState};
use super::pool::{WavePool, active_wave_layers};
use crate::common::clock::GameClock;
use crate::common::tunables::{TransitionTuning, Tunables};
use crate::plugins::combat::messages::WaveBurstRequest;

/// Velocities for one ring. Waves are spread evenly; each burst rotates the ring by
/// `burst * (PI / 4) / bursts` so consecutive rings interleave.
pub fn ring_velocities(burst: u32, t: &TransitionTuning) -> impl Iterator<Item = Vec2> + '_ {
    let count = t.waves_per_burst.max(1);
    let offset = burst as f32 * FRAC_PI_4 / t.wave_count.max(1) as f32;
    (0..count).map(move |i| {
        let angle = i as f32 * TAU / count as f32 + offset;
        Vec2::from_angle(angle) * t.wave_speed
    })
}

pub fn allocate_waves_from_pool(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut pool: ResMut<WavePool>,
    mut reader: MessageReader<WaveBurstRequest>,
    mut q: Query<
        (
            &mut WaveState,
            &mut Wave,
            &mut Transform,
            &mut LinearVelocity,
            &mut Visibility,
            &mut CollisionLayers,
        ),
        With<PooledWave>,
    >,
) {
    let t = &tunables.boss.transition;
    let expires_at = clock.now() + t.wave_lifetime_ms;

    for req in reader.read() {
        for v in ring_velocities(req.burst, t) {
            let Some(WaveEntity(e)) = pool.pop_free() else {
                // Capacity decision, not a correctness failure.
                debug!("wave pool empty, burst {} truncated", req.burst);
                break;
            };

            let Ok((mut state, mut wave, mut tf, mut vel, mut vis, mut layers)) = q.get_mut(e) else {
                warn!("pooled wave {e} is missing its components");
                continue;
            };

            *state = WaveState::Active;
            wave.reset_for_fire(t.wave_damage, expires_at, req.source);
            tf.translation = req.origin.extend(3.0);
            vel.0 = v;
            *vis = Visibility::Visible;
            *layers = active_wave_layers();
        }
    }
}
