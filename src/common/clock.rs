//! Gameplay clock.
//!
//! All combat timing is expressed as elapsed milliseconds on a monotonic clock
//! that only advances inside the fixed step. Nothing in the combat core counts
//! frames, so behaviour is independent of render frame rate.

use std::time::Duration;

use bevy::prelude::*;

/// Monotonic gameplay time in whole milliseconds.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    now_ms: u64,
    // Sub-millisecond remainder carried between ticks.
    carry_us: u64,
}

impl GameClock {
    #[inline]
    pub fn at(now_ms: u64) -> Self {
        Self { now_ms, carry_us: 0 }
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    #[inline]
    pub fn advance(&mut self, dt: Duration) {
        let total_us = self.carry_us + dt.as_micros() as u64;
        self.now_ms += total_us / 1000;
        self.carry_us = total_us % 1000;
    }

    /// Milliseconds elapsed since `then`, saturating at zero.
    #[inline]
    pub fn since(&self, then: u64) -> u64 {
        self.now_ms.saturating_sub(then)
    }
}

/// Advance the gameplay clock by the fixed-step delta.
pub fn advance_clock(time: Res<Time<Fixed>>, mut clock: ResMut<GameClock>) {
    clock.advance(time.delta());
}
