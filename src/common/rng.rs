//! Seeded randomness for drops, scatter and teleport offsets.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Resource, Debug, Clone)]
pub struct CombatRng(pub ChaCha8Rng);

impl CombatRng {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// True with probability `p` (values >= 1.0 always succeed).
    #[inline]
    pub fn chance(&mut self, p: f32) -> bool {
        p >= 1.0 || (p > 0.0 && self.0.r#gen::<f32>() < p)
    }

    /// Inclusive integer range.
    #[inline]
    pub fn between(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo { lo } else { self.0.gen_range(lo..=hi) }
    }

    #[inline]
    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo { lo } else { self.0.gen_range(lo..hi) }
    }

    #[inline]
    pub fn sign(&mut self) -> f32 {
        if self.0.r#gen::<bool>() { 1.0 } else { -1.0 }
    }
}

impl Default for CombatRng {
    fn default() -> Self {
        Self::seeded(0x5EED_F0E5_7000_0001)
    }
}
