use bevy::prelude::*;

/// Marker for every entity owned by the wave pool.
#[derive(Component)]
pub struct PooledWave;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveState {
    #[default]
    Inactive,
    Active,
    PendingReturn,
}

/// Boss shock wave payload.
#[derive(Component, Debug, Clone)]
pub struct Wave {
    pub damage: f32,
    pub expires_at: u64,
    /// Boss that fired the burst.
    pub source: Option<Entity>,
    /// Set on first contact with the player; a wave never hits twice.
    pub already_hit: bool,
}

impl Wave {
    pub const fn idle() -> Self {
        Self { damage: 0.0, expires_at: 0, source: None, already_hit: false }
    }

    #[inline]
    pub fn reset_for_fire(&mut self, damage: f32, expires_at: u64, source: Entity) {
        self.damage = damage;
        self.expires_at = expires_at;
        self.source = Some(source);
        self.already_hit = false;
    }

    #[inline]
    pub fn expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Entity known to carry the pooled wave components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveEntity(pub Entity);
