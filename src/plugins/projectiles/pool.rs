use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::{PooledWave, Wave, WaveEntity, WaveState};
use crate::common::layers::Layer;
use crate::common::tunables::Tunables;

#[derive(Resource, Debug)]
pub struct WavePool {
    free: Vec<WaveEntity>,
    capacity: usize,
}

impl WavePool {
    pub fn new(capacity: usize) -> Self {
        Self { free: Vec::with_capacity(capacity), capacity }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn pop_free(&mut self) -> Option<WaveEntity> {
        self.free.pop()
    }

    #[inline]
    pub fn push_free(&mut self, e: WaveEntity) {
        self.free.push(e);
    }
}

#[inline]
pub fn active_wave_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::BossWave, [Layer::Player])
}

/// Parked waves collide with nothing.
#[inline]
pub fn inactive_wave_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::BossWave, [] as [Layer; 0])
}

/// Pre-spawn the pool, hidden and parked.
pub fn init_wave_pool(mut commands: Commands, mut pool: ResMut<WavePool>, tunables: Res<Tunables>) {
    pool.free.clear();
    let size = tunables.boss.transition.wave_size;

    for _ in 0..pool.capacity {
        let e = commands
            .spawn((
                Name::new("Wave(Pooled)"),
                PooledWave,
                WaveState::Inactive,
                Wave::idle(),
                Sprite::from_color(Color::srgb(0.55, 0.25, 0.85), size),
                Transform::from_xyz(0.0, 0.0, 3.0),
                Visibility::Hidden,
                RigidBody::Kinematic,
                Collider::rectangle(size.x, size.y),
                Sensor,
                inactive_wave_layers(),
                LinearVelocity(Vec2::ZERO),
            ))
            .id();

        pool.free.push(WaveEntity(e));
    }
    debug!("wave pool ready ({} waves)", pool.capacity);
}
