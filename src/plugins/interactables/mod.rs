//! Interactables plugin: chests and save points.
//!
//! The player's interact press is consumed here. Every object whose bounds overlap the
//! player's hurtbox reacts to it:
//! - a closed chest opens once, drops coins, and later hearts (and, for the large chest,
//!   the boss trigger);
//! - a save point captures a `SaveSnapshot` into the session.

use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::bounds::{Aabb, Hurtbox};
use crate::common::clock::GameClock;
use crate::common::rng::CombatRng;
use crate::common::state::GameState;
use crate::common::tunables::{ChestTable, Tunables};
use crate::plugins::combat::CombatSet;
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::messages::{BossTriggered, DropSpawned, PickupKind};
use crate::plugins::player::{Player, PlayerInput};
use crate::plugins::session::SessionState;
use crate::plugins::world::LevelLayout;

const CHEST_SIZE: Vec2 = Vec2::new(24.0, 20.0);
const SAVE_POINT_SIZE: Vec2 = Vec2::new(16.0, 32.0);
/// Drops leave the chest from just above its lid.
const DROP_LIFT: f32 = 10.0;

// ----- Components -----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestSize {
    Small,
    Large,
}

#[derive(Component, Debug, Clone)]
pub struct Chest {
    pub size: ChestSize,
    pub opened: bool,
    pending_hearts: Option<(u64, u32)>,
    boss_trigger_at: Option<u64>,
}

impl Chest {
    pub fn new(size: ChestSize) -> Self {
        Self { size, opened: false, pending_hearts: None, boss_trigger_at: None }
    }

    pub fn table<'a>(&self, tunables: &'a Tunables) -> &'a ChestTable {
        match self.size {
            ChestSize::Small => &tunables.small_chest,
            ChestSize::Large => &tunables.large_chest,
        }
    }

    /// Open the chest and roll its contents. Returns the coins to drop now, or `None`
    /// if it was already open. Hearts and the boss trigger are queued.
    pub fn open(
        &mut self,
        table: &ChestTable,
        rng: &mut CombatRng,
        now: u64,
        boss_delay_ms: u64,
    ) -> Option<u32> {
        if self.opened {
            return None;
        }
        self.opened = true;

        let coins = rng.between(table.coins.0, table.coins.1);
        if rng.chance(table.heart_chance) {
            let hearts = rng.between(table.hearts.0, table.hearts.1);
            self.pending_hearts = Some((now + table.heart_delay_ms, hearts));
        }
        if table.triggers_boss {
            self.boss_trigger_at = Some(now + boss_delay_ms);
        }
        Some(coins)
    }

    /// Hearts whose delay has elapsed, handed out once.
    pub fn take_due_hearts(&mut self, now: u64) -> Option<u32> {
        match self.pending_hearts {
            Some((at, count)) if now >= at => {
                self.pending_hearts = None;
                Some(count)
            }
            _ => None,
        }
    }

    pub fn take_due_boss_trigger(&mut self, now: u64) -> bool {
        match self.boss_trigger_at {
            Some(at) if now >= at => {
                self.boss_trigger_at = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct SavePoint;

// ----- Plugin -----

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(GameState::InGame), spawn_objects)
        .add_systems(FixedUpdate, interact.in_set(CombatSet::Decide))
        .add_systems(FixedUpdate, chest_followups.in_set(CombatSet::Aftermath));
}

fn spawn_objects(mut commands: Commands, layout: Option<Res<LevelLayout>>) {
    let Some(layout) = layout else {
        warn!("no level layout; no chests or save points");
        return;
    };

    for &(size, pos) in &layout.chests {
        let color = match size {
            ChestSize::Small => Color::srgb(0.6, 0.4, 0.2),
            ChestSize::Large => Color::srgb(0.8, 0.6, 0.15),
        };
        commands.spawn((
            Name::new(format!("{size:?}Chest")),
            Chest::new(size),
            Sprite::from_color(color, CHEST_SIZE),
            Transform::from_translation(pos.extend(0.5)),
            DespawnOnExit(GameState::InGame),
        ));
    }

    for &pos in &layout.save_points {
        commands.spawn((
            Name::new("SavePoint"),
            SavePoint,
            Sprite::from_color(Color::srgb(0.3, 0.7, 0.9), SAVE_POINT_SIZE),
            Transform::from_translation(pos.extend(0.5)),
            DespawnOnExit(GameState::InGame),
        ));
    }
}

// ----- Systems -----

fn interact(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut input: ResMut<PlayerInput>,
    mut rng: ResMut<CombatRng>,
    mut session: ResMut<SessionState>,
    mut drops: MessageWriter<DropSpawned>,
    q_player: Query<(&ActorState, &Transform, &Hurtbox), With<Player>>,
    mut q_chests: Query<(&mut Chest, &Transform), Without<Player>>,
    q_saves: Query<&Transform, (With<SavePoint>, Without<Player>)>,
) {
    if !std::mem::take(&mut input.interact) {
        return;
    }
    let Ok((state, ptf, hurtbox)) = q_player.single() else {
        return;
    };
    if state.is_dead() {
        return;
    }

    let now = clock.now();
    let pos = ptf.translation.truncate();
    let body = hurtbox.at(pos);

    for (mut chest, tf) in &mut q_chests {
        let at = tf.translation.truncate();
        if chest.opened || !Aabb::new(at, CHEST_SIZE).overlaps(&body) {
            continue;
        }
        let table = *chest.table(&tunables);
        let Some(coins) = chest.open(&table, &mut rng, now, tunables.boss.trigger_delay_ms) else {
            continue;
        };
        info!("{:?} chest opened: {coins} coins", chest.size);
        if coins > 0 {
            drops.write(DropSpawned {
                kind: PickupKind::Coin,
                origin: at + Vec2::Y * DROP_LIFT,
                count: coins,
            });
        }
    }

    for tf in &q_saves {
        if Aabb::new(tf.translation.truncate(), SAVE_POINT_SIZE).overlaps(&body) {
            session.capture(pos, state);
            info!("game saved at {pos}");
        }
    }
}

fn chest_followups(
    clock: Res<GameClock>,
    mut drops: MessageWriter<DropSpawned>,
    mut trigger: MessageWriter<BossTriggered>,
    mut q: Query<(&mut Chest, &Transform)>,
) {
    let now = clock.now();
    for (mut chest, tf) in &mut q {
        if let Some(count) = chest.take_due_hearts(now).filter(|&c| c > 0) {
            drops.write(DropSpawned {
                kind: PickupKind::Heart,
                origin: tf.translation.truncate() + Vec2::Y * DROP_LIFT,
                count,
            });
        }
        if chest.take_due_boss_trigger(now) {
            debug!("{:?} chest released the boss", chest.size);
            trigger.write(BossTriggered);
        }
    }
}
