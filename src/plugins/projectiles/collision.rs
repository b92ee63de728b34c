//! Wave contact resolution.
//!
//! Waves are sensors; contact is decided with the same inclusive box overlap the
//! melee pipeline uses, against the player's hurtbox. The first overlap consumes the
//! wave even when the hit itself is ignored (invincible player), so a wave never lands
//! twice and never lingers inside the player waiting for invincibility to drop.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::{PooledWave, Wave, WaveState};
use crate::common::bounds::{Aabb, Hurtbox};
use crate::common::clock::GameClock;
use crate::common::tunables::Tunables;
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::damage::{HitOutcome, IncomingHit, resolve_hit};
use crate::plugins::combat::messages::{ActorDied, ActorHit};
use crate::plugins::combat::timeline::Timeline;
use crate::plugins::combat::{HitTarget, apply_hit_effects, toughness_for};
use crate::plugins::player::Player;
use crate::plugins::session::DerivedStats;

pub fn process_wave_contacts(
    clock: Res<GameClock>,
    tunables: Res<Tunables>,
    mut hits: MessageWriter<ActorHit>,
    mut deaths: MessageWriter<ActorDied>,
    mut waves: Query<(Entity, &Transform, &mut Wave, &mut WaveState), (With<PooledWave>, Without<Player>)>,
    mut player: Query<
        (
            Entity,
            &mut ActorState,
            &Transform,
            &Hurtbox,
            Option<&mut LinearVelocity>,
            Option<&mut Timeline>,
            Option<&DerivedStats>,
        ),
        With<Player>,
    >,
) {
    let Ok((target, mut state, ptf, hurtbox, mut vel, mut timeline, stats)) = player.single_mut()
    else {
        return;
    };

    let now = clock.now();
    let size = tunables.boss.transition.wave_size;
    let target_pos = ptf.translation.truncate();
    let body = hurtbox.at(target_pos);
    let toughness = toughness_for(None, &tunables, stats);

    for (e, tf, mut wave, mut wave_state) in &mut waves {
        if *wave_state != WaveState::Active || wave.already_hit || state.is_dead() {
            continue;
        }
        let pos = tf.translation.truncate();
        if !Aabb::new(pos, size).overlaps(&body) {
            continue;
        }

        wave.already_hit = true;
        *wave_state = WaveState::PendingReturn;

        let hit = IncomingHit { base_damage: wave.damage, attacker_x: pos.x, lifesteal: 0.0 };
        let HitOutcome::Landed { damage, knockback, lethal, .. } =
            resolve_hit(&mut state, target_pos.x, &hit, &toughness, now)
        else {
            debug!("wave {e} absorbed without damage");
            continue;
        };

        let hit_target = HitTarget {
            entity: target,
            pos: target_pos,
            kind: None,
            vel: vel.as_mut().map(|v| v.reborrow()),
            timeline: timeline.as_mut().map(|t| t.reborrow()),
        };
        let decay_ms = tunables.player.knockback_decay_ms;
        if let Some(died) = apply_hit_effects(hit_target, knockback, lethal, decay_ms, now) {
            deaths.write(died);
        }

        hits.write(ActorHit { target, source: wave.source.unwrap_or(e), damage, lethal });
    }
}
