//! Damage pipeline.
//!
//! `resolve_hit` is the single point where HP is removed. Steps run in a fixed order:
//! reject, compute, knockback, subtract, death or reaction, lifesteal. The caller
//! applies the returned knockback velocity and publishes messages.

use crate::common::tunables::HitReaction;
use crate::plugins::combat::actor::ActorState;

/// One incoming hit, as seen by the target.
#[derive(Debug, Clone, Copy)]
pub struct IncomingHit {
    pub base_damage: f32,
    pub attacker_x: f32,
    pub lifesteal: f32,
}

/// How a target mitigates and reacts.
#[derive(Debug, Clone, Copy)]
pub struct Toughness {
    /// Fraction of damage taken while defending (0.3 means 70% blocked).
    pub defense_reduction: f32,
    /// Additive bonus that lowers `defense_reduction`.
    pub defense_bonus: f32,
    /// Lowest fraction defending can reach.
    pub defense_floor: f32,
    pub reaction: HitReaction,
    pub defend_reaction: HitReaction,
}

impl Toughness {
    /// Reaction shared by defending and non-defending hits (actors that never defend).
    pub fn plain(reaction: HitReaction) -> Self {
        Self {
            defense_reduction: 1.0,
            defense_bonus: 0.0,
            defense_floor: 0.1,
            reaction,
            defend_reaction: reaction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    /// Dead, invincible or immune target: nothing changed.
    Ignored,
    Landed {
        damage: f32,
        /// Signed horizontal velocity to put on the target.
        knockback: f32,
        lethal: bool,
        /// HP the attacker should regain.
        lifesteal_heal: f32,
    },
}

impl HitOutcome {
    #[inline]
    pub fn is_lethal(&self) -> bool {
        matches!(self, HitOutcome::Landed { lethal: true, .. })
    }
}

/// Damage after defence. Never below `floor(base * defense_floor)` while defending.
#[inline]
pub fn mitigated_damage(base: f32, defending: bool, t: &Toughness) -> f32 {
    if !defending {
        return base;
    }
    let factor = (t.defense_reduction - t.defense_bonus).max(t.defense_floor);
    (base * factor).floor()
}

/// +1 pushes toward +x. Targets to the right of (or level with) the attacker go right.
#[inline]
pub fn knockback_sign(attacker_x: f32, target_x: f32) -> f32 {
    if attacker_x <= target_x { 1.0 } else { -1.0 }
}

pub fn resolve_hit(
    target: &mut ActorState,
    target_x: f32,
    hit: &IncomingHit,
    toughness: &Toughness,
    now: u64,
) -> HitOutcome {
    if target.is_dead() || target.is_invincible(now) || target.immune {
        return HitOutcome::Ignored;
    }

    let defending = target.is_defending();
    let damage = mitigated_damage(hit.base_damage, defending, toughness);
    let reaction = if defending { toughness.defend_reaction } else { toughness.reaction };

    // Knockback is decided before the death check so a lethal hit still throws the body.
    let knockback = knockback_sign(hit.attacker_x, target_x) * reaction.knockback;

    let removed = target.remove_hp(damage);
    let lethal = target.hp() <= 0.0;

    if lethal {
        target.die();
    } else {
        target.stun(now, reaction.stun_ms);
        target.grant_invincibility(now, reaction.invincible_ms);
    }

    let lifesteal_heal = if hit.lifesteal > 0.0 && removed > 0.0 {
        (removed * hit.lifesteal).floor()
    } else {
        0.0
    };

    HitOutcome::Landed { damage: removed, knockback, lethal, lifesteal_heal }
}
