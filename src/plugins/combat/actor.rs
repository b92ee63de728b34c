//! Shared actor state: the player, every enemy and the boss carry one.
//!
//! Invariants kept by construction:
//! - `0 <= hp <= max_hp`, and `hp == 0` exactly when the actor is dead.
//! - Death is terminal: only `reset` leaves it.
//! - Stun and attacking never coexist; stunning cancels the current activation.
//! - Every attack gets a fresh activation id. Delayed work carries the id it was
//!   scheduled under and is dropped when the id no longer matches.

use bevy::prelude::*;

use crate::common::tunables::AttackSpec;
use crate::plugins::combat::AttackKind;

#[derive(Component, Debug, Clone, PartialEq)]
pub struct ActorState {
    max_hp: f32,
    hp: f32,
    max_sp: f32,
    sp: f32,
    pub facing_right: bool,
    dead: bool,
    attacking: Option<AttackKind>,
    defending: bool,
    /// Damage is silently dropped while set (boss phase transitions).
    pub immune: bool,
    stunned_until: Option<u64>,
    invincible_until: Option<u64>,
    pub last_attack_at: Option<u64>,
    pub attack_interval_ms: u64,
    activation: u32,
    hitbox_fired: bool,
    combo_window: bool,
    combo_queued: bool,
}

impl ActorState {
    pub fn new(max_hp: f32, max_sp: f32, attack_interval_ms: u64) -> Self {
        Self {
            max_hp,
            hp: max_hp,
            max_sp,
            sp: max_sp,
            facing_right: true,
            dead: false,
            attacking: None,
            defending: false,
            immune: false,
            stunned_until: None,
            invincible_until: None,
            last_attack_at: None,
            attack_interval_ms,
            activation: 0,
            hitbox_fired: false,
            combo_window: false,
            combo_queued: false,
        }
    }

    // ----- Read access -----

    #[inline]
    pub fn hp(&self) -> f32 {
        self.hp
    }

    #[inline]
    pub fn max_hp(&self) -> f32 {
        self.max_hp
    }

    #[inline]
    pub fn sp(&self) -> f32 {
        self.sp
    }

    #[inline]
    pub fn max_sp(&self) -> f32 {
        self.max_sp
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    #[inline]
    pub fn is_full_health(&self) -> bool {
        self.hp >= self.max_hp
    }

    #[inline]
    pub fn is_stunned(&self, now: u64) -> bool {
        self.stunned_until.is_some_and(|t| now < t)
    }

    #[inline]
    pub fn is_invincible(&self, now: u64) -> bool {
        self.invincible_until.is_some_and(|t| now < t)
    }

    #[inline]
    pub fn is_attacking(&self) -> bool {
        self.attacking.is_some()
    }

    #[inline]
    pub fn attack_kind(&self) -> Option<AttackKind> {
        self.attacking
    }

    #[inline]
    pub fn is_defending(&self) -> bool {
        self.defending
    }

    #[inline]
    pub fn activation(&self) -> u32 {
        self.activation
    }

    #[inline]
    pub fn combo_window_open(&self) -> bool {
        self.combo_window
    }

    #[inline]
    pub fn combo_queued(&self) -> bool {
        self.combo_queued
    }

    #[inline]
    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0.0 { 0.0 } else { self.hp / self.max_hp }
    }

    /// Inclusive: an attempt exactly at the interval boundary is allowed.
    #[inline]
    pub fn cooldown_ready(&self, now: u64) -> bool {
        self.last_attack_at
            .is_none_or(|t| now.saturating_sub(t) >= self.attack_interval_ms)
    }

    // ----- Attack timeline -----

    /// Start an attack activation. Returns the new activation id, or `None` when the
    /// attempt is rejected (dead, stunned, defending, busy, cooling down, or short on
    /// stamina).
    pub fn try_begin_attack(&mut self, kind: AttackKind, spec: &AttackSpec, now: u64) -> Option<u32> {
        if self.dead || self.is_stunned(now) || self.defending || self.attacking.is_some() {
            return None;
        }
        if self.sp < spec.cost || !self.cooldown_ready(now) {
            return None;
        }
        self.sp -= spec.cost;
        self.attacking = Some(kind);
        self.last_attack_at = Some(now);
        Some(self.next_activation())
    }

    /// Queue a follow-up while the combo window is open. At most one per base attack.
    pub fn queue_combo(&mut self, cost: f32) -> bool {
        if self.dead || !self.combo_window || self.combo_queued || self.attacking.is_none() {
            return false;
        }
        if self.sp < cost {
            return false;
        }
        self.combo_queued = true;
        true
    }

    /// Chain a queued combo off the finished base attack. Returns the combo's activation.
    pub fn begin_combo(&mut self, activation: u32, cost: f32, now: u64) -> Option<u32> {
        let queued = std::mem::take(&mut self.combo_queued);
        self.combo_window = false;
        if !self.is_current(activation) {
            return None;
        }
        if !queued || self.is_stunned(now) || self.sp < cost {
            self.attacking = None;
            return None;
        }
        self.sp -= cost;
        self.attacking = Some(AttackKind::PlayerCombo);
        Some(self.next_activation())
    }

    #[inline]
    pub fn is_current(&self, activation: u32) -> bool {
        !self.dead && self.attacking.is_some() && self.activation == activation
    }

    /// Claim the hitbox of `activation`. True at most once per activation.
    pub fn claim_hitbox(&mut self, activation: u32) -> bool {
        if !self.is_current(activation) || self.hitbox_fired {
            return false;
        }
        self.hitbox_fired = true;
        true
    }

    pub fn set_combo_window(&mut self, activation: u32, open: bool) {
        if self.is_current(activation) {
            self.combo_window = open;
        }
    }

    pub fn end_attack(&mut self, activation: u32) {
        if self.is_current(activation) {
            self.clear_attack();
        }
    }

    fn next_activation(&mut self) -> u32 {
        self.activation = self.activation.wrapping_add(1);
        self.hitbox_fired = false;
        self.combo_window = false;
        self.combo_queued = false;
        self.activation
    }

    /// Drop the current activation; anything scheduled under it becomes stale.
    fn clear_attack(&mut self) {
        self.attacking = None;
        self.combo_window = false;
        self.combo_queued = false;
        self.activation = self.activation.wrapping_add(1);
    }

    // ----- Defence -----

    /// Returns whether the actor is defending afterwards.
    pub fn set_defending(&mut self, want: bool, now: u64) -> bool {
        self.defending = want
            && !self.dead
            && self.sp > 0.0
            && self.attacking.is_none()
            && !self.is_stunned(now);
        self.defending
    }

    // ----- Damage / status -----

    /// Subtract HP, clamped at zero. Returns what was actually removed.
    pub fn remove_hp(&mut self, amount: f32) -> f32 {
        let removed = amount.max(0.0).min(self.hp);
        self.hp -= removed;
        removed
    }

    /// Enter the dead state. Returns false if already dead.
    pub fn die(&mut self) -> bool {
        if self.dead {
            return false;
        }
        self.dead = true;
        self.hp = 0.0;
        self.defending = false;
        self.stunned_until = None;
        self.clear_attack();
        true
    }

    pub fn stun(&mut self, now: u64, ms: u64) {
        if self.dead || ms == 0 {
            return;
        }
        self.stunned_until = Some(self.stunned_until.unwrap_or(0).max(now + ms));
        if self.attacking.is_some() {
            self.clear_attack();
        }
    }

    pub fn grant_invincibility(&mut self, now: u64, ms: u64) {
        if self.dead || ms == 0 {
            return;
        }
        self.invincible_until = Some(self.invincible_until.unwrap_or(0).max(now + ms));
    }

    /// Drop status deadlines that have passed.
    pub fn clear_expired(&mut self, now: u64) {
        if self.stunned_until.is_some_and(|t| now >= t) {
            self.stunned_until = None;
        }
        if self.invincible_until.is_some_and(|t| now >= t) {
            self.invincible_until = None;
        }
    }

    /// Heal, clamped to max. Returns the amount restored. Dead actors do not heal.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead || amount <= 0.0 {
            return 0.0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.max_hp);
        self.hp - before
    }

    pub fn spend_sp(&mut self, amount: f32) {
        self.sp = (self.sp - amount).max(0.0);
    }

    pub fn recover_sp(&mut self, amount: f32) {
        self.sp = (self.sp + amount).min(self.max_sp);
    }

    /// Restore HP/SP from a snapshot verbatim, clamped into range. A zero-HP
    /// snapshot restores a dead actor.
    pub fn restore(&mut self, hp: f32, sp: f32) {
        self.reset();
        self.hp = hp.clamp(0.0, self.max_hp);
        self.sp = sp.clamp(0.0, self.max_sp);
        self.dead = self.hp == 0.0;
    }

    /// Back to spawn defaults: full HP/SP, every flag cleared.
    pub fn reset(&mut self) {
        let activation = self.activation.wrapping_add(1);
        *self = Self {
            facing_right: true,
            activation,
            ..Self::new(self.max_hp, self.max_sp, self.attack_interval_ms)
        };
    }
}
