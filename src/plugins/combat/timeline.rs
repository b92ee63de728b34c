//! Per-actor delayed actions.
//!
//! Replaces "call me back in N ms" with data: each entry records when it is due, what
//! to do, and (for behavioural work) the attack activation it belongs to. Entries are
//! re-validated against the actor when they fire, so a stale activation or a dead
//! actor turns them into no-ops. Cleanup entries carry no activation and always run.

use bevy::prelude::*;

use crate::plugins::combat::AttackKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedAction {
    Hitbox(AttackKind),
    ComboWindow { open: bool },
    FinishBaseAttack,
    EndAttack,
    DecayKnockback,
    /// Remove the entity (corpse cleanup, collected pickups).
    Remove,
    RequestRespawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub fire_at: u64,
    pub action: TimedAction,
    pub activation: Option<u32>,
}

#[derive(Component, Debug, Default, Clone)]
pub struct Timeline {
    pending: Vec<Pending>,
}

impl Timeline {
    /// Schedule work tied to an attack activation.
    pub fn after(&mut self, now: u64, delay_ms: u64, action: TimedAction, activation: u32) {
        self.pending.push(Pending { fire_at: now + delay_ms, action, activation: Some(activation) });
    }

    /// Schedule work that is not tied to an activation.
    pub fn after_untracked(&mut self, now: u64, delay_ms: u64, action: TimedAction) {
        self.pending.push(Pending { fire_at: now + delay_ms, action, activation: None });
    }

    /// Remove and return everything due at `now`, earliest first.
    pub fn take_due(&mut self, now: u64) -> Vec<Pending> {
        if !self.pending.iter().any(|p| p.fire_at <= now) {
            return Vec::new();
        }
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.fire_at <= now);
        self.pending = rest;
        due.sort_by_key(|p| p.fire_at);
        due
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, action: TimedAction) -> bool {
        self.pending.iter().any(|p| p.action == action)
    }
}
