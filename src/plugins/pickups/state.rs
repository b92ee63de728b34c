//! Pickup lifecycle, independent of the ECS.
//!
//! `Active -> Warning -> Expired`, or `Collected` from either live phase. The two
//! terminal phases exclude each other: whichever is recorded first wins and the other
//! path becomes a no-op.

use bevy::prelude::*;

use crate::common::tunables::{PickupSpec, PickupTuning};
use crate::plugins::combat::actor::ActorState;
use crate::plugins::combat::messages::PickupKind;
use crate::plugins::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupPhase {
    Active,
    Warning,
    Collected,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Live,
    Collected { at: u64 },
    Expired { at: u64 },
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PickupState {
    pub kind: PickupKind,
    spawned_at: u64,
    spec: PickupSpec,
    fate: Fate,
}

impl PickupState {
    pub fn new(kind: PickupKind, spec: PickupSpec, now: u64) -> Self {
        Self { kind, spawned_at: now, spec, fate: Fate::Live }
    }

    #[inline]
    fn expires_at(&self) -> u64 {
        self.spawned_at + self.spec.lifetime_ms
    }

    #[inline]
    fn warning_at(&self) -> u64 {
        self.expires_at().saturating_sub(self.spec.warning_ms)
    }

    pub fn phase(&self, now: u64) -> PickupPhase {
        match self.fate {
            Fate::Collected { .. } => PickupPhase::Collected,
            Fate::Expired { .. } => PickupPhase::Expired,
            Fate::Live if now >= self.warning_at() => PickupPhase::Warning,
            Fate::Live => PickupPhase::Active,
        }
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.fate == Fate::Live
    }

    /// Move a live pickup past its lifetime into `Expired`. True on the transition.
    pub fn tick(&mut self, now: u64) -> bool {
        if self.fate == Fate::Live && now >= self.expires_at() {
            self.fate = Fate::Expired { at: now };
            return true;
        }
        false
    }

    /// Claim the pickup. False if it already reached a terminal phase or its lifetime
    /// is over.
    pub fn try_collect(&mut self, now: u64) -> bool {
        if self.fate != Fate::Live || now >= self.expires_at() {
            return false;
        }
        self.fate = Fate::Collected { at: now };
        true
    }

    /// Apply this pickup to `collector`. Returns the currency gained or HP restored.
    ///
    /// Hearts are refused at full health and stay live.
    pub fn collect(
        &mut self,
        collector: &mut ActorState,
        session: &mut SessionState,
        tuning: &PickupTuning,
        now: u64,
    ) -> Option<f32> {
        match self.kind {
            PickupKind::Coin => {
                if !self.try_collect(now) {
                    return None;
                }
                session.currency += tuning.coin_value;
                Some(tuning.coin_value as f32)
            }
            PickupKind::Heart => {
                if collector.is_dead() || collector.is_full_health() || !self.try_collect(now) {
                    return None;
                }
                Some(collector.heal(tuning.heart_heal))
            }
        }
    }

    /// Warning blink: shown on even intervals.
    pub fn visible(&self, now: u64) -> bool {
        match self.phase(now) {
            PickupPhase::Warning => {
                let blink = self.spec.blink_ms.max(1);
                (now - self.warning_at()) / blink % 2 == 0
            }
            _ => true,
        }
    }

    /// 0..1 progress of the closing animation (collect shrink or expiry fade).
    pub fn closing_progress(&self, now: u64, expire_fade_ms: u64) -> Option<f32> {
        let (at, span) = match self.fate {
            Fate::Live => return None,
            Fate::Collected { at } => (at, self.spec.collect_ms),
            Fate::Expired { at } => (at, expire_fade_ms),
        };
        if span == 0 {
            return Some(1.0);
        }
        Some((now.saturating_sub(at) as f32 / span as f32).min(1.0))
    }

    pub fn alpha(&self, now: u64, expire_fade_ms: u64) -> f32 {
        match self.closing_progress(now, expire_fade_ms) {
            Some(p) => 1.0 - p,
            None if self.visible(now) => 1.0,
            None => 0.0,
        }
    }

    /// The closing animation has finished.
    pub fn should_remove(&self, now: u64, expire_fade_ms: u64) -> bool {
        self.closing_progress(now, expire_fade_ms).is_some_and(|p| p >= 1.0)
    }
}
