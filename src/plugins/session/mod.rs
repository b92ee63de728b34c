//! Session state: currency, modifiers, save snapshot, counters.
//!
//! Passed explicitly (`Res<SessionState>` / `ResMut<SessionState>`) to the systems that
//! need it. Combat math reads modifiers through `Modifiers` accessors only.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::common::tunables::PlayerTuning;
use crate::plugins::combat::actor::ActorState;

pub fn plugin(app: &mut App) {
    app.insert_resource(SessionState::default());
}

// ----- Modifiers -----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    DefenseBonus,
    EnergyRegenBonus,
    Lifesteal,
    IdleRegen,
}

/// Additive modifier magnitudes keyed by kind. Missing keys read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers(HashMap<ModifierKind, f32>);

impl Modifiers {
    #[inline]
    pub fn get(&self, kind: ModifierKind) -> f32 {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, kind: ModifierKind, amount: f32) {
        *self.0.entry(kind).or_insert(0.0) += amount;
    }

    #[inline]
    pub fn defense_bonus(&self) -> f32 {
        self.get(ModifierKind::DefenseBonus)
    }

    #[inline]
    pub fn lifesteal(&self) -> f32 {
        self.get(ModifierKind::Lifesteal)
    }

    #[inline]
    pub fn energy_regen_bonus(&self) -> f32 {
        self.get(ModifierKind::EnergyRegenBonus)
    }

    #[inline]
    pub fn idle_regen(&self) -> f32 {
        self.get(ModifierKind::IdleRegen)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Player combat numbers derived from tuning + modifiers.
///
/// Cached on the player; recomputed whenever modifiers change or a save is restored,
/// never carried over from a previous life.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    /// Fraction of damage taken while defending.
    pub defend_factor: f32,
    pub lifesteal: f32,
    pub sp_regen_multiplier: f32,
    pub idle_regen_per_sec: f32,
}

impl DerivedStats {
    pub fn compute(tuning: &PlayerTuning, modifiers: &Modifiers) -> Self {
        Self {
            defend_factor: (tuning.defense_reduction - modifiers.defense_bonus())
                .max(tuning.defense_floor),
            lifesteal: modifiers.lifesteal(),
            sp_regen_multiplier: 1.0 + modifiers.energy_regen_bonus(),
            idle_regen_per_sec: modifiers.idle_regen(),
        }
    }
}

// ----- Cards -----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    HealInstant,
    DefenseUp,
    EnergyRegen,
    Lifesteal,
    RegenIdle,
}

impl CardKind {
    /// Apply the card. Returns HP restored (only `HealInstant` heals).
    pub fn apply(self, modifiers: &mut Modifiers, player: &mut ActorState) -> f32 {
        match self {
            CardKind::HealInstant => player.heal(50.0),
            CardKind::DefenseUp => {
                modifiers.add(ModifierKind::DefenseBonus, 0.1);
                0.0
            }
            CardKind::EnergyRegen => {
                modifiers.add(ModifierKind::EnergyRegenBonus, 0.5);
                0.0
            }
            CardKind::Lifesteal => {
                modifiers.add(ModifierKind::Lifesteal, 0.1);
                0.0
            }
            CardKind::RegenIdle => {
                modifiers.add(ModifierKind::IdleRegen, 2.0);
                0.0
            }
        }
    }
}

// ----- Save -----

#[derive(Debug, Clone, PartialEq)]
pub struct SaveSnapshot {
    pub position: Vec2,
    pub hp: f32,
    pub sp: f32,
    pub currency: u32,
    pub modifiers: Modifiers,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct SessionState {
    pub currency: u32,
    pub modifiers: Modifiers,
    pub save: Option<SaveSnapshot>,
    pub deaths: u32,
    pub kills: u32,
    pub boss_defeated: bool,
}

impl SessionState {
    pub fn capture(&mut self, position: Vec2, player: &ActorState) {
        self.save = Some(SaveSnapshot {
            position,
            hp: player.hp(),
            sp: player.sp(),
            currency: self.currency,
            modifiers: self.modifiers.clone(),
        });
    }

    /// Restore currency and modifiers from the snapshot, if any. Returns the snapshot.
    pub fn restore(&mut self) -> Option<SaveSnapshot> {
        let snap = self.save.clone()?;
        self.currency = snap.currency;
        self.modifiers = snap.modifiers.clone();
        Some(snap)
    }

    /// Buy a card: modifiers change and the player's derived stats are refreshed.
    pub fn apply_card(
        &mut self,
        card: CardKind,
        tuning: &PlayerTuning,
        player: &mut ActorState,
        stats: &mut DerivedStats,
    ) -> f32 {
        let healed = card.apply(&mut self.modifiers, player);
        *stats = DerivedStats::compute(tuning, &self.modifiers);
        healed
    }
}
