//! Error types for conditions that are actually exceptional.
//!
//! Rejected gameplay actions are not errors and never show up here.

use thiserror::Error;

use crate::plugins::combat::AttackKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombatError {
    #[error("no attack configuration for {0:?}")]
    UnknownAttack(AttackKind),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
