//! Boss phase machine.
//!
//! `Normal(n)` -> HP threshold crossed -> `Transitioning(n -> n+1)` -> `Normal(n+1)`.
//!
//! The transition is a fixed script driven only by the clock: fade out, wait, a number
//! of wave bursts at a fixed interval, a recovery pause, fade in, done. Nothing the
//! player does (or fails to do) can cut it short or start a second one.

use bevy::prelude::*;

use crate::common::tunables::{BossTuning, PhaseTuning, TransitionTuning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FadeOut,
    Wait,
    Bursts { fired: u32 },
    Recover,
    FadeIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub target: u32,
    pub step: Step,
    pub step_started: u64,
    pub next_at: u64,
}

/// Things the owner must act on while the script runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseCue {
    FireBurst(u32),
    FadeIn,
    Complete(u32),
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct BossPhase {
    phase: u32,
    transition: Option<Transition>,
}

impl Default for BossPhase {
    fn default() -> Self {
        Self { phase: 1, transition: None }
    }
}

impl BossPhase {
    #[inline]
    pub fn phase(&self) -> u32 {
        self.phase
    }

    #[inline]
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    #[inline]
    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    /// The phase to move into, if HP has fallen to the next unconsumed threshold.
    /// Thresholds are consumed in order, one per transition.
    pub fn due(&self, hp_fraction: f32, phases: &[PhaseTuning]) -> Option<u32> {
        if self.transition.is_some() {
            return None;
        }
        let next = phases.get(self.phase as usize - 1)?;
        (hp_fraction <= next.threshold).then_some(self.phase + 1)
    }

    /// Enter the scripted transition. False if one is already running.
    pub fn begin(&mut self, target: u32, now: u64, t: &TransitionTuning) -> bool {
        if self.transition.is_some() || target <= self.phase {
            return false;
        }
        self.transition = Some(Transition {
            target,
            step: Step::FadeOut,
            step_started: now,
            next_at: now + t.fade_ms,
        });
        true
    }

    /// Run every step that has come due by `now`, in order.
    pub fn advance(&mut self, now: u64, t: &TransitionTuning) -> Vec<PhaseCue> {
        let mut cues = Vec::new();

        while let Some(mut tr) = self.transition {
            if now < tr.next_at {
                break;
            }
            let at = tr.next_at;
            tr.step_started = at;

            match tr.step {
                Step::FadeOut => {
                    tr.step = Step::Wait;
                    tr.next_at = at + t.wait_ms;
                }
                Step::Wait | Step::Bursts { .. } => {
                    let fired = match tr.step {
                        Step::Bursts { fired } => fired,
                        _ => 0,
                    };
                    if fired < t.wave_count {
                        cues.push(PhaseCue::FireBurst(fired));
                    }
                    let fired = fired + 1;
                    if fired < t.wave_count {
                        tr.step = Step::Bursts { fired };
                        tr.next_at = at + t.wave_interval_ms;
                    } else {
                        tr.step = Step::Recover;
                        tr.next_at = at + t.recovery_ms;
                    }
                }
                Step::Recover => {
                    cues.push(PhaseCue::FadeIn);
                    tr.step = Step::FadeIn;
                    tr.next_at = at + t.fade_ms;
                }
                Step::FadeIn => {
                    self.phase = tr.target;
                    self.transition = None;
                    cues.push(PhaseCue::Complete(tr.target));
                    break;
                }
            }
            self.transition = Some(tr);
        }
        cues
    }

    /// Opacity while the script runs; 1.0 otherwise.
    pub fn alpha(&self, now: u64, t: &TransitionTuning) -> f32 {
        let Some(tr) = self.transition else {
            return 1.0;
        };
        let span = tr.next_at.saturating_sub(tr.step_started).max(1) as f32;
        let progress = (now.saturating_sub(tr.step_started) as f32 / span).clamp(0.0, 1.0);
        match tr.step {
            Step::FadeOut => 1.0 + (t.faded_alpha - 1.0) * progress,
            Step::FadeIn => t.faded_alpha + (1.0 - t.faded_alpha) * progress,
            _ => t.faded_alpha,
        }
    }
}

fn phase_tuning(phase: u32, phases: &[PhaseTuning]) -> Option<&PhaseTuning> {
    phase.checked_sub(2).and_then(|i| phases.get(i as usize))
}

/// Attack interval for a phase: `base * (1 - attack_speed_bonus)`.
pub fn attack_interval_ms(base: u64, phase: u32, phases: &[PhaseTuning]) -> u64 {
    let bonus = phase_tuning(phase, phases).map_or(0.0, |p| p.attack_speed_bonus);
    (base as f32 * (1.0 - bonus)).round() as u64
}

/// Teleport cooldown for a phase, never below the configured minimum.
pub fn teleport_cooldown_ms(tuning: &BossTuning, phase: u32) -> u64 {
    let reduction = phase_tuning(phase, &tuning.phases).map_or(0.0, |p| p.cooldown_reduction);
    let ms = (tuning.teleport_cooldown_ms as f32 * (1.0 - reduction)).round() as u64;
    ms.max(tuning.min_teleport_cooldown_ms)
}
