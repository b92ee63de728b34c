//! Tunable gameplay constants.
//!
//! One resource holds every number the combat core reads. Tests construct it with
//! `Default` and override fields as needed.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::common::error::CombatError;
use crate::plugins::combat::AttackKind;
use crate::plugins::combat::messages::PickupKind;
use crate::plugins::enemies::EnemyKind;

// ----- Shared pieces -----

/// How an actor reacts to a non-lethal hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitReaction {
    /// Zero means the reaction does not stun.
    pub stun_ms: u64,
    pub invincible_ms: u64,
    pub knockback: f32,
}

/// Attack geometry and timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackSpec {
    pub damage: f32,
    pub cost: f32,
    /// Horizontal distance from the attacker to the hitbox centre, mirrored by facing.
    pub reach: f32,
    pub size: Vec2,
    /// Forward velocity added when the hitbox fires.
    pub dash: f32,
    pub hitbox_delay_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropRange {
    pub min: u32,
    pub max: u32,
    pub rate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropTable {
    pub coins: DropRange,
    pub hearts: DropRange,
}

// ----- Player -----

#[derive(Debug, Clone)]
pub struct PlayerTuning {
    pub max_hp: f32,
    pub max_sp: f32,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub defend_speed: f32,
    pub jump_height: f32,
    pub sp_cost_jump: f32,
    pub sp_cost_run_per_sec: f32,
    pub sp_cost_defend_per_sec: f32,
    pub sp_recover_idle_per_sec: f32,
    pub sp_recover_walk_per_sec: f32,
    pub recovery_tick_ms: u64,
    pub idle_regen_delay_ms: u64,
    pub defense_reduction: f32,
    pub defense_floor: f32,
    pub reaction: HitReaction,
    pub defend_reaction: HitReaction,
    pub knockback_decay_ms: u64,
    pub frame_ms: u64,
    pub combo_open_frame: u64,
    pub combo_close_frame: u64,
    pub base_attack_frames: u64,
    pub wall_slide_max_fall: f32,
    pub wall_jump_speed: f32,
    pub respawn_delay_ms: u64,
    pub spawn_point: Vec2,
    pub hurtbox: Vec2,
}

impl PlayerTuning {
    #[inline]
    pub fn combo_window_ms(&self) -> (u64, u64) {
        (self.combo_open_frame * self.frame_ms, self.combo_close_frame * self.frame_ms)
    }

    #[inline]
    pub fn base_attack_ms(&self) -> u64 {
        self.base_attack_frames * self.frame_ms
    }

    #[inline]
    pub fn jump_velocity(&self, gravity: f32) -> f32 {
        (2.0 * gravity * self.jump_height).sqrt()
    }
}

// ----- Enemies -----

#[derive(Debug, Clone)]
pub struct EnemyProfile {
    pub max_hp: f32,
    pub attack: AttackKind,
    pub patrol_speed: f32,
    pub chase_speed: f32,
    pub detect_radius: f32,
    pub attack_radius: f32,
    pub attack_interval_ms: u64,
    pub patrol_range: f32,
    pub hurtbox: Vec2,
    pub reaction: HitReaction,
    pub drops: DropTable,
    pub corpse_ms: u64,
    /// `None` for actors that stay dead.
    pub respawn_ms: Option<u64>,
}

// ----- Boss -----

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseTuning {
    /// HP fraction at or below which this phase begins.
    pub threshold: f32,
    pub attack_speed_bonus: f32,
    pub cooldown_reduction: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionTuning {
    pub fade_ms: u64,
    pub faded_alpha: f32,
    pub wait_ms: u64,
    pub wave_interval_ms: u64,
    pub wave_count: u32,
    pub waves_per_burst: u32,
    pub wave_speed: f32,
    pub wave_damage: f32,
    pub wave_lifetime_ms: u64,
    pub wave_size: Vec2,
    pub recovery_ms: u64,
}

#[derive(Debug, Clone)]
pub struct BossTuning {
    pub move_speed: f32,
    pub vertical_speed_factor: f32,
    pub teleport_cooldown_ms: u64,
    pub min_teleport_cooldown_ms: u64,
    pub teleport_distance: f32,
    pub no_attack_ms: u64,
    pub teleport_offset: (f32, f32),
    pub teleport_jitter: f32,
    pub teleport_fade_ms: u64,
    pub appear_ms: u64,
    pub trigger_delay_ms: u64,
    pub phases: Vec<PhaseTuning>,
    pub transition: TransitionTuning,
}

// ----- Pickups / world objects -----

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupSpec {
    pub lifetime_ms: u64,
    pub warning_ms: u64,
    pub blink_ms: u64,
    pub collect_ms: u64,
    pub size: Vec2,
}

#[derive(Debug, Clone)]
pub struct PickupTuning {
    pub coin: PickupSpec,
    pub heart: PickupSpec,
    pub expire_fade_ms: u64,
    pub coin_value: u32,
    pub heart_heal: f32,
    pub scatter_step_deg: f32,
    pub scatter_speed: (f32, f32),
    pub heart_bob_speed: f32,
}

impl PickupTuning {
    #[inline]
    pub fn spec(&self, kind: PickupKind) -> &PickupSpec {
        match kind {
            PickupKind::Coin => &self.coin,
            PickupKind::Heart => &self.heart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChestTable {
    pub coins: (u32, u32),
    pub heart_chance: f32,
    pub hearts: (u32, u32),
    pub heart_delay_ms: u64,
    pub triggers_boss: bool,
}

// ----- Root resource -----

#[derive(Resource, Debug, Clone)]
pub struct Tunables {
    pub pixels_per_meter: f32,
    pub gravity: f32,
    pub player: PlayerTuning,
    pub slime: EnemyProfile,
    pub skeleton: EnemyProfile,
    pub boss_profile: EnemyProfile,
    pub boss: BossTuning,
    pub pickups: PickupTuning,
    pub small_chest: ChestTable,
    pub large_chest: ChestTable,
    /// Horizontal distance beyond which the vertical gap makes a target unreachable.
    pub vertical_reach: f32,
    pub attacks: HashMap<AttackKind, AttackSpec>,
}

impl Tunables {
    /// Look up an attack's configuration.
    pub fn attack(&self, kind: AttackKind) -> Result<&AttackSpec, CombatError> {
        self.attacks.get(&kind).ok_or(CombatError::UnknownAttack(kind))
    }

    pub fn enemy(&self, kind: EnemyKind) -> &EnemyProfile {
        match kind {
            EnemyKind::Slime => &self.slime,
            EnemyKind::Skeleton => &self.skeleton,
            EnemyKind::Boss => &self.boss_profile,
        }
    }

    /// Startup-time consistency check.
    pub fn validate(&self) -> Result<(), CombatError> {
        for kind in AttackKind::ALL {
            let spec = self.attack(kind)?;
            if spec.hitbox_delay_ms > spec.duration_ms {
                return Err(CombatError::InvalidConfig(format!(
                    "{kind:?} hitbox fires after the attack ends"
                )));
            }
        }

        let mut prev = 1.0;
        for phase in &self.boss.phases {
            if !(phase.threshold > 0.0 && phase.threshold < prev) {
                return Err(CombatError::InvalidConfig(
                    "boss phase thresholds must be strictly decreasing within (0, 1)".into(),
                ));
            }
            prev = phase.threshold;
        }

        for (name, spec) in [("coin", &self.pickups.coin), ("heart", &self.pickups.heart)] {
            if spec.warning_ms > spec.lifetime_ms {
                return Err(CombatError::InvalidConfig(format!(
                    "{name} warning window exceeds its lifetime"
                )));
            }
        }

        for kind in [EnemyKind::Slime, EnemyKind::Skeleton, EnemyKind::Boss] {
            if self.enemy(kind).reaction.knockback >= self.player.reaction.knockback {
                return Err(CombatError::InvalidConfig(format!(
                    "{kind:?} knockback must be smaller than the player's"
                )));
            }
        }

        let (open, close) = self.player.combo_window_ms();
        if open > close || close > self.player.base_attack_ms() {
            return Err(CombatError::InvalidConfig("combo window outside base attack".into()));
        }
        Ok(())
    }
}

fn enemy_attack(damage: f32, radius: f32, attack_frame: u64, duration_ms: u64) -> AttackSpec {
    AttackSpec {
        damage,
        cost: 0.0,
        reach: radius * 0.5,
        size: Vec2::new(radius, 40.0),
        dash: 0.0,
        hitbox_delay_ms: attack_frame * 100,
        duration_ms,
    }
}

impl Default for Tunables {
    fn default() -> Self {
        let player = PlayerTuning {
            max_hp: 100.0,
            max_sp: 100.0,
            walk_speed: 100.0,
            run_speed: 200.0,
            defend_speed: 75.0,
            jump_height: 50.0,
            sp_cost_jump: 5.0,
            sp_cost_run_per_sec: 10.0,
            sp_cost_defend_per_sec: 10.0,
            sp_recover_idle_per_sec: 10.0,
            sp_recover_walk_per_sec: 6.0,
            recovery_tick_ms: 100,
            idle_regen_delay_ms: 2000,
            defense_reduction: 0.3,
            defense_floor: 0.1,
            reaction: HitReaction { stun_ms: 500, invincible_ms: 1000, knockback: 30.0 },
            defend_reaction: HitReaction { stun_ms: 0, invincible_ms: 500, knockback: 9.0 },
            knockback_decay_ms: 150,
            frame_ms: 80,
            combo_open_frame: 4,
            combo_close_frame: 6,
            base_attack_frames: 6,
            wall_slide_max_fall: 50.0,
            wall_jump_speed: 200.0,
            respawn_delay_ms: 2000,
            spawn_point: Vec2::new(58.0, 70.0),
            hurtbox: Vec2::new(23.0, 33.0),
        };

        // Enemies are pushed back less than the player.
        let enemy_reaction = HitReaction { stun_ms: 200, invincible_ms: 300, knockback: 20.0 };

        let slime = EnemyProfile {
            max_hp: 20.0,
            attack: AttackKind::Slime,
            patrol_speed: 30.0,
            chase_speed: 30.0,
            detect_radius: 80.0,
            attack_radius: 25.0,
            attack_interval_ms: 1500,
            patrol_range: 50.0,
            hurtbox: Vec2::new(20.0, 14.0),
            reaction: enemy_reaction,
            drops: DropTable {
                coins: DropRange { min: 2, max: 3, rate: 1.0 },
                hearts: DropRange { min: 0, max: 1, rate: 0.5 },
            },
            corpse_ms: 2000,
            respawn_ms: Some(30_000),
        };

        let skeleton = EnemyProfile {
            max_hp: 30.0,
            attack: AttackKind::Skeleton,
            patrol_speed: 40.0,
            chase_speed: 60.0,
            detect_radius: 120.0,
            attack_radius: 30.0,
            attack_interval_ms: 2000,
            patrol_range: 100.0,
            hurtbox: Vec2::new(20.0, 32.0),
            reaction: enemy_reaction,
            drops: DropTable {
                coins: DropRange { min: 2, max: 5, rate: 1.0 },
                hearts: DropRange { min: 0, max: 1, rate: 0.7 },
            },
            corpse_ms: 2000,
            respawn_ms: Some(30_000),
        };

        let boss_profile = EnemyProfile {
            max_hp: 100.0,
            attack: AttackKind::Boss,
            patrol_speed: 50.0,
            chase_speed: 50.0,
            detect_radius: f32::INFINITY,
            attack_radius: 50.0,
            attack_interval_ms: 2000,
            patrol_range: 0.0,
            hurtbox: Vec2::new(30.0, 40.0),
            reaction: enemy_reaction,
            drops: DropTable {
                coins: DropRange { min: 15, max: 20, rate: 1.0 },
                hearts: DropRange { min: 2, max: 3, rate: 1.0 },
            },
            corpse_ms: 2000,
            respawn_ms: None,
        };

        let boss = BossTuning {
            move_speed: 50.0,
            vertical_speed_factor: 0.5,
            teleport_cooldown_ms: 2000,
            min_teleport_cooldown_ms: 1000,
            teleport_distance: 150.0,
            no_attack_ms: 8000,
            teleport_offset: (60.0, 100.0),
            teleport_jitter: 20.0,
            teleport_fade_ms: 500,
            appear_ms: 1000,
            trigger_delay_ms: 1000,
            phases: vec![
                PhaseTuning { threshold: 0.66, attack_speed_bonus: 0.15, cooldown_reduction: 0.25 },
                PhaseTuning { threshold: 0.33, attack_speed_bonus: 0.30, cooldown_reduction: 0.50 },
            ],
            transition: TransitionTuning {
                fade_ms: 500,
                faded_alpha: 0.4,
                wait_ms: 1500,
                wave_interval_ms: 1600,
                wave_count: 3,
                waves_per_burst: 4,
                wave_speed: 50.0,
                wave_damage: 15.0,
                wave_lifetime_ms: 4000,
                wave_size: Vec2::new(20.0, 20.0),
                recovery_ms: 1500,
            },
        };

        let pickups = PickupTuning {
            coin: PickupSpec {
                lifetime_ms: 30_000,
                warning_ms: 5000,
                blink_ms: 200,
                collect_ms: 300,
                size: Vec2::new(10.0, 10.0),
            },
            heart: PickupSpec {
                lifetime_ms: 20_000,
                warning_ms: 3000,
                blink_ms: 150,
                collect_ms: 400,
                size: Vec2::new(14.0, 14.0),
            },
            expire_fade_ms: 500,
            coin_value: 1,
            heart_heal: 10.0,
            scatter_step_deg: 30.0,
            scatter_speed: (100.0, 150.0),
            heart_bob_speed: 50.0,
        };

        let mut attacks = HashMap::default();
        attacks.insert(
            AttackKind::PlayerBase,
            AttackSpec {
                damage: 10.0,
                cost: 7.0,
                reach: 30.0,
                size: Vec2::new(30.0, 40.0),
                dash: 80.0,
                hitbox_delay_ms: 3 * player.frame_ms,
                duration_ms: player.base_attack_ms(),
            },
        );
        attacks.insert(
            AttackKind::PlayerCombo,
            AttackSpec {
                damage: 15.0,
                cost: 15.0,
                reach: 40.0,
                size: Vec2::new(40.0, 45.0),
                dash: 120.0,
                hitbox_delay_ms: 0,
                duration_ms: 500,
            },
        );
        attacks.insert(AttackKind::Slime, enemy_attack(10.0, slime.attack_radius, 3, 875));
        attacks.insert(AttackKind::Skeleton, enemy_attack(15.0, skeleton.attack_radius, 5, 875));
        attacks.insert(
            AttackKind::Boss,
            AttackSpec {
                damage: 20.0,
                cost: 0.0,
                reach: 0.0,
                size: Vec2::new(boss_profile.attack_radius * 2.0, 60.0),
                dash: 0.0,
                hitbox_delay_ms: 300,
                duration_ms: 800,
            },
        );

        Self {
            pixels_per_meter: 20.0,
            gravity: 500.0,
            player,
            slime,
            skeleton,
            boss_profile,
            boss,
            pickups,
            small_chest: ChestTable {
                coins: (5, 10),
                heart_chance: 0.4,
                hearts: (1, 1),
                heart_delay_ms: 0,
                triggers_boss: false,
            },
            large_chest: ChestTable {
                coins: (15, 25),
                heart_chance: 0.8,
                hearts: (2, 3),
                heart_delay_ms: 200,
                triggers_boss: true,
            },
            vertical_reach: 100.0,
            attacks,
        }
    }
}
