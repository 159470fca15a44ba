//! Data-driven balance configuration
//!
//! Tunable numbers for the player, the shared combat rules, the boss base
//! behavior and each boss variant live in `assets/config/balance.ron`.
//! Every field has a compiled default matching that file, so a partial file
//! (or none at all) still yields a playable encounter.
//!
//! ## Usage
//! ```ignore
//! let balance = BalanceConfig::load_from_file(Path::new(DEFAULT_BALANCE_PATH))?;
//! let sim = Simulation::new(balance, Box::new(GameRng::from_seed(7)));
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::abilities::{AbilityDefinition, AbilityKind};
use super::damage::DamageKind;
use super::status::StatusEffectSpec;
use crate::boss::BehaviorParams;

/// Where the binary looks for balance data unless told otherwise.
pub const DEFAULT_BALANCE_PATH: &str = "assets/config/balance.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_health: f32,
    pub move_speed: f32,
    /// Grace window after taking damage during which further damage is ignored
    pub invulnerability_time: f32,
    pub max_resource: f32,
    /// Resource regained per second
    pub resource_regen: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            move_speed: 5.0,
            invulnerability_time: 1.0,
            max_resource: 100.0,
            resource_regen: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    /// Uniform ± fraction applied to every hit
    pub damage_variance: f32,
    pub knockback_force: f32,
    /// Seconds a knocked-back target cannot move
    pub knockback_duration: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            crit_chance: 0.1,
            crit_multiplier: 2.0,
            damage_variance: 0.1,
            knockback_force: 5.0,
            knockback_duration: 0.3,
        }
    }
}

/// Shared boss numbers. Variants override health, speed and weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    pub max_health: f32,
    pub move_speed: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub behavior: BehaviorParams,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            move_speed: 3.0,
            attack_range: 5.0,
            attack_cooldown: 2.0,
            behavior: BehaviorParams::default(),
        }
    }
}

/// The rolling boss: roll, bounce and shockwave attacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollerTuning {
    pub max_health: f32,
    pub move_speed: f32,
    pub aggressiveness: f32,
    pub roll_speed: f32,
    pub roll_duration: f32,
    pub roll_contact_radius: f32,
    pub roll_damage: f32,
    /// Minimum seconds between two contact hits on the same target
    pub roll_contact_interval: f32,
    pub bounce_delay: f32,
    pub bounce_damage: f32,
    pub shockwave_radius: f32,
    pub shockwave_damage: f32,
}

impl Default for RollerTuning {
    fn default() -> Self {
        Self {
            max_health: 150.0,
            move_speed: 4.0,
            aggressiveness: 0.8,
            roll_speed: 8.0,
            roll_duration: 2.0,
            roll_contact_radius: 1.0,
            roll_damage: 15.0,
            roll_contact_interval: 0.5,
            bounce_delay: 1.5,
            bounce_damage: 25.0,
            shockwave_radius: 3.0,
            shockwave_damage: 20.0,
        }
    }
}

/// The fruit-throwing boss: single, burst and arc throws plus a self-heal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowerTuning {
    pub max_health: f32,
    pub move_speed: f32,
    pub aggressiveness: f32,
    pub defensiveness: f32,
    pub throw_force: f32,
    pub windup: f32,
    pub throw_damage: f32,
    pub arc_damage: f32,
    /// Upward velocity of an arc throw as a fraction of `throw_force`
    pub arc_lift: f32,
    pub burst_count: u32,
    pub burst_interval: f32,
    pub explosion_radius: f32,
    pub heal_amount: f32,
    /// Health fraction under which the self-heal triggers
    pub heal_threshold: f32,
    pub heal_cooldown: f32,
    pub heal_delay: f32,
    /// Preferred distance band, as multiples of attack range
    pub min_range_factor: f32,
    pub max_range_factor: f32,
}

impl Default for ThrowerTuning {
    fn default() -> Self {
        Self {
            max_health: 120.0,
            move_speed: 2.5,
            aggressiveness: 0.6,
            defensiveness: 0.4,
            throw_force: 10.0,
            windup: 0.5,
            throw_damage: 15.0,
            arc_damage: 20.0,
            arc_lift: 0.5,
            burst_count: 3,
            burst_interval: 0.3,
            explosion_radius: 2.0,
            heal_amount: 20.0,
            heal_threshold: 0.3,
            heal_cooldown: 10.0,
            heal_delay: 1.0,
            min_range_factor: 0.7,
            max_range_factor: 1.5,
        }
    }
}

/// Complete balance table for an encounter.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub player: PlayerTuning,
    pub combat: CombatTuning,
    pub boss: BossTuning,
    pub roller: RollerTuning,
    pub thrower: ThrowerTuning,
    pub player_skills: Vec<AbilityDefinition>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            player: PlayerTuning::default(),
            combat: CombatTuning::default(),
            boss: BossTuning::default(),
            roller: RollerTuning::default(),
            thrower: ThrowerTuning::default(),
            player_skills: default_player_skills(),
        }
    }
}

/// Basic attack plus the three skill buttons.
pub fn default_player_skills() -> Vec<AbilityDefinition> {
    vec![
        AbilityDefinition::new("Basic Attack", AbilityKind::Melee, 25.0, 1.0, 3.0),
        AbilityDefinition::new("Fireball", AbilityKind::Projectile, 40.0, 3.0, 10.0)
            .with_cost(10.0)
            .with_damage_kind(DamageKind::Fire)
            .with_radius(2.0)
            .with_status(StatusEffectSpec::burn(3.0, 1.0, 5.0)),
        AbilityDefinition::new("Shockwave", AbilityKind::Area, 30.0, 5.0, 5.0)
            .with_cost(10.0)
            .with_knockback(),
        AbilityDefinition::new("Heal", AbilityKind::Heal, 50.0, 8.0, 0.0).with_cost(10.0),
    ]
}

fn check_fraction(name: &str, value: f32) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be within [0, 1], got {}", name, value))
    }
}

fn check_positive(name: &str, value: f32) -> Result<(), String> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be positive, got {}", name, value))
    }
}

impl BalanceConfig {
    /// Load and validate a RON balance file.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

        let config = Self::from_ron_str(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

        info!(
            "Loaded balance config from {} ({} player skills)",
            path.display(),
            config.player_skills.len()
        );
        Ok(config)
    }

    /// Parse and validate RON text.
    pub fn from_ron_str(contents: &str) -> Result<Self, String> {
        let config: BalanceConfig = ron::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        check_positive("player.max_health", self.player.max_health)?;
        check_positive("player.move_speed", self.player.move_speed)?;
        if self.player.invulnerability_time < 0.0 {
            return Err("player.invulnerability_time must not be negative".to_string());
        }

        check_fraction("combat.crit_chance", self.combat.crit_chance)?;
        check_fraction("combat.damage_variance", self.combat.damage_variance)?;
        if self.combat.crit_multiplier < 1.0 {
            return Err("combat.crit_multiplier must be at least 1".to_string());
        }
        if self.combat.knockback_duration < 0.0 {
            return Err("combat.knockback_duration must not be negative".to_string());
        }

        check_positive("boss.max_health", self.boss.max_health)?;
        check_positive("boss.attack_range", self.boss.attack_range)?;
        check_positive("boss.attack_cooldown", self.boss.attack_cooldown)?;
        self.boss.behavior.validate()?;

        check_positive("roller.max_health", self.roller.max_health)?;
        check_fraction("roller.aggressiveness", self.roller.aggressiveness)?;
        check_positive("roller.roll_duration", self.roller.roll_duration)?;

        check_positive("thrower.max_health", self.thrower.max_health)?;
        check_fraction("thrower.aggressiveness", self.thrower.aggressiveness)?;
        check_fraction("thrower.defensiveness", self.thrower.defensiveness)?;
        check_fraction("thrower.heal_threshold", self.thrower.heal_threshold)?;
        check_positive("thrower.explosion_radius", self.thrower.explosion_radius)?;
        if self.thrower.burst_count == 0 {
            return Err("thrower.burst_count must be at least 1".to_string());
        }
        if self.thrower.min_range_factor >= self.thrower.max_range_factor {
            return Err("thrower.min_range_factor must be below max_range_factor".to_string());
        }

        if self.player_skills.is_empty() {
            return Err("player_skills must not be empty".to_string());
        }
        for skill in &self.player_skills {
            skill.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(BalanceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_falls_back_to_defaults() {
        let config = BalanceConfig::from_ron_str("(combat: (crit_chance: 0.25))").unwrap();
        assert_eq!(config.combat.crit_chance, 0.25);
        assert_eq!(config.combat.crit_multiplier, 2.0);
        assert_eq!(config.player.max_health, 100.0);
        assert_eq!(config.player_skills.len(), 4);
    }

    #[test]
    fn test_out_of_range_probability_is_rejected() {
        let err = BalanceConfig::from_ron_str("(combat: (crit_chance: 1.5))").unwrap_err();
        assert!(err.contains("crit_chance"), "unexpected error: {}", err);
    }

    #[test]
    fn test_empty_skill_list_is_rejected() {
        assert!(BalanceConfig::from_ron_str("(player_skills: [])").is_err());
    }

    #[test]
    fn test_default_skill_numbers() {
        let skills = default_player_skills();
        let fireball = &skills[1];
        assert_eq!(fireball.name, "Fireball");
        assert_eq!(fireball.amount, 40.0);
        assert_eq!(fireball.cooldown, 3.0);
        assert_eq!(fireball.resource_cost, 10.0);
        assert_eq!(skills[3].kind, AbilityKind::Heal);
    }
}
