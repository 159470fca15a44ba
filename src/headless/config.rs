//! JSON configuration parsing for headless mode
//!
//! Parses JSON encounter configurations and resolves them into boss kinds and
//! a balance table.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::boss::BossKind;
use crate::combat::config::BalanceConfig;

/// Headless encounter configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessEncounterConfig {
    /// Bosses to spawn, by variant name ("Roller", "Thrower")
    pub bosses: Vec<String>,
    /// Random seed for deterministic encounter reproduction
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Maximum encounter duration in seconds (default: 300)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Custom output path for the combat log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Start with player god mode enabled
    #[serde(default)]
    pub god_mode: bool,
    /// RON balance file; compiled defaults when absent
    #[serde(default)]
    pub balance_path: Option<String>,
}

fn default_max_duration() -> f32 {
    300.0
}

impl Default for HeadlessEncounterConfig {
    fn default() -> Self {
        Self {
            bosses: vec!["Roller".to_string()],
            random_seed: None,
            max_duration_secs: default_max_duration(),
            output_path: None,
            god_mode: false,
            balance_path: None,
        }
    }
}

impl HeadlessEncounterConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_json_str(&contents)
    }

    /// Parse and validate JSON text
    pub fn from_json_str(contents: &str) -> Result<Self, String> {
        let config: HeadlessEncounterConfig = serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bosses.is_empty() || self.bosses.len() > 4 {
            return Err("bosses must list 1-4 entries".to_string());
        }

        self.boss_kinds()?;

        if !(self.max_duration_secs > 0.0) {
            return Err("max_duration_secs must be positive".to_string());
        }

        Ok(())
    }

    /// Resolve boss names into kinds
    pub fn boss_kinds(&self) -> Result<Vec<BossKind>, String> {
        self.bosses.iter().map(|name| name.parse()).collect()
    }

    /// Load the configured balance table, or the compiled defaults
    pub fn balance(&self) -> Result<BalanceConfig, String> {
        match &self.balance_path {
            Some(path) => BalanceConfig::load_from_file(Path::new(path)),
            None => Ok(BalanceConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = HeadlessEncounterConfig::from_json_str(r#"{ "bosses": ["Thrower"] }"#).unwrap();
        assert_eq!(config.max_duration_secs, 300.0);
        assert_eq!(config.random_seed, None);
        assert!(!config.god_mode);
        assert_eq!(config.boss_kinds().unwrap(), vec![BossKind::Thrower]);
    }

    #[test]
    fn test_unknown_boss_is_rejected() {
        let err = HeadlessEncounterConfig::from_json_str(r#"{ "bosses": ["Dragon"] }"#).unwrap_err();
        assert!(err.contains("Unknown boss"));
    }

    #[test]
    fn test_empty_boss_list_is_rejected() {
        assert!(HeadlessEncounterConfig::from_json_str(r#"{ "bosses": [] }"#).is_err());
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let config = HeadlessEncounterConfig {
            max_duration_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_balance_file_reports_error() {
        let config = HeadlessEncounterConfig {
            balance_path: Some("does/not/exist.ron".to_string()),
            ..Default::default()
        };
        assert!(config.balance().is_err());
    }
}
