//! Integration tests for headless encounter execution
//!
//! These tests verify that:
//! - Headless encounters run to completion
//! - Encounter reports are accessible programmatically
//! - Seeded RNG produces deterministic results

use bossbattle::headless::{run_encounter, run_headless_encounter, HeadlessEncounterConfig};
use bossbattle::EncounterOutcome;

/// Helper to create a short encounter config
fn create_config(bosses: Vec<&str>, seed: Option<u64>) -> HeadlessEncounterConfig {
    HeadlessEncounterConfig {
        bosses: bosses.into_iter().map(String::from).collect(),
        random_seed: seed,
        max_duration_secs: 20.0, // Short duration for tests
        output_path: None,
        god_mode: false,
        balance_path: None,
    }
}

#[test]
fn test_same_seed_gives_identical_report() {
    let config = create_config(vec!["Roller", "Thrower"], Some(42));
    let first = run_encounter(&config).unwrap();
    let second = run_encounter(&config).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.random_seed, Some(42));
    assert_eq!(first.bosses_total, 2);
    assert_eq!(first.combatants.len(), 3);
}

#[test]
fn test_bevy_runner_is_deterministic() {
    let config = create_config(vec!["Thrower"], Some(7));
    let first = run_headless_encounter(config.clone()).unwrap();
    let second = run_headless_encounter(config).unwrap();

    assert_eq!(first, second);
    assert!(first.duration > 0.0);
}

#[test]
fn test_god_mode_player_survives_and_fights() {
    let mut config = create_config(vec!["Roller"], Some(1));
    config.god_mode = true;
    let report = run_encounter(&config).unwrap();

    assert_ne!(report.outcome, Some(EncounterOutcome::Defeat));
    let player = report.player().unwrap();
    assert!(player.survived);
    assert!(player.damage_dealt > 0.0);
}

#[test]
fn test_report_respects_max_duration() {
    let mut config = create_config(vec!["Roller", "Thrower"], Some(3));
    config.max_duration_secs = 2.0;
    config.god_mode = true;
    let report = run_encounter(&config).unwrap();

    assert!(report.outcome.is_none());
    assert!(report.duration >= 2.0);
    assert!(report.duration < 2.0 + 0.05);
}

#[test]
fn test_output_path_writes_log() {
    let path = std::env::temp_dir().join("bossbattle_headless_test.json");
    let mut config = create_config(vec!["Thrower"], Some(9));
    config.max_duration_secs = 3.0;
    config.output_path = Some(path.to_string_lossy().into_owned());

    let report = run_encounter(&config).unwrap();
    let written = report.log_path.unwrap();
    let contents = std::fs::read_to_string(&written).unwrap();
    assert!(contents.contains("\"metadata\""));
    assert!(contents.contains("Encounter started (headless mode)!"));
    let _ = std::fs::remove_file(&written);
}

#[test]
fn test_config_file_round_trip_through_loader() {
    let path = std::env::temp_dir().join("bossbattle_headless_config_test.json");
    std::fs::write(
        &path,
        r#"{ "bosses": ["Roller"], "random_seed": 5, "max_duration_secs": 1.0 }"#,
    )
    .unwrap();

    let config = HeadlessEncounterConfig::load_from_file(&path).unwrap();
    assert_eq!(config.random_seed, Some(5));
    let report = run_encounter(&config).unwrap();
    assert_eq!(report.bosses_total, 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = create_config(vec!["Dragon"], None);
    assert!(run_encounter(&config).is_err());
}
