//! The shipped balance file must agree with the compiled defaults.

use std::path::Path;

use bossbattle::combat::config::{BalanceConfig, DEFAULT_BALANCE_PATH};

#[test]
fn test_balance_file_matches_defaults() {
    let loaded = BalanceConfig::load_from_file(Path::new(DEFAULT_BALANCE_PATH)).unwrap();
    assert_eq!(loaded, BalanceConfig::default());
}

#[test]
fn test_balance_file_validates() {
    let loaded = BalanceConfig::load_from_file(Path::new(DEFAULT_BALANCE_PATH)).unwrap();
    assert!(loaded.validate().is_ok());
    assert_eq!(loaded.player_skills.len(), 4);
}
