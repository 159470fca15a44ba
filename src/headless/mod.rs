//! Headless mode for automated testing
//!
//! Runs boss encounters without any graphical output. The player is driven
//! by a simple autopilot, suitable for balance checks and regression tests.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --headless encounter_config.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "bosses": ["Roller", "Thrower"],
//!   "random_seed": 42,
//!   "max_duration_secs": 120,
//!   "god_mode": false
//! }
//! ```

pub mod autopilot;
pub mod config;
pub mod runner;

pub use autopilot::Autopilot;
pub use config::HeadlessEncounterConfig;
pub use runner::{
    headless_app, realtime_app, run_encounter, run_headless_app, run_headless_encounter, CombatantReport,
    EncounterReport,
};
