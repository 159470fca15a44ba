//! Command-line interface for the boss battle simulator
//!
//! Runs a real-time encounter by default, or a fixed-step headless encounter
//! from a JSON config.

use clap::Parser;
use std::path::PathBuf;

/// Boss battle combat simulator
#[derive(Parser, Debug)]
#[command(name = "bossbattle")]
#[command(about = "Boss battle combat simulator")]
#[command(version)]
pub struct Args {
    /// Run in headless mode with the specified JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the combat log
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum encounter duration in seconds (overrides the config file)
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Random seed for a reproducible encounter (overrides the config file)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn parse_args() -> Args {
    Args::parse()
}
