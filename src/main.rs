//! Boss battle simulator
//!
//! Runs an encounter between an autopiloted player and one or more bosses,
//! either in real time or as a fixed-step headless run.

use bevy::log::LogPlugin;
use std::process::ExitCode;

use bossbattle::cli::{parse_args, Args};
use bossbattle::headless::{headless_app, realtime_app, run_headless_app, HeadlessEncounterConfig};

fn load_config(args: &Args) -> Result<HeadlessEncounterConfig, String> {
    let mut config = match &args.headless {
        Some(path) => HeadlessEncounterConfig::load_from_file(path)?,
        None => HeadlessEncounterConfig {
            bosses: vec!["Roller".to_string(), "Thrower".to_string()],
            ..Default::default()
        },
    };

    if let Some(output) = &args.output {
        config.output_path = Some(output.to_string_lossy().into_owned());
    }
    if let Some(max_duration) = args.max_duration {
        config.max_duration_secs = max_duration;
    }
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<(), String> {
    let config = load_config(&args)?;

    if args.headless.is_none() {
        let mut app = realtime_app(config)?;
        app.add_plugins(LogPlugin::default());
        app.run();
        return Ok(());
    }

    let mut app = headless_app(config)?;
    app.add_plugins(LogPlugin::default());
    let report = run_headless_app(app)?;

    match report.outcome {
        Some(outcome) => println!(
            "Encounter complete: {} in {:.1}s (score {})",
            outcome.name(),
            report.duration,
            report.score
        ),
        None => println!("Encounter timed out after {:.1}s", report.duration),
    }
    for combatant in &report.combatants {
        println!(
            "  {:<8} {:>6.1}/{:<6.1} dealt {:>7.1} taken {:>7.1}",
            combatant.name,
            combatant.final_health,
            combatant.max_health,
            combatant.damage_dealt,
            combatant.damage_taken
        );
    }
    if let Some(path) = &report.log_path {
        println!("Log saved to: {}", path);
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(parse_args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
