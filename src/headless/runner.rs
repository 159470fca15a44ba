//! Headless encounter execution
//!
//! Runs boss encounters without any graphical output, suitable for automated
//! testing. Two entry points share the setup and report code:
//! `run_encounter` steps a bare `Simulation` in a loop, and
//! `run_headless_encounter` drives the same encounter through the Bevy app
//! with a manual clock.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use serde::Serialize;
use std::f32::consts::TAU;
use std::time::Duration;

use crate::boss::BossKind;
use crate::combat::combatant::{Combatant, Faction};
use crate::combat::log::{CombatLog, CombatLogEventType, CombatantMetadata, EncounterMetadata};
use crate::combat::rng::GameRng;
use crate::encounter::EncounterOutcome;
use crate::simulation::{Simulation, SimulationPhase, SimulationPlugin, SimulationSpeed};

use super::autopilot::Autopilot;
use super::config::HeadlessEncounterConfig;

/// Fixed step used by the headless loop.
pub const HEADLESS_TIMESTEP: f32 = 1.0 / 60.0;

/// Bosses start on a ring around the player, inside detection range.
const BOSS_SPAWN_RADIUS: f32 = 12.0;

/// Result of a completed headless encounter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterReport {
    /// None when the encounter hit `max_duration_secs` undecided
    pub outcome: Option<EncounterOutcome>,
    /// Simulated seconds when the run stopped
    pub duration: f32,
    pub score: u32,
    pub bosses_defeated: u32,
    pub bosses_total: u32,
    pub random_seed: Option<u64>,
    /// Every combatant ever spawned, by id
    pub combatants: Vec<CombatantReport>,
    /// Where the combat log was written, if it was
    pub log_path: Option<String>,
}

/// Statistics for a single combatant after the encounter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatantReport {
    pub name: String,
    pub faction: Faction,
    pub max_health: f32,
    /// Health remaining at the end (0 if dead)
    pub final_health: f32,
    pub survived: bool,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_received: f32,
}

impl EncounterReport {
    pub fn player(&self) -> Option<&CombatantReport> {
        self.combatants.iter().find(|c| c.faction == Faction::Player)
    }
}

/// Spawn the player at the origin and the bosses evenly around it.
pub fn setup_encounter(sim: &mut Simulation, bosses: &[BossKind], god_mode: bool) {
    sim.spawn_player(Vec3::ZERO);
    if god_mode {
        sim.toggle_god_mode();
    }

    let count = bosses.len().max(1) as f32;
    for (i, kind) in bosses.iter().enumerate() {
        let angle = TAU * i as f32 / count;
        let position = Vec3::new(angle.cos(), 0.0, angle.sin()) * BOSS_SPAWN_RADIUS;
        sim.spawn_boss(*kind, position);
    }

    info!(
        "Headless encounter setup complete: player vs {} bosses",
        bosses.len()
    );
}

/// Every combatant, live or removed, ordered by id.
fn all_combatants(sim: &Simulation) -> Vec<&Combatant> {
    let mut all: Vec<&Combatant> = sim.combatants().chain(sim.removed().iter()).collect();
    all.sort_by_key(|c| c.id);
    all
}

fn build_report(sim: &Simulation, config: &HeadlessEncounterConfig, log_path: Option<String>) -> EncounterReport {
    let encounter = sim.encounter();
    EncounterReport {
        outcome: sim.outcome(),
        duration: sim.now(),
        score: encounter.score,
        bosses_defeated: encounter.bosses_defeated,
        bosses_total: encounter.bosses_total,
        random_seed: config.random_seed,
        combatants: all_combatants(sim)
            .into_iter()
            .map(|c| CombatantReport {
                name: c.name.clone(),
                faction: c.faction,
                max_health: c.max_health(),
                final_health: c.current_health(),
                survived: c.is_alive(),
                damage_dealt: c.damage_dealt,
                damage_taken: c.damage_taken,
                healing_received: c.healing_received,
            })
            .collect(),
        log_path,
    }
}

fn encounter_metadata(sim: &Simulation, config: &HeadlessEncounterConfig) -> EncounterMetadata {
    let encounter = sim.encounter();
    EncounterMetadata {
        outcome: sim.outcome(),
        duration: sim.now(),
        score: encounter.score,
        bosses_defeated: encounter.bosses_defeated,
        random_seed: config.random_seed,
        combatants: all_combatants(sim)
            .into_iter()
            .map(|c| CombatantMetadata {
                name: c.name.clone(),
                faction: c.faction,
                max_health: c.max_health(),
                final_health: c.current_health(),
                damage_dealt: c.damage_dealt,
                damage_taken: c.damage_taken,
                healing_received: c.healing_received,
                final_position: (c.position.x, c.position.y, c.position.z),
            })
            .collect(),
    }
}

/// Log the result and, when an output path is configured, save the combat log.
fn finish(sim: &Simulation, combat_log: &mut CombatLog, config: &HeadlessEncounterConfig) -> EncounterReport {
    match sim.outcome() {
        Some(outcome) => info!("Encounter ended: {} at {:.1}s", outcome.name(), sim.now()),
        None => {
            info!("Encounter timed out after {:.1}s", sim.now());
            combat_log.log(
                CombatLogEventType::EncounterEvent,
                format!("Encounter timed out after {:.0}s", sim.now()),
            );
        }
    }

    let log_path = config.output_path.as_deref().and_then(|path| {
        match combat_log.save_to_file(&encounter_metadata(sim, config), Some(path)) {
            Ok(filename) => Some(filename),
            Err(e) => {
                warn!("Failed to save combat log: {}", e);
                None
            }
        }
    });

    build_report(sim, config, log_path)
}

fn make_rng(seed: Option<u64>) -> GameRng {
    match seed {
        Some(seed) => GameRng::from_seed(seed),
        None => GameRng::from_entropy(),
    }
}

/// Run an encounter to completion on a bare `Simulation`.
pub fn run_encounter(config: &HeadlessEncounterConfig) -> Result<EncounterReport, String> {
    config.validate()?;
    let balance = config.balance()?;
    let bosses = config.boss_kinds()?;

    let mut sim = Simulation::new(balance, Box::new(make_rng(config.random_seed)));
    setup_encounter(&mut sim, &bosses, config.god_mode);

    let mut combat_log = CombatLog::default();
    combat_log.log(
        CombatLogEventType::EncounterEvent,
        "Encounter started (headless mode)!".to_string(),
    );

    let autopilot = Autopilot::default();
    while sim.outcome().is_none() && sim.now() < config.max_duration_secs {
        autopilot.drive(&mut sim, HEADLESS_TIMESTEP);
        sim.step(HEADLESS_TIMESTEP);

        combat_log.encounter_time = sim.now();
        for event in sim.drain_events() {
            combat_log.record_event(&event, |id| sim.name_of(id));
        }
    }

    Ok(finish(&sim, &mut combat_log, config))
}

/// Resource to track headless encounter state
#[derive(Resource)]
pub struct HeadlessEncounterState {
    pub config: HeadlessEncounterConfig,
    /// Whether the encounter has completed
    pub complete: bool,
    /// Report (populated when the encounter completes)
    pub report: Option<EncounterReport>,
}

/// Plugin for headless encounter execution
///
/// Expects `SimulationPlugin` to be added alongside it.
pub struct HeadlessPlugin {
    pub config: HeadlessEncounterConfig,
    pub bosses: Vec<BossKind>,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let bosses = self.bosses.clone();
        let god_mode = self.config.god_mode;

        app.insert_resource(HeadlessEncounterState {
            config: self.config.clone(),
            complete: false,
            report: None,
        })
        .init_resource::<Autopilot>()
        .add_systems(Startup, move |mut sim: ResMut<Simulation>| {
            setup_encounter(&mut sim, &bosses, god_mode);
        })
        .add_systems(Update, headless_drive_player.in_set(SimulationPhase::Input))
        .add_systems(
            Update,
            headless_check_encounter_end
                .in_set(SimulationPhase::Report)
                .after(crate::simulation::systems::finish_encounter),
        );
    }
}

fn headless_drive_player(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    autopilot: Res<Autopilot>,
    mut sim: ResMut<Simulation>,
) {
    let dt = time.delta_secs() * speed.multiplier;
    if dt > 0.0 && sim.outcome().is_none() {
        autopilot.drive(&mut sim, dt);
    }
}

/// Check if the encounter has ended (outcome decided, or timeout)
fn headless_check_encounter_end(
    sim: Res<Simulation>,
    mut combat_log: ResMut<CombatLog>,
    mut state: ResMut<HeadlessEncounterState>,
) {
    if state.complete {
        return;
    }
    if sim.outcome().is_none() && sim.now() < state.config.max_duration_secs {
        return;
    }

    let report = finish(&sim, &mut combat_log, &state.config);
    state.report = Some(report);
    state.complete = true;
}

/// Exit the app when the encounter is complete
fn headless_exit_on_complete(state: Res<HeadlessEncounterState>, mut exit: EventWriter<AppExit>) {
    if state.complete {
        exit.send(AppExit::Success);
    }
}

fn encounter_app(config: HeadlessEncounterConfig, realtime: bool) -> Result<App, String> {
    config.validate()?;
    let balance = config.balance()?;
    let bosses = config.boss_kinds()?;

    info!("Starting encounter simulation...");
    info!("  Bosses: {:?}", config.bosses);
    info!("  Max duration: {:.0}s", config.max_duration_secs);

    let random_seed = config.random_seed;
    let frame = Duration::from_secs_f32(HEADLESS_TIMESTEP);
    let mut app = App::new();
    // Minimal plugins - no window, no rendering
    if realtime {
        app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(frame)));
    } else {
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(frame));
    }
    app.add_plugins(SimulationPlugin::new(balance, random_seed))
        .add_plugins(HeadlessPlugin { config, bosses })
        .add_systems(PostUpdate, headless_exit_on_complete);
    Ok(app)
}

/// Build an app that advances a fixed 1/60 s per `update()`, independent of
/// wall-clock time. Add extra plugins (logging) before handing it to
/// `run_headless_app`.
pub fn headless_app(config: HeadlessEncounterConfig) -> Result<App, String> {
    encounter_app(config, false)
}

/// Build an app that runs in real time at 60 frames per second via
/// `App::run`, exiting once the encounter is over.
pub fn realtime_app(config: HeadlessEncounterConfig) -> Result<App, String> {
    encounter_app(config, true)
}

/// Update a `headless_app` until the encounter completes and return its report.
pub fn run_headless_app(mut app: App) -> Result<EncounterReport, String> {
    app.finish();
    app.cleanup();

    loop {
        app.update();
        let state = app.world().resource::<HeadlessEncounterState>();
        if state.complete {
            break;
        }
    }

    let mut state = app.world_mut().resource_mut::<HeadlessEncounterState>();
    state
        .report
        .take()
        .ok_or_else(|| "Encounter finished without a report".to_string())
}

/// Run a headless encounter through the Bevy app with a fixed 1/60 s clock.
pub fn run_headless_encounter(config: HeadlessEncounterConfig) -> Result<EncounterReport, String> {
    run_headless_app(headless_app(config)?)
}
