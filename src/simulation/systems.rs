//! Simulation systems
//!
//! Thin ECS wrappers around the `Simulation` resource. The simulation owns all
//! combat state; these systems feed it time and debug input, and publish what
//! it reports.

use bevy::prelude::*;

use super::plugin::SimulationSpeed;
use super::Simulation;
use crate::combat::events::CombatEvent;
use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::encounter::DebugCommand;

/// Ordered phases of one simulation frame.
///
/// Ordering: Input -> Advance -> Report
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationPhase {
    /// Debug commands and player/autopilot input
    Input,
    /// Step the simulation clock
    Advance,
    /// Forward events, record the combat log, react to the outcome
    Report,
}

/// Chain the simulation phases in `Update`.
pub fn configure_simulation_ordering(app: &mut App) {
    app.configure_sets(
        Update,
        (
            SimulationPhase::Input,
            SimulationPhase::Advance,
            SimulationPhase::Report,
        )
            .chain(),
    );
}

pub fn apply_debug_commands(mut sim: ResMut<Simulation>, mut commands: EventReader<DebugCommand>) {
    for command in commands.read() {
        info!("Debug command: {:?}", command);
        sim.apply_debug(*command);
    }
}

/// Step the simulation by this frame's delta, scaled by `SimulationSpeed`.
pub fn advance_simulation(time: Res<Time>, speed: Res<SimulationSpeed>, mut sim: ResMut<Simulation>) {
    let dt = time.delta_secs() * speed.multiplier;
    sim.step(dt);
}

/// Publish the simulation's outbox as Bevy events.
pub fn forward_combat_events(mut sim: ResMut<Simulation>, mut writer: EventWriter<CombatEvent>) {
    for event in sim.drain_events() {
        writer.send(event);
    }
}

pub fn record_combat_log(
    mut combat_log: ResMut<CombatLog>,
    sim: Res<Simulation>,
    mut events: EventReader<CombatEvent>,
) {
    combat_log.encounter_time = sim.now();
    for event in events.read() {
        combat_log.record_event(event, |id| sim.name_of(id));
    }
}

/// Stop the clock once the encounter is decided.
pub fn finish_encounter(
    sim: Res<Simulation>,
    mut speed: ResMut<SimulationSpeed>,
    mut combat_log: ResMut<CombatLog>,
    mut events: EventReader<CombatEvent>,
) {
    for event in events.read() {
        let CombatEvent::EncounterEnded { outcome } = event else {
            continue;
        };
        let encounter = sim.encounter();
        info!(
            "Encounter over: {} after {:.1}s, score {} ({}/{} bosses)",
            outcome.name(),
            encounter.elapsed,
            encounter.score,
            encounter.bosses_defeated,
            encounter.bosses_total
        );
        combat_log.log(
            CombatLogEventType::EncounterEvent,
            format!("Final score: {}", encounter.score),
        );
        speed.pause();
    }
}

/// Add the simulation systems to `Update`, each in its phase.
pub fn add_simulation_systems(app: &mut App) {
    app.add_systems(Update, apply_debug_commands.in_set(SimulationPhase::Input))
        .add_systems(Update, advance_simulation.in_set(SimulationPhase::Advance))
        .add_systems(
            Update,
            (forward_combat_events, record_combat_log, finish_encounter)
                .chain()
                .in_set(SimulationPhase::Report),
        );
}
