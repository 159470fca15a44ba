//! Bevy plugin hosting the simulation.

use bevy::prelude::*;

use super::systems::{add_simulation_systems, configure_simulation_ordering};
use super::Simulation;
use crate::combat::config::BalanceConfig;
use crate::combat::events::CombatEvent;
use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::combat::rng::GameRng;
use crate::encounter::DebugCommand;

/// Plugin for the boss-battle simulation.
///
/// Inserts a fresh `Simulation` built from `balance`. Spawning the player and
/// bosses is left to the app (a startup system, or the headless runner).
pub struct SimulationPlugin {
    pub balance: BalanceConfig,
    /// Seed for deterministic runs; entropy when absent
    pub random_seed: Option<u64>,
}

impl SimulationPlugin {
    pub fn new(balance: BalanceConfig, random_seed: Option<u64>) -> Self {
        Self { balance, random_seed }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let rng = match self.random_seed {
            Some(seed) => {
                info!("Using deterministic RNG with seed: {}", seed);
                GameRng::from_seed(seed)
            }
            None => {
                info!("Using non-deterministic RNG (no seed provided)");
                GameRng::from_entropy()
            }
        };

        let mut combat_log = CombatLog::default();
        combat_log.log(CombatLogEventType::EncounterEvent, "Encounter started".to_string());

        app.add_event::<CombatEvent>()
            .add_event::<DebugCommand>()
            .insert_resource(Simulation::new(self.balance.clone(), Box::new(rng)))
            .insert_resource(self.balance.clone())
            .insert_resource(combat_log)
            .init_resource::<SimulationSpeed>();

        configure_simulation_ordering(app);
        add_simulation_systems(app);
    }
}

/// Controls the speed of the simulation
#[derive(Resource)]
pub struct SimulationSpeed {
    /// Speed multiplier (0.0 = paused, 0.5 = half speed, 1.0 = normal, 2.0 = double, 3.0 = triple)
    pub multiplier: f32,
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl SimulationSpeed {
    pub fn pause(&mut self) {
        self.multiplier = 0.0;
    }

    pub fn half_speed(&mut self) {
        self.multiplier = 0.5;
    }

    pub fn normal_speed(&mut self) {
        self.multiplier = 1.0;
    }

    pub fn double_speed(&mut self) {
        self.multiplier = 2.0;
    }

    pub fn triple_speed(&mut self) {
        self.multiplier = 3.0;
    }

    pub fn is_paused(&self) -> bool {
        self.multiplier == 0.0
    }
}
