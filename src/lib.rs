//! Boss battle combat core
//!
//! A deterministic, headless boss-battle simulation: combatants with health,
//! status effects and abilities, a damage resolver, and bosses driven by a
//! two-layer decision engine.
//!
//! This library exposes the core modules for testing and reuse.

pub mod boss;
pub mod cli;
pub mod combat;
pub mod encounter;
pub mod headless;
pub mod simulation;

// Re-export commonly used types
pub use boss::{BossKind, ExecutionState, TacticalState};
pub use combat::config::BalanceConfig;
pub use combat::events::{CombatEvent, CombatObserver};
pub use combat::log::{CombatLog, CombatLogEventType};
pub use encounter::{DebugCommand, EncounterOutcome, EncounterState};
pub use headless::HeadlessEncounterConfig;
pub use simulation::{Simulation, SimulationPlugin, SimulationSpeed};
