//! Encounter flow
//!
//! Tracks whether the fight is still on, how many bosses have fallen, and the
//! score. The outcome latches: the first terminal state reached wins and later
//! deaths do not change it.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::constants::BOSS_KILL_SCORE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterOutcome {
    /// Every boss is dead
    Victory,
    /// The player died
    Defeat,
}

impl EncounterOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            EncounterOutcome::Victory => "Victory",
            EncounterOutcome::Defeat => "Defeat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncounterState {
    #[default]
    Playing,
    Victory,
    Defeat,
}

impl From<EncounterOutcome> for EncounterState {
    fn from(outcome: EncounterOutcome) -> Self {
        match outcome {
            EncounterOutcome::Victory => EncounterState::Victory,
            EncounterOutcome::Defeat => EncounterState::Defeat,
        }
    }
}

/// Debug console commands. Sent as a Bevy event or applied directly.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    /// Player ignores all damage
    ToggleGodMode,
    /// Force-kill every living boss
    KillAllBosses,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Encounter {
    state: EncounterState,
    pub score: u32,
    pub bosses_total: u32,
    pub bosses_defeated: u32,
    /// Seconds of play until the outcome was decided
    pub elapsed: f32,
}

impl Encounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EncounterState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == EncounterState::Playing
    }

    pub fn outcome(&self) -> Option<EncounterOutcome> {
        match self.state {
            EncounterState::Playing => None,
            EncounterState::Victory => Some(EncounterOutcome::Victory),
            EncounterState::Defeat => Some(EncounterOutcome::Defeat),
        }
    }

    pub fn register_boss(&mut self) {
        self.bosses_total += 1;
    }

    pub fn advance(&mut self, dt: f32) {
        if self.is_playing() {
            self.elapsed += dt;
        }
    }

    /// Count a boss kill. Returns the outcome if this kill ended the encounter.
    pub fn on_boss_defeated(&mut self) -> Option<EncounterOutcome> {
        self.bosses_defeated += 1;
        self.score += BOSS_KILL_SCORE;
        if self.bosses_defeated >= self.bosses_total {
            self.finish(EncounterOutcome::Victory)
        } else {
            None
        }
    }

    pub fn on_player_defeated(&mut self) -> Option<EncounterOutcome> {
        self.finish(EncounterOutcome::Defeat)
    }

    fn finish(&mut self, outcome: EncounterOutcome) -> Option<EncounterOutcome> {
        if !self.is_playing() {
            return None;
        }
        self.state = outcome.into();
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_victory_after_last_boss() {
        let mut encounter = Encounter::new();
        encounter.register_boss();
        encounter.register_boss();

        assert_eq!(encounter.on_boss_defeated(), None);
        assert_eq!(encounter.on_boss_defeated(), Some(EncounterOutcome::Victory));
        assert_eq!(encounter.score, 200);
        assert_eq!(encounter.state(), EncounterState::Victory);
    }

    #[test]
    fn test_outcome_latches() {
        let mut encounter = Encounter::new();
        encounter.register_boss();
        assert_eq!(encounter.on_player_defeated(), Some(EncounterOutcome::Defeat));
        assert_eq!(encounter.on_boss_defeated(), None);
        assert_eq!(encounter.outcome(), Some(EncounterOutcome::Defeat));
        // Kills still count toward score after the fact.
        assert_eq!(encounter.bosses_defeated, 1);
    }

    #[test]
    fn test_elapsed_stops_with_outcome() {
        let mut encounter = Encounter::new();
        encounter.register_boss();
        encounter.advance(1.5);
        encounter.on_player_defeated();
        encounter.advance(1.0);
        assert_eq!(encounter.elapsed, 1.5);
    }
}
