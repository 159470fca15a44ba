//! Combat events
//!
//! Everything observable that happens inside the simulation is reported as a
//! `CombatEvent`. The core hands each event to its registered
//! `CombatObserver`s as it happens and also queues it in an outbox that the
//! Bevy layer forwards as an ECS event once per frame.

use bevy::prelude::*;

use super::combatant::{CombatantId, Faction};
use super::damage::DamageResult;
use super::projectiles::ProjectileId;
use super::status::StatusType;
use crate::boss::{ExecutionState, TacticalState};
use crate::encounter::EncounterOutcome;

#[derive(Event, Debug, Clone, PartialEq)]
pub enum CombatEvent {
    /// A Damage Resolver call finished (including blocked hits)
    Hit(DamageResult),
    /// Health was restored by a heal ability or regeneration tick
    Healed {
        target: CombatantId,
        source: Option<CombatantId>,
        amount: f32,
    },
    /// A periodic status tick changed health
    StatusTick {
        target: CombatantId,
        status: StatusType,
        amount: f32,
        source: Option<CombatantId>,
    },
    StatusApplied {
        target: CombatantId,
        status: StatusType,
        source: Option<CombatantId>,
        refreshed: bool,
    },
    StatusExpired {
        target: CombatantId,
        status: StatusType,
    },
    AbilityUsed {
        caster: CombatantId,
        index: usize,
        ability: String,
    },
    ProjectileExploded {
        projectile: ProjectileId,
        owner: CombatantId,
        position: Vec3,
        targets: usize,
    },
    TacticalStateChanged {
        boss: CombatantId,
        from: TacticalState,
        to: TacticalState,
    },
    ExecutionStateChanged {
        boss: CombatantId,
        from: ExecutionState,
        to: ExecutionState,
    },
    Died {
        id: CombatantId,
        name: String,
        faction: Faction,
    },
    /// The corpse left the simulation
    Removed { id: CombatantId },
    EncounterEnded { outcome: EncounterOutcome },
}

/// Receives simulation events as they happen (audio, effects, UI, tests).
///
/// The specific hooks default to nothing; `notify_event` sees everything.
pub trait CombatObserver: Send + Sync {
    fn notify_damage_result(&mut self, _result: &DamageResult) {}

    fn notify_death(&mut self, _id: CombatantId, _name: &str) {}

    fn notify_heal(&mut self, _id: CombatantId, _amount: f32) {}

    fn notify_event(&mut self, _event: &CombatEvent) {}
}

/// Route an event to the matching observer hooks.
pub fn dispatch_to_observer(observer: &mut dyn CombatObserver, event: &CombatEvent) {
    match event {
        CombatEvent::Hit(result) => observer.notify_damage_result(result),
        CombatEvent::Died { id, name, .. } => observer.notify_death(*id, name),
        CombatEvent::Healed { target, amount, .. } => observer.notify_heal(*target, *amount),
        _ => {}
    }
    observer.notify_event(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        deaths: usize,
        heals: f32,
        events: usize,
    }

    impl CombatObserver for Counter {
        fn notify_death(&mut self, _id: CombatantId, _name: &str) {
            self.deaths += 1;
        }

        fn notify_heal(&mut self, _id: CombatantId, amount: f32) {
            self.heals += amount;
        }

        fn notify_event(&mut self, _event: &CombatEvent) {
            self.events += 1;
        }
    }

    #[test]
    fn test_dispatch_routes_specific_hooks() {
        let mut counter = Counter::default();
        dispatch_to_observer(
            &mut counter,
            &CombatEvent::Died {
                id: CombatantId(1),
                name: "Roller".to_string(),
                faction: Faction::Boss,
            },
        );
        dispatch_to_observer(
            &mut counter,
            &CombatEvent::Healed {
                target: CombatantId(2),
                source: None,
                amount: 12.0,
            },
        );
        dispatch_to_observer(&mut counter, &CombatEvent::Removed { id: CombatantId(1) });

        assert_eq!(counter.deaths, 1);
        assert_eq!(counter.heals, 12.0);
        assert_eq!(counter.events, 3);
    }
}
