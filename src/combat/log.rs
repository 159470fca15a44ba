//! Combat logging
//!
//! Records combat events for display and post-encounter analysis.

use bevy::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::combatant::{CombatantId, Faction};
use super::damage::DamageKind;
use super::events::CombatEvent;
use crate::encounter::EncounterOutcome;

/// A single entry in the combat log
#[derive(Debug, Clone, Serialize)]
pub struct CombatLogEntry {
    /// Timestamp in encounter time (seconds since the encounter started)
    pub timestamp: f32,
    /// The type of event
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
    /// Who caused the health change, for damage and healing entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Health actually changed, for damage and healing entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f32>,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CombatLogEventType {
    /// Damage dealt
    Damage,
    /// Healing done
    Healing,
    /// Ability used
    AbilityUsed,
    /// Status effect applied or refreshed
    StatusApplied,
    /// Status effect expired
    StatusRemoved,
    /// Boss tactical or execution state change
    StateChange,
    /// Combatant died
    Death,
    /// Encounter event (start, end)
    EncounterEvent,
}

/// Per-combatant summary written next to the log entries.
#[derive(Debug, Clone, Serialize)]
pub struct CombatantMetadata {
    pub name: String,
    pub faction: Faction,
    pub max_health: f32,
    pub final_health: f32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_received: f32,
    pub final_position: (f32, f32, f32),
}

#[derive(Debug, Clone, Serialize)]
pub struct EncounterMetadata {
    /// None when the encounter timed out
    pub outcome: Option<EncounterOutcome>,
    pub duration: f32,
    pub score: u32,
    pub bosses_defeated: u32,
    pub random_seed: Option<u64>,
    pub combatants: Vec<CombatantMetadata>,
}

#[derive(Serialize)]
struct SavedLog<'a> {
    metadata: &'a EncounterMetadata,
    entries: &'a [CombatLogEntry],
}

/// The combat log resource storing all events
#[derive(Resource, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current encounter time
    pub encounter_time: f32,
}

impl CombatLog {
    /// Clear the log for a new encounter
    pub fn clear(&mut self) {
        self.entries.clear();
        self.encounter_time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.encounter_time,
            event_type,
            message,
            source: None,
            amount: None,
        });
    }

    /// Add a health-changing entry attributed to `source`
    pub fn log_amount(
        &mut self,
        event_type: CombatLogEventType,
        message: String,
        source: Option<String>,
        amount: f32,
    ) {
        self.entries.push(CombatLogEntry {
            timestamp: self.encounter_time,
            event_type,
            message,
            source,
            amount: Some(amount),
        });
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get only HP-changing events (damage and healing)
    pub fn hp_changes_only(&self) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    CombatLogEventType::Damage | CombatLogEventType::Healing
                )
            })
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Total damage per source name. Unattributed damage is left out.
    pub fn damage_by_source(&self) -> BTreeMap<String, f32> {
        let mut totals = BTreeMap::new();
        for entry in &self.entries {
            if entry.event_type != CombatLogEventType::Damage {
                continue;
            }
            if let (Some(source), Some(amount)) = (&entry.source, entry.amount) {
                *totals.entry(source.clone()).or_insert(0.0) += amount;
            }
        }
        totals
    }

    /// Turn a simulation event into a log entry. Events with nothing worth
    /// reading (blocked hits, corpse removal) are skipped.
    pub fn record_event(&mut self, event: &CombatEvent, name_of: impl Fn(CombatantId) -> String) {
        match event {
            CombatEvent::Hit(result) => {
                if result.kind == DamageKind::Heal || result.applied <= 0.0 {
                    return;
                }
                let source = result.source.map(&name_of);
                let crit = if result.is_critical { " (Critical)" } else { "" };
                let message = format!(
                    "{}'s {} hits {} for {:.0} {} damage{}",
                    source.as_deref().unwrap_or("Unknown"),
                    result.ability,
                    name_of(result.target),
                    result.applied,
                    result.kind.name(),
                    crit
                );
                self.log_amount(CombatLogEventType::Damage, message, source, result.applied);
            }
            CombatEvent::Healed {
                target,
                source,
                amount,
            } => {
                let source = source.map(&name_of);
                let message = match &source {
                    Some(name) => format!("{} heals {} for {:.0}", name, name_of(*target), amount),
                    None => format!("{} recovers {:.0} health", name_of(*target), amount),
                };
                self.log_amount(CombatLogEventType::Healing, message, source, *amount);
            }
            CombatEvent::StatusTick {
                target,
                status,
                amount,
                source,
            } => {
                // Healing ticks are already reported through `Healed`
                if status.is_beneficial() || *amount <= 0.0 {
                    return;
                }
                let source = source.map(&name_of);
                let message = format!(
                    "{} suffers {:.0} damage from {}",
                    name_of(*target),
                    amount,
                    status.name()
                );
                self.log_amount(CombatLogEventType::Damage, message, source, *amount);
            }
            CombatEvent::StatusApplied {
                target,
                status,
                refreshed,
                ..
            } => {
                let message = if *refreshed {
                    format!("{} on {} is refreshed", status.name(), name_of(*target))
                } else {
                    format!("{} is afflicted by {}", name_of(*target), status.name())
                };
                self.log(CombatLogEventType::StatusApplied, message);
            }
            CombatEvent::StatusExpired { target, status } => {
                self.log(
                    CombatLogEventType::StatusRemoved,
                    format!("{} fades from {}", status.name(), name_of(*target)),
                );
            }
            CombatEvent::AbilityUsed { caster, ability, .. } => {
                self.log(
                    CombatLogEventType::AbilityUsed,
                    format!("{} uses {}", name_of(*caster), ability),
                );
            }
            CombatEvent::TacticalStateChanged { boss, from, to } => {
                self.log(
                    CombatLogEventType::StateChange,
                    format!("{} tactical: {} -> {}", name_of(*boss), from.name(), to.name()),
                );
            }
            CombatEvent::ExecutionStateChanged { boss, from, to } => {
                self.log(
                    CombatLogEventType::StateChange,
                    format!("{} execution: {} -> {}", name_of(*boss), from.name(), to.name()),
                );
            }
            CombatEvent::Died { name, .. } => {
                self.log(CombatLogEventType::Death, format!("{} has been slain", name));
            }
            CombatEvent::EncounterEnded { outcome } => {
                self.log(
                    CombatLogEventType::EncounterEvent,
                    format!("Encounter ended: {}", outcome.name()),
                );
            }
            CombatEvent::ProjectileExploded { .. } | CombatEvent::Removed { .. } => {}
        }
    }

    /// Write the log and metadata as pretty JSON. Returns the path written.
    ///
    /// Without an explicit path the file goes to `encounter_logs/` with a
    /// Unix-timestamp name.
    pub fn save_to_file(
        &self,
        metadata: &EncounterMetadata,
        path: Option<&str>,
    ) -> Result<String, String> {
        let filename = match path {
            Some(path) => path.to_string(),
            None => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                format!("encounter_logs/encounter_{}.json", stamp)
            }
        };

        if let Some(parent) = Path::new(&filename).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
            }
        }

        let json = serde_json::to_string_pretty(&SavedLog {
            metadata,
            entries: &self.entries,
        })
        .map_err(|e| format!("Failed to serialize combat log: {}", e))?;

        std::fs::write(&filename, json).map_err(|e| format!("Failed to write {}: {}", filename, e))?;
        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boss::TacticalState;
    use crate::combat::damage::DamageResult;
    use crate::combat::status::StatusType;

    fn names(id: CombatantId) -> String {
        match id.0 {
            0 => "Player".to_string(),
            _ => "Roller".to_string(),
        }
    }

    fn hit(applied: f32, kind: DamageKind) -> DamageResult {
        DamageResult {
            target: CombatantId(1),
            source: Some(CombatantId(0)),
            ability: "Basic Attack".to_string(),
            damage: applied,
            applied,
            kind,
            is_critical: false,
            impact_point: Vec3::ZERO,
            impact_direction: Vec3::X,
            knocked_back: false,
            statuses: Vec::new(),
            killed: false,
        }
    }

    #[test]
    fn test_blocked_hits_are_skipped() {
        let mut log = CombatLog::default();
        log.record_event(&CombatEvent::Hit(hit(0.0, DamageKind::Physical)), names);
        assert!(log.entries.is_empty());
    }

    #[test]
    fn test_damage_aggregates_by_source() {
        let mut log = CombatLog::default();
        log.record_event(&CombatEvent::Hit(hit(25.0, DamageKind::Physical)), names);
        log.record_event(&CombatEvent::Hit(hit(40.0, DamageKind::Fire)), names);
        log.record_event(
            &CombatEvent::StatusTick {
                target: CombatantId(1),
                status: StatusType::Burn,
                amount: 5.0,
                source: Some(CombatantId(0)),
            },
            names,
        );

        let totals = log.damage_by_source();
        assert_eq!(totals.get("Player"), Some(&70.0));
        assert_eq!(log.hp_changes_only().len(), 3);
        assert_eq!(log.entries[0].message, "Player's Basic Attack hits Roller for 25 Physical damage");
    }

    #[test]
    fn test_filter_and_recent() {
        let mut log = CombatLog::default();
        log.record_event(
            &CombatEvent::TacticalStateChanged {
                boss: CombatantId(1),
                from: TacticalState::Patrol,
                to: TacticalState::Hunt,
            },
            names,
        );
        log.encounter_time = 2.0;
        log.record_event(&CombatEvent::EncounterEnded { outcome: EncounterOutcome::Victory }, names);

        assert_eq!(log.filter_by_type(CombatLogEventType::StateChange).len(), 1);
        let recent = log.recent(1);
        assert_eq!(recent[0].message, "Encounter ended: Victory");
        assert_eq!(recent[0].timestamp, 2.0);

        log.clear();
        assert!(log.entries.is_empty());
        assert_eq!(log.encounter_time, 0.0);
    }
}
