//! Scripted player for headless encounters.
//!
//! Walks toward the nearest boss, fires the first skill that is ready and in
//! reach, and heals when health drops low.

use bevy::prelude::*;

use crate::combat::abilities::{AbilityDefinition, AbilityKind};
use crate::combat::combatant::{CombatantId, Faction};
use crate::simulation::{AbilityUse, Simulation};

/// Stop closing in once the target is this fraction of melee reach away.
const APPROACH_FRACTION: f32 = 0.8;

#[derive(Resource, Debug, Clone, Copy)]
pub struct Autopilot {
    /// Health fraction below which the heal skill takes priority
    pub heal_threshold: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self { heal_threshold: 0.4 }
    }
}

fn in_reach(definition: &AbilityDefinition, distance: f32) -> bool {
    match definition.kind {
        AbilityKind::Heal => false,
        AbilityKind::Melee | AbilityKind::Ranged | AbilityKind::Area | AbilityKind::Projectile => {
            distance <= definition.range
        }
    }
}

impl Autopilot {
    /// Drive the player for one step of `dt` seconds. Returns the ability
    /// used this step, if any.
    pub fn drive(&self, sim: &mut Simulation, dt: f32) -> Option<AbilityUse> {
        let player_id = sim.player()?;
        let (position, health_fraction) = {
            let player = sim.combatant(player_id).filter(|p| p.is_alive())?;
            (player.position, player.health_fraction())
        };

        if health_fraction < self.heal_threshold {
            if let Some(used) = self.try_heal(sim, player_id) {
                return Some(used);
            }
        }

        let target_id = sim.nearest_hostile(Faction::Player, position)?;
        let target_position = sim.combatant(target_id)?.position;
        let distance = position.distance(target_position);
        sim.face(player_id, target_position);

        let candidates: Vec<usize> = sim
            .combatant(player_id)?
            .abilities
            .iter()
            .filter(|(_, definition)| in_reach(definition, distance))
            .map(|(index, _)| index)
            .collect();
        for index in candidates {
            if let Ok(used) = sim.try_invoke_ability(player_id, index, None) {
                return Some(used);
            }
        }

        let melee_reach = sim
            .combatant(player_id)?
            .abilities
            .iter()
            .filter(|(_, d)| d.kind == AbilityKind::Melee)
            .map(|(_, d)| d.range)
            .fold(f32::INFINITY, f32::min);
        let stop_distance = if melee_reach.is_finite() {
            melee_reach * APPROACH_FRACTION
        } else {
            0.0
        };
        if distance > stop_distance {
            let mut direction = target_position - position;
            direction.y = 0.0;
            sim.move_combatant(player_id, direction, dt);
        }
        None
    }

    fn try_heal(&self, sim: &mut Simulation, player_id: CombatantId) -> Option<AbilityUse> {
        let heal_index = sim
            .combatant(player_id)?
            .abilities
            .iter()
            .find(|(_, d)| d.kind == AbilityKind::Heal)
            .map(|(index, _)| index)?;
        sim.try_invoke_ability(player_id, heal_index, None).ok()
    }
}
