//! Ability catalogue and cooldown gating
//!
//! Every combatant carries an `AbilityBook`: an indexed list of ability slots,
//! each remembering when it was last used. The book answers "may this slot
//! fire now?" and stamps usage; resolving what the ability *does* is the
//! simulation's job (see `Simulation::try_invoke_ability`).
//!
//! Cooldown rule: a slot is ready when `now - last_used >= cooldown`. Usage is
//! stamped before any effect resolves, so a failed or partial resolution can
//! never be used to bypass the cooldown.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::combatant::CombatantId;
use super::constants::{SKILL_PROJECTILE_SPEED, TIMER_EPSILON};
use super::damage::DamageKind;
use super::status::StatusEffectSpec;

/// How an ability reaches its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Short forward probe; hits the first enemy in range
    Melee,
    /// Long forward probe; hits the first enemy in range
    Ranged,
    /// Spawns a traveling projectile that explodes on first contact
    Projectile,
    /// Hits every enemy within `range` of the caster
    Area,
    /// Heals the caster or a designated ally
    Heal,
}

fn default_projectile_speed() -> f32 {
    SKILL_PROJECTILE_SPEED
}

fn default_damage_kind() -> DamageKind {
    DamageKind::Physical
}

/// Static description of an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    pub kind: AbilityKind,
    /// Damage, or healing for `AbilityKind::Heal`
    pub amount: f32,
    /// Seconds between uses
    pub cooldown: f32,
    /// Reach for melee/ranged, radius for area, travel range for projectiles
    pub range: f32,
    #[serde(default)]
    pub resource_cost: f32,
    #[serde(default = "default_damage_kind")]
    pub damage_kind: DamageKind,
    /// Explosion radius (projectiles only)
    #[serde(default)]
    pub radius: f32,
    #[serde(default = "default_projectile_speed")]
    pub projectile_speed: f32,
    #[serde(default)]
    pub knockback: bool,
    #[serde(default)]
    pub status_effects: Vec<StatusEffectSpec>,
}

impl AbilityDefinition {
    pub fn new(name: impl Into<String>, kind: AbilityKind, amount: f32, cooldown: f32, range: f32) -> Self {
        let damage_kind = if kind == AbilityKind::Heal {
            DamageKind::Heal
        } else {
            DamageKind::Physical
        };
        Self {
            name: name.into(),
            kind,
            amount,
            cooldown,
            range,
            resource_cost: 0.0,
            damage_kind,
            radius: 0.0,
            projectile_speed: SKILL_PROJECTILE_SPEED,
            knockback: false,
            status_effects: Vec::new(),
        }
    }

    pub fn with_cost(mut self, cost: f32) -> Self {
        self.resource_cost = cost;
        self
    }

    pub fn with_damage_kind(mut self, kind: DamageKind) -> Self {
        self.damage_kind = kind;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_knockback(mut self) -> Self {
        self.knockback = true;
        self
    }

    pub fn with_status(mut self, spec: StatusEffectSpec) -> Self {
        self.status_effects.push(spec);
        self
    }

    /// Check the definition for values that would make it unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("ability name must not be empty".to_string());
        }
        if self.amount < 0.0 {
            return Err(format!("ability '{}' has negative amount", self.name));
        }
        if self.cooldown < 0.0 {
            return Err(format!("ability '{}' has negative cooldown", self.name));
        }
        if self.kind != AbilityKind::Heal && self.range <= 0.0 {
            return Err(format!("ability '{}' needs a positive range", self.name));
        }
        if self.kind == AbilityKind::Projectile && (self.radius <= 0.0 || self.projectile_speed <= 0.0) {
            return Err(format!(
                "projectile ability '{}' needs a positive radius and speed",
                self.name
            ));
        }
        if (self.kind == AbilityKind::Heal) != (self.damage_kind == DamageKind::Heal) {
            return Err(format!(
                "ability '{}' mixes heal and damage semantics",
                self.name
            ));
        }
        Ok(())
    }
}

/// Why an invocation was rejected. None of these mutate state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("ability index {index} out of range (book has {len} slots)")]
    InvalidIndex { index: usize, len: usize },
    #[error("no ability defined in slot {index}")]
    Undefined { index: usize },
    #[error("caster {0:?} does not exist")]
    UnknownCaster(CombatantId),
    #[error("caster is dead")]
    CasterDead,
    #[error("caster cannot act (stunned or frozen)")]
    Incapacitated,
    #[error("on cooldown for another {remaining:.2}s")]
    OnCooldown { remaining: f32 },
    #[error("needs {needed:.0} resource, has {available:.0}")]
    InsufficientResource { needed: f32, available: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbilitySlot {
    pub definition: AbilityDefinition,
    pub last_used: Option<f32>,
}

impl AbilitySlot {
    fn remaining(&self, now: f32) -> f32 {
        match self.last_used {
            Some(last) => (self.definition.cooldown - (now - last)).max(0.0),
            None => 0.0,
        }
    }
}

/// A combatant's indexed abilities. Empty slots are allowed and reject use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilityBook {
    slots: Vec<Option<AbilitySlot>>,
}

impl AbilityBook {
    pub fn new(definitions: Vec<AbilityDefinition>) -> Self {
        Self::from_slots(definitions.into_iter().map(Some).collect())
    }

    pub fn from_slots(slots: Vec<Option<AbilityDefinition>>) -> Self {
        Self {
            slots: slots
                .into_iter()
                .map(|def| {
                    def.map(|definition| AbilitySlot {
                        definition,
                        last_used: None,
                    })
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AbilityDefinition> {
        self.slot(index).ok().map(|s| &s.definition)
    }

    pub fn last_used(&self, index: usize) -> Option<f32> {
        self.slot(index).ok().and_then(|s| s.last_used)
    }

    /// Index of the first slot whose ability has the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .map(|s| s.definition.name == name)
                .unwrap_or(false)
        })
    }

    /// Validate the slot and its cooldown without mutating anything.
    pub fn check(&self, index: usize, now: f32) -> Result<&AbilityDefinition, InvokeError> {
        let slot = self.slot(index)?;
        let remaining = slot.remaining(now);
        if remaining > TIMER_EPSILON {
            return Err(InvokeError::OnCooldown { remaining });
        }
        Ok(&slot.definition)
    }

    /// Record a use at `now`. Callers check first; stamping an invalid slot is a no-op.
    pub fn stamp(&mut self, index: usize, now: f32) {
        if let Some(Some(slot)) = self.slots.get_mut(index) {
            slot.last_used = Some(now);
        }
    }

    pub fn is_ready(&self, index: usize, now: f32) -> bool {
        self.check(index, now).is_ok()
    }

    /// Seconds until the slot is usable again (0.0 when ready or invalid).
    pub fn cooldown_remaining(&self, index: usize, now: f32) -> f32 {
        self.slot(index).map(|s| s.remaining(now)).unwrap_or(0.0)
    }

    /// 0.0 right after use, 1.0 when ready.
    pub fn cooldown_progress(&self, index: usize, now: f32) -> f32 {
        match self.slot(index) {
            Ok(slot) if slot.definition.cooldown > 0.0 => {
                1.0 - slot.remaining(now) / slot.definition.cooldown
            }
            _ => 1.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &AbilityDefinition)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (i, &s.definition)))
    }

    fn slot(&self, index: usize) -> Result<&AbilitySlot, InvokeError> {
        match self.slots.get(index) {
            None => Err(InvokeError::InvalidIndex {
                index,
                len: self.slots.len(),
            }),
            Some(None) => Err(InvokeError::Undefined { index }),
            Some(Some(slot)) => Ok(slot),
        }
    }
}
