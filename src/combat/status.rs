//! Status Effect Tracker
//!
//! Per-combatant registry of timed effects (burn, freeze, stun, poison, slow,
//! regeneration). At most one instance per type is active; re-applying a type
//! refreshes its timers instead of stacking.
//!
//! Effects have two halves:
//! - an *immediate* side-effect applied once on creation and reversed once on
//!   expiry or explicit removal (stun/freeze lock movement and actions, slow
//!   scales move speed)
//! - a *periodic* side-effect fired every `tick_interval` while time remains
//!   (burn/poison damage, regeneration healing)
//!
//! The tracker only decides *when* ticks happen. The owning `Combatant` turns
//! the returned `StatusEvent::Tick`s into health changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::combatant::CombatantId;
use super::constants::TIMER_EPSILON;

/// Speed factor used by a slow whose spec carries no usable value.
pub const DEFAULT_SLOW_FACTOR: f32 = 0.5;

/// The fixed set of status effect kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusType {
    Burn,
    Freeze,
    Stun,
    Poison,
    Slow,
    Regeneration,
}

impl StatusType {
    pub fn name(&self) -> &'static str {
        match self {
            StatusType::Burn => "Burn",
            StatusType::Freeze => "Freeze",
            StatusType::Stun => "Stun",
            StatusType::Poison => "Poison",
            StatusType::Slow => "Slow",
            StatusType::Regeneration => "Regeneration",
        }
    }

    /// Whether ticks of this effect heal rather than damage.
    pub fn is_beneficial(&self) -> bool {
        matches!(self, StatusType::Regeneration)
    }

    /// Whether this effect locks movement and ability use while active.
    pub fn is_control(&self) -> bool {
        matches!(self, StatusType::Stun | StatusType::Freeze)
    }
}

/// Description of an effect to apply.
///
/// `value` is the per-tick amount for burn/poison/regeneration and the speed
/// multiplier for slow. Control effects ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectSpec {
    pub status_type: StatusType,
    /// Total duration in seconds
    pub duration: f32,
    /// Seconds between periodic ticks (0.0 = no ticks)
    #[serde(default)]
    pub tick_interval: f32,
    #[serde(default)]
    pub value: f32,
}

impl StatusEffectSpec {
    pub fn new(status_type: StatusType, duration: f32, tick_interval: f32, value: f32) -> Self {
        Self {
            status_type,
            duration,
            tick_interval,
            value,
        }
    }

    pub fn burn(duration: f32, tick_interval: f32, damage: f32) -> Self {
        Self::new(StatusType::Burn, duration, tick_interval, damage)
    }

    pub fn poison(duration: f32, tick_interval: f32, damage: f32) -> Self {
        Self::new(StatusType::Poison, duration, tick_interval, damage)
    }

    pub fn regeneration(duration: f32, tick_interval: f32, heal: f32) -> Self {
        Self::new(StatusType::Regeneration, duration, tick_interval, heal)
    }

    pub fn stun(duration: f32) -> Self {
        Self::new(StatusType::Stun, duration, 0.0, 0.0)
    }

    pub fn freeze(duration: f32) -> Self {
        Self::new(StatusType::Freeze, duration, 0.0, 0.0)
    }

    pub fn slow(duration: f32, factor: f32) -> Self {
        Self::new(StatusType::Slow, duration, 0.0, factor)
    }

    fn slow_factor(&self) -> f32 {
        if self.value > 0.0 && self.value <= 1.0 {
            self.value
        } else {
            DEFAULT_SLOW_FACTOR
        }
    }
}

/// Movement/action locks and speed scaling contributed by active effects.
///
/// Locks are counted so overlapping sources (a stun during a knockback, a
/// freeze during a stun) release independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    movement_locks: u32,
    action_locks: u32,
    speed_factor: f32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            movement_locks: 0,
            action_locks: 0,
            speed_factor: 1.0,
        }
    }
}

impl ControlState {
    pub fn lock_movement(&mut self) {
        self.movement_locks += 1;
    }

    pub fn release_movement(&mut self) {
        self.movement_locks = self.movement_locks.saturating_sub(1);
    }

    pub fn lock_actions(&mut self) {
        self.action_locks += 1;
    }

    pub fn release_actions(&mut self) {
        self.action_locks = self.action_locks.saturating_sub(1);
    }

    pub fn set_speed_factor(&mut self, factor: f32) {
        self.speed_factor = factor;
    }

    pub fn can_move(&self) -> bool {
        self.movement_locks == 0
    }

    pub fn can_act(&self) -> bool {
        self.action_locks == 0
    }

    pub fn speed_factor(&self) -> f32 {
        self.speed_factor
    }
}

/// A live effect instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStatusEffect {
    pub status_type: StatusType,
    pub remaining: f32,
    pub tick_interval: f32,
    pub until_next_tick: f32,
    pub value: f32,
    /// Who applied it (for log attribution)
    pub source: Option<CombatantId>,
    immediate_applied: bool,
}

/// What `apply` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusApplication {
    Applied,
    Refreshed,
    Ignored,
}

/// Something that happened while advancing the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEvent {
    Tick {
        status_type: StatusType,
        value: f32,
        source: Option<CombatantId>,
    },
    Expired(StatusType),
}

#[derive(Debug, Clone, Default)]
pub struct StatusEffectTracker {
    effects: BTreeMap<StatusType, ActiveStatusEffect>,
}

impl StatusEffectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply or refresh an effect. A spec with `duration <= 0` is ignored.
    pub fn apply(
        &mut self,
        spec: StatusEffectSpec,
        source: Option<CombatantId>,
        control: &mut ControlState,
    ) -> StatusApplication {
        if spec.duration <= 0.0 {
            return StatusApplication::Ignored;
        }

        if let Some(existing) = self.effects.get_mut(&spec.status_type) {
            // Refresh timers only; the immediate side-effect is already in place.
            existing.remaining = spec.duration;
            existing.tick_interval = spec.tick_interval.max(0.0);
            existing.until_next_tick = existing.tick_interval;
            // A slow keeps the factor already applied to `control`.
            if spec.status_type != StatusType::Slow {
                existing.value = spec.value;
            }
            existing.source = source.or(existing.source);
            return StatusApplication::Refreshed;
        }

        let mut effect = ActiveStatusEffect {
            status_type: spec.status_type,
            remaining: spec.duration,
            tick_interval: spec.tick_interval.max(0.0),
            until_next_tick: spec.tick_interval.max(0.0),
            value: spec.value,
            source,
            immediate_applied: false,
        };
        apply_immediate(&mut effect, &spec, control);
        self.effects.insert(spec.status_type, effect);
        StatusApplication::Applied
    }

    /// Advance every effect by `dt` seconds.
    ///
    /// Ticks due inside this step are reported before the expiry of the same
    /// effect, so an effect whose last tick lands exactly on its end still
    /// fires it. Ticks never extend past the effect's remaining lifetime,
    /// even for large `dt`.
    pub fn advance(&mut self, dt: f32, control: &mut ControlState) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        let mut expired = Vec::new();

        for effect in self.effects.values_mut() {
            let mut budget = dt.min(effect.remaining.max(0.0));
            effect.remaining -= dt;

            if effect.tick_interval > 0.0 {
                while effect.until_next_tick <= budget + TIMER_EPSILON {
                    budget -= effect.until_next_tick;
                    effect.until_next_tick = effect.tick_interval;
                    events.push(StatusEvent::Tick {
                        status_type: effect.status_type,
                        value: effect.value,
                        source: effect.source,
                    });
                }
                effect.until_next_tick -= budget.max(0.0);
            }

            if effect.remaining <= TIMER_EPSILON {
                expired.push(effect.status_type);
            }
        }

        for status_type in expired {
            if self.remove(status_type, control) {
                events.push(StatusEvent::Expired(status_type));
            }
        }

        events
    }

    /// Remove an effect and reverse its immediate side-effect.
    /// Returns false if no such effect was active.
    pub fn remove(&mut self, status_type: StatusType, control: &mut ControlState) -> bool {
        match self.effects.remove(&status_type) {
            Some(mut effect) => {
                reverse_immediate(&mut effect, control);
                true
            }
            None => false,
        }
    }

    /// Drop every effect without reversing anything. Used when the owner dies.
    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn has(&self, status_type: StatusType) -> bool {
        self.effects.contains_key(&status_type)
    }

    /// Seconds left on an effect, or 0.0 if it isn't active.
    pub fn remaining(&self, status_type: StatusType) -> f32 {
        self.effects
            .get(&status_type)
            .map(|e| e.remaining.max(0.0))
            .unwrap_or(0.0)
    }

    pub fn get(&self, status_type: StatusType) -> Option<&ActiveStatusEffect> {
        self.effects.get(&status_type)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveStatusEffect> {
        self.effects.values()
    }
}

fn apply_immediate(effect: &mut ActiveStatusEffect, spec: &StatusEffectSpec, control: &mut ControlState) {
    if effect.immediate_applied {
        return;
    }
    match effect.status_type {
        StatusType::Stun | StatusType::Freeze => {
            control.lock_movement();
            control.lock_actions();
        }
        StatusType::Slow => {
            effect.value = spec.slow_factor();
            control.set_speed_factor(effect.value);
        }
        StatusType::Burn | StatusType::Poison | StatusType::Regeneration => {}
    }
    effect.immediate_applied = true;
}

fn reverse_immediate(effect: &mut ActiveStatusEffect, control: &mut ControlState) {
    if !effect.immediate_applied {
        return;
    }
    match effect.status_type {
        StatusType::Stun | StatusType::Freeze => {
            control.release_movement();
            control.release_actions();
        }
        StatusType::Slow => control.set_speed_factor(1.0),
        StatusType::Burn | StatusType::Poison | StatusType::Regeneration => {}
    }
    effect.immediate_applied = false;
}
