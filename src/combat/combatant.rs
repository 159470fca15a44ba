//! Combatant State
//!
//! The shared record for anything that can deal or receive damage: the
//! player and every boss. Health is clamped to `[0, max]`; death is a one-way
//! latch after which damage, healing and new statuses are ignored.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::abilities::AbilityBook;
use super::constants::{GRAVITY, KNOCKBACK_DAMPING, TIMER_EPSILON};
use super::status::{
    ControlState, StatusApplication, StatusEffectSpec, StatusEffectTracker, StatusEvent, StatusType,
};

/// Stable handle for a combatant inside a `Simulation`. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub u32);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Boss,
}

impl Faction {
    pub fn is_hostile_to(&self, other: Faction) -> bool {
        *self != other
    }

    pub fn opponent(&self) -> Faction {
        match self {
            Faction::Player => Faction::Boss,
            Faction::Boss => Faction::Player,
        }
    }
}

/// Mana-like pool spent by abilities with a resource cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourcePool {
    pub current: f32,
    pub max: f32,
    /// Regained per second
    pub regen: f32,
}

impl ResourcePool {
    pub fn full(max: f32, regen: f32) -> Self {
        Self {
            current: max,
            max,
            regen,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub faction: Faction,
    current_health: f32,
    max_health: f32,
    dead: bool,
    death_reported: bool,
    /// Seconds of invulnerability granted after each damaging hit (0 = none)
    pub invulnerability_window: f32,
    invulnerable_remaining: f32,
    /// Debug toggle: ignore all damage
    pub god_mode: bool,
    pub position: Vec3,
    pub facing: Vec3,
    pub base_move_speed: f32,
    /// Knockback velocity, integrated and damped every step
    pub velocity: Vec3,
    /// Whether knockback impulses affect this combatant
    pub has_body: bool,
    pub control: ControlState,
    pub status: StatusEffectTracker,
    knockback_lock: f32,
    pub abilities: AbilityBook,
    pub last_attack_time: Option<f32>,
    pub resource: Option<ResourcePool>,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_received: f32,
}

impl Combatant {
    pub fn new(id: CombatantId, name: impl Into<String>, faction: Faction, max_health: f32, move_speed: f32) -> Self {
        Self {
            id,
            name: name.into(),
            faction,
            current_health: max_health,
            max_health,
            dead: false,
            death_reported: false,
            invulnerability_window: 0.0,
            invulnerable_remaining: 0.0,
            god_mode: false,
            position: Vec3::ZERO,
            facing: Vec3::Z,
            base_move_speed: move_speed,
            velocity: Vec3::ZERO,
            has_body: true,
            control: ControlState::default(),
            status: StatusEffectTracker::new(),
            knockback_lock: 0.0,
            abilities: AbilityBook::default(),
            last_attack_time: None,
            resource: None,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            healing_received: 0.0,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_invulnerability(mut self, window: f32) -> Self {
        self.invulnerability_window = window.max(0.0);
        self
    }

    pub fn with_abilities(mut self, abilities: AbilityBook) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_resource(mut self, pool: ResourcePool) -> Self {
        self.resource = Some(pool);
        self
    }

    pub fn current_health(&self) -> f32 {
        self.current_health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            self.current_health / self.max_health
        } else {
            0.0
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    pub fn is_invulnerable(&self) -> bool {
        self.god_mode || self.invulnerable_remaining > 0.0
    }

    /// Remove up to `amount` health. Returns what was actually removed.
    ///
    /// No-op (returns 0) on dead or invulnerable combatants. A damaging hit
    /// opens the invulnerability window; reaching 0 health kills.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        if self.dead || self.is_invulnerable() || !(amount > 0.0) {
            return 0.0;
        }

        let applied = amount.min(self.current_health);
        self.current_health = (self.current_health - applied).clamp(0.0, self.max_health);
        self.damage_taken += applied;

        if applied > 0.0 && self.invulnerability_window > 0.0 {
            self.invulnerable_remaining = self.invulnerability_window;
        }
        if self.current_health <= 0.0 {
            self.die();
        }

        self.debug_validate();
        applied
    }

    /// Restore up to `amount` health. Returns what was actually restored.
    pub fn apply_heal(&mut self, amount: f32) -> f32 {
        if self.dead || !(amount > 0.0) {
            return 0.0;
        }
        let applied = amount.min(self.max_health - self.current_health);
        self.current_health = (self.current_health + applied).clamp(0.0, self.max_health);
        self.healing_received += applied;
        self.debug_validate();
        applied
    }

    /// Force death regardless of invulnerability. Returns false if already dead.
    pub fn kill(&mut self) -> bool {
        if self.dead {
            return false;
        }
        self.damage_taken += self.current_health;
        self.current_health = 0.0;
        self.die();
        true
    }

    fn die(&mut self) {
        self.current_health = 0.0;
        self.dead = true;
        self.velocity = Vec3::ZERO;
        // Death cancels effects without reversing them.
        self.status.clear();
    }

    /// True exactly once after death, so the death notification fires once.
    pub fn take_death_notice(&mut self) -> bool {
        if self.dead && !self.death_reported {
            self.death_reported = true;
            true
        } else {
            false
        }
    }

    pub fn apply_status(&mut self, spec: StatusEffectSpec, source: Option<CombatantId>) -> StatusApplication {
        if self.dead {
            return StatusApplication::Ignored;
        }
        self.status.apply(spec, source, &mut self.control)
    }

    pub fn remove_status(&mut self, status_type: StatusType) -> bool {
        self.status.remove(status_type, &mut self.control)
    }

    /// Advance status effects and apply their ticks to health.
    ///
    /// Returned `Tick` events carry the health actually changed. Ticks
    /// bypass crits and knockback, but respect invulnerability.
    pub fn advance_status(&mut self, dt: f32) -> Vec<StatusEvent> {
        if self.dead {
            return Vec::new();
        }

        let raw = self.status.advance(dt, &mut self.control);
        let mut events = Vec::with_capacity(raw.len());
        for event in raw {
            match event {
                StatusEvent::Tick {
                    status_type,
                    value,
                    source,
                } => {
                    if self.dead {
                        break;
                    }
                    let applied = if status_type.is_beneficial() {
                        self.apply_heal(value)
                    } else {
                        self.apply_damage(value)
                    };
                    events.push(StatusEvent::Tick {
                        status_type,
                        value: applied,
                        source,
                    });
                }
                StatusEvent::Expired(status_type) => {
                    if !self.dead {
                        events.push(StatusEvent::Expired(status_type));
                    }
                }
            }
        }
        events
    }

    /// Start a knockback: set the impulse and lock movement for `lock_duration`.
    pub fn apply_knockback(&mut self, impulse: Vec3, lock_duration: f32) {
        if self.dead || !self.has_body {
            return;
        }
        self.velocity = impulse;
        if lock_duration > 0.0 {
            if self.knockback_lock <= 0.0 {
                self.control.lock_movement();
            }
            self.knockback_lock = self.knockback_lock.max(lock_duration);
        }
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback_lock > 0.0
    }

    /// Tick invulnerability, knockback and resource regeneration.
    pub fn advance_timers(&mut self, dt: f32) {
        if self.invulnerable_remaining > 0.0 {
            self.invulnerable_remaining = (self.invulnerable_remaining - dt).max(0.0);
        }

        if self.knockback_lock > 0.0 {
            self.knockback_lock -= dt;
            if self.knockback_lock <= TIMER_EPSILON {
                self.knockback_lock = 0.0;
                self.control.release_movement();
            }
        }

        if self.velocity != Vec3::ZERO {
            self.position += self.velocity * dt;
            self.velocity.y -= GRAVITY * dt;
            let damping = (-KNOCKBACK_DAMPING * dt).exp();
            self.velocity.x *= damping;
            self.velocity.z *= damping;
            if self.position.y <= 0.0 {
                self.position.y = 0.0;
                self.velocity.y = 0.0;
            }
            if self.velocity.length_squared() < 1e-4 {
                self.velocity = Vec3::ZERO;
            }
        }

        if let Some(pool) = self.resource.as_mut() {
            if !self.dead {
                pool.current = (pool.current + pool.regen * dt).min(pool.max);
            }
        }
    }

    pub fn can_move(&self) -> bool {
        !self.dead && self.control.can_move()
    }

    pub fn can_act(&self) -> bool {
        !self.dead && self.control.can_act()
    }

    /// Base speed scaled by any active slow.
    pub fn effective_move_speed(&self) -> f32 {
        self.base_move_speed * self.control.speed_factor()
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// Turn to face `point` on the ground plane.
    pub fn face(&mut self, point: Vec3) {
        let dir = Vec3::new(point.x - self.position.x, 0.0, point.z - self.position.z);
        if let Some(dir) = dir.try_normalize() {
            self.facing = dir;
        }
    }

    /// Walk along `direction` on the ground plane at `speed` for `dt`.
    /// Does nothing while movement is locked. Returns whether it moved.
    pub fn step_along(&mut self, direction: Vec3, speed: f32, dt: f32) -> bool {
        if !self.can_move() || speed <= 0.0 {
            return false;
        }
        let Some(dir) = Vec3::new(direction.x, 0.0, direction.z).try_normalize() else {
            return false;
        };
        self.position += dir * speed * dt;
        self.facing = dir;
        true
    }

    /// Walk toward `point` without overshooting it.
    pub fn step_towards(&mut self, point: Vec3, speed: f32, dt: f32) -> bool {
        let offset = Vec3::new(point.x - self.position.x, 0.0, point.z - self.position.z);
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return false;
        }
        let step = (speed * dt).min(distance);
        if step <= 0.0 {
            return false;
        }
        self.step_along(offset, step / dt.max(f32::EPSILON), dt)
    }

    /// Spend `cost` from the resource pool. Combatants without a pool pay nothing.
    pub fn try_spend_resource(&mut self, cost: f32) -> Result<(), (f32, f32)> {
        match self.resource.as_mut() {
            Some(pool) if cost > 0.0 => {
                if pool.current + TIMER_EPSILON < cost {
                    return Err((cost, pool.current));
                }
                pool.current = (pool.current - cost).max(0.0);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Check combatant invariants.
    ///
    /// In debug builds, this panics on invariant violations.
    /// In release builds, this is a no-op.
    #[inline]
    pub fn debug_validate(&self) {
        debug_assert!(
            self.current_health >= 0.0,
            "{} health cannot be negative: {}",
            self.name,
            self.current_health
        );
        debug_assert!(
            self.current_health <= self.max_health,
            "{} health ({}) cannot exceed max_health ({})",
            self.name,
            self.current_health,
            self.max_health
        );
        debug_assert!(
            !self.dead || self.current_health == 0.0,
            "{} is dead with {} health",
            self.name,
            self.current_health
        );
        debug_assert!(
            !self.dead || self.status.is_empty(),
            "{} is dead but still has {} status effects",
            self.name,
            self.status.len()
        );
    }
}
