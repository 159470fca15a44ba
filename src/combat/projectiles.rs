//! Traveling projectiles
//!
//! Fireballs and thrown fruit fly until their first qualifying contact
//! (a hostile body, an obstacle, or the ground for ballistic throws), then
//! explode exactly once. The explosion itself is resolved by the simulation
//! against every hostile inside the blast radius.

use bevy::math::Vec3;

use super::combatant::{CombatantId, Faction};
use super::constants::{GRAVITY, PROJECTILE_CONTACT_RADIUS, PROJECTILE_MAX_LIFETIME};
use super::damage::DamageKind;
use super::spatial::SpatialQuery;
use super::status::StatusEffectSpec;

/// Stable handle for a projectile. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub u64);

/// What a projectile touched this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    Combatant(CombatantId),
    Obstacle,
    Ground,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner: CombatantId,
    /// Faction of the thrower; only opposing bodies trigger contact
    pub faction: Faction,
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Ballistic projectiles fall and explode on the ground
    pub ballistic: bool,
    pub damage: f32,
    pub kind: DamageKind,
    pub explosion_radius: f32,
    pub knockback: bool,
    pub status_effects: Vec<StatusEffectSpec>,
    /// Distance after which a straight projectile fizzles
    pub max_range: f32,
    pub traveled: f32,
    pub age: f32,
    exploded: bool,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProjectileId,
        owner: CombatantId,
        faction: Faction,
        name: impl Into<String>,
        position: Vec3,
        velocity: Vec3,
        damage: f32,
        kind: DamageKind,
        explosion_radius: f32,
    ) -> Self {
        Self {
            id,
            owner,
            faction,
            name: name.into(),
            position,
            velocity,
            ballistic: false,
            damage,
            kind,
            explosion_radius,
            knockback: false,
            status_effects: Vec::new(),
            max_range: f32::INFINITY,
            traveled: 0.0,
            age: 0.0,
            exploded: false,
        }
    }

    pub fn ballistic(mut self) -> Self {
        self.ballistic = true;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.max_range = range;
        self
    }

    pub fn with_knockback(mut self, knockback: bool) -> Self {
        self.knockback = knockback;
        self
    }

    pub fn with_status_effects(mut self, effects: Vec<StatusEffectSpec>) -> Self {
        self.status_effects = effects;
        self
    }

    pub fn has_exploded(&self) -> bool {
        self.exploded
    }

    /// Latch the explosion. Returns true only the first time, so a second
    /// contact after exploding resolves nothing.
    pub fn explode(&mut self) -> bool {
        if self.exploded {
            return false;
        }
        self.exploded = true;
        true
    }

    /// Move one step and report the first contact along the way, if any.
    pub fn advance(&mut self, dt: f32, spatial: &dyn SpatialQuery) -> Option<Contact> {
        if self.exploded {
            return None;
        }

        let start = self.position;
        if self.ballistic {
            self.velocity.y -= GRAVITY * dt;
        }
        let step = self.velocity * dt;
        let length = step.length();
        self.age += dt;

        if length > 0.0 {
            if let Some(hit) = spatial.raycast(start, step, length, Some(self.owner)) {
                self.position = hit.point;
                self.traveled += hit.distance;
                return Some(match hit.combatant() {
                    Some(_) => self.contact_at(hit.point, spatial).unwrap_or(Contact::Obstacle),
                    None => Contact::Obstacle,
                });
            }
        }

        self.position = start + step;
        self.traveled += length;

        if let Some(contact) = self.contact_at(self.position, spatial) {
            return Some(contact);
        }
        if self.ballistic && self.position.y <= 0.0 {
            self.position.y = 0.0;
            return Some(Contact::Ground);
        }
        None
    }

    /// Straight projectiles that exceed range or lifetime disappear without exploding.
    pub fn is_spent(&self) -> bool {
        self.exploded || self.traveled >= self.max_range || self.age >= PROJECTILE_MAX_LIFETIME
    }

    fn contact_at(&self, point: Vec3, spatial: &dyn SpatialQuery) -> Option<Contact> {
        spatial
            .query_radius(point, PROJECTILE_CONTACT_RADIUS, Some(self.faction.opponent()))
            .first()
            .map(|id| Contact::Combatant(*id))
    }
}
