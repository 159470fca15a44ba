//! Spatial queries
//!
//! The core never solves physics itself. It asks a `SpatialQuery` provider
//! for "who is within this radius" and "what does this ray hit first", and
//! for entity velocities when predicting movement. An engine integration can
//! back the trait with its physics world; `ArenaSpatialIndex` is the
//! in-memory implementation used by the headless runner and tests.

use bevy::math::Vec3;
use smallvec::SmallVec;
use std::collections::HashMap;

use super::combatant::{CombatantId, Faction};

/// Ids returned by a radius query, nearest first.
pub type TargetList = SmallVec<[CombatantId; 8]>;

/// Default collision radius for combatant bodies.
pub const DEFAULT_BODY_RADIUS: f32 = 0.5;

/// Per-step view of a combatant handed to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub id: CombatantId,
    pub faction: Faction,
    pub position: Vec3,
    pub radius: f32,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayTarget {
    Combatant(CombatantId),
    Obstacle(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub target: RayTarget,
    pub point: Vec3,
    pub distance: f32,
}

impl RayHit {
    pub fn combatant(&self) -> Option<CombatantId> {
        match self.target {
            RayTarget::Combatant(id) => Some(id),
            RayTarget::Obstacle(_) => None,
        }
    }
}

/// Static sphere that blocks rays (pillars, rocks).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f32,
}

pub trait SpatialQuery: Send + Sync {
    /// Receive the current body positions. Engine-backed providers that
    /// track bodies themselves can ignore this.
    fn sync(&mut self, _bodies: &[BodySnapshot], _dt: f32) {}

    /// Living combatants whose bodies touch the sphere, optionally filtered
    /// by faction, nearest first.
    fn query_radius(&self, center: Vec3, radius: f32, faction: Option<Faction>) -> TargetList;

    /// First thing hit along the ray within `max_distance`, skipping `ignore`.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: Option<CombatantId>,
    ) -> Option<RayHit>;

    /// Current velocity of a combatant (zero if unknown).
    fn velocity_of(&self, id: CombatantId) -> Vec3;
}

/// Brute-force index over the latest snapshot plus static obstacles.
#[derive(Debug, Clone, Default)]
pub struct ArenaSpatialIndex {
    bodies: Vec<BodySnapshot>,
    previous: HashMap<CombatantId, Vec3>,
    velocities: HashMap<CombatantId, Vec3>,
    obstacles: Vec<Obstacle>,
}

impl ArenaSpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_obstacles(obstacles: Vec<Obstacle>) -> Self {
        Self {
            obstacles,
            ..Self::default()
        }
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }
}

/// Distance along a normalized ray to the sphere surface, if it is hit.
/// Origins inside the sphere hit at distance 0.
fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = oc.dot(direction);
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some(-b - discriminant.sqrt())
}

impl SpatialQuery for ArenaSpatialIndex {
    fn sync(&mut self, bodies: &[BodySnapshot], dt: f32) {
        // A zero-length sync only refreshes positions; velocities keep the
        // values from the last real step.
        if dt > 0.0 {
            self.velocities.clear();
            for body in bodies {
                if let Some(previous) = self.previous.get(&body.id) {
                    self.velocities.insert(body.id, (body.position - *previous) / dt);
                }
            }
            self.previous = bodies.iter().map(|b| (b.id, b.position)).collect();
        }
        self.bodies = bodies.to_vec();
    }

    fn query_radius(&self, center: Vec3, radius: f32, faction: Option<Faction>) -> TargetList {
        let mut found: SmallVec<[(f32, CombatantId); 8]> = self
            .bodies
            .iter()
            .filter(|b| b.alive && faction.map_or(true, |f| b.faction == f))
            .map(|b| (b.position.distance(center), b))
            .filter(|(d, b)| *d <= radius + b.radius)
            .map(|(d, b)| (d, b.id))
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(_, id)| id).collect()
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: Option<CombatantId>,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;

        let bodies = self
            .bodies
            .iter()
            .filter(|b| b.alive && Some(b.id) != ignore)
            .filter_map(|b| {
                ray_sphere(origin, direction, b.position, b.radius)
                    .map(|t| (t, RayTarget::Combatant(b.id)))
            });
        let obstacles = self.obstacles.iter().enumerate().filter_map(|(i, o)| {
            ray_sphere(origin, direction, o.center, o.radius).map(|t| (t, RayTarget::Obstacle(i)))
        });

        bodies
            .chain(obstacles)
            .filter(|(t, _)| *t <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(distance, target)| RayHit {
                target,
                point: origin + direction * distance,
                distance,
            })
    }

    fn velocity_of(&self, id: CombatantId) -> Vec3 {
        self.velocities.get(&id).copied().unwrap_or(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(id: u32, faction: Faction, x: f32) -> BodySnapshot {
        BodySnapshot {
            id: CombatantId(id),
            faction,
            position: Vec3::new(x, 0.0, 0.0),
            radius: DEFAULT_BODY_RADIUS,
            alive: true,
        }
    }

    #[test]
    fn test_radius_query_filters_and_sorts() {
        let mut index = ArenaSpatialIndex::new();
        index.sync(
            &[
                body(1, Faction::Player, 4.0),
                body(2, Faction::Boss, 1.0),
                body(3, Faction::Boss, 2.0),
                body(4, Faction::Boss, 9.0),
            ],
            0.0,
        );

        let bosses = index.query_radius(Vec3::ZERO, 5.0, Some(Faction::Boss));
        assert_eq!(bosses.as_slice(), &[CombatantId(2), CombatantId(3)]);

        let everyone = index.query_radius(Vec3::ZERO, 5.0, None);
        assert_eq!(everyone.len(), 3);
    }

    #[test]
    fn test_dead_bodies_are_invisible() {
        let mut index = ArenaSpatialIndex::new();
        let mut corpse = body(1, Faction::Boss, 1.0);
        corpse.alive = false;
        index.sync(&[corpse], 0.0);
        assert!(index.query_radius(Vec3::ZERO, 5.0, None).is_empty());
        assert!(index.raycast(Vec3::ZERO, Vec3::X, 10.0, None).is_none());
    }

    #[test]
    fn test_raycast_hits_nearest_and_respects_obstacles() {
        let mut index = ArenaSpatialIndex::with_obstacles(vec![Obstacle {
            center: Vec3::new(5.0, 0.0, 0.0),
            radius: 1.0,
        }]);
        index.sync(&[body(1, Faction::Player, 10.0), body(2, Faction::Boss, 0.0)], 0.0);

        let hit = index
            .raycast(Vec3::ZERO, Vec3::X, 20.0, Some(CombatantId(2)))
            .unwrap();
        assert_eq!(hit.target, RayTarget::Obstacle(0));
        assert!((hit.distance - 4.0).abs() < 1e-4);

        let behind = index.raycast(Vec3::new(7.0, 0.0, 0.0), Vec3::X, 20.0, None).unwrap();
        assert_eq!(behind.combatant(), Some(CombatantId(1)));
    }

    #[test]
    fn test_raycast_respects_max_distance() {
        let mut index = ArenaSpatialIndex::new();
        index.sync(&[body(1, Faction::Player, 10.0)], 0.0);
        assert!(index.raycast(Vec3::ZERO, Vec3::X, 5.0, None).is_none());
        assert!(index.raycast(Vec3::ZERO, -Vec3::X, 50.0, None).is_none());
    }

    #[test]
    fn test_velocity_from_consecutive_snapshots() {
        let mut index = ArenaSpatialIndex::new();
        index.sync(&[body(1, Faction::Player, 0.0)], 0.5);
        index.sync(&[body(1, Faction::Player, 1.0)], 0.5);
        assert_eq!(index.velocity_of(CombatantId(1)), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(index.velocity_of(CombatantId(7)), Vec3::ZERO);
    }

    #[test]
    fn test_zero_dt_sync_keeps_velocity() {
        let mut index = ArenaSpatialIndex::new();
        index.sync(&[body(1, Faction::Player, 0.0)], 0.5);
        index.sync(&[body(1, Faction::Player, 1.0)], 0.5);
        index.sync(&[body(1, Faction::Player, 1.2)], 0.0);
        assert_eq!(index.velocity_of(CombatantId(1)), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(
            index.query_radius(Vec3::new(1.2, 0.0, 0.0), 0.1, None).as_slice(),
            &[CombatantId(1)]
        );
    }
}
