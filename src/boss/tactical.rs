//! Tactical layer
//!
//! `evaluate` picks the state a boss *wants* to be in; the simulation applies
//! it after the reaction delay. `BossBrain::steer` turns the current state
//! into movement every step.
//!
//! ## Rule precedence (first match wins)
//! 1. Target unseen for longer than the grace window: Patrol
//! 2. Visible and farther than 1.5 x optimal range: Hunt
//! 3. Visible, inside retreat range, below 30% health: Retreat
//! 4. Visible and within optimal range: Engage
//! 5. Visible and below 50% health: Special with chance `unpredictability x 0.1`,
//!    overriding 2-4
//!
//! Anything else keeps the current state.

use bevy::math::Vec3;

use super::{BehaviorParams, BossBrain, TacticalState, TargetSighting};
use crate::combat::constants::{
    ENGAGE_APPROACH_FACTOR, ENGAGE_BACKOFF_FACTOR, HUNT_RANGE_FACTOR, PATROL_SPEED_FACTOR,
    RETREAT_HEALTH_THRESHOLD, RETREAT_LATERAL_SPREAD, RETREAT_LATERAL_WEIGHT, RETREAT_SPEED_FACTOR,
    SPECIAL_CHANCE_SCALE, SPECIAL_HEALTH_THRESHOLD,
};
use crate::combat::rng::RandomSource;

/// Decide the desired tactical state from current perception.
pub fn evaluate(
    current: TacticalState,
    sighting: Option<&TargetSighting>,
    health_fraction: f32,
    last_seen: Option<f32>,
    now: f32,
    params: &BehaviorParams,
    rng: &mut dyn RandomSource,
) -> TacticalState {
    let Some(target) = sighting.filter(|s| s.visible) else {
        let unseen_for = last_seen.map(|t| now - t).unwrap_or(f32::INFINITY);
        return if unseen_for > params.lost_sight_grace {
            TacticalState::Patrol
        } else {
            current
        };
    };

    let mut next = if target.distance > params.optimal_range * HUNT_RANGE_FACTOR {
        TacticalState::Hunt
    } else if target.distance < params.retreat_range && health_fraction < RETREAT_HEALTH_THRESHOLD {
        TacticalState::Retreat
    } else if target.distance <= params.optimal_range {
        TacticalState::Engage
    } else {
        current
    };

    if health_fraction < SPECIAL_HEALTH_THRESHOLD
        && rng.roll(params.unpredictability * SPECIAL_CHANCE_SCALE)
    {
        next = TacticalState::Special;
    }

    next
}

/// Movement request for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    /// Ground-plane direction (zero = hold position)
    pub direction: Vec3,
    /// Multiplier on the boss's effective move speed
    pub speed_factor: f32,
    pub look_at: Option<Vec3>,
}

impl Steering {
    fn hold(look_at: Option<Vec3>) -> Self {
        Self {
            direction: Vec3::ZERO,
            speed_factor: 0.0,
            look_at,
        }
    }
}

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

impl BossBrain {
    /// Movement for the current tactical state.
    ///
    /// Returns None when the state needs a target and there is none.
    pub fn steer(
        &mut self,
        position: Vec3,
        sighting: Option<&TargetSighting>,
        move_speed: f32,
        rng: &mut dyn RandomSource,
    ) -> Option<Steering> {
        match self.tactical() {
            TacticalState::Patrol => Some(self.steer_patrol(position, rng)),
            TacticalState::Hunt => {
                let target = sighting?;
                let time_to_reach = if move_speed > 0.0 {
                    target.distance / move_speed
                } else {
                    0.0
                };
                let predicted = target.position + target.velocity * time_to_reach;
                Some(Steering {
                    direction: flat(predicted - position).normalize_or_zero(),
                    speed_factor: 1.0,
                    look_at: Some(target.position),
                })
            }
            TacticalState::Engage => {
                let target = sighting?;
                let (min, max) = self.behavior.engage_band(&self.params, self.attack_range);
                let toward = flat(target.position - position).normalize_or_zero();
                let steering = if target.distance > max {
                    Steering {
                        direction: toward,
                        speed_factor: ENGAGE_APPROACH_FACTOR,
                        look_at: Some(target.position),
                    }
                } else if target.distance < min {
                    Steering {
                        direction: -toward,
                        speed_factor: ENGAGE_BACKOFF_FACTOR,
                        look_at: Some(target.position),
                    }
                } else {
                    Steering::hold(Some(target.position))
                };
                Some(steering)
            }
            TacticalState::Retreat => {
                let target = sighting?;
                let away = flat(position - target.position).normalize_or_zero();
                let offset = Vec3::new(rng.range(-1.0, 1.0), 0.0, rng.range(-1.0, 1.0))
                    .normalize_or_zero()
                    * RETREAT_LATERAL_SPREAD;
                Some(Steering {
                    direction: (away + offset * RETREAT_LATERAL_WEIGHT).normalize_or_zero(),
                    speed_factor: RETREAT_SPEED_FACTOR,
                    look_at: Some(target.position),
                })
            }
            TacticalState::Special => Some(Steering::hold(sighting.map(|t| t.position))),
        }
    }

    fn steer_patrol(&mut self, position: Vec3, rng: &mut dyn RandomSource) -> Steering {
        let arrived = self
            .patrol_target
            .map(|p| flat(p - position).length() < self.params.arrival_threshold)
            .unwrap_or(true);
        if arrived {
            let offset = rng.inside_unit_circle() * self.params.patrol_radius;
            self.patrol_target = Some(self.patrol_center + Vec3::new(offset.x, 0.0, offset.y));
        }
        let destination = self.patrol_target.unwrap_or(self.patrol_center);
        Steering {
            direction: flat(destination - position).normalize_or_zero(),
            speed_factor: PATROL_SPEED_FACTOR,
            look_at: Some(destination),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boss::{behavior_for, BossKind};
    use crate::combat::combatant::CombatantId;
    use crate::combat::config::BalanceConfig;
    use crate::combat::rng::SequenceRng;

    fn sighting(distance: f32, visible: bool) -> TargetSighting {
        TargetSighting {
            id: CombatantId(1),
            position: Vec3::new(distance, 0.0, 0.0),
            velocity: Vec3::ZERO,
            distance,
            visible,
        }
    }

    fn decide(current: TacticalState, s: Option<TargetSighting>, hp: f32, last_seen: Option<f32>, now: f32) -> TacticalState {
        // 0.99 never passes the special gate (max chance is 0.1)
        let mut rng = SequenceRng::constant(0.99);
        evaluate(current, s.as_ref(), hp, last_seen, now, &BehaviorParams::default(), &mut rng)
    }

    #[test]
    fn test_lost_sight_beyond_grace_patrols() {
        let s = sighting(3.0, false);
        assert_eq!(decide(TacticalState::Engage, Some(s), 1.0, Some(0.0), 5.1), TacticalState::Patrol);
        assert_eq!(decide(TacticalState::Engage, Some(s), 1.0, Some(0.0), 4.0), TacticalState::Engage);
        assert_eq!(decide(TacticalState::Hunt, None, 1.0, None, 0.0), TacticalState::Patrol);
    }

    #[test]
    fn test_distance_rules() {
        assert_eq!(decide(TacticalState::Patrol, Some(sighting(10.0, true)), 1.0, None, 0.0), TacticalState::Hunt);
        assert_eq!(decide(TacticalState::Patrol, Some(sighting(4.0, true)), 1.0, None, 0.0), TacticalState::Engage);
        assert_eq!(decide(TacticalState::Patrol, Some(sighting(5.0, true)), 1.0, None, 0.0), TacticalState::Engage);
        // Between optimal and 1.5x optimal nothing matches: keep state.
        assert_eq!(decide(TacticalState::Hunt, Some(sighting(6.0, true)), 1.0, None, 0.0), TacticalState::Hunt);
    }

    #[test]
    fn test_retreat_needs_low_health_and_close_target() {
        assert_eq!(decide(TacticalState::Engage, Some(sighting(1.0, true)), 0.2, None, 0.0), TacticalState::Retreat);
        assert_eq!(decide(TacticalState::Engage, Some(sighting(1.0, true)), 0.5, None, 0.0), TacticalState::Engage);
        assert_eq!(decide(TacticalState::Engage, Some(sighting(3.0, true)), 0.2, None, 0.0), TacticalState::Engage);
    }

    #[test]
    fn test_special_overrides_when_gate_passes() {
        let params = BehaviorParams {
            unpredictability: 1.0,
            ..BehaviorParams::default()
        };
        // chance = 0.1; 0.05 passes
        let mut rng = SequenceRng::constant(0.05);
        let s = sighting(10.0, true);
        assert_eq!(evaluate(TacticalState::Hunt, Some(&s), 0.4, None, 0.0, &params, &mut rng), TacticalState::Special);
        // Healthy bosses never go special
        assert_eq!(evaluate(TacticalState::Hunt, Some(&s), 0.9, None, 0.0, &params, &mut rng), TacticalState::Hunt);
    }

    #[test]
    fn test_zero_unpredictability_never_goes_special() {
        let params = BehaviorParams {
            unpredictability: 0.0,
            ..BehaviorParams::default()
        };
        let mut rng = SequenceRng::constant(0.0);
        let s = sighting(4.0, true);
        for _ in 0..50 {
            assert_eq!(evaluate(TacticalState::Engage, Some(&s), 0.1, None, 0.0, &params, &mut rng), TacticalState::Engage);
        }
    }

    #[test]
    fn test_retreat_only_left_when_condition_clears() {
        // Still close and hurt: stays in Retreat, never jumps to Engage.
        assert_eq!(decide(TacticalState::Retreat, Some(sighting(1.5, true)), 0.25, None, 0.0), TacticalState::Retreat);
        // Condition cleared by distance: Engage becomes possible.
        assert_eq!(decide(TacticalState::Retreat, Some(sighting(3.0, true)), 0.25, None, 0.0), TacticalState::Engage);
    }

    fn brain(state: TacticalState) -> BossBrain {
        let mut b = BossBrain::new(
            BossKind::Roller,
            BehaviorParams::default(),
            5.0,
            2.0,
            Vec3::ZERO,
            behavior_for(BossKind::Roller, &BalanceConfig::default()),
        );
        b.set_tactical(state, 0.0);
        b
    }

    #[test]
    fn test_engage_holds_band() {
        let mut b = brain(TacticalState::Engage);
        let mut rng = SequenceRng::constant(0.5);

        let far = b.steer(Vec3::ZERO, Some(&sighting(6.0, true)), 3.0, &mut rng).unwrap();
        assert_eq!(far.direction, Vec3::X);
        assert_eq!(far.speed_factor, ENGAGE_APPROACH_FACTOR);

        let close = b.steer(Vec3::ZERO, Some(&sighting(2.0, true)), 3.0, &mut rng).unwrap();
        assert_eq!(close.direction, -Vec3::X);
        assert_eq!(close.speed_factor, ENGAGE_BACKOFF_FACTOR);

        let inside = b.steer(Vec3::ZERO, Some(&sighting(4.0, true)), 3.0, &mut rng).unwrap();
        assert_eq!(inside.direction, Vec3::ZERO);
    }

    #[test]
    fn test_hunt_leads_moving_target() {
        let mut b = brain(TacticalState::Hunt);
        let mut rng = SequenceRng::constant(0.5);
        let mut s = sighting(10.0, true);
        s.velocity = Vec3::new(0.0, 0.0, 1.0);

        let steering = b.steer(Vec3::ZERO, Some(&s), 5.0, &mut rng).unwrap();
        // Predicted point is (10, 0, 2): direction tilts toward +z.
        assert!(steering.direction.z > 0.0);
        assert!(steering.direction.x > 0.0);
    }

    #[test]
    fn test_retreat_moves_away() {
        let mut b = brain(TacticalState::Retreat);
        let mut rng = SequenceRng::new(vec![0.9, 0.1]);
        let steering = b.steer(Vec3::ZERO, Some(&sighting(1.0, true)), 3.0, &mut rng).unwrap();
        assert!(steering.direction.x < 0.0, "moves away from target at +x");
        assert!(steering.direction.z.abs() > 0.0, "lateral offset applied");
        assert_eq!(steering.speed_factor, RETREAT_SPEED_FACTOR);
    }

    #[test]
    fn test_patrol_rerolls_on_arrival() {
        let mut b = brain(TacticalState::Patrol);
        let mut rng = SequenceRng::new(vec![0.25, 1.0]);
        let steering = b.steer(Vec3::ZERO, None, 3.0, &mut rng).unwrap();
        let first = b.patrol_target.unwrap();
        assert!(first.length() <= b.params.patrol_radius + 1e-4);
        assert_eq!(steering.speed_factor, PATROL_SPEED_FACTOR);

        // Standing on the point triggers a new one.
        b.steer(first, None, 3.0, &mut SequenceRng::new(vec![0.75, 1.0])).unwrap();
        assert_ne!(b.patrol_target.unwrap(), first);
    }

    #[test]
    fn test_hunt_without_target_holds() {
        let mut b = brain(TacticalState::Hunt);
        assert!(b.steer(Vec3::ZERO, None, 3.0, &mut SequenceRng::constant(0.5)).is_none());
    }
}
