//! Combat Constants
//!
//! Fixed rules of the simulation. Tunable balance numbers (health, damage,
//! cooldowns, ranges) live in `BalanceConfig`; the values here shape how the
//! systems behave and are not meant to be tweaked per encounter.

// ============================================================================
// Timing
// ============================================================================

/// Slack used when comparing accumulated float timers against zero.
/// A 1/60 s step accumulated over several seconds drifts by far less than this.
pub const TIMER_EPSILON: f32 = 1e-4;

/// Seconds a dead combatant stays in the simulation before it is removed.
pub const CORPSE_REMOVAL_DELAY: f32 = 3.0;

/// Upper bound on scheduler drain passes within one step.
/// Continuations that schedule more zero-delay work are deferred to the next step.
pub const MAX_SCHEDULER_PASSES: usize = 8;

// ============================================================================
// Knockback
// ============================================================================

/// Upward component added to the knockback direction before normalizing.
pub const KNOCKBACK_UPWARD_BIAS: f32 = 0.3;

/// Exponential damping applied to knockback velocity (per second).
pub const KNOCKBACK_DAMPING: f32 = 6.0;

/// Downward acceleration pulling knocked-back bodies to the ground.
pub const GRAVITY: f32 = 9.81;

// ============================================================================
// Tactical Layer
// ============================================================================

/// Beyond this multiple of optimal range a visible target is hunted.
pub const HUNT_RANGE_FACTOR: f32 = 1.5;

/// Health fraction under which a close target triggers a retreat.
pub const RETREAT_HEALTH_THRESHOLD: f32 = 0.3;

/// Health fraction under which the special state may fire.
pub const SPECIAL_HEALTH_THRESHOLD: f32 = 0.5;

/// Scales `unpredictability` into the per-decision chance of entering Special.
pub const SPECIAL_CHANCE_SCALE: f32 = 0.1;

/// Speed multiplier while patrolling.
pub const PATROL_SPEED_FACTOR: f32 = 0.5;

/// Speed multiplier when closing distance in Engage.
pub const ENGAGE_APPROACH_FACTOR: f32 = 0.8;

/// Speed multiplier when backing off in Engage.
pub const ENGAGE_BACKOFF_FACTOR: f32 = 0.5;

/// Fraction of optimal range under which an engaged boss backs off.
pub const ENGAGE_MIN_RANGE_FACTOR: f32 = 0.7;

/// Speed multiplier while retreating.
pub const RETREAT_SPEED_FACTOR: f32 = 1.2;

/// Weight of the random lateral offset mixed into the retreat direction.
pub const RETREAT_LATERAL_WEIGHT: f32 = 0.3;

/// Length of the random lateral offset before weighting.
pub const RETREAT_LATERAL_SPREAD: f32 = 2.0;

/// Cosine of the half-angle of the forward cone melee and ranged attacks search.
pub const FORWARD_CONE_COS: f32 = 0.5;

// ============================================================================
// Execution Layer
// ============================================================================

/// Idle bosses start chasing inside this multiple of attack range.
pub const CHASE_START_FACTOR: f32 = 2.0;

/// Chasing bosses give up beyond this multiple of attack range.
pub const CHASE_GIVE_UP_FACTOR: f32 = 3.0;

// ============================================================================
// Projectiles
// ============================================================================

/// Contact radius used to detect a projectile touching a combatant.
pub const PROJECTILE_CONTACT_RADIUS: f32 = 0.5;

/// Projectiles that never touch anything are removed after this many seconds.
pub const PROJECTILE_MAX_LIFETIME: f32 = 5.0;

/// Player skill projectiles fly at this speed (units per second).
pub const SKILL_PROJECTILE_SPEED: f32 = 15.0;

// ============================================================================
// Encounter
// ============================================================================

/// Score awarded for every boss kill.
pub const BOSS_KILL_SCORE: u32 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tactical_thresholds_are_fractions() {
        assert!(RETREAT_HEALTH_THRESHOLD > 0.0 && RETREAT_HEALTH_THRESHOLD < 1.0);
        assert!(SPECIAL_HEALTH_THRESHOLD > 0.0 && SPECIAL_HEALTH_THRESHOLD < 1.0);
        assert!(RETREAT_HEALTH_THRESHOLD < SPECIAL_HEALTH_THRESHOLD);
    }

    #[test]
    fn test_engage_band_is_inside_hunt_range() {
        assert!(ENGAGE_MIN_RANGE_FACTOR < 1.0);
        assert!(HUNT_RANGE_FACTOR > 1.0);
    }

    #[test]
    fn test_chase_hysteresis() {
        // Giving up must happen further out than starting, or bosses flicker.
        assert!(CHASE_GIVE_UP_FACTOR > CHASE_START_FACTOR);
    }

    #[test]
    fn test_epsilon_is_below_a_frame() {
        assert!(TIMER_EPSILON < 1.0 / 240.0);
    }
}
