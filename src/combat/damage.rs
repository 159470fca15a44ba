//! Damage Resolver
//!
//! Turns one hit into a health change: variance, crit roll, heal-or-damage
//! application, knockback, and status attachment, in that order. Every call
//! produces a `DamageResult` for presentation collaborators, even when the
//! hit did nothing.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use super::combatant::{Combatant, CombatantId};
use super::config::CombatTuning;
use super::constants::KNOCKBACK_UPWARD_BIAS;
use super::rng::RandomSource;
use super::status::{StatusApplication, StatusEffectSpec, StatusType};

/// Damage flavor. `Heal` flips the sign: the value restores health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageKind {
    Physical,
    Fire,
    Ice,
    Lightning,
    Poison,
    Heal,
}

impl DamageKind {
    pub fn name(&self) -> &'static str {
        match self {
            DamageKind::Physical => "Physical",
            DamageKind::Fire => "Fire",
            DamageKind::Ice => "Ice",
            DamageKind::Lightning => "Lightning",
            DamageKind::Poison => "Poison",
            DamageKind::Heal => "Heal",
        }
    }

    pub fn is_heal(&self) -> bool {
        matches!(self, DamageKind::Heal)
    }
}

/// Who is attacking and what rides along with the hit.
#[derive(Debug, Clone, Copy)]
pub struct Attack<'a> {
    pub source: Option<CombatantId>,
    /// Label used in logs ("Fireball", "Roll", ...)
    pub name: &'a str,
    pub knockback: bool,
    pub status_effects: &'a [StatusEffectSpec],
}

impl<'a> Attack<'a> {
    pub fn new(source: Option<CombatantId>, name: &'a str) -> Self {
        Self {
            source,
            name,
            knockback: false,
            status_effects: &[],
        }
    }

    pub fn with_knockback(mut self, knockback: bool) -> Self {
        self.knockback = knockback;
        self
    }

    pub fn with_status_effects(mut self, effects: &'a [StatusEffectSpec]) -> Self {
        self.status_effects = effects;
        self
    }
}

/// The geometry and magnitude of a single hit.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub base: f32,
    pub kind: DamageKind,
    pub impact_point: Vec3,
    pub impact_direction: Vec3,
}

/// Outcome of one resolver call.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageResult {
    pub target: CombatantId,
    pub source: Option<CombatantId>,
    pub ability: String,
    /// Value after variance and crit (0.0 when the hit was blocked)
    pub damage: f32,
    /// Health actually removed or restored after clamping
    pub applied: f32,
    pub kind: DamageKind,
    pub is_critical: bool,
    pub impact_point: Vec3,
    pub impact_direction: Vec3,
    pub knocked_back: bool,
    /// Statuses attached (or refreshed) by this hit
    pub statuses: Vec<(StatusType, StatusApplication)>,
    pub killed: bool,
}

/// Resolves hits using the encounter's crit/variance/knockback tuning.
#[derive(Debug, Clone, Copy)]
pub struct DamageResolver {
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub variance: f32,
    pub knockback_force: f32,
    pub knockback_duration: f32,
}

impl Default for DamageResolver {
    fn default() -> Self {
        Self::from_tuning(&CombatTuning::default())
    }
}

impl DamageResolver {
    pub fn from_tuning(tuning: &CombatTuning) -> Self {
        Self {
            crit_chance: tuning.crit_chance,
            crit_multiplier: tuning.crit_multiplier,
            variance: tuning.damage_variance,
            knockback_force: tuning.knockback_force,
            knockback_duration: tuning.knockback_duration,
        }
    }

    /// Resolve `hit` against `target`.
    ///
    /// Dead targets take nothing. Invulnerable targets take no damage but may
    /// still be healed. A blocked hit carries no knockback or statuses.
    pub fn resolve(
        &self,
        attack: &Attack,
        target: &mut Combatant,
        hit: Hit,
        rng: &mut dyn RandomSource,
    ) -> DamageResult {
        let mut result = DamageResult {
            target: target.id,
            source: attack.source,
            ability: attack.name.to_string(),
            damage: 0.0,
            applied: 0.0,
            kind: hit.kind,
            is_critical: false,
            impact_point: hit.impact_point,
            impact_direction: hit.impact_direction,
            knocked_back: false,
            statuses: Vec::new(),
            killed: false,
        };

        let blocked = target.is_dead() || (!hit.kind.is_heal() && target.is_invulnerable());
        if blocked {
            return result;
        }

        let mut value = hit.base.max(0.0);
        if self.variance > 0.0 {
            value *= 1.0 + rng.range(-self.variance, self.variance);
        }
        if rng.roll(self.crit_chance) {
            value *= self.crit_multiplier;
            result.is_critical = true;
        }
        result.damage = value;

        if hit.kind.is_heal() {
            result.applied = target.apply_heal(value);
        } else {
            result.applied = target.apply_damage(value);
            result.killed = target.is_dead();
        }

        if attack.knockback && !hit.kind.is_heal() && !target.is_dead() && target.has_body {
            result.knocked_back = self.apply_knockback(target, hit.impact_direction);
        }

        for spec in attack.status_effects {
            let application = target.apply_status(*spec, attack.source);
            if application != StatusApplication::Ignored {
                result.statuses.push((spec.status_type, application));
            }
        }

        result
    }

    fn apply_knockback(&self, target: &mut Combatant, direction: Vec3) -> bool {
        let flat = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
        if flat == Vec3::ZERO || self.knockback_force <= 0.0 {
            return false;
        }
        let impulse = (flat + Vec3::Y * KNOCKBACK_UPWARD_BIAS).normalize() * self.knockback_force;
        target.apply_knockback(impulse, self.knockback_duration);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Faction;
    use crate::combat::rng::SequenceRng;
    use crate::combat::status::StatusEffectSpec;

    fn flat_resolver() -> DamageResolver {
        DamageResolver {
            crit_chance: 0.0,
            crit_multiplier: 2.0,
            variance: 0.0,
            knockback_force: 5.0,
            knockback_duration: 0.3,
        }
    }

    fn dummy(max: f32) -> Combatant {
        Combatant::new(CombatantId(1), "Dummy", Faction::Boss, max, 3.0)
    }

    fn hit(base: f32, kind: DamageKind) -> Hit {
        Hit {
            base,
            kind,
            impact_point: Vec3::ZERO,
            impact_direction: Vec3::X,
        }
    }

    #[test]
    fn test_overkill_clamps_and_kills() {
        let resolver = flat_resolver();
        let mut target = dummy(100.0);
        let mut rng = SequenceRng::constant(0.5);

        let result = resolver.resolve(&Attack::new(None, "Slam"), &mut target, hit(150.0, DamageKind::Physical), &mut rng);

        assert_eq!(result.damage, 150.0);
        assert_eq!(result.applied, 100.0);
        assert!(result.killed);
        assert_eq!(target.current_health(), 0.0);
        assert!(target.is_dead());
    }

    #[test]
    fn test_crit_always_procs_at_chance_one() {
        let resolver = DamageResolver {
            crit_chance: 1.0,
            ..flat_resolver()
        };
        let mut target = dummy(100.0);
        let mut rng = SequenceRng::constant(0.99);

        let result = resolver.resolve(&Attack::new(None, "Strike"), &mut target, hit(10.0, DamageKind::Fire), &mut rng);
        assert!(result.is_critical);
        assert_eq!(result.damage, 20.0);
    }

    #[test]
    fn test_variance_bounds() {
        let resolver = DamageResolver {
            variance: 0.1,
            ..flat_resolver()
        };
        // range(-0.1, 0.1) with 0.0 gives -0.1, with ~1.0 gives ~+0.1
        let mut low_rng = SequenceRng::constant(0.0);
        let mut high_rng = SequenceRng::constant(0.999_999);

        let mut a = dummy(1000.0);
        let low = resolver.resolve(&Attack::new(None, "A"), &mut a, hit(100.0, DamageKind::Physical), &mut low_rng);
        let mut b = dummy(1000.0);
        let high = resolver.resolve(&Attack::new(None, "A"), &mut b, hit(100.0, DamageKind::Physical), &mut high_rng);

        assert!((low.damage - 90.0).abs() < 1e-3);
        assert!((high.damage - 110.0).abs() < 1e-3);
    }

    #[test]
    fn test_negative_base_is_clamped() {
        let resolver = flat_resolver();
        let mut target = dummy(100.0);
        let mut rng = SequenceRng::constant(0.5);
        let result = resolver.resolve(&Attack::new(None, "Oops"), &mut target, hit(-40.0, DamageKind::Physical), &mut rng);
        assert_eq!(result.damage, 0.0);
        assert_eq!(target.current_health(), 100.0);
    }

    #[test]
    fn test_dead_target_is_untouched() {
        let resolver = flat_resolver();
        let mut target = dummy(50.0);
        target.apply_damage(50.0);
        let burn = [StatusEffectSpec::burn(3.0, 1.0, 5.0)];
        let attack = Attack::new(None, "Fireball").with_status_effects(&burn).with_knockback(true);
        let mut rng = SequenceRng::constant(0.5);

        let result = resolver.resolve(&attack, &mut target, hit(10.0, DamageKind::Fire), &mut rng);
        assert_eq!(result.damage, 0.0);
        assert!(result.statuses.is_empty());
        assert!(!result.knocked_back);
        assert!(!target.status.has(StatusType::Burn));
    }

    #[test]
    fn test_heal_restores_health_without_damage_path() {
        let resolver = flat_resolver();
        let mut target = dummy(100.0);
        target.apply_damage(60.0);
        let mut rng = SequenceRng::constant(0.5);

        let result = resolver.resolve(&Attack::new(None, "Heal"), &mut target, hit(50.0, DamageKind::Heal), &mut rng);
        assert_eq!(result.applied, 50.0);
        assert_eq!(target.current_health(), 90.0);
        assert!(!result.knocked_back);
    }

    #[test]
    fn test_knockback_locks_movement_and_attaches_status() {
        let resolver = flat_resolver();
        let mut target = dummy(100.0);
        let slow = [StatusEffectSpec::slow(2.0, 0.5)];
        let attack = Attack::new(Some(CombatantId(9)), "Shockwave")
            .with_knockback(true)
            .with_status_effects(&slow);
        let mut rng = SequenceRng::constant(0.5);

        let result = resolver.resolve(&attack, &mut target, hit(10.0, DamageKind::Physical), &mut rng);
        assert!(result.knocked_back);
        assert_eq!(result.statuses, vec![(StatusType::Slow, StatusApplication::Applied)]);
        assert!(!target.can_move());
        assert!(target.velocity.y > 0.0, "knockback carries an upward bias");
        assert!(target.velocity.x > 0.0);
        assert_eq!(target.status.get(StatusType::Slow).unwrap().source, Some(CombatantId(9)));

        target.advance_timers(0.31);
        assert!(target.can_move());
    }
}
