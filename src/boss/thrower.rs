//! Thrower boss
//!
//! Keeps its distance and throws exploding fruit: a single aimed throw after
//! a wind-up, a rapid burst, or a lobbed arc. Heals itself once its health
//! drops under the threshold, no more often than the heal cooldown.

use bevy::math::Vec3;

use super::{BehaviorParams, BossBehavior, BossCommand, BossContext, BossKind, BossTimer};
use crate::combat::config::ThrowerTuning;
use crate::combat::rng::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrowerAttack {
    Single,
    Burst,
    Arc,
}

impl ThrowerAttack {
    const ALL: [ThrowerAttack; 3] = [ThrowerAttack::Single, ThrowerAttack::Burst, ThrowerAttack::Arc];
}

#[derive(Debug, Clone)]
pub struct ThrowerBehavior {
    tuning: ThrowerTuning,
    last_heal: Option<f32>,
    healing: bool,
}

impl ThrowerBehavior {
    pub fn new(tuning: ThrowerTuning) -> Self {
        Self {
            tuning,
            last_heal: None,
            healing: false,
        }
    }

    pub fn is_healing(&self) -> bool {
        self.healing
    }

    pub fn start(&mut self, attack: ThrowerAttack, ctx: &BossContext) -> Vec<BossCommand> {
        match attack {
            ThrowerAttack::Single => vec![BossCommand::Schedule {
                delay: self.tuning.windup,
                timer: BossTimer::ThrowSingle,
            }],
            ThrowerAttack::Burst => self.burst_throw(ctx, self.tuning.burst_count),
            ThrowerAttack::Arc => vec![BossCommand::Schedule {
                delay: self.tuning.windup,
                timer: BossTimer::ThrowArc,
            }],
        }
    }

    fn straight_throw(&self, ctx: &BossContext, name: &'static str) -> BossCommand {
        BossCommand::Throw {
            name,
            velocity: ctx.direction_to_target() * self.tuning.throw_force,
            damage: self.tuning.throw_damage,
            explosion_radius: self.tuning.explosion_radius,
            ballistic: false,
        }
    }

    /// Throw one fruit now and queue the rest of the burst.
    fn burst_throw(&self, ctx: &BossContext, remaining: u32) -> Vec<BossCommand> {
        if remaining == 0 || ctx.target.is_none() {
            return Vec::new();
        }
        let mut commands = vec![self.straight_throw(ctx, "Burst Throw")];
        if remaining > 1 {
            commands.push(BossCommand::Schedule {
                delay: self.tuning.burst_interval,
                timer: BossTimer::BurstThrow {
                    remaining: remaining - 1,
                },
            });
        }
        commands
    }
}

impl BossBehavior for ThrowerBehavior {
    fn kind(&self) -> BossKind {
        BossKind::Thrower
    }

    fn perform_attack(&mut self, ctx: &BossContext, rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        if ctx.target.is_none() {
            return Vec::new();
        }
        let attack = ThrowerAttack::ALL[rng.index(ThrowerAttack::ALL.len())];
        self.start(attack, ctx)
    }

    fn perform_special(&mut self, ctx: &BossContext, _rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        self.start(ThrowerAttack::Burst, ctx)
    }

    fn update(&mut self, ctx: &BossContext, _rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        if self.healing || ctx.health_fraction >= self.tuning.heal_threshold {
            return Vec::new();
        }
        let off_cooldown = self
            .last_heal
            .map(|t| ctx.now - t >= self.tuning.heal_cooldown)
            .unwrap_or(true);
        if !off_cooldown {
            return Vec::new();
        }

        self.healing = true;
        self.last_heal = Some(ctx.now);
        vec![BossCommand::Schedule {
            delay: self.tuning.heal_delay,
            timer: BossTimer::SelfHeal,
        }]
    }

    fn on_timer(&mut self, timer: BossTimer, ctx: &BossContext, _rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        match timer {
            BossTimer::ThrowSingle if ctx.target.is_some() => vec![self.straight_throw(ctx, "Fruit Throw")],
            BossTimer::ThrowArc if ctx.target.is_some() => {
                let velocity = ctx.direction_to_target() * self.tuning.throw_force
                    + Vec3::Y * self.tuning.arc_lift * self.tuning.throw_force;
                vec![BossCommand::Throw {
                    name: "Arc Throw",
                    velocity,
                    damage: self.tuning.arc_damage,
                    explosion_radius: self.tuning.explosion_radius,
                    ballistic: true,
                }]
            }
            BossTimer::BurstThrow { remaining } => self.burst_throw(ctx, remaining),
            BossTimer::SelfHeal => {
                self.healing = false;
                vec![BossCommand::HealSelf {
                    amount: self.tuning.heal_amount,
                }]
            }
            _ => Vec::new(),
        }
    }

    fn engage_band(&self, _params: &BehaviorParams, attack_range: f32) -> (f32, f32) {
        (
            attack_range * self.tuning.min_range_factor,
            attack_range * self.tuning.max_range_factor,
        )
    }

    fn interrupt(&mut self) {
        // A cancelled heal does not spend the heal cooldown.
        if self.healing {
            self.healing = false;
            self.last_heal = None;
        }
    }

    fn on_death(&mut self) {
        self.healing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boss::TargetSighting;
    use crate::combat::combatant::CombatantId;
    use crate::combat::rng::SequenceRng;

    fn ctx(now: f32, health_fraction: f32) -> BossContext {
        BossContext {
            id: CombatantId(2),
            now,
            position: Vec3::ZERO,
            facing: Vec3::Z,
            health_fraction,
            attack_range: 5.0,
            target: Some(TargetSighting {
                id: CombatantId(1),
                position: Vec3::new(0.0, 0.0, 6.0),
                velocity: Vec3::ZERO,
                distance: 6.0,
                visible: true,
            }),
        }
    }

    #[test]
    fn test_single_throw_after_windup() {
        let mut thrower = ThrowerBehavior::new(ThrowerTuning::default());
        let mut rng = SequenceRng::constant(0.0);
        let cmds = thrower.perform_attack(&ctx(0.0, 1.0), &mut rng);
        assert_eq!(
            cmds,
            vec![BossCommand::Schedule {
                delay: 0.5,
                timer: BossTimer::ThrowSingle
            }]
        );

        let cmds = thrower.on_timer(BossTimer::ThrowSingle, &ctx(0.5, 1.0), &mut rng);
        assert!(matches!(
            cmds[0],
            BossCommand::Throw { velocity, damage, ballistic: false, .. }
                if velocity == Vec3::new(0.0, 0.0, 10.0) && damage == 15.0
        ));
    }

    #[test]
    fn test_burst_throws_count_then_stops() {
        let mut thrower = ThrowerBehavior::new(ThrowerTuning::default());
        let mut rng = SequenceRng::constant(0.5);
        let mut throws = 0;
        let mut cmds = thrower.perform_attack(&ctx(0.0, 1.0), &mut rng);
        loop {
            let mut next = None;
            for cmd in &cmds {
                match cmd {
                    BossCommand::Throw { .. } => throws += 1,
                    BossCommand::Schedule { timer, delay } => {
                        assert_eq!(*delay, 0.3);
                        next = Some(*timer);
                    }
                    _ => {}
                }
            }
            match next {
                Some(timer) => cmds = thrower.on_timer(timer, &ctx(0.0, 1.0), &mut rng),
                None => break,
            }
        }
        assert_eq!(throws, 3);
    }

    #[test]
    fn test_burst_stops_without_target() {
        let mut thrower = ThrowerBehavior::new(ThrowerTuning::default());
        let mut c = ctx(0.0, 1.0);
        c.target = None;
        let cmds = thrower.on_timer(BossTimer::BurstThrow { remaining: 2 }, &c, &mut SequenceRng::constant(0.0));
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_arc_throw_lobs() {
        let mut thrower = ThrowerBehavior::new(ThrowerTuning::default());
        let cmds = thrower.on_timer(BossTimer::ThrowArc, &ctx(0.5, 1.0), &mut SequenceRng::constant(0.0));
        assert!(matches!(
            cmds[0],
            BossCommand::Throw { velocity, damage, ballistic: true, .. }
                if velocity == Vec3::new(0.0, 5.0, 10.0) && damage == 20.0
        ));
    }

    #[test]
    fn test_self_heal_threshold_and_cooldown() {
        let mut thrower = ThrowerBehavior::new(ThrowerTuning::default());
        let mut rng = SequenceRng::constant(0.0);

        assert!(thrower.update(&ctx(0.0, 0.5), &mut rng).is_empty());

        let cmds = thrower.update(&ctx(1.0, 0.2), &mut rng);
        assert_eq!(
            cmds,
            vec![BossCommand::Schedule {
                delay: 1.0,
                timer: BossTimer::SelfHeal
            }]
        );
        assert!(thrower.is_healing());
        assert!(thrower.update(&ctx(1.5, 0.2), &mut rng).is_empty());

        let cmds = thrower.on_timer(BossTimer::SelfHeal, &ctx(2.0, 0.2), &mut rng);
        assert_eq!(cmds, vec![BossCommand::HealSelf { amount: 20.0 }]);

        // Cooldown counts from the start of the heal
        assert!(thrower.update(&ctx(10.9, 0.2), &mut rng).is_empty());
        assert_eq!(thrower.update(&ctx(11.0, 0.2), &mut rng).len(), 1);
    }

    #[test]
    fn test_interrupted_heal_can_restart() {
        let mut thrower = ThrowerBehavior::new(ThrowerTuning::default());
        let mut rng = SequenceRng::constant(0.0);
        assert_eq!(thrower.update(&ctx(1.0, 0.2), &mut rng).len(), 1);

        thrower.interrupt();
        assert!(!thrower.is_healing());
        assert_eq!(thrower.update(&ctx(2.0, 0.2), &mut rng).len(), 1);
    }

    #[test]
    fn test_engage_band_keeps_distance() {
        let thrower = ThrowerBehavior::new(ThrowerTuning::default());
        let (min, max) = thrower.engage_band(&BehaviorParams::default(), 5.0);
        assert!((min - 3.5).abs() < 1e-5);
        assert!((max - 7.5).abs() < 1e-5);
    }
}
