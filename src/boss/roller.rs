//! Roller boss
//!
//! Picks one of three attacks at random:
//! - Roll: charges along the direction to the target for a fixed duration,
//!   dealing contact damage at most once per contact interval
//! - Bounce: jumps, then lands after a delay with an area impact
//! - Shockwave: immediate area blast with knockback

use bevy::math::Vec3;

use super::{BossBehavior, BossCommand, BossContext, BossKind, BossTimer};
use crate::combat::config::RollerTuning;
use crate::combat::constants::TIMER_EPSILON;
use crate::combat::damage::DamageKind;
use crate::combat::rng::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollerAttack {
    Roll,
    Bounce,
    Shockwave,
}

impl RollerAttack {
    const ALL: [RollerAttack; 3] = [RollerAttack::Roll, RollerAttack::Bounce, RollerAttack::Shockwave];
}

#[derive(Debug, Clone)]
pub struct RollerBehavior {
    tuning: RollerTuning,
    rolling_until: Option<f32>,
    roll_direction: Vec3,
    last_contact: Option<f32>,
    bouncing: bool,
}

impl RollerBehavior {
    pub fn new(tuning: RollerTuning) -> Self {
        Self {
            tuning,
            rolling_until: None,
            roll_direction: Vec3::ZERO,
            last_contact: None,
            bouncing: false,
        }
    }

    pub fn is_rolling(&self, now: f32) -> bool {
        self.rolling_until.map(|until| now < until).unwrap_or(false)
    }

    pub fn is_bouncing(&self) -> bool {
        self.bouncing
    }

    /// Start a specific attack.
    pub fn start(&mut self, attack: RollerAttack, ctx: &BossContext) -> Vec<BossCommand> {
        match attack {
            RollerAttack::Roll => {
                self.rolling_until = Some(ctx.now + self.tuning.roll_duration);
                self.roll_direction = ctx.direction_to_target();
                self.last_contact = None;
                Vec::new()
            }
            RollerAttack::Bounce => {
                self.bouncing = true;
                vec![BossCommand::Schedule {
                    delay: self.tuning.bounce_delay,
                    timer: BossTimer::BounceLanding,
                }]
            }
            RollerAttack::Shockwave => vec![self.shockwave("Shockwave", self.tuning.shockwave_damage)],
        }
    }

    fn shockwave(&self, name: &'static str, damage: f32) -> BossCommand {
        BossCommand::AreaBlast {
            name,
            radius: self.tuning.shockwave_radius,
            damage,
            kind: DamageKind::Physical,
            knockback: true,
        }
    }
}

impl BossBehavior for RollerBehavior {
    fn kind(&self) -> BossKind {
        BossKind::Roller
    }

    fn perform_attack(&mut self, ctx: &BossContext, rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        if ctx.target.is_none() {
            return Vec::new();
        }
        let attack = RollerAttack::ALL[rng.index(RollerAttack::ALL.len())];
        self.start(attack, ctx)
    }

    fn perform_special(&mut self, ctx: &BossContext, _rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        self.start(RollerAttack::Shockwave, ctx)
    }

    fn update(&mut self, ctx: &BossContext, _rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        let Some(until) = self.rolling_until else {
            return Vec::new();
        };
        if ctx.now >= until {
            self.rolling_until = None;
            self.last_contact = None;
            return Vec::new();
        }

        let contact_ready = self
            .last_contact
            .map(|t| ctx.now - t + TIMER_EPSILON >= self.tuning.roll_contact_interval)
            .unwrap_or(true);
        if !contact_ready {
            return Vec::new();
        }
        self.last_contact = Some(ctx.now);
        vec![BossCommand::AreaBlast {
            name: "Roll",
            radius: self.tuning.roll_contact_radius,
            damage: self.tuning.roll_damage,
            kind: DamageKind::Physical,
            knockback: false,
        }]
    }

    fn on_timer(&mut self, timer: BossTimer, _ctx: &BossContext, _rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        match timer {
            BossTimer::BounceLanding => {
                self.bouncing = false;
                vec![self.shockwave("Bounce Landing", self.tuning.bounce_damage)]
            }
            _ => Vec::new(),
        }
    }

    fn locomotion_override(&self, now: f32) -> Option<Vec3> {
        if self.is_rolling(now) {
            Some(self.roll_direction * self.tuning.roll_speed)
        } else {
            None
        }
    }

    fn interrupt(&mut self) {
        self.rolling_until = None;
        self.last_contact = None;
        self.bouncing = false;
    }

    fn on_death(&mut self) {
        self.rolling_until = None;
        self.bouncing = false;
    }
}
