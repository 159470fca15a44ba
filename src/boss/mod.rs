//! Boss Decision Engine
//!
//! Every boss runs the same two-layer state machine:
//!
//! - **Tactical layer** (`TacticalState`): Patrol / Hunt / Engage / Retreat /
//!   Special. Re-evaluated every `decision_interval` seconds; a change only
//!   takes effect after `reaction_delay` (see `tactical`).
//! - **Execution layer** (`ExecutionState`): Idle / Chasing / Attacking / Dead.
//!   Stepped every frame from distance and attack cooldown (see `execution`).
//!
//! What differs between bosses is only *which* attacks they use and how those
//! play out over time. That lives behind the `BossBehavior` trait, with one
//! implementation per `BossKind`.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::combat::combatant::CombatantId;
use crate::combat::config::BalanceConfig;
use crate::combat::constants::{ENGAGE_MIN_RANGE_FACTOR, TIMER_EPSILON};
use crate::combat::damage::DamageKind;
use crate::combat::rng::RandomSource;
use crate::combat::scheduler::TaskId;

pub mod execution;
pub mod roller;
pub mod tactical;
pub mod thrower;

pub use roller::RollerBehavior;
pub use thrower::ThrowerBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TacticalState {
    Patrol,
    Hunt,
    Engage,
    Retreat,
    Special,
}

impl TacticalState {
    pub fn name(&self) -> &'static str {
        match self {
            TacticalState::Patrol => "Patrol",
            TacticalState::Hunt => "Hunt",
            TacticalState::Engage => "Engage",
            TacticalState::Retreat => "Retreat",
            TacticalState::Special => "Special",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionState {
    Idle,
    Chasing,
    Attacking,
    Dead,
}

impl ExecutionState {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionState::Idle => "Idle",
            ExecutionState::Chasing => "Chasing",
            ExecutionState::Attacking => "Attacking",
            ExecutionState::Dead => "Dead",
        }
    }
}

/// Which boss this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossKind {
    /// Rolls into the target, bounces, and sends out shockwaves
    Roller,
    /// Keeps its distance and throws exploding fruit
    Thrower,
}

impl BossKind {
    pub fn name(&self) -> &'static str {
        match self {
            BossKind::Roller => "Roller",
            BossKind::Thrower => "Thrower",
        }
    }

    pub fn all() -> [BossKind; 2] {
        [BossKind::Roller, BossKind::Thrower]
    }
}

impl fmt::Display for BossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BossKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Roller" | "QiuQiu" => Ok(BossKind::Roller),
            "Thrower" | "GuoGuo" => Ok(BossKind::Thrower),
            _ => Err(format!(
                "Unknown boss: '{}'. Valid bosses: Roller, Thrower",
                s
            )),
        }
    }
}

/// Perception and personality numbers for one boss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorParams {
    pub detection_range: f32,
    pub optimal_range: f32,
    pub retreat_range: f32,
    /// Chance per ready frame that an engaged boss commits to an attack
    pub aggressiveness: f32,
    /// Carried for tuning tools; no tactical rule reads it
    pub defensiveness: f32,
    /// Scaled by 0.1 into the per-decision chance of going Special
    pub unpredictability: f32,
    pub decision_interval: f32,
    pub reaction_delay: f32,
    /// Seconds without line of sight before giving up and patrolling
    pub lost_sight_grace: f32,
    pub patrol_radius: f32,
    /// Patrol points closer than this count as reached
    pub arrival_threshold: f32,
    pub special_duration: f32,
    /// How long the Attacking state holds before returning to Chasing
    pub attack_animation: f32,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            detection_range: 15.0,
            optimal_range: 5.0,
            retreat_range: 2.0,
            aggressiveness: 0.7,
            defensiveness: 0.3,
            unpredictability: 0.2,
            decision_interval: 1.0,
            reaction_delay: 0.5,
            lost_sight_grace: 5.0,
            patrol_radius: 8.0,
            arrival_threshold: 2.0,
            special_duration: 2.0,
            attack_animation: 1.0,
        }
    }
}

impl BehaviorParams {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("aggressiveness", self.aggressiveness),
            ("defensiveness", self.defensiveness),
            ("unpredictability", self.unpredictability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("behavior.{} must be within [0, 1], got {}", name, value));
            }
        }
        for (name, value) in [
            ("detection_range", self.detection_range),
            ("optimal_range", self.optimal_range),
            ("decision_interval", self.decision_interval),
            ("patrol_radius", self.patrol_radius),
            ("special_duration", self.special_duration),
            ("attack_animation", self.attack_animation),
        ] {
            if value <= 0.0 {
                return Err(format!("behavior.{} must be positive, got {}", name, value));
            }
        }
        if self.reaction_delay < 0.0 || self.retreat_range < 0.0 {
            return Err("behavior.reaction_delay and retreat_range must not be negative".to_string());
        }
        Ok(())
    }
}

/// What a boss knows about its target this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSighting {
    pub id: CombatantId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub distance: f32,
    /// Within detection range with an unobstructed line of sight
    pub visible: bool,
}

/// Read-only snapshot handed to boss behaviors.
#[derive(Debug, Clone, Copy)]
pub struct BossContext {
    pub id: CombatantId,
    pub now: f32,
    pub position: Vec3,
    pub facing: Vec3,
    pub health_fraction: f32,
    pub attack_range: f32,
    pub target: Option<TargetSighting>,
}

impl BossContext {
    /// Ground-plane direction toward the target, falling back to facing.
    pub fn direction_to_target(&self) -> Vec3 {
        self.target
            .and_then(|t| {
                Vec3::new(t.position.x - self.position.x, 0.0, t.position.z - self.position.z)
                    .try_normalize()
            })
            .unwrap_or(self.facing)
    }
}

/// Delayed boss-specific work, fired through the simulation scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossTimer {
    ThrowSingle,
    ThrowArc,
    BurstThrow { remaining: u32 },
    BounceLanding,
    SelfHeal,
}

/// Effects a behavior asks the simulation to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum BossCommand {
    /// Hit every hostile within `radius` of the boss
    AreaBlast {
        name: &'static str,
        radius: f32,
        damage: f32,
        kind: DamageKind,
        knockback: bool,
    },
    /// Launch a projectile from the boss
    Throw {
        name: &'static str,
        velocity: Vec3,
        damage: f32,
        explosion_radius: f32,
        ballistic: bool,
    },
    HealSelf { amount: f32 },
    Schedule { delay: f32, timer: BossTimer },
}

/// Boss-specific attack selection and execution.
///
/// Behaviors never touch the world directly: they read a `BossContext` and
/// return `BossCommand`s.
pub trait BossBehavior: Send + Sync {
    fn kind(&self) -> BossKind;

    /// Choose and start an attack. Called when the execution layer enters
    /// Attacking with the cooldown ready.
    fn perform_attack(&mut self, ctx: &BossContext, rng: &mut dyn RandomSource) -> Vec<BossCommand>;

    /// Called once on entering the Special tactical state.
    fn perform_special(&mut self, ctx: &BossContext, rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        self.perform_attack(ctx, rng)
    }

    /// Called every step while alive.
    fn update(&mut self, _ctx: &BossContext, _rng: &mut dyn RandomSource) -> Vec<BossCommand> {
        Vec::new()
    }

    /// A timer this behavior scheduled has fired.
    fn on_timer(&mut self, timer: BossTimer, ctx: &BossContext, rng: &mut dyn RandomSource) -> Vec<BossCommand>;

    /// Velocity that replaces tactical movement (e.g. mid-roll).
    fn locomotion_override(&self, _now: f32) -> Option<Vec3> {
        None
    }

    /// Distance band an engaged boss tries to hold: (back off below, approach above).
    fn engage_band(&self, params: &BehaviorParams, _attack_range: f32) -> (f32, f32) {
        (params.optimal_range * ENGAGE_MIN_RANGE_FACTOR, params.optimal_range)
    }

    /// Stunned or frozen: abandon whatever attack is in progress.
    fn interrupt(&mut self) {}

    fn on_death(&mut self) {}
}

/// Get the behavior implementation for a boss kind.
pub fn behavior_for(kind: BossKind, balance: &BalanceConfig) -> Box<dyn BossBehavior> {
    match kind {
        BossKind::Roller => Box::new(RollerBehavior::new(balance.roller.clone())),
        BossKind::Thrower => Box::new(ThrowerBehavior::new(balance.thrower.clone())),
    }
}

/// Per-boss decision state: both layers plus the behavior table.
pub struct BossBrain {
    pub kind: BossKind,
    pub params: BehaviorParams,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    tactical: TacticalState,
    tactical_since: f32,
    execution: ExecutionState,
    execution_since: f32,
    pub last_decision: Option<f32>,
    /// When the target was last visible
    pub last_seen: Option<f32>,
    /// Transition waiting out the reaction delay
    pub pending: Option<(TacticalState, TaskId)>,
    pub special_task: Option<TaskId>,
    pub patrol_center: Vec3,
    pub patrol_target: Option<Vec3>,
    /// Set by the Engage gate, consumed by the execution layer the same step
    pub attack_requested: bool,
    pub behavior: Box<dyn BossBehavior>,
}

impl fmt::Debug for BossBrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BossBrain")
            .field("kind", &self.kind)
            .field("tactical", &self.tactical)
            .field("execution", &self.execution)
            .field("pending", &self.pending)
            .finish()
    }
}

impl BossBrain {
    pub fn new(
        kind: BossKind,
        params: BehaviorParams,
        attack_range: f32,
        attack_cooldown: f32,
        patrol_center: Vec3,
        behavior: Box<dyn BossBehavior>,
    ) -> Self {
        Self {
            kind,
            params,
            attack_range,
            attack_cooldown,
            tactical: TacticalState::Patrol,
            tactical_since: 0.0,
            execution: ExecutionState::Idle,
            execution_since: 0.0,
            last_decision: None,
            last_seen: None,
            pending: None,
            special_task: None,
            patrol_center,
            patrol_target: None,
            attack_requested: false,
            behavior,
        }
    }

    pub fn tactical(&self) -> TacticalState {
        self.tactical
    }

    pub fn tactical_since(&self) -> f32 {
        self.tactical_since
    }

    pub fn execution(&self) -> ExecutionState {
        self.execution
    }

    pub fn execution_since(&self) -> f32 {
        self.execution_since
    }

    pub fn is_dead(&self) -> bool {
        self.execution == ExecutionState::Dead
    }

    /// Switch tactical state. Returns the previous state if it changed.
    pub fn set_tactical(&mut self, state: TacticalState, now: f32) -> Option<TacticalState> {
        if self.is_dead() || state == self.tactical {
            return None;
        }
        let previous = self.tactical;
        self.tactical = state;
        self.tactical_since = now;
        Some(previous)
    }

    /// Switch execution state. Dead is terminal. Returns the previous state if it changed.
    pub fn set_execution(&mut self, state: ExecutionState, now: f32) -> Option<ExecutionState> {
        if self.is_dead() || state == self.execution {
            return None;
        }
        let previous = self.execution;
        self.execution = state;
        self.execution_since = now;
        Some(previous)
    }

    /// Whether a tactical re-evaluation is due at `now`.
    pub fn decision_due(&self, now: f32) -> bool {
        match self.last_decision {
            None => true,
            Some(last) => now - last + TIMER_EPSILON >= self.params.decision_interval,
        }
    }

    /// Record perception for this step.
    pub fn observe(&mut self, sighting: Option<&TargetSighting>, now: f32) {
        if sighting.map(|s| s.visible).unwrap_or(false) {
            self.last_seen = Some(now);
        }
    }

    /// Enter the terminal Dead state. Returns false if already dead.
    pub fn mark_dead(&mut self, now: f32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.execution = ExecutionState::Dead;
        self.execution_since = now;
        self.pending = None;
        self.special_task = None;
        self.attack_requested = false;
        self.behavior.on_death();
        true
    }
}
