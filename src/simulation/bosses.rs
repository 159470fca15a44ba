//! Boss AI stepping
//!
//! Per living boss, every step: perceive the target, re-evaluate tactics
//! when the decision interval has passed, let the behavior run its own
//! update, move, roll the engagement gate, and step the execution layer.

use bevy::prelude::*;

use super::actions::HitSpec;
use super::{Continuation, Simulation};
use crate::boss::execution::{self, ExecutionInput};
use crate::boss::tactical;
use crate::boss::{BossCommand, BossContext, BossTimer, ExecutionState, TacticalState, TargetSighting};
use crate::combat::combatant::CombatantId;
use crate::combat::events::CombatEvent;
use crate::combat::scheduler::TaskId;

impl Simulation {
    pub(crate) fn update_bosses(&mut self, dt: f32) {
        let ids: Vec<CombatantId> = self.brains.keys().copied().collect();
        for id in ids {
            let alive = self.combatants.get(&id).map(|c| c.is_alive()).unwrap_or(false);
            let dead_brain = self.brains.get(&id).map(|b| b.is_dead()).unwrap_or(true);
            if !alive || dead_brain {
                continue;
            }
            self.update_boss(id, dt);
        }
    }

    /// What boss `id` knows about its target right now.
    pub(crate) fn perceive(&self, id: CombatantId) -> Option<TargetSighting> {
        let boss = self.combatants.get(&id)?;
        let brain = self.brains.get(&id)?;
        let target_id = self.nearest_hostile(boss.faction, boss.position)?;
        let target = self.combatants.get(&target_id)?;

        let distance = boss.distance_to(target.position);
        let visible = distance <= brain.params.detection_range
            && self.line_of_sight(id, boss.position, target.position);
        Some(TargetSighting {
            id: target_id,
            position: target.position,
            velocity: self.spatial.velocity_of(target_id),
            distance,
            visible,
        })
    }

    fn boss_context(&self, id: CombatantId, target: Option<TargetSighting>) -> Option<BossContext> {
        let boss = self.combatants.get(&id)?;
        let brain = self.brains.get(&id)?;
        Some(BossContext {
            id,
            now: self.now,
            position: boss.position,
            facing: boss.facing,
            health_fraction: boss.health_fraction(),
            attack_range: brain.attack_range,
            target,
        })
    }

    fn update_boss(&mut self, id: CombatantId, dt: f32) {
        let now = self.now;
        let sighting = self.perceive(id);

        // Tactical layer
        let Some(brain) = self.brains.get_mut(&id) else {
            return;
        };
        brain.observe(sighting.as_ref(), now);
        if brain.decision_due(now) {
            brain.last_decision = Some(now);
            let health = self.combatants.get(&id).map(|c| c.health_fraction()).unwrap_or(0.0);
            let desired = tactical::evaluate(
                brain.tactical(),
                sighting.as_ref(),
                health,
                brain.last_seen,
                now,
                &brain.params,
                self.rng.as_mut(),
            );
            self.request_tactical(id, desired);
        }

        // Behavior-driven work (roll contact, self-heal)
        if !self.boss_can_act(id) {
            self.interrupt_boss(id);
        } else if let Some(ctx) = self.boss_context(id, sighting) {
            let commands = match self.brains.get_mut(&id) {
                Some(brain) => brain.behavior.update(&ctx, self.rng.as_mut()),
                None => Vec::new(),
            };
            self.execute_commands(id, commands);
        }
        if self.combatants.get(&id).map(|c| c.is_dead()).unwrap_or(true) {
            return;
        }

        self.move_boss(id, sighting.as_ref(), dt);
        self.step_execution(id, sighting);
    }

    /// Queue a tactical change behind the reaction delay.
    ///
    /// A decision matching the current state cancels any pending change; a
    /// different decision replaces it.
    fn request_tactical(&mut self, id: CombatantId, desired: TacticalState) {
        let now = self.now;
        let Some(brain) = self.brains.get_mut(&id) else {
            return;
        };

        if desired == brain.tactical() {
            if let Some((_, task)) = brain.pending.take() {
                self.scheduler.cancel(task);
            }
            return;
        }
        if let Some((pending, task)) = brain.pending {
            if pending == desired {
                return;
            }
            self.scheduler.cancel(task);
        }
        let task = self.scheduler.schedule(
            id,
            now + brain.params.reaction_delay,
            Continuation::TacticalTransition(desired),
        );
        brain.pending = Some((desired, task));
    }

    pub(crate) fn enter_tactical(&mut self, id: CombatantId, state: TacticalState) {
        let now = self.now;
        let Some(brain) = self.brains.get_mut(&id) else {
            return;
        };
        let Some(previous) = brain.set_tactical(state, now) else {
            return;
        };

        if previous == TacticalState::Special {
            if let Some(task) = brain.special_task.take() {
                self.scheduler.cancel(task);
            }
        }
        if state == TacticalState::Patrol {
            brain.patrol_target = None;
        }
        let special_duration = brain.params.special_duration;
        debug!("Boss {} tactical {} -> {}", id, previous.name(), state.name());
        self.emit(CombatEvent::TacticalStateChanged {
            boss: id,
            from: previous,
            to: state,
        });

        if state == TacticalState::Special {
            let task = self.scheduler.schedule(id, now + special_duration, Continuation::EndSpecial);
            if let Some(brain) = self.brains.get_mut(&id) {
                brain.special_task = Some(task);
            }
            if !self.boss_can_act(id) {
                debug!("Boss {} entered Special while incapacitated", id);
                return;
            }
            let sighting = self.perceive(id);
            if let Some(ctx) = self.boss_context(id, sighting) {
                let commands = match self.brains.get_mut(&id) {
                    Some(brain) => brain.behavior.perform_special(&ctx, self.rng.as_mut()),
                    None => Vec::new(),
                };
                self.execute_commands(id, commands);
            }
        }
    }

    /// Special ends after its duration: Engage if the target is in sight, Hunt otherwise.
    pub(crate) fn end_special(&mut self, id: CombatantId, task: TaskId) {
        let Some(brain) = self.brains.get_mut(&id) else {
            return;
        };
        if brain.special_task != Some(task) {
            return;
        }
        brain.special_task = None;
        if brain.tactical() != TacticalState::Special {
            return;
        }
        let visible = self.perceive(id).map(|s| s.visible).unwrap_or(false);
        let next = if visible {
            TacticalState::Engage
        } else {
            TacticalState::Hunt
        };
        self.enter_tactical(id, next);
    }

    pub(crate) fn run_boss_timer(&mut self, id: CombatantId, timer: BossTimer) {
        if self.combatants.get(&id).map(|c| c.is_dead()).unwrap_or(true) {
            return;
        }
        if !self.boss_can_act(id) {
            debug!("Boss {} is incapacitated, dropping {:?}", id, timer);
            self.interrupt_boss(id);
            return;
        }
        let sighting = self.perceive(id);
        let Some(ctx) = self.boss_context(id, sighting) else {
            return;
        };
        let commands = match self.brains.get_mut(&id) {
            Some(brain) => brain.behavior.on_timer(timer, &ctx, self.rng.as_mut()),
            None => return,
        };
        self.execute_commands(id, commands);
    }

    fn boss_can_act(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map(|c| c.can_act()).unwrap_or(false)
    }

    /// Drop the boss's queued attack steps and any attack in progress.
    fn interrupt_boss(&mut self, id: CombatantId) {
        let cancelled = self
            .scheduler
            .cancel_where(id, |action| matches!(action, Continuation::Boss(_)));
        if cancelled > 0 {
            debug!("Boss {} interrupted, {} queued steps cancelled", id, cancelled);
        }
        if let Some(brain) = self.brains.get_mut(&id) {
            brain.behavior.interrupt();
        }
    }

    fn move_boss(&mut self, id: CombatantId, sighting: Option<&TargetSighting>, dt: f32) {
        let now = self.now;
        let (Some(boss), Some(brain)) = (self.combatants.get_mut(&id), self.brains.get_mut(&id)) else {
            return;
        };
        if !boss.can_move() {
            return;
        }

        if let Some(velocity) = brain.behavior.locomotion_override(now) {
            boss.step_along(velocity, velocity.length(), dt);
            return;
        }

        let speed = boss.effective_move_speed();
        let Some(steering) = brain.steer(boss.position, sighting, speed, self.rng.as_mut()) else {
            return;
        };
        if steering.direction != Vec3::ZERO {
            boss.step_along(steering.direction, speed * steering.speed_factor, dt);
        }
        if let Some(point) = steering.look_at {
            boss.face(point);
        }
    }

    fn step_execution(&mut self, id: CombatantId, sighting: Option<TargetSighting>) {
        let now = self.now;
        let (Some(boss), Some(brain)) = (self.combatants.get_mut(&id), self.brains.get_mut(&id)) else {
            return;
        };

        let cooldown_ready = execution::cooldown_ready(boss.last_attack_time, brain.attack_cooldown, now);
        if brain.tactical() == TacticalState::Engage
            && cooldown_ready
            && brain.execution() != ExecutionState::Attacking
            && boss.can_act()
            && self.rng.roll(brain.params.aggressiveness)
        {
            brain.attack_requested = true;
        }

        let current = brain.execution();
        let next = execution::next_state(&ExecutionInput {
            current,
            target_distance: sighting.map(|s| s.distance),
            attack_range: brain.attack_range,
            cooldown_ready,
            attack_requested: brain.attack_requested,
            time_in_state: now - brain.execution_since(),
            attack_animation: brain.params.attack_animation,
        });
        brain.attack_requested = false;

        if next == current || brain.set_execution(next, now).is_none() {
            return;
        }
        let attacking = next == ExecutionState::Attacking;
        if attacking {
            boss.last_attack_time = Some(now);
        }
        debug!("Boss {} execution {} -> {}", id, current.name(), next.name());
        self.emit(CombatEvent::ExecutionStateChanged {
            boss: id,
            from: current,
            to: next,
        });

        if attacking {
            let Some(ctx) = self.boss_context(id, sighting) else {
                return;
            };
            let commands = match self.brains.get_mut(&id) {
                Some(brain) => brain.behavior.perform_attack(&ctx, self.rng.as_mut()),
                None => Vec::new(),
            };
            self.execute_commands(id, commands);
        }
    }

    /// Carry out what a behavior asked for.
    pub(crate) fn execute_commands(&mut self, id: CombatantId, commands: Vec<BossCommand>) {
        for command in commands {
            let Some(boss) = self.combatants.get(&id) else {
                return;
            };
            if boss.is_dead() {
                return;
            }
            if !boss.can_act() {
                debug!("Boss {} is incapacitated, dropping {:?}", id, command);
                continue;
            }
            let position = boss.position;
            let faction = boss.faction;

            match command {
                BossCommand::AreaBlast {
                    name,
                    radius,
                    damage,
                    kind,
                    knockback,
                } => {
                    self.refresh_spatial();
                    let spec = HitSpec {
                        name,
                        base: damage,
                        kind,
                        knockback,
                        status_effects: &[],
                    };
                    self.area_blast(id, position, radius, &spec);
                }
                BossCommand::Throw {
                    name,
                    velocity,
                    damage,
                    explosion_radius,
                    ballistic,
                } => {
                    self.launch(id, faction, name, position, velocity, damage, explosion_radius, ballistic);
                }
                BossCommand::HealSelf { amount } => {
                    let healed = self.combatants.get_mut(&id).map(|c| c.apply_heal(amount)).unwrap_or(0.0);
                    if healed > 0.0 {
                        info!("Boss {} heals itself for {:.0}", id, healed);
                        self.emit(CombatEvent::Healed {
                            target: id,
                            source: Some(id),
                            amount: healed,
                        });
                    }
                }
                BossCommand::Schedule { delay, timer } => {
                    self.scheduler.schedule(id, self.now + delay, Continuation::Boss(timer));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boss::BossKind;
    use crate::combat::config::BalanceConfig;
    use crate::combat::damage::DamageKind;
    use crate::combat::rng::SequenceRng;
    use crate::combat::status::StatusEffectSpec;

    const DT: f32 = 1.0 / 60.0;

    fn sim() -> Simulation {
        // 0.99 fails every aggressiveness and special gate
        Simulation::new(BalanceConfig::default(), Box::new(SequenceRng::constant(0.99)))
    }

    fn queued_boss_steps(sim: &Simulation, boss: CombatantId) -> usize {
        sim.scheduler()
            .iter()
            .filter(|task| task.owner == boss && matches!(task.action, Continuation::Boss(_)))
            .count()
    }

    #[test]
    fn test_stun_cancels_pending_windup() {
        let mut sim = sim();
        sim.spawn_player(Vec3::ZERO);
        let boss = sim.spawn_boss(BossKind::Thrower, Vec3::new(4.0, 0.0, 0.0));
        sim.execute_commands(
            boss,
            vec![BossCommand::Schedule {
                delay: 0.5,
                timer: BossTimer::ThrowSingle,
            }],
        );
        assert_eq!(queued_boss_steps(&sim, boss), 1);

        sim.combatant_mut(boss)
            .unwrap()
            .apply_status(StatusEffectSpec::stun(5.0), None);
        for _ in 0..60 {
            sim.step(DT);
        }

        assert!(sim.projectiles().is_empty());
        assert_eq!(queued_boss_steps(&sim, boss), 0);
    }

    #[test]
    fn test_wind_up_fires_when_free() {
        let mut sim = sim();
        sim.spawn_player(Vec3::ZERO);
        let boss = sim.spawn_boss(BossKind::Thrower, Vec3::new(4.0, 0.0, 0.0));
        sim.execute_commands(
            boss,
            vec![BossCommand::Schedule {
                delay: 0.5,
                timer: BossTimer::ThrowSingle,
            }],
        );
        for _ in 0..33 {
            sim.step(DT);
        }
        assert_eq!(sim.projectiles().len(), 1);
    }

    #[test]
    fn test_frozen_boss_special_does_not_strike() {
        let mut sim = sim();
        let player = sim.spawn_player(Vec3::ZERO);
        let boss = sim.spawn_boss(BossKind::Roller, Vec3::new(2.0, 0.0, 0.0));
        sim.combatant_mut(boss)
            .unwrap()
            .apply_status(StatusEffectSpec::freeze(5.0), None);

        sim.enter_tactical(boss, TacticalState::Special);
        assert_eq!(sim.brain(boss).unwrap().tactical(), TacticalState::Special);
        assert_eq!(sim.combatant(player).unwrap().current_health(), 100.0);
    }

    #[test]
    fn test_special_shockwave_strikes_when_free() {
        let mut sim = sim();
        let player = sim.spawn_player(Vec3::ZERO);
        let boss = sim.spawn_boss(BossKind::Roller, Vec3::new(2.0, 0.0, 0.0));

        sim.enter_tactical(boss, TacticalState::Special);
        assert!(sim.combatant(player).unwrap().current_health() < 100.0);
    }

    #[test]
    fn test_incapacitated_boss_drops_commands() {
        let mut sim = sim();
        let player = sim.spawn_player(Vec3::ZERO);
        let boss = sim.spawn_boss(BossKind::Roller, Vec3::new(1.0, 0.0, 0.0));
        sim.combatant_mut(boss)
            .unwrap()
            .apply_status(StatusEffectSpec::stun(1.0), None);

        sim.execute_commands(
            boss,
            vec![BossCommand::AreaBlast {
                name: "Roll",
                radius: 3.0,
                damage: 15.0,
                kind: DamageKind::Physical,
                knockback: false,
            }],
        );
        assert_eq!(sim.combatant(player).unwrap().current_health(), 100.0);
    }
}
