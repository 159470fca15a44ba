//! Simulation
//!
//! `Simulation` owns every combatant, boss brain, projectile and pending
//! continuation, and advances them together one step at a time. It is a
//! plain struct (a Bevy `Resource` so the plugin can hold it) with its
//! collaborators injected at construction: a `RandomSource`, a
//! `SpatialQuery` provider, and any number of `CombatObserver`s.
//!
//! ## Step order
//!
//! 1. Advance the clock and hand body positions to the spatial provider
//! 2. Tick invulnerability, knockback, resource regen and status effects
//! 3. Report deaths
//! 4. Fire due continuations (reaction delays, wind-ups, landings, corpse removal)
//! 5. Run boss AI: perception, decisions, behavior updates, movement, attacks
//! 6. Move projectiles and resolve explosions
//! 7. Report deaths
//!
//! Everything observable is emitted as a `CombatEvent`, both to observers
//! immediately and to an outbox drained by the Bevy layer.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::boss::{behavior_for, BehaviorParams, BossBrain, BossKind, BossTimer, ExecutionState, TacticalState};
use crate::combat::abilities::AbilityBook;
use crate::combat::combatant::{Combatant, CombatantId, Faction, ResourcePool};
use crate::combat::config::BalanceConfig;
use crate::combat::constants::{CORPSE_REMOVAL_DELAY, MAX_SCHEDULER_PASSES};
use crate::combat::damage::DamageResolver;
use crate::combat::events::{dispatch_to_observer, CombatEvent, CombatObserver};
use crate::combat::projectiles::Projectile;
use crate::combat::rng::RandomSource;
use crate::combat::scheduler::{Scheduler, TaskId};
use crate::combat::spatial::{ArenaSpatialIndex, BodySnapshot, SpatialQuery, DEFAULT_BODY_RADIUS};
use crate::combat::status::StatusEvent;
use crate::encounter::{DebugCommand, Encounter, EncounterOutcome};

mod actions;
mod bosses;
pub mod plugin;
pub mod systems;

pub use actions::AbilityUse;
pub use plugin::{SimulationPlugin, SimulationSpeed};
pub use systems::SimulationPhase;

/// Work deferred on the simulation clock, owned by one combatant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Continuation {
    /// Apply a tactical decision once the reaction delay has passed
    TacticalTransition(TacticalState),
    /// Leave the Special state after its fixed duration
    EndSpecial,
    /// Boss-specific delayed attack step
    Boss(BossTimer),
    /// Take the corpse out of the simulation
    RemoveCorpse,
}

#[derive(Resource)]
pub struct Simulation {
    now: f32,
    balance: BalanceConfig,
    resolver: DamageResolver,
    combatants: BTreeMap<CombatantId, Combatant>,
    brains: BTreeMap<CombatantId, BossBrain>,
    removed: Vec<Combatant>,
    projectiles: Vec<Projectile>,
    scheduler: Scheduler<Continuation>,
    rng: Box<dyn RandomSource>,
    spatial: Box<dyn SpatialQuery>,
    observers: Vec<Box<dyn CombatObserver>>,
    outbox: Vec<CombatEvent>,
    encounter: Encounter,
    player: Option<CombatantId>,
    next_combatant: u32,
    next_projectile: u64,
}

impl Simulation {
    pub fn new(balance: BalanceConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            now: 0.0,
            resolver: DamageResolver::from_tuning(&balance.combat),
            balance,
            combatants: BTreeMap::new(),
            brains: BTreeMap::new(),
            removed: Vec::new(),
            projectiles: Vec::new(),
            scheduler: Scheduler::new(),
            rng,
            spatial: Box::new(ArenaSpatialIndex::new()),
            observers: Vec::new(),
            outbox: Vec::new(),
            encounter: Encounter::new(),
            player: None,
            next_combatant: 0,
            next_projectile: 0,
        }
    }

    /// Replace the spatial query provider.
    pub fn with_spatial(mut self, spatial: Box<dyn SpatialQuery>) -> Self {
        self.spatial = spatial;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn CombatObserver>) {
        self.observers.push(observer);
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Spawn a combatant built by `build` from its freshly assigned id.
    pub fn spawn_with(&mut self, build: impl FnOnce(CombatantId) -> Combatant) -> CombatantId {
        let id = CombatantId(self.next_combatant);
        self.next_combatant += 1;
        let mut combatant = build(id);
        combatant.id = id;
        debug!("Spawned {} {} at {:?}", combatant.name, id, combatant.position);
        self.combatants.insert(id, combatant);
        id
    }

    /// Spawn the player with the balance table's stats and skill list.
    pub fn spawn_player(&mut self, position: Vec3) -> CombatantId {
        let tuning = self.balance.player.clone();
        let skills = self.balance.player_skills.clone();
        let id = self.spawn_with(|id| {
            Combatant::new(id, "Player", Faction::Player, tuning.max_health, tuning.move_speed)
                .with_position(position)
                .with_invulnerability(tuning.invulnerability_time)
                .with_abilities(AbilityBook::new(skills))
                .with_resource(ResourcePool::full(tuning.max_resource, tuning.resource_regen))
        });
        self.player = Some(id);
        info!("Player {} spawned at {:?}", id, position);
        id
    }

    /// Spawn a boss with its variant stats and a fresh brain.
    pub fn spawn_boss(&mut self, kind: BossKind, position: Vec3) -> CombatantId {
        let base = self.balance.boss.clone();
        let mut params: BehaviorParams = base.behavior.clone();
        let (max_health, move_speed) = match kind {
            BossKind::Roller => {
                params.aggressiveness = self.balance.roller.aggressiveness;
                (self.balance.roller.max_health, self.balance.roller.move_speed)
            }
            BossKind::Thrower => {
                params.aggressiveness = self.balance.thrower.aggressiveness;
                params.defensiveness = self.balance.thrower.defensiveness;
                (self.balance.thrower.max_health, self.balance.thrower.move_speed)
            }
        };

        let id = self.spawn_with(|id| {
            Combatant::new(id, kind.name(), Faction::Boss, max_health, move_speed).with_position(position)
        });
        let behavior = behavior_for(kind, &self.balance);
        self.brains.insert(
            id,
            BossBrain::new(kind, params, base.attack_range, base.attack_cooldown, position, behavior),
        );
        self.encounter.register_boss();
        info!("{} {} spawned at {:?}", kind, id, position);
        id
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn balance(&self) -> &BalanceConfig {
        &self.balance
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Combatants whose corpses have already left the simulation.
    pub fn removed(&self) -> &[Combatant] {
        &self.removed
    }

    /// Display name of a live or removed combatant.
    pub fn name_of(&self, id: CombatantId) -> String {
        self.combatants
            .get(&id)
            .or_else(|| self.removed.iter().find(|c| c.id == id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn brain(&self, id: CombatantId) -> Option<&BossBrain> {
        self.brains.get(&id)
    }

    pub fn brain_mut(&mut self, id: CombatantId) -> Option<&mut BossBrain> {
        self.brains.get_mut(&id)
    }

    pub fn player(&self) -> Option<CombatantId> {
        self.player
    }

    pub fn boss_ids(&self) -> Vec<CombatantId> {
        self.brains.keys().copied().collect()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn scheduler(&self) -> &Scheduler<Continuation> {
        &self.scheduler
    }

    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    pub fn outcome(&self) -> Option<EncounterOutcome> {
        self.encounter.outcome()
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        self.now += dt;
        self.encounter.advance(dt);

        self.sync_spatial(dt);
        self.advance_combatants(dt);
        self.process_deaths();
        self.run_scheduled();
        self.update_bosses(dt);
        self.update_projectiles(dt);
        self.process_deaths();
    }

    fn snapshot(&self) -> Vec<BodySnapshot> {
        self.combatants
            .values()
            .map(|c| BodySnapshot {
                id: c.id,
                faction: c.faction,
                position: c.position,
                radius: DEFAULT_BODY_RADIUS,
                alive: c.is_alive(),
            })
            .collect()
    }

    fn sync_spatial(&mut self, dt: f32) {
        let bodies = self.snapshot();
        self.spatial.sync(&bodies, dt);
    }

    /// Push current positions to the spatial provider without advancing time.
    pub(crate) fn refresh_spatial(&mut self) {
        self.sync_spatial(0.0);
    }

    fn advance_combatants(&mut self, dt: f32) {
        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        for id in ids {
            let Some(combatant) = self.combatants.get_mut(&id) else {
                continue;
            };
            if combatant.is_dead() {
                continue;
            }
            combatant.advance_timers(dt);
            let status_events = combatant.advance_status(dt);

            for event in status_events {
                match event {
                    StatusEvent::Tick {
                        status_type,
                        value,
                        source,
                    } => {
                        if status_type.is_beneficial() {
                            if value > 0.0 {
                                self.emit(CombatEvent::Healed {
                                    target: id,
                                    source,
                                    amount: value,
                                });
                            }
                        } else if let Some(attacker) = source.and_then(|s| self.combatants.get_mut(&s)) {
                            attacker.damage_dealt += value;
                        }
                        self.emit(CombatEvent::StatusTick {
                            target: id,
                            status: status_type,
                            amount: value,
                            source,
                        });
                    }
                    StatusEvent::Expired(status) => {
                        self.emit(CombatEvent::StatusExpired { target: id, status });
                    }
                }
            }
        }
    }

    fn run_scheduled(&mut self) {
        for _ in 0..MAX_SCHEDULER_PASSES {
            let due = self.scheduler.drain_due(self.now);
            if due.is_empty() {
                return;
            }
            for task in due {
                self.run_continuation(task.owner, task.id, task.action);
            }
        }
    }

    fn run_continuation(&mut self, owner: CombatantId, task: TaskId, action: Continuation) {
        match action {
            Continuation::TacticalTransition(state) => {
                let Some(brain) = self.brains.get_mut(&owner) else {
                    return;
                };
                if brain.pending.map(|(_, id)| id) != Some(task) {
                    return;
                }
                brain.pending = None;
                self.enter_tactical(owner, state);
            }
            Continuation::EndSpecial => self.end_special(owner, task),
            Continuation::Boss(timer) => self.run_boss_timer(owner, timer),
            Continuation::RemoveCorpse => self.remove_corpse(owner),
        }
    }

    /// Report every death that happened since the last call.
    ///
    /// Each death is reported exactly once: pending continuations of the
    /// dead combatant are cancelled, its projectiles dropped, its brain
    /// moved to Dead, and its corpse scheduled for removal.
    pub fn process_deaths(&mut self) {
        let mut newly_dead = Vec::new();
        for combatant in self.combatants.values_mut() {
            if combatant.take_death_notice() {
                newly_dead.push((combatant.id, combatant.name.clone(), combatant.faction));
            }
        }

        for (id, name, faction) in newly_dead {
            info!("{} {} died at {:.2}s", name, id, self.now);
            let cancelled = self.scheduler.cancel_owner(id);
            if cancelled > 0 {
                debug!("Cancelled {} pending tasks for {}", cancelled, id);
            }
            self.projectiles.retain(|p| p.owner != id);

            if let Some(brain) = self.brains.get_mut(&id) {
                let previous = brain.execution();
                if brain.mark_dead(self.now) {
                    self.emit(CombatEvent::ExecutionStateChanged {
                        boss: id,
                        from: previous,
                        to: ExecutionState::Dead,
                    });
                }
            }

            self.scheduler
                .schedule(id, self.now + CORPSE_REMOVAL_DELAY, Continuation::RemoveCorpse);
            self.emit(CombatEvent::Died { id, name, faction });

            let outcome = match faction {
                Faction::Boss => self.encounter.on_boss_defeated(),
                Faction::Player => self.encounter.on_player_defeated(),
            };
            if let Some(outcome) = outcome {
                info!(
                    "Encounter over: {} (score {}, {:.1}s)",
                    outcome.name(),
                    self.encounter.score,
                    self.encounter.elapsed
                );
                self.emit(CombatEvent::EncounterEnded { outcome });
            }
        }
    }

    fn remove_corpse(&mut self, id: CombatantId) {
        self.scheduler.cancel_owner(id);
        self.brains.remove(&id);
        if let Some(corpse) = self.combatants.remove(&id) {
            debug!("Removed corpse of {} {}", corpse.name, id);
            self.removed.push(corpse);
            self.emit(CombatEvent::Removed { id });
        }
    }

    pub(crate) fn emit(&mut self, event: CombatEvent) {
        for observer in self.observers.iter_mut() {
            dispatch_to_observer(observer.as_mut(), &event);
        }
        self.outbox.push(event);
    }

    // ------------------------------------------------------------------
    // Inbound calls from collaborators
    // ------------------------------------------------------------------

    /// Apply raw damage to a combatant, bypassing the resolver.
    /// Returns the health actually removed.
    pub fn apply_damage(&mut self, id: CombatantId, amount: f32) -> f32 {
        let Some(combatant) = self.combatants.get_mut(&id) else {
            warn!("apply_damage on unknown combatant {}", id);
            return 0.0;
        };
        let applied = combatant.apply_damage(amount);
        self.process_deaths();
        applied
    }

    /// Apply a raw heal. Returns the health actually restored.
    pub fn apply_heal(&mut self, id: CombatantId, amount: f32) -> f32 {
        let Some(combatant) = self.combatants.get_mut(&id) else {
            warn!("apply_heal on unknown combatant {}", id);
            return 0.0;
        };
        let applied = combatant.apply_heal(amount);
        if applied > 0.0 {
            self.emit(CombatEvent::Healed {
                target: id,
                source: None,
                amount: applied,
            });
        }
        applied
    }

    /// Force-kill a combatant from outside the combat rules (debug commands,
    /// scripted deaths). Safe to call on a combatant that is already dead or
    /// gone. Returns whether this call killed it.
    pub fn notify_external_interrupt(&mut self, id: CombatantId) -> bool {
        let killed = match self.combatants.get_mut(&id) {
            Some(combatant) => combatant.kill(),
            None => false,
        };
        if killed {
            self.process_deaths();
        }
        killed
    }

    /// Walk a combatant along `direction` at its effective speed.
    pub fn move_combatant(&mut self, id: CombatantId, direction: Vec3, dt: f32) -> bool {
        match self.combatants.get_mut(&id) {
            Some(combatant) => {
                let speed = combatant.effective_move_speed();
                combatant.step_along(direction, speed, dt)
            }
            None => false,
        }
    }

    pub fn face(&mut self, id: CombatantId, point: Vec3) {
        if let Some(combatant) = self.combatants.get_mut(&id) {
            if combatant.is_alive() {
                combatant.face(point);
            }
        }
    }

    /// Toggle player god mode. Returns the new setting.
    pub fn toggle_god_mode(&mut self) -> bool {
        let Some(player) = self.player.and_then(|id| self.combatants.get_mut(&id)) else {
            return false;
        };
        player.god_mode = !player.god_mode;
        info!("God mode {}", if player.god_mode { "enabled" } else { "disabled" });
        player.god_mode
    }

    /// Kill every living boss. Returns how many died.
    pub fn kill_all_bosses(&mut self) -> usize {
        let bosses = self.boss_ids();
        let killed = bosses
            .into_iter()
            .filter(|id| self.notify_external_interrupt(*id))
            .count();
        info!("Killed {} bosses", killed);
        killed
    }

    pub fn apply_debug(&mut self, command: DebugCommand) {
        match command {
            DebugCommand::ToggleGodMode => {
                self.toggle_god_mode();
            }
            DebugCommand::KillAllBosses => {
                self.kill_all_bosses();
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn cooldown_remaining(&self, caster: CombatantId, index: usize) -> f32 {
        self.combatants
            .get(&caster)
            .map(|c| c.abilities.cooldown_remaining(index, self.now))
            .unwrap_or(0.0)
    }

    /// 0.0 right after use, 1.0 when ready.
    pub fn cooldown_progress(&self, caster: CombatantId, index: usize) -> f32 {
        self.combatants
            .get(&caster)
            .map(|c| c.abilities.cooldown_progress(index, self.now))
            .unwrap_or(1.0)
    }

    /// Living hostiles of `faction`, nearest to `point` first.
    pub fn nearest_hostile(&self, faction: Faction, point: Vec3) -> Option<CombatantId> {
        self.combatants
            .values()
            .filter(|c| c.is_alive() && c.faction.is_hostile_to(faction))
            .min_by(|a, b| a.distance_to(point).total_cmp(&b.distance_to(point)))
            .map(|c| c.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::rng::SequenceRng;

    fn sim() -> Simulation {
        Simulation::new(BalanceConfig::default(), Box::new(SequenceRng::constant(0.5)))
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut sim = sim();
        let a = sim.spawn_player(Vec3::ZERO);
        let b = sim.spawn_boss(BossKind::Roller, Vec3::new(30.0, 0.0, 0.0));
        assert_ne!(a, b);
        sim.notify_external_interrupt(b);
        for _ in 0..200 {
            sim.step(1.0 / 60.0);
        }
        assert!(sim.combatant(b).is_none());
        let c = sim.spawn_boss(BossKind::Thrower, Vec3::ZERO);
        assert!(c > b);
    }

    #[test]
    fn test_non_positive_dt_is_ignored() {
        let mut sim = sim();
        sim.step(0.0);
        sim.step(-1.0);
        assert_eq!(sim.now(), 0.0);
    }

    #[test]
    fn test_external_interrupt_is_idempotent() {
        let mut sim = sim();
        sim.spawn_player(Vec3::ZERO);
        let boss = sim.spawn_boss(BossKind::Roller, Vec3::new(30.0, 0.0, 0.0));
        assert!(sim.notify_external_interrupt(boss));
        assert!(!sim.notify_external_interrupt(boss));
        assert!(!sim.notify_external_interrupt(CombatantId(99)));

        let deaths = sim
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, CombatEvent::Died { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_corpse_removed_after_delay() {
        let mut sim = sim();
        sim.spawn_player(Vec3::ZERO);
        let boss = sim.spawn_boss(BossKind::Roller, Vec3::new(30.0, 0.0, 0.0));
        sim.notify_external_interrupt(boss);

        sim.step(2.9);
        assert!(sim.combatant(boss).is_some());
        sim.step(0.2);
        assert!(sim.combatant(boss).is_none());
        assert_eq!(sim.removed().len(), 1);
    }
}
