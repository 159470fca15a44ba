//! Integration tests for the boss decision engine
//!
//! These tests drive real bosses through the `Simulation` and check the
//! tactical layer's observable transitions:
//! - Detection range and the reaction delay
//! - Retreating when hurt and cornered
//! - Special attacks and their fixed duration
//! - Attacks reaching the player
//! - Stun and freeze holding a boss's attacks until they wear off

use bevy::math::Vec3;
use bossbattle::boss::{BossKind, ExecutionState, TacticalState};
use bossbattle::combat::combatant::CombatantId;
use bossbattle::combat::config::BalanceConfig;
use bossbattle::combat::events::CombatEvent;
use bossbattle::combat::rng::SequenceRng;
use bossbattle::combat::status::StatusEffectSpec;
use bossbattle::Simulation;

const DT: f32 = 1.0 / 60.0;

fn sim_with_rng(value: f32) -> Simulation {
    Simulation::new(BalanceConfig::default(), Box::new(SequenceRng::constant(value)))
}

/// Step for `seconds` and return every event emitted meanwhile.
fn run_for(sim: &mut Simulation, seconds: f32) -> Vec<CombatEvent> {
    let steps = (seconds / DT).round() as usize;
    let mut events = Vec::new();
    for _ in 0..steps {
        sim.step(DT);
        events.extend(sim.drain_events());
    }
    events
}

fn tactical_changes(events: &[CombatEvent], boss: CombatantId) -> Vec<(TacticalState, TacticalState)> {
    events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::TacticalStateChanged { boss: b, from, to } if *b == boss => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_boss_ignores_target_outside_detection_range_then_hunts() {
    let mut sim = sim_with_rng(0.5);
    let boss = sim.spawn_boss(BossKind::Roller, Vec3::ZERO);
    let player = sim.spawn_player(Vec3::new(30.0, 0.0, 0.0));

    let events = run_for(&mut sim, 1.0);
    assert!(tactical_changes(&events, boss).is_empty());
    assert_eq!(sim.brain(boss).unwrap().tactical(), TacticalState::Patrol);

    // Step into detection range, beyond 1.5x optimal range
    let boss_position = sim.combatant(boss).unwrap().position;
    sim.combatant_mut(player).unwrap().position = boss_position + Vec3::new(10.0, 0.0, 0.0);

    // The next decision lands within a step; the change waits out the reaction delay
    let events = run_for(&mut sim, 0.4);
    assert!(tactical_changes(&events, boss).is_empty());

    let events = run_for(&mut sim, 1.6);
    assert_eq!(
        tactical_changes(&events, boss),
        vec![(TacticalState::Patrol, TacticalState::Hunt)]
    );
}

#[test]
fn test_hurt_boss_retreats_from_close_target() {
    let mut sim = sim_with_rng(0.5);
    let boss = sim.spawn_boss(BossKind::Roller, Vec3::ZERO);
    sim.spawn_player(Vec3::new(1.5, 0.0, 0.0));
    sim.apply_damage(boss, 120.0);
    assert!(sim.combatant(boss).unwrap().health_fraction() < 0.3);

    let events = run_for(&mut sim, 0.6);
    assert_eq!(
        tactical_changes(&events, boss),
        vec![(TacticalState::Patrol, TacticalState::Retreat)]
    );
}

#[test]
fn test_special_ends_after_its_duration() {
    // Every roll passes, so a hurt boss always picks Special
    let mut sim = sim_with_rng(0.0);
    let boss = sim.spawn_boss(BossKind::Roller, Vec3::ZERO);
    sim.spawn_player(Vec3::new(4.0, 0.0, 0.0));
    sim.apply_damage(boss, 100.0);

    let events = run_for(&mut sim, 0.6);
    assert_eq!(
        tactical_changes(&events, boss),
        vec![(TacticalState::Patrol, TacticalState::Special)]
    );

    let events = run_for(&mut sim, 1.8);
    assert!(tactical_changes(&events, boss).is_empty());

    let events = run_for(&mut sim, 0.3);
    assert_eq!(
        tactical_changes(&events, boss),
        vec![(TacticalState::Special, TacticalState::Engage)]
    );
}

#[test]
fn test_thrower_throws_at_nearby_player() {
    let mut sim = sim_with_rng(0.5);
    sim.spawn_player(Vec3::ZERO);
    let boss = sim.spawn_boss(BossKind::Thrower, Vec3::new(4.0, 0.0, 0.0));

    let mut saw_projectile = false;
    let mut saw_attacking = false;
    for _ in 0..180 {
        sim.step(DT);
        saw_projectile |= !sim.projectiles().is_empty();
        saw_attacking |= sim.brain(boss).unwrap().execution() == ExecutionState::Attacking;
    }
    assert!(saw_attacking);
    assert!(saw_projectile);
}

#[test]
fn test_dead_boss_stops_deciding() {
    let mut sim = sim_with_rng(0.5);
    sim.spawn_player(Vec3::new(4.0, 0.0, 0.0));
    let boss = sim.spawn_boss(BossKind::Roller, Vec3::ZERO);
    run_for(&mut sim, 0.1);

    assert!(sim.notify_external_interrupt(boss));
    assert_eq!(sim.brain(boss).unwrap().execution(), ExecutionState::Dead);
    assert!(!sim.notify_external_interrupt(boss));

    let events = run_for(&mut sim, 2.0);
    assert!(tactical_changes(&events, boss).is_empty());
    assert_eq!(sim.brain(boss).unwrap().execution(), ExecutionState::Dead);
}

fn started_attacks(events: &[CombatEvent], boss: CombatantId) -> usize {
    events
        .iter()
        .filter(|e| {
            matches!(e, CombatEvent::ExecutionStateChanged { boss: b, to: ExecutionState::Attacking, .. } if *b == boss)
        })
        .count()
}

#[test]
fn test_stunned_thrower_holds_fire_until_stun_expires() {
    let mut sim = sim_with_rng(0.5);
    let player = sim.spawn_player(Vec3::ZERO);
    let boss = sim.spawn_boss(BossKind::Thrower, Vec3::new(4.0, 0.0, 0.0));
    sim.combatant_mut(boss)
        .unwrap()
        .apply_status(StatusEffectSpec::stun(3.0), None);

    let mut events = Vec::new();
    for _ in 0..174 {
        sim.step(DT);
        events.extend(sim.drain_events());
        assert!(sim.projectiles().is_empty());
    }
    assert_eq!(started_attacks(&events, boss), 0);
    assert_eq!(sim.combatant(player).unwrap().current_health(), 100.0);
    assert!(!sim.combatant(boss).unwrap().can_act());

    let mut saw_projectile = false;
    let mut events = Vec::new();
    for _ in 0..180 {
        sim.step(DT);
        events.extend(sim.drain_events());
        saw_projectile |= !sim.projectiles().is_empty();
    }
    assert!(sim.combatant(boss).unwrap().can_act());
    assert!(started_attacks(&events, boss) > 0);
    assert!(saw_projectile);
}

#[test]
fn test_frozen_roller_enters_special_without_striking() {
    // Every roll passes, so a hurt boss picks Special
    let mut sim = sim_with_rng(0.0);
    let player = sim.spawn_player(Vec3::new(2.0, 0.0, 0.0));
    let boss = sim.spawn_boss(BossKind::Roller, Vec3::ZERO);
    sim.apply_damage(boss, 100.0);
    sim.combatant_mut(boss)
        .unwrap()
        .apply_status(StatusEffectSpec::freeze(5.0), None);

    let events = run_for(&mut sim, 3.0);
    let changes = tactical_changes(&events, boss);
    assert_eq!(changes.first(), Some(&(TacticalState::Patrol, TacticalState::Special)));
    assert_eq!(started_attacks(&events, boss), 0);
    assert!(!events.iter().any(|e| matches!(e, CombatEvent::Hit(_))));
    assert_eq!(sim.combatant(player).unwrap().current_health(), 100.0);
    assert_eq!(sim.combatant(boss).unwrap().position, Vec3::ZERO);
}
