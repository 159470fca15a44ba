//! Combat system
//!
//! Plain-Rust combat core shared by the player and every boss:
//! - Combatant health, invulnerability, knockback and resource pool
//! - Status effects (damage/heal over time, stun, freeze, slow)
//! - Damage resolution with crits, variance and knockback
//! - Ability definitions, cooldowns and invocation errors
//! - Projectiles, deferred tasks and spatial queries
//! - Balance configuration and combat logging

pub mod abilities;
pub mod combatant;
pub mod config;
pub mod constants;
pub mod damage;
pub mod events;
pub mod log;
pub mod projectiles;
pub mod rng;
pub mod scheduler;
pub mod spatial;
pub mod status;
