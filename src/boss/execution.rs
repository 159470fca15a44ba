//! Execution layer
//!
//! Frame-by-frame attack cadence. The tactical layer decides where the boss
//! goes; this layer only decides when it swings.

use super::ExecutionState;
use crate::combat::constants::{CHASE_GIVE_UP_FACTOR, CHASE_START_FACTOR, TIMER_EPSILON};

/// Everything the execution layer looks at for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionInput {
    pub current: ExecutionState,
    /// Distance to the current target, None without one
    pub target_distance: Option<f32>,
    pub attack_range: f32,
    pub cooldown_ready: bool,
    /// Aggressiveness gate passed this step
    pub attack_requested: bool,
    pub time_in_state: f32,
    pub attack_animation: f32,
}

/// Whether the boss attack cooldown has elapsed.
pub fn cooldown_ready(last_attack_time: Option<f32>, cooldown: f32, now: f32) -> bool {
    match last_attack_time {
        None => true,
        Some(t) => now - t + TIMER_EPSILON >= cooldown,
    }
}

/// Next execution state. Dead never changes.
pub fn next_state(input: &ExecutionInput) -> ExecutionState {
    use ExecutionState::*;

    match input.current {
        Dead => Dead,
        Idle => match input.target_distance {
            Some(d) if d <= input.attack_range * CHASE_START_FACTOR => Chasing,
            _ => Idle,
        },
        Chasing => match input.target_distance {
            None => Idle,
            Some(d) if d > input.attack_range * CHASE_GIVE_UP_FACTOR => Idle,
            Some(d) if d <= input.attack_range && input.cooldown_ready && input.attack_requested => {
                Attacking
            }
            Some(_) => Chasing,
        },
        Attacking => {
            if input.time_in_state + TIMER_EPSILON >= input.attack_animation {
                Chasing
            } else {
                Attacking
            }
        }
    }
}
