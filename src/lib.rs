//! Hookshot - a tile-based 2D platformer simulation core
//!
//! Core modules:
//! - `sim`: Simulation (tile map, entities, player states, AI, physics)
//! - `settings`: Key bindings and preferences
//! - `audio`: Sound collaborator fed by simulation events
//! - `error`: Error types for configuration and level data

pub mod audio;
pub mod error;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, LevelError};
pub use settings::{KeyBindings, Settings};
pub use sim::{Bind, World, tick};

/// Game configuration constants
///
/// Velocities are in pixels per second, timers in seconds. One simulation
/// "tick" at 60 Hz advances `ticks * PHYSICS_SPEED` seconds.
pub mod consts {
    /// Scale from elapsed ticks to simulated seconds
    pub const PHYSICS_SPEED: f32 = 1.0 / 60.0;
    /// Refresh rate the tuning was done at
    pub const BASE_REFRESH_RATE: f32 = 60.0;

    /// Tile edge length in pixels
    pub const TILE_SIZE: f32 = 32.0;
    /// Gap left between a snapped hitbox and the tile it rests against
    pub const COLLISION_EPSILON: f32 = 0.01;
    /// Creatures may drift this far outside the level before being clamped
    pub const WORLD_MARGIN: f32 = 100.0;

    pub const GRAVITY: f32 = 1500.0;
    /// Vertical velocity forced while the jump timer runs
    pub const JUMP_VELOCITY: f32 = -380.0;
    pub const JUMP_DURATION: f32 = 0.22;
    /// Horizontal push while walking
    pub const WALK_ACCEL: f32 = 2000.0;
    /// Airborne push scale. Gives near-instant air control; tuned gameplay depends on it.
    pub const AIR_PUSH_MULTIPLIER: f32 = 99999.0;

    pub const FRICTION_GROUND: f32 = 1100.0;
    pub const FRICTION_AIR: f32 = 400.0;
    pub const FRICTION_ICE_SLIDING: f32 = 40.0;
    pub const FRICTION_ICE_WALKING: f32 = 250.0;
    pub const WATER_FRICTION_MULTIPLIER: f32 = 2.0;
    /// Velocity caps are scaled by this while submerged
    pub const WATER_VELOCITY_MULTIPLIER: f32 = 0.5;

    /// One-way platforms catch a falling hitbox within this many pixels
    pub const ONE_WAY_TOLERANCE: f32 = 2.0;
    /// Standable machinery supports from above within this many pixels
    pub const STANDABLE_TOLERANCE: f32 = 3.0;

    pub const CRUSH_DAMAGE: i32 = 25;
    pub const STUN_DURATION: f32 = 0.2;
    pub const INVULN_DURATION: f32 = 1.0;
    pub const KNOCKBACK_X: f32 = 220.0;
    pub const KNOCKBACK_Y: f32 = -180.0;
    /// Horizontal deceleration applied while knocked back
    pub const KNOCKBACK_DECEL: f32 = 700.0;
    /// Terminal velocity of a dying creature
    pub const DEATH_TERM_VEL: f32 = 600.0;
    /// Upward pop given to a dying creature
    pub const DEATH_ESCAPE_VEL: f32 = -320.0;

    /// Minimum speed to start sliding from a Down press
    pub const SLIDE_PRESS_SPEED: f32 = 80.0;
    /// Minimum speed to start sliding from a held Down
    pub const SLIDE_HOLD_SPEED: f32 = 100.0;

    pub const CHARGE_DURATION: f32 = 1.0;
    pub const LIGHTNING_DAMAGE: i32 = 100;
    /// Lifetime decay multiplier for fireballs in rain
    pub const RAIN_DECAY_MULTIPLIER: f32 = 3.0;
    /// Grenade velocity scale on bounce
    pub const GRENADE_BOUNCE: f32 = -0.5;

    pub const DOOR_VELOCITY: f32 = 90.0;
    pub const LAVA_DAMAGE: i32 = 100;

    /// Fixed seed used when a run does not supply one
    pub const DEFAULT_SEED: u64 = 0x5EED_1234;
}

/// Ticks multiplier for a given display refresh rate.
///
/// The simulation steps once per frame; faster displays take smaller steps.
#[inline]
pub fn ticks_for_refresh(refresh_rate: f32) -> f32 {
    if refresh_rate <= 0.0 {
        return 1.0;
    }
    consts::BASE_REFRESH_RATE / refresh_rate
}

/// Move `value` toward zero by `amount` without crossing it
#[inline]
pub fn approach_zero(value: f32, amount: f32) -> f32 {
    if value > 0.0 {
        (value - amount).max(0.0)
    } else {
        (value + amount).min(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_for_refresh() {
        assert!((ticks_for_refresh(60.0) - 1.0).abs() < 1e-6);
        assert!((ticks_for_refresh(120.0) - 0.5).abs() < 1e-6);
        assert!((ticks_for_refresh(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_approach_zero_does_not_cross() {
        assert_eq!(approach_zero(5.0, 10.0), 0.0);
        assert_eq!(approach_zero(-5.0, 10.0), 0.0);
        assert_eq!(approach_zero(15.0, 10.0), 5.0);
    }
}
