//! Player state machine
//!
//! Each state proposes transitions from bind events; the owning creature
//! decides whether to accept them (see [`Creature::set_state`]). Enter and
//! exit side effects live here so that every replacement path runs them.

use serde::{Deserialize, Serialize};

use super::creature::{Creature, MotionState};
use super::entity::Direction;
use super::events::SoundEffect;
use crate::consts::*;

/// Abstract input binds delivered by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bind {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Fire,
    NextWeapon,
    PrevWeapon,
    Pause,
}

impl Bind {
    pub const ALL: [Bind; 9] = [
        Bind::Left,
        Bind::Right,
        Bind::Up,
        Bind::Down,
        Bind::Jump,
        Bind::Fire,
        Bind::NextWeapon,
        Bind::PrevWeapon,
        Bind::Pause,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputPhase {
    Press,
    Hold,
    Unpress,
}

/// Hitbox height scale while ducking or sliding
const CROUCH_SCALE: f32 = 0.5;
/// Sliding ends below this speed
const SLIDE_STOP_SPEED: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// Grounded or airborne ordinary movement
    #[default]
    Normal,
    Jumping,
    Ducking,
    Hanging,
    OnLadder,
    Sliding,
}

impl PlayerState {
    /// One-time side effects on activation
    pub(crate) fn enter(self, c: &mut Creature) {
        match self {
            PlayerState::Normal => {}
            PlayerState::Jumping => {
                c.jump_timer = JUMP_DURATION;
                c.change_motion(MotionState::Jumping, true);
                c.body.vel.y = JUMP_VELOCITY;
                c.attached = None;
                c.sound(SoundEffect::Jump);
            }
            PlayerState::Ducking => {
                c.body.size.y = c.normal_size.y * CROUCH_SCALE;
                c.body.sprite_offset.y = c.normal_size.y * (1.0 - CROUCH_SCALE) / 2.0;
                c.body.acc.x = 0.0;
            }
            PlayerState::Hanging => {
                c.set_motion(MotionState::Hanging);
                c.body.vel = glam::Vec2::ZERO;
                c.body.acc = glam::Vec2::ZERO;
                c.jump_timer = 0.0;
            }
            PlayerState::OnLadder => {
                c.on_ladder = true;
                c.set_motion(MotionState::OnLadder);
                c.body.vel = glam::Vec2::ZERO;
                c.body.acc = glam::Vec2::ZERO;
                c.attached = None;
            }
            PlayerState::Sliding => {
                c.body.size.y = c.normal_size.y * CROUCH_SCALE;
                c.body.acc.x = 0.0;
                c.set_motion(MotionState::Sliding);
            }
        }
    }

    /// Side effects on replacement
    pub(crate) fn exit(self, c: &mut Creature) {
        match self {
            PlayerState::Normal => {}
            PlayerState::Jumping => {
                c.jump_timer = 0.0;
                // Falling from here on, so hooks can catch us
                if c.motion == MotionState::Jumping {
                    c.set_motion(MotionState::InAir);
                }
            }
            PlayerState::Ducking => {
                c.body.size = c.normal_size;
                c.body.sprite_offset.y = 0.0;
            }
            PlayerState::Hanging => {
                if c.motion == MotionState::Hanging {
                    c.set_motion(MotionState::InAir);
                }
                c.attached = None;
            }
            PlayerState::OnLadder => {
                c.on_ladder = false;
                if c.motion == MotionState::OnLadder {
                    c.set_motion(MotionState::InAir);
                }
            }
            PlayerState::Sliding => {
                // The hitbox is bottom-anchored, so restoring the height keeps the feet in place
                c.body.size = c.normal_size;
                if c.motion == MotionState::Sliding {
                    c.set_motion(MotionState::OnGround);
                }
            }
        }
    }

    /// Propose a transition for one bind event
    pub(crate) fn handle_input(
        self,
        c: &mut Creature,
        bind: Bind,
        phase: InputPhase,
    ) -> Option<PlayerState> {
        match self {
            PlayerState::Normal => normal_input(c, bind, phase),
            PlayerState::Jumping => jumping_input(c, bind, phase),
            PlayerState::Ducking => ducking_input(c, bind, phase),
            PlayerState::Hanging => hanging_input(c, bind, phase),
            PlayerState::OnLadder => ladder_input(c, bind, phase),
            PlayerState::Sliding => sliding_input(c, bind, phase),
        }
    }

    /// Runs every tick with or without input
    pub(crate) fn handle_idle(self, c: &mut Creature) -> Option<PlayerState> {
        match self {
            PlayerState::Sliding => slide_check(c),
            PlayerState::OnLadder if !c.near_ladder => Some(PlayerState::Normal),
            _ => None,
        }
    }
}

fn direction_of(bind: Bind) -> Option<Direction> {
    match bind {
        Bind::Left => Some(Direction::Left),
        Bind::Right => Some(Direction::Right),
        _ => None,
    }
}

fn normal_input(c: &mut Creature, bind: Bind, phase: InputPhase) -> Option<PlayerState> {
    if let Some(dir) = direction_of(bind) {
        c.walk(dir, phase);
        return None;
    }
    match (bind, phase) {
        (Bind::Up, InputPhase::Press) if c.near_ladder => Some(PlayerState::OnLadder),
        (Bind::Down, InputPhase::Press) => {
            if c.can_slide(SLIDE_PRESS_SPEED) {
                Some(PlayerState::Sliding)
            } else if c.motion == MotionState::OnGround {
                Some(PlayerState::Ducking)
            } else {
                None
            }
        }
        (Bind::Down, InputPhase::Hold) if c.can_slide(SLIDE_HOLD_SPEED) => {
            Some(PlayerState::Sliding)
        }
        (Bind::Jump, InputPhase::Press) if c.motion == MotionState::OnGround => {
            Some(PlayerState::Jumping)
        }
        _ => None,
    }
}

fn jumping_input(c: &mut Creature, bind: Bind, phase: InputPhase) -> Option<PlayerState> {
    if let Some(dir) = direction_of(bind) {
        c.walk(dir, phase);
        return None;
    }
    match (bind, phase) {
        (Bind::Jump, InputPhase::Unpress) => Some(PlayerState::Normal),
        (Bind::Jump, InputPhase::Hold) if c.jump_timer <= 0.0 => Some(PlayerState::Normal),
        _ => None,
    }
}

fn ducking_input(c: &mut Creature, bind: Bind, phase: InputPhase) -> Option<PlayerState> {
    match (bind, phase) {
        (Bind::Left | Bind::Right | Bind::Up, InputPhase::Press) => {
            if let Some(dir) = direction_of(bind) {
                c.body.direction = dir;
            }
            Some(PlayerState::Normal)
        }
        (Bind::Down, InputPhase::Unpress) => Some(PlayerState::Normal),
        (Bind::Jump, InputPhase::Press) => Some(PlayerState::Jumping),
        _ => None,
    }
}

fn hanging_input(c: &mut Creature, bind: Bind, phase: InputPhase) -> Option<PlayerState> {
    match (bind, phase) {
        (Bind::Left | Bind::Right, InputPhase::Press) => {
            if let Some(dir) = direction_of(bind) {
                c.body.direction = dir;
            }
            None
        }
        (Bind::Jump, InputPhase::Press) => Some(PlayerState::Jumping),
        (Bind::Down, InputPhase::Press) => {
            c.lefthook = true;
            Some(PlayerState::Normal)
        }
        _ => None,
    }
}

fn ladder_input(c: &mut Creature, bind: Bind, phase: InputPhase) -> Option<PlayerState> {
    match (bind, phase) {
        (Bind::Up, InputPhase::Press | InputPhase::Hold) => {
            c.body.vel.y = -c.climb_vel;
            None
        }
        (Bind::Down, InputPhase::Press | InputPhase::Hold) => {
            c.body.vel.y = c.climb_vel;
            None
        }
        (Bind::Up | Bind::Down, InputPhase::Unpress) => {
            c.body.vel.y = 0.0;
            None
        }
        (Bind::Left | Bind::Right | Bind::Jump, InputPhase::Press) => {
            if let Some(dir) = direction_of(bind) {
                c.body.direction = dir;
            }
            Some(PlayerState::Normal)
        }
        _ => None,
    }
}

fn sliding_input(c: &mut Creature, bind: Bind, phase: InputPhase) -> Option<PlayerState> {
    let locked = c.ceiling_overhead;
    match (bind, phase) {
        (Bind::Left | Bind::Right, InputPhase::Press) => {
            let reversing = direction_of(bind) != Some(c.body.direction);
            if reversing && !locked {
                Some(PlayerState::Normal)
            } else {
                None
            }
        }
        (Bind::Jump, InputPhase::Press) if !locked => {
            // Leave the slide grounded so the jump guard accepts it
            c.set_motion(MotionState::OnGround);
            Some(PlayerState::Jumping)
        }
        (Bind::Down, InputPhase::Unpress) if !locked => Some(PlayerState::Normal),
        (_, InputPhase::Hold) => slide_check(c),
        _ => None,
    }
}

/// Hold-phase slide logic, also run when idle
fn slide_check(c: &mut Creature) -> Option<PlayerState> {
    if c.ceiling_overhead {
        return None;
    }
    let stopped = c.body.vel.x.abs() < SLIDE_STOP_SPEED;
    let reversed = Direction::from_dx(c.body.vel.x) != Some(c.body.direction);
    if stopped || reversed || !c.on_ice {
        Some(PlayerState::Normal)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn player() -> Creature {
        let mut c = Creature::new_player(Vec2::new(100.0, 200.0));
        c.motion = MotionState::OnGround;
        c
    }

    #[test]
    fn test_jump_press_only_when_grounded() {
        let mut c = player();
        c.motion = MotionState::InAir;
        c.handle_input(Bind::Jump, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Normal);

        c.motion = MotionState::OnGround;
        c.handle_input(Bind::Jump, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Jumping);
        assert_eq!(c.motion, MotionState::Jumping);
        assert_eq!(c.jump_timer, JUMP_DURATION);
        assert_eq!(c.body.vel.y, JUMP_VELOCITY);
    }

    #[test]
    fn test_jump_release_and_expiry_end_jump() {
        let mut c = player();
        c.handle_input(Bind::Jump, InputPhase::Press);
        c.handle_input(Bind::Jump, InputPhase::Unpress);
        assert_eq!(c.state(), PlayerState::Normal);
        assert_eq!(c.jump_timer, 0.0);

        let mut c = player();
        c.handle_input(Bind::Jump, InputPhase::Press);
        c.handle_input(Bind::Jump, InputPhase::Hold);
        assert_eq!(c.state(), PlayerState::Jumping);
        c.update_status(JUMP_DURATION + 0.01);
        c.handle_input(Bind::Jump, InputPhase::Hold);
        assert_eq!(c.state(), PlayerState::Normal);
    }

    #[test]
    fn test_duck_shrinks_and_restores_hitbox() {
        let mut c = player();
        let bottom = c.body.hitbox().bottom();
        c.handle_input(Bind::Down, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Ducking);
        assert!(c.body.size.y < c.normal_size.y);
        assert!(c.body.sprite_offset.y > 0.0);

        c.handle_input(Bind::Right, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Normal);
        assert_eq!(c.body.size, c.normal_size);
        assert_eq!(c.body.hitbox().bottom(), bottom);
    }

    #[test]
    fn test_duck_jump_cancel() {
        let mut c = player();
        c.handle_input(Bind::Down, InputPhase::Press);
        c.handle_input(Bind::Jump, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Jumping);
        assert_eq!(c.body.size, c.normal_size);
    }

    #[test]
    fn test_ladder_needs_proximity() {
        let mut c = player();
        c.handle_input(Bind::Up, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Normal);

        c.near_ladder = true;
        c.handle_input(Bind::Up, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::OnLadder);
        assert!(c.on_ladder);
        c.handle_input(Bind::Up, InputPhase::Hold);
        assert_eq!(c.body.vel.y, -c.climb_vel);

        c.near_ladder = false;
        c.handle_idle();
        assert_eq!(c.state(), PlayerState::Normal);
        assert!(!c.on_ladder);
    }

    #[test]
    fn test_slide_thresholds() {
        let mut c = player();
        c.on_ice = true;
        c.body.direction = Direction::Right;

        // Too slow on press
        c.body.vel.x = 70.0;
        c.handle_input(Bind::Down, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Ducking);
        c.handle_input(Bind::Down, InputPhase::Unpress);

        // Fast enough for press, not for hold
        c.body.vel.x = 90.0;
        c.handle_input(Bind::Down, InputPhase::Hold);
        assert_eq!(c.state(), PlayerState::Normal);
        c.handle_input(Bind::Down, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Sliding);
        assert_eq!(c.motion, MotionState::Sliding);
        assert!(c.body.size.y < c.normal_size.y);
    }

    #[test]
    fn test_slide_against_travel_direction_refused() {
        let mut c = player();
        c.on_ice = true;
        c.body.direction = Direction::Left;
        c.body.vel.x = 150.0;
        c.handle_input(Bind::Down, InputPhase::Hold);
        assert_eq!(c.state(), PlayerState::Normal);
    }

    fn sliding_player() -> Creature {
        let mut c = player();
        c.on_ice = true;
        c.body.direction = Direction::Right;
        c.body.vel.x = 150.0;
        c.handle_input(Bind::Down, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Sliding);
        c
    }

    #[test]
    fn test_slide_self_cancels_when_idle() {
        let mut c = sliding_player();
        c.handle_idle();
        assert_eq!(c.state(), PlayerState::Sliding);

        c.on_ice = false;
        c.handle_idle();
        assert_eq!(c.state(), PlayerState::Normal);
        assert_eq!(c.motion, MotionState::OnGround);
        assert_eq!(c.body.size, c.normal_size);

        let mut c = sliding_player();
        c.body.vel.x = 0.0;
        c.handle_idle();
        assert_eq!(c.state(), PlayerState::Normal);
    }

    #[test]
    fn test_slide_locked_under_ceiling() {
        let mut c = sliding_player();
        c.ceiling_overhead = true;
        c.handle_input(Bind::Left, InputPhase::Press);
        c.handle_input(Bind::Jump, InputPhase::Press);
        c.handle_input(Bind::Down, InputPhase::Unpress);
        c.body.vel.x = 0.0;
        c.handle_idle();
        assert_eq!(c.state(), PlayerState::Sliding);

        c.ceiling_overhead = false;
        c.body.vel.x = 150.0;
        c.handle_input(Bind::Jump, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Jumping);
    }

    #[test]
    fn test_hang_drop_sets_lefthook() {
        let mut c = player();
        c.motion = MotionState::InAir;
        assert!(c.set_state(PlayerState::Hanging));
        assert_eq!(c.motion, MotionState::Hanging);

        c.handle_input(Bind::Down, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Normal);
        assert!(c.lefthook);
        assert_eq!(c.motion, MotionState::InAir);
    }

    #[test]
    fn test_hang_jump_allowed() {
        let mut c = player();
        c.motion = MotionState::InAir;
        c.set_state(PlayerState::Hanging);
        c.handle_input(Bind::Jump, InputPhase::Press);
        assert_eq!(c.state(), PlayerState::Jumping);
        assert_eq!(c.motion, MotionState::Jumping);
    }

    #[test]
    fn test_walk_sets_push_and_facing() {
        let mut c = player();
        c.handle_input(Bind::Left, InputPhase::Press);
        assert_eq!(c.body.direction, Direction::Left);
        assert_eq!(c.body.acc.x, -WALK_ACCEL);
        c.handle_input(Bind::Right, InputPhase::Unpress);
        assert_eq!(c.body.acc.x, -WALK_ACCEL);
        c.handle_input(Bind::Left, InputPhase::Unpress);
        assert_eq!(c.body.acc.x, 0.0);
    }
}
