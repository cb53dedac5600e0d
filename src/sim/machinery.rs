//! Doors, buttons, moving platforms and lava floors

use glam::Vec2;

use super::entity::{Body, Rect};
use super::events::{GameEvent, SoundEffect};
use crate::consts::{DOOR_VELOCITY, TILE_SIZE};

/// Waypoint travel for a platform
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformMotion {
    /// Top-left positions to visit
    pub waypoints: Vec<Vec2>,
    pub target: usize,
    pub forward: bool,
    /// Loop back to the first waypoint instead of reversing
    pub closed: bool,
    pub speed: f32,
    pub decel: f32,
    pub min_speed: f32,
    pub current_speed: f32,
}

impl PlatformMotion {
    /// Shuttle between two endpoints
    pub fn shuttle(a: Vec2, b: Vec2, speed: f32, decel: f32, min_speed: f32) -> Self {
        Self::route(vec![a, b], false, speed, decel, min_speed)
    }

    pub fn route(waypoints: Vec<Vec2>, closed: bool, speed: f32, decel: f32, min_speed: f32) -> Self {
        Self {
            target: if waypoints.len() > 1 { 1 } else { 0 },
            waypoints,
            forward: true,
            closed,
            speed,
            decel,
            min_speed: min_speed.min(speed).max(0.0),
            current_speed: speed,
        }
    }

    fn advance(&mut self) {
        let n = self.waypoints.len();
        if n < 2 {
            return;
        }
        if self.forward {
            if self.target + 1 < n {
                self.target += 1;
            } else if self.closed {
                self.target = 0;
            } else {
                self.forward = false;
                self.target -= 1;
            }
        } else if self.target > 0 {
            self.target -= 1;
        } else {
            self.forward = true;
            self.target = 1;
        }
    }

    /// New top-left after `dt` seconds from `pos`
    fn step(&mut self, pos: Vec2, dt: f32) -> Vec2 {
        let Some(&goal) = self.waypoints.get(self.target) else {
            return pos;
        };
        let delta = goal - pos;
        // Vertical travel first when both axes differ
        let vertical = delta.y != 0.0;
        let remaining = if vertical { delta.y.abs() } else { delta.x.abs() };
        if remaining == 0.0 {
            self.advance();
            return pos;
        }

        if remaining < TILE_SIZE {
            self.current_speed = (self.current_speed - self.decel * dt).max(self.min_speed);
        } else {
            self.current_speed = (self.current_speed + self.decel * dt).min(self.speed);
        }

        let travel = self.current_speed * dt;
        let mut next = pos;
        if travel >= remaining {
            if vertical {
                next.y = goal.y;
            } else {
                next.x = goal.x;
            }
            if next == goal {
                self.advance();
            }
        } else if vertical {
            next.y += travel * delta.y.signum();
        } else {
            next.x += travel * delta.x.signum();
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MachineKind {
    /// Slides up by `open_offset` when open
    Door { open_offset: f32, open: bool },
    Button { pressed: bool },
    Platform(PlatformMotion),
    /// Damaging floor, optionally pinned to the camera
    LavaFloor { track_camera: bool, screen_offset: f32 },
}

#[derive(Debug, Clone)]
pub struct Machinery {
    pub body: Body,
    pub kind: MachineKind,
    pub enabled: bool,
    pub solid: bool,
    pub destructable: bool,
    pub standable: bool,
    pub hookable: bool,
    /// Resting rectangle; closed position for doors
    pub default_rect: Rect,
    /// Door <-> button pairing
    pub pair_id: Option<u32>,
}

impl Machinery {
    fn from_rect(rect: Rect, kind: MachineKind) -> Self {
        let mut body = Body::new(Vec2::new(rect.x, rect.bottom()), Vec2::new(rect.w, rect.h));
        body.ignore_gravity = true;
        body.ignore_world = true;
        Self {
            body,
            kind,
            enabled: true,
            solid: false,
            destructable: false,
            standable: false,
            hookable: false,
            default_rect: rect,
            pair_id: None,
        }
    }

    pub fn door(rect: Rect, open_offset: f32, pair_id: Option<u32>) -> Self {
        let mut m = Self::from_rect(
            rect,
            MachineKind::Door {
                open_offset,
                open: false,
            },
        );
        m.solid = true;
        m.pair_id = pair_id;
        m
    }

    pub fn button(rect: Rect, pair_id: Option<u32>) -> Self {
        let mut m = Self::from_rect(rect, MachineKind::Button { pressed: false });
        m.standable = true;
        m.pair_id = pair_id;
        m
    }

    pub fn platform(rect: Rect, motion: PlatformMotion) -> Self {
        let mut m = Self::from_rect(rect, MachineKind::Platform(motion));
        m.solid = true;
        m
    }

    pub fn lava(rect: Rect, track_camera: bool, screen_offset: f32) -> Self {
        Self::from_rect(
            rect,
            MachineKind::LavaFloor {
                track_camera,
                screen_offset,
            },
        )
    }

    pub fn rect(&self) -> Rect {
        self.body.hitbox()
    }

    pub fn top_left(&self) -> Vec2 {
        let r = self.rect();
        Vec2::new(r.x, r.y)
    }

    fn set_top_left(&mut self, p: Vec2) {
        self.body.pos = Vec2::new(p.x, p.y + self.body.size.y);
    }

    /// Open or close a door, reporting the change
    pub fn set_open(&mut self, open: bool, events: &mut Vec<GameEvent>) {
        if let MachineKind::Door { open: current, .. } = &mut self.kind {
            if *current != open {
                *current = open;
                events.push(GameEvent::Sound(if open {
                    SoundEffect::DoorOpen
                } else {
                    SoundEffect::DoorClose
                }));
            }
        }
    }

    /// Advance one tick. `camera` is the current view rectangle.
    pub fn update(&mut self, dt: f32, camera: Option<Rect>) {
        if !self.enabled || dt <= 0.0 {
            self.body.vel = Vec2::ZERO;
            return;
        }
        let before = self.top_left();
        let after = match &mut self.kind {
            MachineKind::Door { open_offset, open } => {
                let closed_y = self.default_rect.y;
                let open_y = closed_y - *open_offset;
                let goal = if *open { open_y } else { closed_y };
                let step = DOOR_VELOCITY * dt;
                let y = if before.y > goal {
                    (before.y - step).max(goal)
                } else {
                    (before.y + step).min(goal)
                };
                Vec2::new(before.x, y.clamp(open_y.min(closed_y), open_y.max(closed_y)))
            }
            MachineKind::Button { .. } => before,
            MachineKind::Platform(motion) => motion.step(before, dt),
            MachineKind::LavaFloor {
                track_camera,
                screen_offset,
            } => match camera {
                Some(cam) if *track_camera => Vec2::new(cam.x, cam.y + *screen_offset),
                _ => before,
            },
        };
        self.set_top_left(after);
        self.body.vel = (after - before) / dt;
    }
}
