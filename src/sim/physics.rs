//! Per-creature physics pipeline
//!
//! One call to [`apply_physics`] runs, in order: forces, tile collisions
//! (bottom, top, right, left), machinery collisions, special tile checks,
//! position commit and status timers. Later stages always see the earlier
//! stages' writes from the same tick.

use glam::Vec2;

use super::collision::{
    any_covered, column_left, columns, covered_tiles, find_in_column, find_in_row, rect_collision,
    row_top, rows, SeparationAxis,
};
use super::creature::{Creature, MotionState, PushedFrom};
use super::entity::{Rect, Roster, Status};
use super::events::SoundEffect;
use super::machinery::{MachineKind, Machinery};
use super::player_state::PlayerState;
use super::tiles::{PhysicsType, TileMap};
use crate::approach_zero;
use crate::consts::*;

/// Half width of the ladder probe around the hitbox centre
const LADDER_REACH: f32 = 6.0;
/// Hand probe size; it sits at the top-front corner of the hitbox
const HAND_WIDTH: f32 = 10.0;
const HAND_HEIGHT: f32 = 8.0;

/// Read-only world a creature collides against
pub struct PhysicsEnv<'a> {
    pub map: &'a TileMap,
    pub machinery: &'a Roster<Machinery>,
    pub death_zones: &'a [Rect],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicsOutcome {
    /// Touched an exit block; resolution stopped early
    pub exit_level: bool,
    /// Crush damage landed this tick
    pub crushed: bool,
}

/// Advance one creature by `ticks` simulation ticks
pub fn apply_physics(c: &mut Creature, env: &PhysicsEnv<'_>, ticks: f32) -> PhysicsOutcome {
    let dt = ticks * PHYSICS_SPEED;
    let mut outcome = PhysicsOutcome::default();
    c.pushed_from = PushedFrom::default();
    c.blocked = false;

    let mut next = apply_forces(c, env, dt);

    if !c.body.ignore_world && resolve_map(c, env.map, &mut next) {
        outcome.exit_level = true;
    }

    if !outcome.exit_level {
        if !c.is_dying() {
            resolve_machinery(c, env, &mut next);
        }
        if c.pushed_from.crushed() && c.take_damage(CRUSH_DAMAGE) {
            c.sound(SoundEffect::Crush);
            outcome.crushed = true;
        }
        if !c.body.ignore_world {
            check_special(c, env, &mut next);
        }
    }

    commit(c, env, next);
    c.update_status(dt);
    outcome
}

/// Integrate forces and return the candidate position
fn apply_forces(c: &mut Creature, env: &PhysicsEnv<'_>, dt: f32) -> Vec2 {
    let stunned = c.body.status == Status::Stun;
    let grounded = matches!(
        c.motion,
        MotionState::OnGround | MotionState::Sliding | MotionState::Hanging
    );
    if grounded && !stunned && !c.on_ladder {
        c.body.vel.y = 0.0;
    }

    if !c.body.ignore_gravity && !c.on_ladder {
        c.body.acc.y += GRAVITY * c.body.gravity_multiplier;
    }
    if c.motion == MotionState::Hanging {
        c.body.acc = Vec2::ZERO;
    }
    if c.attached.is_some() {
        c.body.acc.y = 0.0;
    }

    if c.jump_timer > 0.0 {
        c.body.vel.y = JUMP_VELOCITY;
    } else {
        c.body.vel.y += c.body.acc.y * dt;
    }

    let airborne = matches!(c.motion, MotionState::InAir | MotionState::Jumping);
    let mut push = if stunned { 0.0 } else { c.body.acc.x };
    if airborne && !c.body.ignore_world {
        push *= AIR_PUSH_MULTIPLIER;
    }
    c.body.vel.x += push * dt;

    let slide_locked = c.motion == MotionState::Sliding && c.ceiling_overhead;
    if !c.body.ignore_world && !slide_locked {
        let mut friction = if stunned {
            KNOCKBACK_DECEL
        } else {
            match c.motion {
                MotionState::Sliding => FRICTION_ICE_SLIDING,
                MotionState::OnGround if c.on_ice => FRICTION_ICE_WALKING,
                MotionState::OnGround => FRICTION_GROUND,
                _ => FRICTION_AIR,
            }
        };
        if c.in_water {
            friction *= WATER_FRICTION_MULTIPLIER;
        }
        c.body.vel.x = approach_zero(c.body.vel.x, friction * dt);
    }

    let scale = if c.in_water {
        WATER_VELOCITY_MULTIPLIER
    } else {
        1.0
    };
    // Knockback may exceed the walking cap
    if !stunned {
        let max_x = c.move_vel * scale;
        c.body.vel.x = c.body.vel.x.clamp(-max_x, max_x);
    }
    let max_y = c.term_vel * scale;
    c.body.vel.y = c.body.vel.y.clamp(-max_y, max_y);
    c.body.acc.y = 0.0;

    let step = c.body.vel * dt;
    if let Some(mid) = c.attached {
        if let Some(m) = env.machinery.get(mid).filter(|m| m.enabled) {
            return m.body.pos + c.attach_offset + Vec2::new(step.x, 0.0);
        }
        c.attached = None;
        match c.motion {
            MotionState::OnGround => {
                c.set_motion(MotionState::InAir);
            }
            // The machine we hung from is gone
            MotionState::Hanging => {
                c.set_state(PlayerState::Normal);
            }
            _ => {}
        }
    }
    c.body.pos + step
}

/// Tile collisions. Returns true when an exit block was touched.
fn resolve_map(c: &mut Creature, map: &TileMap, next: &mut Vec2) -> bool {
    let old = c.body.pos;
    let old_hb = c.body.hitbox();
    let off = c.body.hitbox_offset;

    // Bottom; vertical checks use the old x
    let hb = c.body.hitbox_at(Vec2::new(old.x, next.y));
    let in_map = hb.bottom() >= 0.0 && hb.bottom() < map.pixel_height();
    let row = map.tile_y(hb.bottom(), false);
    let top = row_top(row);
    let falling = c.body.vel.y >= 0.0;
    let on_ladder = c.on_ladder;
    let floor = in_map
        && find_in_row(map, columns(map, &hb), row, |t| {
            t.is_solid()
                || (falling
                    && t.is_one_way()
                    && !(on_ladder && t == PhysicsType::LadderTop)
                    && old_hb.bottom() <= top + ONE_WAY_TOLERANCE)
        })
        .is_some();
    if floor {
        next.y = top - COLLISION_EPSILON + off.y;
        if c.motion != MotionState::Sliding {
            c.set_motion(MotionState::OnGround);
        }
        c.body.vel.y = 0.0;
        c.pushed_from.bottom = true;
        c.lefthook = false;
    } else if c.motion == MotionState::Jumping {
        // Jump impulse spent and past the apex
        if c.jump_timer <= 0.0 && c.body.vel.y >= 0.0 {
            c.set_motion(MotionState::InAir);
        }
    } else if !matches!(c.motion, MotionState::Hanging | MotionState::OnLadder)
        && c.attached.is_none()
    {
        c.set_motion(MotionState::InAir);
    }

    // Top: reject the vertical move outright
    if next.y < old.y {
        let hb = c.body.hitbox_at(Vec2::new(old.x, next.y));
        let row = map.tile_y(hb.top(), false);
        if hb.top() >= 0.0 && find_in_row(map, columns(map, &hb), row, |t| t.is_solid()).is_some()
        {
            next.y = old.y;
            c.body.vel.y = c.body.vel.y.max(0.0);
            c.pushed_from.top = true;
        }
    }

    // Right, then left
    let hb = c.body.hitbox_at(*next);
    let span = rows(map, &hb);
    let dx = next.x - old.x;
    for moving_right in [true, false] {
        if (moving_right && dx <= 0.0) || (!moving_right && dx >= 0.0) {
            continue;
        }
        let edge = if moving_right { hb.right() } else { hb.left() };
        let col = map.tile_x(edge, false);
        if !c.is_ai()
            && find_in_column(map, col, span.clone(), |t| t == PhysicsType::ExitBlock).is_some()
        {
            log::info!("{} reached the exit", c.name);
            return true;
        }
        if find_in_column(map, col, span.clone(), |t| t.is_solid()).is_some() {
            c.body.acc.x = 0.0;
            c.body.vel.x = 0.0;
            c.blocked = true;
            if moving_right {
                next.x = column_left(col) - COLLISION_EPSILON - hb.w - off.x;
                c.pushed_from.right = true;
            } else {
                next.x = column_left(col + 1) + COLLISION_EPSILON - off.x;
                c.pushed_from.left = true;
            }
        }
    }
    false
}

/// Settle on top of machinery and ride it
fn land_on(c: &mut Creature, mr: &Rect, next: &mut Vec2) {
    next.y = mr.top() - COLLISION_EPSILON + c.body.hitbox_offset.y;
    c.body.vel.y = 0.0;
    if c.motion != MotionState::Sliding {
        c.set_motion(MotionState::OnGround);
    }
    c.pushed_from.bottom = true;
}

fn resolve_machinery(c: &mut Creature, env: &PhysicsEnv<'_>, next: &mut Vec2) {
    let off = c.body.hitbox_offset;
    let old_hb = c.body.hitbox();
    let was_attached = c.attached;
    let mut support = None;
    let mut pushed = PushedFrom::default();

    for (mid, m) in env.machinery.iter() {
        if !m.enabled {
            continue;
        }
        let mr = m.rect();
        let hb = c.body.hitbox_at(*next);

        if c.is_ai() {
            if m.solid && hb.overlaps(&mr) {
                next.x = c.body.pos.x;
                c.body.vel.x = 0.0;
                c.body.direction = c.body.direction.flipped();
                c.blocked = true;
            }
            continue;
        }
        if matches!(m.kind, MachineKind::LavaFloor { .. }) || !(m.solid || m.standable) {
            continue;
        }

        let rising = c.motion == MotionState::Jumping || c.body.vel.y < 0.0;
        let from_above = !rising
            && hb.overlaps_x(&mr)
            && hb.top() < mr.top()
            && hb.bottom() >= mr.top() - STANDABLE_TOLERANCE
            && old_hb.bottom() <= mr.top() + STANDABLE_TOLERANCE;
        if from_above {
            land_on(c, &mr, next);
            support = Some(mid);
            continue;
        }
        if !m.solid {
            continue;
        }

        let result = rect_collision(&hb, &mr);
        if !result.hit {
            continue;
        }
        match result.axis {
            SeparationAxis::Vertical if result.offset.y < 0.0 => {
                land_on(c, &mr, next);
                support = Some(mid);
            }
            SeparationAxis::Vertical => {
                next.y = mr.bottom() + hb.h + off.y + COLLISION_EPSILON;
                c.body.vel.y = c.body.vel.y.max(0.0);
                c.pushed_from.top = true;
                pushed.top = true;
            }
            SeparationAxis::Horizontal if result.offset.x < 0.0 => {
                next.x = mr.left() - hb.w - off.x - COLLISION_EPSILON;
                c.body.vel.x = c.body.vel.x.min(0.0);
                c.blocked = true;
                c.pushed_from.right = true;
                pushed.right = true;
            }
            SeparationAxis::Horizontal => {
                next.x = mr.right() + COLLISION_EPSILON - off.x;
                c.body.vel.x = c.body.vel.x.max(0.0);
                c.blocked = true;
                c.pushed_from.left = true;
                pushed.left = true;
            }
        }
    }

    // Shoved into solid tiles: the tiles push back from the far side
    if pushed != PushedFrom::default() && !c.body.ignore_world {
        let hb = c.body.hitbox_at(*next);
        if any_covered(env.map, &hb, |t| t.is_solid()) {
            c.pushed_from.bottom |= pushed.top;
            c.pushed_from.left |= pushed.right;
            c.pushed_from.right |= pushed.left;
        }
    }

    if let Some(mid) = support {
        c.attached = Some(mid);
    } else if was_attached.is_some() && c.motion != MotionState::Hanging {
        c.attached = None;
        if !c.pushed_from.bottom && c.motion == MotionState::OnGround {
            c.set_motion(MotionState::InAir);
        }
    }
}

/// Hand probe at the top-front corner of a hitbox
pub fn hand_probe(hb: &Rect, facing_right: bool) -> Rect {
    let x = if facing_right {
        hb.right() - HAND_WIDTH / 2.0
    } else {
        hb.left() - HAND_WIDTH / 2.0
    };
    Rect::new(x, hb.top(), HAND_WIDTH, HAND_HEIGHT)
}

fn check_special(c: &mut Creature, env: &PhysicsEnv<'_>, next: &mut Vec2) {
    let map = env.map;
    let hb = c.body.hitbox_at(*next);
    let center = hb.center();

    let ladder_probe = Rect::new(
        center.x - LADDER_REACH,
        hb.top(),
        2.0 * LADDER_REACH,
        hb.h + 2.0,
    );
    c.near_ladder = any_covered(map, &ladder_probe, |t| t.is_ladder());
    c.in_water = map.type_at_world(center.x, center.y).is_water();
    c.in_rain = any_covered(map, &hb, |t| t == PhysicsType::Rain);
    // Floor row read directly; the clamped span never reaches the last row
    let floor_row = map.tile_y(hb.bottom() + 1.0, false);
    c.on_ice = matches!(c.motion, MotionState::OnGround | MotionState::Sliding)
        && find_in_row(map, columns(map, &hb), floor_row, |t| t.is_ice()).is_some();
    // Room to stand up again
    let stand_h = c.normal_size.y.max(hb.h);
    let above = Rect::new(hb.x, hb.bottom() - stand_h - 1.0, hb.w, stand_h - hb.h + 1.0);
    c.ceiling_overhead = any_covered(map, &above, |t| t.is_solid());

    if !c.is_dying() && env.death_zones.iter().any(|z| z.overlaps(&hb)) {
        log::debug!("{} entered a death zone", c.name);
        c.die();
        return;
    }

    if c.state() == PlayerState::Hanging {
        return;
    }

    let probe = hand_probe(&hb, c.body.direction == super::entity::Direction::Right);
    let hook_machine = env
        .machinery
        .iter()
        .find(|(_, m)| m.enabled && m.hookable && probe.overlaps(&m.rect()) && probe.top() <= m.rect().top())
        .map(|(id, m)| (id, m.rect()));
    let hook_tile = covered_tiles(map, &probe).find(|(_, _, t)| t.is_hook());

    if c.lefthook {
        if hook_tile.is_none() && hook_machine.is_none() {
            c.lefthook = false;
        }
        return;
    }
    if !c.is_player() || c.motion != MotionState::InAir || c.body.vel.y <= 0.0 {
        return;
    }

    if let Some((_, ty, _)) = hook_tile {
        if c.set_state(PlayerState::Hanging) {
            next.y = row_top(ty) + hb.h + c.body.hitbox_offset.y;
        }
    } else if let Some((mid, mr)) = hook_machine {
        if c.set_state(PlayerState::Hanging) {
            next.y = mr.top() + hb.h + c.body.hitbox_offset.y;
            c.attached = Some(mid);
        }
    }
}

fn commit(c: &mut Creature, env: &PhysicsEnv<'_>, next: Vec2) {
    let w = env.map.pixel_width();
    let h = env.map.pixel_height();
    c.body.pos = Vec2::new(
        next.x.clamp(-WORLD_MARGIN, w + WORLD_MARGIN),
        next.y.clamp(-WORLD_MARGIN, h + WORLD_MARGIN),
    );
    if let Some(mid) = c.attached {
        match env.machinery.get(mid) {
            Some(m) => c.attach_offset = c.body.pos - m.body.pos,
            None => c.attached = None,
        }
    }
}
