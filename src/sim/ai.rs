//! Enemy behaviours
//!
//! Every behaviour shares [`AiCore`]: repeating timers plus a reach/loss
//! distance band toward a fixed target. Behaviours only write intent
//! (facing, walking push, jump requests, queued shots); the physics pipeline
//! does the moving.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::creature::{Creature, MotionState, Weapon};
use super::entity::{Direction, EntityId};
use super::events::{EffectKind, GameEvent, SoundEffect};
use super::player_state::{InputPhase, PlayerState};

/// Facing is left alone inside this horizontal band
const FACE_DEADZONE: f32 = 2.0;
const MISSILE_ACCEL: f32 = 900.0;
const EMBER_LEAP_VELOCITY: f32 = -520.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiTimer {
    pub interval: f32,
    pub remaining: f32,
}

impl AiTimer {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            remaining: interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceEvent {
    Reached,
    Lost,
}

/// Timers and distance hysteresis shared by all behaviours
#[derive(Debug, Clone, PartialEq)]
pub struct AiCore {
    /// Fixed at construction; resolved each tick and tolerated missing
    pub target: Option<EntityId>,
    pub timers: Vec<AiTimer>,
    pub reach: f32,
    pub reach_x: f32,
    pub reach_y: f32,
    pub loss: f32,
    pub reached: bool,
    /// Never report loss once reached
    pub one_shot: bool,
}

impl AiCore {
    pub fn new(target: Option<EntityId>, reach: f32, loss: f32) -> Self {
        let loss = if loss < reach {
            log::warn!("loss distance {loss} below reach {reach}; raising it to {reach}");
            reach
        } else {
            loss
        };
        Self {
            target,
            timers: Vec::new(),
            reach,
            reach_x: f32::INFINITY,
            reach_y: f32::INFINITY,
            loss,
            reached: false,
            one_shot: false,
        }
    }

    pub fn with_timer(mut self, interval: f32) -> Self {
        self.timers.push(AiTimer::new(interval));
        self
    }

    /// Count every timer down, returning the indices that fired
    pub fn tick_timers(&mut self, dt: f32) -> Vec<usize> {
        let mut fired = Vec::new();
        for (i, timer) in self.timers.iter_mut().enumerate() {
            timer.remaining -= dt;
            if timer.remaining <= 0.0 {
                timer.remaining = timer.interval;
                fired.push(i);
            }
        }
        fired
    }

    /// Feed the offset from this creature to its target
    pub fn check_distance(&mut self, offset: Vec2) -> Option<DistanceEvent> {
        let dist = offset.length();
        if !self.reached
            && dist < self.reach
            && offset.x.abs() < self.reach_x
            && offset.y.abs() < self.reach_y
        {
            self.reached = true;
            return Some(DistanceEvent::Reached);
        }
        if self.reached && !self.one_shot && dist > self.loss {
            self.reached = false;
            return Some(DistanceEvent::Lost);
        }
        None
    }
}

/// The ten behaviour variants and their private state
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Chaser {
        chase: bool,
    },
    /// Chaser that also jumps when the target is `jump_min..jump_max` away
    JumpingChaser {
        chase: bool,
        jump_min: f32,
        jump_max: f32,
    },
    Wanderer,
    /// Leaps once at an approaching target and slams on landing
    Pouncer {
        pounced: bool,
        slammed: bool,
    },
    Missile {
        heading: Vec2,
    },
    Lurker,
    Orbiter {
        angle: f32,
        radius: f32,
        angular_speed: f32,
    },
    Charger {
        charging: bool,
    },
    Turret {
        active: bool,
    },
    /// Leaps out of its spawn and is removed once it falls back past it
    Ember {
        spawn_y: f32,
        leaping: bool,
    },
}

/// Serializable behaviour description used by creature definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AiSpec {
    Chaser {
        reach: f32,
        loss: f32,
    },
    JumpingChaser {
        reach: f32,
        loss: f32,
        jump_min: f32,
        jump_max: f32,
    },
    Wanderer {
        turn_interval: f32,
    },
    Pouncer {
        reach: f32,
        #[serde(default)]
        reach_y: Option<f32>,
    },
    Missile {
        steer_interval: f32,
        shoot_interval: f32,
    },
    Lurker {
        reach: f32,
        loss: f32,
        hop_interval: f32,
    },
    Orbiter {
        reach: f32,
        loss: f32,
        radius: f32,
        angular_speed: f32,
    },
    Charger {
        reach: f32,
        loss: f32,
        recover: f32,
    },
    Turret {
        reach: f32,
        fire_interval: f32,
    },
    Ember {
        reach_x: f32,
    },
}

impl AiSpec {
    /// Build the behaviour for a creature spawned at `spawn`
    pub fn build(&self, target: Option<EntityId>, spawn: Vec2) -> Ai {
        match *self {
            AiSpec::Chaser { reach, loss } => Ai::new(
                AiCore::new(target, reach, loss),
                Behavior::Chaser { chase: false },
            ),
            AiSpec::JumpingChaser {
                reach,
                loss,
                jump_min,
                jump_max,
            } => Ai::new(
                AiCore::new(target, reach, loss),
                Behavior::JumpingChaser {
                    chase: false,
                    jump_min,
                    jump_max,
                },
            ),
            AiSpec::Wanderer { turn_interval } => Ai::new(
                AiCore::new(target, 0.0, 0.0).with_timer(turn_interval),
                Behavior::Wanderer,
            ),
            AiSpec::Pouncer { reach, reach_y } => {
                let mut core = AiCore::new(target, reach, reach);
                core.one_shot = true;
                if let Some(reach_y) = reach_y {
                    core.reach_y = reach_y;
                }
                Ai::new(
                    core,
                    Behavior::Pouncer {
                        pounced: false,
                        slammed: false,
                    },
                )
            }
            AiSpec::Missile {
                steer_interval,
                shoot_interval,
            } => Ai::new(
                AiCore::new(target, 0.0, 0.0)
                    .with_timer(steer_interval)
                    .with_timer(shoot_interval),
                Behavior::Missile {
                    heading: Vec2::ZERO,
                },
            ),
            AiSpec::Lurker {
                reach,
                loss,
                hop_interval,
            } => Ai::new(
                AiCore::new(target, reach, loss).with_timer(hop_interval),
                Behavior::Lurker,
            ),
            AiSpec::Orbiter {
                reach,
                loss,
                radius,
                angular_speed,
            } => Ai::new(
                AiCore::new(target, reach, loss),
                Behavior::Orbiter {
                    angle: 0.0,
                    radius,
                    angular_speed,
                },
            ),
            AiSpec::Charger {
                reach,
                loss,
                recover,
            } => Ai::new(
                AiCore::new(target, reach, loss).with_timer(recover),
                Behavior::Charger { charging: false },
            ),
            AiSpec::Turret {
                reach,
                fire_interval,
            } => {
                let mut core = AiCore::new(target, reach, reach).with_timer(fire_interval);
                core.one_shot = true;
                Ai::new(core, Behavior::Turret { active: false })
            }
            AiSpec::Ember { reach_x } => {
                let mut core = AiCore::new(target, f32::INFINITY, f32::INFINITY);
                core.reach_x = reach_x;
                core.one_shot = true;
                Ai::new(
                    core,
                    Behavior::Ember {
                        spawn_y: spawn.y,
                        leaping: false,
                    },
                )
            }
        }
    }
}

/// Behaviour owned by one creature
#[derive(Debug, Clone, PartialEq)]
pub struct Ai {
    pub core: AiCore,
    pub behavior: Behavior,
}

fn face(c: &mut Creature, target: Vec2) {
    let dx = target.x - c.body.center().x;
    if dx.abs() > FACE_DEADZONE {
        if let Some(d) = Direction::from_dx(dx) {
            c.body.direction = d;
        }
    }
}

fn push(c: &mut Creature) {
    let d = c.body.direction;
    c.walk(d, InputPhase::Hold);
}

fn halt(c: &mut Creature) {
    c.body.acc.x = 0.0;
}

/// Jump request; only honoured from the ground
fn hop(c: &mut Creature) -> bool {
    c.motion == MotionState::OnGround && c.set_state(PlayerState::Jumping)
}

impl Ai {
    pub fn new(core: AiCore, behavior: Behavior) -> Self {
        Self { core, behavior }
    }

    /// Per-tick decision. `target` is the target's hitbox centre, `None` when
    /// it is gone.
    pub fn update(&mut self, c: &mut Creature, target: Option<Vec2>, rng: &mut Pcg32, dt: f32) {
        if c.is_dying() {
            return;
        }
        // AI has no jump button to release
        if c.state() == PlayerState::Jumping && c.jump_timer <= 0.0 {
            c.set_state(PlayerState::Normal);
        }

        for index in self.core.tick_timers(dt) {
            self.on_timer(index, c, target, rng);
        }

        if let Some(t) = target {
            match self.core.check_distance(t - c.body.center()) {
                Some(DistanceEvent::Reached) => self.on_reached(c, t),
                Some(DistanceEvent::Lost) => self.on_lost(c),
                None => {}
            }
        }

        self.steer(c, target, dt);
    }

    fn on_timer(&mut self, index: usize, c: &mut Creature, target: Option<Vec2>, rng: &mut Pcg32) {
        let reached = self.core.reached;
        match &mut self.behavior {
            Behavior::Wanderer => {
                if rng.random_bool(0.5) {
                    c.body.direction = c.body.direction.flipped();
                }
            }
            Behavior::Missile { heading } => match (index, target) {
                (0, Some(t)) => {
                    *heading = (t - c.body.center()).normalize_or_zero();
                    if let Some(d) = Direction::from_dx(heading.x) {
                        c.body.direction = d;
                    }
                }
                (1, Some(_)) => c.queue_shot(Weapon::Spit),
                _ => {}
            },
            Behavior::Lurker => {
                if reached {
                    if let Some(t) = target {
                        face(c, t);
                    }
                    hop(c);
                }
            }
            Behavior::Charger { charging } => {
                if reached && !*charging {
                    if let Some(t) = target {
                        face(c, t);
                    }
                    *charging = true;
                }
            }
            Behavior::Turret { active } => {
                if *active {
                    if let Some(t) = target {
                        face(c, t);
                    }
                    c.queue_shot(Weapon::Spit);
                }
            }
            _ => {}
        }
    }

    fn on_reached(&mut self, c: &mut Creature, target: Vec2) {
        log::debug!("{}: target reached", c.name);
        match &mut self.behavior {
            Behavior::Chaser { chase } | Behavior::JumpingChaser { chase, .. } => *chase = true,
            Behavior::Pouncer { pounced, .. } => {
                face(c, target);
                if hop(c) {
                    *pounced = true;
                }
            }
            Behavior::Lurker => {
                face(c, target);
                hop(c);
            }
            Behavior::Charger { charging } => {
                face(c, target);
                *charging = true;
            }
            Behavior::Turret { active } => *active = true,
            Behavior::Ember { leaping, .. } => {
                *leaping = true;
                c.body.ignore_gravity = false;
                c.body.vel.y = EMBER_LEAP_VELOCITY;
            }
            Behavior::Wanderer | Behavior::Missile { .. } | Behavior::Orbiter { .. } => {}
        }
    }

    fn on_lost(&mut self, c: &mut Creature) {
        log::debug!("{}: target lost", c.name);
        match &mut self.behavior {
            Behavior::Chaser { chase } | Behavior::JumpingChaser { chase, .. } => {
                *chase = false;
                halt(c);
            }
            Behavior::Charger { charging } => {
                *charging = false;
                halt(c);
            }
            Behavior::Orbiter { .. } => c.body.vel = Vec2::ZERO,
            _ => {}
        }
    }

    /// Continuous per-tick intent
    fn steer(&mut self, c: &mut Creature, target: Option<Vec2>, dt: f32) {
        match &mut self.behavior {
            Behavior::Chaser { chase } => {
                if *chase {
                    if let Some(t) = target {
                        face(c, t);
                    }
                    push(c);
                    if c.blocked {
                        hop(c);
                    }
                }
            }
            Behavior::JumpingChaser {
                chase,
                jump_min,
                jump_max,
            } => {
                if *chase {
                    if let Some(t) = target {
                        face(c, t);
                        let dx = (t.x - c.body.center().x).abs();
                        if dx >= *jump_min && dx <= *jump_max {
                            hop(c);
                        }
                    }
                    push(c);
                    if c.blocked {
                        hop(c);
                    }
                }
            }
            Behavior::Wanderer => {
                if c.blocked {
                    c.body.direction = c.body.direction.flipped();
                }
                push(c);
            }
            Behavior::Pouncer { pounced, slammed } => {
                if *pounced && !*slammed {
                    push(c);
                } else {
                    halt(c);
                }
            }
            Behavior::Missile { heading } => {
                c.body.acc.x = heading.x * MISSILE_ACCEL;
                c.body.acc.y += heading.y * MISSILE_ACCEL;
            }
            Behavior::Lurker | Behavior::Turret { .. } => halt(c),
            Behavior::Orbiter {
                angle,
                radius,
                angular_speed,
            } => {
                let (Some(t), true) = (target, self.core.reached) else {
                    return;
                };
                *angle = (*angle + *angular_speed * dt).rem_euclid(std::f32::consts::TAU);
                let goal = t + Vec2::new(angle.cos(), angle.sin()) * *radius;
                let step = goal - c.body.center();
                if dt > 0.0 {
                    c.body.vel = (step / dt).clamp_length_max(c.move_vel);
                }
                if let Some(d) = Direction::from_dx(t.x - c.body.center().x) {
                    c.body.direction = d;
                }
            }
            Behavior::Charger { charging } => {
                if *charging {
                    if c.blocked {
                        *charging = false;
                        halt(c);
                    } else {
                        push(c);
                    }
                }
            }
            Behavior::Ember { spawn_y, leaping } => {
                if *leaping && c.body.vel.y > 0.0 && c.body.pos.y > *spawn_y {
                    c.expired = true;
                }
            }
        }
    }

    /// Called when the creature's motion state changed during the tick
    pub fn on_state_change(&mut self, c: &mut Creature, old: MotionState, new: MotionState) {
        if let Behavior::Pouncer { pounced, slammed } = &mut self.behavior {
            let landed = new == MotionState::OnGround
                && matches!(old, MotionState::InAir | MotionState::Jumping);
            if *pounced && !*slammed && landed {
                *slammed = true;
                halt(c);
                let hb = c.body.hitbox();
                c.shots.push(super::creature::Shot {
                    weapon: Weapon::Explosion,
                    origin: Vec2::new(hb.center().x, hb.bottom()),
                    direction: c.body.direction,
                });
                c.emit(GameEvent::Effect {
                    kind: EffectKind::Explosion,
                    pos: Vec2::new(hb.center().x, hb.bottom()),
                });
                c.sound(SoundEffect::Explosion);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::creature::CreatureTuning;
    use crate::sim::entity::Roster;
    use proptest::prelude::*;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn grunt_at(x: f32) -> Creature {
        let tuning = CreatureTuning {
            health: 30,
            size: Vec2::new(20.0, 20.0),
            move_vel: 100.0,
            term_vel: 600.0,
            climb_vel: 0.0,
            contact_damage: 10,
            gravity_multiplier: 1.0,
            ignore_gravity: false,
            ignore_world: false,
        };
        let mut c = Creature::new("grunt", Vec2::new(x, 100.0), &tuning);
        c.motion = MotionState::OnGround;
        c
    }

    fn target_id() -> EntityId {
        let mut roster = Roster::new();
        roster.insert(())
    }

    #[test]
    fn test_timer_fires_and_resets() {
        let mut core = AiCore::new(None, 0.0, 0.0).with_timer(0.5).with_timer(0.25);
        assert!(core.tick_timers(0.125).is_empty());
        assert_eq!(core.tick_timers(0.125), vec![1]);
        assert_eq!(core.timers[1].remaining, 0.25);
        assert!(core.tick_timers(0.125).is_empty());
        assert_eq!(core.tick_timers(0.125), vec![0, 1]);
    }

    #[test]
    fn test_inverted_band_is_widened() {
        let core = AiCore::new(None, 200.0, 140.0);
        assert_eq!(core.reach, 200.0);
        assert_eq!(core.loss, 200.0);
    }

    #[test]
    fn test_chaser_scenario() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut c = grunt_at(0.0);
        let spec = AiSpec::Chaser {
            reach: 200.0,
            loss: 140.0,
        };
        let mut ai = spec.build(Some(target_id()), c.body.pos);
        let center = c.body.center();

        ai.update(&mut c, Some(center + Vec2::new(150.0, 0.0)), &mut rng, DT);
        assert_eq!(ai.behavior, Behavior::Chaser { chase: true });
        assert_eq!(c.body.direction, Direction::Right);
        assert!(c.body.acc.x > 0.0);

        // Well past both thresholds
        let center = c.body.center();
        ai.update(&mut c, Some(center + Vec2::new(260.0, 0.0)), &mut rng, DT);
        assert_eq!(ai.behavior, Behavior::Chaser { chase: false });

        let center = c.body.center();
        ai.update(&mut c, Some(center + Vec2::new(150.0, 0.0)), &mut rng, DT);
        assert_eq!(ai.behavior, Behavior::Chaser { chase: true });
    }

    #[test]
    fn test_chaser_jumps_when_blocked() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut c = grunt_at(0.0);
        let mut ai = AiSpec::Chaser {
            reach: 200.0,
            loss: 240.0,
        }
        .build(None, c.body.pos);
        c.blocked = true;
        let center = c.body.center();
        ai.update(&mut c, Some(center + Vec2::new(-100.0, 0.0)), &mut rng, DT);
        assert_eq!(c.body.direction, Direction::Left);
        assert_eq!(c.state(), PlayerState::Jumping);

        // Jump timer runs out without a release: the behaviour drops it
        c.update_status(1.0);
        ai.update(&mut c, Some(center + Vec2::new(-100.0, 0.0)), &mut rng, DT);
        assert_eq!(c.state(), PlayerState::Normal);
    }

    #[test]
    fn test_turret_activates_once_then_fires_on_timer() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut c = grunt_at(0.0);
        let mut ai = AiSpec::Turret {
            reach: 100.0,
            fire_interval: 0.5,
        }
        .build(None, c.body.pos);
        let far = c.body.center() + Vec2::new(-500.0, 0.0);
        for _ in 0..60 {
            ai.update(&mut c, Some(far), &mut rng, DT);
        }
        assert!(c.shots.is_empty());

        let near = c.body.center() + Vec2::new(-50.0, 0.0);
        ai.update(&mut c, Some(near), &mut rng, DT);
        assert_eq!(ai.behavior, Behavior::Turret { active: true });

        // Target retreats; turret stays active
        for _ in 0..90 {
            ai.update(&mut c, Some(far), &mut rng, DT);
        }
        assert!(ai.core.reached);
        assert!(c.shots.len() >= 2);
        assert!(c.shots.iter().all(|s| s.direction == Direction::Left));
    }

    #[test]
    fn test_pouncer_slams_on_landing() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut c = grunt_at(0.0);
        let mut ai = AiSpec::Pouncer {
            reach: 120.0,
            reach_y: None,
        }
        .build(None, c.body.pos);
        let near = c.body.center() + Vec2::new(80.0, 0.0);
        ai.update(&mut c, Some(near), &mut rng, DT);
        assert_eq!(c.state(), PlayerState::Jumping);

        ai.on_state_change(&mut c, MotionState::InAir, MotionState::OnGround);
        assert_eq!(c.shots.len(), 1);
        assert_eq!(c.shots[0].weapon, Weapon::Explosion);

        // Only once
        ai.on_state_change(&mut c, MotionState::InAir, MotionState::OnGround);
        assert_eq!(c.shots.len(), 1);
    }

    #[test]
    fn test_wanderer_is_deterministic_for_a_seed() {
        let run = |seed: u64| {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut c = grunt_at(0.0);
            let mut ai = AiSpec::Wanderer { turn_interval: 0.25 }.build(None, c.body.pos);
            let mut facings = Vec::new();
            for _ in 0..120 {
                ai.update(&mut c, None, &mut rng, DT);
                facings.push(c.body.direction);
            }
            facings
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_ember_expires_below_spawn() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut c = grunt_at(0.0);
        c.body.ignore_gravity = true;
        let spawn = c.body.pos;
        let mut ai = AiSpec::Ember { reach_x: 40.0 }.build(None, spawn);
        let above = c.body.center() + Vec2::new(10.0, -200.0);
        ai.update(&mut c, Some(above), &mut rng, DT);
        assert_eq!(c.body.vel.y, EMBER_LEAP_VELOCITY);
        assert!(!c.body.ignore_gravity);

        c.body.vel.y = 50.0;
        c.body.pos.y = spawn.y + 1.0;
        ai.update(&mut c, Some(above), &mut rng, DT);
        assert!(c.expired);
    }

    #[test]
    fn test_orbiter_holds_radius() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut c = grunt_at(0.0);
        c.move_vel = 10_000.0;
        let mut ai = AiSpec::Orbiter {
            reach: 300.0,
            loss: 400.0,
            radius: 64.0,
            angular_speed: 2.0,
        }
        .build(None, c.body.pos);
        let target = c.body.center() + Vec2::new(100.0, 0.0);
        ai.update(&mut c, Some(target), &mut rng, DT);
        let next = c.body.center() + c.body.vel * DT;
        assert!(((next - target).length() - 64.0).abs() < 0.01);
    }

    proptest! {
        #[test]
        fn prop_reach_loss_hysteresis(
            reach in 10.0f32..300.0,
            band in 0.0f32..200.0,
            dists in proptest::collection::vec(0.0f32..700.0, 1..80),
        ) {
            let mut core = AiCore::new(None, reach, reach + band);
            let mut inside = false;
            for d in dists {
                let event = core.check_distance(Vec2::new(d, 0.0));
                match event {
                    Some(DistanceEvent::Reached) => {
                        prop_assert!(d < reach);
                        prop_assert!(!inside);
                        inside = true;
                    }
                    Some(DistanceEvent::Lost) => {
                        prop_assert!(d > reach + band);
                        prop_assert!(inside);
                        inside = false;
                    }
                    None => {
                        // Between the thresholds nothing flips
                        if d < reach { prop_assert!(inside); }
                        if d > reach + band { prop_assert!(!inside); }
                    }
                }
                prop_assert_eq!(core.reached, inside);
            }
        }
    }
}
