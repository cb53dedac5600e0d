//! Creatures: health, status timers, weapons and the owned player state
//!
//! A creature owns exactly one [`PlayerState`] and at most one [`Ai`]. State
//! replacement always runs the old state's exit before the new state's enter.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ai::Ai;
use super::entity::{Body, Direction, EntityId, Status};
use super::events::{GameEvent, SoundEffect};
use super::player_state::{Bind, InputPhase, PlayerState};
use crate::consts::*;

/// Physical motion classification, written by physics and by state enter/exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    OnGround,
    #[default]
    InAir,
    Jumping,
    Hanging,
    OnLadder,
    Sliding,
}

/// Sides a creature was pushed from this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushedFrom {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl PushedFrom {
    /// Squeezed from opposite sides
    pub fn crushed(&self) -> bool {
        (self.top && self.bottom) || (self.left && self.right)
    }
}

/// Immunity against one piercing projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub bullet: EntityId,
    pub remaining: f32,
}

/// Projectile kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weapon {
    Pistol,
    Fireball,
    /// Charged fireball
    Rocket,
    Grenade,
    Lightning,
    /// Enemy shot
    Spit,
    /// Grenade blast
    Explosion,
}

impl Weapon {
    /// Weapons a player can own, in cycling order
    pub const PLAYER_WEAPONS: [Weapon; 4] = [
        Weapon::Pistol,
        Weapon::Fireball,
        Weapon::Grenade,
        Weapon::Lightning,
    ];

    /// Index into the player's per-weapon tables
    pub fn slot(self) -> Option<usize> {
        Self::PLAYER_WEAPONS.iter().position(|&w| w == self)
    }

    pub fn damage(self) -> i32 {
        match self {
            Weapon::Pistol => 10,
            Weapon::Fireball => 20,
            Weapon::Rocket => 60,
            Weapon::Grenade => 15,
            Weapon::Lightning => LIGHTNING_DAMAGE,
            Weapon::Spit => 10,
            Weapon::Explosion => 40,
        }
    }

    /// Launch speed in px/s
    pub fn speed(self) -> f32 {
        match self {
            Weapon::Pistol => 520.0,
            Weapon::Fireball => 360.0,
            Weapon::Rocket => 480.0,
            Weapon::Grenade => 260.0,
            Weapon::Spit => 240.0,
            Weapon::Lightning | Weapon::Explosion => 0.0,
        }
    }

    /// Seconds alive
    pub fn lifetime(self) -> f32 {
        match self {
            Weapon::Pistol => 0.8,
            Weapon::Fireball => 1.2,
            Weapon::Rocket => 1.5,
            Weapon::Grenade => 1.6,
            Weapon::Lightning => 0.3,
            Weapon::Spit => 2.0,
            Weapon::Explosion => 0.25,
        }
    }

    pub fn piercing(self) -> bool {
        matches!(self, Weapon::Rocket | Weapon::Explosion)
    }

    /// Hitbox edge length
    pub fn size(self) -> Vec2 {
        match self {
            Weapon::Pistol | Weapon::Spit => Vec2::new(8.0, 6.0),
            Weapon::Fireball | Weapon::Grenade => Vec2::new(12.0, 12.0),
            Weapon::Rocket => Vec2::new(20.0, 14.0),
            Weapon::Lightning => Vec2::new(6.0 * TILE_SIZE, 12.0),
            Weapon::Explosion => Vec2::new(3.0 * TILE_SIZE, 3.0 * TILE_SIZE),
        }
    }

    /// Burns for the timer and melts ice
    pub fn is_fire(self) -> bool {
        matches!(self, Weapon::Fireball | Weapon::Rocket)
    }
}

/// Player-only weapon bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerKit {
    pub owned: [bool; 4],
    /// Rounds available. Pistol rounds come back when the bullet is gone.
    pub ammo: [i32; 4],
    pub fire_delay: [f32; 4],
    /// Charge coloring
    pub charged: bool,
}

impl Default for PlayerKit {
    fn default() -> Self {
        Self {
            owned: [true, false, false, false],
            ammo: [3, 0, 0, 0],
            fire_delay: [0.25, 0.4, 0.6, 0.8],
            charged: false,
        }
    }
}

/// A queued projectile launch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub weapon: Weapon,
    pub origin: Vec2,
    pub direction: Direction,
}

/// Tuning and identity a creature is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureTuning {
    pub health: i32,
    pub size: Vec2,
    pub move_vel: f32,
    pub term_vel: f32,
    #[serde(default = "default_climb_vel")]
    pub climb_vel: f32,
    #[serde(default)]
    pub contact_damage: i32,
    #[serde(default = "default_gravity_multiplier")]
    pub gravity_multiplier: f32,
    #[serde(default)]
    pub ignore_gravity: bool,
    #[serde(default)]
    pub ignore_world: bool,
}

fn default_climb_vel() -> f32 {
    120.0
}

fn default_gravity_multiplier() -> f32 {
    1.0
}

impl CreatureTuning {
    pub fn player() -> Self {
        Self {
            health: 100,
            size: Vec2::new(20.0, 44.0),
            move_vel: 220.0,
            term_vel: 600.0,
            climb_vel: 120.0,
            contact_damage: 0,
            gravity_multiplier: 1.0,
            ignore_gravity: false,
            ignore_world: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Creature {
    pub name: String,
    pub body: Body,
    pub health: i32,
    pub max_health: i32,
    pub move_vel: f32,
    pub term_vel: f32,
    pub climb_vel: f32,
    pub contact_damage: i32,
    pub jump_timer: f32,
    /// Shot lock
    pub shot_timer: f32,
    /// Seconds charged so far
    pub charge_timer: f32,
    pub charging: bool,
    pub motion: MotionState,
    state: PlayerState,
    pub ai: Option<Ai>,
    pub hit_from: Vec<HitRecord>,
    /// Machinery being ridden (weak)
    pub attached: Option<EntityId>,
    pub attach_offset: Vec2,
    pub weapon: Weapon,
    pub pushed_from: PushedFrom,
    pub player: Option<PlayerKit>,
    /// Hitbox size when standing
    pub normal_size: Vec2,

    pub near_ladder: bool,
    pub on_ladder: bool,
    pub in_water: bool,
    pub in_rain: bool,
    pub on_ice: bool,
    pub ceiling_overhead: bool,
    /// Dropped off a hook on purpose; no re-grab until clear of hooks
    pub lefthook: bool,
    /// Walked into a wall this tick
    pub blocked: bool,
    /// Asked to be removed (AI traps)
    pub expired: bool,

    pub(crate) shots: Vec<Shot>,
    pub(crate) events: Vec<GameEvent>,
}

impl Creature {
    pub fn new(name: impl Into<String>, pos: Vec2, tuning: &CreatureTuning) -> Self {
        let mut body = Body::new(pos, tuning.size);
        body.gravity_multiplier = tuning.gravity_multiplier;
        body.ignore_gravity = tuning.ignore_gravity;
        body.ignore_world = tuning.ignore_world;
        Self {
            name: name.into(),
            body,
            health: tuning.health,
            max_health: tuning.health,
            move_vel: tuning.move_vel,
            term_vel: tuning.term_vel,
            climb_vel: tuning.climb_vel,
            contact_damage: tuning.contact_damage,
            jump_timer: 0.0,
            shot_timer: 0.0,
            charge_timer: 0.0,
            charging: false,
            motion: MotionState::InAir,
            state: PlayerState::Normal,
            ai: None,
            hit_from: Vec::new(),
            attached: None,
            attach_offset: Vec2::ZERO,
            weapon: Weapon::Pistol,
            pushed_from: PushedFrom::default(),
            player: None,
            normal_size: tuning.size,
            near_ladder: false,
            on_ladder: false,
            in_water: false,
            in_rain: false,
            on_ice: false,
            ceiling_overhead: false,
            lefthook: false,
            blocked: false,
            expired: false,
            shots: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn new_player(pos: Vec2) -> Self {
        let mut c = Self::new("player", pos, &CreatureTuning::player());
        c.player = Some(PlayerKit::default());
        c
    }

    pub fn is_player(&self) -> bool {
        self.player.is_some()
    }

    pub fn is_ai(&self) -> bool {
        self.ai.is_some()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_dying(&self) -> bool {
        self.body.is_dying()
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn sound(&mut self, effect: SoundEffect) {
        self.events.push(GameEvent::Sound(effect));
    }

    /// Guarded motion change. Jumping is only reachable from the ground or a hook.
    pub fn set_motion(&mut self, next: MotionState) -> bool {
        self.change_motion(next, false)
    }

    /// Motion change made by a state's enter/exit. Jumping may also start in
    /// the air here, since the state slot already accepted the jump.
    pub(crate) fn change_motion(&mut self, next: MotionState, from_state: bool) -> bool {
        if next == self.motion {
            return true;
        }
        let jump_ok = match self.motion {
            MotionState::OnGround | MotionState::Hanging => true,
            MotionState::InAir => from_state,
            _ => false,
        };
        if next == MotionState::Jumping && !jump_ok {
            log::debug!("{}: rejected jumping motion from {:?}", self.name, self.motion);
            return false;
        }
        self.motion = next;
        true
    }

    /// Replace the owned state.
    ///
    /// Returns false when the request was discarded: same state, or Jumping
    /// while neither grounded, hanging nor airborne.
    pub fn set_state(&mut self, next: PlayerState) -> bool {
        if next == self.state {
            return false;
        }
        if next == PlayerState::Jumping
            && !matches!(
                self.motion,
                MotionState::OnGround | MotionState::Hanging | MotionState::InAir
            )
        {
            log::debug!("{}: rejected jump from {:?}", self.name, self.motion);
            return false;
        }
        let old = self.state;
        old.exit(self);
        self.state = next;
        next.enter(self);
        log::debug!("{}: {:?} -> {:?}", self.name, old, next);
        true
    }

    /// Route one bind event through the current state, then the weapon handler
    pub fn handle_input(&mut self, bind: Bind, phase: InputPhase) {
        if self.is_dying() {
            return;
        }
        let current = self.state;
        if let Some(next) = current.handle_input(self, bind, phase) {
            self.set_state(next);
        }
        self.handle_weapon_input(bind, phase);
    }

    /// Per-tick hook for states that act without fresh input
    pub fn handle_idle(&mut self) {
        if self.is_dying() {
            return;
        }
        let current = self.state;
        if let Some(next) = current.handle_idle(self) {
            self.set_state(next);
        }
    }

    /// Apply horizontal walking intent
    pub fn walk(&mut self, direction: Direction, phase: InputPhase) {
        match phase {
            InputPhase::Press | InputPhase::Hold => {
                self.body.direction = direction;
                if self.body.status != Status::Stun {
                    self.body.acc.x = direction.sign() * WALK_ACCEL;
                }
            }
            InputPhase::Unpress => {
                if self.body.acc.x * direction.sign() > 0.0 {
                    self.body.acc.x = 0.0;
                }
            }
        }
    }

    /// On ice, grounded, and moving faster than `threshold` the way we face
    pub fn can_slide(&self, threshold: f32) -> bool {
        self.on_ice
            && self.motion == MotionState::OnGround
            && self.body.vel.x.abs() > threshold
            && Direction::from_dx(self.body.vel.x) == Some(self.body.direction)
    }

    /// Subtract health unless dying, invulnerable or stunned.
    ///
    /// Returns true when the damage landed.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if matches!(
            self.body.status,
            Status::Dying | Status::Invuln | Status::Stun
        ) {
            return false;
        }
        self.health -= amount;
        self.body.status = Status::Stun;
        self.body.status_timer = STUN_DURATION;
        if self.health <= 0 {
            self.die();
        } else {
            self.sound(SoundEffect::Hit);
        }
        true
    }

    /// Damage plus knockback away from `source_x`
    pub fn hurt(&mut self, amount: i32, source_x: f32) -> bool {
        if !self.take_damage(amount) {
            return false;
        }
        if !self.is_dying() {
            self.knock_back(source_x);
        }
        true
    }

    /// Fixed impulse away from the source
    pub fn knock_back(&mut self, source_x: f32) {
        let away = if self.body.center().x < source_x {
            -1.0
        } else {
            1.0
        };
        if matches!(self.state, PlayerState::Hanging | PlayerState::OnLadder) {
            self.set_state(PlayerState::Normal);
        }
        self.attached = None;
        self.body.vel.x = away * KNOCKBACK_X;
        self.body.vel.y = KNOCKBACK_Y;
        self.body.acc.x = 0.0;
        self.set_motion(MotionState::InAir);
    }

    /// Start the death fall. Players are never removed by the simulation.
    pub fn die(&mut self) {
        if self.state != PlayerState::Normal {
            let old = self.state;
            old.exit(self);
            self.state = PlayerState::Normal;
        }
        self.health = self.health.min(0);
        self.body.status = Status::Dying;
        self.body.status_timer = 0.0;
        self.set_motion(MotionState::InAir);
        self.body.ignore_world = true;
        self.term_vel = DEATH_TERM_VEL;
        self.body.vel = Vec2::new(0.0, DEATH_ESCAPE_VEL);
        self.body.acc = Vec2::ZERO;
        self.attached = None;
        self.charging = false;
        self.jump_timer = 0.0;
        self.sound(SoundEffect::Death);
        log::debug!("{} died", self.name);
    }

    /// Count down status, jump, shot and immunity timers
    pub fn update_status(&mut self, dt: f32) {
        match self.body.status {
            Status::Stun => {
                self.body.status_timer -= dt;
                if self.body.status_timer <= 0.0 {
                    self.body.status = Status::Invuln;
                    self.body.status_timer = INVULN_DURATION;
                }
            }
            Status::Invuln => {
                self.body.status_timer -= dt;
                if self.body.status_timer <= 0.0 {
                    self.body.status = Status::Normal;
                    self.body.status_timer = 0.0;
                }
            }
            Status::Normal | Status::Dying => {}
        }

        self.jump_timer = (self.jump_timer - dt).max(0.0);
        self.shot_timer = (self.shot_timer - dt).max(0.0);

        if self.charging && self.charge_timer < CHARGE_DURATION {
            self.charge_timer = (self.charge_timer + dt).min(CHARGE_DURATION);
            if self.charge_timer >= CHARGE_DURATION {
                if let Some(kit) = self.player.as_mut() {
                    kit.charged = true;
                }
                self.sound(SoundEffect::Charged);
            }
        }

        for record in &mut self.hit_from {
            record.remaining -= dt;
        }
        self.hit_from.retain(|r| r.remaining > 0.0);
    }

    /// Record a piercing hit. Returns false if already immune to that bullet.
    pub fn note_pierced(&mut self, bullet: EntityId, lifetime: f32) -> bool {
        if self.hit_from.iter().any(|r| r.bullet == bullet) {
            return false;
        }
        self.hit_from.push(HitRecord {
            bullet,
            remaining: lifetime,
        });
        true
    }

    /// Queue a shot from the front of the hitbox
    pub fn queue_shot(&mut self, weapon: Weapon) {
        let hb = self.body.hitbox();
        let front = match self.body.direction {
            Direction::Right => hb.right(),
            Direction::Left => hb.left(),
        };
        self.shots.push(Shot {
            weapon,
            origin: Vec2::new(front, hb.center().y),
            direction: self.body.direction,
        });
    }

    /// Take pending shots
    pub fn drain_shots(&mut self) -> Vec<Shot> {
        std::mem::take(&mut self.shots)
    }

    /// Consume one round of `weapon`; creatures without a kit fire freely
    fn use_ammo(&mut self, weapon: Weapon) -> bool {
        let Some(kit) = self.player.as_mut() else {
            return true;
        };
        let Some(slot) = weapon.slot() else {
            return true;
        };
        // Fireballs cost nothing
        if weapon == Weapon::Fireball {
            return true;
        }
        if kit.ammo[slot] <= 0 {
            return false;
        }
        kit.ammo[slot] -= 1;
        true
    }

    /// Give a round back (pistol bullet gone, lightning refused)
    pub fn refund_ammo(&mut self, weapon: Weapon) {
        if let (Some(kit), Some(slot)) = (self.player.as_mut(), weapon.slot()) {
            kit.ammo[slot] += 1;
        }
    }

    fn fire_delay(&self, weapon: Weapon) -> f32 {
        match (&self.player, weapon.slot()) {
            (Some(kit), Some(slot)) => kit.fire_delay[slot],
            _ => 0.5,
        }
    }

    fn fire(&mut self, weapon: Weapon) {
        if self.shot_timer > 0.0 || !self.use_ammo(weapon) {
            return;
        }
        self.shot_timer = self.fire_delay(weapon);
        self.queue_shot(weapon);
        self.sound(SoundEffect::Shoot);
    }

    fn cycle_weapon(&mut self, step: isize) {
        let Some(kit) = &self.player else { return };
        let Some(start) = self.weapon.slot() else {
            return;
        };
        let n = Weapon::PLAYER_WEAPONS.len() as isize;
        for i in 1..n {
            let slot = (start as isize + step * i).rem_euclid(n) as usize;
            if kit.owned[slot] {
                self.weapon = Weapon::PLAYER_WEAPONS[slot];
                self.charging = false;
                self.charge_timer = 0.0;
                return;
            }
        }
    }

    /// Weapon handling shared by every state
    fn handle_weapon_input(&mut self, bind: Bind, phase: InputPhase) {
        match (bind, phase) {
            (Bind::NextWeapon, InputPhase::Press) => self.cycle_weapon(1),
            (Bind::PrevWeapon, InputPhase::Press) => self.cycle_weapon(-1),
            (Bind::Fire, InputPhase::Press) => match self.weapon {
                Weapon::Fireball => {
                    self.charging = true;
                    self.charge_timer = 0.0;
                }
                weapon => self.fire(weapon),
            },
            (Bind::Fire, InputPhase::Hold) => {
                if self.weapon == Weapon::Pistol {
                    self.fire(Weapon::Pistol);
                }
            }
            (Bind::Fire, InputPhase::Unpress) => {
                if self.weapon == Weapon::Fireball && self.charging {
                    self.release_charge();
                }
            }
            _ => {}
        }
    }

    /// Fire on release: a rocket when fully charged (never in rain), a plain
    /// fireball before that
    fn release_charge(&mut self) {
        let full = self.charge_timer >= CHARGE_DURATION;
        self.charging = false;
        self.charge_timer = 0.0;
        if let Some(kit) = self.player.as_mut() {
            kit.charged = false;
        }
        if full {
            if self.in_rain {
                log::debug!("{}: charged shot fizzled in rain", self.name);
                return;
            }
            self.shot_timer = 0.0;
            self.fire(Weapon::Rocket);
        } else {
            self.fire(Weapon::Fireball);
        }
    }
}
