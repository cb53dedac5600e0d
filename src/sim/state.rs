//! World state and render views
//!
//! Everything the tick mutates lives in [`World`]. Presentation reads it
//! through [`World::views`] and the drained event queue.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet::Bullet;
use super::creature::{Creature, MotionState, Weapon};
use super::entity::{Direction, EntityId, Rect, Roster, Status};
use super::events::{GameEvent, GameOverReason};
use super::level::{Bestiary, LevelData, PickupKind};
use super::machinery::Machinery;
use super::player_state::PlayerState;
use super::tiles::TileMap;
use crate::consts::DEFAULT_SEED;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    Playing,
    Paused,
    /// Player touched the exit; waiting for the next level
    LevelComplete,
    /// Run ended
    GameOver,
}

/// Collectible lying in the level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    pub kind: PickupKind,
    pub rect: Rect,
}

impl Pickup {
    /// Apply to the player. Returns false when it had no use.
    pub fn apply(&self, c: &mut Creature) -> bool {
        let Some(kit) = c.player.as_mut() else {
            return false;
        };
        match self.kind {
            PickupKind::Health { amount } => {
                if c.health >= c.max_health {
                    return false;
                }
                c.health = (c.health + amount).min(c.max_health);
            }
            PickupKind::Ammo { weapon, amount } => {
                let Some(slot) = weapon.slot() else {
                    return false;
                };
                kit.ammo[slot] += amount;
            }
            PickupKind::Weapon { weapon } => {
                let Some(slot) = weapon.slot() else {
                    return false;
                };
                kit.owned[slot] = true;
                if weapon != Weapon::Pistol {
                    kit.ammo[slot] = kit.ammo[slot].max(1);
                }
            }
        }
        true
    }
}

/// What a view describes
#[derive(Debug, Clone, PartialEq)]
pub enum ViewKind {
    Creature {
        name: String,
        motion: MotionState,
        state: PlayerState,
        player: bool,
    },
    Bullet(Weapon),
    Machinery,
    Pickup(PickupKind),
}

/// Read-only snapshot of one entity for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: ViewKind,
    /// Bottom-left of the sprite
    pub pos: Vec2,
    pub hitbox: Rect,
    pub facing: Direction,
    pub status: Status,
    /// Invulnerability blink: hidden on odd tenths of a second
    pub hidden: bool,
    pub moving_left: bool,
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    pub seed: u64,
    pub rng: Pcg32,
    pub map: TileMap,
    pub bestiary: Bestiary,
    pub creatures: Roster<Creature>,
    pub bullets: Roster<Bullet>,
    pub machinery: Roster<Machinery>,
    pub pickups: Roster<Pickup>,
    pub player: Option<EntityId>,
    pub level_name: String,
    pub camera_bounds: Vec<Rect>,
    pub death_zones: Vec<Rect>,
    pub final_level: bool,
    pub phase: GamePhase,
    /// Seconds left on the level clock
    pub time_left: Option<f32>,
    /// Simulated seconds since the level started
    pub elapsed: f32,
    /// View rectangle, updated every tick
    pub camera: Rect,
    pub game_over: Option<GameOverReason>,
    pub(crate) exited: bool,
    pub(crate) events: Vec<GameEvent>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl World {
    /// Empty world with the built-in creature table
    pub fn new(seed: u64) -> Self {
        Self::with_bestiary(seed, Bestiary::builtin())
    }

    pub fn with_bestiary(seed: u64, bestiary: Bestiary) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            map: TileMap::new(1, 1, 1),
            bestiary,
            creatures: Roster::new(),
            bullets: Roster::new(),
            machinery: Roster::new(),
            pickups: Roster::new(),
            player: None,
            level_name: String::new(),
            camera_bounds: Vec::new(),
            death_zones: Vec::new(),
            final_level: false,
            phase: GamePhase::Playing,
            time_left: None,
            elapsed: 0.0,
            camera: Rect::new(0.0, 0.0, 640.0, 480.0),
            game_over: None,
            exited: false,
            events: Vec::new(),
        }
    }

    /// Replace the current level. Bad records are logged and skipped.
    pub fn load_level(&mut self, level: &LevelData) {
        if let Err(e) = level.validate() {
            log::warn!("level {}: {e}; loading what can be read", level.name);
        }
        self.map = level.build_map();
        self.creatures = Roster::new();
        self.bullets = Roster::new();
        self.machinery = Roster::new();
        self.pickups = Roster::new();
        self.level_name = level.name.clone();
        self.camera_bounds = level.camera_bounds.clone();
        self.death_zones = level.death_zones.clone();
        self.final_level = level.final_level;
        self.time_left = level.time_limit;
        self.elapsed = 0.0;
        self.phase = GamePhase::Playing;
        self.game_over = None;
        self.exited = false;
        self.events.clear();

        let player = self.creatures.insert(Creature::new_player(level.player_start));
        self.player = Some(player);

        for def in &level.machinery {
            if let Some(m) = level.build_machine(def) {
                self.machinery.insert(m);
            }
        }
        for spawn in &level.spawns {
            self.spawn_creature(&spawn.creature, spawn.pos);
        }
        for def in &level.pickups {
            self.pickups.insert(Pickup {
                kind: def.kind,
                rect: def.rect,
            });
        }
        self.camera = self.camera_view(self.camera.w, self.camera.h);

        log::info!(
            "loaded level {} ({}x{} tiles, {} creatures, {} machines)",
            self.level_name,
            self.map.width(),
            self.map.height(),
            self.creatures.len(),
            self.machinery.len()
        );
    }

    /// Spawn a creature by type name, targeting the player
    pub fn spawn_creature(&mut self, name: &str, pos: Vec2) -> Option<EntityId> {
        let c = self.bestiary.spawn(name, pos, self.player)?;
        let id = self.creatures.insert(c);
        log::debug!("spawned {name} at {pos}");
        Some(id)
    }

    pub fn player(&self) -> Option<&Creature> {
        self.player.and_then(|id| self.creatures.get(id))
    }

    pub fn player_mut(&mut self) -> Option<&mut Creature> {
        self.player.and_then(|id| self.creatures.get_mut(id))
    }

    /// Drain queued outbound events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Signal game over once
    pub(crate) fn end_game(&mut self, reason: GameOverReason) {
        if self.game_over.is_some() {
            return;
        }
        log::info!("game over: {reason:?}");
        self.game_over = Some(reason);
        self.phase = GamePhase::GameOver;
        self.events.push(GameEvent::GameOver(reason));
    }

    /// A `w` x `h` view centred on the player, clamped into its camera bounds
    pub fn camera_view(&self, w: f32, h: f32) -> Rect {
        let focus = self
            .player()
            .map(|p| p.body.center())
            .unwrap_or(Vec2::new(self.camera.x + w / 2.0, self.camera.y + h / 2.0));
        let bounds = self
            .camera_bounds
            .iter()
            .copied()
            .find(|r| r.contains(focus))
            .unwrap_or(Rect::new(
                0.0,
                0.0,
                self.map.pixel_width(),
                self.map.pixel_height(),
            ));
        let clamp = |v: f32, lo: f32, span: f32, size: f32| {
            if span <= size {
                lo + (span - size) / 2.0
            } else {
                v.clamp(lo, lo + span - size)
            }
        };
        Rect::new(
            clamp(focus.x - w / 2.0, bounds.x, bounds.w, w),
            clamp(focus.y - h / 2.0, bounds.y, bounds.h, h),
            w,
            h,
        )
    }

    /// Render snapshots of every live entity: machinery, pickups, creatures,
    /// then bullets
    pub fn views(&self) -> Vec<EntityView> {
        let mut views = Vec::new();
        for (id, m) in self.machinery.iter() {
            if !m.enabled {
                continue;
            }
            views.push(EntityView {
                id,
                kind: ViewKind::Machinery,
                pos: m.body.pos,
                hitbox: m.rect(),
                facing: m.body.direction,
                status: m.body.status,
                hidden: false,
                moving_left: m.body.vel.x < 0.0,
            });
        }
        for (id, p) in self.pickups.iter() {
            views.push(EntityView {
                id,
                kind: ViewKind::Pickup(p.kind),
                pos: Vec2::new(p.rect.x, p.rect.bottom()),
                hitbox: p.rect,
                facing: Direction::Right,
                status: Status::Normal,
                hidden: false,
                moving_left: false,
            });
        }
        for (id, c) in self.creatures.iter() {
            let blink = c.body.status == Status::Invuln
                && (c.body.status_timer * 10.0) as i32 % 2 == 1;
            views.push(EntityView {
                id,
                kind: ViewKind::Creature {
                    name: c.name.clone(),
                    motion: c.motion,
                    state: c.state(),
                    player: c.is_player(),
                },
                pos: c.body.pos,
                hitbox: c.body.hitbox(),
                facing: c.body.direction,
                status: c.body.status,
                hidden: blink,
                moving_left: c.body.vel.x < 0.0,
            });
        }
        for (id, b) in self.bullets.iter() {
            views.push(EntityView {
                id,
                kind: ViewKind::Bullet(b.weapon),
                pos: b.body.pos,
                hitbox: b.rect(),
                facing: b.body.direction,
                status: b.body.status,
                hidden: false,
                moving_left: b.body.vel.x < 0.0,
            });
        }
        views
    }
}
