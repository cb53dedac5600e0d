//! Level description handed over by the loader, and the creature table
//!
//! Both are built once and only read by the simulation.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ai::AiSpec;
use super::creature::{Creature, CreatureTuning, Weapon};
use super::entity::{EntityId, Rect};
use super::machinery::{Machinery, PlatformMotion};
use super::tiles::{PhysicsType, Tile, TileMap};
use crate::error::{ConfigError, LevelError};

/// Ordered platform waypoints (top-left positions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDef {
    pub points: Vec<Vec2>,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDef {
    pub creature: String,
    /// Bottom-left of the sprite
    pub pos: Vec2,
}

fn default_min_speed() -> f32 {
    20.0
}

fn default_decel() -> f32 {
    240.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MachineDef {
    Door {
        rect: Rect,
        open_offset: f32,
        #[serde(default)]
        pair: Option<u32>,
    },
    Button {
        rect: Rect,
        #[serde(default)]
        pair: Option<u32>,
    },
    /// Travels a named path, or shuttles from `rect` to `to`
    Platform {
        rect: Rect,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        to: Option<Vec2>,
        speed: f32,
        #[serde(default = "default_decel")]
        decel: f32,
        #[serde(default = "default_min_speed")]
        min_speed: f32,
        /// Support from above only
        #[serde(default)]
        standable: bool,
        #[serde(default)]
        hookable: bool,
        #[serde(default)]
        destructable: bool,
    },
    Lava {
        rect: Rect,
        #[serde(default)]
        track_camera: bool,
        #[serde(default)]
        screen_offset: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PickupKind {
    Health { amount: i32 },
    Ammo { weapon: Weapon, amount: i32 },
    Weapon { weapon: Weapon },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupDef {
    #[serde(flatten)]
    pub kind: PickupKind,
    pub rect: Rect,
}

/// Everything the simulation needs from a level file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub name: String,
    pub width: i32,
    pub height: i32,
    /// Tile layers, bottom first, as rows of ASCII tile codes
    pub layers: Vec<Vec<String>>,
    pub player_start: Vec2,
    #[serde(default)]
    pub camera_bounds: Vec<Rect>,
    #[serde(default)]
    pub death_zones: Vec<Rect>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathDef>,
    #[serde(default)]
    pub spawns: Vec<SpawnDef>,
    #[serde(default)]
    pub machinery: Vec<MachineDef>,
    #[serde(default)]
    pub pickups: Vec<PickupDef>,
    /// Seconds before the run ends
    #[serde(default)]
    pub time_limit: Option<f32>,
    /// Exiting this level wins the game
    #[serde(default)]
    pub final_level: bool,
}

impl LevelData {
    /// Single-layer level from ASCII rows
    pub fn from_ascii(name: impl Into<String>, rows: &[&str], player_start: Vec2) -> Self {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        Self {
            name: name.into(),
            width,
            height: rows.len() as i32,
            layers: vec![rows.iter().map(|r| r.to_string()).collect()],
            player_start,
            camera_bounds: Vec::new(),
            death_zones: Vec::new(),
            paths: BTreeMap::new(),
            spawns: Vec::new(),
            machinery: Vec::new(),
            pickups: Vec::new(),
            time_limit: None,
            final_level: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get_path(&self, id: &str) -> Result<&PathDef, LevelError> {
        let path = self
            .paths
            .get(id)
            .ok_or_else(|| LevelError::UnknownPath(id.to_string()))?;
        if path.points.len() < 2 {
            return Err(LevelError::ShortPath(id.to_string()));
        }
        Ok(path)
    }

    /// Structural checks: layer dimensions and path references
    pub fn validate(&self) -> Result<(), LevelError> {
        let expected = (self.width.max(0) * self.height.max(0)) as usize;
        for (layer, rows) in self.layers.iter().enumerate() {
            let well_formed = rows.len() == self.height as usize
                && rows.iter().all(|r| r.chars().count() == self.width as usize);
            if !well_formed {
                return Err(LevelError::LayerSize {
                    layer,
                    expected,
                    found: rows.iter().map(|r| r.chars().count()).sum(),
                });
            }
        }
        for def in &self.machinery {
            if let MachineDef::Platform {
                path: Some(id), ..
            } = def
            {
                self.get_path(id)?;
            }
        }
        Ok(())
    }

    /// Build the tile map. Unknown tile codes are logged and left empty.
    pub fn build_map(&self) -> TileMap {
        let mut map = TileMap::new(self.width, self.height, self.layers.len());
        for (layer, rows) in self.layers.iter().enumerate() {
            for (y, row) in rows.iter().enumerate() {
                for (x, code) in row.chars().enumerate() {
                    let Some(kind) = PhysicsType::from_char(code) else {
                        log::warn!("{}: unknown tile code {code:?} at ({x}, {y})", self.name);
                        continue;
                    };
                    if kind == PhysicsType::Air {
                        continue;
                    }
                    if let Err(e) = map.insert(layer, x as i32, y as i32, Tile::new(kind)) {
                        log::warn!("{}: {e}", self.name);
                    }
                }
            }
        }
        map
    }

    /// Build one machinery record; `None` for a broken record
    pub fn build_machine(&self, def: &MachineDef) -> Option<Machinery> {
        match def {
            MachineDef::Door {
                rect,
                open_offset,
                pair,
            } => Some(Machinery::door(*rect, *open_offset, *pair)),
            MachineDef::Button { rect, pair } => Some(Machinery::button(*rect, *pair)),
            MachineDef::Platform {
                rect,
                path,
                to,
                speed,
                decel,
                min_speed,
                standable,
                hookable,
                destructable,
            } => {
                let start = Vec2::new(rect.x, rect.y);
                let motion = match (path, to) {
                    (Some(id), _) => match self.get_path(id) {
                        Ok(p) => PlatformMotion::route(
                            p.points.clone(),
                            p.closed,
                            *speed,
                            *decel,
                            *min_speed,
                        ),
                        Err(e) => {
                            log::warn!("{}: skipping platform: {e}", self.name);
                            return None;
                        }
                    },
                    (None, Some(end)) => {
                        PlatformMotion::shuttle(start, *end, *speed, *decel, *min_speed)
                    }
                    (None, None) => PlatformMotion::route(vec![start], false, 0.0, 0.0, 0.0),
                };
                let mut m = Machinery::platform(*rect, motion);
                m.solid = !*standable;
                m.standable = *standable;
                m.hookable = *hookable;
                m.destructable = *destructable;
                Some(m)
            }
            MachineDef::Lava {
                rect,
                track_camera,
                screen_offset,
            } => Some(Machinery::lava(*rect, *track_camera, *screen_offset)),
        }
    }
}

/// Tuning plus behaviour for one creature type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureDef {
    #[serde(flatten)]
    pub tuning: CreatureTuning,
    #[serde(default)]
    pub ai: Option<AiSpec>,
}

/// Creature definitions by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bestiary {
    defs: BTreeMap<String, CreatureDef>,
}

fn enemy(health: i32, size: Vec2, move_vel: f32, contact_damage: i32, ai: AiSpec) -> CreatureDef {
    CreatureDef {
        tuning: CreatureTuning {
            health,
            size,
            move_vel,
            term_vel: 600.0,
            climb_vel: 0.0,
            contact_damage,
            gravity_multiplier: 1.0,
            ignore_gravity: false,
            ignore_world: false,
        },
        ai: Some(ai),
    }
}

impl Bestiary {
    /// The stock enemy set, one per behaviour
    pub fn builtin() -> Self {
        let mut defs = BTreeMap::new();
        defs.insert(
            "grunt".to_string(),
            enemy(
                30,
                Vec2::new(24.0, 28.0),
                90.0,
                10,
                AiSpec::Chaser {
                    reach: 200.0,
                    loss: 240.0,
                },
            ),
        );
        defs.insert(
            "hopper".to_string(),
            enemy(
                30,
                Vec2::new(22.0, 24.0),
                110.0,
                10,
                AiSpec::JumpingChaser {
                    reach: 260.0,
                    loss: 300.0,
                    jump_min: 60.0,
                    jump_max: 120.0,
                },
            ),
        );
        defs.insert(
            "crawler".to_string(),
            enemy(
                20,
                Vec2::new(28.0, 16.0),
                60.0,
                10,
                AiSpec::Wanderer { turn_interval: 2.0 },
            ),
        );
        defs.insert(
            "brute".to_string(),
            enemy(
                80,
                Vec2::new(36.0, 40.0),
                160.0,
                20,
                AiSpec::Pouncer {
                    reach: 150.0,
                    reach_y: Some(64.0),
                },
            ),
        );
        let mut missile = enemy(
            10,
            Vec2::new(16.0, 12.0),
            200.0,
            15,
            AiSpec::Missile {
                steer_interval: 0.25,
                shoot_interval: 1.5,
            },
        );
        missile.tuning.ignore_gravity = true;
        defs.insert("missile".to_string(), missile);
        defs.insert(
            "lurker".to_string(),
            enemy(
                40,
                Vec2::new(24.0, 24.0),
                0.0,
                15,
                AiSpec::Lurker {
                    reach: 120.0,
                    loss: 180.0,
                    hop_interval: 1.2,
                },
            ),
        );
        let mut wisp = enemy(
            20,
            Vec2::new(18.0, 18.0),
            260.0,
            10,
            AiSpec::Orbiter {
                reach: 240.0,
                loss: 320.0,
                radius: 80.0,
                angular_speed: 2.5,
            },
        );
        wisp.tuning.ignore_gravity = true;
        wisp.tuning.ignore_world = true;
        defs.insert("wisp".to_string(), wisp);
        defs.insert(
            "charger".to_string(),
            enemy(
                50,
                Vec2::new(30.0, 30.0),
                240.0,
                20,
                AiSpec::Charger {
                    reach: 220.0,
                    loss: 300.0,
                    recover: 1.5,
                },
            ),
        );
        defs.insert(
            "turret".to_string(),
            enemy(
                60,
                Vec2::new(28.0, 28.0),
                0.0,
                0,
                AiSpec::Turret {
                    reach: 300.0,
                    fire_interval: 1.0,
                },
            ),
        );
        let mut ember = enemy(
            1000,
            Vec2::new(16.0, 16.0),
            0.0,
            25,
            AiSpec::Ember { reach_x: 48.0 },
        );
        ember.tuning.ignore_gravity = true;
        ember.tuning.ignore_world = true;
        defs.insert("ember".to_string(), ember);
        Self { defs }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, name: &str) -> Option<&CreatureDef> {
        self.defs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    /// Build a creature by type name. Unknown names are logged and yield `None`.
    pub fn spawn(&self, name: &str, pos: Vec2, target: Option<EntityId>) -> Option<Creature> {
        let Some(def) = self.defs.get(name) else {
            log::warn!("unknown creature type `{name}`; not spawned");
            return None;
        };
        let mut c = Creature::new(name, pos, &def.tuning);
        c.ai = def.ai.as_ref().map(|spec| spec.build(target, pos));
        Some(c)
    }
}
