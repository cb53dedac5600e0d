//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay free of rendering,
//! audio and platform dependencies:
//! - One step per frame, scaled by the ticks multiplier
//! - Seeded RNG only
//! - Stable iteration order (roster slot order)
//! - Outbound effects only through queued [`GameEvent`]s

pub mod ai;
pub mod bullet;
pub mod collision;
pub mod creature;
pub mod entity;
pub mod events;
pub mod level;
pub mod machinery;
pub mod physics;
pub mod player_state;
pub mod state;
pub mod tick;
pub mod tiles;

pub use ai::{Ai, AiSpec, Behavior};
pub use bullet::Bullet;
pub use creature::{Creature, CreatureTuning, MotionState, Weapon};
pub use entity::{Body, Direction, EntityId, Rect, Roster, Status};
pub use events::{EffectKind, GameEvent, GameOverReason, SoundEffect};
pub use level::{Bestiary, CreatureDef, LevelData, MachineDef, PathDef, PickupKind, SpawnDef};
pub use machinery::{MachineKind, Machinery, PlatformMotion};
pub use physics::{PhysicsEnv, PhysicsOutcome, apply_physics};
pub use player_state::{Bind, InputPhase, PlayerState};
pub use state::{EntityView, GamePhase, Pickup, ViewKind, World};
pub use tick::{BindEvent, TickInput, tick};
pub use tiles::{PhysicsType, Tile, TileMap};
