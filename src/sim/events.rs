//! Outbound notifications
//!
//! The simulation never calls into audio, rendering or level flow directly.
//! It queues these and the host drains them after each tick. None of them
//! expect an answer.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Named sound triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    Hit,
    Death,
    Jump,
    Shoot,
    Charged,
    Explosion,
    Thunder,
    Melt,
    DoorOpen,
    DoorClose,
    Pickup,
    Crush,
}

/// Visual one-shots the presentation layer spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Explosion,
    Spark,
    Steam,
    LightningFlash,
}

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    Died,
    TimeUp,
    Won,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Sound(SoundEffect),
    Effect { kind: EffectKind, pos: Vec2 },
    /// Player touched an exit block
    ExitLevel,
    GameOver(GameOverReason),
}
