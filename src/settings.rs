//! Game settings and preferences
//!
//! Persisted as JSON next to the game, separate from level data.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{BASE_REFRESH_RATE, DEFAULT_SEED};
use crate::error::ConfigError;
use crate::sim::Bind;

/// Key names bound to each abstract bind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(BTreeMap<Bind, Vec<String>>);

fn key_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self(BTreeMap::from([
            (Bind::Left, key_names(&["Left", "A"])),
            (Bind::Right, key_names(&["Right", "D"])),
            (Bind::Up, key_names(&["Up", "W"])),
            (Bind::Down, key_names(&["Down", "S"])),
            (Bind::Jump, key_names(&["Space"])),
            (Bind::Fire, key_names(&["LControl", "J"])),
            (Bind::NextWeapon, key_names(&["E"])),
            (Bind::PrevWeapon, key_names(&["Q"])),
            (Bind::Pause, key_names(&["Escape", "P"])),
        ]))
    }
}

impl KeyBindings {
    pub fn keys(&self, bind: Bind) -> &[String] {
        self.0.get(&bind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bind a key, removing it from any other bind first
    pub fn bind(&mut self, bind: Bind, key: impl Into<String>) {
        let key = key.into();
        for keys in self.0.values_mut() {
            keys.retain(|k| *k != key);
        }
        self.0.entry(bind).or_default().push(key);
    }

    pub fn clear(&mut self, bind: Bind) {
        self.0.remove(&bind);
    }

    /// Reverse lookup used by the input layer
    pub fn bind_for(&self, key: &str) -> Option<Bind> {
        self.0
            .iter()
            .find(|(_, keys)| keys.iter().any(|k| k == key))
            .map(|(bind, _)| *bind)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bindings: KeyBindings,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,

    /// Display refresh rate in Hz; drives the ticks multiplier
    pub refresh_rate: f32,
    /// Run seed; `None` uses the fixed default
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bindings: KeyBindings::default(),
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            refresh_rate: BASE_REFRESH_RATE,
            seed: None,
        }
    }
}

impl Settings {
    /// Seed to start a run with
    pub fn run_seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Ticks per frame at the configured refresh rate
    pub fn ticks_per_frame(&self) -> f32 {
        crate::ticks_for_refresh(self.refresh_rate)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Load, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }
}
