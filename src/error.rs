//! Error types
//!
//! None of these escape a simulation tick. Loaders and settings return them;
//! the game logs and falls back.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing settings and definition tables
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Structural problem in loader-provided level data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("layer {layer} has {found} cells, expected {expected}")]
    LayerSize {
        layer: usize,
        expected: usize,
        found: usize,
    },
    #[error("tile coordinate ({x}, {y}) outside {width}x{height} map")]
    TileOutOfRange {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    #[error("unknown path `{0}`")]
    UnknownPath(String),
    #[error("path `{0}` needs at least two points")]
    ShortPath(String),
}
