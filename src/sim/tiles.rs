//! Tile map: layered tiles plus the flattened physics-type grid
//!
//! Tiles live in one grid per layer. Collision never looks at layers; it reads
//! the parallel `types` grid, which always holds the type of the topmost
//! non-air tile at each cell.

use serde::{Deserialize, Serialize};

use crate::consts::TILE_SIZE;
use crate::error::LevelError;

/// Physics classification of one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PhysicsType {
    #[default]
    Air,
    Block,
    Hook,
    Ladder,
    LadderTop,
    Platform,
    ExitBlock,
    Rain,
    IceBlock,
    Ice,
    Water,
    WaterTop,
    HookPlatform,
    /// Returned for queries outside the map
    OutOfBounds,
}

impl PhysicsType {
    /// Blocks movement from every side
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            PhysicsType::Block | PhysicsType::IceBlock | PhysicsType::Ice | PhysicsType::ExitBlock
        )
    }

    /// Supports from above only
    pub fn is_one_way(self) -> bool {
        matches!(
            self,
            PhysicsType::Platform | PhysicsType::HookPlatform | PhysicsType::LadderTop
        )
    }

    pub fn is_hook(self) -> bool {
        matches!(self, PhysicsType::Hook | PhysicsType::HookPlatform)
    }

    pub fn is_ladder(self) -> bool {
        matches!(self, PhysicsType::Ladder | PhysicsType::LadderTop)
    }

    pub fn is_water(self) -> bool {
        matches!(self, PhysicsType::Water | PhysicsType::WaterTop)
    }

    pub fn is_ice(self) -> bool {
        matches!(self, PhysicsType::Ice | PhysicsType::IceBlock)
    }

    /// ASCII code used by [`TileMap::from_ascii`]
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '.' | ' ' => PhysicsType::Air,
            '#' => PhysicsType::Block,
            'H' => PhysicsType::Hook,
            '|' => PhysicsType::Ladder,
            '^' => PhysicsType::LadderTop,
            '-' => PhysicsType::Platform,
            'E' => PhysicsType::ExitBlock,
            'r' => PhysicsType::Rain,
            'I' => PhysicsType::IceBlock,
            '=' => PhysicsType::Ice,
            '~' => PhysicsType::Water,
            'w' => PhysicsType::WaterTop,
            'h' => PhysicsType::HookPlatform,
            _ => return None,
        })
    }
}

/// Animated texture sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileAnimation {
    pub frames: Vec<(u16, u16)>,
    /// Seconds per frame
    pub frame_time: f32,
}

/// One placed tile on one layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: PhysicsType,
    /// Texture offsets in the tile sheet
    #[serde(default)]
    pub texture: (u16, u16),
    #[serde(default)]
    pub animation: Option<TileAnimation>,
}

impl Tile {
    pub fn new(kind: PhysicsType) -> Self {
        Self {
            kind,
            texture: (0, 0),
            animation: None,
        }
    }

    /// Texture offsets to draw after `elapsed` seconds
    pub fn texture_at(&self, elapsed: f32) -> (u16, u16) {
        match &self.animation {
            Some(anim) if !anim.frames.is_empty() && anim.frame_time > 0.0 => {
                let index = (elapsed / anim.frame_time) as usize % anim.frames.len();
                anim.frames[index]
            }
            _ => self.texture,
        }
    }
}

/// Layered tile grid
#[derive(Debug, Clone)]
pub struct TileMap {
    width: i32,
    height: i32,
    layers: Vec<Vec<Option<Tile>>>,
    types: Vec<PhysicsType>,
}

impl TileMap {
    /// Empty map of `width` x `height` tiles with `layer_count` layers
    pub fn new(width: i32, height: i32, layer_count: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let cells = (width * height) as usize;
        Self {
            width,
            height,
            layers: vec![vec![None; cells]; layer_count.max(1)],
            types: vec![PhysicsType::Air; cells],
        }
    }

    /// Build a single-layer map from rows of ASCII tile codes.
    ///
    /// Unknown characters become air. Rows shorter than the widest row are
    /// padded with air.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(1) as i32;
        let mut map = Self::new(width, rows.len() as i32, 1);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let kind = PhysicsType::from_char(c).unwrap_or(PhysicsType::Air);
                if kind != PhysicsType::Air {
                    // Coordinates come from the row bounds, so this cannot fail
                    let _ = map.insert(0, x as i32, y as i32, Tile::new(kind));
                }
            }
        }
        map
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Level size in world pixels
    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * TILE_SIZE
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * TILE_SIZE
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            None
        } else {
            Some((y * self.width + x) as usize)
        }
    }

    /// Physics type at a tile coordinate, `OutOfBounds` outside the map
    pub fn type_at(&self, x: i32, y: i32) -> PhysicsType {
        match self.index(x, y) {
            Some(i) => self.types[i],
            None => PhysicsType::OutOfBounds,
        }
    }

    /// Physics type under a world-space point
    pub fn type_at_world(&self, wx: f32, wy: f32) -> PhysicsType {
        self.type_at(
            (wx / TILE_SIZE).floor() as i32,
            (wy / TILE_SIZE).floor() as i32,
        )
    }

    /// Convert a world X coordinate into a column index.
    ///
    /// Divides first, then clamps into `[0, width)`. In round-up mode a right
    /// edge flush with the map border clamps down one column.
    pub fn tile_x(&self, world_x: f32, round_up: bool) -> i32 {
        convert_to_tile_coord(world_x, round_up, self.width)
    }

    /// Convert a world Y coordinate into a row index
    pub fn tile_y(&self, world_y: f32, round_up: bool) -> i32 {
        convert_to_tile_coord(world_y, round_up, self.height)
    }

    /// Place a tile, replacing whatever was on that layer
    pub fn insert(&mut self, layer: usize, x: i32, y: i32, tile: Tile) -> Result<(), LevelError> {
        let i = self.index(x, y).ok_or(LevelError::TileOutOfRange {
            x,
            y,
            width: self.width,
            height: self.height,
        })?;
        if layer >= self.layers.len() {
            let cells = (self.width * self.height) as usize;
            self.layers.resize(layer + 1, vec![None; cells]);
        }
        self.layers[layer][i] = Some(tile);
        self.refresh_cell(i);
        Ok(())
    }

    /// Remove the tile on one layer
    pub fn remove(&mut self, layer: usize, x: i32, y: i32) -> Option<Tile> {
        let i = self.index(x, y)?;
        let removed = self.layers.get_mut(layer)?[i].take();
        if removed.is_some() {
            self.refresh_cell(i);
        }
        removed
    }

    /// Remove the topmost non-air tile at a cell
    pub fn remove_top(&mut self, x: i32, y: i32) -> Option<Tile> {
        let i = self.index(x, y)?;
        let layer = (0..self.layers.len())
            .rev()
            .find(|&l| matches!(&self.layers[l][i], Some(t) if t.kind != PhysicsType::Air))?;
        self.remove(layer, x, y)
    }

    fn refresh_cell(&mut self, i: usize) {
        self.types[i] = self
            .layers
            .iter()
            .rev()
            .filter_map(|layer| layer[i].as_ref())
            .map(|t| t.kind)
            .find(|&k| k != PhysicsType::Air)
            .unwrap_or(PhysicsType::Air);
    }
}

/// Floor or ceil divide by the tile size, then clamp to `[0, max)`
pub fn convert_to_tile_coord(world: f32, round_up: bool, max: i32) -> i32 {
    let t = world / TILE_SIZE;
    let v = if round_up { t.ceil() } else { t.floor() } as i32;
    v.clamp(0, (max - 1).max(0))
}
