//! Tile probing and rectangle separation
//!
//! Shared by creature, bullet and machinery physics. Tile spans are computed
//! with [`TileMap::tile_x`]/[`TileMap::tile_y`], floor for the leading index
//! and round-up for the exclusive end, so a hitbox flush with the right or
//! bottom map border loses its last column or row.

use std::ops::Range;

use glam::Vec2;

use super::entity::Rect;
use super::tiles::{PhysicsType, TileMap};
use crate::consts::TILE_SIZE;

/// Columns a horizontal span covers
pub fn columns(map: &TileMap, rect: &Rect) -> Range<i32> {
    map.tile_x(rect.left(), false)..map.tile_x(rect.right(), true)
}

/// Rows a vertical span covers
pub fn rows(map: &TileMap, rect: &Rect) -> Range<i32> {
    map.tile_y(rect.top(), false)..map.tile_y(rect.bottom(), true)
}

/// First column in `cols` whose tile at `row` satisfies `pred`
pub fn find_in_row(
    map: &TileMap,
    cols: Range<i32>,
    row: i32,
    pred: impl Fn(PhysicsType) -> bool,
) -> Option<i32> {
    cols.into_iter().find(|&x| pred(map.type_at(x, row)))
}

/// First row in `rows` whose tile at `col` satisfies `pred`
pub fn find_in_column(
    map: &TileMap,
    col: i32,
    rows: Range<i32>,
    pred: impl Fn(PhysicsType) -> bool,
) -> Option<i32> {
    rows.into_iter().find(|&y| pred(map.type_at(col, y)))
}

/// Every tile the rectangle covers
pub fn covered_tiles(map: &TileMap, rect: &Rect) -> impl Iterator<Item = (i32, i32, PhysicsType)> {
    let cols = columns(map, rect);
    rows(map, rect).flat_map(move |y| cols.clone().map(move |x| (x, y, map.type_at(x, y))))
}

/// Any covered tile satisfies `pred`
pub fn any_covered(map: &TileMap, rect: &Rect, pred: impl Fn(PhysicsType) -> bool) -> bool {
    covered_tiles(map, rect).any(|(_, _, t)| pred(t))
}

/// World-space top edge of a row
#[inline]
pub fn row_top(row: i32) -> f32 {
    row as f32 * TILE_SIZE
}

/// World-space left edge of a column
#[inline]
pub fn column_left(col: i32) -> f32 {
    col as f32 * TILE_SIZE
}

/// Primary axis along which two overlapping rectangles should separate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparationAxis {
    Horizontal,
    Vertical,
}

/// Result of a rectangle overlap check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    pub hit: bool,
    pub axis: SeparationAxis,
    /// Offset from the obstacle centre to the mover centre
    pub offset: Vec2,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            axis: SeparationAxis::Vertical,
            offset: Vec2::ZERO,
        }
    }
}

/// Compare centre offsets, scaled by the combined half extents, to choose
/// the separation axis
pub fn rect_collision(mover: &Rect, obstacle: &Rect) -> CollisionResult {
    if !mover.overlaps(obstacle) {
        return CollisionResult::miss();
    }
    let offset = mover.center() - obstacle.center();
    let half_w = (mover.w + obstacle.w) / 2.0;
    let half_h = (mover.h + obstacle.h) / 2.0;
    let nx = if half_w > 0.0 { offset.x.abs() / half_w } else { 0.0 };
    let ny = if half_h > 0.0 { offset.y.abs() / half_h } else { 0.0 };
    let axis = if nx > ny {
        SeparationAxis::Horizontal
    } else {
        SeparationAxis::Vertical
    };
    CollisionResult {
        hit: true,
        axis,
        offset,
    }
}
