//! Shared entity data: geometry, bodies and per-category rosters

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict overlap; touching edges do not count
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Horizontal spans overlap
    pub fn overlaps_x(&self, other: &Rect) -> bool {
        self.left() < other.right() && self.right() > other.left()
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    pub fn translated(&self, d: Vec2) -> Rect {
        Rect::new(self.x + d.x, self.y + d.y, self.w, self.h)
    }
}

/// Facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Left,
    #[default]
    Right,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Direction pointing along `dx`; `None` for zero
    pub fn from_dx(dx: f32) -> Option<Self> {
        if dx > 0.0 {
            Some(Direction::Right)
        } else if dx < 0.0 {
            Some(Direction::Left)
        } else {
            None
        }
    }
}

/// Damage status; `Dying` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Normal,
    Invuln,
    Stun,
    Dying,
}

/// Position, motion and hitbox shared by every simulated thing.
///
/// `pos.y` is the bottom of the sprite. The hitbox is `size` wide/tall,
/// shifted right by `hitbox_offset.x` and up by `hitbox_offset.y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Acceleration accumulator. X persists (push intent), Y is consumed each tick.
    pub acc: Vec2,
    pub direction: Direction,
    pub status: Status,
    pub status_timer: f32,
    pub size: Vec2,
    pub hitbox_offset: Vec2,
    /// Draw offset, presentation only
    pub sprite_offset: Vec2,
    pub ignore_world: bool,
    pub ignore_gravity: bool,
    pub gravity_multiplier: f32,
}

impl Body {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            acc: Vec2::ZERO,
            direction: Direction::Right,
            status: Status::Normal,
            status_timer: 0.0,
            size,
            hitbox_offset: Vec2::ZERO,
            sprite_offset: Vec2::ZERO,
            ignore_world: false,
            ignore_gravity: false,
            gravity_multiplier: 1.0,
        }
    }

    /// Hitbox if the body stood at `pos`
    pub fn hitbox_at(&self, pos: Vec2) -> Rect {
        let bottom = pos.y - self.hitbox_offset.y;
        Rect::new(
            pos.x + self.hitbox_offset.x,
            bottom - self.size.y,
            self.size.x,
            self.size.y,
        )
    }

    pub fn hitbox(&self) -> Rect {
        self.hitbox_at(self.pos)
    }

    pub fn center(&self) -> Vec2 {
        self.hitbox().center()
    }

    pub fn is_dying(&self) -> bool {
        self.status == Status::Dying
    }
}

/// Handle into a [`Roster`]. The index is the stable per-category ID; the
/// generation rejects handles whose slot has since been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Integer ID unique among live entities of one category
    pub fn raw(self) -> u32 {
        self.index
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
    doomed: bool,
}

/// Owning container for one entity category.
///
/// Removal only marks the slot; marked entities are invisible to lookups and
/// iteration but keep their storage until [`Roster::compact`] runs at a safe
/// point after every per-entity pass of the tick.
#[derive(Debug, Clone)]
pub struct Roster<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for Roster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Roster<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            slot.doomed = false;
            EntityId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
                doomed: false,
            });
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    fn live_slot(&self, id: EntityId) -> Option<&Slot<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation && !s.doomed && s.value.is_some())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.live_slot(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.live_slot(id)?.value.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.doomed {
            return None;
        }
        slot.value.as_mut()
    }

    /// Mark for removal. Returns false if the handle was already dead.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && !slot.doomed && slot.value.is_some() => {
                slot.doomed = true;
                true
            }
            _ => false,
        }
    }

    /// Free every marked slot, returning the removed values
    pub fn compact(&mut self) -> Vec<(EntityId, T)> {
        let mut removed = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.doomed {
                let id = EntityId {
                    index: index as u32,
                    generation: slot.generation,
                };
                slot.doomed = false;
                slot.generation = slot.generation.wrapping_add(1);
                if let Some(value) = slot.value.take() {
                    removed.push((id, value));
                }
                self.free.push(index as u32);
            }
        }
        removed
    }

    /// Live entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            if slot.doomed {
                return None;
            }
            slot.value.as_ref().map(|v| {
                (
                    EntityId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            if slot.doomed {
                return None;
            }
            let generation = slot.generation;
            slot.value.as_mut().map(|v| {
                (
                    EntityId {
                        index: index as u32,
                        generation,
                    },
                    v,
                )
            })
        })
    }

    /// Snapshot of live handles, for passes that need the roster mutably
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hitbox_bottom_anchored() {
        let mut body = Body::new(Vec2::new(10.0, 100.0), Vec2::new(20.0, 40.0));
        let hb = body.hitbox();
        assert_eq!(hb, Rect::new(10.0, 60.0, 20.0, 40.0));

        // Halving the height keeps the bottom edge
        body.size.y = 20.0;
        assert_eq!(body.hitbox().bottom(), 100.0);
    }

    #[test]
    fn test_rect_touching_is_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&b.translated(Vec2::new(-0.5, 0.0))));
    }

    #[test]
    fn test_roster_marked_entities_hidden_until_compact() {
        let mut roster = Roster::new();
        let a = roster.insert("a");
        let b = roster.insert("b");
        assert!(roster.remove(a));
        assert!(!roster.remove(a));
        assert!(roster.get(a).is_none());
        assert_eq!(roster.len(), 1);

        let removed = roster.compact();
        assert_eq!(removed, vec![(a, "a")]);
        assert_eq!(roster.get(b), Some(&"b"));
    }

    #[test]
    fn test_roster_reuses_index_with_new_generation() {
        let mut roster = Roster::new();
        let a = roster.insert(1);
        roster.remove(a);
        roster.compact();
        let c = roster.insert(3);
        assert_eq!(c.raw(), a.raw());
        assert_ne!(c, a);
        assert!(roster.get(a).is_none());
        assert_eq!(roster.get(c), Some(&3));
    }

    #[test]
    fn test_roster_ids_unique_while_live() {
        let mut roster = Roster::new();
        let ids: Vec<_> = (0..5).map(|i| roster.insert(i)).collect();
        let mut raw: Vec<_> = ids.iter().map(|id| id.raw()).collect();
        raw.dedup();
        assert_eq!(raw.len(), 5);
    }
}
