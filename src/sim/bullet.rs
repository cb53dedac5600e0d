//! Projectiles: trajectories, tile interaction and hit testing

use glam::Vec2;

use super::collision::{any_covered, column_left, row_top};
use super::creature::{Creature, Shot, Weapon};
use super::entity::{Body, Direction, EntityId, Rect, Roster};
use super::events::{EffectKind, GameEvent, SoundEffect};
use super::machinery::Machinery;
use super::tiles::{PhysicsType, TileMap};
use crate::consts::{GRAVITY, GRENADE_BOUNCE, RAIN_DECAY_MULTIPLIER};

/// Upward launch speed of a thrown grenade
const GRENADE_LOFT: f32 = -220.0;
/// Distance a bouncing grenade is moved off the surface it hit
const BOUNCE_NUDGE: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct Bullet {
    pub body: Body,
    pub weapon: Weapon,
    /// Shooter; may already be gone
    pub owner: Option<EntityId>,
    pub from_player: bool,
    /// Lifetime over; final effect pending
    pub complete: bool,
}

impl Bullet {
    /// Launch a queued shot. The hitbox starts at the shot origin and extends
    /// the way it faces; explosions are centred on it.
    pub fn from_shot(shot: &Shot, owner: Option<EntityId>, from_player: bool) -> Self {
        let weapon = shot.weapon;
        let size = weapon.size();
        let top_left = match weapon {
            Weapon::Explosion => shot.origin - size / 2.0,
            _ => {
                let x = match shot.direction {
                    Direction::Right => shot.origin.x,
                    Direction::Left => shot.origin.x - size.x,
                };
                Vec2::new(x, shot.origin.y - size.y / 2.0)
            }
        };
        let mut body = Body::new(Vec2::new(top_left.x, top_left.y + size.y), size);
        body.direction = shot.direction;
        body.vel.x = shot.direction.sign() * weapon.speed();
        body.ignore_gravity = weapon != Weapon::Grenade;
        if weapon == Weapon::Grenade {
            body.vel.y = GRENADE_LOFT;
            body.acc.y = GRAVITY;
        }
        body.status_timer = weapon.lifetime();
        Self {
            body,
            weapon,
            owner,
            from_player,
            complete: false,
        }
    }

    pub fn rect(&self) -> Rect {
        self.body.hitbox()
    }

    /// Seconds left
    pub fn remaining(&self) -> f32 {
        self.body.status_timer
    }

    fn moves(&self) -> bool {
        !matches!(self.weapon, Weapon::Lightning | Weapon::Explosion)
    }

    fn integrate(&mut self, dt: f32) {
        if !self.moves() {
            return;
        }
        self.body.vel += self.body.acc * dt;
        self.body.pos += self.body.vel * dt;
    }

    /// Leading edge x and the tile column it sits in
    fn leading_x(&self) -> f32 {
        let r = self.rect();
        if self.body.vel.x >= 0.0 {
            r.right()
        } else {
            r.left()
        }
    }
}

/// What a tile probe decided for one bullet
enum TileHit {
    None,
    Destroyed,
}

fn bounce_grenade(b: &mut Bullet, map: &TileMap) {
    let r = b.rect();
    let lead_x = b.leading_x();
    let tx = map.tile_x(lead_x, false);
    let ty = map.tile_y(r.center().y, false);
    if b.body.vel.x != 0.0 && map.type_at(tx, ty).is_solid() {
        if !map.type_at(tx, ty - 1).is_solid() {
            let sign = b.body.vel.x.signum();
            b.body.vel.x *= GRENADE_BOUNCE;
            b.body.direction = b.body.direction.flipped();
            b.body.pos.x -= sign * BOUNCE_NUDGE;
        } else {
            b.body.vel.y *= GRENADE_BOUNCE;
        }
        return;
    }

    // Floor and ceiling
    let cx = map.tile_x(r.center().x, false);
    if b.body.vel.y > 0.0 {
        let row = map.tile_y(r.bottom(), false);
        if map.type_at(cx, row).is_solid() {
            b.body.vel.y *= GRENADE_BOUNCE;
            b.body.pos.y = row_top(row) - BOUNCE_NUDGE;
        }
    } else if b.body.vel.y < 0.0 {
        let row = map.tile_y(r.top(), false);
        if map.type_at(cx, row).is_solid() {
            b.body.vel.y *= GRENADE_BOUNCE;
            b.body.pos.y = row_top(row + 1) + r.h + BOUNCE_NUDGE;
        }
    }
}

fn probe_tiles(b: &mut Bullet, map: &mut TileMap, events: &mut Vec<GameEvent>) -> TileHit {
    if b.weapon == Weapon::Grenade {
        bounce_grenade(b, map);
        return TileHit::None;
    }
    let r = b.rect();
    let lead_x = b.leading_x();
    let tx = map.tile_x(lead_x, false);
    let ty = map.tile_y(r.center().y, false);
    let kind = map.type_at(tx, ty);
    if kind == PhysicsType::OutOfBounds {
        return TileHit::Destroyed;
    }
    if kind == PhysicsType::IceBlock && b.weapon.is_fire() {
        map.remove_top(tx, ty);
        events.push(GameEvent::Sound(SoundEffect::Melt));
        events.push(GameEvent::Effect {
            kind: EffectKind::Steam,
            pos: Vec2::new(column_left(tx), row_top(ty)),
        });
        return if b.weapon.piercing() {
            TileHit::None
        } else {
            TileHit::Destroyed
        };
    }
    if kind.is_solid() {
        events.push(GameEvent::Effect {
            kind: EffectKind::Spark,
            pos: Vec2::new(lead_x, r.center().y),
        });
        return TileHit::Destroyed;
    }
    TileHit::None
}

/// Bullets may only hurt the other team
pub fn can_hit(bullet: &Bullet, target: &Creature) -> bool {
    bullet.from_player != target.is_player()
}

/// Advance every bullet one tick.
///
/// Removed bullets stay marked in the roster until the caller compacts it.
pub fn step_bullets(
    bullets: &mut Roster<Bullet>,
    creatures: &mut Roster<Creature>,
    machinery: &mut Roster<Machinery>,
    map: &mut TileMap,
    events: &mut Vec<GameEvent>,
    dt: f32,
) {
    let mut spawned = Vec::new();

    for id in bullets.ids() {
        let Some(b) = bullets.get_mut(id) else {
            continue;
        };

        b.integrate(dt);
        let in_rain = any_covered(map, &b.rect(), |t| t == PhysicsType::Rain);
        let decay = if b.weapon.is_fire() && in_rain {
            dt * RAIN_DECAY_MULTIPLIER
        } else {
            dt
        };
        b.body.status_timer -= decay;

        if b.body.status_timer <= 0.0 {
            if matches!(b.weapon, Weapon::Grenade | Weapon::Lightning) {
                b.complete = true;
            }
            let center = b.rect().center();
            match b.weapon {
                Weapon::Grenade if b.complete => {
                    spawned.push(Bullet::from_shot(
                        &Shot {
                            weapon: Weapon::Explosion,
                            origin: center,
                            direction: b.body.direction,
                        },
                        b.owner,
                        b.from_player,
                    ));
                    events.push(GameEvent::Effect {
                        kind: EffectKind::Explosion,
                        pos: center,
                    });
                    events.push(GameEvent::Sound(SoundEffect::Explosion));
                }
                // Bolt fades out with a spark at its middle
                Weapon::Lightning if b.complete => events.push(GameEvent::Effect {
                    kind: EffectKind::Spark,
                    pos: center,
                }),
                _ => {}
            }
            bullets.remove(id);
            continue;
        }

        if b.moves() {
            if let TileHit::Destroyed = probe_tiles(b, map, events) {
                bullets.remove(id);
                continue;
            }

            let rect = b.rect();
            let mut destroyed = false;
            for (mid, m) in machinery.iter_mut() {
                if !m.enabled || !m.solid || !m.rect().overlaps(&rect) {
                    continue;
                }
                if b.weapon == Weapon::Grenade {
                    let sign = b.body.vel.x.signum();
                    b.body.vel.x *= GRENADE_BOUNCE;
                    b.body.direction = b.body.direction.flipped();
                    b.body.pos.x -= sign * BOUNCE_NUDGE;
                    break;
                }
                if m.destructable {
                    m.enabled = false;
                    events.push(GameEvent::Effect {
                        kind: EffectKind::Explosion,
                        pos: m.rect().center(),
                    });
                    events.push(GameEvent::Sound(SoundEffect::Explosion));
                    log::debug!("machinery {} destroyed", mid.raw());
                }
                destroyed = !b.weapon.piercing();
                break;
            }
            if destroyed {
                bullets.remove(id);
                continue;
            }
        }

        let rect = b.rect();
        let source_x = rect.center().x;
        let damage = b.weapon.damage();
        let remaining = b.remaining();
        let mut spent = false;
        for (_, c) in creatures.iter_mut() {
            if c.is_dying() || !can_hit(b, c) || !c.body.hitbox().overlaps(&rect) {
                continue;
            }
            match b.weapon {
                // Every overlapped creature, every tick
                Weapon::Lightning => {
                    c.hurt(damage, source_x);
                }
                w if w.piercing() => {
                    if c.note_pierced(id, remaining) {
                        c.hurt(damage, source_x);
                    }
                }
                _ => {
                    c.hurt(damage, source_x);
                    spent = true;
                    break;
                }
            }
        }
        if spent {
            bullets.remove(id);
        }
    }

    for b in spawned {
        bullets.insert(b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::PHYSICS_SPEED;
    use crate::sim::creature::CreatureTuning;
    use crate::sim::entity::Status;

    const DT: f32 = PHYSICS_SPEED;

    struct Rig {
        bullets: Roster<Bullet>,
        creatures: Roster<Creature>,
        machinery: Roster<Machinery>,
        map: TileMap,
        events: Vec<GameEvent>,
    }

    impl Rig {
        fn new(rows: &[&str]) -> Self {
            Self {
                bullets: Roster::new(),
                creatures: Roster::new(),
                machinery: Roster::new(),
                map: TileMap::from_ascii(rows),
                events: Vec::new(),
            }
        }

        fn step(&mut self) {
            step_bullets(
                &mut self.bullets,
                &mut self.creatures,
                &mut self.machinery,
                &mut self.map,
                &mut self.events,
                DT,
            );
        }
    }

    fn open_map() -> Vec<&'static str> {
        vec!["........", "........", "........", "........"]
    }

    fn shot(weapon: Weapon, origin: Vec2, direction: Direction) -> Shot {
        Shot {
            weapon,
            origin,
            direction,
        }
    }

    fn enemy_at(x: f32, y: f32) -> Creature {
        let tuning = CreatureTuning {
            health: 200,
            size: Vec2::new(20.0, 30.0),
            move_vel: 0.0,
            term_vel: 600.0,
            climb_vel: 0.0,
            contact_damage: 0,
            gravity_multiplier: 1.0,
            ignore_gravity: false,
            ignore_world: false,
        };
        Creature::new("dummy", Vec2::new(x, y), &tuning)
    }

    #[test]
    fn test_bullet_removed_on_the_tick_its_timer_hits_zero() {
        let mut rig = Rig::new(&open_map());
        let mut b = Bullet::from_shot(
            &shot(Weapon::Pistol, Vec2::new(10.0, 40.0), Direction::Right),
            None,
            true,
        );
        b.body.vel = Vec2::ZERO;
        b.body.status_timer = 2.0 * DT;
        let id = rig.bullets.insert(b);

        rig.step();
        assert!(rig.bullets.get(id).is_some());
        rig.step();
        assert!(rig.bullets.get(id).is_none());
    }

    #[test]
    fn test_piercing_bullet_hits_once() {
        let mut rig = Rig::new(&open_map());
        let enemy = rig.creatures.insert(enemy_at(100.0, 60.0));
        let mut b = Bullet::from_shot(
            &shot(Weapon::Rocket, Vec2::new(95.0, 45.0), Direction::Right),
            None,
            true,
        );
        b.body.vel = Vec2::ZERO;
        let bid = rig.bullets.insert(b);

        for _ in 0..4 {
            rig.step();
            // Clear the stun so only immunity can stop a second hit
            rig.creatures.get_mut(enemy).unwrap().body.status = Status::Normal;
        }
        let c = rig.creatures.get(enemy).unwrap();
        assert_eq!(c.health, 200 - Weapon::Rocket.damage());
        assert!(rig.bullets.get(bid).is_some());
    }

    #[test]
    fn test_plain_bullet_spent_on_first_hit() {
        let mut rig = Rig::new(&open_map());
        let enemy = rig.creatures.insert(enemy_at(100.0, 60.0));
        let mut b = Bullet::from_shot(
            &shot(Weapon::Pistol, Vec2::new(95.0, 45.0), Direction::Right),
            None,
            true,
        );
        b.body.vel = Vec2::ZERO;
        let bid = rig.bullets.insert(b);
        rig.step();
        assert!(rig.bullets.get(bid).is_none());
        assert_eq!(rig.creatures.get(enemy).unwrap().health, 190);
    }

    #[test]
    fn test_no_friendly_fire() {
        let mut rig = Rig::new(&open_map());
        let enemy = rig.creatures.insert(enemy_at(100.0, 60.0));
        let player = rig
            .creatures
            .insert(Creature::new_player(Vec2::new(140.0, 60.0)));

        let mut spit = Bullet::from_shot(
            &shot(Weapon::Spit, Vec2::new(95.0, 45.0), Direction::Right),
            None,
            false,
        );
        spit.body.vel = Vec2::ZERO;
        let spit = rig.bullets.insert(spit);
        let mut own = Bullet::from_shot(
            &shot(Weapon::Pistol, Vec2::new(142.0, 45.0), Direction::Right),
            Some(player),
            true,
        );
        own.body.vel = Vec2::ZERO;
        let own = rig.bullets.insert(own);

        rig.step();
        assert_eq!(rig.creatures.get(enemy).unwrap().health, 200);
        assert_eq!(rig.creatures.get(player).unwrap().health, 100);
        assert!(rig.bullets.get(spit).is_some());
        assert!(rig.bullets.get(own).is_some());
    }

    #[test]
    fn test_grenade_bounces_off_wall_with_open_tile_above() {
        let mut rig = Rig::new(&["....", "....", "...#", "####"]);
        let mut g = Bullet::from_shot(
            &shot(Weapon::Grenade, Vec2::new(80.0, 80.0), Direction::Right),
            None,
            true,
        );
        g.body.vel = Vec2::new(260.0, 0.0);
        g.body.acc = Vec2::ZERO;
        let before_x = g.body.pos.x;
        let id = rig.bullets.insert(g);

        rig.step();
        let g = rig.bullets.get(id).unwrap();
        assert_eq!(g.body.direction, Direction::Left);
        assert_eq!(g.body.vel.x, -130.0);
        let integrated = before_x + 260.0 * DT;
        assert!((g.body.pos.x - (integrated - 1.0)).abs() < 1e-3);
    }

    #[test]
    fn test_grenade_completion_spawns_explosion() {
        let mut rig = Rig::new(&open_map());
        let mut g = Bullet::from_shot(
            &shot(Weapon::Grenade, Vec2::new(80.0, 60.0), Direction::Right),
            None,
            true,
        );
        g.body.status_timer = DT;
        let id = rig.bullets.insert(g);
        rig.step();
        assert!(rig.bullets.get(id).is_none());
        let weapons: Vec<Weapon> = rig.bullets.iter().map(|(_, b)| b.weapon).collect();
        assert_eq!(weapons, vec![Weapon::Explosion]);
        assert!(rig
            .events
            .contains(&GameEvent::Sound(SoundEffect::Explosion)));
    }

    #[test]
    fn test_lightning_completion_leaves_spark() {
        let mut rig = Rig::new(&open_map());
        let mut bolt = Bullet::from_shot(
            &shot(Weapon::Lightning, Vec2::new(40.0, 45.0), Direction::Right),
            None,
            true,
        );
        bolt.body.status_timer = DT;
        let center = bolt.rect().center();
        let id = rig.bullets.insert(bolt);
        rig.step();
        assert!(rig.bullets.get(id).is_none());
        assert!(rig.bullets.is_empty());
        assert!(rig.events.contains(&GameEvent::Effect {
            kind: EffectKind::Spark,
            pos: center,
        }));
    }

    #[test]
    fn test_fireball_melts_ice_block() {
        let mut rig = Rig::new(&["....", "....", "...I", "####"]);
        let f = Bullet::from_shot(
            &shot(Weapon::Fireball, Vec2::new(90.0, 80.0), Direction::Right),
            None,
            true,
        );
        let id = rig.bullets.insert(f);
        rig.step();
        assert_eq!(rig.map.type_at(3, 2), PhysicsType::Air);
        assert!(rig.bullets.get(id).is_none());
        assert!(rig.events.contains(&GameEvent::Sound(SoundEffect::Melt)));
    }

    #[test]
    fn test_pistol_stopped_by_wall() {
        let mut rig = Rig::new(&["....", "....", "...#", "####"]);
        let b = Bullet::from_shot(
            &shot(Weapon::Pistol, Vec2::new(90.0, 80.0), Direction::Right),
            None,
            true,
        );
        let id = rig.bullets.insert(b);
        rig.step();
        assert!(rig.bullets.get(id).is_none());
        assert_eq!(rig.map.type_at(3, 2), PhysicsType::Block);
    }

    #[test]
    fn test_fire_burns_out_faster_in_rain() {
        let mut rig = Rig::new(&["rrrr", "rrrr", "rrrr", "...."]);
        let mut wet = Bullet::from_shot(
            &shot(Weapon::Fireball, Vec2::new(40.0, 40.0), Direction::Right),
            None,
            true,
        );
        wet.body.vel = Vec2::ZERO;
        wet.body.status_timer = 2.5 * DT;
        let mut pistol = wet.clone();
        pistol.weapon = Weapon::Pistol;
        let wet = rig.bullets.insert(wet);
        let pistol = rig.bullets.insert(pistol);
        rig.step();
        assert!(rig.bullets.get(wet).is_none());
        assert!(rig.bullets.get(pistol).is_some());
    }

    #[test]
    fn test_lightning_hits_every_overlap_every_tick() {
        let mut rig = Rig::new(&open_map());
        let a = rig.creatures.insert(enemy_at(60.0, 60.0));
        let b = rig.creatures.insert(enemy_at(120.0, 60.0));
        let bolt = Bullet::from_shot(
            &shot(Weapon::Lightning, Vec2::new(40.0, 45.0), Direction::Right),
            None,
            true,
        );
        rig.bullets.insert(bolt);

        rig.step();
        for id in [a, b] {
            let c = rig.creatures.get_mut(id).unwrap();
            assert_eq!(c.health, 100);
            c.body.status = Status::Normal;
        }
        rig.step();
        for id in [a, b] {
            assert!(rig.creatures.get(id).unwrap().is_dying());
        }
    }
}
