//! Per-tick orchestration
//!
//! One call advances the world by `ticks` simulation ticks in a fixed order:
//! input, AI, machinery, creature physics, contact damage, shots, bullets,
//! pickups, removal, compaction, then level flow. A later stage always sees
//! the current tick's earlier mutations.

use glam::Vec2;

use super::bullet::{Bullet, step_bullets};
use super::creature::Weapon;
use super::entity::{EntityId, Rect};
use super::events::{EffectKind, GameEvent, GameOverReason, SoundEffect};
use super::machinery::MachineKind;
use super::physics::{PhysicsEnv, apply_physics};
use super::player_state::{Bind, InputPhase};
use super::state::{GamePhase, World};
use crate::consts::*;

/// One abstracted input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindEvent {
    pub bind: Bind,
    pub phase: InputPhase,
}

impl BindEvent {
    pub fn new(bind: Bind, phase: InputPhase) -> Self {
        Self { bind, phase }
    }
}

/// Input for a single tick, in arrival order
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub events: Vec<BindEvent>,
}

impl TickInput {
    pub fn press(bind: Bind) -> Self {
        Self {
            events: vec![BindEvent::new(bind, InputPhase::Press)],
        }
    }
}

/// Advance the world by `ticks` simulation ticks
pub fn tick(world: &mut World, input: &TickInput, ticks: f32) {
    // Handle pause toggle
    let pause = input
        .events
        .iter()
        .any(|e| e.bind == Bind::Pause && e.phase == InputPhase::Press);
    if pause {
        match world.phase {
            GamePhase::Playing => {
                world.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => world.phase = GamePhase::Playing,
            _ => {}
        }
    }
    if world.phase != GamePhase::Playing {
        return;
    }

    let dt = ticks * PHYSICS_SPEED;
    world.elapsed += dt;

    apply_player_input(world, input);
    update_ai(world, dt);
    update_machinery(world, dt);
    let exit = update_creatures(world, ticks);
    apply_contact_damage(world);
    launch_shots(world);
    step_bullets(
        &mut world.bullets,
        &mut world.creatures,
        &mut world.machinery,
        &mut world.map,
        &mut world.events,
        dt,
    );
    collect_pickups(world);
    remove_fallen(world);
    compact(world);
    update_level_flow(world, exit, dt);

    world.camera = world.camera_view(world.camera.w, world.camera.h);
}

fn apply_player_input(world: &mut World, input: &TickInput) {
    let Some(player) = world.player_mut() else {
        return;
    };
    for e in input.events.iter().filter(|e| e.bind != Bind::Pause) {
        player.handle_input(e.bind, e.phase);
    }
    player.handle_idle();
}

fn update_ai(world: &mut World, dt: f32) {
    for id in world.creatures.ids() {
        let target = world
            .creatures
            .get(id)
            .and_then(|c| c.ai.as_ref())
            .and_then(|ai| ai.core.target)
            .and_then(|t| world.creatures.get(t))
            .filter(|t| !t.is_dying())
            .map(|t| t.body.center());
        let Some(c) = world.creatures.get_mut(id) else {
            continue;
        };
        if let Some(mut ai) = c.ai.take() {
            ai.update(c, target, &mut world.rng, dt);
            c.ai = Some(ai);
        }
    }
}

fn update_machinery(world: &mut World, dt: f32) {
    let camera = world.camera;
    for (_, m) in world.machinery.iter_mut() {
        m.update(dt, Some(camera));
    }

    // Buttons toggle their paired door when first touched
    let feet = world
        .player()
        .filter(|p| !p.is_dying())
        .map(|p| p.body.hitbox().translated(Vec2::new(0.0, STANDABLE_TOLERANCE)));
    let mut toggled = Vec::new();
    for (_, m) in world.machinery.iter_mut() {
        let rect = m.rect();
        let enabled = m.enabled;
        if let MachineKind::Button { pressed } = &mut m.kind {
            let touching = enabled && feet.is_some_and(|f| f.overlaps(&rect));
            if touching && !*pressed {
                toggled.extend(m.pair_id);
            }
            *pressed = touching;
        }
    }
    for (_, m) in world.machinery.iter_mut() {
        let Some(pair) = m.pair_id else { continue };
        if !toggled.contains(&pair) {
            continue;
        }
        if let MachineKind::Door { open, .. } = m.kind {
            m.set_open(!open, &mut world.events);
        }
    }
}

/// Physics for every creature. Returns true when the player reached the exit.
fn update_creatures(world: &mut World, ticks: f32) -> bool {
    let env = PhysicsEnv {
        map: &world.map,
        machinery: &world.machinery,
        death_zones: &world.death_zones,
    };
    let mut exit = false;
    for id in world.creatures.ids() {
        let Some(c) = world.creatures.get_mut(id) else {
            continue;
        };
        let before = c.motion;
        let outcome = apply_physics(c, &env, ticks);
        if c.motion != before {
            if let Some(mut ai) = c.ai.take() {
                let after = c.motion;
                ai.on_state_change(c, before, after);
                c.ai = Some(ai);
            }
        }
        if outcome.exit_level && c.is_player() {
            exit = true;
        }
    }
    exit
}

fn apply_contact_damage(world: &mut World) {
    let Some(player_id) = world.player else {
        return;
    };
    let Some(player_rect) = world
        .creatures
        .get(player_id)
        .filter(|p| !p.is_dying())
        .map(|p| p.body.hitbox())
    else {
        return;
    };

    let hits: Vec<(i32, f32)> = world
        .creatures
        .iter()
        .filter(|(id, c)| {
            *id != player_id && !c.is_dying() && c.contact_damage > 0 && c.is_ai()
        })
        .filter(|(_, c)| c.body.hitbox().overlaps(&player_rect))
        .map(|(_, c)| (c.contact_damage, c.body.center().x))
        .collect();
    if let Some(player) = world.creatures.get_mut(player_id) {
        for (damage, source_x) in hits {
            player.hurt(damage, source_x);
        }
    }

    let lava: Vec<Rect> = world
        .machinery
        .iter()
        .filter(|(_, m)| m.enabled && matches!(m.kind, MachineKind::LavaFloor { .. }))
        .map(|(_, m)| m.rect())
        .collect();
    if lava.is_empty() {
        return;
    }
    for (_, c) in world.creatures.iter_mut() {
        let hb = c.body.hitbox();
        if !c.is_dying() && lava.iter().any(|r| r.overlaps(&hb)) {
            c.take_damage(LAVA_DAMAGE);
        }
    }
}

/// Turn queued shots into bullets. One lightning bolt per owner at a time.
fn launch_shots(world: &mut World) {
    let mut launched: Vec<Bullet> = Vec::new();
    for id in world.creatures.ids() {
        let Some(c) = world.creatures.get_mut(id) else {
            continue;
        };
        let from_player = c.is_player();
        for shot in c.drain_shots() {
            if shot.weapon == Weapon::Lightning {
                let live = world
                    .bullets
                    .iter()
                    .map(|(_, b)| b)
                    .chain(launched.iter())
                    .any(|b| b.weapon == Weapon::Lightning && b.owner == Some(id));
                if live {
                    c.refund_ammo(Weapon::Lightning);
                    continue;
                }
                world.events.push(GameEvent::Sound(SoundEffect::Thunder));
                world.events.push(GameEvent::Effect {
                    kind: EffectKind::LightningFlash,
                    pos: shot.origin,
                });
            }
            launched.push(Bullet::from_shot(&shot, Some(id), from_player));
        }
    }
    for b in launched {
        world.bullets.insert(b);
    }
}

fn collect_pickups(world: &mut World) {
    let Some(player_id) = world.player else {
        return;
    };
    let Some(player) = world.creatures.get_mut(player_id) else {
        return;
    };
    if player.is_dying() {
        return;
    }
    let hb = player.body.hitbox();
    let mut taken: Vec<EntityId> = Vec::new();
    for (id, p) in world.pickups.iter() {
        if p.rect.overlaps(&hb) && p.apply(player) {
            taken.push(id);
        }
    }
    for id in taken {
        world.pickups.remove(id);
        world.events.push(GameEvent::Sound(SoundEffect::Pickup));
    }
}

/// Mark expired creatures and finished death falls for removal.
/// The player is never removed; its death ends the game instead.
fn remove_fallen(world: &mut World) {
    let floor = world.map.pixel_height() + WORLD_MARGIN;
    let mut player_dead = false;
    for id in world.creatures.ids() {
        let Some(c) = world.creatures.get_mut(id) else {
            continue;
        };
        // Forward events queued by the creature this tick
        world.events.append(&mut c.events);
        if c.is_player() {
            player_dead |= c.is_dying();
            continue;
        }
        if c.expired || (c.is_dying() && c.body.pos.y >= floor) {
            world.creatures.remove(id);
        }
    }
    if player_dead {
        world.end_game(GameOverReason::Died);
    }
}

fn compact(world: &mut World) {
    for (id, c) in world.creatures.compact() {
        log::debug!("removed {} ({})", c.name, id.raw());
    }
    for (_, b) in world.bullets.compact() {
        // Pistol rounds return to the shooter
        if b.weapon == Weapon::Pistol {
            if let Some(owner) = b.owner.and_then(|o| world.creatures.get_mut(o)) {
                owner.refund_ammo(Weapon::Pistol);
            }
        }
    }
    world.machinery.compact();
    world.pickups.compact();
}

fn update_level_flow(world: &mut World, exit: bool, dt: f32) {
    if world.game_over.is_some() {
        return;
    }
    if exit && !world.exited {
        world.exited = true;
        log::info!("level {} complete", world.level_name);
        world.events.push(GameEvent::ExitLevel);
        if world.final_level {
            world.end_game(GameOverReason::Won);
        } else {
            world.phase = GamePhase::LevelComplete;
        }
        return;
    }
    if let Some(left) = world.time_left.as_mut() {
        *left -= dt;
        if *left <= 0.0 {
            *left = 0.0;
            world.end_game(GameOverReason::TimeUp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::creature::MotionState;
    use crate::sim::player_state::PlayerState;
    use crate::sim::level::{LevelData, MachineDef, PickupDef, PickupKind, SpawnDef};

    const ROOM: [&str; 4] = [
        "..........",
        "..........",
        "..........",
        "##########",
    ];

    fn world_with(level: &LevelData) -> World {
        let mut world = World::new(42);
        world.load_level(level);
        world
    }

    fn room() -> LevelData {
        LevelData::from_ascii("room", &ROOM, Vec2::new(32.0, 95.99))
    }

    fn run(world: &mut World, n: usize) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..n {
            tick(world, &TickInput::default(), 1.0);
            events.extend(world.drain_events());
        }
        events
    }

    #[test]
    fn test_player_settles_and_walks() {
        let mut world = world_with(&room());
        run(&mut world, 2);
        let p = world.player().unwrap();
        assert_eq!(p.motion, MotionState::OnGround);
        assert!((p.body.pos.y - (96.0 - COLLISION_EPSILON)).abs() < 1e-3);

        let start = p.body.pos.x;
        tick(&mut world, &TickInput::press(Bind::Right), 1.0);
        run(&mut world, 20);
        assert!(world.player().unwrap().body.pos.x > start);
    }

    #[test]
    fn test_jump_leaves_ground() {
        let mut world = world_with(&room());
        run(&mut world, 2);
        let y = world.player().unwrap().body.pos.y;
        tick(&mut world, &TickInput::press(Bind::Jump), 1.0);
        run(&mut world, 5);
        assert!(world.player().unwrap().body.pos.y < y);
    }

    #[test]
    fn test_released_jump_catches_hook_on_the_way_down() {
        let level = LevelData::from_ascii(
            "hooks",
            &[
                "........",
                "........",
                "........",
                "...H....",
                "........",
                "........",
                "........",
                "########",
            ],
            Vec2::new(100.0, 223.99),
        );
        let mut world = world_with(&level);
        run(&mut world, 2);
        tick(&mut world, &TickInput::press(Bind::Jump), 1.0);
        run(&mut world, 9);
        let release = TickInput {
            events: vec![BindEvent::new(Bind::Jump, InputPhase::Unpress)],
        };
        tick(&mut world, &release, 1.0);
        assert_eq!(world.player().unwrap().motion, MotionState::InAir);

        run(&mut world, 80);
        let p = world.player().unwrap();
        assert_eq!(p.state(), PlayerState::Hanging);
        assert_eq!(p.motion, MotionState::Hanging);
        assert_eq!(p.body.pos.y, 3.0 * TILE_SIZE + 44.0);
    }

    #[test]
    fn test_pause_freezes_world() {
        let mut world = world_with(&room());
        tick(&mut world, &TickInput::press(Bind::Pause), 1.0);
        assert_eq!(world.phase, GamePhase::Paused);
        let elapsed = world.elapsed;
        run(&mut world, 10);
        assert_eq!(world.elapsed, elapsed);
        tick(&mut world, &TickInput::press(Bind::Pause), 1.0);
        assert_eq!(world.phase, GamePhase::Playing);
        assert!(world.elapsed > elapsed);
    }

    #[test]
    fn test_exit_fires_once() {
        let mut level = LevelData::from_ascii(
            "exit",
            &["......", "....E.", "....E.", "######"],
            Vec2::new(32.0, 95.99),
        );
        level.final_level = true;
        let mut world = world_with(&level);
        tick(&mut world, &TickInput::press(Bind::Right), 1.0);
        let events = run(&mut world, 120);
        let exits = events.iter().filter(|e| **e == GameEvent::ExitLevel).count();
        assert_eq!(exits, 1);
        assert!(events.contains(&GameEvent::GameOver(GameOverReason::Won)));
        assert_eq!(world.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_time_up_fires_once() {
        let mut level = room();
        level.time_limit = Some(0.5);
        let mut world = world_with(&level);
        let events = run(&mut world, 60);
        let overs: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver(_)))
            .collect();
        assert_eq!(overs, vec![&GameEvent::GameOver(GameOverReason::TimeUp)]);
    }

    #[test]
    fn test_death_zone_ends_game() {
        let mut level = room();
        level.death_zones.push(Rect::new(0.0, 0.0, 96.0, 96.0));
        let mut world = world_with(&level);
        let events = run(&mut world, 3);
        assert!(events.contains(&GameEvent::GameOver(GameOverReason::Died)));
        // Player stays in the roster
        assert!(world.player().is_some());
    }

    #[test]
    fn test_contact_damage_lands_once() {
        let mut level = room();
        level.spawns.push(SpawnDef {
            creature: "grunt".into(),
            pos: Vec2::new(36.0, 95.99),
        });
        let mut world = world_with(&level);
        let max = world.player().unwrap().max_health;
        run(&mut world, 1);
        assert_eq!(world.player().unwrap().health, max - 10);
        // Stunned then invulnerable
        run(&mut world, 5);
        assert_eq!(world.player().unwrap().health, max - 10);
    }

    #[test]
    fn test_pistol_round_comes_back() {
        let mut world = world_with(&room());
        run(&mut world, 1);
        tick(&mut world, &TickInput::press(Bind::Fire), 1.0);
        let slot = Weapon::Pistol.slot().unwrap();
        assert_eq!(world.bullets.len(), 1);
        assert_eq!(world.player().unwrap().player.as_ref().unwrap().ammo[slot], 2);
        run(&mut world, 90);
        assert!(world.bullets.is_empty());
        assert_eq!(world.player().unwrap().player.as_ref().unwrap().ammo[slot], 3);
    }

    #[test]
    fn test_one_lightning_per_owner() {
        let mut world = world_with(&room());
        run(&mut world, 1);
        let slot = Weapon::Lightning.slot().unwrap();
        let p = world.player_mut().unwrap();
        p.queue_shot(Weapon::Lightning);
        p.queue_shot(Weapon::Lightning);
        run(&mut world, 1);
        let bolts = world
            .bullets
            .iter()
            .filter(|(_, b)| b.weapon == Weapon::Lightning)
            .count();
        assert_eq!(bolts, 1);
        assert_eq!(world.player().unwrap().player.as_ref().unwrap().ammo[slot], 1);
    }

    #[test]
    fn test_button_toggles_paired_door() {
        let mut level = room();
        level.machinery.push(MachineDef::Button {
            rect: Rect::new(24.0, 90.0, 32.0, 6.0),
            pair: Some(3),
        });
        level.machinery.push(MachineDef::Door {
            rect: Rect::new(256.0, 32.0, 16.0, 64.0),
            open_offset: 48.0,
            pair: Some(3),
        });
        let mut world = world_with(&level);
        let events = run(&mut world, 10);
        let opens = events
            .iter()
            .filter(|e| **e == GameEvent::Sound(SoundEffect::DoorOpen))
            .count();
        assert_eq!(opens, 1);
    }

    #[test]
    fn test_lava_floor_burns_what_it_touches() {
        let mut level = room();
        level.machinery.push(MachineDef::Lava {
            rect: Rect::new(192.0, 80.0, 128.0, 16.0),
            track_camera: false,
            screen_offset: 0.0,
        });
        level.spawns.push(SpawnDef {
            creature: "grunt".into(),
            pos: Vec2::new(250.0, 95.99),
        });
        let mut world = world_with(&level);
        run(&mut world, 1);
        let grunt = world
            .creatures
            .iter()
            .map(|(_, c)| c)
            .find(|c| c.is_ai())
            .unwrap();
        assert!(grunt.health < grunt.max_health);
        let p = world.player().unwrap();
        assert_eq!(p.health, p.max_health);

        // Walk the player in
        world.player_mut().unwrap().body.pos.x = 200.0;
        let events = run(&mut world, 1);
        assert!(world.player().unwrap().is_dying());
        assert!(events.contains(&GameEvent::GameOver(GameOverReason::Died)));
    }

    #[test]
    fn test_pickup_collected() {
        let mut level = room();
        level.pickups.push(PickupDef {
            kind: PickupKind::Ammo {
                weapon: Weapon::Pistol,
                amount: 2,
            },
            rect: Rect::new(36.0, 80.0, 8.0, 8.0),
        });
        let mut world = world_with(&level);
        let events = run(&mut world, 1);
        assert!(world.pickups.is_empty());
        assert!(events.contains(&GameEvent::Sound(SoundEffect::Pickup)));
        assert_eq!(world.player().unwrap().player.as_ref().unwrap().ammo[0], 5);
    }

    #[test]
    fn test_dead_enemy_removed_after_fall() {
        let mut level = room();
        level.spawns.push(SpawnDef {
            creature: "crawler".into(),
            pos: Vec2::new(250.0, 95.99),
        });
        let mut world = world_with(&level);
        run(&mut world, 1);
        for (_, c) in world.creatures.iter_mut() {
            if c.is_ai() {
                c.die();
            }
        }
        run(&mut world, 300);
        assert_eq!(world.creatures.len(), 1);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut level = room();
        for x in [120.0, 200.0, 260.0] {
            level.spawns.push(SpawnDef {
                creature: "crawler".into(),
                pos: Vec2::new(x, 95.99),
            });
        }
        let mut a = world_with(&level);
        let mut b = world_with(&level);
        run(&mut a, 240);
        run(&mut b, 240);
        let pa: Vec<Vec2> = a.creatures.iter().map(|(_, c)| c.body.pos).collect();
        let pb: Vec<Vec2> = b.creatures.iter().map(|(_, c)| c.body.pos).collect();
        assert_eq!(pa, pb);
    }
}
