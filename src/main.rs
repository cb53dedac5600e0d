//! Hookshot headless runner
//!
//! Loads a level (JSON path as the first argument, or a built-in demo room),
//! plays a short scripted input sequence and logs what happened. Settings are
//! read from the second argument when given.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::Path;

    use glam::Vec2;
    use hookshot::audio::{AudioManager, LogAudio};
    use hookshot::sim::{
        Bind, BindEvent, GameEvent, InputPhase, LevelData, SpawnDef, TickInput, World, tick,
    };
    use hookshot::{ConfigError, Settings};

    env_logger::init();
    log::info!("Hookshot (headless) starting...");

    let mut args = std::env::args().skip(1);
    let level = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io {
                path: path.clone().into(),
                source,
            })
            .and_then(|json| LevelData::from_json(&json))
        {
            Ok(level) => level,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => {
            let mut level = LevelData::from_ascii(
                "demo",
                &[
                    "....................",
                    "....................",
                    "...............H....",
                    "....................",
                    "..........---.....E.",
                    "..................E.",
                    "####################",
                ],
                Vec2::new(40.0, 191.99),
            );
            level.spawns.push(SpawnDef {
                creature: "grunt".into(),
                pos: Vec2::new(420.0, 191.99),
            });
            level.time_limit = Some(30.0);
            level
        }
    };
    let settings = args
        .next()
        .map(|p| Settings::load_or_default(Path::new(&p)))
        .unwrap_or_default();

    let mut world = World::new(settings.run_seed());
    world.load_level(&level);
    let mut audio = AudioManager::from_settings(LogAudio::default(), &settings);
    let ticks = settings.ticks_per_frame();

    let script = |frame: usize| -> Vec<BindEvent> {
        match frame {
            0 => vec![BindEvent::new(Bind::Right, InputPhase::Press)],
            30 | 90 => vec![BindEvent::new(Bind::Jump, InputPhase::Press)],
            45 | 105 => vec![BindEvent::new(Bind::Jump, InputPhase::Unpress)],
            60 => vec![BindEvent::new(Bind::Fire, InputPhase::Press)],
            61 => vec![BindEvent::new(Bind::Fire, InputPhase::Unpress)],
            _ => Vec::new(),
        }
    };

    let frames = (10.0 * settings.refresh_rate.max(1.0)) as usize;
    for frame in 0..frames {
        let input = TickInput {
            events: script(frame),
        };
        tick(&mut world, &input, ticks);
        let events = world.drain_events();
        audio.handle_events(&events);
        for event in &events {
            match event {
                GameEvent::ExitLevel | GameEvent::GameOver(_) => {
                    log::info!("frame {frame}: {event:?}")
                }
                _ => {}
            }
        }
        if world.game_over.is_some() {
            break;
        }
    }

    if let Some(player) = world.player() {
        log::info!(
            "finished at {:?} ({:?}), health {}, {} sounds played",
            player.body.pos,
            world.phase,
            player.health,
            audio.sink().played()
        );
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless runner is native only
}
