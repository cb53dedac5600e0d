//! Audio collaborator
//!
//! The simulation only queues [`GameEvent::Sound`] triggers. The host drains
//! them after each tick and hands them to an [`AudioManager`], which applies
//! volume and forwards to whatever backend implements [`AudioSink`].

use crate::settings::Settings;
use crate::sim::{GameEvent, SoundEffect};

/// Playback backend. Fire and forget: nothing is reported back.
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect, gain: f32);
}

/// Backend that only logs, for headless runs
#[derive(Debug, Default)]
pub struct LogAudio {
    played: usize,
}

impl LogAudio {
    pub fn played(&self) -> usize {
        self.played
    }
}

impl AudioSink for LogAudio {
    fn play(&mut self, effect: SoundEffect, gain: f32) {
        self.played += 1;
        log::debug!("sound {effect:?} at {gain:.2}");
    }
}

/// Audio manager for the game
pub struct AudioManager<S: AudioSink> {
    sink: S,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl<S: AudioSink> AudioManager<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    pub fn from_settings(sink: S, settings: &Settings) -> Self {
        let mut audio = Self::new(sink);
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);
        audio
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        self.sink.play(effect, vol);
    }

    /// Play every sound trigger in a drained event batch
    pub fn handle_events(&mut self, events: &[GameEvent]) {
        for event in events {
            if let GameEvent::Sound(effect) = event {
                self.play(*effect);
            }
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::GameOverReason;

    #[derive(Default)]
    struct Recorder(Vec<(SoundEffect, f32)>);

    impl AudioSink for Recorder {
        fn play(&mut self, effect: SoundEffect, gain: f32) {
            self.0.push((effect, gain));
        }
    }

    #[test]
    fn test_only_sounds_are_played() {
        let mut audio = AudioManager::new(Recorder::default());
        audio.set_master_volume(0.5);
        audio.handle_events(&[
            GameEvent::Sound(SoundEffect::Jump),
            GameEvent::ExitLevel,
            GameEvent::GameOver(GameOverReason::Won),
            GameEvent::Sound(SoundEffect::Pickup),
        ]);
        assert_eq!(
            audio.sink().0,
            vec![(SoundEffect::Jump, 0.5), (SoundEffect::Pickup, 0.5)]
        );
    }

    #[test]
    fn test_muted_plays_nothing() {
        let mut audio = AudioManager::from_settings(LogAudio::default(), &Settings::default());
        audio.set_muted(true);
        audio.play(SoundEffect::Hit);
        assert_eq!(audio.sink().played(), 0);
        audio.set_muted(false);
        audio.play(SoundEffect::Hit);
        assert_eq!(audio.sink().played(), 1);
    }
}
