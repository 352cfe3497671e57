use std::sync::Arc;

use audio_backend::AudioOutput;
use clip_store::{ClipCatalog, ClipLoader};
use event_bus::EventBus;
use parking_lot::Mutex;

use crate::music::MusicPlayer;
use crate::sfx::SfxPlayer;
use crate::updater::Updater;
use crate::voice::VoiceId;
use crate::{AudioError, SpatialAnchor, Vec3};

/// Crossfade length used when the caller does not care.
pub const DEFAULT_CROSSFADE_SECS: f32 = 0.3;

struct MixLevels {
    master: f32,
    sfx: f32,
    music: f32,
}

/// Facade over the SFX pool and the music slot with master/per-channel
/// volume mixing. Assembled through [`AudioServiceBuilder`].
pub struct AudioService {
    sfx: SfxPlayer,
    music: MusicPlayer,
    mix: Mutex<MixLevels>,
}

impl std::fmt::Debug for AudioService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioService").finish_non_exhaustive()
    }
}

impl AudioService {
    pub fn builder() -> AudioServiceBuilder {
        AudioServiceBuilder::default()
    }

    pub fn set_master_volume(&self, volume: f32) {
        let (sfx, music) = {
            let mut mix = self.mix.lock();
            mix.master = volume.clamp(0.0, 1.0);
            (mix.master * mix.sfx, mix.master * mix.music)
        };
        self.sfx.set_volume(sfx);
        self.music.set_volume(music);
    }

    pub fn set_sfx_volume(&self, volume: f32) {
        let sfx = {
            let mut mix = self.mix.lock();
            mix.sfx = volume.clamp(0.0, 1.0);
            mix.master * mix.sfx
        };
        self.sfx.set_volume(sfx);
    }

    pub fn set_music_volume(&self, volume: f32) {
        let music = {
            let mut mix = self.mix.lock();
            mix.music = volume.clamp(0.0, 1.0);
            mix.master * mix.music
        };
        self.music.set_volume(music);
    }

    pub fn play_music(&self, name: &str) {
        self.music.play(name);
    }

    pub fn cross_fade_music(&self, name: &str, duration_secs: f32) {
        self.music.cross_fade(name, duration_secs);
    }

    pub fn play_sfx(&self, name: &str) -> VoiceId {
        self.sfx.play(name)
    }

    pub fn play_sfx_at(&self, name: &str, position: Vec3) -> VoiceId {
        self.sfx.play_at(name, position)
    }

    pub fn play_sfx_following(&self, name: &str, anchor: &Arc<dyn SpatialAnchor>) -> VoiceId {
        self.sfx.play_following(name, anchor)
    }

    pub fn stop_sfx(&self, id: VoiceId) {
        self.sfx.stop(id);
    }

    pub fn dispose(&self) {
        self.sfx.dispose();
        self.music.dispose();
    }

    pub fn sfx(&self) -> &SfxPlayer {
        &self.sfx
    }

    pub fn music(&self) -> &MusicPlayer {
        &self.music
    }
}

/// Collects the collaborators the service needs. `build` fails with
/// [`AudioError::Configuration`] naming the first missing one.
#[derive(Default)]
pub struct AudioServiceBuilder {
    catalog: Option<Arc<ClipCatalog>>,
    loader: Option<Arc<dyn ClipLoader>>,
    output: Option<Arc<dyn AudioOutput>>,
    updater: Option<Arc<dyn Updater>>,
    bus: Option<Arc<EventBus>>,
}

impl AudioServiceBuilder {
    pub fn catalog(mut self, catalog: Arc<ClipCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn ClipLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn updater(mut self, updater: Arc<dyn Updater>) -> Self {
        self.updater = Some(updater);
        self
    }

    pub fn bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<AudioService, AudioError> {
        let catalog = self.catalog.ok_or_else(|| missing("clip catalog"))?;
        let loader = self.loader.ok_or_else(|| missing("clip loader"))?;
        let output = self.output.ok_or_else(|| missing("audio output"))?;
        let updater = self.updater.ok_or_else(|| missing("updater"))?;
        let bus = self.bus.ok_or_else(|| missing("event bus"))?;

        let sfx = SfxPlayer::new(
            catalog.clone(),
            loader.clone(),
            output.clone(),
            updater.clone(),
            bus,
        );
        let music = MusicPlayer::new(catalog, loader, output, updater);
        Ok(AudioService {
            sfx,
            music,
            mix: Mutex::new(MixLevels {
                master: 1.0,
                sfx: 1.0,
                music: 1.0,
            }),
        })
    }
}

fn missing(what: &'static str) -> AudioError {
    tracing::error!(collaborator = what, "audio service misconfigured");
    AudioError::Configuration(what)
}
