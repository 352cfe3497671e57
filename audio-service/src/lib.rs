//! Runtime audio-playback service: pooled sound-effect voices, a single-slot
//! music channel with timed crossfades, and reference-counted clip loads.
//!
//! The service is driven by a periodic tick (an [`Updater`]); asynchronous
//! asset loads are observed on tick boundaries, so no public operation ever
//! blocks. Collaborators (clip catalog, loader, output backend, event bus)
//! are injected through [`AudioServiceBuilder`].

use thiserror::Error;

mod music;
mod pool;
mod service;
mod sfx;
mod updater;
mod voice;

pub use audio_backend::Vec3;
pub use music::MusicPlayer;
pub use pool::{ClipRefCounts, VoicePool, PREWARM_VOICES};
pub use service::{AudioService, AudioServiceBuilder, DEFAULT_CROSSFADE_SECS};
pub use sfx::SfxPlayer;
pub use updater::{StepUpdater, UpdateFn, UpdateHandle, Updater};
pub use voice::{Placement, Voice, VoiceId, INVALID_VOICE_ID};

/// A moving point a playing voice can track. Voices hold weak references;
/// a dropped anchor is skipped, never an error.
pub trait SpatialAnchor: Send + Sync {
    fn position(&self) -> Vec3;
}

/// Published by the host when a scene/level is torn down; the SFX player
/// responds by releasing cached clips nobody is playing.
#[derive(Debug, Clone)]
pub struct SceneUnloaded {
    pub scene: String,
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("missing collaborator: {0}")]
    Configuration(&'static str),
}
