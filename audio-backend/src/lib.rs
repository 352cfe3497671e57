//! Audible-output capability used by the playback service.
//!
//! The service hands a decoded [`ClipAsset`](clip_store::ClipAsset) to
//! [`AudioOutput::begin`] and steers the resulting source by id. The mock
//! implementation records every call for tests; the cpal implementation
//! (feature `cpal-audio`) drives a real device with a small internal mixer.

use std::sync::Arc;

use clip_store::ClipAsset;
use thiserror::Error;

pub mod mock;

#[cfg(feature = "cpal-audio")]
pub mod cpal_backend;

pub type Vec3 = [f32; 3];

/// Identifier of one playing source inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

/// Initial playback parameters for a source.
#[derive(Debug, Clone, Copy)]
pub struct PlayParams {
    pub gain: f32,
    pub pitch: f32,
    pub looped: bool,
    /// `None` plays centered (non-spatial).
    pub position: Option<Vec3>,
}

impl Default for PlayParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            pitch: 1.0,
            looped: false,
            position: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no output device available")]
    DeviceNotFound,
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("stream error: {0}")]
    Stream(String),
}

/// One playback backend. Calls on unknown or already-stopped ids are no-ops.
pub trait AudioOutput: Send + Sync {
    /// Start rendering `asset` and return the id steering it.
    fn begin(&self, asset: &Arc<ClipAsset>, params: PlayParams) -> SourceId;
    fn set_gain(&self, id: SourceId, gain: f32);
    fn set_position(&self, id: SourceId, position: Vec3);
    fn stop(&self, id: SourceId);
}
