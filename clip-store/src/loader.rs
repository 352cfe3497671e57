use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use parking_lot::Mutex;

use crate::{clip_key, AssetError, ClipAsset, ClipDescriptor, ClipSource};

/// Outcome of a load request that was not immediately resident. The requester
/// polls it from its tick; exactly one completion is ever delivered.
pub struct PendingClip {
    receiver: Receiver<Result<Arc<ClipAsset>, AssetError>>,
}

impl PendingClip {
    /// Wrap a completion channel. Loader implementations send exactly one
    /// outcome on the paired sender.
    pub fn new(receiver: Receiver<Result<Arc<ClipAsset>, AssetError>>) -> Self {
        Self { receiver }
    }

    /// A pending handle that immediately yields the given failure.
    pub fn failed(err: AssetError) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(Err(err));
        Self { receiver: rx }
    }

    /// Non-blocking poll. `None` while the load is still in flight; a
    /// dropped sender counts as a failed load.
    pub fn try_take(&self) -> Option<Result<Arc<ClipAsset>, AssetError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(AssetError::Decode("load request dropped".into())))
            }
        }
    }
}

/// Result of [`ClipLoader::resolve`].
pub enum Resolution {
    /// Asset is resident; playback can start now.
    Ready(Arc<ClipAsset>),
    /// Load is in flight; poll the handle on later ticks.
    Pending(PendingClip),
}

/// Asset-loading capability. Implementations differ in *when* the decoded
/// data becomes available, never in what the caller has to do about it.
pub trait ClipLoader: Send + Sync {
    fn resolve(&self, clip: &ClipDescriptor) -> Resolution;

    /// Drop the cached data for a clip nobody is playing. In-flight `Arc`s
    /// keep the samples alive; a later resolve re-decodes.
    fn release(&self, clip: &ClipDescriptor);
}

type AssetCache = Mutex<HashMap<String, Arc<ClipAsset>>>;

fn decode(clip: &ClipDescriptor) -> Result<Arc<ClipAsset>, AssetError> {
    match &clip.source {
        ClipSource::Memory(asset) => Ok(asset.clone()),
        ClipSource::Wav(path) => ClipAsset::from_wav_path(path).map(Arc::new),
    }
}

/// Synchronous loader: decodes on the calling thread during `resolve` and
/// keeps the result cached under the clip's key.
#[derive(Default)]
pub struct ResidentLoader {
    cache: AssetCache,
}

impl ResidentLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipLoader for ResidentLoader {
    fn resolve(&self, clip: &ClipDescriptor) -> Resolution {
        let key = clip_key(&clip.name);
        if let Some(asset) = self.cache.lock().get(&key) {
            return Resolution::Ready(asset.clone());
        }
        match decode(clip) {
            Ok(asset) => {
                self.cache.lock().insert(key, asset.clone());
                Resolution::Ready(asset)
            }
            Err(err) => {
                tracing::warn!(clip = %clip.name, error = %err, "clip load failed");
                Resolution::Pending(PendingClip::failed(err))
            }
        }
    }

    fn release(&self, clip: &ClipDescriptor) {
        if self.cache.lock().remove(&clip_key(&clip.name)).is_some() {
            tracing::debug!(clip = %clip.name, "released cached clip");
        }
    }
}

/// Asynchronous loader: `resolve` returns a pending handle and a worker
/// thread decodes the file, caching the result for later requests.
pub struct StreamingLoader {
    cache: Arc<AssetCache>,
}

impl StreamingLoader {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for StreamingLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipLoader for StreamingLoader {
    fn resolve(&self, clip: &ClipDescriptor) -> Resolution {
        let key = clip_key(&clip.name);
        if let Some(asset) = self.cache.lock().get(&key) {
            return Resolution::Ready(asset.clone());
        }
        // Memory sources are resident by definition.
        if let ClipSource::Memory(asset) = &clip.source {
            self.cache.lock().insert(key, asset.clone());
            return Resolution::Ready(asset.clone());
        }

        let (tx, rx) = bounded(1);
        let cache = self.cache.clone();
        let request = clip.clone();
        thread::spawn(move || {
            let outcome = decode(&request);
            match &outcome {
                Ok(asset) => {
                    cache
                        .lock()
                        .insert(clip_key(&request.name), asset.clone());
                }
                Err(err) => {
                    tracing::warn!(clip = %request.name, error = %err, "clip load failed");
                }
            }
            let _ = tx.send(outcome);
        });
        Resolution::Pending(PendingClip { receiver: rx })
    }

    fn release(&self, clip: &ClipDescriptor) {
        if self.cache.lock().remove(&clip_key(&clip.name)).is_some() {
            tracing::debug!(clip = %clip.name, "released cached clip");
        }
    }
}
