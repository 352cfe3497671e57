use std::sync::Arc;

use audio_backend::AudioOutput;
use clip_store::{ClipCatalog, ClipLoader};
use event_bus::{EventBus, SubscriptionId};
use parking_lot::Mutex;

use crate::pool::{ClipRefCounts, VoicePool, PREWARM_VOICES};
use crate::updater::{UpdateHandle, Updater};
use crate::voice::{Placement, VoiceId, INVALID_VOICE_ID};
use crate::{SceneUnloaded, SpatialAnchor, Vec3};

struct SfxState {
    pool: VoicePool,
    refcounts: ClipRefCounts,
    volume: f32,
    disposed: bool,
}

struct SfxShared {
    state: Mutex<SfxState>,
    catalog: Arc<ClipCatalog>,
    loader: Arc<dyn ClipLoader>,
    output: Arc<dyn AudioOutput>,
}

impl SfxShared {
    fn play(&self, name: &str, placement: Placement) -> VoiceId {
        let mut state = self.state.lock();
        if state.disposed {
            return INVALID_VOICE_ID;
        }
        let Some(clip) = self.catalog.lookup(name) else {
            tracing::warn!(clip = %name, "requested unknown clip");
            return INVALID_VOICE_ID;
        };
        state.refcounts.retain(&clip);
        let volume = state.volume;
        let index = state.pool.acquire_free(volume);
        let voice = state.pool.get_mut(index);
        voice.play(clip, placement, &*self.loader, &*self.output);
        let id = voice.id();
        tracing::debug!(clip = %name, voice = id, "sfx play");
        id
    }

    fn stop(&self, id: VoiceId) {
        if id == INVALID_VOICE_ID {
            return;
        }
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        let SfxState {
            pool, refcounts, ..
        } = &mut *state;
        if let Some(voice) = pool.find_by_id(id) {
            if voice.is_alive() {
                if let Some(clip) = voice.reset(&*self.output) {
                    refcounts.release(&clip);
                }
            }
        }
    }

    fn advance_all(&self, delta_secs: f32) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        let SfxState {
            pool, refcounts, ..
        } = &mut *state;
        for voice in pool.iter_mut() {
            if !voice.is_alive() {
                continue;
            }
            voice.advance(delta_secs, &*self.output);
            if !voice.is_alive() {
                // The sole reclamation site besides explicit stop.
                if let Some(clip) = voice.reset(&*self.output) {
                    refcounts.release(&clip);
                }
            }
        }
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.volume = volume;
        for voice in state.pool.iter_mut() {
            voice.set_volume_scale(volume, &*self.output);
        }
    }

    fn release_unreferenced(&self) {
        let state = self.state.lock();
        if state.disposed {
            return;
        }
        state.refcounts.release_unreferenced(&*self.loader);
    }
}

/// Pooled sound-effect playback. One mutex guards the pool, the refcount map
/// and the channel volume; every public call holds it briefly.
pub struct SfxPlayer {
    shared: Arc<SfxShared>,
    updater: Arc<dyn Updater>,
    bus: Arc<EventBus>,
    update_handle: UpdateHandle,
    subscription: SubscriptionId,
}

impl SfxPlayer {
    pub fn new(
        catalog: Arc<ClipCatalog>,
        loader: Arc<dyn ClipLoader>,
        output: Arc<dyn AudioOutput>,
        updater: Arc<dyn Updater>,
        bus: Arc<EventBus>,
    ) -> Self {
        let shared = Arc::new(SfxShared {
            state: Mutex::new(SfxState {
                pool: VoicePool::with_prewarm(PREWARM_VOICES),
                refcounts: ClipRefCounts::new(),
                volume: 1.0,
                disposed: false,
            }),
            catalog,
            loader,
            output,
        });

        let tick_target = shared.clone();
        let update_handle = updater.schedule(Arc::new(move |dt| tick_target.advance_all(dt)));

        let release_target = shared.clone();
        let subscription = bus.subscribe::<SceneUnloaded, _>(move |event| {
            tracing::debug!(scene = %event.scene, "scene unloaded, releasing unreferenced clips");
            release_target.release_unreferenced();
        });

        Self {
            shared,
            updater,
            bus,
            update_handle,
            subscription,
        }
    }

    /// Play a clip centered. Returns the voice id, or [`INVALID_VOICE_ID`]
    /// when the name is unknown.
    pub fn play(&self, name: &str) -> VoiceId {
        self.shared.play(name, Placement::Centered)
    }

    /// Play a clip at a fixed world position.
    pub fn play_at(&self, name: &str, position: Vec3) -> VoiceId {
        self.shared.play(name, Placement::At(position))
    }

    /// Play a clip whose position tracks `anchor` every tick.
    pub fn play_following(&self, name: &str, anchor: &Arc<dyn SpatialAnchor>) -> VoiceId {
        self.shared
            .play(name, Placement::Following(Arc::downgrade(anchor)))
    }

    /// Stop one playback by the id `play` returned. Unknown ids are a no-op.
    pub fn stop(&self, id: VoiceId) {
        self.shared.stop(id);
    }

    /// Rescale the gain of every current and future voice.
    pub fn set_volume(&self, volume: f32) {
        self.shared.set_volume(volume);
    }

    /// Ask the loader to drop cached data for clips no voice is playing.
    /// Also wired to the bus's `SceneUnloaded` event.
    pub fn release_unreferenced_cache(&self) {
        self.shared.release_unreferenced();
    }

    /// Stop everything and tear down scheduling and subscriptions. Safe to
    /// call more than once.
    pub fn dispose(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            let SfxState {
                pool, refcounts, ..
            } = &mut *state;
            for voice in pool.iter_mut() {
                let _ = voice.reset(&*self.shared.output);
            }
            refcounts.clear();
        }
        self.updater.unschedule(self.update_handle);
        self.bus.unsubscribe(self.subscription);
    }

    pub fn voice_count(&self) -> usize {
        self.shared.state.lock().pool.len()
    }

    pub fn alive_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .pool
            .iter()
            .filter(|v| v.is_alive())
            .count()
    }

    pub fn clip_refcount(&self, name: &str) -> usize {
        self.shared.state.lock().refcounts.count(name)
    }

    pub fn is_playing(&self, id: VoiceId) -> bool {
        let mut state = self.shared.state.lock();
        state
            .pool
            .find_by_id(id)
            .map(|v| v.is_alive())
            .unwrap_or(false)
    }
}
