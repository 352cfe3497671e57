use std::sync::Arc;

use audio_backend::{AudioOutput, PlayParams, SourceId};
use clip_store::{ClipAsset, ClipCatalog, ClipDescriptor, ClipLoader, PendingClip, Resolution};
use parking_lot::Mutex;

use crate::updater::{UpdateHandle, Updater};

/// Crossfade progress. At most one fade is in flight; a direct `play` or a
/// new `cross_fade` replaces it.
enum Fade {
    Inactive,
    /// Outgoing track ramps to silence, then the slot switches to `next`.
    Out { remaining: f32, half: f32, next: String },
    /// Incoming track ramps from silence to full.
    In { remaining: f32, half: f32 },
}

struct PendingLoad {
    ticket: u64,
    handle: PendingClip,
}

struct MusicState {
    volume: f32,
    current: Option<Arc<ClipDescriptor>>,
    source: Option<SourceId>,
    pending: Option<PendingLoad>,
    generation: u64,
    fade: Fade,
    disposed: bool,
}

struct MusicShared {
    state: Mutex<MusicState>,
    catalog: Arc<ClipCatalog>,
    loader: Arc<dyn ClipLoader>,
    output: Arc<dyn AudioOutput>,
}

impl MusicShared {
    /// Gain the playing source should have right now, honoring any fade.
    fn effective_gain(state: &MusicState, base: f32) -> f32 {
        let full = base * state.volume;
        match &state.fade {
            Fade::Inactive => full,
            Fade::Out { remaining, half, .. } => full * (remaining / half),
            Fade::In { remaining, half } => full * (1.0 - remaining / half),
        }
    }

    fn apply_gain(&self, state: &MusicState) {
        if let (Some(source), Some(clip)) = (state.source, &state.current) {
            self.output
                .set_gain(source, Self::effective_gain(state, clip.volume));
        }
    }

    fn start_audible(&self, state: &mut MusicState, asset: &Arc<ClipAsset>) {
        let Some(clip) = &state.current else {
            return;
        };
        let params = PlayParams {
            gain: Self::effective_gain(state, clip.volume),
            pitch: clip.pitch,
            looped: clip.looped,
            position: None,
        };
        state.source = Some(self.output.begin(asset, params));
    }

    /// Replace the slot's track. Does not touch the fade state; `play`
    /// cancels fades before calling this, the fade driver relies on it not to.
    fn switch_to(&self, state: &mut MusicState, name: &str) {
        if let Some(current) = &state.current {
            if current.matches(name) {
                return;
            }
        }
        if let Some(source) = state.source.take() {
            self.output.stop(source);
        }
        if let Some(clip) = state.current.take() {
            self.loader.release(&clip);
        }
        state.pending = None;
        state.generation += 1;

        if name.is_empty() {
            return;
        }
        let Some(clip) = self.catalog.lookup(name) else {
            tracing::warn!(clip = %name, "requested unknown music track");
            return;
        };
        tracing::debug!(clip = %name, "music switch");
        state.current = Some(clip.clone());
        match self.loader.resolve(&clip) {
            Resolution::Ready(asset) => self.start_audible(state, &asset),
            Resolution::Pending(handle) => {
                state.pending = Some(PendingLoad {
                    ticket: state.generation,
                    handle,
                });
            }
        }
    }

    fn play(&self, name: &str) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        let fade_was_active = !matches!(state.fade, Fade::Inactive);
        state.fade = Fade::Inactive;
        self.switch_to(&mut state, name);
        if fade_was_active {
            // A cancelled fade leaves whatever gain it had reached; restore.
            self.apply_gain(&state);
        }
    }

    fn cross_fade(&self, name: &str, duration_secs: f32) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            if duration_secs > 0.0 {
                let half = duration_secs * 0.5;
                state.fade = Fade::Out {
                    remaining: half,
                    half,
                    next: name.to_string(),
                };
                return;
            }
        }
        // Degenerate fade: instant switch.
        self.play(name);
    }

    fn poll_pending(&self, state: &mut MusicState) {
        let Some(pending) = &state.pending else {
            return;
        };
        let Some(outcome) = pending.handle.try_take() else {
            return;
        };
        let stale = pending.ticket != state.generation;
        state.pending = None;
        if stale {
            tracing::debug!("discarding stale music load completion");
            return;
        }
        match outcome {
            Ok(asset) => self.start_audible(state, &asset),
            Err(err) => {
                let clip = state
                    .current
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("<unbound>");
                tracing::warn!(clip, error = %err, "music load failed");
            }
        }
    }

    fn advance(&self, delta_secs: f32) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        self.poll_pending(&mut state);

        match std::mem::replace(&mut state.fade, Fade::Inactive) {
            Fade::Inactive => {}
            Fade::Out { remaining, half, next } => {
                let remaining = remaining - delta_secs;
                if remaining <= 0.0 {
                    // Silent point: swap tracks and ramp the new one up.
                    state.fade = Fade::In { remaining: half, half };
                    self.switch_to(&mut state, &next);
                } else {
                    state.fade = Fade::Out { remaining, half, next };
                    self.apply_gain(&state);
                }
            }
            Fade::In { remaining, half } => {
                let remaining = remaining - delta_secs;
                if remaining <= 0.0 {
                    state.fade = Fade::Inactive;
                } else {
                    state.fade = Fade::In { remaining, half };
                }
                self.apply_gain(&state);
            }
        }
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.volume = volume;
        self.apply_gain(&state);
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        if let Some(source) = state.source.take() {
            self.output.stop(source);
        }
        if let Some(clip) = state.current.take() {
            self.loader.release(&clip);
        }
        state.pending = None;
        state.fade = Fade::Inactive;
    }
}

/// Single-slot background-music playback with timed crossfades, driven by
/// the shared tick.
pub struct MusicPlayer {
    shared: Arc<MusicShared>,
    updater: Arc<dyn Updater>,
    update_handle: UpdateHandle,
}

impl MusicPlayer {
    pub fn new(
        catalog: Arc<ClipCatalog>,
        loader: Arc<dyn ClipLoader>,
        output: Arc<dyn AudioOutput>,
        updater: Arc<dyn Updater>,
    ) -> Self {
        let shared = Arc::new(MusicShared {
            state: Mutex::new(MusicState {
                volume: 1.0,
                current: None,
                source: None,
                pending: None,
                generation: 0,
                fade: Fade::Inactive,
                disposed: false,
            }),
            catalog,
            loader,
            output,
        });
        let tick_target = shared.clone();
        let update_handle = updater.schedule(Arc::new(move |dt| tick_target.advance(dt)));
        Self {
            shared,
            updater,
            update_handle,
        }
    }

    /// Start a track. Re-requesting the playing track is a no-op; an empty
    /// name stops music with no replacement.
    pub fn play(&self, name: &str) {
        self.shared.play(name);
    }

    /// Fade the current track out over half of `duration_secs`, switch, and
    /// fade the new track in over the other half. Non-positive durations
    /// switch instantly.
    pub fn cross_fade(&self, name: &str, duration_secs: f32) {
        self.shared.cross_fade(name, duration_secs);
    }

    pub fn set_volume(&self, volume: f32) {
        self.shared.set_volume(volume);
    }

    /// Stop playback and tear down the tick registration. Safe to call twice.
    pub fn dispose(&self) {
        self.shared.dispose();
        self.updater.unschedule(self.update_handle);
    }

    /// Name of the track the slot is bound to (it may still be loading).
    pub fn current_track(&self) -> Option<String> {
        self.shared
            .state
            .lock()
            .current
            .as_ref()
            .map(|c| c.name.clone())
    }

    pub fn is_fading(&self) -> bool {
        !matches!(self.shared.state.lock().fade, Fade::Inactive)
    }
}
