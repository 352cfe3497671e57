use std::sync::{Arc, Weak};

use audio_backend::{AudioOutput, PlayParams, SourceId, Vec3};
use clip_store::{ClipDescriptor, ClipLoader, PendingClip, Resolution};

use crate::SpatialAnchor;

pub type VoiceId = i64;

/// Returned by failed plays; also the identity of an idle voice.
pub const INVALID_VOICE_ID: VoiceId = -1;

/// Duration reported while the asset load is still outstanding. Keeps the
/// voice alive through the load window.
const DURATION_UNRESOLVED: f32 = f32::INFINITY;

/// Where a voice's sound sits in the world.
#[derive(Clone, Default)]
pub enum Placement {
    #[default]
    Centered,
    At(Vec3),
    Following(Weak<dyn SpatialAnchor>),
}

struct PendingLoad {
    /// Generation the load was issued for; completions for any other
    /// generation are stale and discarded.
    ticket: u64,
    handle: PendingClip,
}

/// One playback slot. Alive iff `elapsed < duration || looped`; idle the
/// instant it is reset. Created by the pool, reused forever, only disposed
/// with the pool.
pub struct Voice {
    id: VoiceId,
    elapsed: f32,
    duration: f32,
    looped: bool,
    volume_scale: f32,
    generation: u64,
    clip: Option<Arc<ClipDescriptor>>,
    placement: Placement,
    pending: Option<PendingLoad>,
    source: Option<SourceId>,
}

impl Voice {
    pub fn new() -> Self {
        Self {
            id: INVALID_VOICE_ID,
            elapsed: 0.0,
            duration: 0.0,
            looped: false,
            volume_scale: 1.0,
            generation: 0,
            clip: None,
            placement: Placement::Centered,
            pending: None,
            source: None,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.elapsed < self.duration || self.looped
    }

    pub fn clip(&self) -> Option<&Arc<ClipDescriptor>> {
        self.clip.as_ref()
    }

    /// Bind a fresh identity and clear per-play state. Valid on both new and
    /// previously used (idle) voices.
    pub fn acquire(&mut self, id: VoiceId, volume_scale: f32) {
        self.id = id;
        self.elapsed = 0.0;
        self.duration = DURATION_UNRESOLVED;
        self.looped = false;
        self.volume_scale = volume_scale;
        self.clip = None;
        self.placement = Placement::Centered;
        self.pending = None;
    }

    /// Start playing `clip`. Returns immediately; audible output begins when
    /// the asset is resident, which may be now or on a later tick.
    pub fn play(
        &mut self,
        clip: Arc<ClipDescriptor>,
        placement: Placement,
        loader: &dyn ClipLoader,
        output: &dyn AudioOutput,
    ) {
        // Re-playing an already-bound voice supersedes whatever it was doing.
        if let Some(old) = self.source.take() {
            output.stop(old);
        }
        self.generation += 1;
        self.elapsed = 0.0;
        self.duration = DURATION_UNRESOLVED;
        self.looped = false;
        self.placement = placement;
        self.clip = Some(clip.clone());

        match loader.resolve(&clip) {
            Resolution::Ready(asset) => self.start_audible(&clip, &asset, output),
            Resolution::Pending(handle) => {
                self.pending = Some(PendingLoad {
                    ticket: self.generation,
                    handle,
                });
            }
        }
    }

    /// Advance the lifetime clock, complete a due asset load, and track the
    /// follow target if one is set.
    pub fn advance(&mut self, delta_secs: f32, output: &dyn AudioOutput) {
        self.poll_pending(output);
        self.elapsed += delta_secs;
        if let (Some(source), Placement::Following(anchor)) = (self.source, &self.placement) {
            if let Some(anchor) = anchor.upgrade() {
                output.set_position(source, anchor.position());
            }
        }
    }

    /// Rescale this voice's gain on top of the clip's base volume.
    pub fn set_volume_scale(&mut self, scale: f32, output: &dyn AudioOutput) {
        self.volume_scale = scale;
        if let (Some(source), Some(clip)) = (self.source, &self.clip) {
            output.set_gain(source, clip.volume * scale);
        }
    }

    /// Stop audible output and return to idle. Yields the descriptor the
    /// voice was bound to so the pool can release its reference.
    pub fn reset(&mut self, output: &dyn AudioOutput) -> Option<Arc<ClipDescriptor>> {
        if let Some(source) = self.source.take() {
            output.stop(source);
        }
        self.id = INVALID_VOICE_ID;
        self.elapsed = 0.0;
        self.duration = 0.0;
        self.looped = false;
        self.volume_scale = 1.0;
        self.placement = Placement::Centered;
        // Dropping the pending handle makes any in-flight load undeliverable.
        self.pending = None;
        self.clip.take()
    }

    fn poll_pending(&mut self, output: &dyn AudioOutput) {
        let Some(pending) = &self.pending else {
            return;
        };
        let Some(outcome) = pending.handle.try_take() else {
            return;
        };
        let stale = pending.ticket != self.generation;
        self.pending = None;
        if stale {
            tracing::debug!(voice = self.id, "discarding stale load completion");
            return;
        }
        match outcome {
            Ok(asset) => {
                if let Some(clip) = self.clip.clone() {
                    self.start_audible(&clip, &asset, output);
                }
            }
            Err(err) => {
                let clip = self
                    .clip
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("<unbound>");
                tracing::warn!(voice = self.id, clip, error = %err, "load failed, reclaiming voice");
                // Dead as of this tick; the pool reclaims it on this pass.
                self.duration = 0.0;
            }
        }
    }

    fn start_audible(&mut self, clip: &ClipDescriptor, asset: &Arc<clip_store::ClipAsset>, output: &dyn AudioOutput) {
        let params = PlayParams {
            gain: clip.volume * self.volume_scale,
            pitch: clip.pitch,
            looped: clip.looped,
            position: self.current_position(),
        };
        self.source = Some(output.begin(asset, params));
        self.duration = asset.duration_secs();
        self.looped = clip.looped;
    }

    fn current_position(&self) -> Option<Vec3> {
        match &self.placement {
            Placement::Centered => None,
            Placement::At(position) => Some(*position),
            Placement::Following(anchor) => anchor.upgrade().map(|a| a.position()),
        }
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}
