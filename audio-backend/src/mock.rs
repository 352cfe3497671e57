//! Recording backend for tests: no device, no threads, every call logged.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AudioOutput, PlayParams, SourceId, Vec3};
use clip_store::ClipAsset;

#[derive(Debug, Clone)]
pub struct MockSource {
    pub frames: u64,
    pub duration_secs: f32,
    pub pitch: f32,
    pub looped: bool,
    /// Every gain ever applied, `begin` included.
    pub gains: Vec<f32>,
    pub positions: Vec<Vec3>,
    pub stopped: bool,
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    sources: HashMap<SourceId, MockSource>,
}

/// [`AudioOutput`] that records begin/gain/position/stop calls so tests can
/// assert audible behavior without a device.
#[derive(Default)]
pub struct MockOutput {
    state: Mutex<MockState>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sources ever begun.
    pub fn begun_count(&self) -> usize {
        self.state.lock().next_id as usize
    }

    /// Sources begun and not yet stopped.
    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .sources
            .values()
            .filter(|s| !s.stopped)
            .count()
    }

    /// Most recently applied gain for a source.
    pub fn gain_of(&self, id: SourceId) -> Option<f32> {
        self.state
            .lock()
            .sources
            .get(&id)
            .and_then(|s| s.gains.last().copied())
    }

    pub fn is_stopped(&self, id: SourceId) -> bool {
        self.state
            .lock()
            .sources
            .get(&id)
            .map(|s| s.stopped)
            .unwrap_or(true)
    }

    pub fn source(&self, id: SourceId) -> Option<MockSource> {
        self.state.lock().sources.get(&id).cloned()
    }

    /// Ids in begin order, for tests that need to inspect every source.
    pub fn source_ids(&self) -> Vec<SourceId> {
        let state = self.state.lock();
        let mut ids: Vec<SourceId> = state.sources.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    /// The id most recently handed out, if any.
    pub fn last_source(&self) -> Option<SourceId> {
        let state = self.state.lock();
        state.sources.keys().copied().max_by_key(|id| id.0)
    }
}

impl AudioOutput for MockOutput {
    fn begin(&self, asset: &Arc<ClipAsset>, params: PlayParams) -> SourceId {
        let mut state = self.state.lock();
        let id = SourceId(state.next_id);
        state.next_id += 1;
        state.sources.insert(
            id,
            MockSource {
                frames: asset.frames,
                duration_secs: asset.duration_secs(),
                pitch: params.pitch,
                looped: params.looped,
                gains: vec![params.gain],
                positions: params.position.into_iter().collect(),
                stopped: false,
            },
        );
        id
    }

    fn set_gain(&self, id: SourceId, gain: f32) {
        if let Some(source) = self.state.lock().sources.get_mut(&id) {
            source.gains.push(gain);
        }
    }

    fn set_position(&self, id: SourceId, position: Vec3) {
        if let Some(source) = self.state.lock().sources.get_mut(&id) {
            source.positions.push(position);
        }
    }

    fn stop(&self, id: SourceId) {
        if let Some(source) = self.state.lock().sources.get_mut(&id) {
            source.stopped = true;
        }
    }
}
