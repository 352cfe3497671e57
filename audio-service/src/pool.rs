use std::collections::HashMap;
use std::sync::Arc;

use clip_store::{clip_key, ClipDescriptor, ClipLoader};

use crate::voice::{Voice, VoiceId};

/// Idle voices created up front so the common case never allocates.
pub const PREWARM_VOICES: usize = 10;

/// Arena of voice slots. Grows on demand, never shrinks; slots are reused
/// through reset/acquire, not dropped. Every slot that reports `!is_alive`
/// has been reset (or was never played), so reuse needs no cleanup.
pub struct VoicePool {
    voices: Vec<Voice>,
    next_id: VoiceId,
}

impl VoicePool {
    pub fn with_prewarm(count: usize) -> Self {
        Self {
            voices: (0..count).map(|_| Voice::new()).collect(),
            next_id: 0,
        }
    }

    /// Index of a freshly acquired voice: the first free slot, or a new one
    /// appended at the end. The identity handed out is strictly increasing.
    pub fn acquire_free(&mut self, volume_scale: f32) -> usize {
        let index = match self.voices.iter().position(|v| !v.is_alive()) {
            Some(index) => index,
            None => {
                self.voices.push(Voice::new());
                self.voices.len() - 1
            }
        };
        let id = self.next_id;
        self.next_id += 1;
        self.voices[index].acquire(id, volume_scale);
        index
    }

    pub fn find_by_id(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.id() == id)
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Voice {
        &mut self.voices[index]
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }
}

struct RefEntry {
    clip: Arc<ClipDescriptor>,
    count: usize,
}

/// Clip-name → number of live voices currently bound to that clip. Counts
/// never go negative; entries persist at zero until the loader releases them.
#[derive(Default)]
pub struct ClipRefCounts {
    entries: HashMap<String, RefEntry>,
}

impl ClipRefCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(&mut self, clip: &Arc<ClipDescriptor>) {
        self.entries
            .entry(clip_key(&clip.name))
            .and_modify(|e| e.count += 1)
            .or_insert_with(|| RefEntry {
                clip: clip.clone(),
                count: 1,
            });
    }

    pub fn release(&mut self, clip: &ClipDescriptor) {
        if let Some(entry) = self.entries.get_mut(&clip_key(&clip.name)) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries
            .get(&clip_key(name))
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Ask the loader to drop cached data for every clip no voice is playing.
    pub fn release_unreferenced(&self, loader: &dyn ClipLoader) {
        for entry in self.entries.values().filter(|e| e.count == 0) {
            loader.release(&entry.clip);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
