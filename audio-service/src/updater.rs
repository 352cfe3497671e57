use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub type UpdateFn = Arc<dyn Fn(f32) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateHandle(u64);

/// Per-tick scheduling capability. The host invokes every scheduled callback
/// once per frame with the elapsed seconds.
pub trait Updater: Send + Sync {
    fn schedule(&self, callback: UpdateFn) -> UpdateHandle;
    fn unschedule(&self, handle: UpdateHandle);
}

/// Updater stepped manually by the owning loop (or a test).
#[derive(Default)]
pub struct StepUpdater {
    callbacks: Mutex<Vec<(UpdateHandle, UpdateFn)>>,
    next_handle: AtomicU64,
}

impl StepUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every scheduled callback, in registration order.
    pub fn step(&self, delta_secs: f32) {
        let callbacks: Vec<UpdateFn> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(delta_secs);
        }
    }

    pub fn scheduled_count(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl Updater for StepUpdater {
    fn schedule(&self, callback: UpdateFn) -> UpdateHandle {
        let handle = UpdateHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((handle, callback));
        handle
    }

    fn unschedule(&self, handle: UpdateHandle) {
        self.callbacks.lock().retain(|(h, _)| *h != handle);
    }
}
