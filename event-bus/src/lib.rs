//! Typed lifecycle event bus.
//!
//! Publishers enqueue from any thread; the owning loop calls [`EventBus::drain`]
//! to deliver queued events to subscribers in FIFO order on its own thread.

use crossbeam_queue::SegQueue;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type SubscriptionId = u64;

struct QueuedEvent {
    type_id: TypeId,
    payload: Box<dyn Any + Send + Sync>,
}

type HandlerFn = Arc<dyn Fn(&dyn Any) + Send + Sync>;

pub struct EventBus {
    queue: SegQueue<QueuedEvent>,
    subscribers: RwLock<HashMap<TypeId, Vec<(SubscriptionId, HandlerFn)>>>,
    next_sub_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            subscribers: RwLock::new(HashMap::new()),
            next_sub_id: AtomicU64::new(1),
        }
    }

    /// Enqueue an event payload. Thread-safe, never blocks.
    pub fn publish<T: Send + Sync + 'static>(&self, payload: T) {
        self.queue.push(QueuedEvent {
            type_id: TypeId::of::<T>(),
            payload: Box::new(payload),
        });
    }

    /// Register a handler for events of type `T`.
    pub fn subscribe<T, F>(&self, handler: F) -> SubscriptionId
    where
        T: Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let sub_id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let boxed: HandlerFn = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<T>() {
                handler(event);
            }
        });
        self.subscribers
            .write()
            .entry(TypeId::of::<T>())
            .or_default()
            .push((sub_id, boxed));
        sub_id
    }

    /// Remove a previously registered handler. Unknown ids are a no-op.
    pub fn unsubscribe(&self, subscription_id: SubscriptionId) {
        let mut map = self.subscribers.write();
        for handlers in map.values_mut() {
            handlers.retain(|(id, _)| *id != subscription_id);
        }
    }

    /// Deliver all queued events synchronously on the calling thread, in
    /// publish order.
    pub fn drain(&self) {
        while let Some(event) = self.queue.pop() {
            let handlers: Vec<HandlerFn> = {
                let map = self.subscribers.read();
                map.get(&event.type_id)
                    .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
                    .unwrap_or_default()
            };
            for handler in handlers {
                handler(event.payload.as_ref());
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
