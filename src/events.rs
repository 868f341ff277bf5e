//! Connection lifecycle events emitted by key-value stores.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle events a store can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    Connect,
    Ready,
    Error,
    Close,
    Reconnecting,
    End,
    Warning,
}

impl StoreEvent {
    /// Every event a listener can subscribe to.
    pub const ALL: [StoreEvent; 7] = [
        StoreEvent::Connect,
        StoreEvent::Ready,
        StoreEvent::Error,
        StoreEvent::Close,
        StoreEvent::Reconnecting,
        StoreEvent::End,
        StoreEvent::Warning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreEvent::Connect => "connect",
            StoreEvent::Ready => "ready",
            StoreEvent::Error => "error",
            StoreEvent::Close => "close",
            StoreEvent::Reconnecting => "reconnecting",
            StoreEvent::End => "end",
            StoreEvent::Warning => "warning",
        }
    }
}

impl fmt::Display for StoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a listener receives when an event fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventPayload {
    pub event: StoreEvent,
    /// Error or warning text, when the event carries one.
    pub message: Option<String>,
}

/// Handle returned by [`EventEmitter::on`] and [`EventEmitter::once`],
/// used to remove the listener again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&EventPayload) + Send + Sync>;

struct Registration {
    event: StoreEvent,
    once: bool,
    listener: Listener,
}

/// Listener registry owned by a store.
///
/// Listeners run synchronously on the task that emits the event, in no
/// particular order. Nothing is buffered: an event emitted before a
/// listener is registered is not replayed to it.
#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    listeners: DashMap<ListenerId, Registration>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener invoked on every `event`.
    pub fn on<F>(&self, event: StoreEvent, listener: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.register(event, false, Arc::new(listener))
    }

    /// Register a listener invoked on the next `event` only.
    pub fn once<F>(&self, event: StoreEvent, listener: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.register(event, true, Arc::new(listener))
    }

    /// Remove a listener. Returns `false` if it was not registered for
    /// `event` (already removed, or a spent `once` listener).
    pub fn off(&self, event: StoreEvent, id: ListenerId) -> bool {
        self.listeners
            .remove_if(&id, |_, registration| registration.event == event)
            .is_some()
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: StoreEvent) -> usize {
        self.listeners
            .iter()
            .filter(|entry| entry.value().event == event)
            .count()
    }

    /// Deliver `event` to its listeners.
    pub fn emit(&self, event: StoreEvent, message: Option<String>) {
        // Collect first so no shard lock is held while listeners run.
        let matching: Vec<(ListenerId, bool, Listener)> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().event == event)
            .map(|entry| {
                let registration = entry.value();
                (*entry.key(), registration.once, registration.listener.clone())
            })
            .collect();

        if matching.is_empty() {
            return;
        }

        let payload = EventPayload { event, message };
        for (id, once, listener) in matching {
            // A concurrent emit may have consumed this once-listener already.
            if once && self.listeners.remove(&id).is_none() {
                continue;
            }
            listener(&payload);
        }
    }

    fn register(&self, event: StoreEvent, once: bool, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(
            id,
            Registration {
                event,
                once,
                listener,
            },
        );
        id
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
