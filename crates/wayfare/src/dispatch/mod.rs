//! In-process publish/subscribe dispatcher.
//!
//! Producers (commands, the agent coordinator) publish [`ChatEvent`]s and
//! consumers (SSE connections) drain per-subscriber FIFO queues. There is no
//! global event log and nothing survives a restart: an event published with
//! zero subscribers is dropped. Ordering is guaranteed per subscriber only.

mod event;

pub use event::{ChatEvent, EventKind};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;
use tracing::debug;

/// Per-subscriber FIFO queue with a wakeup handle.
struct SubscriberQueue {
    events: std::sync::Mutex<VecDeque<ChatEvent>>,
    notify: Notify,
}

impl SubscriberQueue {
    fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn push(&self, event: ChatEvent) {
        self.events
            .lock()
            .expect("subscriber queue poisoned")
            .push_back(event);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<ChatEvent> {
        self.events
            .lock()
            .expect("subscriber queue poisoned")
            .pop_front()
    }
}

/// Event dispatcher with per-subscriber, FIFO, unbounded queues.
///
/// The dispatcher is constructed once by the application context and shared
/// via `Arc`; components publish or subscribe through it rather than through
/// any process-global state.
pub struct EventDispatcher {
    /// Event kind -> subscriber names, in subscription order.
    subscriptions: DashMap<EventKind, Vec<String>>,
    /// Subscriber name -> pending event queue.
    subscribers: DashMap<String, Arc<SubscriberQueue>>,
}

impl EventDispatcher {
    /// Create a new, empty dispatcher.
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            subscribers: DashMap::new(),
        }
    }

    /// Subscribe `name` to events of `kind`.
    ///
    /// Idempotent: subscribing the same pair twice has no additional effect.
    /// Ensures the subscriber's queue exists even before any event arrives.
    pub fn subscribe(&self, name: &str, kind: EventKind) {
        let mut subs = self.subscriptions.entry(kind).or_default();
        if !subs.iter().any(|s| s == name) {
            subs.push(name.to_string());
        }
        drop(subs);

        self.subscribers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(SubscriberQueue::new()));
    }

    /// Remove the `name` -> `kind` relation. No-op when absent.
    ///
    /// The subscriber's queue is kept; pending events stay consumable.
    pub fn unsubscribe(&self, name: &str, kind: EventKind) {
        if let Some(mut subs) = self.subscriptions.get_mut(&kind) {
            subs.retain(|s| s != name);
        }
    }

    /// Drop a subscriber entirely: all relations and its queue.
    ///
    /// Used when an event-stream connection closes.
    pub fn remove_subscriber(&self, name: &str) {
        for mut entry in self.subscriptions.iter_mut() {
            entry.value_mut().retain(|s| s != name);
        }
        if self.subscribers.remove(name).is_some() {
            debug!(subscriber = name, "removed event subscriber");
        }
    }

    /// Publish an event to every subscriber of its kind.
    ///
    /// Events with zero subscribers are silently dropped; they are not
    /// buffered for late subscribers.
    pub fn publish(&self, event: ChatEvent) {
        let Some(subs) = self.subscriptions.get(&event.kind()) else {
            return;
        };
        for name in subs.iter() {
            if let Some(queue) = self.subscribers.get(name) {
                queue.push(event.clone());
            }
        }
    }

    /// Non-blocking dequeue of the oldest pending event for `name`.
    ///
    /// Returns `None` (not an error) when the subscriber is unknown or its
    /// queue is empty.
    pub fn get_event(&self, name: &str) -> Option<ChatEvent> {
        self.subscribers.get(name)?.pop()
    }

    /// Dequeue the oldest pending event, waiting up to `timeout` for one.
    ///
    /// Blocks on the subscriber's wakeup handle instead of busy-polling.
    /// Returns `None` on timeout or when the subscriber is unknown.
    pub async fn wait_event(&self, name: &str, timeout: Duration) -> Option<ChatEvent> {
        let queue = Arc::clone(self.subscribers.get(name)?.value());
        if let Some(event) = queue.pop() {
            return Some(event);
        }
        match tokio::time::timeout(timeout, queue.notify.notified()).await {
            Ok(()) => queue.pop(),
            Err(_) => None,
        }
    }

    /// Drain every subscriber queue. Subscriptions are kept.
    ///
    /// Gives tests and server shutdown a deterministic teardown point.
    pub fn shutdown(&self) {
        for entry in self.subscribers.iter() {
            while entry.value().pop().is_some() {}
        }
    }

    /// Number of registered subscriber queues.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
