//! Synchronous observer used by connectors and lab sessions.
//!
//! Listeners subscribe to one event name or to every event. They are invoked
//! on the emitting task, in registration order, before `emit` returns.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// An event carried by an [`EventBus`].
pub trait Event: Send + Sync + 'static {
    /// Wire name, e.g. `session_started`.
    fn name(&self) -> &'static str;
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Subscription<E> {
    id: SubscriptionId,
    event: Option<String>,
    listener: Listener<E>,
}

struct Inner<E> {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription<E>>>,
}

/// Cloneable event bus; clones share the same listener list.
pub struct EventBus<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.subscriptions.lock().len())
            .finish()
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for events with the given name.
    pub fn subscribe<F>(&self, event: &str, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(Some(event.to_string()), Arc::new(listener))
    }

    /// Listen for every event emitted on this bus.
    pub fn subscribe_all<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(listener))
    }

    /// Returns `true` if a listener was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.inner.subscriptions.lock();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);
        subscriptions.len() != before
    }

    /// Deliver `event` to every matching listener.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// emit on the same bus without deadlocking.
    pub fn emit(&self, event: &E) {
        let name = event.name();
        let listeners: Vec<Listener<E>> = self
            .inner
            .subscriptions
            .lock()
            .iter()
            .filter(|sub| sub.event.as_deref().map_or(true, |wanted| wanted == name))
            .map(|sub| Arc::clone(&sub.listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    fn register(&self, event: Option<String>, listener: Listener<E>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscriptions.lock().push(Subscription { id, event, listener });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Started(u32),
        Stopped,
    }

    impl Event for Ping {
        fn name(&self) -> &'static str {
            match self {
                Ping::Started(_) => "started",
                Ping::Stopped => "stopped",
            }
        }
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::<Ping>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            bus.subscribe_all(move |_| log.lock().push(label));
        }

        bus.emit(&Ping::Stopped);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn named_subscription_filters_events() {
        let bus = EventBus::<Ping>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe("started", move |event| sink.lock().push(event.clone()));

        bus.emit(&Ping::Stopped);
        bus.emit(&Ping::Started(7));

        assert_eq!(*seen.lock(), vec![Ping::Started(7)]);
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let bus = EventBus::<Ping>::new();
        let id = bus.subscribe_all(|_| {});
        assert_eq!(bus.listener_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn listener_may_emit_reentrantly() {
        let bus = EventBus::<Ping>::new();
        let count = Arc::new(Mutex::new(0));

        let inner_bus = bus.clone();
        bus.subscribe("started", move |_| inner_bus.emit(&Ping::Stopped));
        let counter = Arc::clone(&count);
        bus.subscribe("stopped", move |_| *counter.lock() += 1);

        bus.emit(&Ping::Started(1));
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn debug_output_reports_listener_count() {
        let bus = EventBus::<Ping>::new();
        assert_eq!(format!("{bus:?}"), "EventBus { listeners: 0 }");

        bus.subscribe("started", |_| {});
        assert_eq!(format!("{bus:?}"), "EventBus { listeners: 1 }");
    }
}
