//! Publish-subscribe registry with ordered, isolated delivery.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identity token for a registered listener.
///
/// Unsubscribing goes through the token rather than through the closure
/// itself; closures have no usable notion of reference equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

struct Registry<T> {
    /// Listener lists in registration order, keyed by event name.
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener<T>)>>>,
    /// Counter for generating listener ids.
    next_id: AtomicU64,
}

/// An event bus mapping event names to listener lists.
///
/// Cheap to clone; clones share the same registry.
pub struct EventBus<T> {
    inner: Arc<Registry<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry {
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `listener` under `event`, appending to any existing list.
    pub fn subscribe<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let mut listeners = self.inner.listeners.lock();
        listeners
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove the listener registered under `id`. Returns whether anything
    /// was removed; unknown events and ids are a no-op.
    pub fn unsubscribe(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(entry_id, _)| *entry_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Invoke every currently registered listener for `event`,
    /// synchronously, in registration order. No-op without subscribers.
    ///
    /// Each invocation is isolated: a panicking listener is logged and the
    /// remaining listeners still run.
    pub fn publish(&self, event: &str, payload: &T) {
        // Snapshot outside the lock so listeners may themselves
        // subscribe or unsubscribe.
        let snapshot: Vec<(ListenerId, Listener<T>)> = {
            let listeners = self.inner.listeners.lock();
            match listeners.get(event) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for (id, listener) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(payload)));
            if outcome.is_err() {
                tracing::error!(event, listener = ?id, "event listener panicked; continuing");
            }
        }
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .get(event)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    #[test]
    fn test_subscribe_unsubscribe_symmetry() {
        let bus: EventBus<u32> = EventBus::new();
        let seen = Arc::new(AtomicU64::new(0));

        let seen_clone = Arc::clone(&seen);
        let id = bus.subscribe("evt", move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(bus.unsubscribe("evt", id));

        bus.publish("evt", &7);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let bus: EventBus<&str> = EventBus::new();
        let order = Arc::new(PlMutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe("evt", move |_| order.lock().push(tag));
        }

        bus.publish("evt", &"payload");
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus: EventBus<u32> = EventBus::new();
        bus.publish("nobody-home", &1);
        assert_eq!(bus.listener_count("nobody-home"), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let bus: EventBus<u32> = EventBus::new();
        let id = bus.subscribe("evt", |_| {});
        assert!(!bus.unsubscribe("other", id));
        assert!(bus.unsubscribe("evt", id));
        assert!(!bus.unsubscribe("evt", id));
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let bus: EventBus<u32> = EventBus::new();
        let seen = Arc::new(AtomicU64::new(0));

        bus.subscribe("evt", |_| panic!("listener bug"));
        let seen_clone = Arc::clone(&seen);
        bus.subscribe("evt", move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish("evt", &1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_closure_distinct_identity() {
        let bus: EventBus<u32> = EventBus::new();
        let seen = Arc::new(AtomicU64::new(0));

        let a = Arc::clone(&seen);
        let first = bus.subscribe("evt", move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let b = Arc::clone(&seen);
        bus.subscribe("evt", move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });

        // Removing one registration leaves the other
        assert!(bus.unsubscribe("evt", first));
        bus.publish("evt", &1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
