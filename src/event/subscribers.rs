//! Subscribers - ordered observer list with RAII unsubscription
//!
//! Observers are invoked synchronously, in registration order, on the
//! notifying thread. The list is snapshotted before delivery so an observer
//! may subscribe, unsubscribe or trigger further notifications re-entrantly.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct SubscriberList<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback<E>)>>,
}

impl<E> SubscriberList<E> {
    fn remove(&self, id: u64) {
        self.entries.lock().retain(|(entry_id, _)| *entry_id != id);
    }
}

/// Observer list for events of type `E`
///
/// Cloning creates a new handle to the **same** list.
pub struct Subscribers<E> {
    inner: Arc<SubscriberList<E>>,
}

impl<E> Clone for Subscribers<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(SubscriberList {
                next_id: AtomicU64::new(0),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}

impl<E> Subscribers<E> {
    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Check if no observer is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every observer (outstanding guards become inert)
    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }
}

impl<E: 'static> Subscribers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it stays registered while the guard lives
    pub fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.lock().push((id, Arc::new(callback)));

        let weak: Weak<SubscriberList<E>> = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(list) = weak.upgrade() {
                    list.remove(id);
                }
            })),
        }
    }

    /// Deliver `event` to every observer registered at call time
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in snapshot {
            callback(event);
        }
    }

}

/// Guard returned by `subscribe`; dropping it removes the observer
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Remove the observer now
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keep the observer registered for the lifetime of the list
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
