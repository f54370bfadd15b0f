//! Synchronous change notification.
//!
//! Observers register a callback and receive the [`BufferId`] of every buffer whose tree was
//! replaced. Delivery happens on the notifying thread, in registration order. The observer list
//! is snapshotted before delivery, so a callback may subscribe, unsubscribe or read the store
//! without deadlocking.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier the host editor assigns to a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl BufferId {
    /// Wrap a host-supplied id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for BufferId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Change observer callback type.
pub type ChangeObserver = Arc<dyn Fn(BufferId) + Send + Sync>;

/// Ordered list of change observers.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: Mutex<Vec<(SubscriptionId, ChangeObserver)>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.len())
            .finish()
    }
}

impl ChangeNotifier {
    /// Create a notifier with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It runs after every observer registered before it.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(BufferId) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    /// Returns `true` if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }

    /// Deliver `buffer` to every observer registered at the time of the call.
    pub fn notify(&self, buffer: BufferId) {
        let snapshot: Vec<ChangeObserver> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        tracing::trace!(%buffer, observers = snapshot.len(), "notifying tree change");
        for observer in snapshot {
            observer(buffer);
        }
    }
}
