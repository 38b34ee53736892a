//! Observer registry shared by every publisher in the crate.

use crate::stream::{Observer, Subscription};
use osa_core::change::ChangeSet;
use osa_core::error::StreamError;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use ulid::Ulid;

/// An observer parked in the registry, locked per delivery.
pub type ObserverSlot<T> = Arc<Mutex<Box<dyn Observer<T>>>>;

type Registry<T> = Arc<RwLock<HashMap<Ulid, ObserverSlot<T>>>>;

/// The set of observers registered on one stream.
///
/// Notification snapshots the registry under its read lock, then invokes
/// each observer outside it.  An observer can therefore dispose its own (or
/// any other) subscription from inside a callback without deadlocking
/// against the registry.
pub struct SubscriberSet<T> {
    registry: Registry<T>,
}

impl<T> SubscriberSet<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register an observer.  Returns the slot, so the caller can deliver
    /// an initial batch to this observer alone, and the cancellation token.
    pub fn insert(&self, observer: Box<dyn Observer<T>>) -> (ObserverSlot<T>, Subscription)
    where
        T: 'static,
    {
        let id = Ulid::new();
        let slot: ObserverSlot<T> = Arc::new(Mutex::new(observer));
        self.registry.write().insert(id, slot.clone());

        let registry = Arc::downgrade(&self.registry);
        let subscription = Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.write().remove(&id);
            }
        });

        (slot, subscription)
    }

    /// Deliver one batch to every registered observer.
    pub fn notify_changes(&self, changes: &ChangeSet<T>)
    where
        T: Clone,
    {
        for slot in self.snapshot() {
            slot.lock().on_changes(changes.clone());
        }
    }

    /// Deliver a terminal error to every registered observer.
    pub fn notify_error(&self, error: StreamError) {
        for slot in self.snapshot() {
            slot.lock().on_error(error.clone());
        }
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.registry.write().clear();
    }

    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }

    fn snapshot(&self) -> Vec<ObserverSlot<T>> {
        self.registry.read().values().cloned().collect()
    }
}

impl<T> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SubscriberSet<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osa_core::change::Change;

    fn counting_observer(log: Arc<Mutex<Vec<usize>>>, tag: usize) -> Box<dyn Observer<i32>> {
        Box::new(move |changes: ChangeSet<i32>| {
            log.lock().push(tag * 100 + changes.len());
        })
    }

    #[test]
    fn every_registered_observer_hears_a_batch() {
        let subscribers: SubscriberSet<i32> = SubscriberSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let (_, _sub_a) = subscribers.insert(counting_observer(log.clone(), 1));
        let (_, _sub_b) = subscribers.insert(counting_observer(log.clone(), 2));
        assert_eq!(subscribers.len(), 2);

        let batch: ChangeSet<i32> = vec![Change::Add(7)].into();
        subscribers.notify_changes(&batch);

        let mut heard = log.lock().clone();
        heard.sort_unstable();
        assert_eq!(heard, vec![101, 201]);
    }

    #[test]
    fn disposed_registrations_stop_hearing() {
        let subscribers: SubscriberSet<i32> = SubscriberSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let (_, mut sub) = subscribers.insert(counting_observer(log.clone(), 1));
        sub.dispose();
        assert!(subscribers.is_empty());

        subscribers.notify_changes(&vec![Change::Add(1)].into());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn an_observer_may_dispose_itself_mid_delivery() {
        let subscribers: SubscriberSet<i32> = SubscriberSet::new();
        let parked: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot_parked = parked.clone();
        let (_, sub) = subscribers.insert(Box::new(move |_changes: ChangeSet<i32>| {
            if let Some(own) = slot_parked.lock().take() {
                drop(own);
            }
        }));
        *parked.lock() = Some(sub);

        subscribers.notify_changes(&vec![Change::Add(1)].into());
        assert!(subscribers.is_empty());

        // A second delivery reaches nobody
        subscribers.notify_changes(&vec![Change::Add(2)].into());
    }
}
