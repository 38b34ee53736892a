//! The subscribable seam:  observers, streams, and subscription tokens.

use osa_core::change::ChangeSet;
use osa_core::error::StreamError;
use std::sync::Arc;

/// Consumer half of a change stream.
pub trait Observer<T>: Send {
    /// One settled batch of edits.  Batches from a single stream arrive in
    /// order;  an empty batch is never delivered.
    fn on_changes(&mut self, changes: ChangeSet<T>);

    /// Terminal failure.  No further batches will arrive.
    fn on_error(&mut self, _error: StreamError) {}
}

/// Closures observe changes and ignore errors.
impl<T, F> Observer<T> for F
where
    F: FnMut(ChangeSet<T>) + Send,
{
    fn on_changes(&mut self, changes: ChangeSet<T>) {
        self(changes)
    }
}

/// Producer half:  anything that publishes batched edits.
///
/// Implementations replay their current contents to a new observer as one
/// initial `AddRange` batch (skipped when empty), before any live batch.
pub trait ChangeStream<T> {
    fn subscribe(&self, observer: Box<dyn Observer<T>>) -> Subscription;

    /// Subscribe with a closure that only cares about changes.
    fn subscribe_fn<F>(&self, observer: F) -> Subscription
    where
        F: FnMut(ChangeSet<T>) + Send + 'static,
        Self: Sized,
    {
        self.subscribe(Box::new(observer))
    }
}

/// A stream handle that can be shared across threads and combinations.
pub type SharedStream<T> = Arc<dyn ChangeStream<T> + Send + Sync>;

/// RAII cancellation token for one observer registration.
///
/// Dropping the token unsubscribes.  Call `detach` to keep the registration
/// alive for the lifetime of the stream instead.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A token that was never registered anywhere.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Stop delivery to the observer.  Idempotent.
    pub fn dispose(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Give up the token without unsubscribing.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispose_runs_the_cancel_hook_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = cancelled.clone();
        let mut subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!subscription.is_disposed());
        subscription.dispose();
        subscription.dispose();
        drop(subscription);

        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels_unless_detached() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        {
            let counter = cancelled.clone();
            let _subscription = Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);

        let kept = Arc::new(AtomicUsize::new(0));
        {
            let counter = kept.clone();
            Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .detach();
        }
        assert_eq!(kept.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inert_token_is_already_disposed() {
        let mut subscription = Subscription::inert();
        assert!(subscription.is_disposed());
        subscription.dispose();
    }
}
