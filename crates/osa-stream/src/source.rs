//! An editable, observable ordered multiset.

use crate::stream::{ChangeStream, Observer, SharedStream, Subscription};
use crate::subscribers::SubscriberSet;
use osa_core::change::{Change, ChangeSet};
use osa_core::error::StreamError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

struct SourceShared<T> {
    state: Mutex<SourceState<T>>,
    subscribers: SubscriberSet<T>,
}

struct SourceState<T> {
    items: Vec<T>,
    /// Set once by `fail`;  the source is dead from then on.
    failure: Option<StreamError>,
}

/// An ordered multiset whose edits publish as one `ChangeSet` per `edit`
/// call.  Clones share the same underlying collection.
///
/// The state lock is held across delivery, so every observer receives this
/// source's batches in exactly the order the edits applied.  The flip side
/// is a hard contract:  an observer must not edit the source from inside
/// its callback.  Route through `subscribe_channel` when that is needed.
pub struct SourceSet<T> {
    shared: Arc<SourceShared<T>>,
}

impl<T> Clone for SourceSet<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: PartialEq + Clone + 'static> SourceSet<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SourceShared {
                state: Mutex::new(SourceState {
                    items: Vec::new(),
                    failure: None,
                }),
                subscribers: SubscriberSet::new(),
            }),
        }
    }

    /// Apply any number of edits as one atomic batch.  Observers see the
    /// whole batch or nothing;  a batch with no effective edits publishes
    /// nothing at all.  Edits after `fail` are ignored.
    pub fn edit<F>(&self, edits: F)
    where
        F: FnOnce(&mut SourceEditor<'_, T>),
    {
        let mut state = self.shared.state.lock();
        if state.failure.is_some() {
            return;
        }
        let mut editor = SourceEditor {
            items: &mut state.items,
            changes: Vec::new(),
        };
        edits(&mut editor);
        let changes = editor.changes;

        if changes.is_empty() {
            return;
        }
        let batch: ChangeSet<T> = changes.into();
        // Delivered under the state lock:  batch order is edit order.
        self.shared.subscribers.notify_changes(&batch);
    }

    /// Append one item.
    pub fn add(&self, item: T) {
        self.edit(|source| source.add(item));
    }

    /// Append several items as a single `AddRange`.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.edit(|source| source.add_all(items));
    }

    /// Remove the first stored occurrence.  Returns false, publishing
    /// nothing, when the item is absent.
    pub fn remove(&self, item: &T) -> bool {
        let mut removed = false;
        self.edit(|source| removed = source.remove(item));
        removed
    }

    /// Remove the first stored occurrence of each given item.  Returns how
    /// many were actually removed.
    pub fn remove_all(&self, items: impl IntoIterator<Item = T>) -> usize {
        let mut removed = 0;
        self.edit(|source| removed = source.remove_all(items));
        removed
    }

    /// Swap one stored occurrence for a new item, in place.
    pub fn replace(&self, previous: &T, current: T) -> bool {
        let mut replaced = false;
        self.edit(|source| replaced = source.replace(previous, current));
        replaced
    }

    /// Signal that a present item mutated in place.
    pub fn refresh(&self, item: &T) -> bool {
        let mut refreshed = false;
        self.edit(|source| refreshed = source.refresh(item));
        refreshed
    }

    /// Remove everything, publishing one `Clear` carrying the removed items.
    pub fn clear(&self) {
        self.edit(|source| source.clear());
    }

    /// Fail the stream:  deliver a terminal error to every observer, sever
    /// them, and discard the contents.  The source is dead afterwards;
    /// later edits are ignored and later subscribers receive the stored
    /// error instead of a replay.  Only the first failure counts.
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.shared.state.lock();
        if state.failure.is_some() {
            return;
        }
        let error = StreamError::Source(message.into());
        debug!(error = %error, "source failed");
        state.items.clear();
        state.failure = Some(error.clone());
        // Delivered under the state lock, like any batch
        self.shared.subscribers.notify_error(error);
        self.shared.subscribers.clear();
    }

    /// Whether `fail` was called.
    pub fn is_failed(&self) -> bool {
        self.shared.state.lock().failure.is_some()
    }

    /// Current contents, in order.
    pub fn items(&self) -> Vec<T> {
        self.shared.state.lock().items.clone()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.shared.state.lock().items.contains(item)
    }

    /// Stored occurrences of one item.
    pub fn count(&self, item: &T) -> usize {
        self.shared
            .state
            .lock()
            .items
            .iter()
            .filter(|stored| *stored == item)
            .count()
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().items.is_empty()
    }

    /// Handle for passing this source to a combination.
    pub fn as_stream(&self) -> SharedStream<T>
    where
        T: Send,
    {
        Arc::new(self.clone())
    }
}

impl<T: PartialEq + Clone + 'static> Default for SourceSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq + Clone + 'static> ChangeStream<T> for SourceSet<T> {
    /// Registers the observer and replays current contents to it alone as
    /// one `AddRange` batch, ordered against concurrent edits.  On a failed
    /// source the stored error is replayed instead and the returned token
    /// is already disposed.
    fn subscribe(&self, mut observer: Box<dyn Observer<T>>) -> Subscription {
        let state = self.shared.state.lock();
        if let Some(error) = &state.failure {
            observer.on_error(error.clone());
            return Subscription::inert();
        }
        let (slot, subscription) = self.shared.subscribers.insert(observer);
        if !state.items.is_empty() {
            let initial: ChangeSet<T> = vec![Change::AddRange(state.items.clone())].into();
            slot.lock().on_changes(initial);
        }
        subscription
    }
}

/// Edit surface handed to the `edit` closure.  Every mutation records the
/// change it made;  queries see edits applied earlier in the same batch.
pub struct SourceEditor<'a, T> {
    items: &'a mut Vec<T>,
    changes: Vec<Change<T>>,
}

impl<T: PartialEq + Clone> SourceEditor<'_, T> {
    pub fn add(&mut self, item: T) {
        self.items.push(item.clone());
        self.changes.push(Change::Add(item));
    }

    pub fn add_all(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        self.items.extend(items.iter().cloned());
        self.changes.push(Change::AddRange(items));
    }

    /// Remove the first stored occurrence.  Absent items are left alone and
    /// record nothing, which keeps published edits balanced.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|stored| stored == item) {
            Some(pos) => {
                let removed = self.items.remove(pos);
                self.changes.push(Change::Remove(removed));
                true
            }
            None => false,
        }
    }

    /// Remove the first stored occurrence of each given item, recording one
    /// `RemoveRange` that carries only the items actually removed.
    pub fn remove_all(&mut self, items: impl IntoIterator<Item = T>) -> usize {
        let mut removed = Vec::new();
        for item in items {
            if let Some(pos) = self.items.iter().position(|stored| *stored == item) {
                removed.push(self.items.remove(pos));
            }
        }
        let count = removed.len();
        if !removed.is_empty() {
            self.changes.push(Change::RemoveRange(removed));
        }
        count
    }

    /// Swap one stored occurrence for a new item, keeping its position.
    pub fn replace(&mut self, previous: &T, current: T) -> bool {
        match self.items.iter().position(|stored| stored == previous) {
            Some(pos) => {
                let previous = std::mem::replace(&mut self.items[pos], current.clone());
                self.changes.push(Change::Replace { previous, current });
                true
            }
            None => false,
        }
    }

    /// Record a `Refresh` for a present item.  The stored value is
    /// untouched;  consumers re-read it.
    pub fn refresh(&mut self, item: &T) -> bool {
        if self.items.contains(item) {
            self.changes.push(Change::Refresh(item.clone()));
            true
        } else {
            false
        }
    }

    /// Remove everything, recording one `Clear` with the removed items.
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let removed = std::mem::take(self.items);
        self.changes.push(Change::Clear(removed));
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_batches(source: &SourceSet<i32>) -> (Arc<Mutex<Vec<ChangeSet<i32>>>>, Subscription) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let subscription = source.subscribe_fn(move |changes| sink.lock().push(changes));
        (received, subscription)
    }

    struct ErrorSink {
        errors: Arc<Mutex<Vec<StreamError>>>,
    }

    impl Observer<i32> for ErrorSink {
        fn on_changes(&mut self, _changes: ChangeSet<i32>) {}
        fn on_error(&mut self, error: StreamError) {
            self.errors.lock().push(error);
        }
    }

    #[test]
    fn one_edit_call_publishes_one_batch() {
        let source = SourceSet::new();
        let (received, _subscription) = collect_batches(&source);

        source.edit(|s| {
            s.add(1);
            s.add_all([2, 3]);
            s.remove(&2);
        });

        let batches = received.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![
                Change::Add(1),
                Change::AddRange(vec![2, 3]),
                Change::Remove(2),
            ]
            .into()
        );
        drop(batches);
        assert_eq!(source.items(), vec![1, 3]);
    }

    #[test]
    fn subscribing_replays_current_contents_first() {
        let source = SourceSet::new();
        source.extend([10, 20]);

        let (received, _subscription) = collect_batches(&source);
        source.add(30);

        let batches = received.lock();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec![Change::AddRange(vec![10, 20])].into());
        assert_eq!(batches[1], vec![Change::Add(30)].into());
    }

    #[test]
    fn an_empty_source_replays_nothing() {
        let source: SourceSet<i32> = SourceSet::new();
        let (received, _subscription) = collect_batches(&source);
        assert!(received.lock().is_empty());
    }

    #[test]
    fn ineffective_edits_publish_nothing() {
        let source = SourceSet::new();
        source.add(1);
        let (received, _subscription) = collect_batches(&source);

        assert!(!source.remove(&99));
        assert!(!source.refresh(&99));
        assert!(!source.replace(&99, 100));
        source.edit(|_| {});

        // Only the initial replay arrived
        assert_eq!(received.lock().len(), 1);
    }

    #[test]
    fn duplicates_are_removed_one_at_a_time() {
        let source = SourceSet::new();
        source.extend([5, 5, 7]);

        assert!(source.remove(&5));
        assert_eq!(source.items(), vec![5, 7]);
        assert_eq!(source.count(&5), 1);
        assert!(source.remove(&5));
        assert!(!source.remove(&5));
    }

    #[test]
    fn replace_keeps_position() {
        let source = SourceSet::new();
        source.extend([1, 2, 3]);

        assert!(source.replace(&2, 9));
        assert_eq!(source.items(), vec![1, 9, 3]);
    }

    #[test]
    fn clear_carries_the_removed_items() {
        let source = SourceSet::new();
        source.extend([4, 5]);
        let (received, _subscription) = collect_batches(&source);

        source.clear();

        let batches = received.lock();
        assert_eq!(batches.last(), Some(&vec![Change::Clear(vec![4, 5])].into()));
        drop(batches);
        assert!(source.is_empty());

        // Clearing an empty source publishes nothing further
        source.clear();
        assert_eq!(received.lock().len(), 2);
    }

    #[test]
    fn disposed_subscriptions_hear_nothing_more() {
        let source = SourceSet::new();
        let (received, mut subscription) = collect_batches(&source);

        source.add(1);
        subscription.dispose();
        source.add(2);

        assert_eq!(received.lock().len(), 1);
    }

    #[test]
    fn failing_notifies_and_severs_observers() {
        let source: SourceSet<i32> = SourceSet::new();
        let errors: Arc<Mutex<Vec<StreamError>>> = Arc::new(Mutex::new(Vec::new()));

        let _subscription = source.subscribe(Box::new(ErrorSink {
            errors: errors.clone(),
        }));

        source.fail("disk on fire");
        source.add(1);

        let seen = errors.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], StreamError::Source("disk on fire".to_string()));
    }

    #[test]
    fn failing_is_terminal() {
        let source = SourceSet::new();
        source.extend([1, 2]);
        source.fail("disk on fire");
        assert!(source.is_failed());

        // Contents are discarded and later edits are ignored
        assert!(source.items().is_empty());
        source.add(3);
        assert!(!source.remove(&1));
        assert!(source.is_empty());

        // Only the first failure counts
        source.fail("second opinion");

        // Late subscribers get the stored error, never a replay
        let errors: Arc<Mutex<Vec<StreamError>>> = Arc::new(Mutex::new(Vec::new()));
        let subscription = source.subscribe(Box::new(ErrorSink {
            errors: errors.clone(),
        }));
        assert!(subscription.is_disposed());
        let seen = errors.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], StreamError::Source("disk on fire".to_string()));
    }
}
