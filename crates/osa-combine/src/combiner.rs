//! The combination engine.
//!
//! A `Combination` pins an operator to an ordered list of source streams.
//! `run` subscribes to every source and from then on maintains a derived
//! collection that always equals the operator applied to the sources'
//! current contents, emitting one downstream batch per incoming batch.
//!
//! All engine state lives behind one re-entrant critical section.  Incoming
//! batches are incorporated and delivered inside it, one at a time, so
//! downstream observers only ever see settled states.  The price is a hard
//! contract:  a downstream callback must not edit any source of its own
//! combination, nor subscribe to or snapshot the combined stream.  Doing so
//! re-enters the section on the same thread and panics by design, instead
//! of silently interleaving batches.  Callbacks that need to mutate should
//! consume the stream through `osa_stream::subscribe_channel`.

use crate::error::CombineError;
use crate::op::SetOp;
use osa_core::buffer::ChangeAwareSet;
use osa_core::change::{Change, ChangeReason, ChangeSet};
use osa_core::error::{StreamError, UntrackedRemove};
use osa_core::tracker::OccurrenceTracker;
use osa_stream::{ChangeStream, Observer, SharedStream, SubscriberSet, Subscription};
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// A set-algebra expression over ordered source streams.
///
/// The expression is immutable once built;  `run` starts an independent
/// engine each time it is called.
pub struct Combination<T> {
    op: SetOp,
    sources: Vec<SharedStream<T>>,
}

impl<T> std::fmt::Debug for Combination<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combination")
            .field("op", &self.op)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl<T: Eq + Hash + Clone + Send + 'static> Combination<T> {
    /// Build a combination, rejecting operator/source-count mismatches.
    pub fn new(op: SetOp, sources: Vec<SharedStream<T>>) -> Result<Self, CombineError> {
        let required = op.min_sources();
        if sources.len() < required {
            return Err(CombineError::TooFewSources {
                op,
                required,
                actual: sources.len(),
            });
        }
        Ok(Self { op, sources })
    }

    pub fn op(&self) -> SetOp {
        self.op
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Subscribe to every source and start maintaining the combined
    /// collection.  Sources replay their current contents synchronously on
    /// subscription, so the returned stream is already settled against
    /// everything the sources held.
    pub fn run(&self) -> CombinedStream<T> {
        let trackers = self.sources.iter().map(|_| OccurrenceTracker::new()).collect();
        let shared = Arc::new(EngineShared {
            op: self.op,
            state: ReentrantMutex::new(RefCell::new(EngineState {
                trackers,
                result: ChangeAwareSet::new(),
            })),
            downstream: SubscriberSet::new(),
            upstream: Mutex::new(Vec::new()),
            sources: Mutex::new(self.sources.clone()),
            halted: AtomicBool::new(false),
        });

        debug!(op = %self.op, sources = self.sources.len(), "combination running");

        // One critical section covers the whole subscription pass.  Each
        // source's initial replay re-enters it on this thread, so the
        // replay batch is incorporated before the next source attaches.
        let guard = shared.state.lock();
        for (index, source) in self.sources.iter().enumerate() {
            if shared.halted.load(Ordering::Acquire) {
                break;
            }
            let subscription = source.subscribe(Box::new(SourceObserver {
                shared: shared.clone(),
                index,
            }));
            shared.upstream.lock().push(subscription);
            if shared.halted.load(Ordering::Acquire) {
                // A failure during the attach drained `upstream` before
                // this push landed;  sweep again so no source keeps a
                // live observer slot.
                let stragglers = std::mem::take(&mut *shared.upstream.lock());
                for mut subscription in stragglers {
                    subscription.dispose();
                }
                break;
            }
        }
        drop(guard);

        CombinedStream { shared }
    }
}

/// Run a union over the given sources.
pub fn union<T: Eq + Hash + Clone + Send + 'static>(
    sources: Vec<SharedStream<T>>,
) -> Result<CombinedStream<T>, CombineError> {
    Ok(Combination::new(SetOp::Union, sources)?.run())
}

/// Run an intersection over the given sources.
pub fn intersection<T: Eq + Hash + Clone + Send + 'static>(
    sources: Vec<SharedStream<T>>,
) -> Result<CombinedStream<T>, CombineError> {
    Ok(Combination::new(SetOp::Intersection, sources)?.run())
}

/// Run a symmetric difference over the given sources.
pub fn symmetric_difference<T: Eq + Hash + Clone + Send + 'static>(
    sources: Vec<SharedStream<T>>,
) -> Result<CombinedStream<T>, CombineError> {
    Ok(Combination::new(SetOp::SymmetricDifference, sources)?.run())
}

/// Run a relative complement:  the first source minus all the others.
pub fn relative_complement<T: Eq + Hash + Clone + Send + 'static>(
    sources: Vec<SharedStream<T>>,
) -> Result<CombinedStream<T>, CombineError> {
    Ok(Combination::new(SetOp::RelativeComplement, sources)?.run())
}

/// Everything the engine owns, shared between the combined handle and the
/// per-source observers.
struct EngineShared<T: Eq + Hash + Clone> {
    op: SetOp,
    /// The single critical section:  trackers plus result buffer.  The
    /// mutex is re-entrant so initial replays during `run` can step back in
    /// on the subscribing thread;  the `RefCell` turns any attempt to
    /// incorporate a batch while another is mid-delivery on this thread
    /// into a panic instead of interleaved state.
    state: ReentrantMutex<RefCell<EngineState<T>>>,
    downstream: SubscriberSet<T>,
    upstream: Mutex<Vec<Subscription>>,
    /// Keeps the source streams alive while the engine is subscribed.
    sources: Mutex<Vec<SharedStream<T>>>,
    halted: AtomicBool,
}

struct EngineState<T: Eq + Hash + Clone> {
    trackers: Vec<OccurrenceTracker<T>>,
    result: ChangeAwareSet<T>,
}

impl<T: Eq + Hash + Clone> EngineState<T> {
    /// Replay one batch into the tracker of the source that sent it.
    fn apply_to_tracker(
        &mut self,
        index: usize,
        changes: &ChangeSet<T>,
    ) -> Result<(), UntrackedRemove> {
        let tracker = &mut self.trackers[index];
        for change in changes {
            match change {
                Change::Add(item) => {
                    tracker.add(item.clone());
                }
                Change::AddRange(items) => {
                    for item in items {
                        tracker.add(item.clone());
                    }
                }
                Change::Remove(item) => {
                    tracker.remove(item)?;
                }
                Change::RemoveRange(items) | Change::Clear(items) => {
                    for item in items {
                        tracker.remove(item)?;
                    }
                }
                Change::Replace { previous, current } => {
                    tracker.remove(previous)?;
                    tracker.add(current.clone());
                }
                Change::Refresh(_) => {}
            }
        }
        Ok(())
    }

    /// Re-decide combined membership for every item the batch touched.
    /// Both sides of a `Replace` are candidates, so an item replaced out of
    /// a source cannot linger in the result.
    fn update_memberships(&mut self, op: SetOp, changes: &ChangeSet<T>) {
        for candidate in changes.flatten() {
            let item = candidate.item;
            let should = op.evaluate(item, &self.trackers);
            let present = self.result.contains(item);

            if should && !present {
                self.result.add(item.clone());
            } else if should && present && candidate.reason == ChangeReason::Refresh {
                self.result.refresh(item);
            } else if !should && present {
                self.result.remove(item);
            }
        }
    }

    fn reset(&mut self) {
        self.trackers.clear();
        self.result = ChangeAwareSet::new();
    }
}

/// The engine's ear on one source.
struct SourceObserver<T: Eq + Hash + Clone> {
    shared: Arc<EngineShared<T>>,
    index: usize,
}

impl<T: Eq + Hash + Clone + Send> Observer<T> for SourceObserver<T> {
    fn on_changes(&mut self, changes: ChangeSet<T>) {
        if changes.is_empty() {
            return;
        }
        self.shared.process_batch(self.index, changes);
    }

    fn on_error(&mut self, error: StreamError) {
        self.shared.fail(error);
    }
}

impl<T: Eq + Hash + Clone> EngineShared<T> {
    /// Incorporate one batch from source `index` and deliver the outcome.
    /// Runs entirely inside the critical section.
    fn process_batch(&self, index: usize, changes: ChangeSet<T>) {
        if self.halted.load(Ordering::Acquire) {
            return;
        }

        let guard = self.state.lock();
        if self.halted.load(Ordering::Acquire) {
            return;
        }

        let mut state = match guard.try_borrow_mut() {
            Ok(state) => state,
            Err(_) => panic!(
                "combination re-entered while a batch was being delivered; \
                 observers must not mutate sources or the combined stream \
                 from inside a callback"
            ),
        };

        if state.apply_to_tracker(index, &changes).is_err() {
            let err = StreamError::UnbalancedEdit { index };
            // The halt flag and the discard both land before the section
            // opens again;  a batch racing in from another source would
            // otherwise evaluate against the half-applied tracker.
            state.reset();
            drop(state);
            let already_halted = self.halted.swap(true, Ordering::AcqRel);
            drop(guard);
            if !already_halted {
                error!(error = %err, "combination halted");
                self.teardown(Some(err));
            }
            return;
        }

        state.update_memberships(self.op, &changes);
        let outgoing = state.result.capture_and_clear();

        if !outgoing.is_empty() {
            trace!(source = index, edits = outgoing.len(), "batch settled");
            // Delivered while the state borrow is held:  a callback that
            // tries to feed anything back in panics above instead of
            // interleaving batches.
            self.downstream.notify_changes(&outgoing);
        }

        // A callback may have disposed the combination;  its teardown was
        // deferred to this frame.
        if self.halted.load(Ordering::Acquire) {
            state.reset();
        }
    }

    /// Halt permanently:  sever the sources, discard state, forward the
    /// error downstream exactly once.
    fn fail(&self, err: StreamError) {
        if self.halted.swap(true, Ordering::AcqRel) {
            return;
        }
        error!(error = %err, "combination halted");

        // Waits out an in-flight batch on another thread.  Failing from
        // inside a delivery callback is the same contract violation as any
        // other re-entry.
        let guard = self.state.lock();
        let mut state = match guard.try_borrow_mut() {
            Ok(state) => state,
            Err(_) => panic!(
                "combination re-entered while a batch was being delivered; \
                 a source failed from inside a callback"
            ),
        };
        state.reset();
        drop(state);
        drop(guard);

        self.teardown(Some(err));
    }

    /// Unsubscribe from every source and, on failure, forward the error to
    /// downstream observers before severing them.  Callers have already
    /// published the halt flag, so no batch can slip out in between.
    fn teardown(&self, err: Option<StreamError>) {
        let upstream = std::mem::take(&mut *self.upstream.lock());
        for mut subscription in upstream {
            subscription.dispose();
        }
        self.sources.lock().clear();

        if let Some(err) = err {
            self.downstream.notify_error(err);
        }
        self.downstream.clear();
    }
}

/// The running combined collection.
///
/// Consumable as a `ChangeStream` exactly like a source, including the
/// initial-state replay.  The handle owns the engine:  dropping it (or
/// calling `dispose`) unsubscribes from every source, severs downstream
/// observers, and discards all state.
pub struct CombinedStream<T: Eq + Hash + Clone> {
    shared: Arc<EngineShared<T>>,
}

impl<T: Eq + Hash + Clone> CombinedStream<T> {
    /// Current combined contents, in insertion order.
    pub fn snapshot(&self) -> Vec<T> {
        let guard = self.shared.state.lock();
        let state = match guard.try_borrow() {
            Ok(state) => state,
            Err(_) => panic!("combined stream snapshotted from inside a delivery callback"),
        };
        state.result.iter().cloned().collect()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.halted.load(Ordering::Acquire)
    }

    /// Stop the engine:  unsubscribe from every source, sever downstream
    /// observers, discard state.  Idempotent.  Safe concurrently with an
    /// in-flight batch (blocks until it settles) and from inside a
    /// delivery callback (teardown happens as the callback unwinds).
    pub fn dispose(&self) {
        if self.shared.halted.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("combination disposed");

        self.shared.teardown(None);

        let guard = self.shared.state.lock();
        let state = guard.try_borrow_mut();
        if let Ok(mut state) = state {
            state.reset();
        }
        // Borrow unavailable means a batch on this thread is mid-delivery;
        // process_batch sees the halt flag and resets on its way out.
    }

    /// Feed this combined collection into another combination.
    pub fn into_stream(self) -> SharedStream<T>
    where
        T: Send + 'static,
    {
        Arc::new(self)
    }
}

impl<T: Eq + Hash + Clone> Drop for CombinedStream<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Eq + Hash + Clone + 'static> ChangeStream<T> for CombinedStream<T> {
    /// Registers the observer and replays the current combined contents to
    /// it alone, ordered against live batches.
    fn subscribe(&self, observer: Box<dyn Observer<T>>) -> Subscription {
        if self.shared.halted.load(Ordering::Acquire) {
            return Subscription::inert();
        }

        let guard = self.shared.state.lock();
        let state = match guard.try_borrow() {
            Ok(state) => state,
            Err(_) => panic!("subscribed to a combined stream from inside a delivery callback"),
        };
        let (slot, subscription) = self.shared.downstream.insert(observer);
        if !state.result.is_empty() {
            let contents: Vec<T> = state.result.iter().cloned().collect();
            let initial: ChangeSet<T> = vec![Change::AddRange(contents)].into();
            slot.lock().on_changes(initial);
        }
        subscription
    }
}
