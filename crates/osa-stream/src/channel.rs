//! Queued delivery:  drain a stream from outside the publisher's lock.
//!
//! Synchronous observers run on the mutating thread, inside the publisher's
//! critical section, and so must never mutate anything upstream of it.  A
//! channel subscription lifts that restriction:  events land in an unbounded
//! queue, in delivery order, and the receiver reacts from wherever it likes.

use crate::stream::{ChangeStream, Observer, Subscription};
use osa_core::change::ChangeSet;
use osa_core::error::StreamError;
use tokio::sync::mpsc;
use tracing::trace;

/// One delivery on a subscribed stream.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent<T> {
    Changes(ChangeSet<T>),
    Error(StreamError),
}

struct ChannelObserver<T> {
    tx: mpsc::UnboundedSender<StreamEvent<T>>,
}

impl<T: Send> Observer<T> for ChannelObserver<T> {
    fn on_changes(&mut self, changes: ChangeSet<T>) {
        if self.tx.send(StreamEvent::Changes(changes)).is_err() {
            trace!("channel receiver gone, batch dropped");
        }
    }

    fn on_error(&mut self, error: StreamError) {
        let _ = self.tx.send(StreamEvent::Error(error));
    }
}

/// Subscribe a stream into an unbounded queue.
///
/// Enqueueing is synchronous, so the queue holds the stream's events in
/// exact delivery order, starting with the initial-state replay.  Dropping
/// the returned `Subscription` stops enqueueing;  dropping the receiver
/// merely discards events.
pub fn subscribe_channel<T, S>(
    stream: &S,
) -> (mpsc::UnboundedReceiver<StreamEvent<T>>, Subscription)
where
    T: Send + 'static,
    S: ChangeStream<T> + ?Sized,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = stream.subscribe(Box::new(ChannelObserver { tx }));
    (rx, subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceSet;
    use osa_core::change::Change;

    #[tokio::test]
    async fn queued_events_arrive_in_edit_order() {
        let source = SourceSet::new();
        source.add(1);

        let (mut events, _subscription) = subscribe_channel(&source);

        source.add(2);
        source.remove(&1);

        assert_eq!(
            events.recv().await,
            Some(StreamEvent::Changes(vec![Change::AddRange(vec![1])].into()))
        );
        assert_eq!(
            events.recv().await,
            Some(StreamEvent::Changes(vec![Change::Add(2)].into()))
        );
        assert_eq!(
            events.recv().await,
            Some(StreamEvent::Changes(vec![Change::Remove(1)].into()))
        );
    }

    #[tokio::test]
    async fn source_failure_surfaces_as_an_error_event() {
        let source: SourceSet<i32> = SourceSet::new();
        let (mut events, _subscription) = subscribe_channel(&source);

        source.fail("backing store went away");
        source.add(1);

        assert_eq!(
            events.recv().await,
            Some(StreamEvent::Error(StreamError::Source(
                "backing store went away".to_string()
            )))
        );
        // The failure severed the observer, so the channel closed
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn disposing_the_subscription_closes_the_queue() {
        let source: SourceSet<i32> = SourceSet::new();
        let (mut events, mut subscription) = subscribe_channel(&source);

        source.add(1);
        subscription.dispose();
        source.add(2);

        assert_eq!(
            events.recv().await,
            Some(StreamEvent::Changes(vec![Change::Add(1)].into()))
        );
        assert_eq!(events.recv().await, None);
    }
}
