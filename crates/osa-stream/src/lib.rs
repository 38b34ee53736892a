//! OSA Stream - subscription machinery for batched change notifications
//!
//! This crate provides the plumbing between mutating source collections and
//! anything that consumes their edits:
//! - `ChangeStream` / `Observer`: the subscribable seam a collection exposes
//! - `Subscription`: RAII cancellation token for one registration
//! - `SubscriberSet`: observer registry with snapshot-then-invoke fan-out
//! - `SourceSet`: an editable, observable ordered multiset with edit batching
//! - `subscribe_channel`: queued delivery for consumers that must not run
//!   inside the publisher's lock
//!
//! # Delivery model
//!
//! Publishers deliver synchronously, on the mutating thread, while holding
//! their own state lock.  That gives every observer the batches of one
//! source in exactly the order the edits applied, at the cost of a hard
//! contract:  an observer must not edit the publisher (or anything that
//! locks it) from inside its callback.  Consumers that need to react by
//! mutating should take the queued route instead:
//!
//! ```rust,ignore
//! use osa_stream::{subscribe_channel, SourceSet, StreamEvent};
//!
//! let source = SourceSet::new();
//! let (mut events, _subscription) = subscribe_channel(&source);
//!
//! source.add("a");
//! // Drain `events` from any task or thread, outside the source's lock.
//! ```

pub mod channel;
pub mod source;
pub mod stream;
pub mod subscribers;

// Re-export main types for convenience
pub use channel::{subscribe_channel, StreamEvent};
pub use source::{SourceEditor, SourceSet};
pub use stream::{ChangeStream, Observer, SharedStream, Subscription};
pub use subscribers::SubscriberSet;
