//! Result buffer:  an insertion-ordered multiset that records its own edits.
//!
//! Every mutation appends a `Change` to a pending log.  `capture_and_clear`
//! takes the whole log as one `ChangeSet`, which is how the micro-edits from
//! one incoming batch coalesce into a single outgoing notification.

use crate::change::{Change, ChangeSet};
use std::collections::HashMap;
use std::hash::Hash;

/// An ordered multiset whose mutations accumulate into a pending edit log.
#[derive(Clone, Debug)]
pub struct ChangeAwareSet<T: Eq + Hash + Clone> {
    /// Stored occurrences in insertion order
    items: Vec<T>,
    /// Occurrence count per distinct item
    counts: HashMap<T, usize>,
    /// Edits recorded since the last capture
    pending: Vec<Change<T>>,
}

impl<T: Eq + Hash + Clone> ChangeAwareSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            counts: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Append one occurrence and record an `Add` edit.
    pub fn add(&mut self, item: T) {
        *self.counts.entry(item.clone()).or_insert(0) += 1;
        self.items.push(item.clone());
        self.pending.push(Change::Add(item));
    }

    /// Drop one stored occurrence and record a `Remove` edit.  Removing an
    /// absent item is a no-op that returns false and records nothing.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.counts.get_mut(item) {
            Some(count) if *count > 1 => {
                *count -= 1;
            }
            Some(_) => {
                self.counts.remove(item);
            }
            None => return false,
        }

        if let Some(pos) = self.items.iter().position(|stored| stored == item) {
            self.items.remove(pos);
        }
        self.pending.push(Change::Remove(item.clone()));
        true
    }

    /// Record a `Refresh` edit for a present item.  Stored state does not
    /// change;  consumers re-read the item.
    pub fn refresh(&mut self, item: &T) -> bool {
        if !self.counts.contains_key(item) {
            return false;
        }
        self.pending.push(Change::Refresh(item.clone()));
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.counts.contains_key(item)
    }

    /// Current occurrence count, zero when absent.
    pub fn count(&self, item: &T) -> usize {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Take every edit recorded since the last capture as one batch.  The
    /// log is left empty, so no edit ever appears in two captures.
    pub fn capture_and_clear(&mut self) -> ChangeSet<T> {
        std::mem::take(&mut self.pending).into()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Number of stored occurrences, counting duplicates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Eq + Hash + Clone> Default for ChangeAwareSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
