//! Batched edit notifications reported by a source collection.
//!
//! A source groups any number of edits into one `ChangeSet` and publishes the
//! whole batch atomically.  Order within a batch is significant:  ranges
//! expand element by element, and `Replace` is a logical remove-then-add.

use serde::{Deserialize, Serialize};

/// The kind of edit a change describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeReason {
    Add,
    AddRange,
    Remove,
    RemoveRange,
    Replace,
    Refresh,
    Clear,
}

/// A single edit to a source collection.
///
/// `RemoveRange` and `Clear` carry the removed items themselves, so a
/// consumer can decrement per-item bookkeeping without ever snapshotting
/// the source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change<T> {
    Add(T),
    AddRange(Vec<T>),
    Remove(T),
    RemoveRange(Vec<T>),
    Replace { previous: T, current: T },
    Refresh(T),
    Clear(Vec<T>),
}

impl<T> Change<T> {
    pub fn reason(&self) -> ChangeReason {
        match self {
            Change::Add(_) => ChangeReason::Add,
            Change::AddRange(_) => ChangeReason::AddRange,
            Change::Remove(_) => ChangeReason::Remove,
            Change::RemoveRange(_) => ChangeReason::RemoveRange,
            Change::Replace { .. } => ChangeReason::Replace,
            Change::Refresh(_) => ChangeReason::Refresh,
            Change::Clear(_) => ChangeReason::Clear,
        }
    }

    /// Number of items this change touches.
    pub fn item_count(&self) -> usize {
        match self {
            Change::Add(_) | Change::Remove(_) | Change::Refresh(_) => 1,
            Change::Replace { .. } => 2,
            Change::AddRange(items) | Change::RemoveRange(items) | Change::Clear(items) => {
                items.len()
            }
        }
    }
}

/// One touched item together with the reason its batch touched it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemChange<'a, T> {
    pub reason: ChangeReason,
    pub item: &'a T,
}

/// One atomic batch of edits from a single source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet<T>(Vec<Change<T>>);

impl<T> ChangeSet<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, change: Change<T>) {
        self.0.push(change);
    }

    /// Number of changes in the batch (not touched items).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change<T>> {
        self.0.iter()
    }

    /// Expand the batch into one `ItemChange` per touched item, in batch
    /// order.  `Replace` yields the outgoing item first, then the incoming
    /// one, both tagged `Replace`.
    pub fn flatten(&self) -> impl Iterator<Item = ItemChange<'_, T>> {
        self.0.iter().flat_map(|change| {
            let reason = change.reason();
            let items: Box<dyn Iterator<Item = &T>> = match change {
                Change::Add(item) | Change::Remove(item) | Change::Refresh(item) => {
                    Box::new(std::iter::once(item))
                }
                Change::AddRange(items) | Change::RemoveRange(items) | Change::Clear(items) => {
                    Box::new(items.iter())
                }
                Change::Replace { previous, current } => Box::new([previous, current].into_iter()),
            };
            items.map(move |item| ItemChange { reason, item })
        })
    }
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<Change<T>>> for ChangeSet<T> {
    fn from(changes: Vec<Change<T>>) -> Self {
        Self(changes)
    }
}

impl<T> IntoIterator for ChangeSet<T> {
    type Item = Change<T>;
    type IntoIter = std::vec::IntoIter<Change<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ChangeSet<T> {
    type Item = &'a Change<T>;
    type IntoIter = std::slice::Iter<'a, Change<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_expands_ranges_in_order() {
        let batch: ChangeSet<i32> = vec![
            Change::Add(1),
            Change::AddRange(vec![2, 3]),
            Change::Remove(2),
        ]
        .into();

        let flat: Vec<(ChangeReason, i32)> = batch
            .flatten()
            .map(|ic| (ic.reason, *ic.item))
            .collect();

        assert_eq!(
            flat,
            vec![
                (ChangeReason::Add, 1),
                (ChangeReason::AddRange, 2),
                (ChangeReason::AddRange, 3),
                (ChangeReason::Remove, 2),
            ]
        );
    }

    #[test]
    fn flatten_yields_both_sides_of_a_replace() {
        let batch: ChangeSet<&str> = vec![Change::Replace {
            previous: "old",
            current: "new",
        }]
        .into();

        let flat: Vec<(ChangeReason, &str)> = batch
            .flatten()
            .map(|ic| (ic.reason, *ic.item))
            .collect();

        assert_eq!(
            flat,
            vec![
                (ChangeReason::Replace, "old"),
                (ChangeReason::Replace, "new"),
            ]
        );
    }

    #[test]
    fn item_count_matches_flatten() {
        let batch: ChangeSet<u8> = vec![
            Change::AddRange(vec![1, 2, 3]),
            Change::Replace {
                previous: 1,
                current: 4,
            },
            Change::Clear(vec![2, 3, 4]),
        ]
        .into();

        let counted: usize = batch.iter().map(|c| c.item_count()).sum();
        assert_eq!(counted, batch.flatten().count());
    }
}
