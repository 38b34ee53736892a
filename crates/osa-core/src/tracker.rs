//! Per-source multiset membership tracking.
//!
//! One tracker mirrors the live contents of one source collection as
//! occurrence counts.  The engine asks only two questions of it:  did this
//! add make the item present, and did this remove make it absent.

use crate::error::UntrackedRemove;
use std::collections::HashMap;
use std::hash::Hash;

/// Occurrence counts for one source collection.
///
/// Absence and a count of zero are the same state:  entries are dropped as
/// soon as their count reaches zero, so `contains` is a plain key lookup.
#[derive(Clone, Debug)]
pub struct OccurrenceTracker<T: Eq + Hash> {
    counts: HashMap<T, usize>,
}

impl<T: Eq + Hash> OccurrenceTracker<T> {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Count one more occurrence.  Returns true when the item went from
    /// absent to present.
    pub fn add(&mut self, item: T) -> bool {
        let count = self.counts.entry(item).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Count one less occurrence.  Returns true when the item went from
    /// present to absent.  Removing an item with no tracked occurrences is
    /// an `UntrackedRemove` error.
    pub fn remove(&mut self, item: &T) -> Result<bool, UntrackedRemove> {
        match self.counts.get_mut(item) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Ok(false)
            }
            Some(_) => {
                self.counts.remove(item);
                Ok(true)
            }
            None => Err(UntrackedRemove),
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.counts.contains_key(item)
    }

    /// Current occurrence count, zero when absent.
    pub fn count(&self, item: &T) -> usize {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Number of distinct items present.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.counts.keys()
    }
}

impl<T: Eq + Hash> Default for OccurrenceTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_reports_only_the_first_occurrence() {
        let mut tracker = OccurrenceTracker::new();

        assert!(tracker.add("a"));
        assert!(!tracker.add("a"));
        assert_eq!(tracker.count(&"a"), 2);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn remove_reports_only_the_last_occurrence() {
        let mut tracker = OccurrenceTracker::new();
        tracker.add(7);
        tracker.add(7);

        assert_eq!(tracker.remove(&7), Ok(false));
        assert!(tracker.contains(&7));
        assert_eq!(tracker.remove(&7), Ok(true));
        assert!(!tracker.contains(&7));
        assert_eq!(tracker.count(&7), 0);
    }

    #[test]
    fn remove_at_zero_is_an_error() {
        let mut tracker: OccurrenceTracker<i32> = OccurrenceTracker::new();

        assert_eq!(tracker.remove(&1), Err(UntrackedRemove));

        tracker.add(1);
        tracker.remove(&1).unwrap();
        assert_eq!(tracker.remove(&1), Err(UntrackedRemove));
    }
}
