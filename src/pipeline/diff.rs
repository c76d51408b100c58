//! Diff calculation between the stored and the freshly fetched snapshot.
//!
//! Membership is by item identity (exact title and URL), never by position.

use std::collections::HashSet;

use crate::models::{Item, ItemSet};

/// Items that appeared and disappeared between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// In current but not in previous, in current's order
    pub added: Vec<Item>,
    /// In previous but not in current, in previous's order
    pub removed: Vec<Item>,
}

impl DiffResult {
    /// Whether anything new appeared.
    pub fn has_new(&self) -> bool {
        !self.added.is_empty()
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// Calculate the diff between previous and current snapshots.
///
/// An item repeated within one snapshot is reported at most once.
pub fn calculate_diff(previous: &ItemSet, current: &ItemSet) -> DiffResult {
    DiffResult {
        added: missing_from(current, previous),
        removed: missing_from(previous, current),
    }
}

/// Items of `from` absent in `other`, first occurrence only.
fn missing_from(from: &ItemSet, other: &ItemSet) -> Vec<Item> {
    let known: HashSet<&Item> = other.iter().collect();
    let mut reported: HashSet<&Item> = HashSet::new();

    from.iter()
        .filter(|item| !known.contains(*item) && reported.insert(*item))
        .cloned()
        .collect()
}
