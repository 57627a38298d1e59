//! Insertion-ordered sets of track ids.

use std::collections::HashSet;

/// An ordered set of track ids.
///
/// Iteration follows insertion order, which keeps association and output
/// order deterministic from frame to frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSet {
    ids: Vec<u64>,
}

impl TrackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Append `id` unless it is already present.
    pub fn insert(&mut self, id: u64) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    /// Ids of `self` followed by the ids of `other` not already in `self`.
    pub fn joint(&self, other: &TrackSet) -> TrackSet {
        let mut seen: HashSet<u64> = self.ids.iter().copied().collect();
        let mut ids = self.ids.clone();
        ids.extend(other.ids.iter().copied().filter(|id| seen.insert(*id)));
        TrackSet { ids }
    }

    /// Ids of `self` that are not in `other`.
    pub fn sub(&self, other: &TrackSet) -> TrackSet {
        let drop: HashSet<u64> = other.ids.iter().copied().collect();
        self.ids.iter().copied().filter(|id| !drop.contains(id)).collect()
    }

    pub fn is_disjoint(&self, other: &TrackSet) -> bool {
        let theirs: HashSet<u64> = other.ids.iter().copied().collect();
        self.ids.iter().all(|id| !theirs.contains(id))
    }

    /// Drop the oldest ids so that at most `len` remain.
    pub fn keep_last(&mut self, len: usize) {
        if self.ids.len() > len {
            self.ids.drain(..self.ids.len() - len);
        }
    }
}

impl FromIterator<u64> for TrackSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut set = TrackSet::new();
        let mut seen = HashSet::new();
        set.ids = iter.into_iter().filter(|id| seen.insert(*id)).collect();
        set
    }
}
