//! Registry of patterns keyed by a stable numeric id.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::pattern::Pattern;

/// Stable identifier for a pattern held by a [`PatternIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(u32);

impl PatternId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Owned collection of patterns, keyed by [`PatternId`], with a
/// monotonically increasing id allocator — the pattern-side counterpart to
/// `player::PlayerRegistry`.
#[derive(Debug, Default)]
pub struct PatternIndex {
    patterns: HashMap<PatternId, Pattern>,
    next_id: u32,
}

impl PatternIndex {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
            next_id: 0,
        }
    }

    /// Insert `pattern`, returning a fresh id.
    pub fn insert(&mut self, pattern: Pattern) -> PatternId {
        let id = PatternId(self.next_id);
        self.next_id += 1;
        self.patterns.insert(id, pattern);
        id
    }

    /// Create and insert an empty pattern, returning its id.
    pub fn create(&mut self, beats: u32, steps_per_beat: u32) -> PatternId {
        self.insert(Pattern::new(beats, steps_per_beat))
    }

    pub fn get(&self, id: PatternId) -> Result<&Pattern> {
        self.patterns.get(&id).ok_or_else(|| Error::invalid_argument(format!("unknown pattern id {}", id.as_u32())))
    }

    pub fn get_mut(&mut self, id: PatternId) -> Result<&mut Pattern> {
        self.patterns.get_mut(&id).ok_or_else(|| Error::invalid_argument(format!("unknown pattern id {}", id.as_u32())))
    }

    pub fn remove(&mut self, id: PatternId) -> Option<Pattern> {
        self.patterns.remove(&id)
    }

    pub fn contains(&self, id: PatternId) -> bool {
        self.patterns.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PatternId> + '_ {
        self.patterns.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_fetch() {
        let mut idx = PatternIndex::new();
        let id = idx.create(4, 4);
        assert!(idx.get(id).is_ok());
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn ids_are_stable_and_unique() {
        let mut idx = PatternIndex::new();
        let a = idx.create(4, 4);
        let b = idx.create(4, 4);
        assert_ne!(a, b);
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut idx = PatternIndex::new();
        let id = idx.create(4, 4);
        assert!(idx.remove(id).is_some());
        assert!(idx.get(id).is_err());
        assert!(idx.is_empty());
    }

    #[test]
    fn unknown_id_is_bad_handle() {
        let idx = PatternIndex::new();
        let bogus = PatternId(999);
        assert!(idx.get(bogus).is_err());
    }
}
