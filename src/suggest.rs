//! Autocomplete candidates drawn from a store's vocabulary.

use crate::tags::TagStore;
use std::collections::HashSet;

/// Advisory candidate list; it never mutates the selection.
pub struct SuggestionIndex<'a> {
    vocabulary: &'a [String],
    selected: HashSet<&'a str>,
}

impl<'a> SuggestionIndex<'a> {
    pub fn new(vocabulary: &'a [String], selected: &'a [String]) -> Self {
        Self {
            vocabulary,
            selected: selected.iter().map(String::as_str).collect(),
        }
    }

    pub fn for_store(store: &'a TagStore) -> Self {
        Self::new(store.vocabulary(), store.selected())
    }

    /// Case-insensitive substring match over unselected vocabulary entries,
    /// in vocabulary order. A blank query returns everything unselected.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_lowercase();
        self.vocabulary
            .iter()
            .filter(|t| !self.selected.contains(t.as_str()))
            .filter(|t| needle.is_empty() || t.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}
