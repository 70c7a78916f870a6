use crate::collate::SharedCollator;
use crate::error::{Result, TagError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Which of the two parallel collections a tag belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub const ALL: [Polarity; 2] = [Polarity::Positive, Polarity::Negative];

    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Polarity::Positive => "Positive",
            Polarity::Negative => "Negative",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per polarity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerPolarity<T> {
    pub positive: T,
    pub negative: T,
}

impl<T> PerPolarity<T> {
    pub fn new(positive: T, negative: T) -> Self {
        Self { positive, negative }
    }

    pub fn get(&self, polarity: Polarity) -> &T {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    pub fn get_mut(&mut self, polarity: Polarity) -> &mut T {
        match polarity {
            Polarity::Positive => &mut self.positive,
            Polarity::Negative => &mut self.negative,
        }
    }
}

/// Normalize a tag: surrounding whitespace is not part of the label.
pub fn normalize_tag(t: &str) -> String {
    t.trim().to_string()
}

/// Split typed text on commas into normalized, non-empty pieces.
pub fn split_free_text(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_tag)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Normalize and deduplicate a list of tags, keeping first occurrences.
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| normalize_tag(&t))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Tags appended to `selected` by one add operation, in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddResult {
    pub added: Vec<String>,
}

impl AddResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

/// Ordered unique selection plus the vocabulary it feeds.
///
/// `selected` never holds a duplicate and every selected tag is also in
/// `vocabulary`, which stays sorted by the injected collator. The `marked`
/// set is a subset of `selected` used to capture dictionary bundles.
#[derive(Clone)]
pub struct TagStore {
    polarity: Polarity,
    selected: Vec<String>,
    vocabulary: Vec<String>,
    marked: BTreeSet<String>,
    collator: SharedCollator,
}

impl fmt::Debug for TagStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagStore")
            .field("polarity", &self.polarity)
            .field("selected", &self.selected)
            .field("vocabulary", &self.vocabulary)
            .field("marked", &self.marked)
            .finish()
    }
}

impl TagStore {
    pub fn new(polarity: Polarity, collator: SharedCollator) -> Self {
        Self {
            polarity,
            selected: Vec::new(),
            vocabulary: Vec::new(),
            marked: BTreeSet::new(),
            collator,
        }
    }

    /// Rebuild a store from persisted parts, repairing anything that would
    /// break the selection invariants.
    pub fn from_parts(
        polarity: Polarity,
        selected: Vec<String>,
        vocabulary: Vec<String>,
        marked: Vec<String>,
        collator: SharedCollator,
    ) -> Self {
        let mut store = Self::new(polarity, collator);
        store.selected = normalize_tags(selected);
        store.merge_vocabulary(vocabulary);
        let sel = store.selected.clone();
        store.merge_vocabulary(sel);
        store.marked = marked
            .into_iter()
            .map(|t| normalize_tag(&t))
            .filter(|t| store.selected.contains(t))
            .collect();
        store
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn marked(&self) -> &BTreeSet<String> {
        &self.marked
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.selected.iter().any(|t| t == tag)
    }

    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.selected.iter().position(|t| t == tag)
    }

    /// Marked tags in their current selection order.
    pub fn marked_in_order(&self) -> Vec<String> {
        self.selected
            .iter()
            .filter(|t| self.marked.contains(*t))
            .cloned()
            .collect()
    }

    pub fn add_free_text(&mut self, raw: &str) -> AddResult {
        self.append(split_free_text(raw))
    }

    pub fn add_from_bundle(&mut self, labels: &[String]) -> AddResult {
        self.append(labels.iter().cloned())
    }

    fn append(&mut self, candidates: impl IntoIterator<Item = String>) -> AddResult {
        let mut added = Vec::new();
        for tag in candidates {
            let tag = normalize_tag(&tag);
            if tag.is_empty() || self.is_selected(&tag) {
                continue;
            }
            self.selected.push(tag.clone());
            added.push(tag);
        }
        self.merge_vocabulary(added.iter().cloned());
        AddResult { added }
    }

    /// Remove a tag from the selection only.
    pub fn remove(&mut self, tag: &str) -> Result<()> {
        let idx = self.index_of(tag).ok_or_else(|| {
            TagError::not_found(format!("{} tag '{tag}'", self.polarity))
        })?;
        self.selected.remove(idx);
        self.marked.remove(tag);
        Ok(())
    }

    /// Drop a tag from the vocabulary and from the selection referencing it.
    pub fn delete_from_vocabulary(&mut self, tag: &str) -> Result<()> {
        let in_vocab = self.vocabulary.iter().position(|t| t == tag);
        let in_selected = self.index_of(tag);
        if in_vocab.is_none() && in_selected.is_none() {
            return Err(TagError::not_found(format!(
                "{} vocabulary entry '{tag}'",
                self.polarity
            )));
        }
        if let Some(idx) = in_vocab {
            self.vocabulary.remove(idx);
        }
        if let Some(idx) = in_selected {
            self.selected.remove(idx);
        }
        self.marked.remove(tag);
        Ok(())
    }

    /// Replace the selection with a permutation of itself.
    pub fn reorder(&mut self, new_order: Vec<String>) -> Result<()> {
        let mut current = self.selected.clone();
        let mut proposed = new_order.clone();
        current.sort();
        proposed.sort();
        if current != proposed {
            return Err(TagError::validation(format!(
                "new {} order is not a permutation of the current selection",
                self.polarity
            )));
        }
        self.selected = new_order;
        Ok(())
    }

    /// Empty the selection; the vocabulary is untouched.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.marked.clear();
    }

    /// Swap in a whole selection, e.g. when replaying a history record.
    pub fn replace_selected(&mut self, tags: Vec<String>) {
        self.selected = normalize_tags(tags);
        self.marked.clear();
        let sel = self.selected.clone();
        self.merge_vocabulary(sel);
    }

    /// Flip a selected tag's membership in the marked set. Returns whether
    /// the tag is marked afterwards.
    pub fn toggle_marked(&mut self, tag: &str) -> Result<bool> {
        if !self.is_selected(tag) {
            return Err(TagError::not_found(format!(
                "{} tag '{tag}'",
                self.polarity
            )));
        }
        if self.marked.remove(tag) {
            Ok(false)
        } else {
            self.marked.insert(tag.to_string());
            Ok(true)
        }
    }

    pub fn clear_marked(&mut self) {
        self.marked.clear();
    }

    /// Union tags into the vocabulary, keeping it unique and collated.
    pub fn merge_vocabulary(&mut self, tags: impl IntoIterator<Item = String>) {
        let mut known: HashSet<String> =
            self.vocabulary.iter().cloned().collect();
        let mut changed = false;
        for tag in tags {
            let tag = normalize_tag(&tag);
            if tag.is_empty() || !known.insert(tag.clone()) {
                continue;
            }
            self.vocabulary.push(tag);
            changed = true;
        }
        if changed {
            let collator = self.collator.clone();
            self.vocabulary.sort_by(|a, b| collator.compare(a, b));
        }
    }
}

/// Hash a tag for deterministic color selection
pub fn hash_tag(tag: &str) -> u64 {
    let mut h: u64 = 5381;
    for b in tag.bytes() {
        h = (h.wrapping_shl(5)).wrapping_add(h) ^ u64::from(b);
    }
    h
}

/// Get color for a tag based on hash
pub fn color_for_tag(tag: &str, polarity: Polarity) -> (u8, u8, u8) {
    const POSITIVE: &[(u8, u8, u8)] = &[
        (166, 227, 161),
        (148, 226, 213),
        (181, 232, 224),
        (179, 255, 171),
        (204, 255, 229),
        (211, 228, 205),
        (204, 246, 221),
        (137, 180, 250),
        (186, 225, 255),
        (196, 222, 255),
    ];
    const NEGATIVE: &[(u8, u8, u8)] = &[
        (255, 169, 167),
        (240, 198, 198),
        (255, 201, 210),
        (255, 199, 190),
        (255, 210, 198),
        (245, 194, 231),
        (255, 214, 235),
        (249, 226, 175),
        (255, 214, 165),
        (255, 230, 214),
    ];
    let palette = match polarity {
        Polarity::Positive => POSITIVE,
        Polarity::Negative => NEGATIVE,
    };
    let h = hash_tag(tag);
    palette[(h as usize) % palette.len()]
}
