//! Coordination between the in-memory model, the session cache, the
//! durable dictionary store and external payloads.
//!
//! Every mutating call works on a copy of the affected state, writes that
//! copy through to the session cache, and only then swaps it in. A failed
//! write rolls the cache back to what it held before, so memory and cache
//! never disagree after an error.

use crate::collate::SharedCollator;
use crate::dictionary::{
    Bundle, DEFAULT_DICTIONARY, Dictionary, DictionaryStore, MergeReport,
};
use crate::error::{Result, TagError};
use crate::history::{Deleted, PromptHistory, PromptSetRecord};
use crate::reorder::{GestureOutcome, ReorderEngine};
use crate::storage::{
    DurableStore, FileDurableStore, FileSessionCache, SessionCache, load_json,
};
use crate::suggest::SuggestionIndex;
use crate::tags::{AddResult, PerPolarity, Polarity, TagStore, normalize_tags};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const HISTORY_KEY: &str = "promptHistory";
pub const SELECTED_PROMPT_KEY: &str = "selectedPromptSet";
pub const EXPORT_PREFIX: &str = "promptLogs";

pub fn vocabulary_key(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Positive => "allPositiveTagList",
        Polarity::Negative => "allNegativeTagList",
    }
}

pub fn selected_key(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Positive => "selectedPositiveTags",
        Polarity::Negative => "selectedNegativeTags",
    }
}

pub fn marked_key(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Positive => "markedPositiveTags",
        Polarity::Negative => "markedNegativeTags",
    }
}

pub fn active_dictionary_key(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Positive => "activeDictionary.positive",
        Polarity::Negative => "activeDictionary.negative",
    }
}

/// Import/export document. Unknown fields are ignored on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload {
    #[serde(default)]
    pub all_positive_tag_list: Vec<String>,
    #[serde(default)]
    pub all_negative_tag_list: Vec<String>,
    #[serde(default)]
    pub prompt_history: Vec<PromptSetRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub positive_added: usize,
    pub negative_added: usize,
    pub history_appended: usize,
}

type Entries = Vec<(&'static str, String)>;

/// File-backed coordinator rooted at the data directory.
pub type Workspace = SyncCoordinator<FileSessionCache, FileDurableStore>;

pub fn open_workspace(root: &Path, collator: SharedCollator) -> Result<Workspace> {
    SyncCoordinator::open(
        FileSessionCache::open(root)?,
        FileDurableStore::open(root)?,
        collator,
    )
}

pub struct SyncCoordinator<S, D> {
    cache: S,
    dictionaries: DictionaryStore<D>,
    stores: PerPolarity<TagStore>,
    gestures: PerPolarity<ReorderEngine>,
    active: PerPolarity<String>,
    history: PromptHistory,
}

impl<S: SessionCache, D: DurableStore> SyncCoordinator<S, D> {
    /// Load persisted state, seeding the default dictionaries if needed.
    pub fn open(cache: S, durable: D, collator: SharedCollator) -> Result<Self> {
        let mut dictionaries = DictionaryStore::new(durable, collator.clone());
        dictionaries.ensure_defaults()?;

        let load_store = |polarity: Polarity| -> Result<TagStore> {
            let selected: Vec<String> =
                load_json(&cache, selected_key(polarity))?.unwrap_or_default();
            let vocabulary: Vec<String> =
                load_json(&cache, vocabulary_key(polarity))?.unwrap_or_default();
            let marked: Vec<String> =
                load_json(&cache, marked_key(polarity))?.unwrap_or_default();
            Ok(TagStore::from_parts(
                polarity,
                selected,
                vocabulary,
                marked,
                collator.clone(),
            ))
        };
        let stores = PerPolarity::new(
            load_store(Polarity::Positive)?,
            load_store(Polarity::Negative)?,
        );

        let mut active = PerPolarity::new(
            DEFAULT_DICTIONARY.to_string(),
            DEFAULT_DICTIONARY.to_string(),
        );
        for polarity in Polarity::ALL {
            let remembered: Option<String> =
                load_json(&cache, active_dictionary_key(polarity))?;
            if let Some(name) = remembered {
                if dictionaries.exists(polarity, &name)? {
                    *active.get_mut(polarity) = name;
                } else {
                    warn!(%polarity, name, "active dictionary is gone, using default");
                }
            }
        }

        let records: Vec<PromptSetRecord> =
            load_json(&cache, HISTORY_KEY)?.unwrap_or_default();
        let selected =
            load_json::<Option<usize>, _>(&cache, SELECTED_PROMPT_KEY)?
                .flatten();
        let history = PromptHistory::from_parts(records, selected);

        debug!(
            positive = stores.positive.selected().len(),
            negative = stores.negative.selected().len(),
            history = history.len(),
            "session loaded"
        );

        Ok(Self {
            cache,
            dictionaries,
            stores,
            gestures: PerPolarity::default(),
            active,
            history,
        })
    }

    pub fn store(&self, polarity: Polarity) -> &TagStore {
        self.stores.get(polarity)
    }

    pub fn history(&self) -> &PromptHistory {
        &self.history
    }

    pub fn dictionaries(&self) -> &DictionaryStore<D> {
        &self.dictionaries
    }

    pub fn cache(&self) -> &S {
        &self.cache
    }

    pub fn active_dictionary(&self, polarity: Polarity) -> &str {
        self.active.get(polarity)
    }

    /// Write a batch of cache entries, restoring the previous values if
    /// any write fails.
    fn commit(&mut self, entries: Entries) -> Result<()> {
        let mut previous = Vec::with_capacity(entries.len());
        for (key, _) in &entries {
            previous.push(self.cache.get(key)?);
        }
        for (i, (key, value)) in entries.iter().enumerate() {
            if let Err(err) = self.cache.put(key, value) {
                warn!(key, error = %err, "cache write failed, rolling back");
                for ((key, _), old) in entries[..i].iter().zip(&previous).rev() {
                    let restored = match old {
                        Some(old) => self.cache.put(key, old),
                        None => self.cache.delete(key),
                    };
                    if let Err(e) = restored {
                        warn!(key, error = %e, "rollback write failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn store_entries(store: &TagStore) -> Result<Entries> {
        let p = store.polarity();
        Ok(vec![
            (selected_key(p), serde_json::to_string(store.selected())?),
            (vocabulary_key(p), serde_json::to_string(store.vocabulary())?),
            (marked_key(p), serde_json::to_string(&store.marked_in_order())?),
        ])
    }

    fn history_entries(history: &PromptHistory) -> Result<Entries> {
        Ok(vec![
            (HISTORY_KEY, serde_json::to_string(history.records())?),
            (
                SELECTED_PROMPT_KEY,
                serde_json::to_string(&history.selected_index())?,
            ),
        ])
    }

    fn commit_store(&mut self, store: TagStore) -> Result<()> {
        self.commit(Self::store_entries(&store)?)?;
        let polarity = store.polarity();
        *self.stores.get_mut(polarity) = store;
        Ok(())
    }

    /// Apply `f` to a copy of one store and commit it when `f` succeeds.
    fn update_store<T>(
        &mut self,
        polarity: Polarity,
        f: impl FnOnce(&mut TagStore) -> Result<T>,
    ) -> Result<T> {
        let mut store = self.stores.get(polarity).clone();
        let out = f(&mut store)?;
        self.commit_store(store)?;
        Ok(out)
    }

    fn commit_all(
        &mut self,
        stores: PerPolarity<TagStore>,
        history: PromptHistory,
    ) -> Result<()> {
        let mut entries = Self::store_entries(&stores.positive)?;
        entries.extend(Self::store_entries(&stores.negative)?);
        entries.extend(Self::history_entries(&history)?);
        self.commit(entries)?;
        self.stores = stores;
        self.history = history;
        Ok(())
    }

    pub fn add_free_text(
        &mut self,
        polarity: Polarity,
        raw: &str,
    ) -> Result<AddResult> {
        let mut store = self.stores.get(polarity).clone();
        let result = store.add_free_text(raw);
        if !result.is_empty() {
            self.commit_store(store)?;
            debug!(%polarity, added = ?result.added, "tags added");
        }
        Ok(result)
    }

    pub fn add_bundle(
        &mut self,
        polarity: Polarity,
        bundle: &Bundle,
    ) -> Result<AddResult> {
        let mut store = self.stores.get(polarity).clone();
        let result = store.add_from_bundle(&bundle.labels);
        if !result.is_empty() {
            self.commit_store(store)?;
            debug!(%polarity, key = %bundle.key, added = result.added.len(), "bundle inserted");
        }
        Ok(result)
    }

    /// Insert a bundle from the polarity's active dictionary.
    pub fn add_from_bundle(
        &mut self,
        polarity: Polarity,
        key: &str,
    ) -> Result<AddResult> {
        let name = self.active.get(polarity).clone();
        let dict = self.dictionaries.get(polarity, &name)?;
        let bundle = dict.bundle(key.trim()).cloned().ok_or_else(|| {
            TagError::not_found(format!(
                "bundle '{}' in dictionary {polarity}/{name}",
                key.trim()
            ))
        })?;
        self.add_bundle(polarity, &bundle)
    }

    pub fn remove(&mut self, polarity: Polarity, tag: &str) -> Result<()> {
        self.update_store(polarity, |s| s.remove(tag))
    }

    pub fn delete_from_vocabulary(
        &mut self,
        polarity: Polarity,
        tag: &str,
    ) -> Result<()> {
        self.update_store(polarity, |s| s.delete_from_vocabulary(tag))
    }

    pub fn reorder(
        &mut self,
        polarity: Polarity,
        new_order: Vec<String>,
    ) -> Result<()> {
        self.update_store(polarity, |s| s.reorder(new_order))
    }

    pub fn clear(&mut self, polarity: Polarity) -> Result<()> {
        self.update_store(polarity, |s| {
            s.clear();
            Ok(())
        })
    }

    pub fn suggest(&self, polarity: Polarity, query: &str) -> Vec<String> {
        SuggestionIndex::for_store(self.stores.get(polarity)).suggest(query)
    }

    pub fn begin_drag(&mut self, polarity: Polarity, tag: &str) -> Result<()> {
        let selected = self.stores.get(polarity).selected().to_vec();
        let gesture = self.gestures.get_mut(polarity);
        if gesture.is_dragging() {
            debug!(%polarity, "abandoning unfinished drag");
        }
        gesture.begin(&selected, tag)
    }

    /// Provisional move while dragging; nothing is persisted.
    pub fn drag_over(&mut self, polarity: Polarity, over: &str) -> Result<()> {
        self.gestures.get_mut(polarity).hover(over)
    }

    /// Order to display: the drag preview while a gesture is live.
    pub fn display_order(&self, polarity: Polarity) -> &[String] {
        self.gestures
            .get(polarity)
            .preview()
            .unwrap_or_else(|| self.stores.get(polarity).selected())
    }

    /// Finish a gesture and commit whatever it resolved to.
    pub fn end_drag(
        &mut self,
        polarity: Polarity,
        target: Option<&str>,
    ) -> Result<GestureOutcome> {
        let outcome = self.gestures.get_mut(polarity).end(target);
        match &outcome {
            GestureOutcome::Reordered(order) => {
                let order = order.clone();
                self.update_store(polarity, |s| s.reorder(order))?;
            }
            GestureOutcome::ToggledSelect(tag) => {
                let tag = tag.clone();
                self.update_store(polarity, |s| s.toggle_marked(&tag))?;
            }
            GestureOutcome::Idle => {}
        }
        Ok(outcome)
    }

    /// A complete gesture: press on `tag`, pass over `path`, release on
    /// `target`.
    pub fn drag(
        &mut self,
        polarity: Polarity,
        tag: &str,
        path: &[&str],
        target: Option<&str>,
    ) -> Result<GestureOutcome> {
        self.begin_drag(polarity, tag)?;
        for over in path {
            if let Err(e) = self.drag_over(polarity, over) {
                self.gestures.get_mut(polarity).cancel();
                return Err(e);
            }
        }
        self.end_drag(polarity, target)
    }

    /// Record the current selections in history, fold them into the
    /// vocabularies and start a fresh selection.
    pub fn capture(
        &mut self,
        title: Option<&str>,
    ) -> Result<Option<PromptSetRecord>> {
        let mut stores = self.stores.clone();
        let mut history = self.history.clone();
        let Some(record) = history.capture(
            title,
            stores.positive.selected(),
            stores.negative.selected(),
        ) else {
            return Ok(None);
        };
        for polarity in Polarity::ALL {
            let store = stores.get_mut(polarity);
            let selected = store.selected().to_vec();
            store.merge_vocabulary(selected);
            store.clear();
        }
        // The cleared selections no longer mirror any record.
        history.clear_selection();
        self.commit_all(stores, history)?;
        info!(
            positive = record.positive.len(),
            negative = record.negative.len(),
            "prompt set captured"
        );
        Ok(Some(record))
    }

    /// Copy the positive prompt to the clipboard, then capture.
    pub fn copy_and_save(
        &mut self,
        title: Option<&str>,
        transport: &mut impl Transport,
    ) -> Result<Option<PromptSetRecord>> {
        let positive = self.stores.positive.selected();
        if positive.is_empty() && self.stores.negative.selected().is_empty() {
            return Ok(None);
        }
        let text = positive.join(", ");
        transport.copy_to_clipboard(&text)?;
        self.capture(title)
    }

    /// Replay a history record into both selections.
    pub fn select_history(&mut self, index: usize) -> Result<PromptSetRecord> {
        let mut history = self.history.clone();
        let record = history.select(index)?.clone();
        let mut stores = self.stores.clone();
        stores.positive.replace_selected(record.positive.clone());
        stores.negative.replace_selected(record.negative.clone());
        self.commit_all(stores, history)?;
        Ok(record)
    }

    pub fn delete_history(&mut self, index: usize) -> Result<Deleted> {
        let mut history = self.history.clone();
        let deleted = history.delete(index)?;
        let mut stores = self.stores.clone();
        if deleted.was_selected {
            stores.positive.clear();
            stores.negative.clear();
        }
        self.commit_all(stores, history)?;
        Ok(deleted)
    }

    pub fn export_payload(&self) -> ExchangePayload {
        ExchangePayload {
            all_positive_tag_list: self.stores.positive.vocabulary().to_vec(),
            all_negative_tag_list: self.stores.negative.vocabulary().to_vec(),
            prompt_history: self.history.records().to_vec(),
        }
    }

    pub fn export(
        &self,
        transport: &mut impl Transport,
    ) -> Result<Option<PathBuf>> {
        let Some(path) = transport.select_save_path(EXPORT_PREFIX)? else {
            return Ok(None);
        };
        let text = serde_json::to_string_pretty(&self.export_payload())?;
        transport.write_bytes(&path, &text)?;
        info!(path = %path.display(), "exported vocabularies and history");
        Ok(Some(path))
    }

    pub fn import(
        &mut self,
        transport: &mut impl Transport,
    ) -> Result<Option<ImportReport>> {
        let Some(path) = transport.select_open_path()? else {
            return Ok(None);
        };
        let text = transport.read_bytes(&path)?;
        let payload: ExchangePayload = serde_json::from_str(&text)?;
        let report = self.import_payload(payload)?;
        info!(path = %path.display(), ?report, "imported vocabularies and history");
        Ok(Some(report))
    }

    /// Union the vocabularies and append the history, all or nothing.
    pub fn import_payload(
        &mut self,
        payload: ExchangePayload,
    ) -> Result<ImportReport> {
        let mut stores = self.stores.clone();
        let before = (
            stores.positive.vocabulary().len(),
            stores.negative.vocabulary().len(),
        );
        stores
            .positive
            .merge_vocabulary(normalize_tags(payload.all_positive_tag_list));
        stores
            .negative
            .merge_vocabulary(normalize_tags(payload.all_negative_tag_list));
        let mut history = self.history.clone();
        let history_appended = payload.prompt_history.len();
        history.append(payload.prompt_history);
        let report = ImportReport {
            positive_added: stores.positive.vocabulary().len() - before.0,
            negative_added: stores.negative.vocabulary().len() - before.1,
            history_appended,
        };
        self.commit_all(stores, history)?;
        Ok(report)
    }

    fn set_active(&mut self, polarity: Polarity, name: String) -> Result<()> {
        self.commit(vec![(
            active_dictionary_key(polarity),
            serde_json::to_string(&name)?,
        )])?;
        *self.active.get_mut(polarity) = name;
        Ok(())
    }

    pub fn use_dictionary(&mut self, polarity: Polarity, name: &str) -> Result<()> {
        let dict = self.dictionaries.get(polarity, name)?;
        self.set_active(polarity, dict.name)
    }

    pub fn create_dictionary(
        &mut self,
        polarity: Polarity,
        name: &str,
    ) -> Result<Dictionary> {
        let dict = self.dictionaries.create(polarity, name, Vec::new())?;
        self.set_active(polarity, dict.name.clone())?;
        Ok(dict)
    }

    pub fn rename_dictionary(
        &mut self,
        polarity: Polarity,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let old_name = old_name.trim();
        if self.active.get(polarity) != old_name {
            return self.dictionaries.rename(polarity, old_name, new_name);
        }
        // Move the active pointer first so a completed rename never leaves
        // it dangling.
        self.set_active(polarity, new_name.trim().to_string())?;
        if let Err(e) = self.dictionaries.rename(polarity, old_name, new_name) {
            if let Err(restore) = self.set_active(polarity, old_name.to_string())
            {
                warn!(error = %restore, "could not restore active dictionary");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Copy a dictionary; the new name defaults to `<name>_copy`.
    pub fn copy_dictionary(
        &mut self,
        polarity: Polarity,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<Dictionary> {
        let new_name = new_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_copy", name.trim()));
        let dict = self.dictionaries.copy(polarity, name, &new_name)?;
        self.set_active(polarity, dict.name.clone())?;
        Ok(dict)
    }

    pub fn delete_dictionary(
        &mut self,
        polarity: Polarity,
        name: &str,
    ) -> Result<()> {
        self.dictionaries.delete(polarity, name)?;
        if self.active.get(polarity) == name.trim() {
            self.set_active(polarity, DEFAULT_DICTIONARY.to_string())?;
        }
        Ok(())
    }

    /// Store a bundle in the active dictionary.
    pub fn put_bundle(
        &mut self,
        polarity: Polarity,
        key: &str,
        labels: Vec<String>,
    ) -> Result<Bundle> {
        let name = self.active.get(polarity).clone();
        self.dictionaries.put_bundle(polarity, &name, key, labels)
    }

    pub fn delete_bundle(
        &mut self,
        polarity: Polarity,
        key: &str,
    ) -> Result<Bundle> {
        let name = self.active.get(polarity).clone();
        self.dictionaries.delete_bundle(polarity, &name, key)
    }

    /// Save the marked tags, in selection order, as a bundle of the active
    /// dictionary and clear the marks.
    pub fn capture_bundle(
        &mut self,
        polarity: Polarity,
        key: &str,
    ) -> Result<Bundle> {
        let labels = self.stores.get(polarity).marked_in_order();
        if labels.is_empty() {
            return Err(TagError::validation(format!(
                "no {polarity} tags are marked"
            )));
        }
        let bundle = self.put_bundle(polarity, key, labels)?;
        self.update_store(polarity, |s| {
            s.clear_marked();
            Ok(())
        })?;
        Ok(bundle)
    }

    pub fn export_dictionary(
        &self,
        polarity: Polarity,
        name: Option<&str>,
        transport: &mut impl Transport,
    ) -> Result<Option<PathBuf>> {
        let name = name.unwrap_or(self.active.get(polarity).as_str());
        let dict = self.dictionaries.get(polarity, name)?;
        let Some(path) = transport.select_save_path(&dict.name)? else {
            return Ok(None);
        };
        let text = serde_json::to_string_pretty(&dict)?;
        transport.write_bytes(&path, &text)?;
        info!(%polarity, name = %dict.name, path = %path.display(), "exported dictionary");
        Ok(Some(path))
    }

    fn read_transfer(
        transport: &mut impl Transport,
    ) -> Result<Option<Dictionary>> {
        let Some(path) = transport.select_open_path()? else {
            return Ok(None);
        };
        let text = transport.read_bytes(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Import a transferred dictionary as a new one and make it active for
    /// its type.
    pub fn import_dictionary(
        &mut self,
        transport: &mut impl Transport,
        rename_to: Option<&str>,
    ) -> Result<Option<Dictionary>> {
        let Some(incoming) = Self::read_transfer(transport)? else {
            return Ok(None);
        };
        let dict = self.dictionaries.import(incoming, rename_to)?;
        self.set_active(dict.kind, dict.name.clone())?;
        Ok(Some(dict))
    }

    /// Merge a transferred dictionary into the polarity's active one.
    pub fn merge_dictionary(
        &mut self,
        polarity: Polarity,
        transport: &mut impl Transport,
        allow_cross_type: bool,
    ) -> Result<Option<MergeReport>> {
        let Some(incoming) = Self::read_transfer(transport)? else {
            return Ok(None);
        };
        let name = self.active.get(polarity).clone();
        let report =
            self.dictionaries
                .merge(polarity, &name, &incoming, allow_cross_type)?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collate::default_collator;
    use crate::history::HISTORY_CAP;
    use crate::storage::{MemoryDurableStore, MemorySessionCache};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    type Coordinator = SyncCoordinator<MemorySessionCache, MemoryDurableStore>;

    fn coordinator() -> Coordinator {
        SyncCoordinator::open(
            MemorySessionCache::default(),
            MemoryDurableStore::default(),
            default_collator(),
        )
        .unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn cached<T: serde::de::DeserializeOwned>(c: &Coordinator, key: &str) -> T {
        load_json(c.cache(), key).unwrap().unwrap()
    }

    /// Session cache that refuses writes to one key.
    #[derive(Default)]
    struct FlakyCache {
        inner: MemorySessionCache,
        broken_key: Option<&'static str>,
    }

    impl SessionCache for FlakyCache {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn put(&mut self, key: &str, value: &str) -> Result<()> {
            if self.broken_key == Some(key) {
                return Err(std::io::Error::other("cache offline").into());
            }
            self.inner.put(key, value)
        }

        fn delete(&mut self, key: &str) -> Result<()> {
            self.inner.delete(key)
        }
    }

    /// Transport backed by a map of fake files.
    #[derive(Default)]
    struct FakeTransport {
        files: HashMap<PathBuf, String>,
        open: Option<PathBuf>,
        save: Option<PathBuf>,
        clipboard: Vec<String>,
        clipboard_broken: bool,
    }

    impl Transport for FakeTransport {
        fn select_save_path(&mut self, _prefix: &str) -> Result<Option<PathBuf>> {
            Ok(self.save.clone())
        }

        fn select_open_path(&mut self) -> Result<Option<PathBuf>> {
            Ok(self.open.clone())
        }

        fn write_bytes(&mut self, path: &Path, text: &str) -> Result<()> {
            self.files.insert(path.to_path_buf(), text.to_string());
            Ok(())
        }

        fn read_bytes(&mut self, path: &Path) -> Result<String> {
            self.files.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no file")
                    .into()
            })
        }

        fn copy_to_clipboard(&mut self, text: &str) -> Result<()> {
            if self.clipboard_broken {
                return Err(std::io::Error::other("clipboard busy").into());
            }
            self.clipboard.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_add_free_text_persists_synchronously() {
        let mut c = coordinator();
        let res = c.add_free_text(Polarity::Positive, "cat, dog, cat").unwrap();
        assert_eq!(res.added, vec!["cat", "dog"]);
        let selected: Vec<String> =
            cached(&c, selected_key(Polarity::Positive));
        assert_eq!(selected, vec!["cat", "dog"]);
        let vocab: Vec<String> = cached(&c, vocabulary_key(Polarity::Positive));
        assert_eq!(vocab, vec!["cat", "dog"]);
        assert!(c.store(Polarity::Negative).selected().is_empty());
    }

    #[test]
    fn test_add_from_default_bundle_skips_duplicates() {
        let mut c = coordinator();
        c.put_bundle(
            Polarity::Positive,
            "quality",
            strings(&["masterpiece", "best quality"]),
        )
        .unwrap();
        c.add_free_text(Polarity::Positive, "masterpiece").unwrap();
        let res = c.add_from_bundle(Polarity::Positive, "quality").unwrap();
        assert_eq!(res.added, vec!["best quality"]);
        assert_eq!(
            c.store(Polarity::Positive).selected(),
            &strings(&["masterpiece", "best quality"])[..]
        );
        assert!(matches!(
            c.add_from_bundle(Polarity::Positive, "nope"),
            Err(TagError::NotFound(_))
        ));
    }

    #[test]
    fn test_state_survives_reopen() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Negative, "blurry, lowres").unwrap();
        c.create_dictionary(Polarity::Negative, "mine").unwrap();
        let SyncCoordinator { cache, dictionaries, .. } = c;
        let durable = dictionaries.durable().clone();
        let c = SyncCoordinator::open(cache, durable, default_collator())
            .unwrap();
        assert_eq!(
            c.store(Polarity::Negative).selected(),
            &strings(&["blurry", "lowres"])[..]
        );
        assert_eq!(c.active_dictionary(Polarity::Negative), "mine");
        assert_eq!(c.active_dictionary(Polarity::Positive), "default");
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut c = SyncCoordinator::open(
            FlakyCache::default(),
            MemoryDurableStore::default(),
            default_collator(),
        )
        .unwrap();
        c.add_free_text(Polarity::Positive, "a").unwrap();
        c.cache.broken_key = Some(vocabulary_key(Polarity::Positive));
        let err = c.add_free_text(Polarity::Positive, "b");
        assert!(matches!(err, Err(TagError::Io(_))));
        assert_eq!(c.store(Polarity::Positive).selected(), &strings(&["a"])[..]);
        let selected: Vec<String> =
            load_json(&c.cache, selected_key(Polarity::Positive))
                .unwrap()
                .unwrap();
        assert_eq!(selected, vec!["a"]);
    }

    #[test]
    fn test_drag_click_marks_and_drop_reorders() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "a, b, c").unwrap();

        let outcome = c.drag(Polarity::Positive, "b", &[], Some("b")).unwrap();
        assert_eq!(outcome, GestureOutcome::ToggledSelect("b".into()));
        assert_eq!(
            c.store(Polarity::Positive).selected(),
            &strings(&["a", "b", "c"])[..]
        );
        assert_eq!(c.store(Polarity::Positive).marked_in_order(), vec!["b"]);

        let outcome = c
            .drag(Polarity::Positive, "c", &["b", "a"], Some("a"))
            .unwrap();
        assert!(matches!(outcome, GestureOutcome::Reordered(_)));
        assert_eq!(
            c.store(Polarity::Positive).selected(),
            &strings(&["c", "a", "b"])[..]
        );
        assert_eq!(c.store(Polarity::Positive).marked_in_order(), vec!["b"]);
    }

    #[test]
    fn test_drag_preview_is_not_persisted() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "a, b").unwrap();
        c.begin_drag(Polarity::Positive, "a").unwrap();
        c.drag_over(Polarity::Positive, "b").unwrap();
        assert_eq!(
            c.display_order(Polarity::Positive),
            &strings(&["b", "a"])[..]
        );
        let stored: Vec<String> = cached(&c, selected_key(Polarity::Positive));
        assert_eq!(stored, vec!["a", "b"]);
        let outcome = c.end_drag(Polarity::Positive, None).unwrap();
        assert_eq!(outcome, GestureOutcome::Idle);
        assert_eq!(
            c.display_order(Polarity::Positive),
            &strings(&["a", "b"])[..]
        );
    }

    #[test]
    fn test_capture_bundle_from_marked() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "x, y, z").unwrap();
        assert!(matches!(
            c.capture_bundle(Polarity::Positive, "set"),
            Err(TagError::Validation(_))
        ));
        c.drag(Polarity::Positive, "z", &[], Some("z")).unwrap();
        c.drag(Polarity::Positive, "x", &[], Some("x")).unwrap();
        let bundle = c.capture_bundle(Polarity::Positive, "set").unwrap();
        assert_eq!(bundle.labels, vec!["x", "z"]);
        assert!(c.store(Polarity::Positive).marked().is_empty());
        let dict = c.dictionaries().get(Polarity::Positive, "default").unwrap();
        assert_eq!(dict.bundle("set").unwrap().labels, vec!["x", "z"]);
    }

    #[test]
    fn test_copy_and_save_captures_and_clears() {
        let mut c = coordinator();
        let mut t = FakeTransport::default();
        assert!(c.copy_and_save(None, &mut t).unwrap().is_none());
        assert!(t.clipboard.is_empty());

        c.add_free_text(Polarity::Positive, "a, b").unwrap();
        c.add_free_text(Polarity::Negative, "n").unwrap();
        let rec = c.copy_and_save(Some("first"), &mut t).unwrap().unwrap();
        assert_eq!(t.clipboard, vec!["a, b"]);
        assert_eq!(rec.title.as_deref(), Some("first"));
        assert_eq!(rec.positive, vec!["a", "b"]);
        assert_eq!(c.history().len(), 1);
        assert!(c.store(Polarity::Positive).selected().is_empty());
        assert!(c.store(Polarity::Negative).selected().is_empty());
        let stored: Vec<PromptSetRecord> = cached(&c, HISTORY_KEY);
        assert_eq!(stored, vec![rec]);
    }

    #[test]
    fn test_clipboard_failure_changes_nothing() {
        let mut c = coordinator();
        let mut t = FakeTransport { clipboard_broken: true, ..Default::default() };
        c.add_free_text(Polarity::Positive, "a").unwrap();
        assert!(matches!(
            c.copy_and_save(None, &mut t),
            Err(TagError::Io(_))
        ));
        assert!(c.history().is_empty());
        assert_eq!(c.store(Polarity::Positive).selected(), &strings(&["a"])[..]);
    }

    #[test]
    fn test_history_cap_through_coordinator() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "a").unwrap();
        c.capture(Some("")).unwrap();
        for _ in 0..HISTORY_CAP {
            c.add_free_text(Polarity::Positive, "b").unwrap();
            c.capture(None).unwrap();
        }
        assert_eq!(c.history().len(), HISTORY_CAP);
        assert!(c
            .history()
            .records()
            .iter()
            .all(|r| r.positive == vec!["b".to_string()]));
    }

    #[test]
    fn test_select_and_delete_history() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "p1, p2").unwrap();
        c.add_free_text(Polarity::Negative, "n1").unwrap();
        c.capture(None).unwrap();
        c.add_free_text(Polarity::Positive, "other").unwrap();
        c.drag(Polarity::Positive, "other", &[], Some("other")).unwrap();

        let rec = c.select_history(0).unwrap();
        assert_eq!(rec.positive, vec!["p1", "p2"]);
        assert_eq!(
            c.store(Polarity::Positive).selected(),
            &strings(&["p1", "p2"])[..]
        );
        assert_eq!(c.store(Polarity::Negative).selected(), &strings(&["n1"])[..]);
        assert!(c.store(Polarity::Positive).marked().is_empty());

        let deleted = c.delete_history(0).unwrap();
        assert!(deleted.was_selected);
        assert!(c.store(Polarity::Positive).selected().is_empty());
        assert!(c.history().is_empty());
        assert!(matches!(c.select_history(0), Err(TagError::NotFound(_))));
    }

    #[test]
    fn test_capture_forgets_replayed_selection() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "old").unwrap();
        c.capture(None).unwrap();
        c.select_history(0).unwrap();
        c.capture(None).unwrap();
        assert_eq!(c.history().selected_index(), None);

        c.add_free_text(Polarity::Positive, "fresh, work").unwrap();
        let deleted = c.delete_history(1).unwrap();
        assert!(!deleted.was_selected);
        assert_eq!(
            c.store(Polarity::Positive).selected(),
            &strings(&["fresh", "work"])[..]
        );

        let reopened = SyncCoordinator::open(
            c.cache.clone(),
            MemoryDurableStore::default(),
            default_collator(),
        )
        .unwrap();
        assert_eq!(reopened.history().selected_index(), None);
    }

    #[test]
    fn test_import_unions_and_appends() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "a").unwrap();
        c.capture(None).unwrap();
        let payload = r#"{
            "allPositiveTagList": ["a", "b"],
            "allNegativeTagList": ["n"],
            "promptHistory": [
                {"timestamp": "old", "positive": ["a"], "negative": []}
            ],
            "isDarkMode": true
        }"#;
        let mut t = FakeTransport {
            open: Some(PathBuf::from("in.json")),
            ..Default::default()
        };
        t.files.insert(PathBuf::from("in.json"), payload.to_string());
        let report = c.import(&mut t).unwrap().unwrap();
        assert_eq!(
            report,
            ImportReport {
                positive_added: 1,
                negative_added: 1,
                history_appended: 1
            }
        );
        assert_eq!(
            c.store(Polarity::Positive).vocabulary(),
            &strings(&["a", "b"])[..]
        );
        assert_eq!(c.history().len(), 2);
        assert_eq!(c.history().records()[1].timestamp, "old");

        // Importing the same file again appends history without dedup.
        c.import(&mut t).unwrap();
        assert_eq!(c.history().len(), 3);
    }

    #[test]
    fn test_bad_import_leaves_state_unchanged() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "a").unwrap();
        let mut t = FakeTransport {
            open: Some(PathBuf::from("bad.json")),
            ..Default::default()
        };
        t.files.insert(PathBuf::from("bad.json"), "{oops".to_string());
        assert!(matches!(c.import(&mut t), Err(TagError::Payload(_))));

        t.open = Some(PathBuf::from("missing.json"));
        assert!(matches!(c.import(&mut t), Err(TagError::Io(_))));
        assert_eq!(c.store(Polarity::Positive).vocabulary(), &strings(&["a"])[..]);
        assert!(c.history().is_empty());

        t.open = None;
        assert!(c.import(&mut t).unwrap().is_none());
    }

    #[test]
    fn test_export_roundtrips_into_fresh_coordinator() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "b, a").unwrap();
        c.add_free_text(Polarity::Negative, "n").unwrap();
        c.capture(Some("t")).unwrap();
        let mut t = FakeTransport {
            save: Some(PathBuf::from("out.json")),
            open: Some(PathBuf::from("out.json")),
            ..Default::default()
        };
        let path = c.export(&mut t).unwrap().unwrap();
        assert!(t.files[&path].contains("\"allPositiveTagList\""));

        let mut fresh = coordinator();
        fresh.import(&mut t).unwrap();
        assert_eq!(fresh.export_payload(), c.export_payload());
    }

    #[test]
    fn test_dictionary_lifecycle_tracks_active() {
        let mut c = coordinator();
        c.create_dictionary(Polarity::Positive, "styles").unwrap();
        assert_eq!(c.active_dictionary(Polarity::Positive), "styles");
        c.rename_dictionary(Polarity::Positive, "styles", "looks").unwrap();
        assert_eq!(c.active_dictionary(Polarity::Positive), "looks");
        let copy = c.copy_dictionary(Polarity::Positive, "looks", None).unwrap();
        assert_eq!(copy.name, "looks_copy");
        assert_eq!(c.active_dictionary(Polarity::Positive), "looks_copy");
        c.delete_dictionary(Polarity::Positive, "looks_copy").unwrap();
        assert_eq!(c.active_dictionary(Polarity::Positive), "default");
        assert!(matches!(
            c.delete_dictionary(Polarity::Positive, "default"),
            Err(TagError::Protected(_))
        ));
        assert!(matches!(
            c.use_dictionary(Polarity::Positive, "looks_copy"),
            Err(TagError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_keeps_active_pointer_consistent() {
        let mut c = SyncCoordinator::open(
            FlakyCache::default(),
            MemoryDurableStore::default(),
            default_collator(),
        )
        .unwrap();
        c.create_dictionary(Polarity::Positive, "styles").unwrap();
        c.create_dictionary(Polarity::Positive, "looks").unwrap();
        c.use_dictionary(Polarity::Positive, "styles").unwrap();

        let err = c.rename_dictionary(Polarity::Positive, "styles", "looks");
        assert!(matches!(err, Err(TagError::NameConflict(_))));
        assert_eq!(c.active_dictionary(Polarity::Positive), "styles");
        let active: String =
            load_json(&c.cache, active_dictionary_key(Polarity::Positive))
                .unwrap()
                .unwrap();
        assert_eq!(active, "styles");

        c.cache.broken_key = Some(active_dictionary_key(Polarity::Positive));
        let err = c.rename_dictionary(Polarity::Positive, "styles", "moods");
        assert!(matches!(err, Err(TagError::Io(_))));
        assert!(c.dictionaries().get(Polarity::Positive, "styles").is_ok());
        assert!(c.dictionaries().get(Polarity::Positive, "moods").is_err());
        assert_eq!(c.active_dictionary(Polarity::Positive), "styles");
    }

    #[test]
    fn test_dictionary_transfer_import_and_merge() {
        let mut c = coordinator();
        let mut t = FakeTransport {
            save: Some(PathBuf::from("dict.json")),
            open: Some(PathBuf::from("dict.json")),
            ..Default::default()
        };
        c.export_dictionary(Polarity::Negative, None, &mut t).unwrap();
        assert!(matches!(
            c.import_dictionary(&mut t, None),
            Err(TagError::NameConflict(_))
        ));
        let dict = c.import_dictionary(&mut t, Some("neg2")).unwrap().unwrap();
        assert_eq!(dict.kind, Polarity::Negative);
        assert_eq!(c.active_dictionary(Polarity::Negative), "neg2");

        c.put_bundle(Polarity::Positive, "x", strings(&["q"])).unwrap();
        t.files.insert(
            PathBuf::from("dict.json"),
            r#"{"name":"m","type":"positive","dictionary":{"x":["p"],"y":["r"]}}"#
                .to_string(),
        );
        let report = c
            .merge_dictionary(Polarity::Positive, &mut t, false)
            .unwrap()
            .unwrap();
        assert_eq!(report.kept, vec!["x"]);
        assert_eq!(report.added, vec!["y"]);
        let dict = c.dictionaries().get(Polarity::Positive, "default").unwrap();
        assert_eq!(dict.bundle("x").unwrap().labels, vec!["q"]);

        assert!(matches!(
            c.merge_dictionary(Polarity::Negative, &mut t, false),
            Err(TagError::Validation(_))
        ));
    }

    #[test]
    fn test_forget_removes_from_vocabulary_and_selection() {
        let mut c = coordinator();
        c.add_free_text(Polarity::Positive, "a, b").unwrap();
        c.delete_from_vocabulary(Polarity::Positive, "a").unwrap();
        assert_eq!(c.store(Polarity::Positive).selected(), &strings(&["b"])[..]);
        assert_eq!(c.suggest(Polarity::Positive, ""), Vec::<String>::new());
        c.remove(Polarity::Positive, "b").unwrap();
        assert_eq!(c.suggest(Polarity::Positive, "B"), vec!["b"]);
    }

    #[test]
    fn test_workspace_on_disk() {
        let tmp = tempdir().unwrap();
        let mut ws = open_workspace(tmp.path(), default_collator()).unwrap();
        ws.add_free_text(Polarity::Positive, "sky").unwrap();
        ws.create_dictionary(Polarity::Positive, "a/b").unwrap();
        drop(ws);

        let ws = open_workspace(tmp.path(), default_collator()).unwrap();
        assert_eq!(ws.store(Polarity::Positive).selected(), &strings(&["sky"])[..]);
        assert_eq!(ws.active_dictionary(Polarity::Positive), "a/b");
        assert!(tmp.path().join("session/selectedPositiveTags.json").is_file());
        assert_eq!(
            ws.dictionaries().list(Polarity::Positive).unwrap(),
            vec!["a/b", "default"]
        );
    }
}
