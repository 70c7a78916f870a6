use crate::collate::{Collator, SharedCollator};
use crate::error::{Result, TagError};
use crate::storage::DurableStore;
use crate::tags::{Polarity, normalize_tag};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

pub const DEFAULT_DICTIONARY: &str = "default";

/// A named, ordered list of labels stored in a dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub key: String,
    pub labels: Vec<String>,
}

impl Bundle {
    pub fn new(
        key: impl Into<String>,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Dictionary as stored and as exchanged in transfer files:
/// `{ "name": .., "type": "positive"|"negative", "dictionary": {key: [..]} }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Polarity,
    #[serde(rename = "dictionary", with = "bundle_map")]
    bundles: Vec<Bundle>,
}

mod bundle_map {
    use super::Bundle;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        bundles: &[Bundle],
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        s.collect_map(bundles.iter().map(|b| (&b.key, &b.labels)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<Bundle>, D::Error> {
        let map = BTreeMap::<String, Vec<String>>::deserialize(d)?;
        Ok(map
            .into_iter()
            .map(|(key, labels)| Bundle { key, labels })
            .collect())
    }
}

/// Outcome of folding one dictionary into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Keys that were new to the target.
    pub added: Vec<String>,
    /// Keys both sides defined; the target's bundle was kept.
    pub kept: Vec<String>,
    pub cross_type: bool,
}

impl Dictionary {
    pub fn new(kind: Polarity, name: impl Into<String>) -> Self {
        Self { name: name.into(), kind, bundles: Vec::new() }
    }

    pub fn with_bundles(
        kind: Polarity,
        name: impl Into<String>,
        bundles: Vec<Bundle>,
        collator: &dyn Collator,
    ) -> Self {
        let mut dict = Self { name: name.into(), kind, bundles };
        dict.normalize(collator);
        dict
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn keys(&self) -> Vec<&str> {
        self.bundles.iter().map(|b| b.key.as_str()).collect()
    }

    pub fn bundle(&self, key: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.key == key)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Trim keys and labels, drop blanks, keep the first bundle per key and
    /// sort keys with `collator`.
    pub fn normalize(&mut self, collator: &dyn Collator) {
        let mut seen = HashSet::new();
        let bundles = std::mem::take(&mut self.bundles);
        self.bundles = bundles
            .into_iter()
            .filter_map(|b| {
                let key = normalize_tag(&b.key);
                if key.is_empty() || !seen.insert(key.clone()) {
                    return None;
                }
                Some(Bundle { key, labels: clean_labels(b.labels) })
            })
            .collect();
        self.sort(collator);
    }

    fn sort(&mut self, collator: &dyn Collator) {
        self.bundles.sort_by(|a, b| collator.compare(&a.key, &b.key));
    }

    fn upsert(&mut self, bundle: Bundle, collator: &dyn Collator) {
        match self.bundles.iter_mut().find(|b| b.key == bundle.key) {
            Some(existing) => existing.labels = bundle.labels,
            None => {
                self.bundles.push(bundle);
                self.sort(collator);
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<Bundle> {
        let idx = self.bundles.iter().position(|b| b.key == key)?;
        Some(self.bundles.remove(idx))
    }

    /// Union bundles by key. On a collision the bundle already here wins.
    pub fn merge_from(
        &mut self,
        incoming: &Dictionary,
        collator: &dyn Collator,
    ) -> MergeReport {
        let mut report = MergeReport {
            cross_type: incoming.kind != self.kind,
            ..MergeReport::default()
        };
        for bundle in &incoming.bundles {
            if self.bundle(&bundle.key).is_some() {
                report.kept.push(bundle.key.clone());
            } else {
                self.bundles.push(bundle.clone());
                report.added.push(bundle.key.clone());
            }
        }
        self.sort(collator);
        report
    }
}

fn clean_labels(labels: Vec<String>) -> Vec<String> {
    labels
        .into_iter()
        .map(|l| normalize_tag(&l))
        .filter(|l| !l.is_empty())
        .collect()
}

fn validate_name(raw: &str, what: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TagError::validation(format!("{what} must not be empty")));
    }
    Ok(name.to_string())
}

fn describe(kind: Polarity, name: &str) -> String {
    format!("dictionary {kind}/{name}")
}

/// Default bundles seeded into `positive/default`.
pub fn default_positive_bundles() -> Vec<Bundle> {
    vec![
        Bundle::new(
            "pony Quality Tags Anime",
            [
                "score_9",
                "score_8_up",
                "score_7_up",
                "rating_safe",
                "masterpiece",
                "best quality",
                "absurdres",
                "8k wallpaper",
                "source_anime",
                "uncensored",
            ],
        ),
        Bundle::new(
            "pony Quality Tags Realistic",
            [
                "score_9",
                "score_8_up",
                "score_7_up",
                "rating_safe",
                "masterpiece",
                "best quality",
                "absurdres",
                "8k wallpaper",
                "realistic",
                "uncensored",
            ],
        ),
        Bundle::new(
            "sd1.5 Quality Tags",
            [
                "high quality",
                "ultra detailed",
                "best quality",
                "insanely detailed",
                "beautiful",
                "masterpiece",
            ],
        ),
    ]
}

const PONY_NEGATIVE_HEAD: [&str; 26] = [
    "score_4",
    "score_5",
    "score_6",
    "worst quality",
    "low quality",
    "normal quality",
    "lowres",
    "bad anatomy",
    "bad hands",
    "text",
    "error",
    "missing limb",
    "missing fingers",
    "extra digit",
    "fewer digits",
    "extra arms",
    "extra fingers",
    "multiple fingers",
    "cropped",
    "artifacts",
    "signature",
    "watermark",
    "username",
    "monochrome",
    "greyscale",
    "flat color",
];

const PONY_NEGATIVE_TAIL: [&str; 8] = [
    "3d",
    "video",
    "source_filmmaker",
    "artist name",
    "source_pony",
    "source_furry",
    "source_cartoon",
    "mature female",
];

/// The two pony negative bundles differ only in the style they exclude.
fn pony_negative(excluded_style: &str) -> Vec<String> {
    PONY_NEGATIVE_HEAD
        .iter()
        .copied()
        .chain(std::iter::once(excluded_style))
        .chain(PONY_NEGATIVE_TAIL.iter().copied())
        .map(str::to_string)
        .collect()
}

/// Default bundles seeded into `negative/default`.
pub fn default_negative_bundles() -> Vec<Bundle> {
    vec![
        Bundle {
            key: "pony Quality Tags Anime".to_string(),
            labels: pony_negative("realistic"),
        },
        Bundle {
            key: "pony Quality Tags Realistic".to_string(),
            labels: pony_negative("source_anime"),
        },
        Bundle::new(
            "sd1.5 Quality Tags",
            [
                "low quality",
                "subpar quality",
                "bad anatomy",
                "bad face",
                "(moles: 2)",
                "out of focus",
                "blurry",
            ],
        ),
    ]
}

/// Named, typed label bundles kept in the durable store.
///
/// Every write goes straight to the durable store and only returns once the
/// store has acknowledged it.
pub struct DictionaryStore<D> {
    durable: D,
    collator: SharedCollator,
}

impl<D: DurableStore> DictionaryStore<D> {
    pub fn new(durable: D, collator: SharedCollator) -> Self {
        Self { durable, collator }
    }

    pub fn durable(&self) -> &D {
        &self.durable
    }

    pub fn collator(&self) -> &dyn Collator {
        self.collator.as_ref()
    }

    /// Seed `default` for each type when it is missing. Existing defaults
    /// are left alone.
    pub fn ensure_defaults(&mut self) -> Result<()> {
        for kind in Polarity::ALL {
            if self.durable.get(kind, DEFAULT_DICTIONARY)?.is_some() {
                continue;
            }
            let bundles = match kind {
                Polarity::Positive => default_positive_bundles(),
                Polarity::Negative => default_negative_bundles(),
            };
            let dict = Dictionary::with_bundles(
                kind,
                DEFAULT_DICTIONARY,
                bundles,
                self.collator(),
            );
            self.durable.put(&dict)?;
            info!(%kind, "seeded default dictionary");
        }
        Ok(())
    }

    pub fn exists(&self, kind: Polarity, name: &str) -> Result<bool> {
        Ok(self.durable.get(kind, name.trim())?.is_some())
    }

    pub fn get(&self, kind: Polarity, name: &str) -> Result<Dictionary> {
        let mut dict = self
            .durable
            .get(kind, name.trim())?
            .ok_or_else(|| TagError::not_found(describe(kind, name)))?;
        dict.normalize(self.collator());
        Ok(dict)
    }

    /// Names for one type, in the durable store's stable order.
    pub fn list(&self, kind: Polarity) -> Result<Vec<String>> {
        self.durable.list(kind)
    }

    pub fn create(
        &mut self,
        kind: Polarity,
        name: &str,
        bundles: Vec<Bundle>,
    ) -> Result<Dictionary> {
        let name = validate_name(name, "dictionary name")?;
        if self.durable.get(kind, &name)?.is_some() {
            return Err(TagError::name_conflict(describe(kind, &name)));
        }
        let dict =
            Dictionary::with_bundles(kind, name, bundles, self.collator());
        self.durable.put(&dict)?;
        info!(%kind, name = %dict.name, bundles = dict.len(), "created dictionary");
        Ok(dict)
    }

    pub fn rename(
        &mut self,
        kind: Polarity,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let old_name = old_name.trim();
        if old_name == DEFAULT_DICTIONARY {
            return Err(TagError::protected(describe(kind, old_name)));
        }
        let new_name = validate_name(new_name, "dictionary name")?;
        if self.durable.get(kind, old_name)?.is_none() {
            return Err(TagError::not_found(describe(kind, old_name)));
        }
        if self.durable.get(kind, &new_name)?.is_some() {
            return Err(TagError::name_conflict(describe(kind, &new_name)));
        }
        self.durable.rename(kind, old_name, &new_name)?;
        info!(%kind, from = old_name, to = %new_name, "renamed dictionary");
        Ok(())
    }

    pub fn delete(&mut self, kind: Polarity, name: &str) -> Result<()> {
        let name = name.trim();
        if name == DEFAULT_DICTIONARY {
            return Err(TagError::protected(describe(kind, name)));
        }
        if !self.durable.delete(kind, name)? {
            return Err(TagError::not_found(describe(kind, name)));
        }
        info!(%kind, name, "deleted dictionary");
        Ok(())
    }

    /// Insert or replace one bundle.
    pub fn put_bundle(
        &mut self,
        kind: Polarity,
        name: &str,
        key: &str,
        labels: Vec<String>,
    ) -> Result<Bundle> {
        let key = validate_name(key, "bundle key")?;
        let mut dict = self.get(kind, name)?;
        let bundle = Bundle { key, labels: clean_labels(labels) };
        dict.upsert(bundle.clone(), self.collator.as_ref());
        self.durable.put(&dict)?;
        debug!(%kind, name = %dict.name, key = %bundle.key, "stored bundle");
        Ok(bundle)
    }

    pub fn delete_bundle(
        &mut self,
        kind: Polarity,
        name: &str,
        key: &str,
    ) -> Result<Bundle> {
        let mut dict = self.get(kind, name)?;
        let removed = dict.remove(key.trim()).ok_or_else(|| {
            TagError::not_found(format!(
                "bundle '{}' in {}",
                key.trim(),
                describe(kind, &dict.name)
            ))
        })?;
        self.durable.put(&dict)?;
        debug!(%kind, name = %dict.name, key = %removed.key, "deleted bundle");
        Ok(removed)
    }

    /// Fold `incoming` into the target. Existing bundles win on key
    /// collisions. Merging a dictionary of the other type needs
    /// `allow_cross_type`.
    pub fn merge(
        &mut self,
        kind: Polarity,
        name: &str,
        incoming: &Dictionary,
        allow_cross_type: bool,
    ) -> Result<MergeReport> {
        let mut target = self.get(kind, name)?;
        if incoming.kind != kind && !allow_cross_type {
            return Err(TagError::validation(format!(
                "merging a {} dictionary into {} needs confirmation",
                incoming.kind,
                describe(kind, &target.name)
            )));
        }
        let mut incoming = incoming.clone();
        incoming.normalize(self.collator.as_ref());
        let report = target.merge_from(&incoming, self.collator.as_ref());
        self.durable.put(&target)?;
        info!(
            %kind,
            name = %target.name,
            added = report.added.len(),
            kept = report.kept.len(),
            cross_type = report.cross_type,
            "merged dictionary"
        );
        Ok(report)
    }

    pub fn copy(
        &mut self,
        kind: Polarity,
        name: &str,
        new_name: &str,
    ) -> Result<Dictionary> {
        let source = self.get(kind, name)?;
        self.create(kind, new_name, source.bundles)
    }

    /// Store a transferred dictionary under its own name, or under
    /// `rename_to` when given.
    pub fn import(
        &mut self,
        incoming: Dictionary,
        rename_to: Option<&str>,
    ) -> Result<Dictionary> {
        let original = validate_name(&incoming.name, "dictionary name")?;
        let name = match rename_to {
            Some(alt) => {
                let alt = validate_name(alt, "dictionary name")?;
                if alt == original {
                    return Err(TagError::name_conflict(describe(
                        incoming.kind,
                        &alt,
                    )));
                }
                alt
            }
            None => original,
        };
        self.create(incoming.kind, &name, incoming.bundles)
    }
}
