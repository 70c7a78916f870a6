//! Persistence seams.
//!
//! Two stores back the engine: a fast key/value session cache holding the
//! selections, vocabularies and history as JSON documents, and a durable
//! store holding dictionaries keyed by `(type, name)`. Both write
//! synchronously; a call that returns `Ok` has reached the backing store.
//! The in-memory implementations stand in for the file-backed ones in tests.

use crate::dictionary::Dictionary;
use crate::error::{Result, TagError};
use crate::tags::Polarity;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub trait SessionCache {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

pub trait DurableStore {
    fn get(&self, kind: Polarity, name: &str) -> Result<Option<Dictionary>>;
    fn put(&mut self, dictionary: &Dictionary) -> Result<()>;
    /// Returns whether something was deleted.
    fn delete(&mut self, kind: Polarity, name: &str) -> Result<bool>;
    /// Single-step rename; `new` must not exist yet.
    fn rename(&mut self, kind: Polarity, old: &str, new: &str) -> Result<()>;
    fn list(&self, kind: Polarity) -> Result<Vec<String>>;
}

pub fn load_json<T, C>(cache: &C, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    C: SessionCache + ?Sized,
{
    match cache.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn store_json<T, C>(cache: &mut C, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    C: SessionCache + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    cache.put(key, &raw)
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write through a temp file and rename over the target so readers never
/// see a half-written document.
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Escape a name into a file stem that is safe on any file system.
pub fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ' ') {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for b in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        }
    }
    out
}

/// Longest file stem written for a dictionary. Longer escaped names keep a
/// prefix and a digest of the full name, and the name stored in the
/// document is used when listing them.
const MAX_STEM: usize = 120;
const DIGEST_MARK: char = '~';

/// File stem for a dictionary name, bounded to [`MAX_STEM`] bytes.
pub fn stem_for(name: &str) -> String {
    let encoded = encode_name(name);
    if encoded.len() <= MAX_STEM {
        return encoded;
    }
    let digest = format!("{:x}", Sha256::digest(name.as_bytes()));
    let mut cut = MAX_STEM - 17;
    // Never split a %XX escape.
    if let Some(pos) = encoded[..cut].rfind('%').filter(|pos| pos + 3 > cut) {
        cut = pos;
    }
    format!("{}{DIGEST_MARK}{}", &encoded[..cut], &digest[..16])
}

pub fn decode_name(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Session cache stored as one JSON file per key under `<root>/session`.
pub struct FileSessionCache {
    dir: PathBuf,
}

impl FileSessionCache {
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join("session");
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_name(key)))
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.key_path(key), value)?;
        debug!(key, bytes = value.len(), "session cache write");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySessionCache {
    entries: HashMap<String, String>,
}

impl SessionCache for MemorySessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Dictionaries stored as `<root>/dictionaries/<type>/<name>.json`.
///
/// The file path is authoritative for `(type, name)`; the copy of the name
/// inside the document is refreshed after a rename.
pub struct FileDurableStore {
    dir: PathBuf,
}

impl FileDurableStore {
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join("dictionaries");
        for kind in Polarity::ALL {
            ensure_dir(&dir.join(kind.as_str()))?;
        }
        Ok(Self { dir })
    }

    fn path_for(&self, kind: Polarity, name: &str) -> PathBuf {
        self.dir
            .join(kind.as_str())
            .join(format!("{}.json", stem_for(name)))
    }

    fn read_at(path: &Path) -> Result<Option<Dictionary>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Name for a listed file: decoded from the stem, or read from the
    /// document when the stem carries a digest.
    fn name_at(path: &Path, stem: &str) -> Result<Option<String>> {
        if stem.contains(DIGEST_MARK) {
            return Ok(Self::read_at(path)?.map(|dict| dict.name));
        }
        Ok(decode_name(stem))
    }
}

impl DurableStore for FileDurableStore {
    fn get(&self, kind: Polarity, name: &str) -> Result<Option<Dictionary>> {
        let Some(mut dict) = Self::read_at(&self.path_for(kind, name))? else {
            return Ok(None);
        };
        dict.name = name.to_string();
        dict.kind = kind;
        Ok(Some(dict))
    }

    fn put(&mut self, dictionary: &Dictionary) -> Result<()> {
        let path = self.path_for(dictionary.kind, &dictionary.name);
        let raw = serde_json::to_string_pretty(dictionary)?;
        write_atomic(&path, &raw)?;
        debug!(path = %path.display(), "dictionary written");
        Ok(())
    }

    fn delete(&mut self, kind: Polarity, name: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(kind, name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn rename(&mut self, kind: Polarity, old: &str, new: &str) -> Result<()> {
        let from = self.path_for(kind, old);
        let to = self.path_for(kind, new);
        if to.exists() {
            return Err(TagError::name_conflict(format!(
                "dictionary {kind}/{new}"
            )));
        }
        fs::rename(&from, &to)?;
        // The path is authoritative; the embedded name is refreshed on a
        // best-effort basis.
        let refreshed = match self.get(kind, new) {
            Ok(Some(dict)) => self.put(&dict),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = refreshed {
            warn!(error = %e, "could not refresh renamed dictionary");
        }
        Ok(())
    }

    fn list(&self, kind: Polarity) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.dir.join(kind.as_str()))? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::name_at(&path, stem) {
                Ok(Some(name)) => names.push(name),
                Ok(None) => warn!(file = %path.display(), "skipping unreadable dictionary file name"),
                Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable dictionary"),
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryDurableStore {
    entries: BTreeMap<(Polarity, String), Dictionary>,
}

impl DurableStore for MemoryDurableStore {
    fn get(&self, kind: Polarity, name: &str) -> Result<Option<Dictionary>> {
        Ok(self.entries.get(&(kind, name.to_string())).cloned())
    }

    fn put(&mut self, dictionary: &Dictionary) -> Result<()> {
        self.entries.insert(
            (dictionary.kind, dictionary.name.clone()),
            dictionary.clone(),
        );
        Ok(())
    }

    fn delete(&mut self, kind: Polarity, name: &str) -> Result<bool> {
        Ok(self.entries.remove(&(kind, name.to_string())).is_some())
    }

    fn rename(&mut self, kind: Polarity, old: &str, new: &str) -> Result<()> {
        if self.entries.contains_key(&(kind, new.to_string())) {
            return Err(TagError::name_conflict(format!(
                "dictionary {kind}/{new}"
            )));
        }
        let mut dict = self
            .entries
            .remove(&(kind, old.to_string()))
            .ok_or_else(|| {
                TagError::not_found(format!("dictionary {kind}/{old}"))
            })?;
        dict.name = new.to_string();
        self.entries.insert((kind, new.to_string()), dict);
        Ok(())
    }

    fn list(&self, kind: Polarity) -> Result<Vec<String>> {
        Ok(self
            .entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect())
    }
}
