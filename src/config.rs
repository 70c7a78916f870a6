use crate::collate::{SharedCollator, collator_named, default_collator};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing::warn;

pub const DIR_VAR: &str = "PROMPT_TAGS_DIR";
pub const COLLATION_VAR: &str = "PROMPT_TAGS_COLLATION";
pub const CLIPBOARD_VAR: &str = "PROMPT_TAGS_CLIPBOARD";

/// Runtime settings, resolved once per invocation.
#[derive(Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub collator: SharedCollator,
    pub clipboard_command: Option<String>,
    pub use_color: bool,
}

impl Config {
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings through `lookup` so tests need not touch the real
    /// process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> io::Result<Self> {
        let data_dir = match lookup(DIR_VAR) {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => {
                let home = lookup("HOME").ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("HOME not set; set {DIR_VAR} explicitly"),
                    )
                })?;
                PathBuf::from(home).join(".prompt_tags")
            }
        };

        let collator = match lookup(COLLATION_VAR) {
            Some(name) => collator_named(&name).unwrap_or_else(|| {
                warn!(name, "unknown collation, using locale");
                default_collator()
            }),
            None => default_collator(),
        };

        let clipboard_command =
            lookup(CLIPBOARD_VAR).filter(|c| !c.trim().is_empty());
        let use_color = lookup("NO_COLOR").is_none();

        Ok(Self { data_dir, collator, clipboard_command, use_color })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_dir_override_and_defaults() {
        let cfg = Config::from_lookup(lookup_from(&[(DIR_VAR, "/tmp/pt")]))
            .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/pt"));
        assert!(cfg.clipboard_command.is_none());
        assert!(cfg.use_color);

        let cfg = Config::from_lookup(lookup_from(&[
            ("HOME", "/home/me"),
            ("NO_COLOR", "1"),
            (CLIPBOARD_VAR, "pbcopy"),
        ]))
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/home/me/.prompt_tags"));
        assert_eq!(cfg.clipboard_command.as_deref(), Some("pbcopy"));
        assert!(!cfg.use_color);
    }

    #[test]
    fn test_missing_home_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_collation_choice() {
        let cfg = Config::from_lookup(lookup_from(&[
            (DIR_VAR, "/x"),
            (COLLATION_VAR, "codepoint"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.collator.compare("Zebra", "apple"),
            std::cmp::Ordering::Less
        );

        let cfg = Config::from_lookup(lookup_from(&[
            (DIR_VAR, "/x"),
            (COLLATION_VAR, "klingon"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.collator.compare("Zebra", "apple"),
            std::cmp::Ordering::Greater
        );
    }
}
