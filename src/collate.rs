//! Swappable string collation for vocabulary and bundle-key ordering.

use std::cmp::Ordering;
use std::sync::Arc;

/// Comparator injected into the stores that need a display order.
pub trait Collator: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

impl<F> Collator for F
where
    F: Fn(&str, &str) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self(a, b)
    }
}

/// Case-folded comparison with a code point tie-break, so `apple`,
/// `Banana` and `cherry` sort the way a person reading the list expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleCollator;

impl Collator for LocaleCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let folded = a
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase));
        folded.then_with(|| a.cmp(b))
    }
}

/// Plain byte-wise ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodepointCollator;

impl Collator for CodepointCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

pub type SharedCollator = Arc<dyn Collator>;

/// Resolve a collation by its configuration name.
pub fn collator_named(name: &str) -> Option<SharedCollator> {
    match name.trim().to_ascii_lowercase().as_str() {
        "locale" | "" => Some(Arc::new(LocaleCollator)),
        "codepoint" => Some(Arc::new(CodepointCollator)),
        _ => None,
    }
}

pub fn default_collator() -> SharedCollator {
    Arc::new(LocaleCollator)
}

pub fn sort_with(items: &mut [String], collator: &dyn Collator) {
    items.sort_by(|a, b| collator.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(collator: &dyn Collator, items: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        sort_with(&mut out, collator);
        out
    }

    #[test]
    fn test_locale_collator_folds_case() {
        let out = sorted(&LocaleCollator, &["cherry", "Banana", "apple"]);
        assert_eq!(out, vec!["apple", "Banana", "cherry"]);
    }

    #[test]
    fn test_codepoint_collator_puts_uppercase_first() {
        let out = sorted(&CodepointCollator, &["cherry", "Banana", "apple"]);
        assert_eq!(out, vec!["Banana", "apple", "cherry"]);
    }

    #[test]
    fn test_closure_is_a_collator() {
        let reverse = |a: &str, b: &str| b.cmp(a);
        let out = sorted(&reverse, &["a", "c", "b"]);
        assert_eq!(out, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_collator_named() {
        assert!(collator_named("locale").is_some());
        assert!(collator_named("CodePoint").is_some());
        assert!(collator_named("klingon").is_none());
    }
}
