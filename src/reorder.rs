//! Drag gesture handling for the selection.
//!
//! A single pointer gesture can mean either "move this tag" or "click this
//! tag". The engine tells the two apart by tracking whether the active tag's
//! index moved while the gesture was live, not just whether press and
//! release landed on the same tag. Hover updates only touch a provisional
//! preview; nothing is committed until the gesture ends.

use crate::error::{Result, TagError};
use tracing::debug;

/// Move the element at `from` to `to`, shifting the others.
pub fn array_move<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    if from >= out.len() || to >= out.len() || from == to {
        return out;
    }
    let item = out.remove(from);
    out.insert(to, item);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        active: String,
        start_index: usize,
        committed: Vec<String>,
        preview: Vec<String>,
    },
}

/// How a finished gesture should be applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Commit this order as the new selection.
    Reordered(Vec<String>),
    /// The gesture was a click on this tag; toggle its marked state.
    ToggledSelect(String),
    /// Nothing to apply; the committed order stands.
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct ReorderEngine {
    state: GestureState,
}

impl ReorderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    /// Order to display right now: the preview while dragging.
    pub fn preview(&self) -> Option<&[String]> {
        match &self.state {
            GestureState::Dragging { preview, .. } => Some(preview),
            GestureState::Idle => None,
        }
    }

    /// Press on `tag` within the committed `selected` order.
    pub fn begin(&mut self, selected: &[String], tag: &str) -> Result<()> {
        let start_index = selected
            .iter()
            .position(|t| t == tag)
            .ok_or_else(|| TagError::not_found(format!("tag '{tag}'")))?;
        debug!(tag, start_index, "drag started");
        self.state = GestureState::Dragging {
            active: tag.to_string(),
            start_index,
            committed: selected.to_vec(),
            preview: selected.to_vec(),
        };
        Ok(())
    }

    /// Pointer moved over `over`; update the provisional order.
    pub fn hover(&mut self, over: &str) -> Result<()> {
        let GestureState::Dragging {
            active, preview, ..
        } = &mut self.state
        else {
            return Err(TagError::validation("no drag in progress"));
        };
        if over == active.as_str() {
            return Ok(());
        }
        let Some(to) = preview.iter().position(|t| t == over) else {
            return Ok(());
        };
        let Some(from) = preview.iter().position(|t| *t == *active) else {
            return Ok(());
        };
        *preview = array_move(preview, from, to);
        Ok(())
    }

    /// Release over `target`, or outside any tag when `None`.
    pub fn end(&mut self, target: Option<&str>) -> GestureOutcome {
        let state = std::mem::take(&mut self.state);
        let GestureState::Dragging {
            active,
            start_index,
            committed,
            preview,
        } = state
        else {
            return GestureOutcome::Idle;
        };

        let Some(target) = target else {
            debug!(tag = %active, "drag cancelled outside any target");
            return GestureOutcome::Idle;
        };

        if target != active {
            let from = committed.iter().position(|t| *t == active);
            let to = committed.iter().position(|t| t == target);
            return match (from, to) {
                (Some(from), Some(to)) => {
                    GestureOutcome::Reordered(array_move(&committed, from, to))
                }
                _ => GestureOutcome::Idle,
            };
        }

        let current_index = preview.iter().position(|t| *t == active);
        if current_index == Some(start_index) {
            GestureOutcome::ToggledSelect(active)
        } else {
            // Dragged away and dropped back on itself: keep what the user saw.
            GestureOutcome::Reordered(preview)
        }
    }

    /// Abandon the gesture without applying anything.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_array_move() {
        let items = strings(&["a", "b", "c", "d"]);
        assert_eq!(array_move(&items, 0, 2), strings(&["b", "c", "a", "d"]));
        assert_eq!(array_move(&items, 3, 0), strings(&["d", "a", "b", "c"]));
        assert_eq!(array_move(&items, 1, 9), items);
    }

    #[test]
    fn test_click_toggles_without_reordering() {
        let selected = strings(&["a", "b", "c"]);
        let mut engine = ReorderEngine::new();
        engine.begin(&selected, "b").unwrap();
        let outcome = engine.end(Some("b"));
        assert_eq!(outcome, GestureOutcome::ToggledSelect("b".to_string()));
        assert!(!engine.is_dragging());
    }

    #[test]
    fn test_drop_on_other_tag_reorders() {
        let selected = strings(&["a", "b", "c", "d"]);
        let mut engine = ReorderEngine::new();
        engine.begin(&selected, "a").unwrap();
        engine.hover("b").unwrap();
        engine.hover("c").unwrap();
        assert_eq!(
            engine.preview().unwrap(),
            &strings(&["b", "c", "a", "d"])[..]
        );
        let outcome = engine.end(Some("c"));
        assert_eq!(
            outcome,
            GestureOutcome::Reordered(strings(&["b", "c", "a", "d"]))
        );
    }

    #[test]
    fn test_release_outside_reverts() {
        let selected = strings(&["a", "b", "c"]);
        let mut engine = ReorderEngine::new();
        engine.begin(&selected, "c").unwrap();
        engine.hover("a").unwrap();
        assert_eq!(engine.preview().unwrap(), &strings(&["c", "a", "b"])[..]);
        assert_eq!(engine.end(None), GestureOutcome::Idle);
        assert!(engine.preview().is_none());
    }

    #[test]
    fn test_displaced_then_dropped_on_self_is_not_a_click() {
        let selected = strings(&["a", "b", "c"]);
        let mut engine = ReorderEngine::new();
        engine.begin(&selected, "a").unwrap();
        engine.hover("c").unwrap();
        let outcome = engine.end(Some("a"));
        assert_eq!(
            outcome,
            GestureOutcome::Reordered(strings(&["b", "c", "a"]))
        );
    }

    #[test]
    fn test_begin_on_unknown_tag_fails() {
        let mut engine = ReorderEngine::new();
        assert!(engine.begin(&strings(&["a"]), "z").is_err());
        assert!(engine.hover("a").is_err());
        assert_eq!(engine.end(Some("a")), GestureOutcome::Idle);
    }
}
