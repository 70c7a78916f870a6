use crate::error::{Result, TagError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on stored prompt sets; the oldest are evicted first.
pub const HISTORY_CAP: usize = 1000;

/// Two-digit year, month, day, then hour and minute in local time.
pub const TIME_FMT: &str = "%y/%m/%d %H:%M";

pub fn timestamp_string() -> String {
    Local::now().format(TIME_FMT).to_string()
}

/// One captured pair of tag selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSetRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
}

impl PromptSetRecord {
    /// `<title> <timestamp> [P: n] [N: m]`, title omitted when absent.
    pub fn summary(&self) -> String {
        let counts = format!(
            "{} [P: {}] [N: {}]",
            self.timestamp,
            self.positive.len(),
            self.negative.len()
        );
        match &self.title {
            Some(title) => format!("{title} {counts}"),
            None => counts,
        }
    }
}

/// Result of deleting a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub record: PromptSetRecord,
    /// The deleted record was the active selection; the caller must clear
    /// whatever it replayed from it.
    pub was_selected: bool,
}

/// Newest-first log of captured prompt sets, capped at [`HISTORY_CAP`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptHistory {
    records: Vec<PromptSetRecord>,
    selected: Option<usize>,
}

impl PromptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts, enforcing the cap.
    pub fn from_parts(
        mut records: Vec<PromptSetRecord>,
        selected: Option<usize>,
    ) -> Self {
        records.truncate(HISTORY_CAP);
        let selected = selected.filter(|i| *i < records.len());
        Self { records, selected }
    }

    pub fn records(&self) -> &[PromptSetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn capture(
        &mut self,
        title: Option<&str>,
        positive: &[String],
        negative: &[String],
    ) -> Option<PromptSetRecord> {
        self.capture_at(title, positive, negative, timestamp_string())
    }

    /// Prepend a record unless both sides are empty.
    pub fn capture_at(
        &mut self,
        title: Option<&str>,
        positive: &[String],
        negative: &[String],
        timestamp: String,
    ) -> Option<PromptSetRecord> {
        if positive.is_empty() && negative.is_empty() {
            return None;
        }
        let record = PromptSetRecord {
            title: title
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            timestamp,
            positive: positive.to_vec(),
            negative: negative.to_vec(),
        };
        self.records.insert(0, record.clone());
        self.selected = self
            .selected
            .map(|i| i + 1)
            .filter(|i| *i < HISTORY_CAP);
        self.enforce_cap();
        Some(record)
    }

    /// Append imported records after the existing ones.
    pub fn append(&mut self, records: Vec<PromptSetRecord>) {
        self.records.extend(records);
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if self.records.len() > HISTORY_CAP {
            let evicted = self.records.len() - HISTORY_CAP;
            self.records.truncate(HISTORY_CAP);
            debug!(evicted, "history cap reached");
        }
    }

    /// Mark a record as the active one and return it for replay.
    pub fn select(&mut self, index: usize) -> Result<&PromptSetRecord> {
        if index >= self.records.len() {
            return Err(TagError::not_found(format!("history entry {index}")));
        }
        self.selected = Some(index);
        Ok(&self.records[index])
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn delete(&mut self, index: usize) -> Result<Deleted> {
        if index >= self.records.len() {
            return Err(TagError::not_found(format!("history entry {index}")));
        }
        let record = self.records.remove(index);
        let was_selected = self.selected == Some(index);
        self.selected = match self.selected {
            Some(i) if i == index => None,
            Some(i) if i > index => Some(i - 1),
            other => other,
        };
        Ok(Deleted { record, was_selected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_capture_requires_some_tags() {
        let mut h = PromptHistory::new();
        assert!(h.capture(None, &[], &[]).is_none());
        assert!(h.is_empty());
        let rec = h.capture(Some("  "), &tags(&["a"]), &[]).unwrap();
        assert_eq!(rec.title, None);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_capture_is_newest_first() {
        let mut h = PromptHistory::new();
        h.capture_at(Some("first"), &tags(&["a"]), &[], "t1".into());
        h.capture_at(None, &[], &tags(&["b"]), "t2".into());
        assert_eq!(h.records()[0].timestamp, "t2");
        assert_eq!(h.records()[1].title.as_deref(), Some("first"));
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let mut h = PromptHistory::new();
        h.capture_at(None, &tags(&["a"]), &[], "original".into());
        for i in 0..HISTORY_CAP {
            h.capture_at(None, &tags(&["x"]), &[], format!("t{i}"));
        }
        assert_eq!(h.len(), HISTORY_CAP);
        assert!(h.records().iter().all(|r| r.timestamp != "original"));
        assert_eq!(h.records()[0].timestamp, format!("t{}", HISTORY_CAP - 1));
        assert_eq!(h.records()[HISTORY_CAP - 1].timestamp, "t0");
    }

    #[test]
    fn test_select_and_delete_track_selection() {
        let mut h = PromptHistory::new();
        for t in ["c", "b", "a"] {
            h.capture_at(None, &tags(&[t]), &[], t.to_string());
        }
        // records: a, b, c
        let rec = h.select(1).unwrap().clone();
        assert_eq!(rec.positive, vec!["b"]);

        let del = h.delete(0).unwrap();
        assert!(!del.was_selected);
        assert_eq!(h.selected_index(), Some(0));

        let del = h.delete(0).unwrap();
        assert!(del.was_selected);
        assert_eq!(del.record.positive, vec!["b"]);
        assert_eq!(h.selected_index(), None);

        assert!(matches!(h.delete(5), Err(TagError::NotFound(_))));
        assert!(matches!(h.select(1), Err(TagError::NotFound(_))));
    }

    #[test]
    fn test_capture_shifts_selection() {
        let mut h = PromptHistory::new();
        h.capture_at(None, &tags(&["a"]), &[], "1".into());
        h.select(0).unwrap();
        h.capture_at(None, &tags(&["b"]), &[], "2".into());
        assert_eq!(h.selected_index(), Some(1));
    }

    #[test]
    fn test_append_keeps_order_and_cap() {
        let mut h = PromptHistory::new();
        h.capture_at(None, &tags(&["a"]), &[], "mine".into());
        let incoming: Vec<PromptSetRecord> = (0..HISTORY_CAP)
            .map(|i| PromptSetRecord {
                title: None,
                timestamp: format!("in{i}"),
                positive: tags(&["p"]),
                negative: Vec::new(),
            })
            .collect();
        h.append(incoming);
        assert_eq!(h.len(), HISTORY_CAP);
        assert_eq!(h.records()[0].timestamp, "mine");
        assert_eq!(h.records()[1].timestamp, "in0");
    }

    #[test]
    fn test_summary_and_wire_shape() {
        let rec = PromptSetRecord {
            title: Some("portrait".into()),
            timestamp: "24/05/01 10:00".into(),
            positive: tags(&["a", "b"]),
            negative: tags(&["c"]),
        };
        assert_eq!(rec.summary(), "portrait 24/05/01 10:00 [P: 2] [N: 1]");

        let json = r#"{"timestamp":"24/05/01 10:00","positive":["a"],"negative":[],"extra":1}"#;
        let parsed: PromptSetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.title, None);
        let out = serde_json::to_string(&parsed).unwrap();
        assert!(!out.contains("title"));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp_string();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIME_FMT).is_ok());
    }
}
