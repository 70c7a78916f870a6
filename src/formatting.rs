use crate::history::TIME_FMT;
use crate::tags::{Polarity, color_for_tag};
use chrono::{Local, NaiveDateTime};
use yansi::Paint;

/// Color palette for consistent theming
pub struct ColorPalette {
    pub primary: (u8, u8, u8),   // indices, muted text
    pub secondary: (u8, u8, u8), // headers
    pub timestamp: (u8, u8, u8),
    pub highlight: (u8, u8, u8), // query matches
    pub marked: (u8, u8, u8),
}

impl ColorPalette {
    pub const CATPPUCCIN: Self = Self {
        primary: (108, 112, 134),   // Gray
        secondary: (148, 226, 213), // Teal
        timestamp: (137, 180, 250), // Blue
        highlight: (243, 139, 168), // Pink
        marked: (249, 226, 175),    // Yellow
    };
}

/// Formatting context passed through rendering pipeline
pub struct FormatContext {
    pub use_color: bool,
    pub palette: ColorPalette,
}

impl FormatContext {
    pub fn new(use_color: bool) -> Self {
        Self { use_color, palette: ColorPalette::CATPPUCCIN }
    }

    fn paint(&self, text: &str, (r, g, b): (u8, u8, u8)) -> String {
        if self.use_color {
            Paint::rgb(text, r, g, b).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_id(&self, id: &str) -> String {
        self.paint(id, self.palette.primary)
    }

    pub fn format_header(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.secondary;
            Paint::rgb(text, r, g, b).bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_timestamp(&self, ts: &str) -> String {
        self.paint(ts, self.palette.timestamp)
    }

    pub fn format_tag(&self, tag: &str, polarity: Polarity) -> String {
        if self.use_color {
            let (r, g, b) = color_for_tag(tag, polarity);
            Paint::rgb(tag, r, g, b).bold().to_string()
        } else {
            tag.to_string()
        }
    }

    /// Marked tags carry a `*` so the state survives `NO_COLOR`.
    pub fn format_marked(&self, tag: &str) -> String {
        let text = format!("*{tag}");
        if self.use_color {
            let (r, g, b) = self.palette.marked;
            Paint::rgb(&text, r, g, b).bold().underline().to_string()
        } else {
            text
        }
    }

    /// Paint every case-insensitive occurrence of `query` in `text`.
    pub fn highlight_match(&self, text: &str, query: Option<&str>) -> String {
        let Some(q) = query else { return text.to_string() };
        let q_lower = q.trim().to_lowercase();
        if q_lower.is_empty() || !self.use_color {
            return text.to_string();
        }

        let mut out = String::new();
        let mut plain_start = 0;
        let mut i = 0;
        while i < text.len() {
            match folded_prefix_len(&text[i..], &q_lower) {
                Some(len) if len > 0 => {
                    out.push_str(&text[plain_start..i]);
                    out.push_str(
                        &self.paint(&text[i..i + len], self.palette.highlight),
                    );
                    i += len;
                    plain_start = i;
                }
                _ => {
                    i += text[i..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        out.push_str(&text[plain_start..]);
        out
    }
}

/// Byte length of the prefix of `text` whose lowercase form equals
/// `needle_lower`.
fn folded_prefix_len(text: &str, needle_lower: &str) -> Option<usize> {
    let mut rest = needle_lower;
    for (idx, ch) in text.char_indices() {
        if rest.is_empty() {
            return Some(idx);
        }
        for lc in ch.to_lowercase() {
            let mut it = rest.chars();
            if it.next() != Some(lc) {
                return None;
            }
            rest = it.as_str();
        }
    }
    rest.is_empty().then_some(text.len())
}

/// History timestamps shown as written or as an age
pub struct TimeFormatter {
    relative_mode: bool,
    now: NaiveDateTime,
}

impl TimeFormatter {
    pub fn new(relative_mode: bool, now: NaiveDateTime) -> Self {
        Self { relative_mode, now }
    }

    pub fn local(relative_mode: bool) -> Self {
        Self::new(relative_mode, Local::now().naive_local())
    }

    pub fn format(&self, ts: &str) -> String {
        match NaiveDateTime::parse_from_str(ts, TIME_FMT) {
            Ok(dt) if self.relative_mode => self.format_relative(dt),
            _ => ts.to_string(),
        }
    }

    pub fn format_relative(&self, dt: NaiveDateTime) -> String {
        let dur = self.now.signed_duration_since(dt);
        let total_minutes = dur.num_minutes().max(0);
        let total_hours = dur.num_hours().max(0);
        let total_days = dur.num_days().max(0);

        if total_hours == 0 {
            format!("{}m ago", total_minutes)
        } else if total_days == 0 {
            format!("{}h ago", total_hours)
        } else if total_days < 30 {
            let hours = total_hours - total_days * 24;
            if hours > 0 {
                format!("{}d {}h ago", total_days, hours)
            } else {
                format!("{}d ago", total_days)
            }
        } else if total_days < 365 {
            let months = total_days / 30;
            let days = total_days % 30;
            if days > 0 {
                format!("{}mo {}d ago", months, days)
            } else {
                format!("{}mo ago", months)
            }
        } else {
            let years = total_days / 365;
            let months = (total_days % 365) / 30;
            if months > 0 {
                format!("{}y {}mo ago", years, months)
            } else {
                format!("{}y ago", years)
            }
        }
    }
}
