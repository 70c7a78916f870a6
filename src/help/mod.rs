use crate::terminal_columns;
use std::error::Error;
use std::io::{self, Write};

mod content;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Command,
    Environment,
    Guide,
}

impl Section {
    const ORDER: [Section; 3] =
        [Section::Command, Section::Guide, Section::Environment];

    fn label(self) -> &'static str {
        match self {
            Section::Command => "Commands",
            Section::Environment => "Environment",
            Section::Guide => "Guides",
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct HelpFlag<'a> {
    pub name: &'a str,
    pub desc: &'a str,
}

#[derive(Clone, Copy)]
pub(crate) struct HelpTopic<'a> {
    pub name: &'a str,
    pub summary: &'a str,
    pub usage: &'a str,
    pub details: &'a [&'a str],
    pub flags: &'a [HelpFlag<'a>],
    pub aliases: &'a [&'a str],
    pub section: Section,
    pub examples: &'a [&'a str],
}

#[derive(Clone, Copy)]
pub(crate) struct HelpBook<'a> {
    pub title: &'a str,
    pub usage: &'a str,
    pub topics: &'a [HelpTopic<'a>],
    pub footer: &'a [&'a str],
}

impl<'a> HelpBook<'a> {
    fn find(&self, name: &str) -> Option<&HelpTopic<'a>> {
        self.topics.iter().find(|topic| {
            topic.name.eq_ignore_ascii_case(name)
                || topic.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
    }
}

pub(crate) fn run(args: Vec<String>) -> Result<(), Box<dyn Error>> {
    let book = content::book();
    let width = terminal_columns().unwrap_or(96).clamp(64, 120);
    let topic = args.first().and_then(|name| {
        let found = book.find(name);
        if found.is_none() {
            eprintln!("Unknown help topic: {name}");
        }
        found
    });
    let lines = match topic {
        Some(topic) => topic_page(&book, topic, width),
        None => overview(&book, width),
    };

    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Title, then one usage/summary table per section, then the footer.
fn overview(book: &HelpBook<'_>, width: usize) -> Vec<String> {
    let mut out = vec![
        book.title.to_string(),
        format!("usage: {}", book.usage),
        String::new(),
    ];
    for section in Section::ORDER {
        let rows: Vec<(&str, &str)> = book
            .topics
            .iter()
            .filter(|t| t.section == section)
            .map(|t| (t.usage, t.summary))
            .collect();
        out.extend(two_columns(section.label(), &rows, width));
    }
    out.extend(book.footer.iter().flat_map(|l| wrap(l, width)));
    out
}

fn topic_page(
    book: &HelpBook<'_>,
    topic: &HelpTopic<'_>,
    width: usize,
) -> Vec<String> {
    let mut out = vec![
        format!("{}: {}", topic.name, topic.summary),
        format!("usage: {}", topic.usage),
    ];
    if !topic.aliases.is_empty() {
        out.push(format!("aliases: {}", topic.aliases.join(", ")));
    }
    out.push(String::new());
    if !topic.details.is_empty() {
        out.extend(topic.details.iter().flat_map(|l| wrap(l, width)));
        out.push(String::new());
    }
    let flags: Vec<(&str, &str)> =
        topic.flags.iter().map(|f| (f.name, f.desc)).collect();
    out.extend(two_columns("Options", &flags, width));
    if !topic.examples.is_empty() {
        out.push("Examples:".to_string());
        for example in topic.examples {
            out.extend(wrap(example, width - 2).into_iter().map(|l| format!("  {l}")));
        }
        out.push(String::new());
    }
    out.extend(book.footer.iter().flat_map(|l| wrap(l, width)));
    out
}

/// Label column capped at 38 and never wider than half the screen.
fn two_columns(title: &str, rows: &[(&str, &str)], width: usize) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }
    let label_width = rows
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0)
        .min(38)
        .min(width / 2 - 4);
    let desc_width = width - label_width - 4;

    let mut out = vec![format!("{title}:")];
    for (label, desc) in rows {
        let labels = wrap(label, label_width);
        let descs = wrap(desc, desc_width);
        for idx in 0..labels.len().max(descs.len()) {
            let l = labels.get(idx).map(String::as_str).unwrap_or("");
            let d = descs.get(idx).map(String::as_str).unwrap_or("");
            out.push(format!("  {l:label_width$}  {d}").trim_end().to_string());
        }
    }
    out.push(String::new());
    out
}

/// Greedy word wrap; a word longer than `width` gets a line to itself.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        match out.last_mut() {
            Some(line) if line.len() + 1 + word.len() <= width => {
                line.push(' ');
                line.push_str(word);
            }
            _ => out.push(word.to_string()),
        }
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}
