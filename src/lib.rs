pub mod args;
pub mod collate;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod formatting;
mod help;
pub mod history;
pub mod logging;
pub mod reorder;
pub mod storage;
pub mod suggest;
pub mod sync;
pub mod tags;
pub mod transport;

pub mod shared {
    pub mod table;
}

use args::{ArgParser, split_polarity};
use config::Config;
use formatting::{FormatContext, TimeFormatter};
use reorder::GestureOutcome;
use shared::table::{render_table, truncate_with_ellipsis};
use std::env;
use std::error::Error;
use std::path::PathBuf;
use storage::ensure_dir;
use sync::{Workspace, open_workspace};
use tags::Polarity;
use transport::CliTransport;

pub use error::{Result, TagError};

pub fn entry() -> std::result::Result<(), Box<dyn Error>> {
    logging::init();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        help::run(Vec::new())?;
        return Ok(());
    }
    let config = Config::from_env()?;
    run(args, &config)
}

/// Dispatch one command line (without the program name).
pub fn run(
    mut args: Vec<String>,
    config: &Config,
) -> std::result::Result<(), Box<dyn Error>> {
    let cmd = args.remove(0);
    match cmd.as_str() {
        "help" | "-h" | "--help" => return help::run(args),
        "path" => {
            println!("{}", config.data_dir.display());
            return Ok(());
        }
        _ => {}
    }

    ensure_dir(&config.data_dir)?;
    let mut ws = open_workspace(&config.data_dir, config.collator.clone())?;
    let fmt = FormatContext::new(config.use_color);
    let (polarity, args) = split_polarity(args);

    match cmd.as_str() {
        "add" => add_tags(&mut ws, polarity, args, &fmt)?,
        "remove" | "rm" => remove_tag(&mut ws, polarity, args)?,
        "clear" => {
            ArgParser::new(args, "clear").finish()?;
            ws.clear(polarity)?;
            println!("Cleared {} tags", polarity.as_str());
        }
        "reorder" => reorder_tags(&mut ws, polarity, args, &fmt)?,
        "move" | "mv" => move_tag(&mut ws, polarity, args, &fmt)?,
        "mark" => mark_tag(&mut ws, polarity, args)?,
        "show" | "status" => show(&ws, &fmt),
        "suggest" => suggest(&ws, polarity, args, &fmt),
        "forget" => forget_tag(&mut ws, polarity, args)?,
        "vocab" => {
            for tag in ws.store(polarity).vocabulary() {
                println!("{}", fmt.format_tag(tag, polarity));
            }
        }
        "copy" | "save" => copy_and_save(&mut ws, args, config)?,
        "history" => history(&mut ws, args, &fmt)?,
        "dict" | "dictionary" => {
            dictionary(&mut ws, polarity, args, config, &fmt)?
        }
        "export" => export(&ws, args, config)?,
        "import" => import(&mut ws, args, config)?,
        other => {
            help::run(Vec::new())?;
            return Err(format!("Unknown command: {other}").into());
        }
    }

    Ok(())
}

pub(crate) fn terminal_columns() -> Option<usize> {
    terminal_size::terminal_size().map(|(w, _)| w.0 as usize)
}

fn format_selection(
    ws: &Workspace,
    polarity: Polarity,
    fmt: &FormatContext,
) -> String {
    let store = ws.store(polarity);
    if store.selected().is_empty() {
        return "(none)".to_string();
    }
    store
        .selected()
        .iter()
        .map(|tag| {
            if store.marked().contains(tag) {
                fmt.format_marked(tag)
            } else {
                fmt.format_tag(tag, polarity)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn add_tags(
    ws: &mut Workspace,
    polarity: Polarity,
    args: Vec<String>,
    fmt: &FormatContext,
) -> std::result::Result<(), Box<dyn Error>> {
    if args.is_empty() {
        return Err("Provide tags to add, e.g. `pt add \"cat, dog\"`".into());
    }
    let result = ws.add_free_text(polarity, &args.join(","))?;
    if result.is_empty() {
        println!("Nothing new to add");
    } else {
        let added: Vec<String> = result
            .added
            .iter()
            .map(|t| fmt.format_tag(t, polarity))
            .collect();
        println!("Added {}", added.join(", "));
    }
    Ok(())
}

fn remove_tag(
    ws: &mut Workspace,
    polarity: Polarity,
    args: Vec<String>,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "remove");
    let tag = parser.extract_tag()?;
    parser.finish()?;
    ws.remove(polarity, &tag)?;
    println!("Removed {tag}");
    Ok(())
}

fn forget_tag(
    ws: &mut Workspace,
    polarity: Polarity,
    args: Vec<String>,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "forget");
    let tag = parser.extract_tag()?;
    parser.finish()?;
    ws.delete_from_vocabulary(polarity, &tag)?;
    println!("Forgot {tag}");
    Ok(())
}

fn reorder_tags(
    ws: &mut Workspace,
    polarity: Polarity,
    args: Vec<String>,
    fmt: &FormatContext,
) -> std::result::Result<(), Box<dyn Error>> {
    let order: Vec<String> =
        args.iter().map(|a| tags::normalize_tag(a)).collect();
    ws.reorder(polarity, order)?;
    println!("{}", format_selection(ws, polarity, fmt));
    Ok(())
}

fn move_tag(
    ws: &mut Workspace,
    polarity: Polarity,
    args: Vec<String>,
    fmt: &FormatContext,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "move");
    let tag = parser.extract_tag()?;
    let index = parser.extract_index()?;
    parser.finish()?;

    let selected = ws.store(polarity).selected();
    let Some(target) = selected.get(index).cloned() else {
        return Err(format!(
            "Index {index} is out of range ({} tags selected)",
            selected.len()
        )
        .into());
    };
    if target == tag {
        println!("{tag} is already at {index}");
        return Ok(());
    }
    ws.drag(polarity, &tag, &[target.as_str()], Some(&target))?;
    println!("{}", format_selection(ws, polarity, fmt));
    Ok(())
}

fn mark_tag(
    ws: &mut Workspace,
    polarity: Polarity,
    args: Vec<String>,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "mark");
    let tag = parser.extract_tag()?;
    parser.finish()?;
    if let GestureOutcome::ToggledSelect(tag) =
        ws.drag(polarity, &tag, &[], Some(&tag))?
    {
        if ws.store(polarity).marked().contains(&tag) {
            println!("Marked {tag}");
        } else {
            println!("Unmarked {tag}");
        }
    }
    Ok(())
}

fn show(ws: &Workspace, fmt: &FormatContext) {
    for polarity in Polarity::ALL {
        println!(
            "{} ({}): {}",
            fmt.format_header(polarity.label()),
            ws.active_dictionary(polarity),
            format_selection(ws, polarity, fmt)
        );
    }
}

fn suggest(
    ws: &Workspace,
    polarity: Polarity,
    args: Vec<String>,
    fmt: &FormatContext,
) {
    let query = args.join(" ");
    for tag in ws.suggest(polarity, &query) {
        println!("{}", fmt.highlight_match(&tag, Some(&query)));
    }
}

fn copy_and_save(
    ws: &mut Workspace,
    args: Vec<String>,
    config: &Config,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut title = None;
    let mut parser = ArgParser::new(args, "copy");
    while let Some(arg) = parser.next() {
        match arg.as_str() {
            "-t" | "--title" => title = Some(parser.extract_value(&arg)?),
            other => {
                return Err(format!("Unknown flag for copy: {other}").into());
            }
        }
    }
    let mut transport = CliTransport::new(config.clipboard_command.clone());
    match ws.copy_and_save(title.as_deref(), &mut transport)? {
        Some(record) => eprintln!("Saved {}", record.summary()),
        None => eprintln!("Nothing selected"),
    }
    Ok(())
}

fn history(
    ws: &mut Workspace,
    args: Vec<String>,
    fmt: &FormatContext,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "history");
    let sub = parser.next().unwrap_or_else(|| "list".to_string());
    match sub.as_str() {
        "list" | "ls" => {
            let mut relative = false;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "-r" | "--relative" => relative = true,
                    other => {
                        return Err(format!(
                            "Unknown flag for history list: {other}"
                        )
                        .into());
                    }
                }
            }
            list_history(ws, relative, fmt);
        }
        "select" => {
            let index = parser.extract_index()?;
            parser.finish()?;
            let record = ws.select_history(index)?;
            println!("Selected {}", record.summary());
            show(ws, fmt);
        }
        "delete" | "rm" => {
            let index = parser.extract_index()?;
            parser.finish()?;
            let deleted = ws.delete_history(index)?;
            println!("Deleted {}", deleted.record.summary());
            if deleted.was_selected {
                println!("Cleared the selections it was replayed into");
            }
        }
        other => {
            return Err(format!("Unknown history command: {other}").into());
        }
    }
    Ok(())
}

fn list_history(ws: &Workspace, relative: bool, fmt: &FormatContext) {
    let records = ws.history().records();
    if records.is_empty() {
        println!("No history yet");
        return;
    }
    let times = TimeFormatter::local(relative);
    let width = terminal_columns().unwrap_or(100).max(60);
    let preview_width = width.saturating_sub(40).max(12);
    let selected = ws.history().selected_index();
    let headers = ["#", "Title", "Time", "P", "N", "Positive"]
        .iter()
        .map(|h| fmt.format_header(h))
        .collect::<Vec<_>>();
    let rows: Vec<Vec<String>> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let index = if selected == Some(i) {
                format!("{i}*")
            } else {
                i.to_string()
            };
            vec![
                fmt.format_id(&index),
                truncate_with_ellipsis(r.title.as_deref().unwrap_or(""), 24),
                fmt.format_timestamp(&times.format(&r.timestamp)),
                r.positive.len().to_string(),
                r.negative.len().to_string(),
                truncate_with_ellipsis(&r.positive.join(", "), preview_width),
            ]
        })
        .collect();
    println!("{}", render_table(&headers, &rows));
}

fn dictionary(
    ws: &mut Workspace,
    polarity: Polarity,
    args: Vec<String>,
    config: &Config,
    fmt: &FormatContext,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "dict");
    let sub = parser.next().unwrap_or_else(|| "list".to_string());
    match sub.as_str() {
        "list" | "ls" => {
            parser.finish()?;
            let active = ws.active_dictionary(polarity).to_string();
            let headers = vec![
                fmt.format_header("Name"),
                fmt.format_header("Bundles"),
                fmt.format_header("Active"),
            ];
            let mut rows = Vec::new();
            for name in ws.dictionaries().list(polarity)? {
                let dict = ws.dictionaries().get(polarity, &name)?;
                let marker = if name == active { "*" } else { "" };
                rows.push(vec![
                    name,
                    dict.len().to_string(),
                    marker.to_string(),
                ]);
            }
            println!("{}", render_table(&headers, &rows));
        }
        "show" => {
            let name = parser
                .next()
                .unwrap_or_else(|| ws.active_dictionary(polarity).to_string());
            parser.finish()?;
            let dict = ws.dictionaries().get(polarity, &name)?;
            println!(
                "{} {}",
                fmt.format_header(&format!("{}/{}", dict.kind, dict.name)),
                fmt.format_id(&format!("({} bundles)", dict.len()))
            );
            for bundle in dict.bundles() {
                let labels: Vec<String> = bundle
                    .labels
                    .iter()
                    .map(|l| fmt.format_tag(l, polarity))
                    .collect();
                println!("{}: {}", bundle.key, labels.join(", "));
            }
        }
        "use" => {
            let name = parser.extract_value("use")?;
            parser.finish()?;
            ws.use_dictionary(polarity, &name)?;
            println!("Using {polarity}/{}", name.trim());
        }
        "new" | "create" => {
            let name = parser.extract_value("new")?;
            parser.finish()?;
            let dict = ws.create_dictionary(polarity, &name)?;
            println!("Created {polarity}/{}", dict.name);
        }
        "rename" | "mv" => {
            let old = parser.extract_value("rename")?;
            let new = parser.extract_value("rename")?;
            parser.finish()?;
            ws.rename_dictionary(polarity, &old, &new)?;
            println!("Renamed {polarity}/{} to {}", old.trim(), new.trim());
        }
        "copy" | "cp" => {
            let name = parser.extract_value("copy")?;
            let new = parser.next();
            parser.finish()?;
            let dict = ws.copy_dictionary(polarity, &name, new.as_deref())?;
            println!("Copied {polarity}/{} to {}", name.trim(), dict.name);
        }
        "delete" | "rm" => {
            let name = parser.extract_value("delete")?;
            parser.finish()?;
            ws.delete_dictionary(polarity, &name)?;
            println!("Deleted {polarity}/{}", name.trim());
        }
        "put" => {
            let key = parser.extract_value("put")?;
            let labels: Vec<String> = parser
                .collect_remaining()
                .iter()
                .flat_map(|a| tags::split_free_text(a))
                .collect();
            let bundle = ws.put_bundle(polarity, &key, labels)?;
            println!("Stored {} ({} tags)", bundle.key, bundle.labels.len());
        }
        "drop" => {
            let key = parser.extract_value("drop")?;
            parser.finish()?;
            let bundle = ws.delete_bundle(polarity, &key)?;
            println!("Dropped {}", bundle.key);
        }
        "insert" => {
            let key = parser.extract_value("insert")?;
            parser.finish()?;
            let result = ws.add_from_bundle(polarity, &key)?;
            if result.is_empty() {
                println!("Nothing new to add");
            } else {
                println!("Added {}", result.added.join(", "));
            }
        }
        "capture" => {
            let key = parser.extract_value("capture")?;
            parser.finish()?;
            let bundle = ws.capture_bundle(polarity, &key)?;
            println!("Captured {}: {}", bundle.key, bundle.labels.join(", "));
        }
        "export" => {
            let name = parser.next();
            let path = parser.next().map(PathBuf::from);
            parser.finish()?;
            let mut transport = CliTransport::new(None).with_save_path(path);
            if let Some(path) =
                ws.export_dictionary(polarity, name.as_deref(), &mut transport)?
            {
                println!("Exported to {}", path.display());
            }
        }
        "import" => {
            let mut path = None;
            let mut rename_to = None;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--as" => rename_to = Some(parser.extract_value("--as")?),
                    _ if path.is_none() => path = Some(PathBuf::from(arg)),
                    other => {
                        return Err(format!(
                            "Unexpected argument for dict import: {other}"
                        )
                        .into());
                    }
                }
            }
            let path = path.ok_or("Provide a file to import")?;
            let mut transport =
                CliTransport::new(config.clipboard_command.clone())
                    .with_open_path(Some(path));
            if let Some(dict) =
                ws.import_dictionary(&mut transport, rename_to.as_deref())?
            {
                println!(
                    "Imported {}/{} ({} bundles)",
                    dict.kind,
                    dict.name,
                    dict.len()
                );
            }
        }
        "merge" => {
            let mut path = None;
            let mut confirm = false;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--confirm" | "-y" => confirm = true,
                    _ if path.is_none() => path = Some(PathBuf::from(arg)),
                    other => {
                        return Err(format!(
                            "Unexpected argument for dict merge: {other}"
                        )
                        .into());
                    }
                }
            }
            let path = path.ok_or("Provide a file to merge")?;
            let mut transport =
                CliTransport::new(None).with_open_path(Some(path));
            if let Some(report) =
                ws.merge_dictionary(polarity, &mut transport, confirm)?
            {
                if report.cross_type {
                    println!("Merged a dictionary of the other type");
                }
                println!(
                    "Added {} bundles, kept {} existing",
                    report.added.len(),
                    report.kept.len()
                );
            }
        }
        other => {
            return Err(format!("Unknown dict command: {other}").into());
        }
    }
    Ok(())
}

fn export(
    ws: &Workspace,
    args: Vec<String>,
    config: &Config,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "export");
    let path = parser.next().map(PathBuf::from);
    parser.finish()?;
    let mut transport =
        CliTransport::new(config.clipboard_command.clone()).with_save_path(path);
    if let Some(path) = ws.export(&mut transport)? {
        println!("Exported to {}", path.display());
    }
    Ok(())
}

fn import(
    ws: &mut Workspace,
    args: Vec<String>,
    config: &Config,
) -> std::result::Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "import");
    let path = parser
        .next()
        .map(PathBuf::from)
        .ok_or("Provide a file to import, e.g. `pt import promptLogs.json`")?;
    parser.finish()?;
    let mut transport = CliTransport::new(config.clipboard_command.clone())
        .with_open_path(Some(path));
    if let Some(report) = ws.import(&mut transport)? {
        println!(
            "Imported {} positive and {} negative tags, {} history entries",
            report.positive_added,
            report.negative_added,
            report.history_appended
        );
    }
    Ok(())
}
