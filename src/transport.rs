//! External collaborators: file pickers, byte transport and the clipboard.
//!
//! The engine only ever sees these through [`Transport`], so any failure
//! comes back as an I/O error before a store has been touched.

use crate::error::{Result, TagError};
use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub trait Transport {
    /// Where to write an export, or `None` when the user backs out.
    fn select_save_path(&mut self, prefix: &str) -> Result<Option<PathBuf>>;
    /// Which file to read an import from, or `None` when the user backs out.
    fn select_open_path(&mut self) -> Result<Option<PathBuf>>;
    fn write_bytes(&mut self, path: &Path, text: &str) -> Result<()>;
    fn read_bytes(&mut self, path: &Path) -> Result<String>;
    fn copy_to_clipboard(&mut self, text: &str) -> Result<()>;
}

/// `<prefix>_YYYYMMDD_HHMM.json`
pub fn default_export_name(prefix: &str) -> String {
    format!("{prefix}_{}.json", Local::now().format("%Y%m%d_%H%M"))
}

/// Transport for the command line: paths come from arguments instead of a
/// dialog, and copied text goes to a clipboard command or stdout.
#[derive(Debug, Default, Clone)]
pub struct CliTransport {
    save_path: Option<PathBuf>,
    open_path: Option<PathBuf>,
    clipboard_command: Option<String>,
}

impl CliTransport {
    pub fn new(clipboard_command: Option<String>) -> Self {
        Self { clipboard_command, ..Self::default() }
    }

    pub fn with_save_path(mut self, path: Option<PathBuf>) -> Self {
        self.save_path = path;
        self
    }

    pub fn with_open_path(mut self, path: Option<PathBuf>) -> Self {
        self.open_path = path;
        self
    }
}

impl Transport for CliTransport {
    fn select_save_path(&mut self, prefix: &str) -> Result<Option<PathBuf>> {
        Ok(Some(
            self.save_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(default_export_name(prefix))),
        ))
    }

    fn select_open_path(&mut self) -> Result<Option<PathBuf>> {
        Ok(self.open_path.clone())
    }

    fn write_bytes(&mut self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text)?;
        debug!(path = %path.display(), bytes = text.len(), "wrote export");
        Ok(())
    }

    fn read_bytes(&mut self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Result<()> {
        let Some(cmd) = self.clipboard_command.as_deref() else {
            println!("{text}");
            return Ok(());
        };
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(TagError::Io(std::io::Error::other(format!(
                "clipboard command exited with {status}"
            ))));
        }
        Ok(())
    }
}
