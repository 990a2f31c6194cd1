//! Append-only activity log.
//!
//! One line per record, `<YYYY-MM-DD HH:MM:SS> - <message>`, local time.
//! Concurrent writers may interleave lines; the log is diagnostic only.

use chrono::{Local, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `message` stamped with the current local time.
    pub fn append(&self, message: &str) -> io::Result<()> {
        self.append_at(Local::now().naive_local(), message)
    }

    pub fn append_at(&self, at: NaiveDateTime, message: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_record(at, message))
    }

    /// The most recent `limit` lines, oldest first. A log that was never
    /// written reads as empty.
    pub fn tail(&self, limit: usize) -> io::Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.is_empty()).collect();
        let skip = lines.len().saturating_sub(limit);
        Ok(lines[skip..].iter().map(|l| l.to_string()).collect())
    }
}

/// Renders one log line. Line breaks inside `message` are flattened so a
/// record never spans lines.
pub fn format_record(at: NaiveDateTime, message: &str) -> String {
    let flat = message.replace(['\r', '\n'], " ");
    format!("{} - {}", at.format(TIMESTAMP_FORMAT), flat)
}
