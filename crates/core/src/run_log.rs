//! Append-only, timestamped run log.
//!
//! Every decision the merge pipeline takes is written here as a line prefixed
//! with `[YYYY-mm-dd HH:MM:SS] `. Diagnostic text from `svn` is appended
//! verbatim through [`RunLog::raw`]. Each write is flushed so the log stays
//! useful if the process dies mid-run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::errors::RunLogError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File name for a run log started now: `merge-YYYYmmdd-HHMMSS.log`.
pub fn log_file_name() -> String {
    format!("merge-{}.log", Local::now().format("%Y%m%d-%H%M%S"))
}

#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: Option<File>,
}

impl RunLog {
    /// Create (or append to) the log at `path`, creating parent directories.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RunLogError> {
        let path = path.into();
        let write_err = |source| RunLogError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(write_err)?;
        info!(path = %path.display(), "opened run log");
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), RunLogError> {
        let file = self.file.as_mut().ok_or(RunLogError::Closed)?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|source| RunLogError::Write {
                path: self.path.display().to_string(),
                source,
            })
    }

    /// Append a timestamped entry. Multi-line messages get one timestamp per
    /// line.
    pub fn line(&mut self, message: impl AsRef<str>) -> Result<(), RunLogError> {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let mut buf = String::new();
        let message = message.as_ref();
        if message.is_empty() {
            buf.push_str(&format!("[{}] \n", stamp));
        }
        for line in message.lines() {
            buf.push_str(&format!("[{}] {}\n", stamp, line));
        }
        self.write_bytes(buf.as_bytes())
    }

    /// Append text exactly as given, adding a trailing newline if missing.
    pub fn raw(&mut self, text: &str) -> Result<(), RunLogError> {
        if text.is_empty() {
            return Ok(());
        }
        self.write_bytes(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.write_bytes(b"\n")?;
        }
        Ok(())
    }

    /// Flush and release the file handle. Further writes fail with
    /// [`RunLogError::Closed`].
    pub fn close(&mut self) -> Result<(), RunLogError> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|source| RunLogError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
            debug!(path = %self.path.display(), "closed run log");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_timestamped(line: &str) -> bool {
        // "[2025-01-10 12:34:56] ..."
        line.len() >= 22
            && line.starts_with('[')
            && &line[20..22] == "] "
            && chrono::NaiveDateTime::parse_from_str(&line[1..20], TIMESTAMP_FORMAT).is_ok()
    }

    #[test]
    fn test_lines_are_timestamped_and_raw_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/run.log");
        let mut log = RunLog::open(&path).unwrap();
        log.line("merging r100").unwrap();
        log.raw("--- Merging r100 into '.':\nC    a.txt").unwrap();
        log.line("two\nlines").unwrap();
        log.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(is_timestamped(lines[0]));
        assert!(lines[0].ends_with("merging r100"));
        assert_eq!(lines[1], "--- Merging r100 into '.':");
        assert_eq!(lines[2], "C    a.txt");
        assert!(is_timestamped(lines[3]) && lines[3].ends_with("two"));
        assert!(is_timestamped(lines[4]) && lines[4].ends_with("lines"));
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::open(dir.path().join("run.log")).unwrap();
        log.close().unwrap();
        assert!(!log.is_open());
        assert!(matches!(log.line("late"), Err(RunLogError::Closed)));
        // Closing twice is harmless.
        log.close().unwrap();
    }

    #[test]
    fn test_log_file_name_shape() {
        let name = log_file_name();
        assert!(name.starts_with("merge-"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "merge-20250110-123456.log".len());
    }
}
