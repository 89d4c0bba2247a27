use log::debug;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::hook::HookError;
use crate::paths;

/// Writes formatted rows to the history files.
///
/// History files are append-only: rows are only ever added at the end, never
/// rewritten, reordered or deduplicated. Each variant's file is written
/// independently so one failing file never blocks the others.
pub struct HistoryAppender;

impl HistoryAppender {
    /// Append one formatted row followed by a record separator, creating the
    /// file if it does not exist yet
    pub fn append(history_path: &Path, row: &str) -> Result<(), HookError> {
        let append_err = |source: anyhow::Error| HookError::Append {
            path: history_path.to_path_buf(),
            source,
        };

        if let Some(parent) = history_path.parent() {
            if !parent.as_os_str().is_empty() {
                paths::ensure_directory(parent).map_err(append_err)?;
            }
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(history_path)
            .map_err(|e| append_err(e.into()))?;

        writeln!(file, "{row}").map_err(|e| append_err(e.into()))?;

        debug!("Appended history row to {}", history_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_creates_file() {
        let dir = tempdir().unwrap();
        let history = dir.path().join("bench_over_time.csv");

        HistoryAppender::append(&history, "12.3,abc,v1.0.0").unwrap();

        let contents = std::fs::read_to_string(&history).unwrap();
        assert_eq!(contents, "12.3,abc,v1.0.0\n");
    }

    #[test]
    fn test_append_preserves_existing_rows() {
        let dir = tempdir().unwrap();
        let history = dir.path().join("bench_over_time.csv");
        std::fs::write(&history, "1.0,aaa,v0.1.0\n2.0,bbb,v0.2.0\n").unwrap();

        HistoryAppender::append(&history, "3.0,ccc,v0.3.0").unwrap();
        HistoryAppender::append(&history, "4.0,ddd,v0.4.0").unwrap();

        let contents = std::fs::read_to_string(&history).unwrap();
        let rows: Vec<&str> = contents.lines().collect();
        assert_eq!(
            rows,
            vec![
                "1.0,aaa,v0.1.0",
                "2.0,bbb,v0.2.0",
                "3.0,ccc,v0.3.0",
                "4.0,ddd,v0.4.0",
            ]
        );
    }

    #[test]
    fn test_append_creates_missing_parent() {
        let dir = tempdir().unwrap();
        let history = dir.path().join("history").join("bench_over_time.csv");

        HistoryAppender::append(&history, "12.3,abc,v1.0.0").unwrap();
        assert!(history.exists());
    }

    #[test]
    fn test_append_failure_is_reported() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "plain file").unwrap();

        // The parent path is a regular file, so the open must fail
        let history = blocker.join("bench_over_time.csv");
        let result = HistoryAppender::append(&history, "12.3,abc,v1.0.0");
        assert!(matches!(result, Err(HookError::Append { .. })));
    }
}
