//! Day-partitioned JSONL file sink for the workflow journal.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{Local, NaiveDate};

use super::{Journal, JournalEntry};
use crate::{AppError, Result};

/// File currently receiving entries.
struct DayFile {
    date: NaiveDate,
    file: File,
}

/// Journal appending to `<log_dir>/workflow-YYYY-MM-DD.jsonl`.
///
/// An entry lands in the file for the local date of its own timestamp, so
/// an entry stamped before midnight and written after it still goes to the
/// earlier day. Each line is written with a single append.
pub struct JsonlJournal {
    log_dir: PathBuf,
    current: Mutex<Option<DayFile>>,
}

impl JsonlJournal {
    /// Journal storing files in `log_dir`, created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Journal`] if the directory cannot be created.
    pub fn new(log_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&log_dir).map_err(|e| {
            AppError::Journal(format!(
                "failed to create journal directory {}: {e}",
                log_dir.display()
            ))
        })?;
        Ok(Self {
            log_dir,
            current: Mutex::new(None),
        })
    }

    /// Path of the journal file for `date`.
    #[must_use]
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.log_dir.join(format!("workflow-{date}.jsonl"))
    }

    fn open_day(&self, date: NaiveDate) -> Result<DayFile> {
        let path = self.file_for(date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                AppError::Journal(format!("failed to open journal {}: {e}", path.display()))
            })?;
        Ok(DayFile { date, file })
    }
}

impl Journal for JsonlJournal {
    fn record(&self, entry: JournalEntry) -> Result<()> {
        let date = entry.timestamp.with_timezone(&Local).date_naive();
        let mut line = serde_json::to_vec(&entry)
            .map_err(|e| AppError::Journal(format!("failed to serialize entry: {e}")))?;
        line.push(b'\n');

        let mut current = self
            .current
            .lock()
            .map_err(|_| AppError::Journal("journal mutex poisoned".into()))?;

        let day = match current.take() {
            Some(day) if day.date == date => day,
            _ => self.open_day(date)?,
        };
        let day = current.insert(day);

        day.file.write_all(&line).map_err(|e| {
            AppError::Journal(format!(
                "failed to append to {}: {e}",
                self.file_for(date).display()
            ))
        })
    }
}
