//! history.rs — append-only log of published items, the baseline for uniqueness.
//!
//! The engine only reads it; appends happen after an external publish confirmation.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::HotnessError;
use crate::types::PublishedRecord;

const MAX_IN_MEMORY: usize = 100_000;
const MAX_AGE_HOURS: u64 = 24 * 365 * 100;

/// Bounded lookback: records older than `max_age_hours`, or beyond the most
/// recent `max_records`, are not compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryWindow {
    pub max_age_hours: Option<u64>,
    pub max_records: Option<usize>,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_age_hours: Some(7 * 24),
            max_records: Some(500),
        }
    }
}

impl HistoryWindow {
    pub fn unbounded() -> Self {
        Self {
            max_age_hours: None,
            max_records: None,
        }
    }

    /// Apply the window to records in append order.
    pub fn apply(&self, records: &[PublishedRecord], now: DateTime<Utc>) -> Vec<PublishedRecord> {
        // a cutoff before the representable range means no cutoff
        let cutoff = self
            .max_age_hours
            .and_then(|h| now.checked_sub_signed(Duration::hours(h.min(MAX_AGE_HOURS) as i64)));
        let in_age: Vec<&PublishedRecord> = records
            .iter()
            .filter(|r| cutoff.is_none_or(|c| r.published_at >= c))
            .collect();
        let start = self
            .max_records
            .map(|m| in_age.len().saturating_sub(m))
            .unwrap_or(0);
        in_age[start..].iter().map(|r| (*r).clone()).collect()
    }
}

pub trait HistoryStore: Send + Sync {
    fn lookup(
        &self,
        window: &HistoryWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<PublishedRecord>, HotnessError>;

    fn append(&self, record: PublishedRecord) -> Result<(), HotnessError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_record(record: &PublishedRecord) -> Result<(), HotnessError> {
    if record.url.trim().is_empty() {
        return Err(HotnessError::History("record has an empty url".to_string()));
    }
    if record.embedding.is_empty() || record.embedding.iter().any(|x| !x.is_finite()) {
        return Err(HotnessError::History(format!(
            "record {} has an empty or non-finite embedding",
            record.url
        )));
    }
    Ok(())
}

#[derive(Debug)]
pub struct InMemoryHistory {
    inner: Mutex<Vec<PublishedRecord>>,
    cap: usize,
}

impl InMemoryHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_IN_MEMORY);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(1024))),
            cap,
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::with_capacity(MAX_IN_MEMORY)
    }
}

impl HistoryStore for InMemoryHistory {
    fn lookup(
        &self,
        window: &HistoryWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<PublishedRecord>, HotnessError> {
        let v = self
            .inner
            .lock()
            .map_err(|_| HotnessError::History("history mutex poisoned".to_string()))?;
        Ok(window.apply(&v, now))
    }

    fn append(&self, record: PublishedRecord) -> Result<(), HotnessError> {
        check_record(&record)?;
        let mut v = self
            .inner
            .lock()
            .map_err(|_| HotnessError::History("history mutex poisoned".to_string()))?;
        v.push(record);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }
}

/// JSON-lines file, one record per line. Loaded fully on open; each append is
/// written and flushed before it becomes visible to lookups.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    inner: Mutex<Vec<PublishedRecord>>,
}

impl JsonlHistory {
    /// Open (or create) the log at `path`. Unparseable lines are skipped with a warning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HotnessError> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();

        if path.exists() {
            let file = fs::File::open(&path)
                .map_err(|e| HotnessError::History(format!("open {}: {e}", path.display())))?;
            for (lineno, line) in BufReader::new(file).lines().enumerate() {
                let line = line
                    .map_err(|e| HotnessError::History(format!("read {}: {e}", path.display())))?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<PublishedRecord>(&line) {
                    Ok(r) => records.push(r),
                    Err(e) => tracing::warn!(
                        target: "hotness",
                        path = %path.display(),
                        line = lineno + 1,
                        error = %e,
                        "skipping malformed history line"
                    ),
                }
            }
        } else if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| HotnessError::History(format!("create {}: {e}", dir.display())))?;
        }

        tracing::info!(
            target: "hotness",
            path = %path.display(),
            records = records.len(),
            "history loaded"
        );
        Ok(Self {
            path,
            inner: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonlHistory {
    fn lookup(
        &self,
        window: &HistoryWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<PublishedRecord>, HotnessError> {
        let v = self
            .inner
            .lock()
            .map_err(|_| HotnessError::History("history mutex poisoned".to_string()))?;
        Ok(window.apply(&v, now))
    }

    fn append(&self, record: PublishedRecord) -> Result<(), HotnessError> {
        check_record(&record)?;
        let line = serde_json::to_string(&record)
            .map_err(|e| HotnessError::History(format!("encode record: {e}")))?;

        // Hold the lock across the write so file order matches memory order.
        let mut v = self
            .inner
            .lock()
            .map_err(|_| HotnessError::History("history mutex poisoned".to_string()))?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HotnessError::History(format!("open {}: {e}", self.path.display())))?;
        writeln!(f, "{line}")
            .and_then(|_| f.flush())
            .map_err(|e| HotnessError::History(format!("write {}: {e}", self.path.display())))?;
        v.push(record);
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }
}
