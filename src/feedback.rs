//! Append-only feedback log.
//!
//! Records which answers users accepted so an offline tuning job can adjust
//! ranking weights later. The log is JSONL, append-only, and fully decoupled
//! from the request path: a failed append is logged and swallowed, never
//! surfaced to the questioner.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;

/// One accepted/rejected answer observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub event_id: Uuid,
    pub session_id: Option<String>,
    pub entry_id: u64,
    /// True when the user accepted the automatic answer or picked the
    /// suggestion
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackEvent {
    pub fn new(session_id: Option<String>, entry_id: u64, accepted: bool) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            session_id,
            entry_id,
            accepted,
            timestamp: Utc::now(),
        }
    }
}

/// JSONL event log handle.
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single JSON line.
    pub fn record(&self, event: &FeedbackEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read the whole log back (offline consumer side; not on the request
    /// path).
    pub fn read_all(&self) -> Result<Vec<FeedbackEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let mut events = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_read_back() {
        let dir = TempDir::new().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback.jsonl"));

        log.record(&FeedbackEvent::new(Some("s1".to_string()), 1, true))
            .unwrap();
        log.record(&FeedbackEvent::new(None, 2, false)).unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].entry_id, 1);
        assert!(events[0].accepted);
        assert_eq!(events[1].session_id, None);
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = FeedbackLog::new(dir.path().join("absent.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_only_across_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback.jsonl");

        FeedbackLog::new(&path)
            .record(&FeedbackEvent::new(None, 1, true))
            .unwrap();
        FeedbackLog::new(&path)
            .record(&FeedbackEvent::new(None, 2, true))
            .unwrap();

        assert_eq!(FeedbackLog::new(&path).read_all().unwrap().len(), 2);
    }
}
