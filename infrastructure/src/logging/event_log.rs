//! JSONL file writer for trip events.
//!
//! Each [`TripEvent`] is serialized as a single JSON line carrying its
//! `type`, the `trip_id` and a `timestamp`, appended via a buffered writer.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use tripsync_application::{NotificationSink, NotifyError};
use tripsync_domain::{TripEvent, TripId};

/// JSONL event log that appends one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every line and
/// on `Drop`.
pub struct JsonlEventLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventLog {
    /// Open the log at `path` in append mode.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create event log directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(trip_id: &TripId, event: &TripEvent) -> Result<String, serde_json::Error> {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut value = serde_json::to_value(event)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("trip_id".to_string(), serde_json::Value::String(trip_id.to_string()));
            map.insert("timestamp".to_string(), serde_json::Value::String(timestamp));
        }
        serde_json::to_string(&value)
    }
}

#[async_trait]
impl NotificationSink for JsonlEventLog {
    async fn publish(&self, trip_id: &TripId, event: TripEvent) -> Result<(), NotifyError> {
        let line = Self::record(trip_id, &event)
            .map_err(|e| NotifyError::Delivery(format!("encode {}: {e}", event.kind())))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| NotifyError::Delivery("event log writer poisoned".to_string()))?;
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(|e| NotifyError::Delivery(format!("{}: {e}", self.path.display())))
    }
}

impl Drop for JsonlEventLog {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripsync_domain::{Phase, RunStatus};

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_event_log_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("trip.events.jsonl");
        let log = JsonlEventLog::new(&path).unwrap();
        let trip = TripId::new("t1");

        log.publish(
            &trip,
            TripEvent::RunStatusChanged {
                status: RunStatus::Paused,
                reason: Some("waiting for members".into()),
            },
        )
        .await
        .unwrap();
        log.publish(
            &trip,
            TripEvent::PhaseResolved {
                phase: Phase::DestinationDecision,
                decision: Some("Lima".into()),
                rationale: "most requested".into(),
            },
        )
        .await
        .unwrap();
        drop(log);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        for line in &lines {
            assert_eq!(line["trip_id"], "t1");
            assert!(line.get("timestamp").is_some());
        }
        assert_eq!(lines[0]["type"], "run_status_changed");
        assert_eq!(lines[0]["status"], "paused");
        assert_eq!(lines[1]["type"], "phase_resolved");
        assert_eq!(lines[1]["phase"], "destination_decision");
        assert_eq!(lines[1]["decision"], "Lima");
    }

    #[tokio::test]
    async fn test_event_log_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let trip = TripId::new("t1");

        for message in ["one", "two"] {
            let log = JsonlEventLog::new(&path).unwrap();
            log.publish(&trip, TripEvent::info(message)).await.unwrap();
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["message"], "two");
        assert_eq!(lines[1]["level"], "info");
    }
}
