//! JSONL transcript writer.
//!
//! Each [`TranscriptEvent`] becomes one line: the payload's fields merged
//! with `type`, `timestamp` (UTC, millisecond RFC 3339) and, when set,
//! `session`. Non-object payloads are nested under `data`.

use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use toolpod_application::{TranscriptEvent, TranscriptLogger};
use tracing::warn;

/// Transcript logger writing JSON Lines.
///
/// Writes go through `Mutex<BufWriter<File>>` and are flushed after every
/// line, so a transcript is complete up to the last event even if the
/// process is killed.
pub struct JsonlTranscriptLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    session_id: Option<String>,
    lines: AtomicUsize,
}

impl JsonlTranscriptLogger {
    /// Create (or truncate) the transcript at `path`, creating parent
    /// directories as needed.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open(path.as_ref(), false)
    }

    /// Open the transcript at `path` for appending.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open(path.as_ref(), true)
    }

    fn open(path: &Path, append: bool) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
            session_id: None,
            lines: AtomicUsize::new(0),
        })
    }

    /// Tag every record with a `session` field.
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far by this logger.
    pub fn lines_written(&self) -> usize {
        self.lines.load(Ordering::Relaxed)
    }

    fn record(&self, event: TranscriptEvent) -> Value {
        let mut map = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert("type".to_string(), Value::String(event.event_type.to_string()));
        map.insert(
            "timestamp".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );
        if let Some(id) = &self.session_id {
            map.insert("session".to_string(), Value::String(id.clone()));
        }
        Value::Object(map)
    }
}

impl TranscriptLogger for JsonlTranscriptLogger {
    fn log(&self, event: TranscriptEvent) {
        let event_type = event.event_type;
        let line = match serde_json::to_string(&self.record(event)) {
            Ok(line) => line,
            Err(e) => {
                warn!(event_type, error = %e, "Failed to serialize transcript event");
                return;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let written = writeln!(writer, "{}", line).and_then(|_| writer.flush());
        match written {
            Ok(()) => {
                self.lines.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to write transcript"),
        }
    }
}

impl Drop for JsonlTranscriptLogger {
    fn drop(&mut self) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_record_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/run.jsonl");
        let logger = JsonlTranscriptLogger::create(&path).unwrap().with_session_id("s-1");

        logger.log(TranscriptEvent::new(
            "tool_call",
            json!({"call_id": "c1", "tool": "read_file", "arguments": {"path": "a.rs"}}),
        ));
        logger.log(TranscriptEvent::new(
            "session_end",
            json!({"reason": "completed", "turns": 2}),
        ));
        assert_eq!(logger.lines_written(), 2);

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "tool_call");
        assert_eq!(records[0]["tool"], "read_file");
        assert_eq!(records[0]["arguments"]["path"], "a.rs");
        assert_eq!(records[0]["session"], "s-1");
        assert!(records[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(records[1]["type"], "session_end");
        assert_eq!(records[1]["turns"], 2);
    }

    #[test]
    fn test_non_object_payload_is_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let logger = JsonlTranscriptLogger::create(&path).unwrap();
        logger.log(TranscriptEvent::new("model_turn", json!("plain answer")));

        let records = read_lines(&path);
        assert_eq!(records[0]["data"], "plain answer");
        assert!(records[0].get("session").is_none());
    }

    #[test]
    fn test_create_truncates_and_append_keeps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");

        JsonlTranscriptLogger::create(&path)
            .unwrap()
            .log(TranscriptEvent::new("session_start", json!({})));
        JsonlTranscriptLogger::append(&path)
            .unwrap()
            .log(TranscriptEvent::new("session_end", json!({})));
        assert_eq!(read_lines(&path).len(), 2);

        JsonlTranscriptLogger::create(&path)
            .unwrap()
            .log(TranscriptEvent::new("session_start", json!({})));
        assert_eq!(read_lines(&path).len(), 1);
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        assert!(JsonlTranscriptLogger::create(blocker.join("t.jsonl")).is_err());
    }
}
