//! Transcript logging
//!
//! Provides [`JsonlTranscriptLogger`], which implements the application's
//! [`TranscriptLogger`](toolpod_application::TranscriptLogger) port by
//! appending one JSON object per event to a file.

mod jsonl;

pub use jsonl::JsonlTranscriptLogger;
