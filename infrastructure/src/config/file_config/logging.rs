//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
///
/// ```toml
/// [logging]
/// transcript = "logs/session.jsonl"
/// dir = "logs"            # daily-rolling diagnostic log
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of the session, if any
    pub transcript: Option<PathBuf>,
    /// Directory for the rolling `tracing` log file, if any
    pub dir: Option<PathBuf>,
}
