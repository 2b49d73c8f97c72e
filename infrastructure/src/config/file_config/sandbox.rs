//! Local sandbox configuration from TOML (`[sandbox]` section)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toolpod_domain::{ConfigIssue, ConfigIssueCode};

/// Default cap on tool output returned to the model (1 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Raw sandbox configuration from TOML
///
/// ```toml
/// [sandbox]
/// root = "/work/repo"          # defaults to the current directory
/// memory_dir = "~/.toolpod"    # defaults to <root>/.toolpod/memory
/// max_output_bytes = 1048576
/// bash_timeout_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSandboxConfig {
    pub root: Option<PathBuf>,
    pub memory_dir: Option<PathBuf>,
    pub max_output_bytes: usize,
    pub bash_timeout_secs: u64,
}

impl Default for FileSandboxConfig {
    fn default() -> Self {
        Self {
            root: None,
            memory_dir: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            bash_timeout_secs: 30,
        }
    }
}

impl FileSandboxConfig {
    /// Sandbox root: the configured path, or `cwd`.
    pub fn resolve_root(&self, cwd: &Path) -> PathBuf {
        match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        }
    }

    pub fn resolve_memory_dir(&self, root: &Path) -> PathBuf {
        match &self.memory_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(".toolpod").join("memory"),
        }
    }

    pub fn check(&self, cwd: &Path) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.max_output_bytes == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "sandbox.max_output_bytes".to_string(),
                    value: "0".to_string(),
                },
                "sandbox.max_output_bytes must be at least 1",
            ));
        }
        if self.bash_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "sandbox.bash_timeout_secs".to_string(),
                    value: "0".to_string(),
                },
                "sandbox.bash_timeout_secs must be at least 1",
            ));
        }
        let root = self.resolve_root(cwd);
        if !root.is_dir() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "sandbox.root".to_string(),
                    value: root.display().to_string(),
                },
                format!("sandbox.root: '{}' is not a directory", root.display()),
            ));
        }
        issues
    }
}
