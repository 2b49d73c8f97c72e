//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is `#[serde(default)]`, so a partial file (or none at all)
//! still yields a complete configuration. Typed values are produced by the
//! `parse_*`/`to_*` methods, which return the value together with any
//! [`ConfigIssue`]s found on the way.

mod logging;
mod model;
mod permissions;
mod sandbox;
mod session;
mod tools;

pub use logging::FileLoggingConfig;
pub use model::{FileModelConfig, ModelProviderKind};
pub use permissions::{ConfirmStrategy, FilePermissionsConfig};
pub use sandbox::{DEFAULT_MAX_OUTPUT_BYTES, FileSandboxConfig};
pub use session::FileSessionConfig;
pub use tools::FileToolsConfig;

use crate::tools::default_catalog;
use serde::{Deserialize, Serialize};
use std::path::Path;
use toolpod_domain::ConfigIssue;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Orchestration loop limits
    pub session: FileSessionConfig,
    /// Permission mode, dangerous-tool allow-list, confirmation strategy
    pub permissions: FilePermissionsConfig,
    /// Disabled tools and per-tool timeouts
    pub tools: FileToolsConfig,
    /// Model client selection
    pub model: FileModelConfig,
    /// Local sandbox root and limits
    pub sandbox: FileSandboxConfig,
    /// Transcript and diagnostic log locations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Relative sandbox paths are resolved against `cwd`.
    pub fn validate(&self, cwd: &Path) -> Vec<ConfigIssue> {
        let catalog = default_catalog();
        let mut issues = Vec::new();

        issues.extend(self.session.to_execution_params().1);
        issues.extend(self.permissions.parse_mode().1);
        issues.extend(self.permissions.parse_confirm().1);
        issues.extend(self.permissions.to_policy(&catalog).1);
        issues.extend(self.tools.check(&catalog));
        issues.extend(self.model.parse_provider().1);
        issues.extend(self.sandbox.check(cwd));

        issues
    }
}
