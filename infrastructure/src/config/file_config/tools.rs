//! Tools configuration from TOML (`[tools]` section)
//!
//! Disabled tools are treated as absent: they are not offered to the model
//! and calls naming them fail as unknown tools.
//!
//! ```toml
//! [tools]
//! disabled = ["notebook_edit", "agent"]
//!
//! [tools.timeouts]
//! grep_search = 60
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toolpod_domain::{ConfigIssue, ConfigIssueCode, ToolDescriptor};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    pub disabled: Vec<String>,
    /// Per-tool call timeout overrides, in seconds
    pub timeouts: BTreeMap<String, u64>,
}

impl FileToolsConfig {
    /// Report names that do not match any catalog entry.
    pub fn check(&self, catalog: &[ToolDescriptor]) -> Vec<ConfigIssue> {
        let known = |name: &str| catalog.iter().any(|d| d.name == name);
        let mut issues = Vec::new();

        for name in self.disabled.iter().filter(|n| !known(n)) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownTool {
                    field: "tools.disabled".to_string(),
                    name: name.clone(),
                },
                format!("tools.disabled: unknown tool '{}' ignored", name),
            ));
        }
        for (name, secs) in &self.timeouts {
            if !known(name) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownTool {
                        field: "tools.timeouts".to_string(),
                        name: name.clone(),
                    },
                    format!("tools.timeouts: unknown tool '{}' ignored", name),
                ));
            } else if *secs == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidValue {
                        field: format!("tools.timeouts.{}", name),
                        value: "0".to_string(),
                    },
                    format!("tools.timeouts.{} must be at least 1 second", name),
                ));
            }
        }

        issues
    }
}
