//! Permission configuration from TOML (`[permissions]` section)

use serde::{Deserialize, Serialize};
use toolpod_domain::{
    ConfigIssue, ConfigIssueCode, PermissionClass, PermissionMode, PermissionPolicy,
    ToolDescriptor,
};

/// How `ConfirmRequired` decisions are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmStrategy {
    /// No resolver: every confirmation is a denial
    Deny,
    /// Ask on the terminal
    #[default]
    Prompt,
    /// Approve every confirmation
    Approve,
}

impl ConfirmStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmStrategy::Deny => "deny",
            ConfirmStrategy::Prompt => "prompt",
            ConfirmStrategy::Approve => "approve",
        }
    }
}

impl std::str::FromStr for ConfirmStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deny" => Ok(ConfirmStrategy::Deny),
            "prompt" | "ask" => Ok(ConfirmStrategy::Prompt),
            "approve" => Ok(ConfirmStrategy::Approve),
            _ => Err(format!("Invalid confirm strategy: {}", s)),
        }
    }
}

/// Raw permission configuration from TOML
///
/// # Example
///
/// ```toml
/// [permissions]
/// mode = "interactive"      # "interactive" or "auto_approve"
/// allow = ["bash"]          # dangerous tools that may run at all
/// confirm = "prompt"        # "deny", "prompt" or "approve"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePermissionsConfig {
    pub mode: String,
    /// Allow-list for Dangerous tools
    pub allow: Vec<String>,
    pub confirm: String,
}

impl Default for FilePermissionsConfig {
    fn default() -> Self {
        Self {
            mode: PermissionMode::default().as_str().to_string(),
            allow: Vec::new(),
            confirm: ConfirmStrategy::default().as_str().to_string(),
        }
    }
}

impl FilePermissionsConfig {
    /// Parse mode string into [`PermissionMode`], returning warnings on failure.
    pub fn parse_mode(&self) -> (PermissionMode, Vec<ConfigIssue>) {
        match self.mode.parse::<PermissionMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "permissions.mode".to_string(),
                        value: self.mode.clone(),
                        valid_values: vec![
                            "interactive".to_string(),
                            "auto_approve".to_string(),
                        ],
                    },
                    format!(
                        "permissions.mode: unknown value '{}', falling back to 'interactive'",
                        self.mode
                    ),
                );
                (PermissionMode::default(), vec![issue])
            }
        }
    }

    pub fn parse_confirm(&self) -> (ConfirmStrategy, Vec<ConfigIssue>) {
        match self.confirm.parse::<ConfirmStrategy>() {
            Ok(strategy) => (strategy, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "permissions.confirm".to_string(),
                        value: self.confirm.clone(),
                        valid_values: vec![
                            "deny".to_string(),
                            "prompt".to_string(),
                            "approve".to_string(),
                        ],
                    },
                    format!(
                        "permissions.confirm: unknown value '{}', falling back to 'prompt'",
                        self.confirm
                    ),
                );
                (ConfirmStrategy::default(), vec![issue])
            }
        }
    }

    /// Build the policy, checking allow-list entries against the catalog.
    ///
    /// Unknown names are dropped with a warning. Names of tools that are not
    /// Dangerous are kept (they have no effect) and reported.
    pub fn to_policy(&self, catalog: &[ToolDescriptor]) -> (PermissionPolicy, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut allowed = Vec::new();

        for name in &self.allow {
            match catalog.iter().find(|d| &d.name == name) {
                None => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownTool {
                        field: "permissions.allow".to_string(),
                        name: name.clone(),
                    },
                    format!("permissions.allow: unknown tool '{}' ignored", name),
                )),
                Some(d) => {
                    if d.permission_class != PermissionClass::Dangerous {
                        issues.push(ConfigIssue::warning(
                            ConfigIssueCode::NotDangerous { name: name.clone() },
                            format!(
                                "permissions.allow: '{}' is {}, allow-listing it has no effect",
                                name, d.permission_class
                            ),
                        ));
                    }
                    allowed.push(name.clone());
                }
            }
        }

        (PermissionPolicy::new().with_allow_list(allowed), issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("read_file", "Read", PermissionClass::ReadOnly),
            ToolDescriptor::new("bash", "Shell", PermissionClass::Dangerous),
        ]
    }

    #[test]
    fn test_parse_mode() {
        let config = FilePermissionsConfig {
            mode: "auto-approve".to_string(),
            ..Default::default()
        };
        let (mode, issues) = config.parse_mode();
        assert_eq!(mode, PermissionMode::AutoApprove);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_parse_mode_invalid_falls_back() {
        let config = FilePermissionsConfig {
            mode: "yolo".to_string(),
            ..Default::default()
        };
        let (mode, issues) = config.parse_mode();
        assert_eq!(mode, PermissionMode::Interactive);
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_parse_confirm() {
        let (strategy, issues) = FilePermissionsConfig::default().parse_confirm();
        assert_eq!(strategy, ConfirmStrategy::Prompt);
        assert!(issues.is_empty());

        let config = FilePermissionsConfig {
            confirm: "maybe".to_string(),
            ..Default::default()
        };
        let (strategy, issues) = config.parse_confirm();
        assert_eq!(strategy, ConfirmStrategy::Prompt);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_to_policy() {
        let config = FilePermissionsConfig {
            allow: vec![
                "bash".to_string(),
                "read_file".to_string(),
                "rm_rf".to_string(),
            ],
            ..Default::default()
        };
        let (policy, issues) = config.to_policy(&catalog());

        assert!(policy.is_allow_listed("bash"));
        assert!(!policy.is_allow_listed("rm_rf"));
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0].code, ConfigIssueCode::NotDangerous { .. }));
        assert!(matches!(issues[1].code, ConfigIssueCode::UnknownTool { .. }));
    }
}
