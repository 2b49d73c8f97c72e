//! Permission policy: a pure decision function over tool descriptors.
//!
//! [`PermissionPolicy::evaluate`] decides whether a call to a tool may go
//! ahead, given the tool's [`PermissionClass`] and the session's
//! [`PermissionMode`]:
//!
//! | Class | Interactive | AutoApprove |
//! |-------|-------------|-------------|
//! | ReadOnly | Allow | Allow |
//! | Mutating | ConfirmRequired | Allow |
//! | Dangerous (allow-listed) | ConfirmRequired | Allow |
//! | Dangerous (not allow-listed) | Deny | Deny |
//!
//! The decision depends only on (descriptor, mode, allow-list).

use crate::tool::descriptor::{PermissionClass, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the session resolves calls that are not unconditionally allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    /// Mutating calls go through the confirmation resolver
    #[default]
    Interactive,
    /// Mutating calls run without confirmation
    AutoApprove,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Interactive => "interactive",
            PermissionMode::AutoApprove => "auto_approve",
        }
    }
}

impl std::fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interactive" | "i" => Ok(PermissionMode::Interactive),
            "auto_approve" | "auto-approve" | "auto" => Ok(PermissionMode::AutoApprove),
            _ => Err(format!("Invalid PermissionMode: {}", s)),
        }
    }
}

/// Outcome of a permission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    /// Ask the confirmation resolver; no resolver or a decline means Deny.
    ConfirmRequired,
}

/// Static permission rules plus the allow-list for dangerous tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    allow_list: BTreeSet<String>,
}

impl PermissionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool name to the dangerous-tool allow-list.
    pub fn with_allowed(mut self, tool_name: impl Into<String>) -> Self {
        self.allow_list.insert(tool_name.into());
        self
    }

    pub fn with_allow_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_allow_listed(&self, tool_name: &str) -> bool {
        self.allow_list.contains(tool_name)
    }

    pub fn allow_list(&self) -> impl Iterator<Item = &str> {
        self.allow_list.iter().map(String::as_str)
    }

    /// Decide whether a call to `descriptor` may proceed under `mode`.
    pub fn evaluate(&self, descriptor: &ToolDescriptor, mode: PermissionMode) -> Decision {
        match (descriptor.permission_class, mode) {
            (PermissionClass::ReadOnly, _) => Decision::Allow,
            (PermissionClass::Mutating, PermissionMode::AutoApprove) => Decision::Allow,
            (PermissionClass::Mutating, PermissionMode::Interactive) => Decision::ConfirmRequired,
            (PermissionClass::Dangerous, _) if !self.is_allow_listed(&descriptor.name) => {
                Decision::Deny
            }
            (PermissionClass::Dangerous, PermissionMode::AutoApprove) => Decision::Allow,
            (PermissionClass::Dangerous, PermissionMode::Interactive) => Decision::ConfirmRequired,
        }
    }

    /// Diagnostic text for a denied call, fed back to the model.
    pub fn denial_reason(&self, descriptor: &ToolDescriptor) -> String {
        match descriptor.permission_class {
            PermissionClass::Dangerous if !self.is_allow_listed(&descriptor.name) => format!(
                "Dangerous tool {} requires permission (not on the allow-list)",
                descriptor.name
            ),
            _ => format!("Permission denied for tool: {}", descriptor.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [PermissionMode; 2] = [PermissionMode::Interactive, PermissionMode::AutoApprove];

    fn tool(name: &str, class: PermissionClass) -> ToolDescriptor {
        ToolDescriptor::new(name, name, class)
    }

    /// Every subset of `universe`, as allow-lists.
    fn all_allow_lists(universe: &[&str]) -> Vec<Vec<String>> {
        (0..1u32 << universe.len())
            .map(|mask| {
                universe
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, n)| n.to_string())
                    .collect()
            })
            .collect()
    }

    // ==================== Class rules ====================

    #[test]
    fn test_read_only_always_allowed() {
        let policy = PermissionPolicy::new();
        for mode in MODES {
            assert_eq!(
                policy.evaluate(&tool("read_file", PermissionClass::ReadOnly), mode),
                Decision::Allow
            );
        }
    }

    #[test]
    fn test_mutating_depends_on_mode() {
        let policy = PermissionPolicy::new();
        let write = tool("write_file", PermissionClass::Mutating);
        assert_eq!(
            policy.evaluate(&write, PermissionMode::Interactive),
            Decision::ConfirmRequired
        );
        assert_eq!(
            policy.evaluate(&write, PermissionMode::AutoApprove),
            Decision::Allow
        );
    }

    #[test]
    fn test_allow_listed_dangerous() {
        let policy = PermissionPolicy::new().with_allowed("bash");
        let bash = tool("bash", PermissionClass::Dangerous);
        assert_eq!(
            policy.evaluate(&bash, PermissionMode::AutoApprove),
            Decision::Allow
        );
        assert_eq!(
            policy.evaluate(&bash, PermissionMode::Interactive),
            Decision::ConfirmRequired
        );
    }

    #[test]
    fn test_dangerous_outside_allow_list_always_denied() {
        let universe = ["bash", "python", "kubectl", "read_file", "deploy"];
        let dangerous = ["bash", "python", "kubectl", "deploy", "unlisted"];

        for allow in all_allow_lists(&universe) {
            let policy = PermissionPolicy::new().with_allow_list(allow.iter().cloned());
            for name in dangerous {
                let descriptor = tool(name, PermissionClass::Dangerous);
                for mode in MODES {
                    let decision = policy.evaluate(&descriptor, mode);
                    if allow.iter().any(|a| a == name) {
                        assert_ne!(decision, Decision::Deny, "{name} allowed by {allow:?}");
                    } else {
                        assert_eq!(decision, Decision::Deny, "{name} with {allow:?} in {mode}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_allow_list_does_not_affect_other_classes() {
        let policy = PermissionPolicy::new().with_allowed("write_file");
        assert_eq!(
            policy.evaluate(
                &tool("write_file", PermissionClass::Mutating),
                PermissionMode::Interactive
            ),
            Decision::ConfirmRequired
        );
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let policy = PermissionPolicy::new().with_allowed("bash");
        let bash = tool("bash", PermissionClass::Dangerous);
        let first = policy.evaluate(&bash, PermissionMode::Interactive);
        for _ in 0..10 {
            assert_eq!(policy.evaluate(&bash, PermissionMode::Interactive), first);
        }
    }

    // ==================== Misc ====================

    #[test]
    fn test_denial_reason() {
        let policy = PermissionPolicy::new();
        assert!(
            policy
                .denial_reason(&tool("bash", PermissionClass::Dangerous))
                .contains("requires permission")
        );
        assert_eq!(
            policy.denial_reason(&tool("write_file", PermissionClass::Mutating)),
            "Permission denied for tool: write_file"
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "interactive".parse::<PermissionMode>().unwrap(),
            PermissionMode::Interactive
        );
        assert_eq!(
            "auto-approve".parse::<PermissionMode>().unwrap(),
            PermissionMode::AutoApprove
        );
        assert_eq!(
            "AUTO_APPROVE".parse::<PermissionMode>().unwrap(),
            PermissionMode::AutoApprove
        );
        assert!("yolo".parse::<PermissionMode>().is_err());
        assert_eq!(PermissionMode::default(), PermissionMode::Interactive);
    }
}
