//! Built-in tools and the local sandbox that runs them
//!
//! ## Catalog
//!
//! | Tool | Class | Instance |
//! |------|-------|----------|
//! | `read_file`, `list_dir`, `glob_search`, `grep_search` | read-only | stateless |
//! | `think`, `memory_read` | read-only | stateless |
//! | `write_file`, `notebook_edit`, `memory_write` | mutating | stateless |
//! | `edit_file` | mutating | session-scoped (undo history) |
//! | `bash` | dangerous | session-scoped (working directory) |
//! | `agent` | read-only | served by the sub-agent provider |

pub mod command;
pub mod edit;
pub mod error;
pub mod file;
pub mod notebook;
pub mod notes;
pub mod provider;
pub mod search;
pub mod workspace;

pub use error::ToolError;
pub use provider::LocalSandboxProvider;
pub use workspace::Workspace;

use std::collections::BTreeMap;
use std::time::Duration;
use toolpod_application::AGENT_TOOL;
use toolpod_domain::{DomainError, PermissionClass, ToolDescriptor, ToolParameter, ToolRegistry};

/// The `agent` tool. Its handler lives in the application's sub-agent provider.
pub fn agent_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        AGENT_TOOL,
        "Delegate a research task to a sub-agent with read-only tools",
        PermissionClass::ReadOnly,
    )
    .with_prompt_text(
        "Starts a sub-agent that can only use read-only tools and returns its final answer. \
         Use it for open-ended searches that would take many tool calls. Describe the task \
         and what the answer should contain in `prompt`.",
    )
    .with_parameter(ToolParameter::new("prompt", "Task for the sub-agent", true))
    .with_concurrency_safe(true)
}

/// Every built-in tool, in the order offered to the model.
pub fn default_catalog() -> Vec<ToolDescriptor> {
    vec![
        file::read_file_definition(),
        file::list_dir_definition(),
        search::glob_search_definition(),
        search::grep_search_definition(),
        edit::edit_file_definition(),
        file::write_file_definition(),
        notebook::notebook_edit_definition(),
        command::bash_definition(),
        notes::think_definition(),
        notes::memory_read_definition(),
        notes::memory_write_definition(),
        agent_definition(),
    ]
}

/// Build the registry from the catalog, applying per-tool timeout overrides
/// and then disabling the named tools.
pub fn default_registry(
    disabled: &[String],
    timeouts: &BTreeMap<String, u64>,
) -> Result<ToolRegistry, DomainError> {
    let mut registry = ToolRegistry::new();
    registry.register_all(default_catalog().into_iter().map(|d| {
        match timeouts.get(&d.name) {
            Some(&secs) if secs > 0 => d.with_timeout(Duration::from_secs(secs)),
            _ => d,
        }
    }))?;
    Ok(registry.with_disabled(disabled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_unique() {
        let registry = default_registry(&[], &BTreeMap::new()).unwrap();
        assert_eq!(registry.len(), 12);
        assert_eq!(
            registry.names(),
            vec![
                "read_file",
                "list_dir",
                "glob_search",
                "grep_search",
                "edit_file",
                "write_file",
                "notebook_edit",
                "bash",
                "think",
                "memory_read",
                "memory_write",
                "agent",
            ]
        );
    }

    #[test]
    fn test_permission_classes() {
        let registry = default_registry(&[], &BTreeMap::new()).unwrap();
        let class = |name: &str| registry.describe(name).unwrap().permission_class;
        assert_eq!(class("bash"), PermissionClass::Dangerous);
        assert_eq!(class("write_file"), PermissionClass::Mutating);
        assert_eq!(class("edit_file"), PermissionClass::Mutating);
        assert_eq!(class("grep_search"), PermissionClass::ReadOnly);
        assert!(registry.describe("bash").unwrap().session_scoped);
        assert!(registry.describe("edit_file").unwrap().session_scoped);
        assert!(!registry.describe("read_file").unwrap().session_scoped);
    }

    #[test]
    fn test_disabled_and_timeouts() {
        let mut timeouts = BTreeMap::new();
        timeouts.insert("bash".to_string(), 5);
        let registry = default_registry(&["agent".to_string()], &timeouts).unwrap();

        assert_eq!(registry.len(), 11);
        assert!(registry.describe("agent").is_err());
        assert!(registry.is_registered("agent"));
        assert_eq!(
            registry.describe("bash").unwrap().timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(registry.describe("read_file").unwrap().timeout, None);
    }

    #[test]
    fn test_schemas_are_objects() {
        for d in default_catalog() {
            let schema = d.input_schema();
            assert_eq!(schema["type"], "object", "{}", d.name);
            for p in &d.parameters {
                assert!(schema["properties"].get(&p.name).is_some(), "{}.{}", d.name, p.name);
            }
        }
    }
}
