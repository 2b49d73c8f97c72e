//! Tool registry

use super::descriptor::ToolDescriptor;
use crate::core::error::DomainError;
use std::collections::HashMap;
use std::sync::Arc;

/// Catalog of tool descriptors, written once at startup and read thereafter.
///
/// Registration order is preserved so that [`list_schemas`](Self::list_schemas)
/// is deterministic. Disabled tools are treated as absent: `describe` does
/// not find them and `list_schemas` omits them.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Fails if the name is already taken.
    pub fn register(&mut self, mut descriptor: ToolDescriptor) -> Result<(), DomainError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(DomainError::DuplicateTool(descriptor.name));
        }
        descriptor.freeze_schema();
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(Arc::new(descriptor));
        Ok(())
    }

    /// Register every descriptor, stopping at the first duplicate.
    pub fn register_all(
        &mut self,
        descriptors: impl IntoIterator<Item = ToolDescriptor>,
    ) -> Result<(), DomainError> {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(())
    }

    /// Look up an enabled tool by name.
    pub fn describe(&self, name: &str) -> Result<Arc<ToolDescriptor>, DomainError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .filter(|d| d.enabled)
            .cloned()
            .ok_or_else(|| DomainError::UnknownTool(name.to_string()))
    }

    /// Enabled descriptors in registration order.
    pub fn list_schemas(&self) -> Vec<Arc<ToolDescriptor>> {
        self.tools.iter().filter(|d| d.enabled).cloned().collect()
    }

    /// Whether an enabled tool with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.describe(name).is_ok()
    }

    /// Whether a tool with this name was registered, enabled or not.
    pub fn is_registered(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names of enabled tools in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Every registered descriptor, including disabled ones.
    pub fn all(&self) -> impl Iterator<Item = &Arc<ToolDescriptor>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.iter().filter(|d| d.enabled).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disable the named tools. Unknown names are ignored.
    pub fn with_disabled<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let disabled: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
        let tools = self
            .tools
            .into_iter()
            .map(|d| {
                if d.enabled && disabled.iter().any(|n| n == &d.name) {
                    Arc::new((*d).clone().with_enabled(false))
                } else {
                    d
                }
            })
            .collect();
        Self {
            tools,
            index: self.index,
        }
    }

    /// A registry restricted to the enabled read-only tools, for sub-agents.
    pub fn read_only(&self) -> Self {
        self.filtered(|d| d.permission_class.is_read_only())
    }

    /// A registry restricted to the enabled tools matching `keep`.
    pub fn filtered(&self, keep: impl Fn(&ToolDescriptor) -> bool) -> Self {
        let mut out = Self::new();
        for d in &self.tools {
            if !d.enabled || !keep(d) {
                continue;
            }
            out.index.insert(d.name.clone(), out.tools.len());
            out.tools.push(Arc::clone(d));
        }
        out
    }
}
