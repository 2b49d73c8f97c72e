//! Sandbox provider port
//!
//! A sandbox provider owns the remote side of tool instances. Each
//! provisioned [`SandboxHandle`] names one stateful execution context.
//! [`InstanceManager`](crate::use_cases::instance_manager::InstanceManager)
//! is the only caller.
//!
//! ```text
//! provision(tool) ──> handle ──> invoke(handle, args, deadline)* ──> teardown(handle)
//!                                    └── cancel(handle) (best effort)
//! ```

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use toolpod_domain::{ToolArguments, ToolDescriptor};

/// Opaque reference to one provisioned execution context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxHandle {
    pub id: String,
    pub tool_name: String,
}

impl SandboxHandle {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
        }
    }
}

impl std::fmt::Display for SandboxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tool_name, self.id)
    }
}

/// Errors reported by a sandbox provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    #[error("Provisioning failed for {tool}: {message}")]
    Provision { tool: String, message: String },

    /// The tool ran and reported an error. `fatal` means the instance is unusable.
    #[error("{message}")]
    Invocation { message: String, fatal: bool },

    #[error("Unknown sandbox handle: {0}")]
    UnknownHandle(String),

    #[error("Teardown failed: {0}")]
    Teardown(String),
}

impl SandboxError {
    pub fn invocation(message: impl Into<String>) -> Self {
        SandboxError::Invocation {
            message: message.into(),
            fatal: false,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        SandboxError::Invocation {
            message: message.into(),
            fatal: true,
        }
    }

    /// Whether the instance that produced this error must not be reused.
    pub fn is_fatal(&self) -> bool {
        match self {
            SandboxError::Invocation { fatal, .. } => *fatal,
            SandboxError::UnknownHandle(_) => true,
            SandboxError::Provision { .. } | SandboxError::Teardown(_) => false,
        }
    }
}

/// Remote execution backend for tool instances.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Create a new execution context for `tool`.
    async fn provision(&self, tool: &ToolDescriptor) -> Result<SandboxHandle, SandboxError>;

    /// Run one call. `deadline` is advisory; the caller enforces it too.
    async fn invoke(
        &self,
        handle: &SandboxHandle,
        arguments: &ToolArguments,
        deadline: Instant,
    ) -> Result<String, SandboxError>;

    /// Best-effort cancellation of an in-flight call.
    async fn cancel(&self, _handle: &SandboxHandle) {}

    /// Free the remote resources behind `handle`.
    async fn teardown(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;
}
