//! Domain layer for toolpod
//!
//! This crate contains the pure types and decision logic of the tool-calling
//! core. It performs no I/O; sandboxes, model clients and configuration
//! storage live behind ports in the application layer.
//!
//! # Core Concepts
//!
//! - **Tool catalog**: [`ToolRegistry`] holds immutable [`ToolDescriptor`]s,
//!   each classified by [`PermissionClass`].
//! - **Permission policy**: [`PermissionPolicy::evaluate`] maps a descriptor
//!   and a [`PermissionMode`] to a [`Decision`].
//! - **Instances**: [`ToolInstance`] tracks one remote execution context
//!   through the [`InstanceState`] lifecycle.
//! - **Sessions**: [`Session`] is the append-only conversation owned by the
//!   orchestrator, which ends in a [`TerminationReason`].

pub mod config;
pub mod core;
pub mod instance;
pub mod permission;
pub mod session;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use config::validation::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::error::DomainError;
pub use instance::entities::{InstanceId, InstanceState, ToolInstance};
pub use permission::policy::{Decision, PermissionMode, PermissionPolicy};
pub use session::{
    entities::{ContextBlob, ContextSection, ConversationEntry, Session, SessionId},
    state::{OrchestratorState, TerminationReason},
};
pub use tool::{
    call::{ToolArguments, ToolCallRequest},
    descriptor::{ParamType, PermissionClass, ToolDescriptor, ToolParameter},
    registry::ToolRegistry,
    result::{ToolResult, ToolResultStatus},
    validation::{ArgumentValidator, DefaultArgumentValidator},
};
