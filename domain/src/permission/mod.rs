//! Permission domain module
//!
//! - [`policy::PermissionPolicy`]: pure allow/deny/confirm decision
//! - [`policy::PermissionMode`]: interactive vs auto-approve sessions

pub mod policy;

pub use policy::{Decision, PermissionMode, PermissionPolicy};
