//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod delegate_agent;
pub mod dispatch_tools;
pub mod instance_manager;
pub mod run_session;
pub(crate) mod shared;
pub mod tool_helpers;

#[cfg(test)]
pub(crate) mod test_support;
