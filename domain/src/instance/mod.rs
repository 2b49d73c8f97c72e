//! Instance domain module
//!
//! - [`entities::ToolInstance`]: lifecycle of one remote tool instance

pub mod entities;

pub use entities::{InstanceId, InstanceState, ToolInstance};
