//! Application-level configuration.
//!
//! - [`ExecutionParams`]: orchestration loop control (turn limit, fan-out, timeouts, retries)

pub mod execution_params;

pub use execution_params::ExecutionParams;
