//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod confirmation;
pub mod context_seeder;
pub mod model_client;
pub mod progress;
pub mod sandbox;
pub mod transcript_logger;
