//! Application layer for toolpod
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutionParams;
pub use ports::{
    confirmation::{AutoApproveConfirmation, AutoDenyConfirmation, ConfirmationResolver},
    context_seeder::{ContextSeeder, NoContextSeeder},
    model_client::{ModelClient, ModelClientError, ModelTurn},
    progress::{NoSessionProgress, SessionProgressNotifier},
    sandbox::{SandboxError, SandboxHandle, SandboxProvider},
    transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger},
};
pub use use_cases::delegate_agent::{AGENT_TOOL, SubAgentProvider};
pub use use_cases::dispatch_tools::ToolDispatcher;
pub use use_cases::instance_manager::{InstanceError, InstanceManager, ReleaseReport};
pub use use_cases::run_session::{RunSessionInput, RunSessionOutput, RunSessionUseCase};
pub use use_cases::tool_helpers::tool_args_preview;
