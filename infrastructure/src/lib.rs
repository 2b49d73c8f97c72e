//! Infrastructure layer for toolpod
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the local sandbox with the built-in tool catalog, model
//! clients, the project context seeder, the JSONL transcript logger, the
//! terminal confirmation prompt, and configuration file loading.

pub mod config;
pub mod confirmation;
pub mod context;
pub mod logging;
pub mod model;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigLoader, ConfigSource, ConfirmStrategy, FileConfig, FileLoggingConfig,
    FileModelConfig, FilePermissionsConfig, FileSandboxConfig, FileSessionConfig, FileToolsConfig,
    ModelProviderKind,
};
pub use confirmation::StdinConfirmation;
pub use context::LocalContextSeeder;
pub use logging::JsonlTranscriptLogger;
#[cfg(feature = "openai")]
pub use model::OpenAiModelClient;
pub use model::{ScriptedModelClient, ScriptedTurn};
pub use tools::{LocalSandboxProvider, Workspace, agent_definition, default_catalog, default_registry};
