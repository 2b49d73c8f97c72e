//! Configuration file loading for toolpod
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLPOD_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolpod.toml` or `./.toolpod.toml`
//! 4. Global: `$XDG_CONFIG_HOME/toolpod/config.toml`
//! 5. Default values

mod error;
mod file_config;
mod loader;

pub use error::ConfigError;
pub use file_config::{
    ConfirmStrategy, DEFAULT_MAX_OUTPUT_BYTES, FileConfig, FileLoggingConfig, FileModelConfig,
    FilePermissionsConfig, FileSandboxConfig, FileSessionConfig, FileToolsConfig,
    ModelProviderKind,
};
pub use loader::{ConfigLoader, ConfigSource, ENV_PREFIX, SKIP_PERMISSIONS_VAR};
