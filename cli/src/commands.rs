//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toolpod_domain::PermissionMode;

/// Permission mode as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Mutating and allow-listed dangerous calls need confirmation
    Interactive,
    /// Mutating and allow-listed dangerous calls run without confirmation
    AutoApprove,
}

impl From<ModeArg> for PermissionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Interactive => PermissionMode::Interactive,
            ModeArg::AutoApprove => PermissionMode::AutoApprove,
        }
    }
}

/// CLI arguments for toolpod
#[derive(Parser, Debug)]
#[command(name = "toolpod")]
#[command(author, version, about = "Answer a query by letting a model call sandboxed tools")]
#[command(long_about = r#"
toolpod sends a query to a language model together with a catalog of tools
(file reading and editing, search, a shell, notes and a sub-agent). Tool calls
run in sandboxed instances rooted at the project directory until the model
produces a final answer.

Configuration files are loaded from (in priority order):
1. TOOLPOD_* environment variables (TOOLPOD_SESSION__FAN_OUT=8)
2. --config <path>     Explicit config file
3. ./toolpod.toml      Project-level config
4. ~/.config/toolpod/config.toml   Global config

Example:
  toolpod run "What does src/main.rs do?"
  toolpod run --mode auto-approve --allow bash "Run the tests and summarize failures"
  toolpod run --script turns.json "replay a recorded session"
  toolpod tools
"#)]
pub struct Cli {
    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for a daily-rolling diagnostic log file
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one query to completion
    Run(RunArgs),
    /// List the enabled tools with their permission class and flags
    Tools,
    /// Show configuration sources and validation issues
    Config,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The query for the model
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Permission mode (overrides the config file)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Maximum number of model turns
    #[arg(long, value_name = "N")]
    pub turn_limit: Option<usize>,

    /// Allow a dangerous tool (can be specified multiple times)
    #[arg(long, value_name = "TOOL")]
    pub allow: Vec<String>,

    /// Replay model turns from a JSON script instead of calling a model
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Write a JSONL transcript of the session
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Suppress progress lines
    #[arg(short, long)]
    pub quiet: bool,
}
