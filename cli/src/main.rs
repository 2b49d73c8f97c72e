//! CLI entrypoint for toolpod
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod progress;
mod report;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use commands::{Cli, Command, RunArgs};
use progress::ConsoleProgress;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolpod_application::{
    AutoApproveConfirmation, AutoDenyConfirmation, ConfirmationResolver, ModelClient,
    RunSessionInput, RunSessionUseCase, SubAgentProvider,
};
use toolpod_infrastructure::{
    ConfigError, ConfigLoader, ConfirmStrategy, FileConfig, FileModelConfig,
    FilePermissionsConfig, JsonlTranscriptLogger, LocalContextSeeder, LocalSandboxProvider,
    ModelProviderKind, ScriptedModelClient, StdinConfirmation, default_catalog, default_registry,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to determine the current directory")?;

    if let Command::Config = cli.command {
        let _guard = init_logging(cli.verbose, cli.log_dir.as_deref());
        return show_config(cli.config.as_deref(), &cwd);
    }

    let config = match ConfigLoader::load_validated(cli.config.as_deref(), &cwd) {
        Ok((config, warnings)) => {
            report::print_issues(&warnings);
            config
        }
        Err(ConfigError::Invalid(issues)) => {
            report::print_issues(&issues);
            bail!("configuration has errors; run `toolpod config` for details");
        }
        Err(e) => return Err(e.into()),
    };

    let log_dir = cli.log_dir.clone().or_else(|| config.logging.dir.clone());
    let _guard = init_logging(cli.verbose, log_dir.as_deref());
    info!("Starting toolpod");

    match cli.command {
        Command::Run(args) => run_query(args, config, &cwd).await,
        Command::Tools => list_tools(&config),
        Command::Config => show_config(cli.config.as_deref(), &cwd),
    }
}

/// Stderr logging by verbosity (`RUST_LOG` wins when set), plus a daily
/// rolling debug log when a directory is given.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let mut guard = None;
    let file_layer = log_dir.and_then(|dir| {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("toolpod")
            .filename_suffix("log")
            .build(dir);
        match appender {
            Ok(appender) => {
                let (writer, g) = tracing_appender::non_blocking(appender);
                guard = Some(g);
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer)
                        .with_filter(EnvFilter::new("debug")),
                )
            }
            Err(e) => {
                eprintln!(
                    "{} cannot write logs to {}: {}",
                    "warning:".yellow().bold(),
                    dir.display(),
                    e
                );
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

async fn run_query(args: RunArgs, config: FileConfig, cwd: &Path) -> Result<ExitCode> {
    if args.turn_limit == Some(0) {
        bail!("--turn-limit must be at least 1");
    }

    // === Configuration ===
    let catalog = default_catalog();
    let (params, _) = config.session.to_execution_params();

    let cli_allow = FilePermissionsConfig {
        allow: args.allow.clone(),
        ..Default::default()
    };
    report::print_issues(&cli_allow.to_policy(&catalog).1);
    let mut permissions = config.permissions.clone();
    permissions.allow.extend(args.allow.iter().cloned());
    let (policy, _) = permissions.to_policy(&catalog);

    let mode = match args.mode {
        Some(mode) => mode.into(),
        None => permissions.parse_mode().0,
    };

    // === Dependency Injection ===
    let registry = Arc::new(default_registry(&config.tools.disabled, &config.tools.timeouts)?);
    let model = build_model(&config.model, args.script.as_deref())?;
    let local = Arc::new(LocalSandboxProvider::from_config(&config.sandbox, cwd));
    let root = local.root().to_path_buf();
    let provider = Arc::new(SubAgentProvider::new(
        local,
        model.clone(),
        &registry,
        params.clone(),
    ));

    let confirmation: Arc<dyn ConfirmationResolver> = match permissions.parse_confirm().0 {
        ConfirmStrategy::Deny => Arc::new(AutoDenyConfirmation),
        ConfirmStrategy::Prompt => Arc::new(StdinConfirmation::new()),
        ConfirmStrategy::Approve => Arc::new(AutoApproveConfirmation),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling session");
            on_interrupt.cancel();
        }
    });

    let mut use_case = RunSessionUseCase::new(model, provider, registry)
        .with_policy(policy)
        .with_params(params)
        .with_confirmation(confirmation)
        .with_context_seeder(Arc::new(LocalContextSeeder::new(&root)))
        .with_cancellation(cancel);

    let transcript_path = args.transcript.clone().or(config.logging.transcript.clone());
    let transcript = match transcript_path {
        Some(path) => {
            let logger = Arc::new(JsonlTranscriptLogger::create(&path).with_context(|| {
                format!("Failed to open transcript {}", path.display())
            })?);
            use_case = use_case.with_transcript_logger(logger.clone());
            Some(logger)
        }
        None => None,
    };

    info!(root = %root.display(), mode = %mode, "Running query");

    let mut input = RunSessionInput::new(args.query, mode);
    if let Some(limit) = args.turn_limit {
        input = input.with_turn_limit(limit);
    }

    let output = if args.quiet {
        use_case.execute(input).await
    } else {
        let progress = ConsoleProgress::new();
        use_case.execute_with_progress(input, &progress).await
    };

    if let Some(logger) = transcript {
        info!(
            path = %logger.path().display(),
            lines = logger.lines_written(),
            "Transcript written"
        );
    }

    Ok(report::print_outcome(&output, args.quiet))
}

/// `--script` wins over the `[model]` section.
fn build_model(config: &FileModelConfig, script: Option<&Path>) -> Result<Arc<dyn ModelClient>> {
    if let Some(path) = script {
        return Ok(Arc::new(ScriptedModelClient::from_file(path)?));
    }
    match config.parse_provider().0 {
        ModelProviderKind::Scripted => {
            let path: PathBuf = config
                .script
                .clone()
                .context("model.provider = \"scripted\" requires model.script")?;
            Ok(Arc::new(ScriptedModelClient::from_file(&path)?))
        }
        ModelProviderKind::OpenAi => openai_model(config),
    }
}

#[cfg(feature = "openai")]
fn openai_model(config: &FileModelConfig) -> Result<Arc<dyn ModelClient>> {
    Ok(Arc::new(toolpod_infrastructure::OpenAiModelClient::from_config(config)?))
}

#[cfg(not(feature = "openai"))]
fn openai_model(_config: &FileModelConfig) -> Result<Arc<dyn ModelClient>> {
    bail!("built without the `openai` feature; use --script or model.provider = \"scripted\"")
}

fn list_tools(config: &FileConfig) -> Result<ExitCode> {
    let registry = default_registry(&config.tools.disabled, &config.tools.timeouts)?;
    println!("{}", format!("{} tools enabled:", registry.len()).bold());
    for descriptor in registry.list_schemas() {
        let allowed = config.permissions.allow.contains(&descriptor.name);
        println!("  {}", report::tool_row(&descriptor, allowed));
    }
    let disabled: Vec<&str> = registry
        .all()
        .filter(|d| !d.enabled)
        .map(|d| d.name.as_str())
        .collect();
    if !disabled.is_empty() {
        println!("{} {}", "Disabled:".dimmed(), disabled.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn show_config(config_path: Option<&Path>, cwd: &Path) -> Result<ExitCode> {
    report::print_sources(&ConfigLoader::sources(config_path));
    println!();

    let config = ConfigLoader::load(config_path)?;
    let issues = config.validate(cwd);
    if issues.is_empty() {
        println!("{}", "No configuration issues.".green());
    } else {
        for issue in &issues {
            println!("{}", report::issue_line(issue));
        }
    }
    println!();

    let (params, _) = config.session.to_execution_params();
    println!("{}", "Effective settings:".bold());
    println!("  mode            {}", config.permissions.parse_mode().0);
    println!("  confirm         {}", config.permissions.parse_confirm().0.as_str());
    println!("  allow           {}", config.permissions.allow.join(", "));
    println!("  turn_limit      {}", params.turn_limit);
    println!("  fan_out         {}", params.fan_out);
    println!("  call_timeout    {}s", params.call_timeout.as_secs());
    println!(
        "  model           {} ({})",
        config.model.model,
        config.model.parse_provider().0.as_str()
    );
    println!("  sandbox root    {}", config.sandbox.resolve_root(cwd).display());

    Ok(if issues.iter().any(|i| i.is_error()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
