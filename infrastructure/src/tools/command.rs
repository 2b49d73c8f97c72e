//! Shell tool: bash
//!
//! Each bash instance keeps a [`ShellState`] whose working directory carries
//! over between calls, so `cd src` in one call affects the next. Every call
//! runs in a fresh `sh -c`; the script appends a marker line with `$(pwd)`
//! which is stripped from the output and used to update the state.

use super::error::ToolError;
use super::workspace::Workspace;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use toolpod_domain::{ParamType, PermissionClass, ToolArguments, ToolDescriptor, ToolParameter};
use tracing::{debug, warn};

pub const BASH: &str = "bash";

const CWD_MARKER: &str = "__TOOLPOD_CWD__";

const BASH_PROMPT: &str = "Runs a shell command with `sh -c` inside the sandbox root. The \
working directory persists between calls made through the same session. Output contains \
stdout, then stderr after a `--- stderr ---` line. A non-zero exit status is reported on \
the first line. Long-running commands are killed when they exceed `timeout_secs`.";

/// Per-instance shell state.
#[derive(Debug, Clone)]
pub struct ShellState {
    cwd: PathBuf,
}

impl ShellState {
    pub fn new(ws: &Workspace) -> Self {
        Self {
            cwd: ws.root().to_path_buf(),
        }
    }

    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }
}

pub fn bash_definition() -> ToolDescriptor {
    ToolDescriptor::new(BASH, "Execute a shell command", PermissionClass::Dangerous)
        .with_prompt_text(BASH_PROMPT)
        .with_parameter(ToolParameter::new("command", "The command to execute", true))
        .with_parameter(
            ToolParameter::new("timeout_secs", "Timeout in seconds", false)
                .with_type(ParamType::Integer),
        )
        .with_session_scoped(true)
}

/// Execute the bash tool.
///
/// The effective timeout is the smallest of `max_timeout`, the
/// `timeout_secs` argument and the time left before `deadline`. The child is
/// spawned with `kill_on_drop`, so a timeout or a dropped future kills it.
pub async fn execute_bash(
    ws: &Workspace,
    state: &mut ShellState,
    args: &ToolArguments,
    max_timeout: Duration,
    deadline: tokio::time::Instant,
) -> Result<String, ToolError> {
    let command = args
        .require_string("command")
        .map_err(ToolError::InvalidArgument)?;
    if command.trim().is_empty() {
        return Err(ToolError::InvalidArgument("command must not be empty".to_string()));
    }

    let mut timeout = max_timeout;
    if let Some(secs) = args.get_i64("timeout_secs") {
        if secs <= 0 {
            return Err(ToolError::InvalidArgument(
                "timeout_secs must be positive".to_string(),
            ));
        }
        timeout = timeout.min(Duration::from_secs(secs as u64));
    }
    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
    let timeout = timeout.min(remaining);

    // The directory may have been removed by an earlier command
    if !state.cwd.is_dir() {
        warn!(cwd = %state.cwd.display(), "Shell working directory is gone; resetting to root");
        state.cwd = ws.root().to_path_buf();
    }

    let script = format!(
        "{}\n__toolpod_status=$?\nprintf '\\n{}%s\\n' \"$(pwd)\"\nexit $__toolpod_status",
        command, CWD_MARKER
    );

    debug!(command, cwd = %state.cwd.display(), timeout_secs = timeout.as_secs(), "Running bash");

    let child = Command::new("sh")
        .arg("-c")
        .arg(&script)
        .current_dir(&state.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ToolError::Fatal(format!("Failed to spawn shell: {}", e)))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ToolError::io("Failed to wait for shell", e)),
        Err(_) => {
            return Err(ToolError::Failed(format!(
                "Command timed out after {} seconds",
                timeout.as_secs()
            )));
        }
    };

    let raw_stdout = String::from_utf8_lossy(&output.stdout);
    let (stdout, reported_cwd) = split_marker(&raw_stdout);
    let mut note = None;
    if let Some(cwd) = reported_cwd {
        match ws.resolve_from(ws.root(), cwd) {
            Ok(path) => state.cwd = path,
            Err(_) => {
                state.cwd = ws.root().to_path_buf();
                note = Some(format!(
                    "\n(working directory left the sandbox root; reset to {})",
                    ws.root().display()
                ));
            }
        }
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut combined = stdout.to_string();
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push_str("\n--- stderr ---\n");
        }
        combined.push_str(&stderr);
    }
    if let Some(note) = note {
        combined.push_str(&note);
    }

    match output.status.code() {
        Some(0) => Ok(combined),
        Some(code) => Ok(format!("Command exited with code {}\n{}", code, combined)),
        None => Ok(format!("Command terminated by signal\n{}", combined)),
    }
}

/// Split the cwd marker off the end of stdout.
fn split_marker(stdout: &str) -> (&str, Option<&str>) {
    match stdout.rfind(CWD_MARKER) {
        Some(at) => {
            let cwd = stdout[at + CWD_MARKER.len()..].trim_end_matches('\n');
            // printf emitted a newline before the marker
            let body = stdout[..at].strip_suffix('\n').unwrap_or(&stdout[..at]);
            (body, Some(cwd))
        }
        None => (stdout, None),
    }
}
