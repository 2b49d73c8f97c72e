//! Progress reporting for toolpod sessions

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use toolpod_application::{SessionProgressNotifier, tool_args_preview};
use toolpod_domain::{TerminationReason, ToolCallRequest, ToolResult, ToolResultStatus};

/// Prints tool activity to stderr with a spinner while the model is thinking
pub struct ConsoleProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn stop_spinner(&self) {
        if let Some(pb) = self.spinner.lock().unwrap_or_else(|e| e.into_inner()).take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// `-> read_file path=src/main.rs`
pub fn call_line(call: &ToolCallRequest) -> String {
    let preview = tool_args_preview(call);
    if preview.is_empty() {
        format!("  {} {}", "->".cyan(), call.tool_name.bold())
    } else {
        format!("  {} {} {}", "->".cyan(), call.tool_name.bold(), preview.dimmed())
    }
}

/// `v read_file (3ms)` on success, status and first line of the payload otherwise
pub fn result_line(result: &ToolResult) -> String {
    let timing = match result.duration_ms {
        Some(ms) => format!(" {}", format!("({}ms)", ms).dimmed()),
        None => String::new(),
    };
    match result.status {
        ToolResultStatus::Ok => format!("  {} {}{}", "v".green(), result.tool_name, timing),
        status => {
            let first = result.payload.lines().next().unwrap_or("");
            let marker = match status {
                ToolResultStatus::Timeout | ToolResultStatus::Cancelled => "!".yellow(),
                _ => "x".red(),
            };
            format!(
                "  {} {} [{}] {}{}",
                marker,
                result.tool_name,
                status.as_str(),
                first,
                timing
            )
        }
    }
}

impl SessionProgressNotifier for ConsoleProgress {
    fn on_turn_start(&self, turn: usize) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(format!("Turn {}", turn + 1));
        pb.set_message("waiting for model...");
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Some(old) = self
            .spinner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(pb)
        {
            old.finish_and_clear();
        }
    }

    fn on_tool_calls(&self, turn: usize, calls: &[ToolCallRequest]) {
        self.stop_spinner();
        eprintln!(
            "{} {} tool call(s)",
            format!("Turn {}:", turn + 1).bold(),
            calls.len()
        );
    }

    fn on_tool_call(&self, call: &ToolCallRequest) {
        eprintln!("{}", call_line(call));
    }

    fn on_tool_result(&self, result: &ToolResult) {
        eprintln!("{}", result_line(result));
    }

    fn on_terminated(&self, _reason: &TerminationReason) {
        self.stop_spinner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_line() {
        colored::control::set_override(false);
        let call = ToolCallRequest::new("c1", "read_file").with_arg("path", "src/main.rs");
        let line = call_line(&call);
        assert!(line.starts_with("  -> read_file"));
        assert!(line.contains("src/main.rs"));

        let bare = ToolCallRequest::new("c2", "think");
        assert_eq!(call_line(&bare), "  -> think");
    }

    #[test]
    fn test_result_line() {
        colored::control::set_override(false);
        let ok = ToolResult::ok(&ToolCallRequest::new("c1", "list_dir"), "a\nb")
            .with_duration(Duration::from_millis(3));
        assert_eq!(result_line(&ok), "  v list_dir (3ms)");

        let failed = ToolResult::error(&ToolCallRequest::new("c2", "bash"), "boom\nmore");
        let line = result_line(&failed);
        assert!(line.starts_with("  x bash [error] Error: boom"));
        assert!(!line.contains("more"));

        let timed_out = ToolResult::timeout(&ToolCallRequest::new("c3", "bash"), Duration::from_secs(30));
        assert!(result_line(&timed_out).starts_with("  ! bash [timeout]"));
    }

    #[test]
    fn test_spinner_lifecycle() {
        let progress = ConsoleProgress::new();
        progress.on_turn_start(0);
        assert!(progress.spinner.lock().unwrap().is_some());
        progress.on_tool_calls(0, &[]);
        assert!(progress.spinner.lock().unwrap().is_none());

        progress.on_turn_start(1);
        progress.on_terminated(&TerminationReason::Cancelled);
        assert!(progress.spinner.lock().unwrap().is_none());
    }
}
