//! Console output for session outcomes, the tool catalog and configuration

use colored::Colorize;
use std::process::ExitCode;
use toolpod_application::RunSessionOutput;
use toolpod_domain::{ConfigIssue, PermissionClass, Severity, TerminationReason, ToolDescriptor};
use toolpod_infrastructure::ConfigSource;

/// Exit status for a finished session.
///
/// Completed sessions exit 0, a hit turn limit 2, a fatal error 1 and a
/// cancelled session 130 (the conventional code for SIGINT).
pub fn exit_code(reason: &TerminationReason) -> u8 {
    match reason {
        TerminationReason::Completed { .. } => 0,
        TerminationReason::Fatal { .. } => 1,
        TerminationReason::TurnLimitExceeded { .. } => 2,
        TerminationReason::Cancelled => 130,
    }
}

/// One-line summary printed after the answer.
pub fn summary_line(output: &RunSessionOutput) -> String {
    let session = &output.session;
    let mut line = format!(
        "{} turn(s), {} tool call(s), {} instance(s)",
        session.turns(),
        session.tool_call_count(),
        output.instances.len()
    );
    if output.release.errors > 0 {
        line.push_str(&format!(", {} teardown error(s)", output.release.errors));
    }
    line
}

/// Print the answer to stdout and the summary to stderr.
pub fn print_outcome(output: &RunSessionOutput, quiet: bool) -> ExitCode {
    match &output.reason {
        TerminationReason::Completed { answer } => println!("{}", answer),
        TerminationReason::TurnLimitExceeded { .. } => {
            eprintln!("{} {}", "Stopped:".yellow().bold(), output.reason)
        }
        TerminationReason::Fatal { .. } => eprintln!("{} {}", "Error:".red().bold(), output.reason),
        TerminationReason::Cancelled => eprintln!("{}", "Cancelled.".yellow()),
    }
    if !quiet {
        eprintln!("{}", summary_line(output).dimmed());
    }
    ExitCode::from(exit_code(&output.reason))
}

fn class_label(class: PermissionClass) -> colored::ColoredString {
    let padded = format!("{:<10}", class.as_str());
    match class {
        PermissionClass::ReadOnly => padded.green(),
        PermissionClass::Mutating => padded.yellow(),
        PermissionClass::Dangerous => padded.red(),
    }
}

/// `bash         dangerous  session-scoped, timeout 60s`
pub fn tool_row(descriptor: &ToolDescriptor, allowed: bool) -> String {
    let mut flags = Vec::new();
    if descriptor.concurrency_safe {
        flags.push("concurrent".to_string());
    }
    if descriptor.session_scoped {
        flags.push("session-scoped".to_string());
    }
    if let Some(timeout) = descriptor.timeout {
        flags.push(format!("timeout {}s", timeout.as_secs()));
    }
    if allowed {
        flags.push("allow-listed".to_string());
    }
    format!(
        "{:<14} {} {}",
        descriptor.name,
        class_label(descriptor.permission_class),
        flags.join(", ")
    )
}

pub fn issue_line(issue: &ConfigIssue) -> String {
    match issue.severity {
        Severity::Error => format!("{} {}", "error:".red().bold(), issue.message),
        Severity::Warning => format!("{} {}", "warning:".yellow().bold(), issue.message),
    }
}

pub fn print_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        eprintln!("{}", issue_line(issue));
    }
}

pub fn print_sources(sources: &[ConfigSource]) {
    println!("{}", "Configuration sources (highest priority first):".bold());
    for source in sources {
        let mark = if source.found {
            format!("{:<8}", "found").green()
        } else {
            format!("{:<8}", "missing").dimmed()
        };
        println!("  {:<9} {} {}", source.label, mark, source.location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use toolpod_domain::ConfigIssueCode;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&TerminationReason::Completed { answer: "x".into() }), 0);
        assert_eq!(exit_code(&TerminationReason::Fatal { message: "m".into() }), 1);
        assert_eq!(exit_code(&TerminationReason::TurnLimitExceeded { limit: 3 }), 2);
        assert_eq!(exit_code(&TerminationReason::Cancelled), 130);
    }

    #[test]
    fn test_tool_row_flags() {
        colored::control::set_override(false);
        let mut bash = ToolDescriptor::new("bash", "Run a command", PermissionClass::Dangerous);
        bash.session_scoped = true;
        bash.timeout = Some(Duration::from_secs(60));

        let row = tool_row(&bash, true);
        assert!(row.starts_with("bash "));
        assert!(row.contains("dangerous"));
        assert!(row.ends_with("session-scoped, timeout 60s, allow-listed"));

        let think = ToolDescriptor::new("think", "t", PermissionClass::ReadOnly);
        assert!(tool_row(&think, false).trim_end().ends_with("read_only"));
    }

    #[test]
    fn test_issue_line() {
        colored::control::set_override(false);
        let issue = ConfigIssue::warning(
            ConfigIssueCode::UnknownTool {
                field: "permissions.allow".into(),
                name: "nope".into(),
            },
            "permissions.allow: unknown tool 'nope' ignored",
        );
        assert_eq!(
            issue_line(&issue),
            "warning: permissions.allow: unknown tool 'nope' ignored"
        );
    }
}
