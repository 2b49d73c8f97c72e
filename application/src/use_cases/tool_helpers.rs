//! Shared helpers for tool use cases.

use toolpod_domain::ToolCallRequest;

/// Extract a short preview string from tool call arguments.
///
/// Looks for well-known keys (`path`, `command`, `pattern`, `prompt`, `key`)
/// first, then falls back to the first string value in key order.
pub fn tool_args_preview(call: &ToolCallRequest) -> String {
    let keys = ["path", "command", "pattern", "prompt", "key"];
    for key in &keys {
        if let Some(s) = call.arguments.get_string(key) {
            return truncate_preview(s, 50);
        }
    }
    let mut names: Vec<&String> = call.arguments.keys().collect();
    names.sort();
    for name in names {
        if let Some(s) = call.arguments.get_string(name) {
            return truncate_preview(s, 50);
        }
    }
    String::new()
}

fn truncate_preview(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    if first_line.chars().count() <= max_len && first_line.len() == s.len() {
        s.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
