//! edit_file: view, create, str_replace, insert and undo_edit.
//!
//! The tool is session-scoped. Each instance owns an [`EditHistory`] holding
//! the previous contents of every file it changed, so `undo_edit` only
//! reverts edits made through the same instance.

use super::error::ToolError;
use super::file::number_lines;
use super::workspace::Workspace;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use toolpod_domain::{ParamType, PermissionClass, ToolArguments, ToolDescriptor, ToolParameter};

pub const EDIT_FILE: &str = "edit_file";

const EDIT_PROMPT: &str = "Views and edits files.\n\
* `view` shows a file with line numbers (optionally `view_range` [start, end], 1-indexed, \
end -1 for EOF) or lists a directory two levels deep.\n\
* `create` writes `file_text` to a new file; it fails if the file exists.\n\
* `str_replace` replaces `old_str` with `new_str`; `old_str` must match exactly one place \
in the file, including whitespace.\n\
* `insert` inserts `new_str` after line `insert_line` (0 inserts at the top).\n\
* `undo_edit` reverts the last str_replace or insert made to `path` by this tool.";

/// Previous file contents, most recent last.
#[derive(Debug, Default)]
pub struct EditHistory {
    snapshots: HashMap<PathBuf, Vec<String>>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, path: &Path, content: String) {
        self.snapshots.entry(path.to_path_buf()).or_default().push(content);
    }

    fn pop(&mut self, path: &Path) -> Option<String> {
        self.snapshots.get_mut(path).and_then(|v| v.pop())
    }

    /// Number of undoable edits recorded for `path`.
    pub fn depth(&self, path: &Path) -> usize {
        self.snapshots.get(path).map(Vec::len).unwrap_or(0)
    }
}

pub fn edit_file_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        EDIT_FILE,
        "View, create and edit files with exact string replacement",
        PermissionClass::Mutating,
    )
    .with_prompt_text(EDIT_PROMPT)
    .with_parameter(ToolParameter::new(
        "command",
        "One of: view, create, str_replace, insert, undo_edit",
        true,
    ))
    .with_parameter(ToolParameter::new("path", "Path to the file or directory", true))
    .with_parameter(ToolParameter::new("file_text", "Content for `create`", false))
    .with_parameter(ToolParameter::new("old_str", "Exact text to replace", false))
    .with_parameter(ToolParameter::new(
        "new_str",
        "Replacement text, or text to insert",
        false,
    ))
    .with_parameter(
        ToolParameter::new("insert_line", "Line after which to insert", false)
            .with_type(ParamType::Integer),
    )
    .with_parameter(
        ToolParameter::new("view_range", "[start, end] lines for `view`", false)
            .with_type(ParamType::Array),
    )
    .with_session_scoped(true)
}

/// Execute the edit_file tool against one instance's history.
pub fn execute_edit_file(
    ws: &Workspace,
    history: &mut EditHistory,
    args: &ToolArguments,
) -> Result<String, ToolError> {
    let command = args
        .require_string("command")
        .map_err(ToolError::InvalidArgument)?;
    let path_str = args.require_string("path").map_err(ToolError::InvalidArgument)?;
    let path = ws.resolve(path_str)?;

    match command {
        "view" => view(ws, &path, args),
        "create" => {
            let text = required(args, "file_text", command)?;
            create(ws, &path, text)
        }
        "str_replace" => {
            let old = required(args, "old_str", command)?;
            let new = args.get_string("new_str").unwrap_or("");
            str_replace(ws, history, &path, old, new)
        }
        "insert" => {
            let line = args.get_i64("insert_line").ok_or_else(|| {
                ToolError::InvalidArgument(
                    "Missing required parameter 'insert_line' for insert".to_string(),
                )
            })?;
            let text = required(args, "new_str", command)?;
            insert(ws, history, &path, line, text)
        }
        "undo_edit" => undo(ws, history, &path),
        other => Err(ToolError::InvalidArgument(format!(
            "Unknown command '{}'. Allowed: view, create, str_replace, insert, undo_edit",
            other
        ))),
    }
}

fn required<'a>(args: &'a ToolArguments, key: &str, command: &str) -> Result<&'a str, ToolError> {
    args.get_string(key).ok_or_else(|| {
        ToolError::InvalidArgument(format!(
            "Missing required parameter '{}' for {}",
            key, command
        ))
    })
}

fn read_existing(ws: &Workspace, path: &Path) -> Result<String, ToolError> {
    if !path.is_file() {
        return Err(ToolError::NotFound(ws.display(path)));
    }
    fs::read_to_string(path).map_err(|e| ToolError::io(format!("Failed to read {}", ws.display(path)), e))
}

fn write(ws: &Workspace, path: &Path, content: &str) -> Result<(), ToolError> {
    fs::write(path, content).map_err(|e| ToolError::io(format!("Failed to write {}", ws.display(path)), e))
}

fn view(ws: &Workspace, path: &Path, args: &ToolArguments) -> Result<String, ToolError> {
    if path.is_dir() {
        let mut entries = Vec::new();
        list_two_levels(path, path, 0, &mut entries);
        entries.sort();
        return Ok(format!(
            "Files and directories up to 2 levels deep in {}:\n{}",
            ws.display(path),
            entries.join("\n")
        ));
    }

    let content = read_existing(ws, path)?;
    let total = content.lines().count();
    let (offset, limit) = match args.get("view_range") {
        None => (0, usize::MAX),
        Some(range) => {
            let bounds: Option<Vec<i64>> = range
                .as_array()
                .map(|a| a.iter().filter_map(|v| v.as_i64()).collect());
            match bounds.as_deref() {
                Some([start, end]) if *start >= 1 && (*end == -1 || *end >= *start) => {
                    let start = *start as usize;
                    if start > total.max(1) {
                        return Err(ToolError::InvalidArgument(format!(
                            "view_range start {} is past the end of the file ({} lines)",
                            start, total
                        )));
                    }
                    let end = if *end == -1 { total } else { (*end as usize).min(total) };
                    (start - 1, end + 1 - start)
                }
                _ => {
                    return Err(ToolError::InvalidArgument(
                        "view_range must be [start, end] with 1 <= start <= end, or end = -1"
                            .to_string(),
                    ));
                }
            }
        }
    };
    Ok(number_lines(&content, offset, limit))
}

fn list_two_levels(root: &Path, dir: &Path, depth: usize, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        if path.is_dir() {
            out.push(format!("{}/", rel));
            if depth == 0 {
                list_two_levels(root, &path, depth + 1, out);
            }
        } else {
            out.push(rel);
        }
    }
}

fn create(ws: &Workspace, path: &Path, text: &str) -> Result<String, ToolError> {
    if path.exists() {
        return Err(ToolError::Failed(format!(
            "File already exists: {}. Use str_replace to change it",
            ws.display(path)
        )));
    }
    if let Some(parent) = path.parent()
        && !parent.is_dir()
    {
        return Err(ToolError::NotFound(format!(
            "Parent directory {} does not exist",
            ws.display(parent)
        )));
    }
    write(ws, path, text)?;
    Ok(format!("File created successfully at: {}", ws.display(path)))
}

fn str_replace(
    ws: &Workspace,
    history: &mut EditHistory,
    path: &Path,
    old: &str,
    new: &str,
) -> Result<String, ToolError> {
    if old.is_empty() {
        return Err(ToolError::InvalidArgument("old_str must not be empty".to_string()));
    }
    let content = read_existing(ws, path)?;
    let occurrences: Vec<usize> = content.match_indices(old).map(|(i, _)| i).collect();

    match occurrences.as_slice() {
        [] => Err(ToolError::Failed(format!(
            "No replacement was performed, old_str did not appear verbatim in {}",
            ws.display(path)
        ))),
        [at] => {
            let updated = format!("{}{}{}", &content[..*at], new, &content[at + old.len()..]);
            write(ws, path, &updated)?;
            let line = content[..*at].matches('\n').count() + 1;
            history.push(path, content);
            Ok(format!(
                "The file {} has been edited at line {}.",
                ws.display(path),
                line
            ))
        }
        many => {
            let lines: Vec<String> = many
                .iter()
                .map(|at| (content[..*at].matches('\n').count() + 1).to_string())
                .collect();
            Err(ToolError::Failed(format!(
                "No replacement was performed. old_str appears {} times in {} (lines {}); \
                 include more context to make it unique",
                many.len(),
                ws.display(path),
                lines.join(", ")
            )))
        }
    }
}

fn insert(
    ws: &Workspace,
    history: &mut EditHistory,
    path: &Path,
    line: i64,
    text: &str,
) -> Result<String, ToolError> {
    let content = read_existing(ws, path)?;
    let mut lines: Vec<&str> = content.lines().collect();
    if line < 0 || line as usize > lines.len() {
        return Err(ToolError::InvalidArgument(format!(
            "Invalid insert_line {}. It must be between 0 and {}",
            line,
            lines.len()
        )));
    }
    let at = line as usize;
    for (i, new_line) in text.lines().enumerate() {
        lines.insert(at + i, new_line);
    }
    let mut updated = lines.join("\n");
    if content.ends_with('\n') || content.is_empty() {
        updated.push('\n');
    }
    write(ws, path, &updated)?;
    history.push(path, content);
    Ok(format!(
        "The file {} has been edited: inserted {} line(s) after line {}.",
        ws.display(path),
        text.lines().count(),
        at
    ))
}

fn undo(ws: &Workspace, history: &mut EditHistory, path: &Path) -> Result<String, ToolError> {
    let previous = history
        .pop(path)
        .ok_or_else(|| ToolError::Failed(format!("No edit history for {}", ws.display(path))))?;
    write(ws, path, &previous)?;
    Ok(format!("Last edit to {} undone successfully.", ws.display(path)))
}
