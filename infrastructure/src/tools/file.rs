//! File operation tools: read_file, write_file, list_dir

use super::error::ToolError;
use super::workspace::Workspace;
use std::fs;
use toolpod_domain::{ParamType, PermissionClass, ToolArguments, ToolDescriptor, ToolParameter};

/// Tool name constants
pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_DIR: &str = "list_dir";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

/// Lines returned when no limit is given
pub const DEFAULT_LINE_LIMIT: usize = 2000;

/// Longer lines are cut to this many characters
pub const MAX_LINE_CHARS: usize = 2000;

const READ_FILE_PROMPT: &str = "Reads a file inside the workspace. Paths may be absolute or \
relative to the workspace root. Output is numbered like `cat -n`. By default up to 2000 lines \
are returned from the start of the file; pass offset (0-indexed line) and limit to page \
through long files. Lines longer than 2000 characters are truncated.";

const WRITE_FILE_PROMPT: &str = "Writes a file inside the workspace, replacing any existing \
content. Missing parent directories are created. Prefer edit_file for changing part of an \
existing file.";

pub fn read_file_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        READ_FILE,
        "Read a file from the workspace",
        PermissionClass::ReadOnly,
    )
    .with_prompt_text(READ_FILE_PROMPT)
    .with_parameter(ToolParameter::new("path", "Path to the file to read", true))
    .with_parameter(
        ToolParameter::new("offset", "Line number to start reading from (0-indexed)", false)
            .with_type(ParamType::Integer),
    )
    .with_parameter(
        ToolParameter::new("limit", "Maximum number of lines to read", false)
            .with_type(ParamType::Integer),
    )
    .with_concurrency_safe(true)
}

pub fn write_file_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        WRITE_FILE,
        "Create or overwrite a file in the workspace",
        PermissionClass::Mutating,
    )
    .with_prompt_text(WRITE_FILE_PROMPT)
    .with_parameter(ToolParameter::new("path", "Path to the file to write", true))
    .with_parameter(ToolParameter::new("content", "Content to write to the file", true))
}

pub fn list_dir_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        LIST_DIR,
        "List the entries of a directory; directories end with '/'",
        PermissionClass::ReadOnly,
    )
    .with_parameter(ToolParameter::new(
        "path",
        "Directory to list (default: workspace root)",
        false,
    ))
    .with_concurrency_safe(true)
}

/// Execute the read_file tool
pub fn execute_read_file(ws: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    let path_str = args.require_string("path").map_err(ToolError::InvalidArgument)?;
    let path = ws.resolve(path_str)?;

    if !path.exists() {
        return Err(ToolError::NotFound(path_str.to_string()));
    }
    if !path.is_file() {
        return Err(ToolError::InvalidArgument(format!(
            "'{}' is not a file",
            path_str
        )));
    }

    let metadata = fs::metadata(&path)
        .map_err(|e| ToolError::io(format!("Failed to get metadata of {}", path_str), e))?;
    if metadata.len() > MAX_READ_SIZE {
        return Err(ToolError::InvalidArgument(format!(
            "File too large ({} bytes). Maximum size is {} bytes",
            metadata.len(),
            MAX_READ_SIZE
        )));
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| ToolError::io(format!("Failed to read {}", path_str), e))?;

    let offset = non_negative(args, "offset")?.unwrap_or(0);
    let limit = non_negative(args, "limit")?.unwrap_or(DEFAULT_LINE_LIMIT);

    Ok(number_lines(&content, offset, limit))
}

/// Execute the write_file tool
pub fn execute_write_file(ws: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    let path_str = args.require_string("path").map_err(ToolError::InvalidArgument)?;
    let content = args
        .require_string("content")
        .map_err(ToolError::InvalidArgument)?;
    let path = ws.resolve(path_str)?;

    if path.is_dir() {
        return Err(ToolError::InvalidArgument(format!(
            "'{}' is a directory",
            path_str
        )));
    }
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .map_err(|e| ToolError::io(format!("Failed to create directories for {}", path_str), e))?;
    }

    fs::write(&path, content)
        .map_err(|e| ToolError::io(format!("Failed to write {}", path_str), e))?;

    Ok(format!(
        "Successfully wrote {} bytes to {}",
        content.len(),
        ws.display(&path)
    ))
}

/// Execute the list_dir tool
pub fn execute_list_dir(ws: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    let path_str = args.get_string("path").unwrap_or(".");
    let path = ws.resolve(path_str)?;

    if !path.exists() {
        return Err(ToolError::NotFound(path_str.to_string()));
    }
    if !path.is_dir() {
        return Err(ToolError::InvalidArgument(format!(
            "'{}' is not a directory",
            path_str
        )));
    }

    let entries = fs::read_dir(&path)
        .map_err(|e| ToolError::io(format!("Failed to list {}", path_str), e))?;
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                format!("{}/", name)
            } else {
                name
            }
        })
        .collect();
    names.sort();

    if names.is_empty() {
        return Ok(format!("{} is empty", ws.display(&path)));
    }
    Ok(names.join("\n"))
}

/// Render lines `offset..offset+limit` in `cat -n` style.
pub(crate) fn number_lines(content: &str, offset: usize, limit: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return "(empty file)".to_string();
    }
    if offset >= lines.len() {
        return format!(
            "(offset {} is past the end of the file, which has {} lines)",
            offset,
            lines.len()
        );
    }

    let end = offset.saturating_add(limit).min(lines.len());
    let mut out = String::new();
    for (i, line) in lines[offset..end].iter().enumerate() {
        let shown = match line.char_indices().nth(MAX_LINE_CHARS) {
            Some((cut, _)) => &line[..cut],
            None => line,
        };
        out.push_str(&format!("{:>6}\t{}\n", offset + i + 1, shown));
    }
    if end < lines.len() {
        out.push_str(&format!("... ({} more lines)\n", lines.len() - end));
    }
    out
}

fn non_negative(args: &ToolArguments, key: &str) -> Result<Option<usize>, ToolError> {
    match args.get_i64(key) {
        None => Ok(None),
        Some(n) if n < 0 => Err(ToolError::InvalidArgument(format!(
            "{} must not be negative",
            key
        ))),
        Some(n) => Ok(Some(n as usize)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(path: &str) -> ToolArguments {
        ToolArguments::new().with("path", path)
    }

    #[test]
    fn test_read_file_numbers_lines() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha\nbeta\ngamma\n").unwrap();
        let ws = Workspace::new(dir.path());

        let out = execute_read_file(&ws, &args("a.txt")).unwrap();
        assert_eq!(out, "     1\talpha\n     2\tbeta\n     3\tgamma\n");
    }

    #[test]
    fn test_read_file_offset_and_limit() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "1\n2\n3\n4\n5\n").unwrap();
        let ws = Workspace::new(dir.path());

        let out = execute_read_file(&ws, &args("a.txt").with("offset", 1).with("limit", 2)).unwrap();
        assert_eq!(out, "     2\t2\n     3\t3\n... (2 more lines)\n");

        let out = execute_read_file(&ws, &args("a.txt").with("offset", 9)).unwrap();
        assert!(out.contains("past the end"));

        let err = execute_read_file(&ws, &args("a.txt").with("limit", -1)).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[test]
    fn test_read_file_default_limit_and_line_cap() {
        let long_line = "x".repeat(MAX_LINE_CHARS + 10);
        let mut content = format!("{}\n", long_line);
        for i in 0..DEFAULT_LINE_LIMIT + 5 {
            content.push_str(&format!("{}\n", i));
        }
        let out = number_lines(&content, 0, DEFAULT_LINE_LIMIT);
        let first = out.lines().next().unwrap();
        assert_eq!(first.len(), 7 + MAX_LINE_CHARS);
        assert!(out.ends_with("... (6 more lines)\n"));
    }

    #[test]
    fn test_read_file_errors() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let ws = Workspace::new(dir.path());

        assert!(matches!(
            execute_read_file(&ws, &args("missing.txt")),
            Err(ToolError::NotFound(_))
        ));
        assert!(matches!(
            execute_read_file(&ws, &args("sub")),
            Err(ToolError::InvalidArgument(_))
        ));
        assert!(matches!(
            execute_read_file(&ws, &args("../outside.txt")),
            Err(ToolError::OutsideRoot(_))
        ));
        assert!(matches!(
            execute_read_file(&ws, &ToolArguments::new()),
            Err(ToolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_read_empty_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty"), "").unwrap();
        let ws = Workspace::new(dir.path());
        assert_eq!(execute_read_file(&ws, &args("empty")).unwrap(), "(empty file)");
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());

        let out = execute_write_file(&ws, &args("deep/er/new.txt").with("content", "hello")).unwrap();
        assert_eq!(out, "Successfully wrote 5 bytes to deep/er/new.txt");
        assert_eq!(
            fs::read_to_string(dir.path().join("deep/er/new.txt")).unwrap(),
            "hello"
        );

        // Overwrite
        execute_write_file(&ws, &args("deep/er/new.txt").with("content", "bye")).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("deep/er/new.txt")).unwrap(),
            "bye"
        );
    }

    #[test]
    fn test_write_file_rejects_escape() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path().join("inner"));
        let err = execute_write_file(&ws, &args("../x.txt").with("content", "nope")).unwrap_err();
        assert!(matches!(err, ToolError::OutsideRoot(_)));
        assert!(!dir.path().join("x.txt").exists());
    }

    #[test]
    fn test_list_dir_sorted_with_dir_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        let ws = Workspace::new(dir.path());

        let out = execute_list_dir(&ws, &ToolArguments::new()).unwrap();
        assert_eq!(out, "a.txt\nb.txt\nsrc/");
    }

    #[test]
    fn test_list_dir_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f"), "").unwrap();
        let ws = Workspace::new(dir.path());
        assert!(matches!(
            execute_list_dir(&ws, &args("f")),
            Err(ToolError::InvalidArgument(_))
        ));
        assert!(matches!(
            execute_list_dir(&ws, &args("nope")),
            Err(ToolError::NotFound(_))
        ));
    }
}
