//! Search tools: glob_search, grep_search

use super::error::ToolError;
use super::workspace::Workspace;
use glob::{MatchOptions, Pattern, glob_with};
use regex::RegexBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use toolpod_domain::{ParamType, PermissionClass, ToolArguments, ToolDescriptor, ToolParameter};

/// Tool name constants
pub const GLOB_SEARCH: &str = "glob_search";
pub const GREP_SEARCH: &str = "grep_search";

/// Maximum number of files returned by glob_search
pub const MAX_GLOB_RESULTS: usize = 1000;

/// Maximum number of files reported by grep_search
pub const MAX_GREP_FILES: usize = 100;

/// Maximum file size for grep (5 MB)
const MAX_GREP_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Matched lines are cut to this many bytes
const MAX_MATCH_LINE: usize = 300;

/// Directories never descended into by grep_search
const SKIPPED_DIRS: [&str; 2] = ["target", "node_modules"];

const GLOB_PROMPT: &str = "Finds files by glob pattern such as `**/*.rs` or `src/**/*.ts`. \
Results are workspace-relative paths sorted by modification time, newest first, and capped \
at 1000.";

const GREP_PROMPT: &str = "Searches file contents with a regular expression. Narrow the \
files with `include` (for example `*.rs` or `*.{ts,tsx}`). Returns matching lines grouped by \
file, newest files first, for at most 100 files. Hidden directories, target/ and \
node_modules/ are skipped.";

pub fn glob_search_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        GLOB_SEARCH,
        "Search for files matching a glob pattern",
        PermissionClass::ReadOnly,
    )
    .with_prompt_text(GLOB_PROMPT)
    .with_parameter(ToolParameter::new("pattern", "Glob pattern to match files", true))
    .with_parameter(ToolParameter::new(
        "path",
        "Directory to search from (default: workspace root)",
        false,
    ))
    .with_concurrency_safe(true)
}

pub fn grep_search_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        GREP_SEARCH,
        "Search for a regex pattern within file contents",
        PermissionClass::ReadOnly,
    )
    .with_prompt_text(GREP_PROMPT)
    .with_parameter(ToolParameter::new("pattern", "Regex pattern to search for", true))
    .with_parameter(ToolParameter::new(
        "path",
        "File or directory to search in (default: workspace root)",
        false,
    ))
    .with_parameter(ToolParameter::new(
        "include",
        "Glob on file names to search (e.g., '*.rs')",
        false,
    ))
    .with_parameter(
        ToolParameter::new("case_insensitive", "Perform case-insensitive search", false)
            .with_type(ParamType::Boolean),
    )
    .with_concurrency_safe(true)
}

/// Execute the glob_search tool
pub fn execute_glob_search(ws: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    let pattern = args
        .require_string("pattern")
        .map_err(ToolError::InvalidArgument)?;
    if Path::new(pattern).is_absolute() || pattern.split('/').any(|c| c == "..") {
        return Err(ToolError::InvalidArgument(
            "pattern must be relative to the search directory".to_string(),
        ));
    }

    let base = ws.resolve(args.get_string("path").unwrap_or("."))?;
    if !base.is_dir() {
        return Err(ToolError::NotFound(ws.display(&base)));
    }

    let full_pattern = format!("{}/{}", Pattern::escape(&base.to_string_lossy()), pattern);
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = glob_with(&full_pattern, options)
        .map_err(|e| ToolError::InvalidArgument(format!("Invalid glob pattern: {}", e)))?;

    let mut files: Vec<(SystemTime, PathBuf)> = entries
        .flatten()
        .filter(|p| p.is_file())
        .map(|p| (modified(&p), p))
        .collect();
    sort_newest_first(&mut files);

    if files.is_empty() {
        return Ok("No files found matching the pattern".to_string());
    }

    let total = files.len();
    let mut output = files
        .iter()
        .take(MAX_GLOB_RESULTS)
        .map(|(_, p)| ws.display(p))
        .collect::<Vec<_>>()
        .join("\n");
    if total > MAX_GLOB_RESULTS {
        output.push_str(&format!(
            "\n... ({} files, truncated to first {})",
            total, MAX_GLOB_RESULTS
        ));
    }
    Ok(output)
}

/// Execute the grep_search tool
pub fn execute_grep_search(ws: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    let pattern = args
        .require_string("pattern")
        .map_err(ToolError::InvalidArgument)?;
    let path_str = args.get_string("path").unwrap_or(".");
    let path = ws.resolve(path_str)?;
    if !path.exists() {
        return Err(ToolError::NotFound(path_str.to_string()));
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(args.get_bool("case_insensitive").unwrap_or(false))
        .build()
        .map_err(|e| ToolError::InvalidArgument(format!("Invalid regex pattern: {}", e)))?;

    let include = match args.get_string("include") {
        Some(glob) => expand_braces(glob)
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ToolError::InvalidArgument(format!("Invalid include pattern: {}", e)))?,
        None => Vec::new(),
    };

    let mut candidates = Vec::new();
    if path.is_file() {
        candidates.push(path.clone());
    } else {
        collect_files(&path, &mut candidates);
    }

    let mut hits: Vec<(SystemTime, PathBuf, Vec<String>)> = Vec::new();
    for file in candidates {
        if !include.is_empty() && !matches_include(&file, &include) {
            continue;
        }
        if fs::metadata(&file).map(|m| m.len() > MAX_GREP_FILE_SIZE).unwrap_or(true) {
            continue;
        }
        // Binary and non-UTF-8 files are skipped
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        let lines: Vec<String> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| regex.is_match(line))
            .map(|(n, line)| {
                format!(
                    "{}: {}",
                    n + 1,
                    toolpod_domain::util::truncate_str(line, MAX_MATCH_LINE)
                )
            })
            .collect();
        if !lines.is_empty() {
            hits.push((modified(&file), file, lines));
        }
    }

    if hits.is_empty() {
        return Ok("No matches found".to_string());
    }

    hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    let total = hits.len();
    let mut output = format!(
        "Found {} file{}",
        total,
        if total == 1 { "" } else { "s" }
    );
    if total > MAX_GREP_FILES {
        output.push_str(&format!(" (truncated to first {})", MAX_GREP_FILES));
    }
    for (_, file, lines) in hits.iter().take(MAX_GREP_FILES) {
        output.push_str(&format!("\n{}\n", ws.display(file)));
        output.push_str(&lines.join("\n"));
    }
    Ok(output)
}

/// Collect regular files under `dir`, skipping hidden and build directories.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) {
                continue;
            }
            collect_files(&entry.path(), out);
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
}

fn matches_include(file: &Path, include: &[Pattern]) -> bool {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    include.iter().any(|p| p.matches(&name))
}

/// Expand one `{a,b}` group: `*.{ts,tsx}` becomes `*.ts`, `*.tsx`.
fn expand_braces(pattern: &str) -> Vec<String> {
    if let Some(open) = pattern.find('{')
        && let Some(close) = pattern[open..].find('}').map(|i| open + i)
    {
        let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
        return pattern[open + 1..close]
            .split(',')
            .map(|alt| format!("{}{}{}", head, alt, tail))
            .collect();
    }
    vec![pattern.to_string()]
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn sort_newest_first(files: &mut [(SystemTime, PathBuf)]) {
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
}
