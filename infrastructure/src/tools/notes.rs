//! Scratchpad tools: think, memory_read and memory_write.
//!
//! Memory files live under their own directory (by default
//! `.toolpod/memory` inside the sandbox root) so they survive between runs.

use super::error::ToolError;
use super::workspace::Workspace;
use std::fs;
use toolpod_domain::util::truncate_str;
use toolpod_domain::{PermissionClass, ToolArguments, ToolDescriptor, ToolParameter};
use tracing::info;

pub const THINK: &str = "think";
pub const MEMORY_READ: &str = "memory_read";
pub const MEMORY_WRITE: &str = "memory_write";

const MAX_THOUGHT_BYTES: usize = 5000;

pub fn think_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        THINK,
        "Write down reasoning without taking any action",
        PermissionClass::ReadOnly,
    )
    .with_prompt_text(
        "Use this to reason about a problem step by step. It does not change anything \
         and returns no new information.",
    )
    .with_parameter(ToolParameter::new("thought", "Your reasoning", true))
    .with_concurrency_safe(true)
}

pub fn memory_read_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        MEMORY_READ,
        "Read a memory file, or list memory files when no path is given",
        PermissionClass::ReadOnly,
    )
    .with_parameter(ToolParameter::new(
        "file_path",
        "Memory file path, relative to the memory directory",
        false,
    ))
    .with_concurrency_safe(true)
}

pub fn memory_write_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        MEMORY_WRITE,
        "Write a memory file that persists between sessions",
        PermissionClass::Mutating,
    )
    .with_parameter(ToolParameter::new(
        "file_path",
        "Memory file path, relative to the memory directory",
        true,
    ))
    .with_parameter(ToolParameter::new("content", "Content to store", true))
}

pub fn execute_think(args: &ToolArguments) -> Result<String, ToolError> {
    let thought = args
        .require_string("thought")
        .map_err(ToolError::InvalidArgument)?;
    let logged = truncate_str(thought, MAX_THOUGHT_BYTES);
    info!(thought = logged, "think");
    Ok("Your thought has been logged.".to_string())
}

pub fn execute_memory_read(memory: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    match args.get_string("file_path") {
        Some(p) => {
            let path = memory.resolve(p)?;
            if !path.is_file() {
                return Err(ToolError::NotFound(format!("memory file {}", p)));
            }
            fs::read_to_string(&path).map_err(|e| ToolError::io(format!("Failed to read {}", p), e))
        }
        None => {
            let mut files = Vec::new();
            collect(memory, memory.root(), &mut files);
            if files.is_empty() {
                return Ok("No memory files".to_string());
            }
            files.sort();
            Ok(files.join("\n"))
        }
    }
}

fn collect(memory: &Workspace, dir: &std::path::Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(memory, &path, out);
        } else {
            out.push(memory.display(&path));
        }
    }
}

pub fn execute_memory_write(memory: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    let p = args
        .require_string("file_path")
        .map_err(ToolError::InvalidArgument)?;
    let content = args
        .require_string("content")
        .map_err(ToolError::InvalidArgument)?;
    let path = memory.resolve(p)?;
    if path == memory.root() {
        return Err(ToolError::InvalidArgument("file_path must name a file".to_string()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ToolError::io("Failed to create memory directory", e))?;
    }
    fs::write(&path, content).map_err(|e| ToolError::io(format!("Failed to write {}", p), e))?;
    Ok(format!("Saved {} bytes to memory file {}", content.len(), memory.display(&path)))
}
