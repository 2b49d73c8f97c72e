//! notebook_edit: replace, insert or delete one cell of a Jupyter notebook

use super::error::ToolError;
use super::workspace::Workspace;
use serde_json::{Value, json};
use std::fs;
use toolpod_domain::{ParamType, PermissionClass, ToolArguments, ToolDescriptor, ToolParameter};

pub const NOTEBOOK_EDIT: &str = "notebook_edit";

const NOTEBOOK_PROMPT: &str = "Edits a cell of a Jupyter notebook (.ipynb). `cell_number` is \
0-indexed. `edit_mode` is `replace` (default), `insert` (adds a new cell at that index; \
`cell_type` is required) or `delete`. Replacing a code cell clears its outputs.";

pub fn notebook_edit_definition() -> ToolDescriptor {
    ToolDescriptor::new(
        NOTEBOOK_EDIT,
        "Replace, insert or delete a cell in a Jupyter notebook",
        PermissionClass::Mutating,
    )
    .with_prompt_text(NOTEBOOK_PROMPT)
    .with_parameter(ToolParameter::new("notebook_path", "Path to the .ipynb file", true))
    .with_parameter(
        ToolParameter::new("cell_number", "0-indexed cell to edit", true)
            .with_type(ParamType::Integer),
    )
    .with_parameter(ToolParameter::new("new_source", "New source for the cell", false))
    .with_parameter(ToolParameter::new("cell_type", "code or markdown", false))
    .with_parameter(ToolParameter::new("edit_mode", "replace, insert or delete", false))
}

/// Execute the notebook_edit tool
pub fn execute_notebook_edit(ws: &Workspace, args: &ToolArguments) -> Result<String, ToolError> {
    let path_str = args
        .require_string("notebook_path")
        .map_err(ToolError::InvalidArgument)?;
    let path = ws.resolve(path_str)?;
    if path.extension().and_then(|e| e.to_str()) != Some("ipynb") {
        return Err(ToolError::InvalidArgument(format!(
            "'{}' is not a .ipynb file",
            path_str
        )));
    }
    if !path.is_file() {
        return Err(ToolError::NotFound(path_str.to_string()));
    }

    let cell_number = match args.get_i64("cell_number") {
        Some(n) if n >= 0 => n as usize,
        _ => {
            return Err(ToolError::InvalidArgument(
                "cell_number must be a non-negative integer".to_string(),
            ));
        }
    };
    let mode = args.get_string("edit_mode").unwrap_or("replace");
    let cell_type = match args.get_string("cell_type") {
        None => None,
        Some(t @ ("code" | "markdown")) => Some(t),
        Some(other) => {
            return Err(ToolError::InvalidArgument(format!(
                "cell_type must be 'code' or 'markdown', got '{}'",
                other
            )));
        }
    };

    let raw = fs::read_to_string(&path)
        .map_err(|e| ToolError::io(format!("Failed to read {}", path_str), e))?;
    let mut notebook: Value = serde_json::from_str(&raw)
        .map_err(|e| ToolError::Failed(format!("{} is not valid notebook JSON: {}", path_str, e)))?;
    let cells = notebook
        .get_mut("cells")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| ToolError::Failed(format!("{} has no cells array", path_str)))?;

    let message = match mode {
        "replace" => {
            let source = new_source(args)?;
            let cell = cells.get_mut(cell_number).ok_or_else(|| out_of_range(cell_number, false))?;
            if let Some(t) = cell_type {
                cell["cell_type"] = json!(t);
            }
            cell["source"] = json!(source);
            if cell["cell_type"] == "code" {
                cell["outputs"] = json!([]);
                cell["execution_count"] = Value::Null;
            }
            format!("Updated cell {} with {}", cell_number, preview(source))
        }
        "insert" => {
            let source = new_source(args)?;
            let kind = cell_type.ok_or_else(|| {
                ToolError::InvalidArgument("cell_type is required for insert".to_string())
            })?;
            if cell_number > cells.len() {
                return Err(out_of_range(cell_number, true));
            }
            let mut cell = json!({
                "cell_type": kind,
                "metadata": {},
                "source": source,
            });
            if kind == "code" {
                cell["outputs"] = json!([]);
                cell["execution_count"] = Value::Null;
            }
            cells.insert(cell_number, cell);
            format!("Inserted cell {} with {}", cell_number, preview(source))
        }
        "delete" => {
            if cell_number >= cells.len() {
                return Err(out_of_range(cell_number, false));
            }
            cells.remove(cell_number);
            format!("Deleted cell {}", cell_number)
        }
        other => {
            return Err(ToolError::InvalidArgument(format!(
                "edit_mode must be replace, insert or delete, got '{}'",
                other
            )));
        }
    };

    let mut rendered = serde_json::to_string_pretty(&notebook)
        .map_err(|e| ToolError::Failed(format!("Failed to serialize notebook: {}", e)))?;
    rendered.push('\n');
    fs::write(&path, rendered)
        .map_err(|e| ToolError::io(format!("Failed to write {}", path_str), e))?;

    Ok(message)
}

fn new_source(args: &ToolArguments) -> Result<&str, ToolError> {
    args.get_string("new_source")
        .ok_or_else(|| ToolError::InvalidArgument("new_source is required".to_string()))
}

fn out_of_range(cell_number: usize, inserting: bool) -> ToolError {
    ToolError::InvalidArgument(format!(
        "cell_number {} is out of range{}",
        cell_number,
        if inserting { " for insert" } else { "" }
    ))
}

fn preview(source: &str) -> String {
    let first = source.lines().next().unwrap_or("");
    format!("'{}'", toolpod_domain::util::truncate_str(first, 60))
}
