//! Local sandbox provider: runs the built-in tools on this machine.
//!
//! [`LocalSandboxProvider`] implements the application's [`SandboxProvider`]
//! port. Each provisioned handle maps to a [`LocalInstance`]:
//!
//! ```text
//! provision(tool)
//!   ├─ bash       → Shell(ShellState)     cwd persists between calls
//!   ├─ edit_file  → Editor(EditHistory)   undo_edit sees this instance's edits
//!   └─ otherwise  → Stateless(tool name)  blocking I/O on spawn_blocking
//! ```
//!
//! File system access is confined to the sandbox root (and the memory
//! directory for the memory tools). Output larger than `max_output_bytes`
//! is cut with a truncation notice.

use super::command::{self, ShellState};
use super::edit::{self, EditHistory};
use super::error::ToolError;
use super::workspace::Workspace;
use super::{file, notebook, notes, search};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use toolpod_application::{SandboxError, SandboxHandle, SandboxProvider};
use toolpod_domain::util::truncate_output;
use toolpod_domain::{ToolArguments, ToolDescriptor};
use tracing::{debug, info};

use crate::config::{DEFAULT_MAX_OUTPUT_BYTES, FileSandboxConfig};

/// One provisioned execution context.
#[derive(Clone)]
enum LocalInstance {
    Stateless(String),
    Shell(Arc<tokio::sync::Mutex<ShellState>>),
    Editor(Arc<Mutex<EditHistory>>),
}

/// Sandbox provider backed by the local file system and `sh`.
pub struct LocalSandboxProvider {
    workspace: Workspace,
    memory: Workspace,
    max_output_bytes: usize,
    bash_timeout: Duration,
    instances: Mutex<HashMap<String, LocalInstance>>,
    next_id: AtomicU64,
}

impl LocalSandboxProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let memory = root.join(".toolpod").join("memory");
        Self {
            workspace: Workspace::new(root),
            memory: Workspace::new(memory),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            bash_timeout: Duration::from_secs(30),
            instances: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Build from the `[sandbox]` config section, resolving relative paths against `cwd`.
    pub fn from_config(config: &FileSandboxConfig, cwd: &std::path::Path) -> Self {
        let root = config.resolve_root(cwd);
        let memory = config.resolve_memory_dir(&root);
        Self::new(root)
            .with_memory_dir(memory)
            .with_max_output_bytes(config.max_output_bytes)
            .with_bash_timeout(Duration::from_secs(config.bash_timeout_secs))
    }

    pub fn with_memory_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.memory = Workspace::new(dir);
        self
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    pub fn with_bash_timeout(mut self, timeout: Duration) -> Self {
        self.bash_timeout = timeout;
        self
    }

    pub fn root(&self) -> &std::path::Path {
        self.workspace.root()
    }

    /// Number of live handles.
    pub fn live_instances(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, LocalInstance>> {
        self.instances.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn instance(&self, handle: &SandboxHandle) -> Result<LocalInstance, SandboxError> {
        self.lock()
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| SandboxError::UnknownHandle(handle.id.clone()))
    }

    async fn run_stateless(&self, tool: String, args: ToolArguments) -> Result<String, ToolError> {
        let ws = self.workspace.clone();
        let memory = self.memory.clone();
        tokio::task::spawn_blocking(move || match tool.as_str() {
            file::READ_FILE => file::execute_read_file(&ws, &args),
            file::WRITE_FILE => file::execute_write_file(&ws, &args),
            file::LIST_DIR => file::execute_list_dir(&ws, &args),
            search::GLOB_SEARCH => search::execute_glob_search(&ws, &args),
            search::GREP_SEARCH => search::execute_grep_search(&ws, &args),
            notebook::NOTEBOOK_EDIT => notebook::execute_notebook_edit(&ws, &args),
            notes::THINK => notes::execute_think(&args),
            notes::MEMORY_READ => notes::execute_memory_read(&memory, &args),
            notes::MEMORY_WRITE => notes::execute_memory_write(&memory, &args),
            other => Err(ToolError::Fatal(format!("No local handler for tool '{}'", other))),
        })
        .await
        .map_err(|e| ToolError::Fatal(format!("Tool task panicked: {}", e)))?
    }
}

fn is_local_tool(name: &str) -> bool {
    matches!(
        name,
        file::READ_FILE
            | file::WRITE_FILE
            | file::LIST_DIR
            | search::GLOB_SEARCH
            | search::GREP_SEARCH
            | notebook::NOTEBOOK_EDIT
            | notes::THINK
            | notes::MEMORY_READ
            | notes::MEMORY_WRITE
            | command::BASH
            | edit::EDIT_FILE
    )
}

#[async_trait]
impl SandboxProvider for LocalSandboxProvider {
    async fn provision(&self, tool: &ToolDescriptor) -> Result<SandboxHandle, SandboxError> {
        if !is_local_tool(&tool.name) {
            return Err(SandboxError::Provision {
                tool: tool.name.clone(),
                message: "no local implementation".to_string(),
            });
        }

        let instance = match tool.name.as_str() {
            command::BASH => LocalInstance::Shell(Arc::new(tokio::sync::Mutex::new(
                ShellState::new(&self.workspace),
            ))),
            edit::EDIT_FILE => LocalInstance::Editor(Arc::new(Mutex::new(EditHistory::new()))),
            other => LocalInstance::Stateless(other.to_string()),
        };

        let id = format!("local-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.lock().insert(id.clone(), instance);
        debug!(tool = %tool.name, id = %id, "Provisioned local instance");
        Ok(SandboxHandle::new(id, tool.name.clone()))
    }

    async fn invoke(
        &self,
        handle: &SandboxHandle,
        arguments: &ToolArguments,
        deadline: Instant,
    ) -> Result<String, SandboxError> {
        let instance = self.instance(handle)?;
        let args = arguments.clone();

        let result = match instance {
            LocalInstance::Stateless(tool) => self.run_stateless(tool, args).await,
            LocalInstance::Shell(state) => {
                let mut state = state.lock().await;
                command::execute_bash(&self.workspace, &mut state, &args, self.bash_timeout, deadline)
                    .await
            }
            LocalInstance::Editor(history) => {
                let ws = self.workspace.clone();
                tokio::task::spawn_blocking(move || {
                    let mut history = history.lock().unwrap_or_else(|e| e.into_inner());
                    edit::execute_edit_file(&ws, &mut history, &args)
                })
                .await
                .map_err(|e| ToolError::Fatal(format!("Tool task panicked: {}", e)))
                .and_then(|r| r)
            }
        };

        let output = result.map_err(SandboxError::from)?;
        Ok(truncate_output(&output, self.max_output_bytes))
    }

    async fn cancel(&self, handle: &SandboxHandle) {
        // Dropping the invoke future kills a running shell child; blocking
        // file operations are short and run to completion.
        debug!(handle = %handle, "Cancel requested");
    }

    async fn teardown(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        match self.lock().remove(&handle.id) {
            Some(_) => {
                debug!(handle = %handle, "Tore down local instance");
                Ok(())
            }
            None => Err(SandboxError::Teardown(format!(
                "handle {} is not live",
                handle.id
            ))),
        }
    }
}

impl Drop for LocalSandboxProvider {
    fn drop(&mut self) {
        let live = self.lock().len();
        if live > 0 {
            info!(live, "Local sandbox dropped with live instances");
        }
    }
}
