//! Sub-agent delegation.
//!
//! [`SubAgentProvider`] wraps a sandbox provider and serves the `agent` tool
//! itself: each invocation runs a nested [`RunSessionUseCase`] restricted to
//! the read-only tools, in auto-approve mode, with its own turn limit. Every
//! other tool is passed through to the wrapped provider.
//!
//! The nested session runs on its own task. A timeout or cancellation of the
//! `agent` call cancels that task's token, so the nested session still
//! terminates through its normal path and releases its instances.

use crate::config::ExecutionParams;
use crate::ports::model_client::ModelClient;
use crate::ports::sandbox::{SandboxError, SandboxHandle, SandboxProvider};
use crate::use_cases::run_session::{RunSessionInput, RunSessionUseCase};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use toolpod_domain::{PermissionMode, TerminationReason, ToolArguments, ToolDescriptor, ToolRegistry};
use tracing::{debug, info};

/// Name of the sub-agent tool.
pub const AGENT_TOOL: &str = "agent";

/// Sandbox provider that runs `agent` calls as nested sessions.
pub struct SubAgentProvider<M: ModelClient + ?Sized, P: SandboxProvider + ?Sized> {
    inner: Arc<P>,
    model: Arc<M>,
    registry: Arc<ToolRegistry>,
    params: ExecutionParams,
    agents: Mutex<HashMap<String, CancellationToken>>,
    next_id: AtomicU64,
}

impl<M, P> SubAgentProvider<M, P>
where
    M: ModelClient + ?Sized + 'static,
    P: SandboxProvider + ?Sized + 'static,
{
    /// `registry` is the parent's catalog; nested sessions see only its
    /// enabled read-only tools, minus `agent` itself.
    pub fn new(inner: Arc<P>, model: Arc<M>, registry: &ToolRegistry, params: ExecutionParams) -> Self {
        let registry = registry.filtered(|d| d.permission_class.is_read_only() && d.name != AGENT_TOOL);
        Self {
            inner,
            model,
            registry: Arc::new(registry),
            params,
            agents: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Catalog offered to nested sessions.
    pub fn sub_registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn token_for(&self, handle: &SandboxHandle) -> Option<CancellationToken> {
        self.agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&handle.id)
            .cloned()
    }

    async fn run_agent(&self, handle: &SandboxHandle, arguments: &ToolArguments) -> Result<String, SandboxError> {
        let prompt = arguments
            .require_string("prompt")
            .map_err(SandboxError::invocation)?
            .to_string();
        let token = self
            .token_for(handle)
            .ok_or_else(|| SandboxError::UnknownHandle(handle.id.clone()))?;

        let use_case = RunSessionUseCase::new(self.model.clone(), self.inner.clone(), self.registry.clone())
            .with_params(
                self.params
                    .clone()
                    .with_turn_limit(self.params.sub_agent_turn_limit),
            )
            .with_cancellation(token.child_token());
        let input = RunSessionInput::new(prompt, PermissionMode::AutoApprove);

        info!(agent = %handle, "Starting sub-agent session");
        let output = tokio::spawn(async move { use_case.execute(input).await })
            .await
            .map_err(|e| SandboxError::fatal(format!("Sub-agent task failed: {}", e)))?;

        match output.reason {
            TerminationReason::Completed { answer } => {
                debug!(agent = %handle, turns = output.session.turns(), "Sub-agent completed");
                Ok(answer)
            }
            other => Err(SandboxError::invocation(format!("Sub-agent ended: {}", other))),
        }
    }
}

#[async_trait]
impl<M, P> SandboxProvider for SubAgentProvider<M, P>
where
    M: ModelClient + ?Sized + 'static,
    P: SandboxProvider + ?Sized + 'static,
{
    async fn provision(&self, tool: &ToolDescriptor) -> Result<SandboxHandle, SandboxError> {
        if tool.name != AGENT_TOOL {
            return self.inner.provision(tool).await;
        }
        let id = format!("agent-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), CancellationToken::new());
        Ok(SandboxHandle::new(id, AGENT_TOOL))
    }

    async fn invoke(
        &self,
        handle: &SandboxHandle,
        arguments: &ToolArguments,
        deadline: Instant,
    ) -> Result<String, SandboxError> {
        if handle.tool_name == AGENT_TOOL {
            self.run_agent(handle, arguments).await
        } else {
            self.inner.invoke(handle, arguments, deadline).await
        }
    }

    async fn cancel(&self, handle: &SandboxHandle) {
        if handle.tool_name != AGENT_TOOL {
            return self.inner.cancel(handle).await;
        }
        if let Some(token) = self.token_for(handle) {
            token.cancel();
        }
    }

    async fn teardown(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        if handle.tool_name != AGENT_TOOL {
            return self.inner.teardown(handle).await;
        }
        let token = self
            .agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle.id);
        match token {
            Some(token) => {
                token.cancel();
                Ok(())
            }
            None => Err(SandboxError::UnknownHandle(handle.id.clone())),
        }
    }
}
