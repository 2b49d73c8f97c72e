//! Tool dispatch for one turn.
//!
//! Takes the tool calls of a model turn and produces exactly one
//! [`ToolResult`] per call, in request order.
//!
//! Each call passes three gates before it reaches a sandbox:
//!
//! 1. **Lookup**: unknown or disabled tools get an error result.
//! 2. **Permission**: [`PermissionPolicy::evaluate`]. `Deny` yields a
//!    PermissionDenied result; `ConfirmRequired` asks the
//!    [`ConfirmationResolver`] one call at a time, and an absent resolver or
//!    a declined prompt behaves as `Deny`.
//! 3. **Validation**: arguments are checked against the descriptor.
//!
//! Calls that pass run in request order. Consecutive concurrency-safe calls
//! form a batch that runs with at most `fan_out` calls in flight; any other
//! call runs alone. Results are reassembled by position, so completion order
//! never leaks into the history.

use crate::config::ExecutionParams;
use crate::ports::confirmation::ConfirmationResolver;
use crate::ports::progress::SessionProgressNotifier;
use crate::ports::sandbox::SandboxProvider;
use crate::use_cases::instance_manager::{InstanceError, InstanceManager};
use crate::use_cases::shared::{cancelled, is_cancelled};
use crate::use_cases::tool_helpers::tool_args_preview;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolpod_domain::{
    ArgumentValidator, Decision, DefaultArgumentValidator, PermissionMode, PermissionPolicy,
    ToolCallRequest, ToolDescriptor, ToolInstance, ToolRegistry, ToolResult,
};
use tracing::{debug, info, warn};

/// Outcome of gating one call.
enum Gate {
    Ready(Arc<ToolDescriptor>),
    Done(ToolResult),
}

/// Dispatches the tool calls of a turn to tool instances.
pub struct ToolDispatcher<P: SandboxProvider + ?Sized> {
    registry: Arc<ToolRegistry>,
    policy: Arc<PermissionPolicy>,
    instances: Arc<InstanceManager<P>>,
    params: ExecutionParams,
    validator: Arc<dyn ArgumentValidator>,
    confirmation: Option<Arc<dyn ConfirmationResolver>>,
    cancellation_token: Option<CancellationToken>,
}

impl<P: SandboxProvider + ?Sized> ToolDispatcher<P> {
    pub fn new(
        registry: Arc<ToolRegistry>,
        policy: Arc<PermissionPolicy>,
        instances: Arc<InstanceManager<P>>,
        params: ExecutionParams,
    ) -> Self {
        Self {
            registry,
            policy,
            instances,
            params,
            validator: Arc::new(DefaultArgumentValidator),
            confirmation: None,
            cancellation_token: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ArgumentValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Set the resolver consulted for `ConfirmRequired` decisions.
    pub fn with_confirmation(mut self, resolver: Arc<dyn ConfirmationResolver>) -> Self {
        self.confirmation = Some(resolver);
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Dispatch every call of one turn.
    ///
    /// The returned vector has one result per call, at the same position.
    pub async fn dispatch(
        &self,
        calls: &[ToolCallRequest],
        mode: PermissionMode,
        progress: &dyn SessionProgressNotifier,
    ) -> Vec<ToolResult> {
        let mut gates = Vec::with_capacity(calls.len());
        for call in calls {
            let gate = self.gate(call, mode).await;
            if let Gate::Done(result) = &gate {
                progress.on_tool_result(result);
            }
            gates.push(gate);
        }

        let mut results: Vec<Option<ToolResult>> = vec![None; calls.len()];
        let mut pending: Vec<(usize, Arc<ToolDescriptor>)> = Vec::new();
        for (index, gate) in gates.into_iter().enumerate() {
            match gate {
                Gate::Done(result) => results[index] = Some(result),
                Gate::Ready(descriptor) => pending.push((index, descriptor)),
            }
        }

        let mut cursor = 0;
        while cursor < pending.len() {
            let end = if pending[cursor].1.concurrency_safe {
                pending[cursor..]
                    .iter()
                    .position(|(_, d)| !d.concurrency_safe)
                    .map_or(pending.len(), |n| cursor + n)
            } else {
                cursor + 1
            };
            let batch = &pending[cursor..end];
            cursor = end;

            if batch.len() > 1 {
                debug!(size = batch.len(), fan_out = self.params.fan_out, "Running concurrent batch");
            }

            let outputs: Vec<(usize, ToolResult)> = futures::stream::iter(batch.iter().cloned())
                .map(|(index, descriptor)| async move {
                    (index, self.run_one(&calls[index], &descriptor, progress).await)
                })
                .buffered(self.params.fan_out.max(1))
                .collect()
                .await;

            for (index, result) in outputs {
                results[index] = Some(result);
            }
        }

        calls
            .iter()
            .zip(results)
            .map(|(call, result)| result.unwrap_or_else(|| ToolResult::cancelled(call)))
            .collect()
    }

    /// Lookup, permission and validation for one call.
    async fn gate(&self, call: &ToolCallRequest, mode: PermissionMode) -> Gate {
        let descriptor = match self.registry.describe(&call.tool_name) {
            Ok(descriptor) => descriptor,
            Err(_) => {
                warn!(tool = %call.tool_name, call_id = %call.call_id, "Model requested an unknown tool");
                return Gate::Done(ToolResult::unknown_tool(call));
            }
        };

        match self.policy.evaluate(&descriptor, mode) {
            Decision::Allow => {}
            Decision::Deny => {
                info!(tool = %call.tool_name, class = %descriptor.permission_class, "Permission denied");
                return Gate::Done(ToolResult::permission_denied(
                    call,
                    self.policy.denial_reason(&descriptor),
                ));
            }
            Decision::ConfirmRequired => {
                if let Some(result) = self.confirm(call).await {
                    return Gate::Done(result);
                }
            }
        }

        if let Err(reason) = self.validator.validate(call, &descriptor) {
            debug!(tool = %call.tool_name, %reason, "Rejected arguments");
            return Gate::Done(ToolResult::error(
                call,
                format!("invalid arguments for {}: {}", call.tool_name, reason),
            ));
        }

        Gate::Ready(descriptor)
    }

    /// Ask the resolver; `None` means approved.
    async fn confirm(&self, call: &ToolCallRequest) -> Option<ToolResult> {
        if is_cancelled(&self.cancellation_token) {
            return Some(ToolResult::cancelled(call));
        }
        let Some(resolver) = &self.confirmation else {
            return Some(ToolResult::permission_denied(
                call,
                format!("Tool {} requires confirmation and no confirmation resolver is configured", call.tool_name),
            ));
        };

        let approved = tokio::select! {
            biased;
            _ = cancelled(&self.cancellation_token) => return Some(ToolResult::cancelled(call)),
            approved = resolver.confirm(call) => approved,
        };

        if approved {
            debug!(tool = %call.tool_name, "Confirmed by user");
            None
        } else {
            info!(tool = %call.tool_name, "User declined tool call");
            Some(ToolResult::permission_denied(
                call,
                format!("User declined tool {}", call.tool_name),
            ))
        }
    }

    /// Acquire, execute and (unless session-scoped) release for one call.
    async fn run_one(
        &self,
        call: &ToolCallRequest,
        descriptor: &ToolDescriptor,
        progress: &dyn SessionProgressNotifier,
    ) -> ToolResult {
        if is_cancelled(&self.cancellation_token) {
            let result = ToolResult::cancelled(call);
            progress.on_tool_result(&result);
            return result;
        }

        progress.on_tool_call(call);
        debug!(
            tool = %call.tool_name,
            call_id = %call.call_id,
            args = %tool_args_preview(call),
            "Dispatching tool call"
        );

        let result = match self.acquire(call, descriptor).await {
            Ok(instance) => {
                let timeout = descriptor.timeout.unwrap_or(self.params.call_timeout);
                let token = self.cancellation_token.clone().unwrap_or_default();
                let result = self.instances.execute(&instance, call, timeout, &token).await;
                if !descriptor.session_scoped
                    && let Err(e) = self.instances.release(instance.id).await
                {
                    warn!(tool = %call.tool_name, instance = %instance.id, error = %e, "Release failed");
                }
                result
            }
            Err(result) => result,
        };

        progress.on_tool_result(&result);
        result
    }

    /// Acquire an instance, retrying creation failures with backoff.
    async fn acquire(
        &self,
        call: &ToolCallRequest,
        descriptor: &ToolDescriptor,
    ) -> Result<ToolInstance, ToolResult> {
        let mut attempt = 0;
        loop {
            match self.instances.acquire(descriptor).await {
                Ok(instance) => return Ok(instance),
                Err(e) if e.is_retryable() && attempt < self.params.acquire_retries => {
                    let backoff = self.params.backoff_for(attempt);
                    attempt += 1;
                    debug!(tool = %descriptor.name, attempt, ?backoff, "Retrying instance creation");
                    tokio::select! {
                        biased;
                        _ = cancelled(&self.cancellation_token) => return Err(ToolResult::cancelled(call)),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(InstanceError::Closed) => return Err(ToolResult::cancelled(call)),
                Err(e) => {
                    warn!(tool = %descriptor.name, attempts = attempt + 1, error = %e, "Could not acquire instance");
                    return Err(ToolResult::error(call, e.to_string()));
                }
            }
        }
    }
}
