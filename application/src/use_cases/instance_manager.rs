//! Instance manager: lifecycle of remote tool instances within a session.
//!
//! The manager is the only caller of the [`SandboxProvider`]. It owns every
//! [`ToolInstance`] the session creates and binds each one to the sandbox
//! handle behind it.
//!
//! # Concurrency
//!
//! The instance map sits behind one mutex that is never held across an
//! `.await`. Concurrent `execute` calls only touch their own entry, and each
//! entry is leased to at most one caller at a time, so an instance is never
//! shared by two in-flight calls.
//!
//! # Outcomes of `execute`
//!
//! | Outcome | Result status | Instance afterwards |
//! |---------|---------------|---------------------|
//! | success | Ok | Idle |
//! | remote error | Error | Idle |
//! | fatal remote error | Error | Failed (torn down) |
//! | timeout | Timeout | Failed (cancelled, torn down) |
//! | session cancelled | Cancelled | Failed (cancelled, torn down) |

use crate::ports::sandbox::{SandboxError, SandboxHandle, SandboxProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use toolpod_domain::{InstanceId, InstanceState, ToolCallRequest, ToolDescriptor, ToolInstance, ToolResult};
use tracing::{debug, info, warn};

/// Errors from instance management (not from the tools themselves)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("Instance creation failed for {tool}: {message}")]
    InstanceCreationFailed { tool: String, message: String },

    #[error("Unknown instance: {0}")]
    NotFound(InstanceId),

    #[error("Instance {id} is {state}, expected idle")]
    NotIdle { id: InstanceId, state: InstanceState },

    #[error("Teardown failed for instance {id}: {message}")]
    Teardown { id: InstanceId, message: String },

    #[error("Instance manager is closed")]
    Closed,
}

impl InstanceError {
    /// Provisioning failures may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InstanceError::InstanceCreationFailed { .. })
    }
}

/// Summary of [`InstanceManager::release_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub released: usize,
    pub failed: usize,
    /// Teardown calls that returned an error.
    pub errors: usize,
}

struct Slot {
    instance: ToolInstance,
    handle: Option<SandboxHandle>,
    leased: bool,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<InstanceId, Slot>,
    order: Vec<InstanceId>,
    closed: bool,
}

enum Outcome {
    Completed(Result<String, SandboxError>),
    TimedOut,
    Cancelled,
}

/// Owns the tool instances of one session.
pub struct InstanceManager<P: SandboxProvider + ?Sized> {
    provider: Arc<P>,
    inner: Mutex<Inner>,
}

impl<P: SandboxProvider + ?Sized> InstanceManager<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lease an instance for `tool`.
    ///
    /// Reuses an Idle, unleased instance of the same tool when one exists;
    /// otherwise provisions a new one. Provisioning is not retried here.
    pub async fn acquire(&self, tool: &ToolDescriptor) -> Result<ToolInstance, InstanceError> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(InstanceError::Closed);
            }
            let Inner { slots, order, .. } = &mut *inner;
            let reusable = order.iter().find(|id| {
                slots.get(*id).is_some_and(|s| {
                    !s.leased && s.instance.is_idle() && s.instance.tool_name == tool.name
                })
            });
            if let Some(id) = reusable.copied()
                && let Some(slot) = slots.get_mut(&id)
            {
                slot.leased = true;
                debug!(tool = %tool.name, instance = %id, "Reusing idle instance");
                return Ok(slot.instance.clone());
            }
        }

        let handle = self.provider.provision(tool).await.map_err(|e| {
            warn!(tool = %tool.name, error = %e, "Instance provisioning failed");
            InstanceError::InstanceCreationFailed {
                tool: tool.name.clone(),
                message: e.to_string(),
            }
        })?;

        let mut instance = ToolInstance::new(&tool.name);
        instance.mark_ready();

        let closed = {
            let mut inner = self.lock();
            if inner.closed {
                true
            } else {
                inner.order.push(instance.id);
                inner.slots.insert(
                    instance.id,
                    Slot {
                        instance: instance.clone(),
                        handle: Some(handle.clone()),
                        leased: true,
                    },
                );
                false
            }
        };

        if closed {
            // Session ended while provisioning; do not leak the new context.
            if let Err(e) = self.provider.teardown(&handle).await {
                warn!(handle = %handle, error = %e, "Teardown after close failed");
            }
            return Err(InstanceError::Closed);
        }

        info!(tool = %tool.name, instance = %instance.id, "Provisioned instance");
        Ok(instance)
    }

    /// Run `call` on a leased instance, bounded by `timeout` and `cancel`.
    ///
    /// Always produces a result for the call; the lease ends when this returns.
    pub async fn execute(
        &self,
        instance: &ToolInstance,
        call: &ToolCallRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let id = instance.id;
        let handle = {
            let mut inner = self.lock();
            let Some(slot) = inner.slots.get_mut(&id) else {
                return ToolResult::error(call, InstanceError::NotFound(id).to_string());
            };
            let state = slot.instance.state();
            match slot.handle.clone() {
                Some(handle) if slot.instance.mark_executing() => handle,
                _ => {
                    slot.leased = false;
                    return ToolResult::error(call, InstanceError::NotIdle { id, state }.to_string());
                }
            }
        };

        let started = Instant::now();
        let deadline = started + timeout;
        debug!(tool = %call.tool_name, call_id = %call.call_id, instance = %id, "Executing");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            r = tokio::time::timeout(timeout, self.provider.invoke(&handle, &call.arguments, deadline)) => {
                match r {
                    Ok(result) => Outcome::Completed(result),
                    Err(_) => Outcome::TimedOut,
                }
            }
        };

        let elapsed = started.elapsed();
        let result = match outcome {
            Outcome::Completed(Ok(output)) => {
                self.finish(id, false);
                ToolResult::ok(call, output)
            }
            Outcome::Completed(Err(e)) => {
                let fatal = e.is_fatal();
                warn!(tool = %call.tool_name, instance = %id, fatal, error = %e, "Tool reported an error");
                if fatal {
                    self.fail(id).await;
                } else {
                    self.finish(id, false);
                }
                ToolResult::error(call, e.to_string())
            }
            Outcome::TimedOut => {
                warn!(tool = %call.tool_name, instance = %id, ?timeout, "Tool call timed out");
                self.provider.cancel(&handle).await;
                self.fail(id).await;
                ToolResult::timeout(call, timeout)
            }
            Outcome::Cancelled => {
                debug!(tool = %call.tool_name, instance = %id, "Tool call cancelled");
                self.provider.cancel(&handle).await;
                self.fail(id).await;
                ToolResult::cancelled(call)
            }
        };

        result.with_duration(elapsed)
    }

    /// Return an instance to Idle (or Failed) and end its lease.
    fn finish(&self, id: InstanceId, failed: bool) -> Option<SandboxHandle> {
        let mut inner = self.lock();
        let slot = inner.slots.get_mut(&id)?;
        slot.leased = false;
        if failed {
            slot.instance.mark_failed();
            slot.handle.take()
        } else {
            slot.instance.mark_idle();
            None
        }
    }

    /// Mark an instance Failed and tear down its remote context.
    async fn fail(&self, id: InstanceId) {
        if let Some(handle) = self.finish(id, true)
            && let Err(e) = self.provider.teardown(&handle).await
        {
            warn!(instance = %id, error = %e, "Teardown of failed instance errored");
        }
    }

    /// Release one instance. Idempotent: releasing a Released or Failed
    /// instance only updates bookkeeping, and teardown happens at most once.
    pub async fn release(&self, id: InstanceId) -> Result<(), InstanceError> {
        let handle = {
            let mut inner = self.lock();
            let Some(slot) = inner.slots.get_mut(&id) else {
                return Err(InstanceError::NotFound(id));
            };
            slot.leased = false;
            if slot.instance.state() == InstanceState::Executing {
                slot.instance.mark_failed();
            } else {
                slot.instance.mark_released();
            }
            slot.handle.take()
        };

        match handle {
            Some(handle) => self.provider.teardown(&handle).await.map_err(|e| {
                InstanceError::Teardown {
                    id,
                    message: e.to_string(),
                }
            }),
            None => Ok(()),
        }
    }

    /// Release every instance at session teardown.
    ///
    /// Afterwards every instance is Released or Failed, no matter how many
    /// teardowns fail. Executing instances are marked Failed. The manager is
    /// closed: later `acquire` calls fail with [`InstanceError::Closed`].
    pub async fn release_all(&self) -> ReleaseReport {
        let pending: Vec<(InstanceId, SandboxHandle)> = {
            let mut inner = self.lock();
            inner.closed = true;
            let Inner { slots, order, .. } = &mut *inner;
            order
                .iter()
                .filter_map(|id| {
                    let slot = slots.get_mut(id)?;
                    slot.leased = false;
                    if slot.instance.state() == InstanceState::Executing {
                        slot.instance.mark_failed();
                    }
                    slot.handle.take().map(|h| (*id, h))
                })
                .collect()
        };

        let mut report = ReleaseReport::default();
        for (id, handle) in pending {
            let ok = match self.provider.teardown(&handle).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(instance = %id, handle = %handle, error = %e, "Release failed; continuing");
                    report.errors += 1;
                    false
                }
            };
            let mut inner = self.lock();
            if let Some(slot) = inner.slots.get_mut(&id) {
                if ok {
                    slot.instance.mark_released();
                } else {
                    slot.instance.mark_failed();
                }
            }
        }

        // Instances without a handle (created but never readied) still need a terminal state.
        let mut inner = self.lock();
        for slot in inner.slots.values_mut() {
            if !slot.instance.state().is_terminal() {
                slot.instance.mark_released();
            }
            match slot.instance.state() {
                InstanceState::Released => report.released += 1,
                _ => report.failed += 1,
            }
        }
        info!(
            released = report.released,
            failed = report.failed,
            errors = report.errors,
            "Released all instances"
        );
        report
    }

    /// Every instance ever created, in creation order.
    pub fn snapshot(&self) -> Vec<ToolInstance> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.slots.get(id).map(|s| s.instance.clone()))
            .collect()
    }

    /// Number of instances ever created for `tool`.
    pub fn count_for(&self, tool: &str) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|s| s.instance.tool_name == tool)
            .count()
    }

    pub fn state_of(&self, id: InstanceId) -> Option<InstanceState> {
        self.lock().slots.get(&id).map(|s| s.instance.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{MockSandbox, test_tool};
    use toolpod_domain::{PermissionClass, ToolResultStatus};

    fn manager(sandbox: &Arc<MockSandbox>) -> InstanceManager<MockSandbox> {
        InstanceManager::new(Arc::clone(sandbox))
    }

    fn call(tool: &str) -> ToolCallRequest {
        ToolCallRequest::new("call_0", tool)
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    // ==================== acquire ====================

    #[tokio::test]
    async fn test_acquire_provisions_idle_instance() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("ls", PermissionClass::ReadOnly, true);

        let inst = mgr.acquire(&tool).await.unwrap();
        assert_eq!(inst.state(), InstanceState::Idle);
        assert_eq!(inst.tool_name, "ls");
        assert_eq!(sandbox.provision_count(), 1);
    }

    #[tokio::test]
    async fn test_acquire_reuses_idle_instance() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("bash", PermissionClass::Dangerous, false).with_session_scoped(true);

        let first = mgr.acquire(&tool).await.unwrap();
        mgr.execute(&first, &call("bash"), TIMEOUT, &CancellationToken::new())
            .await;
        let second = mgr.acquire(&tool).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(sandbox.provision_count(), 1);
    }

    #[tokio::test]
    async fn test_leased_instance_is_not_handed_out_twice() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("grep", PermissionClass::ReadOnly, true);

        let a = mgr.acquire(&tool).await.unwrap();
        let b = mgr.acquire(&tool).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(mgr.count_for("grep"), 2);
    }

    #[tokio::test]
    async fn test_acquire_failure_is_not_retried() {
        let sandbox = Arc::new(MockSandbox::new().with_provision_failures("ls", 1));
        let mgr = manager(&sandbox);
        let tool = test_tool("ls", PermissionClass::ReadOnly, true);

        let err = mgr.acquire(&tool).await.unwrap_err();
        assert!(matches!(err, InstanceError::InstanceCreationFailed { .. }));
        assert!(err.is_retryable());
        assert_eq!(sandbox.provision_count(), 1);
        assert_eq!(mgr.count_for("ls"), 0);

        assert!(mgr.acquire(&tool).await.is_ok());
    }

    // ==================== execute ====================

    #[tokio::test]
    async fn test_execute_success_returns_to_idle() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("ls", PermissionClass::ReadOnly, true);

        let inst = mgr.acquire(&tool).await.unwrap();
        let result = mgr
            .execute(&inst, &call("ls").with_arg("echo", "a b"), TIMEOUT, &CancellationToken::new())
            .await;

        assert_eq!(result.status, ToolResultStatus::Ok);
        assert_eq!(result.payload, "ls:a b");
        assert!(result.duration_ms.is_some());
        assert_eq!(mgr.state_of(inst.id), Some(InstanceState::Idle));
    }

    #[tokio::test]
    async fn test_remote_error_keeps_instance_usable() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("grep", PermissionClass::ReadOnly, true);

        let inst = mgr.acquire(&tool).await.unwrap();
        let result = mgr
            .execute(&inst, &call("grep").with_arg("fail", "bad regex"), TIMEOUT, &CancellationToken::new())
            .await;

        assert_eq!(result.status, ToolResultStatus::Error);
        assert_eq!(result.payload, "Error: bad regex");
        assert_eq!(mgr.state_of(inst.id), Some(InstanceState::Idle));
        assert!(sandbox.teardowns().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_error_fails_instance() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("bash", PermissionClass::Dangerous, false).with_session_scoped(true);

        let inst = mgr.acquire(&tool).await.unwrap();
        let result = mgr
            .execute(&inst, &call("bash").with_arg("fatal", "shell died"), TIMEOUT, &CancellationToken::new())
            .await;

        assert_eq!(result.status, ToolResultStatus::Error);
        assert_eq!(mgr.state_of(inst.id), Some(InstanceState::Failed));
        assert_eq!(sandbox.teardowns().len(), 1);

        // Failed instance is never reused
        let next = mgr.acquire(&tool).await.unwrap();
        assert_ne!(next.id, inst.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_and_cancels_instance() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("bash", PermissionClass::Dangerous, false);

        let inst = mgr.acquire(&tool).await.unwrap();
        let result = mgr
            .execute(
                &inst,
                &call("bash").with_arg("delay_ms", 10_000),
                Duration::from_millis(100),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.status, ToolResultStatus::Timeout);
        assert_eq!(mgr.state_of(inst.id), Some(InstanceState::Failed));
        assert_eq!(sandbox.cancel_count(), 1);
        assert_eq!(sandbox.teardowns().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_cancellation_interrupts_call() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("bash", PermissionClass::Dangerous, false);
        let token = CancellationToken::new();

        let inst = mgr.acquire(&tool).await.unwrap();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel();
            })
        };
        let result = mgr
            .execute(&inst, &call("bash").with_arg("delay_ms", 10_000), TIMEOUT, &token)
            .await;
        canceller.await.unwrap();

        assert_eq!(result.status, ToolResultStatus::Cancelled);
        assert_eq!(mgr.state_of(inst.id), Some(InstanceState::Failed));
    }

    #[tokio::test]
    async fn test_execute_unknown_instance_yields_error_result() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let stray = ToolInstance::new("ls");

        let result = mgr
            .execute(&stray, &call("ls"), TIMEOUT, &CancellationToken::new())
            .await;
        assert_eq!(result.status, ToolResultStatus::Error);
        assert!(result.payload.contains("Unknown instance"));
    }

    // ==================== release ====================

    #[tokio::test]
    async fn test_double_release_tears_down_once() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("ls", PermissionClass::ReadOnly, true);

        let inst = mgr.acquire(&tool).await.unwrap();
        mgr.release(inst.id).await.unwrap();
        mgr.release(inst.id).await.unwrap();

        assert_eq!(sandbox.teardowns().len(), 1);
        assert_eq!(mgr.state_of(inst.id), Some(InstanceState::Released));
    }

    #[tokio::test]
    async fn test_release_failed_instance_is_noop() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("bash", PermissionClass::Dangerous, false);

        let inst = mgr.acquire(&tool).await.unwrap();
        mgr.execute(&inst, &call("bash").with_arg("fatal", "x"), TIMEOUT, &CancellationToken::new())
            .await;
        mgr.release(inst.id).await.unwrap();

        assert_eq!(mgr.state_of(inst.id), Some(InstanceState::Failed));
        assert_eq!(sandbox.teardowns().len(), 1);
    }

    #[tokio::test]
    async fn test_release_all_is_best_effort() {
        let sandbox = Arc::new(MockSandbox::new().with_failing_teardown());
        let mgr = manager(&sandbox);

        let a = mgr
            .acquire(&test_tool("ls", PermissionClass::ReadOnly, true))
            .await
            .unwrap();
        let b = mgr
            .acquire(&test_tool("grep", PermissionClass::ReadOnly, true))
            .await
            .unwrap();

        let report = mgr.release_all().await;

        assert_eq!(report.errors, 2);
        assert_eq!(sandbox.teardowns().len(), 2);
        for inst in mgr.snapshot() {
            assert!(inst.state().is_terminal(), "{} left {}", inst.id, inst.state());
        }
        assert_eq!(mgr.state_of(a.id), Some(InstanceState::Failed));
        assert_eq!(mgr.state_of(b.id), Some(InstanceState::Failed));
    }

    #[tokio::test]
    async fn test_release_all_closes_manager() {
        let sandbox = Arc::new(MockSandbox::new());
        let mgr = manager(&sandbox);
        let tool = test_tool("ls", PermissionClass::ReadOnly, true);

        mgr.acquire(&tool).await.unwrap();
        let report = mgr.release_all().await;
        assert_eq!(report.released, 1);
        assert_eq!(report.failed, 0);

        assert_eq!(mgr.acquire(&tool).await.unwrap_err(), InstanceError::Closed);
        assert_eq!(mgr.release_all().await.released, 1);
        assert_eq!(sandbox.teardowns().len(), 1);
    }
}
