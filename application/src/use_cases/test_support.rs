//! Test doubles shared by the use case tests.
//!
//! [`MockSandbox`] is driven by call arguments:
//!
//! | Argument | Effect |
//! |----------|--------|
//! | `delay_ms` | sleep before answering |
//! | `fail` | non-fatal invocation error with that message |
//! | `fatal` | fatal invocation error with that message |
//! | `echo` | output is `<tool>:<echo>` |
//! | `tag` | recorded in completion order |

use crate::ports::model_client::{ModelClient, ModelClientError, ModelTurn};
use crate::ports::progress::SessionProgressNotifier;
use crate::ports::sandbox::{SandboxError, SandboxHandle, SandboxProvider};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use toolpod_domain::{
    ConversationEntry, PermissionClass, TerminationReason, ToolArguments, ToolCallRequest,
    ToolDescriptor, ToolParameter, ToolResult,
};

pub(crate) fn test_tool(name: &str, class: PermissionClass, concurrency_safe: bool) -> ToolDescriptor {
    ToolDescriptor::new(name, format!("{} tool", name), class).with_concurrency_safe(concurrency_safe)
}

/// Descriptor with the optional mock-control parameters declared.
pub(crate) fn mock_tool(name: &str, class: PermissionClass, concurrency_safe: bool) -> ToolDescriptor {
    use toolpod_domain::ParamType;
    test_tool(name, class, concurrency_safe)
        .with_parameter(ToolParameter::new("delay_ms", "Delay", false).with_type(ParamType::Integer))
        .with_parameter(ToolParameter::new("fail", "Fail with message", false))
        .with_parameter(ToolParameter::new("fatal", "Fail fatally", false))
        .with_parameter(ToolParameter::new("echo", "Echo text", false))
        .with_parameter(ToolParameter::new("tag", "Completion tag", false))
}

#[derive(Default)]
pub(crate) struct MockSandbox {
    next_id: AtomicUsize,
    provisions: AtomicUsize,
    cancels: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    provision_failures: Mutex<HashMap<String, usize>>,
    teardowns: Mutex<Vec<String>>,
    completions: Mutex<Vec<String>>,
    failing_teardown: bool,
}

impl MockSandbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` provisions of `tool`.
    pub(crate) fn with_provision_failures(self, tool: &str, count: usize) -> Self {
        self.provision_failures
            .lock()
            .unwrap()
            .insert(tool.to_string(), count);
        self
    }

    pub(crate) fn with_failing_teardown(mut self) -> Self {
        self.failing_teardown = true;
        self
    }

    pub(crate) fn provision_count(&self) -> usize {
        self.provisions.load(Ordering::SeqCst)
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn teardowns(&self) -> Vec<String> {
        self.teardowns.lock().unwrap().clone()
    }

    pub(crate) fn completions(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SandboxProvider for MockSandbox {
    async fn provision(&self, tool: &ToolDescriptor) -> Result<SandboxHandle, SandboxError> {
        self.provisions.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = self.provision_failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&tool.name)
                && *left > 0
            {
                *left -= 1;
                return Err(SandboxError::Provision {
                    tool: tool.name.clone(),
                    message: "no capacity".to_string(),
                });
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(SandboxHandle::new(format!("h{}", id), &tool.name))
    }

    async fn invoke(
        &self,
        handle: &SandboxHandle,
        arguments: &ToolArguments,
        _deadline: Instant,
    ) -> Result<String, SandboxError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(ms) = arguments.get_i64("delay_ms") {
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        }
        if let Some(tag) = arguments.get_string("tag") {
            self.completions.lock().unwrap().push(tag.to_string());
        }
        if let Some(msg) = arguments.get_string("fatal") {
            return Err(SandboxError::fatal(msg));
        }
        if let Some(msg) = arguments.get_string("fail") {
            return Err(SandboxError::invocation(msg));
        }
        let echo = arguments.get_string("echo").unwrap_or("done");
        Ok(format!("{}:{}", handle.tool_name, echo))
    }

    async fn cancel(&self, _handle: &SandboxHandle) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    async fn teardown(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.teardowns.lock().unwrap().push(handle.id.clone());
        if self.failing_teardown {
            return Err(SandboxError::Teardown(format!("{} unreachable", handle)));
        }
        Ok(())
    }
}

/// Model that replays a fixed list of turns, then errors.
pub(crate) struct ScriptedModel {
    turns: Mutex<VecDeque<Result<ModelTurn, String>>>,
    served: AtomicUsize,
    /// Number of history entries seen on each call.
    pub(crate) seen: Mutex<Vec<usize>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub(crate) fn new(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().map(Ok).collect()),
            served: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Append a failing turn after the scripted ones.
    pub(crate) fn then_fail(self, message: &str) -> Self {
        self.turns.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls_made(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn send(
        &self,
        history: &[ConversationEntry],
        _schemas: &[Arc<ToolDescriptor>],
    ) -> Result<ModelTurn, ModelClientError> {
        let served = self.served.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(history.len());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.turns.lock().unwrap().pop_front();
        match next {
            Some(Ok(turn)) => Ok(turn),
            Some(Err(message)) => Err(ModelClientError::RequestFailed(message)),
            None => Err(ModelClientError::ScriptExhausted(served)),
        }
    }
}

/// Records progress callbacks.
#[derive(Default)]
pub(crate) struct RecordingProgress {
    pub(crate) events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionProgressNotifier for RecordingProgress {
    fn on_turn_start(&self, turn: usize) {
        self.events.lock().unwrap().push(format!("turn:{}", turn));
    }

    fn on_tool_call(&self, call: &ToolCallRequest) {
        self.events
            .lock()
            .unwrap()
            .push(format!("call:{}", call.call_id));
    }

    fn on_tool_result(&self, result: &ToolResult) {
        self.events
            .lock()
            .unwrap()
            .push(format!("result:{}:{}", result.call_id, result.status));
    }

    fn on_terminated(&self, reason: &TerminationReason) {
        self.events
            .lock()
            .unwrap()
            .push(format!("end:{}", reason.as_str()));
    }
}
