//! Run Session use case
//!
//! Drives the multi-turn tool-calling loop for one query:
//!
//! | State | Action | Next |
//! |-------|--------|------|
//! | AwaitingModel | send history + enabled schemas | Terminated(Completed) or DispatchingTools |
//! | DispatchingTools | gate and run every call of the turn | AwaitingToolResults |
//! | AwaitingToolResults | fold results into history in request order | AwaitingModel |
//!
//! The turn limit, model-client failures and caller cancellation end the
//! session. Per-call failures never do: they come back as tool results.
//! Every path out of the loop releases all instances before returning.

mod types;

pub use types::{RunSessionInput, RunSessionOutput};

use crate::config::ExecutionParams;
use crate::ports::confirmation::ConfirmationResolver;
use crate::ports::context_seeder::ContextSeeder;
use crate::ports::model_client::{ModelClient, ModelTurn};
use crate::ports::progress::{NoSessionProgress, SessionProgressNotifier};
use crate::ports::sandbox::SandboxProvider;
use crate::ports::transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger};
use crate::use_cases::dispatch_tools::ToolDispatcher;
use crate::use_cases::instance_manager::InstanceManager;
use crate::use_cases::shared::{cancelled, is_cancelled};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolpod_domain::{
    ArgumentValidator, ConversationEntry, DefaultArgumentValidator, OrchestratorState,
    PermissionPolicy, Session, TerminationReason, ToolCallRequest, ToolDescriptor, ToolRegistry,
    ToolResult,
};
use tracing::{debug, info, warn};

/// Use case for running one tool-calling session
pub struct RunSessionUseCase<M: ModelClient + ?Sized, P: SandboxProvider + ?Sized> {
    model: Arc<M>,
    provider: Arc<P>,
    registry: Arc<ToolRegistry>,
    policy: Arc<PermissionPolicy>,
    params: ExecutionParams,
    validator: Arc<dyn ArgumentValidator>,
    confirmation: Option<Arc<dyn ConfirmationResolver>>,
    context_seeder: Option<Arc<dyn ContextSeeder>>,
    transcript: Arc<dyn TranscriptLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl<M: ModelClient + ?Sized, P: SandboxProvider + ?Sized> Clone for RunSessionUseCase<M, P> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            provider: self.provider.clone(),
            registry: self.registry.clone(),
            policy: self.policy.clone(),
            params: self.params.clone(),
            validator: self.validator.clone(),
            confirmation: self.confirmation.clone(),
            context_seeder: self.context_seeder.clone(),
            transcript: self.transcript.clone(),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

impl<M: ModelClient + ?Sized, P: SandboxProvider + ?Sized> RunSessionUseCase<M, P> {
    pub fn new(model: Arc<M>, provider: Arc<P>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            provider,
            registry,
            policy: Arc::new(PermissionPolicy::new()),
            params: ExecutionParams::default(),
            validator: Arc::new(DefaultArgumentValidator),
            confirmation: None,
            context_seeder: None,
            transcript: Arc::new(NoTranscriptLogger),
            cancellation_token: None,
        }
    }

    pub fn with_policy(mut self, policy: PermissionPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ArgumentValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Set the resolver consulted when a call needs user confirmation.
    ///
    /// Without one, every `ConfirmRequired` decision is treated as a denial.
    pub fn with_confirmation(mut self, resolver: Arc<dyn ConfirmationResolver>) -> Self {
        self.confirmation = Some(resolver);
        self
    }

    pub fn with_context_seeder(mut self, seeder: Arc<dyn ContextSeeder>) -> Self {
        self.context_seeder = Some(seeder);
        self
    }

    pub fn with_transcript_logger(mut self, logger: Arc<dyn TranscriptLogger>) -> Self {
        self.transcript = logger;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    /// Run the session without progress reporting.
    pub async fn execute(&self, input: RunSessionInput) -> RunSessionOutput {
        self.execute_with_progress(input, &NoSessionProgress).await
    }

    /// Run the session to termination.
    ///
    /// Always returns an output: failures that end the session are reported
    /// through [`RunSessionOutput::reason`].
    pub async fn execute_with_progress(
        &self,
        input: RunSessionInput,
        progress: &dyn SessionProgressNotifier,
    ) -> RunSessionOutput {
        let mut session = Session::new(input.mode);
        let limit = input.turn_limit.unwrap_or(self.params.turn_limit);

        info!(
            session = %session.id(),
            mode = %input.mode,
            turn_limit = limit,
            tools = self.registry.list_schemas().len(),
            "Starting session"
        );
        self.transcript.log(TranscriptEvent::new(
            "session_start",
            serde_json::json!({
                "session_id": session.id().to_string(),
                "query": input.query,
                "mode": input.mode.as_str(),
                "turn_limit": limit,
            }),
        ));

        let instances = Arc::new(InstanceManager::new(self.provider.clone()));
        let mut dispatcher = ToolDispatcher::new(
            self.registry.clone(),
            self.policy.clone(),
            instances.clone(),
            self.params.clone(),
        )
        .with_validator(self.validator.clone());
        if let Some(resolver) = &self.confirmation {
            dispatcher = dispatcher.with_confirmation(resolver.clone());
        }
        if let Some(token) = &self.cancellation_token {
            dispatcher = dispatcher.with_cancellation(token.clone());
        }

        let reason = self
            .run_loop(&mut session, &input.query, limit, &dispatcher, progress)
            .await;

        // Cleanup runs on every path out of the loop
        let release = instances.release_all().await;
        let instances = instances.snapshot();

        match &reason {
            TerminationReason::Completed { .. } => info!(turns = session.turns(), "Session completed"),
            other => warn!(turns = session.turns(), reason = %other, "Session ended early"),
        }
        self.transcript.log(TranscriptEvent::new(
            "session_end",
            serde_json::json!({
                "session_id": session.id().to_string(),
                "termination": reason,
                "turns": session.turns(),
                "tool_calls": session.tool_call_count(),
                "instances": instances.len(),
                "release_errors": release.errors,
            }),
        ));
        progress.on_terminated(&reason);

        RunSessionOutput {
            reason,
            session,
            instances,
            release,
        }
    }

    async fn run_loop(
        &self,
        session: &mut Session,
        query: &str,
        limit: usize,
        dispatcher: &ToolDispatcher<P>,
        progress: &dyn SessionProgressNotifier,
    ) -> TerminationReason {
        let context = match &self.context_seeder {
            Some(seeder) => tokio::select! {
                biased;
                _ = cancelled(&self.cancellation_token) => return TerminationReason::Cancelled,
                blob = seeder.collect() => Some(blob),
            },
            None => None,
        };
        session.seed(query, context);

        let schemas = self.registry.list_schemas();
        let mut state = OrchestratorState::AwaitingModel;
        let mut turn = 0;
        let mut pending: Vec<ToolCallRequest> = Vec::new();
        let mut results: Vec<ToolResult> = Vec::new();

        loop {
            let next = match &state {
                OrchestratorState::Terminated(reason) => return reason.clone(),
                OrchestratorState::AwaitingModel => {
                    if is_cancelled(&self.cancellation_token) {
                        OrchestratorState::Terminated(TerminationReason::Cancelled)
                    } else if session.turns() >= limit {
                        OrchestratorState::Terminated(TerminationReason::TurnLimitExceeded { limit })
                    } else {
                        turn = session.begin_turn();
                        progress.on_turn_start(turn);
                        debug!(turn, "Requesting model turn");
                        self.await_model(session, turn, &schemas, &mut pending).await
                    }
                }
                OrchestratorState::DispatchingTools => {
                    progress.on_tool_calls(turn, &pending);
                    for call in &pending {
                        self.transcript.log(TranscriptEvent::new(
                            "tool_call",
                            serde_json::json!({
                                "turn": turn,
                                "call_id": call.call_id,
                                "tool": call.tool_name,
                                "arguments": call.arguments,
                            }),
                        ));
                    }
                    results = dispatcher.dispatch(&pending, session.mode(), progress).await;
                    OrchestratorState::AwaitingToolResults
                }
                OrchestratorState::AwaitingToolResults => {
                    for result in &results {
                        self.transcript.log(TranscriptEvent::new(
                            "tool_result",
                            serde_json::json!({
                                "turn": turn,
                                "call_id": result.call_id,
                                "tool": result.tool_name,
                                "status": result.status,
                                "duration_ms": result.duration_ms,
                                "bytes": result.payload.len(),
                            }),
                        ));
                    }
                    pending.clear();
                    session.append(ConversationEntry::ToolResults {
                        turn_index: turn,
                        results: std::mem::take(&mut results),
                    });
                    OrchestratorState::AwaitingModel
                }
            };
            debug_assert!(state.can_transition_to(&next));
            debug!(turn, from = state.as_str(), to = next.as_str(), "State transition");
            state = next;
        }
    }

    /// Send one model request and fold the reply into the history.
    ///
    /// Tool calls land in `pending` and move the loop to `DispatchingTools`;
    /// a reply without calls completes the session.
    async fn await_model(
        &self,
        session: &mut Session,
        turn: usize,
        schemas: &[Arc<ToolDescriptor>],
        pending: &mut Vec<ToolCallRequest>,
    ) -> OrchestratorState {
        let reply = tokio::select! {
            biased;
            _ = cancelled(&self.cancellation_token) => {
                return OrchestratorState::Terminated(TerminationReason::Cancelled);
            }
            reply = self.model.send(session.history(), schemas) => reply,
        };

        let (content, calls) = match reply {
            Ok(ModelTurn::FinalAnswer(answer)) => (Some(answer), Vec::new()),
            Ok(ModelTurn::ToolCalls { content, calls }) => (content, calls),
            Err(e) => {
                warn!(turn, error = %e, "Model client failed");
                return OrchestratorState::Terminated(TerminationReason::Fatal {
                    message: e.to_string(),
                });
            }
        };

        // A turn without tool calls is a final answer
        if calls.is_empty() {
            let answer = content.unwrap_or_default();
            self.transcript.log(TranscriptEvent::new(
                "model_turn",
                serde_json::json!({ "turn": turn, "answer": answer }),
            ));
            session.append(ConversationEntry::Assistant {
                content: Some(answer.clone()),
                tool_calls: Vec::new(),
            });
            return OrchestratorState::Terminated(TerminationReason::Completed { answer });
        }

        let calls = normalize_calls(turn, calls);
        self.transcript.log(TranscriptEvent::new(
            "model_turn",
            serde_json::json!({ "turn": turn, "content": content, "tool_calls": calls.len() }),
        ));
        session.append(ConversationEntry::Assistant {
            content,
            tool_calls: calls.clone(),
        });
        *pending = calls;
        OrchestratorState::DispatchingTools
    }
}

/// Stamp the turn index on every call and make call ids unique.
///
/// The first occurrence of each non-empty id is kept. Empty or repeated ids
/// get `call_<turn>_<index>`, suffixed with `_1`, `_2`, ... while that name
/// is already taken by another call of the turn.
fn normalize_calls(turn: usize, calls: Vec<ToolCallRequest>) -> Vec<ToolCallRequest> {
    let mut taken: HashSet<String> = HashSet::new();
    let keep: Vec<bool> = calls
        .iter()
        .map(|call| !call.call_id.is_empty() && taken.insert(call.call_id.clone()))
        .collect();

    calls
        .into_iter()
        .zip(keep)
        .enumerate()
        .map(|(index, (mut call, keep))| {
            call.turn_index = turn;
            if !keep {
                let base = format!("call_{}_{}", turn, index);
                let mut fresh = base.clone();
                let mut suffix = 0;
                while taken.contains(&fresh) {
                    suffix += 1;
                    fresh = format!("{}_{}", base, suffix);
                }
                debug!(original = %call.call_id, %fresh, "Reassigned call id");
                taken.insert(fresh.clone());
                call.call_id = fresh;
            }
            call
        })
        .collect()
}
