//! Orchestrator state machine values.
//!
//! ```text
//! AwaitingModel ──> DispatchingTools ──> AwaitingToolResults ──┐
//!      ▲                                                        │
//!      └────────────────────────────────────────────────────────┘
//!      │
//!      └──> Terminated(Completed | TurnLimitExceeded | Fatal | Cancelled)
//! ```

use serde::{Deserialize, Serialize};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model produced a final answer with no tool calls.
    Completed { answer: String },
    TurnLimitExceeded { limit: usize },
    /// Model-client failure or another orchestration-level error.
    Fatal { message: String },
    Cancelled,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Completed { .. } => "completed",
            TerminationReason::TurnLimitExceeded { .. } => "turn_limit_exceeded",
            TerminationReason::Fatal { .. } => "fatal",
            TerminationReason::Cancelled => "cancelled",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TerminationReason::Completed { .. })
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            TerminationReason::Completed { answer } => Some(answer),
            _ => None,
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Completed { .. } => write!(f, "completed"),
            TerminationReason::TurnLimitExceeded { limit } => {
                write!(f, "turn limit exceeded ({} turns)", limit)
            }
            TerminationReason::Fatal { message } => write!(f, "fatal: {}", message),
            TerminationReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// State of the orchestration loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    AwaitingModel,
    DispatchingTools,
    AwaitingToolResults,
    Terminated(TerminationReason),
}

impl OrchestratorState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, OrchestratorState::Terminated(_))
    }

    /// Whether `next` is an edge of the state diagram above.
    pub fn can_transition_to(&self, next: &OrchestratorState) -> bool {
        use OrchestratorState::*;
        matches!(
            (self, next),
            (AwaitingModel, DispatchingTools)
                | (AwaitingModel, Terminated(_))
                | (DispatchingTools, AwaitingToolResults)
                | (AwaitingToolResults, AwaitingModel)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorState::AwaitingModel => "awaiting_model",
            OrchestratorState::DispatchingTools => "dispatching_tools",
            OrchestratorState::AwaitingToolResults => "awaiting_tool_results",
            OrchestratorState::Terminated(_) => "terminated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_accessors() {
        let done = TerminationReason::Completed {
            answer: "42".to_string(),
        };
        assert!(done.is_completed());
        assert_eq!(done.answer(), Some("42"));
        assert_eq!(TerminationReason::Cancelled.answer(), None);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            TerminationReason::TurnLimitExceeded { limit: 5 }.to_string(),
            "turn limit exceeded (5 turns)"
        );
        assert_eq!(
            TerminationReason::Fatal {
                message: "model down".to_string()
            }
            .to_string(),
            "fatal: model down"
        );
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_value(TerminationReason::TurnLimitExceeded { limit: 3 }).unwrap();
        assert_eq!(json["reason"], "turn_limit_exceeded");
        assert_eq!(json["limit"], 3);
    }

    #[test]
    fn test_state_terminated() {
        assert!(OrchestratorState::Terminated(TerminationReason::Cancelled).is_terminated());
        assert!(!OrchestratorState::AwaitingModel.is_terminated());
        assert_eq!(OrchestratorState::DispatchingTools.as_str(), "dispatching_tools");
    }

    #[test]
    fn test_state_transitions_follow_diagram() {
        use OrchestratorState::*;
        let done = Terminated(TerminationReason::Cancelled);
        assert!(AwaitingModel.can_transition_to(&DispatchingTools));
        assert!(AwaitingModel.can_transition_to(&done));
        assert!(DispatchingTools.can_transition_to(&AwaitingToolResults));
        assert!(AwaitingToolResults.can_transition_to(&AwaitingModel));

        assert!(!DispatchingTools.can_transition_to(&AwaitingModel));
        assert!(!AwaitingToolResults.can_transition_to(&done));
        assert!(!done.can_transition_to(&AwaitingModel));
    }
}
