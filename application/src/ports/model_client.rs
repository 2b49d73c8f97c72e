//! Model client port
//!
//! Defines how the orchestrator talks to the language model. Prompt
//! formatting, token accounting and transport live in the adapter.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use toolpod_domain::{ConversationEntry, ToolCallRequest, ToolDescriptor};

/// Errors that can occur while asking the model for its next turn
#[derive(Error, Debug)]
pub enum ModelClientError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model script exhausted after {0} turns")]
    ScriptExhausted(usize),

    #[error("Other error: {0}")]
    Other(String),
}

/// The model's reply for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// Natural-language answer with no tool calls; ends the session.
    FinalAnswer(String),
    /// One or more tool calls, optionally with accompanying text.
    ///
    /// `turn_index` and duplicate or empty `call_id`s are normalized by the
    /// orchestrator.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
}

impl ModelTurn {
    pub fn answer(text: impl Into<String>) -> Self {
        ModelTurn::FinalAnswer(text.into())
    }

    pub fn calls(calls: Vec<ToolCallRequest>) -> Self {
        ModelTurn::ToolCalls {
            content: None,
            calls,
        }
    }
}

/// Client for the language model.
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the conversation so far plus the enabled tool schemas.
    async fn send(
        &self,
        history: &[ConversationEntry],
        schemas: &[Arc<ToolDescriptor>],
    ) -> Result<ModelTurn, ModelClientError>;
}
