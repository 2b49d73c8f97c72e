//! Scripted model client: replays a fixed sequence of turns.
//!
//! Script format (JSON array, one element per model turn):
//!
//! ```json
//! [
//!   {"tool_calls": [{"id": "c1", "name": "read_file", "arguments": {"path": "README.md"}}]},
//!   {"answer": "The README describes a CLI."}
//! ]
//! ```
//!
//! A turn may carry `content` alongside `tool_calls`. Running past the end of
//! the script is reported as [`ModelClientError::ScriptExhausted`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use toolpod_application::{ModelClient, ModelClientError, ModelTurn};
use toolpod_domain::{ConversationEntry, ToolArguments, ToolCallRequest, ToolDescriptor};
use tracing::debug;

/// One scripted turn as written in the script file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptedTurn {
    Answer {
        answer: String,
    },
    Calls {
        #[serde(default)]
        content: Option<String>,
        tool_calls: Vec<ScriptedCall>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ScriptedTurn {
    fn into_model_turn(self) -> Result<ModelTurn, ModelClientError> {
        match self {
            ScriptedTurn::Answer { answer } => Ok(ModelTurn::FinalAnswer(answer)),
            ScriptedTurn::Calls {
                content,
                tool_calls,
            } => {
                let calls = tool_calls
                    .into_iter()
                    .map(|c| {
                        let arguments = match c.arguments {
                            Value::Null => ToolArguments::new(),
                            other => ToolArguments::from_value(other).ok_or_else(|| {
                                ModelClientError::InvalidResponse(format!(
                                    "arguments for '{}' must be a JSON object",
                                    c.name
                                ))
                            })?,
                        };
                        Ok(ToolCallRequest::new(c.id, c.name).with_arguments(arguments))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ModelTurn::ToolCalls { content, calls })
            }
        }
    }
}

/// Model client that returns pre-recorded turns in order.
pub struct ScriptedModelClient {
    turns: Mutex<VecDeque<ModelTurn>>,
    served: Mutex<usize>,
    /// Schema names seen on each request, for inspection
    seen_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedModelClient {
    pub fn new(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            served: Mutex::new(0),
            seen_tools: Mutex::new(Vec::new()),
        }
    }

    /// Parse a script from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ModelClientError> {
        let raw: Vec<ScriptedTurn> = serde_json::from_str(text)
            .map_err(|e| ModelClientError::InvalidResponse(format!("Invalid model script: {}", e)))?;
        let turns = raw
            .into_iter()
            .map(ScriptedTurn::into_model_turn)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(turns))
    }

    /// Load a script file.
    pub fn from_file(path: &Path) -> Result<Self, ModelClientError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ModelClientError::Other(format!("Failed to read model script {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn remaining(&self) -> usize {
        self.turns.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Tool names offered on each request so far.
    pub fn seen_tools(&self) -> Vec<Vec<String>> {
        self.seen_tools.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn send(
        &self,
        history: &[ConversationEntry],
        schemas: &[Arc<ToolDescriptor>],
    ) -> Result<ModelTurn, ModelClientError> {
        self.seen_tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(schemas.iter().map(|d| d.name.clone()).collect());

        let mut served = self.served.lock().unwrap_or_else(|e| e.into_inner());
        let next = self.turns.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(turn) => {
                *served += 1;
                debug!(turn = *served, history = history.len(), "Replaying scripted turn");
                Ok(turn)
            }
            None => Err(ModelClientError::ScriptExhausted(*served)),
        }
    }
}
