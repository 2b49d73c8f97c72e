//! OpenAI-compatible chat completions client.
//!
//! Works with any server exposing `POST <base_url>/chat/completions` in the
//! OpenAI format (OpenAI itself, vLLM, Ollama, LM Studio, ...).
//!
//! # Message mapping
//!
//! | Conversation entry | Messages |
//! |--------------------|----------|
//! | (start) | `system` with the system prompt |
//! | `User` | `user`, context folded in front of the query |
//! | `Assistant` | `assistant` with `tool_calls` (arguments as JSON strings) |
//! | `ToolResults` | one `tool` message per result, keyed by `tool_call_id` |

use super::DEFAULT_SYSTEM_PROMPT;
use crate::config::FileModelConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use toolpod_application::{ModelClient, ModelClientError, ModelTurn};
use toolpod_domain::{ConversationEntry, ToolArguments, ToolCallRequest, ToolDescriptor};
use tracing::{debug, warn};

/// Model client for OpenAI-compatible endpoints.
pub struct OpenAiModelClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    system_prompt: String,
}

impl OpenAiModelClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, ModelClientError> {
        Self::with_timeout(base_url, model, Duration::from_secs(120))
    }

    fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelClientError::Other(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }

    /// Build from the `[model]` section. The API key is read from the
    /// environment variable named by `api_key_env`; when it is unset the
    /// request is sent without authorization (local servers).
    pub fn from_config(config: &FileModelConfig) -> Result<Self, ModelClientError> {
        let mut client = Self::with_timeout(
            &config.base_url,
            &config.model,
            Duration::from_secs(config.timeout_secs.max(1)),
        )?;
        client.temperature = config.temperature;
        client.max_tokens = config.max_tokens;
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => client.api_key = Some(key),
            _ => warn!(
                var = %config.api_key_env,
                "API key variable is not set; sending requests without authorization"
            ),
        }
        Ok(client)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(
        &self,
        history: &[ConversationEntry],
        schemas: &[Arc<ToolDescriptor>],
    ) -> ChatRequest {
        let tools: Vec<ChatTool> = schemas
            .iter()
            .map(|d| ChatTool {
                r#type: "function".to_string(),
                function: ChatFunction {
                    name: d.name.clone(),
                    description: d.model_description(),
                    parameters: d.input_schema(),
                },
            })
            .collect();

        ChatRequest {
            model: self.model.clone(),
            messages: build_messages(&self.system_prompt, history),
            tools: (!tools.is_empty()).then_some(tools),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn build_messages(system_prompt: &str, history: &[ConversationEntry]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::text("system", system_prompt)];
    for entry in history {
        match entry {
            ConversationEntry::User { .. } => {
                let text = entry.user_text().unwrap_or_default();
                messages.push(ChatMessage::text("user", text));
            }
            ConversationEntry::Assistant {
                content,
                tool_calls,
            } => {
                let calls: Vec<ChatToolCall> = tool_calls
                    .iter()
                    .map(|c| ChatToolCall {
                        id: c.call_id.clone(),
                        r#type: "function".to_string(),
                        function: ChatFunctionCall {
                            name: c.tool_name.clone(),
                            arguments: c.arguments.to_value().to_string(),
                        },
                    })
                    .collect();
                messages.push(ChatMessage {
                    role: "assistant".to_string(),
                    content: content.clone(),
                    tool_calls: (!calls.is_empty()).then_some(calls),
                    tool_call_id: None,
                });
            }
            ConversationEntry::ToolResults { results, .. } => {
                for r in results {
                    messages.push(ChatMessage {
                        role: "tool".to_string(),
                        content: Some(r.payload.clone()),
                        tool_calls: None,
                        tool_call_id: Some(r.call_id.clone()),
                    });
                }
            }
        }
    }
    messages
}

fn convert_response(response: ChatResponse) -> Result<ModelTurn, ModelClientError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelClientError::InvalidResponse("response has no choices".to_string()))?;
    let content = choice.message.content.filter(|c| !c.is_empty());

    let calls: Vec<ToolCallRequest> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let arguments = serde_json::from_str(&tc.function.arguments)
                .ok()
                .and_then(ToolArguments::from_value)
                .unwrap_or_else(|| {
                    warn!(
                        tool = %tc.function.name,
                        "Tool call arguments are not a JSON object; sending none"
                    );
                    ToolArguments::new()
                });
            ToolCallRequest::new(tc.id, tc.function.name).with_arguments(arguments)
        })
        .collect();

    if calls.is_empty() {
        Ok(ModelTurn::FinalAnswer(content.unwrap_or_default()))
    } else {
        Ok(ModelTurn::ToolCalls { content, calls })
    }
}

#[async_trait]
impl ModelClient for OpenAiModelClient {
    async fn send(
        &self,
        history: &[ConversationEntry],
        schemas: &[Arc<ToolDescriptor>],
    ) -> Result<ModelTurn, ModelClientError> {
        let request = self.build_request(history, schemas);
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, messages = request.messages.len(), "Sending chat request");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ModelClientError::ConnectionError(e.to_string())
            } else {
                ModelClientError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelClientError::RequestFailed(format!(
                "API error {}: {}",
                status,
                toolpod_domain::util::truncate_str(&body, 2000)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelClientError::InvalidResponse(e.to_string()))?;
        convert_response(parsed)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatTool {
    r#type: String,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ChatFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolpod_domain::{ContextBlob, PermissionClass, ToolParameter, ToolResult};

    #[test]
    fn test_messages_from_history() {
        let call = ToolCallRequest::new("c1", "read_file").with_arg("path", "a.rs");
        let history = vec![
            ConversationEntry::User {
                content: "what is a.rs?".to_string(),
                context: Some(ContextBlob::new().with_section("Git branch", "main")),
            },
            ConversationEntry::Assistant {
                content: None,
                tool_calls: vec![call.clone()],
            },
            ConversationEntry::ToolResults {
                turn_index: 0,
                results: vec![ToolResult::ok(&call, "fn main() {}")],
            },
        ];

        let messages = build_messages("sys", &history);
        let value = serde_json::to_value(&messages).unwrap();

        assert_eq!(value[0], json!({"role": "system", "content": "sys"}));
        assert_eq!(value[1]["role"], "user");
        let user = value[1]["content"].as_str().unwrap();
        assert!(user.starts_with("<context>\n## Git branch\nmain"));
        assert!(user.ends_with("what is a.rs?"));

        assert_eq!(value[2]["role"], "assistant");
        assert!(value[2]["content"].is_null());
        assert_eq!(value[2]["tool_calls"][0]["id"], "c1");
        assert_eq!(value[2]["tool_calls"][0]["function"]["name"], "read_file");
        let args: serde_json::Value =
            serde_json::from_str(value[2]["tool_calls"][0]["function"]["arguments"].as_str().unwrap())
                .unwrap();
        assert_eq!(args, json!({"path": "a.rs"}));

        assert_eq!(
            value[3],
            json!({"role": "tool", "content": "fn main() {}", "tool_call_id": "c1"})
        );
    }

    #[test]
    fn test_request_carries_tool_schemas() {
        let client = OpenAiModelClient::new("http://localhost:8080/v1/", "m").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");

        let tool = Arc::new(
            ToolDescriptor::new("read_file", "Read a file", PermissionClass::ReadOnly)
                .with_prompt_text("Use offset for large files.")
                .with_parameter(ToolParameter::new("path", "File path", true)),
        );
        let request = client.build_request(&[], &[tool]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "read_file");
        assert_eq!(
            value["tools"][0]["function"]["description"],
            "Read a file\n\nUse offset for large files."
        );
        assert_eq!(value["tools"][0]["function"]["parameters"]["required"], json!(["path"]));
        assert!(value.get("temperature").is_none());

        let empty = serde_json::to_value(client.build_request(&[], &[])).unwrap();
        assert!(empty.get("tools").is_none());
    }

    #[test]
    fn test_convert_tool_calls() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {
                "content": "",
                "tool_calls": [
                    {"id": "call_a", "type": "function",
                     "function": {"name": "grep_search", "arguments": "{\"pattern\":\"fn\"}"}},
                    {"id": "call_b", "type": "function",
                     "function": {"name": "think", "arguments": "not json"}}
                ]
            }}]
        }))
        .unwrap();

        match convert_response(response).unwrap() {
            ModelTurn::ToolCalls { content, calls } => {
                assert_eq!(content, None);
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].arguments.get_string("pattern"), Some("fn"));
                assert!(calls[1].arguments.is_empty());
            }
            other => panic!("unexpected turn: {:?}", other),
        }
    }

    #[test]
    fn test_convert_answer_and_empty() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "All done"}}]
        }))
        .unwrap();
        assert_eq!(convert_response(response).unwrap(), ModelTurn::answer("All done"));

        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            convert_response(response),
            Err(ModelClientError::InvalidResponse(_))
        ));
    }
}
