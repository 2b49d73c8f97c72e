//! Model client configuration from TOML (`[model]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use toolpod_domain::{ConfigIssue, ConfigIssueCode};

/// Which model client to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelProviderKind {
    /// OpenAI-compatible chat completions endpoint
    #[default]
    OpenAi,
    /// Replays a JSON script of turns
    Scripted,
}

impl ModelProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProviderKind::OpenAi => "openai",
            ModelProviderKind::Scripted => "scripted",
        }
    }
}

impl std::str::FromStr for ModelProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(ModelProviderKind::OpenAi),
            "scripted" | "script" => Ok(ModelProviderKind::Scripted),
            _ => Err(format!("Invalid model provider: {}", s)),
        }
    }
}

/// Raw model configuration from TOML
///
/// # Example
///
/// ```toml
/// [model]
/// provider = "openai"
/// base_url = "http://localhost:11434/v1"
/// model = "qwen2.5-coder"
/// api_key_env = "OPENAI_API_KEY"
/// temperature = 0.2
/// max_tokens = 4096
/// ```
///
/// With `provider = "scripted"`, `script` names a JSON file of turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    pub script: Option<PathBuf>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProviderKind::default().as_str().to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            script: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: 120,
        }
    }
}

impl FileModelConfig {
    pub fn parse_provider(&self) -> (ModelProviderKind, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let kind = match self.provider.parse::<ModelProviderKind>() {
            Ok(kind) => kind,
            Err(_) => {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "model.provider".to_string(),
                        value: self.provider.clone(),
                        valid_values: vec!["openai".to_string(), "scripted".to_string()],
                    },
                    format!(
                        "model.provider: unknown value '{}', falling back to 'openai'",
                        self.provider
                    ),
                ));
                ModelProviderKind::default()
            }
        };

        if kind == ModelProviderKind::Scripted && self.script.is_none() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "model.script".to_string(),
                    value: String::new(),
                },
                "model.script is required when model.provider = 'scripted'",
            ));
        }
        if kind == ModelProviderKind::OpenAi && self.model.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "model.model".to_string(),
                    value: self.model.clone(),
                },
                "model.model must not be empty",
            ));
        }

        (kind, issues)
    }
}
