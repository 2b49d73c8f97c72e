//! Model client adapters
//!
//! - [`ScriptedModelClient`] replays turns from a JSON file (offline runs, tests)
//! - [`OpenAiModelClient`] talks to any OpenAI-compatible chat completions
//!   endpoint (feature `openai`)

#[cfg(feature = "openai")]
mod openai;
mod scripted;

#[cfg(feature = "openai")]
pub use openai::OpenAiModelClient;
pub use scripted::{ScriptedModelClient, ScriptedTurn};

/// System prompt sent ahead of the conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant that answers questions about a \
project by calling tools. Tools run inside a sandbox rooted at the project directory. Call \
tools when you need information or need to make a change, and answer in plain text once you \
have what you need. Tool results that start with 'Error:' describe a failed call; adjust and \
try again or explain the problem.";
