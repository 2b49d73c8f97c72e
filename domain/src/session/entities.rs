//! Session domain entities

use crate::permission::policy::PermissionMode;
use crate::tool::call::ToolCallRequest;
use crate::tool::result::ToolResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One titled piece of project context (VCS status, layout, docs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSection {
    pub title: String,
    pub body: String,
}

/// Context collected once at session start and folded into the first entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlob {
    pub sections: Vec<ContextSection>,
}

impl ContextBlob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push(ContextSection {
            title: title.into(),
            body: body.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Render as markdown-style sections.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("## {}\n{}", s.title, s.body.trim_end()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// One entry of the append-only conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationEntry {
    User {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<ContextBlob>,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    /// Results of one turn, in request order.
    ToolResults {
        turn_index: usize,
        results: Vec<ToolResult>,
    },
}

impl ConversationEntry {
    /// Text of a user entry with its context prepended, as sent to the model.
    pub fn user_text(&self) -> Option<String> {
        match self {
            ConversationEntry::User {
                content,
                context: Some(ctx),
            } if !ctx.is_empty() => Some(format!(
                "<context>\n{}\n</context>\n\n{}",
                ctx.render(),
                content
            )),
            ConversationEntry::User { content, .. } => Some(content.clone()),
            _ => None,
        }
    }
}

/// Unique identifier of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation state owned by one orchestration run.
///
/// History is append-only; entries are never edited or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    mode: PermissionMode,
    history: Vec<ConversationEntry>,
    turns: usize,
}

impl Session {
    pub fn new(mode: PermissionMode) -> Self {
        Self {
            id: SessionId::new(),
            mode,
            history: Vec::new(),
            turns: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> PermissionMode {
        self.mode
    }

    pub fn history(&self) -> &[ConversationEntry] {
        &self.history
    }

    /// Number of model round trips started so far.
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Start the next model round trip and return its zero-based index.
    pub fn begin_turn(&mut self) -> usize {
        let index = self.turns;
        self.turns += 1;
        index
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.history.push(entry);
    }

    /// Seed the first entry with the initial query and collected context.
    pub fn seed(&mut self, query: impl Into<String>, context: Option<ContextBlob>) {
        self.append(ConversationEntry::User {
            content: query.into(),
            context: context.filter(|c| !c.is_empty()),
        });
    }

    /// Total tool calls requested across all turns.
    pub fn tool_call_count(&self) -> usize {
        self.history
            .iter()
            .map(|e| match e {
                ConversationEntry::Assistant { tool_calls, .. } => tool_calls.len(),
                _ => 0,
            })
            .sum()
    }

    /// Total tool results folded back across all turns.
    pub fn tool_result_count(&self) -> usize {
        self.history
            .iter()
            .map(|e| match e {
                ConversationEntry::ToolResults { results, .. } => results.len(),
                _ => 0,
            })
            .sum()
    }
}
