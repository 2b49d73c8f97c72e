//! Session domain.
//!
//! - [`entities::Session`]: append-only conversation owned by one run
//! - [`entities::ConversationEntry`]: user, assistant and tool-result entries
//! - [`state::OrchestratorState`]: the tool-calling loop's states
//! - [`state::TerminationReason`]: why a run ended

pub mod entities;
pub mod state;

pub use entities::{ContextBlob, ContextSection, ConversationEntry, Session, SessionId};
pub use state::{OrchestratorState, TerminationReason};
