//! Type definitions for the RunSession use case.

use crate::use_cases::instance_manager::ReleaseReport;
use toolpod_domain::{PermissionMode, Session, TerminationReason, ToolInstance};

/// Input for the RunSession use case
#[derive(Debug, Clone)]
pub struct RunSessionInput {
    /// The user's initial query
    pub query: String,
    pub mode: PermissionMode,
    /// Overrides the configured turn limit when set
    pub turn_limit: Option<usize>,
}

impl RunSessionInput {
    pub fn new(query: impl Into<String>, mode: PermissionMode) -> Self {
        Self {
            query: query.into(),
            mode,
            turn_limit: None,
        }
    }

    pub fn with_turn_limit(mut self, limit: usize) -> Self {
        self.turn_limit = Some(limit);
        self
    }
}

/// Output from the RunSession use case
#[derive(Debug, Clone)]
pub struct RunSessionOutput {
    pub reason: TerminationReason,
    /// Final conversation state
    pub session: Session,
    /// Every instance the session created, in creation order, after release
    pub instances: Vec<ToolInstance>,
    pub release: ReleaseReport,
}

impl RunSessionOutput {
    pub fn is_completed(&self) -> bool {
        self.reason.is_completed()
    }

    pub fn answer(&self) -> Option<&str> {
        self.reason.answer()
    }
}
