//! Confirmation port for calls that need user approval.
//!
//! [`PermissionPolicy`](toolpod_domain::PermissionPolicy) returns
//! `ConfirmRequired` for mutating tools in interactive mode. The orchestrator
//! resolves that through a [`ConfirmationResolver`]; when none is configured
//! the call is denied.
//!
//! # Built-in Implementations
//!
//! - [`AutoApproveConfirmation`] - Always approves
//! - [`AutoDenyConfirmation`] - Always declines
//!
//! For terminal prompts, see `StdinConfirmation` in the infrastructure layer.

use async_trait::async_trait;
use toolpod_domain::ToolCallRequest;

/// Resolves a single confirmation request.
///
/// Calls within a turn are confirmed one at a time, in request order.
#[async_trait]
pub trait ConfirmationResolver: Send + Sync {
    /// Return `true` to let the call proceed.
    async fn confirm(&self, request: &ToolCallRequest) -> bool;
}

/// Approves every request.
pub struct AutoApproveConfirmation;

#[async_trait]
impl ConfirmationResolver for AutoApproveConfirmation {
    async fn confirm(&self, _request: &ToolCallRequest) -> bool {
        true
    }
}

/// Declines every request.
pub struct AutoDenyConfirmation;

#[async_trait]
impl ConfirmationResolver for AutoDenyConfirmation {
    async fn confirm(&self, _request: &ToolCallRequest) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_resolvers() {
        let call = ToolCallRequest::new("c", "write_file");
        assert!(AutoApproveConfirmation.confirm(&call).await);
        assert!(!AutoDenyConfirmation.confirm(&call).await);
    }
}
