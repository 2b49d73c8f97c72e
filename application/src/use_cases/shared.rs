//! Shared utilities for use cases.
//!
//! Cancellation helpers used by the session loop and the tool dispatcher.

use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
pub(crate) fn is_cancelled(token: &Option<CancellationToken>) -> bool {
    token.as_ref().is_some_and(|t| t.is_cancelled())
}

/// Resolve when `token` is cancelled; never resolves without a token.
///
/// Meant for the cancel branch of a `tokio::select!`.
pub(crate) async fn cancelled(token: &Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
