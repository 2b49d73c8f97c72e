//! Context seeder port
//!
//! Collects project context (VCS state, directory layout, docs) once per
//! session. The orchestrator folds the result into the first conversation
//! entry. Collection never fails; missing pieces are simply omitted.

use async_trait::async_trait;
use toolpod_domain::ContextBlob;

#[async_trait]
pub trait ContextSeeder: Send + Sync {
    async fn collect(&self) -> ContextBlob;
}

/// Seeds nothing.
pub struct NoContextSeeder;

#[async_trait]
impl ContextSeeder for NoContextSeeder {
    async fn collect(&self) -> ContextBlob {
        ContextBlob::new()
    }
}
