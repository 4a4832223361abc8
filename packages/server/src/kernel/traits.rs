// Trait definitions for dependency injection
//
// Infrastructure only. Domain stores have their own traits next to their
// models; these cover the outbound side channels.
//
// Naming convention: Base* for trait names (e.g., BaseNotifier)

use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Notifier Trait (Infrastructure - outbound mail)
// =============================================================================

#[async_trait]
pub trait BaseNotifier: Send + Sync {
    /// Deliver a message to a single address.
    ///
    /// Callers treat failures as non-fatal; implementations should not retry.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}
