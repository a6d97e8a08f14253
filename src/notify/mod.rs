// src/notify/mod.rs
pub mod discord;

use anyhow::Result;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one already-formatted message. Implementations own their
    /// retry behavior; `Err` means delivery definitively failed.
    async fn send(&self, content: &str) -> Result<()>;
}
