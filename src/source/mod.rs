// src/source/mod.rs
pub mod reddit;

use anyhow::Result;

/// One post from the content source. Snapshots are fetched fresh every
/// cycle (`score` is mutable upstream); only `id` is ever persisted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub score: i64,
    pub title: String,
    pub url: String,
}

#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// Up to one batch of the most recent items, newest first.
    async fn fetch_latest(&self) -> Result<Vec<Item>>;
    fn name(&self) -> &'static str;
}
