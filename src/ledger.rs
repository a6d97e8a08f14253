// src/ledger.rs
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Durable record of post ids that have already been relayed.
///
/// The whole set is rewritten as a JSON array on every `record` and fsynced
/// before returning, so a crash after `record` can never re-notify that id.
/// A crash between a successful delivery and the flush may cause at most one
/// duplicate on restart. Full rewrite is O(n) per write; fine for the
/// expected few thousand ids, a scaling limit beyond that.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    ids: HashSet<String>,
}

impl Ledger {
    /// Load the ledger from `path`. Never fails: a missing file is a first
    /// run, an unparseable file is discarded. Both cases start empty —
    /// re-notifying old posts beats silently dropping new ones.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(list) => list.into_iter().collect(),
                Err(e) => {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "ledger file is not a JSON string array, starting with an empty set"
                    );
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "ledger file not found, starting with an empty set"
                );
                HashSet::new()
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "ledger file unreadable, starting with an empty set"
                );
                HashSet::new()
            }
        };
        Self { path, ids }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add `id` and rewrite the backing file, forcing the write to stable
    /// storage before returning. An IO failure here threatens the
    /// at-most-once guarantee and must reach the caller.
    pub fn record(&mut self, id: &str) -> Result<()> {
        self.ids.insert(id.to_string());
        let body = serde_json::to_vec(&self.ids).context("serializing ledger")?;
        let mut file = fs::File::create(&self.path)
            .with_context(|| format!("creating ledger file {}", self.path.display()))?;
        file.write_all(&body)
            .with_context(|| format!("writing ledger file {}", self.path.display()))?;
        file.flush().context("flushing ledger file")?;
        file.sync_all().context("syncing ledger file")?;
        Ok(())
    }
}
