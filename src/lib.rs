// src/lib.rs
// Public library surface for integration tests (and the relay binary).

pub mod config;
pub mod ledger;
pub mod notify;
pub mod relay;
pub mod retry;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::ledger::Ledger;
pub use crate::notify::{discord::DiscordNotifier, Notifier};
pub use crate::relay::{format_message, is_eligible, Relay};
pub use crate::retry::RetryPolicy;
pub use crate::source::{reddit::RedditSource, ContentSource, Item};
