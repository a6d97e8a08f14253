// src/config.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_LEDGER_PATH: &str = "posted_ids.json";

/// Immutable process configuration, read once from the environment at
/// startup. A missing required variable is fatal.
#[derive(Debug, Clone)]
pub struct Config {
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    pub subreddit: String,
    pub webhook_url: String,
    /// Delay between the end of one cycle and the start of the next.
    pub sleep_time: Duration,
    pub minimum_score: i64,
    pub ledger_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            reddit_client_id: require("REDDIT_CLIENT_ID")?,
            reddit_client_secret: require("REDDIT_CLIENT_SECRET")?,
            reddit_user_agent: require("REDDIT_USER_AGENT")?,
            subreddit: require("SUBREDDIT")?,
            webhook_url: require("WEBHOOK_URL")?,
            sleep_time: Duration::from_secs(parse(&require("SLEEP_TIME")?, "SLEEP_TIME")?),
            minimum_score: parse(&require("MINIMUM_SCORE")?, "MINIMUM_SCORE")?,
            ledger_path: env::var("LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LEDGER_PATH)),
        })
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow!("missing environment variable: {name}"))
}

fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be an integer, got {value:?}"))
}
