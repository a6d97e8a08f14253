// src/notify/discord.rs
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::watch;

use super::Notifier;
use crate::retry::{retry_async, RetryPolicy};

/// Posts messages to a Discord webhook as the `content` form field.
/// Success is any 2xx; anything else is classified and retried under the
/// policy (default 3 attempts, 2s doubling backoff, 60s cap). With a
/// shutdown receiver attached, backoff waits end early on cancellation.
#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    shutdown: Option<watch::Receiver<bool>>,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            shutdown: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, content: &str) -> Result<()> {
        tracing::info!(bytes = content.len(), "posting to discord webhook");
        retry_async(self.retry, "discord webhook", self.shutdown.clone(), || {
            let req = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .form(&[("content", content)]);
            async move {
                let rsp = req
                    .send()
                    .await
                    .map_err(|e| anyhow!("Discord webhook request failed: {e}"))?;
                let status = rsp.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(anyhow!("Discord webhook refused: {}", status_reason(status)))
                }
            }
        })
        .await
    }
}

/// Human-readable reason for a non-2xx webhook response. A few statuses get
/// specific wording; the rest share a generic one.
fn status_reason(status: StatusCode) -> String {
    match status.as_u16() {
        403 => "403 Forbidden: the request was valid, but the server is refusing action"
            .to_string(),
        404 => "404 Not Found: the requested resource could not be found on the server"
            .to_string(),
        other => format!("{other}: an error occurred with the request"),
    }
}
