// src/source/reddit.rs
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::source::{ContentSource, Item};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const BATCH_LIMIT: u32 = 100;

// Refresh this long before the token actually expires.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// Fetches `/r/{subreddit}/new` through Reddit's application-only OAuth
/// flow. The app token is cached and refreshed shortly before expiry.
pub struct RedditSource {
    client: Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    subreddit: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

// Wire shape of a listing: { data: { children: [ { data: {...} } ] } }
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}
#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}
#[derive(Debug, Deserialize)]
struct Child {
    data: Submission,
}
#[derive(Debug, Deserialize)]
struct Submission {
    id: String,
    score: i64,
    title: String,
    url: String,
}

impl RedditSource {
    pub fn new(
        client_id: String,
        client_secret: String,
        user_agent: String,
        subreddit: String,
    ) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            user_agent,
            subreddit,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(tok) = cached.as_ref() {
            if Instant::now() < tok.expires_at {
                return Ok(tok.access_token.clone());
            }
        }

        tracing::debug!(subreddit = %self.subreddit, "requesting reddit app token");
        let rsp: TokenResponse = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("requesting reddit token")?
            .error_for_status()
            .context("reddit token endpoint refused")?
            .json()
            .await
            .context("parsing reddit token response")?;

        let ttl = Duration::from_secs(rsp.expires_in).saturating_sub(TOKEN_EXPIRY_SLACK);
        *cached = Some(CachedToken {
            access_token: rsp.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(rsp.access_token)
    }

    fn items_from_listing(body: &str) -> Result<Vec<Item>> {
        let listing: Listing =
            serde_json::from_str(body).context("parsing reddit listing json")?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|c| Item {
                id: c.data.id,
                score: c.data.score,
                title: c.data.title,
                url: c.data.url,
            })
            .collect())
    }
}

#[async_trait]
impl ContentSource for RedditSource {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        let token = self.access_token().await?;
        let url = format!("{API_BASE}/r/{}/new", self.subreddit);
        let body = self
            .client
            .get(&url)
            .query(&[("limit", BATCH_LIMIT)])
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .with_context(|| format!("fetching /r/{}/new", self.subreddit))?
            .error_for_status()
            .context("reddit listing endpoint refused")?
            .text()
            .await
            .context("reading reddit listing body")?;

        Self::items_from_listing(&body)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
