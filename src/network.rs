//! HTTP fetching: shared client, token-bucket rate limiting, retries with
//! backoff, user-agent rotation, content-type filtering, and the anti-bot
//! body sniff.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::CrawlerConfig;

pub type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Build the shared token-bucket limiter
pub fn build_limiter(per_second: u32, burst: u32) -> DirectRateLimiter {
    let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst))
}

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// MIME types accepted as crawlable markup (matched before any ';' parameter)
const WEBPAGE_MIMES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "application/xhtml",
    "text/xml",
    "application/xml",
];

/// Body substrings that mark a bot-challenge page
const ANTI_BOT_MARKERS: &[&str] = &["cf-browser-verification", "Access denied"];

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("non-webpage content type: {0:?}")]
    ContentType(String),

    #[error("anti-bot challenge detected")]
    AntiBot,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("crawl cancelled")]
    Cancelled,
}

impl FetchError {
    /// Filtered responses are policy skips, not fetch failures
    pub fn is_filtered(&self) -> bool {
        matches!(self, FetchError::ContentType(_) | FetchError::AntiBot)
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return FetchError::Timeout;
        }
        if error.is_connect() {
            return FetchError::Network(format!("connection failed: {}", error));
        }
        FetchError::Network(error.to_string())
    }
}

/// A buffered successful response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: String,
    /// ETag header, "N/A" when absent
    pub etag: String,
    pub body: String,
}

/// Shared HTTP client with a keep-alive connection pool and a cookie jar.
/// Cheap to clone; safe for concurrent use.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    user_agent_pool: Vec<String>,
    request_timeout: Duration,
    retries: u32,
}

impl HttpClient {
    pub fn new(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            user_agent_pool: config.user_agent_pool.clone(),
            request_timeout: Duration::from_secs(config.fetch.request_timeout_secs),
            retries: config.fetch.retries.max(1),
        })
    }

    /// Fetch a URL under the shared rate limiter, retrying transient
    /// failures with exponential backoff. Jitter runs before the limiter
    /// slot is taken so inter-request spacing stays governed by the bucket.
    pub async fn fetch(
        &self,
        cancel: &CancellationToken,
        limiter: &DirectRateLimiter,
        url: &str,
    ) -> Result<FetchedPage, FetchError> {
        let jitter = {
            let mut rng = rand::thread_rng();
            Duration::from_millis(rng.gen_range(50..=200))
        };
        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(jitter) => {}
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = limiter.until_ready() => {}
        }

        let mut last = FetchError::Timeout;
        for attempt in 1..=self.retries {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            match self.attempt(cancel, url).await {
                Ok(page) => return Ok(page),
                Err(
                    e @ (FetchError::ContentType(_) | FetchError::AntiBot | FetchError::Cancelled),
                ) => return Err(e),
                Err(e) => {
                    tracing::debug!(%url, attempt, error = %e, "fetch attempt failed");
                    last = e;
                }
            }
            if attempt < self.retries {
                let backoff = Duration::from_millis(100 * (1 << (attempt - 1)));
                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
        Err(last)
    }

    async fn attempt(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<FetchedPage, FetchError> {
        let user_agent = self
            .user_agent_pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();

        let request = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .header(header::CONNECTION, "keep-alive");

        let work = async {
            let response = request.send().await.map_err(FetchError::from_reqwest)?;
            let status = response.status().as_u16();
            if status != 200 {
                return Err(FetchError::Status(status));
            }
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let etag = response
                .headers()
                .get(header::ETAG)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("N/A")
                .to_string();
            let body = response
                .text()
                .await
                .map_err(|e| FetchError::Body(e.to_string()))?;
            Ok(FetchedPage {
                status,
                content_type,
                etag,
                body,
            })
        };

        let page = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = tokio::time::timeout(self.request_timeout, work) => match result {
                Ok(inner) => inner?,
                Err(_) => return Err(FetchError::Timeout),
            },
        };

        if !is_webpage_mime(&page.content_type) {
            return Err(FetchError::ContentType(page.content_type));
        }
        if ANTI_BOT_MARKERS.iter().any(|m| page.body.contains(m)) {
            return Err(FetchError::AntiBot);
        }
        Ok(page)
    }

    /// Plain GET used for robots.txt: no limiter, no retries, 200-or-nothing
    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if response.status().as_u16() != 200 {
            return None;
        }
        response.text().await.ok()
    }
}

fn is_webpage_mime(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    WEBPAGE_MIMES.contains(&mime.as_str())
}
