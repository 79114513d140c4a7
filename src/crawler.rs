//! The concurrent bounded crawl engine.
//!
//! One crawl owns: a visited set with atomic insert-if-absent semantics, a
//! semaphore capping in-flight fetches, a FIFO overflow frontier drained by
//! a background task, and per-path-family budgets guarded by a single
//! mutex. A cancellation token carries both the global deadline and the
//! all-work-done signal; whatever has been collected when it fires is the
//! result.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashSet;
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::CrawlerConfig;
use crate::extractor;
use crate::models::{CrawlResult, Page};
use crate::network::{build_limiter, DirectRateLimiter, FetchError, HttpClient};
use crate::robots::RobotsGate;
use crate::url_utils;

/// Construction-time failures; nothing else escapes the crawl.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("invalid start URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("start URL has no host")]
    MissingHost,

    #[error(transparent)]
    Client(#[from] FetchError),
}

/// Per-path-family bookkeeping, all behind one mutex so budget checks,
/// pacing, and appends cannot race.
#[derive(Default)]
struct PathState {
    counts: HashMap<String, usize>,
    delays: HashMap<String, Instant>,
    pages: HashMap<String, Vec<Page>>,
}

/// FIFO overflow buffer for URLs whose turn was deferred because every
/// worker permit was taken.
struct Frontier {
    queue: parking_lot::Mutex<VecDeque<(String, u32)>>,
    wakeup: Notify,
}

impl Frontier {
    fn new() -> Self {
        Self {
            queue: parking_lot::Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
        }
    }

    fn push(&self, url: String, depth: u32) {
        self.queue.lock().push_back((url, depth));
        self.wakeup.notify_one();
    }

    /// Tail re-insert without a wakeup; the drainer retries on its own timer
    fn requeue(&self, url: String, depth: u32) {
        self.queue.lock().push_back((url, depth));
    }

    fn pop(&self) -> Option<(String, u32)> {
        self.queue.lock().pop_front()
    }
}

/// Decrements the outstanding-work counter however the worker exits, and
/// fires the completion signal when the last unit finishes.
struct WorkGuard {
    outstanding: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.cancel.cancel();
        }
    }
}

/// Single-domain crawler. Clone is shallow; every clone drives the same
/// crawl state.
#[derive(Clone)]
pub struct Crawler {
    domain: String,
    start_url: Url,
    config: CrawlerConfig,
    http: Arc<HttpClient>,
    limiter: Arc<DirectRateLimiter>,
    robots: Arc<RobotsGate>,
    visited: Arc<DashSet<String>>,
    permits: Arc<Semaphore>,
    frontier: Arc<Frontier>,
    paths: Arc<Mutex<PathState>>,
    outstanding: Arc<AtomicUsize>,
    error_count: Arc<AtomicUsize>,
    cancel: CancellationToken,
    started: Arc<AtomicBool>,
}

impl Crawler {
    /// Validate the start URL, derive the registrable domain, and build the
    /// shared HTTP machinery. The only operation that can fail.
    pub fn new(start_url: &str, config: CrawlerConfig) -> Result<Self, CrawlError> {
        let parsed = Url::parse(start_url)?;
        let host = parsed.host_str().ok_or(CrawlError::MissingHost)?;
        let domain = url_utils::registrable_domain(host);

        let http = Arc::new(HttpClient::new(&config)?);
        let limiter = Arc::new(build_limiter(config.rate.per_second, config.rate.burst));
        let robots = Arc::new(RobotsGate::new(
            &parsed,
            config.robots_agent.clone(),
            Arc::clone(&http),
        ));
        let permits = Arc::new(Semaphore::new(config.inflight.cap));

        Ok(Self {
            domain,
            start_url: parsed,
            config,
            http,
            limiter,
            robots,
            visited: Arc::new(DashSet::new()),
            permits,
            frontier: Arc::new(Frontier::new()),
            paths: Arc::new(Mutex::new(PathState::default())),
            outstanding: Arc::new(AtomicUsize::new(0)),
            error_count: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
            started: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Registrable domain this crawl is bounded to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Replace the rate limit. Ignored once the crawl has started.
    pub fn set_rate_limit(&mut self, per_second: u32, burst: u32) {
        if self.started.load(Ordering::SeqCst) {
            tracing::warn!("set_rate_limit ignored: crawl already started");
            return;
        }
        self.config.rate.per_second = per_second;
        self.config.rate.burst = burst;
        self.limiter = Arc::new(build_limiter(per_second, burst));
    }

    /// Replace the user-agent pool. Ignored once the crawl has started.
    pub fn set_user_agent_pool(&mut self, pool: Vec<String>) {
        if self.started.load(Ordering::SeqCst) {
            tracing::warn!("set_user_agent_pool ignored: crawl already started");
            return;
        }
        self.config.user_agent_pool = pool;
        match HttpClient::new(&self.config) {
            Ok(client) => self.http = Arc::new(client),
            Err(e) => tracing::warn!(error = %e, "failed to rebuild HTTP client, keeping pool"),
        }
    }

    /// Run the crawl to completion: frontier drained or deadline expired.
    /// Infallible; callers inspect `total_pages` and `error_count`.
    #[tracing::instrument(skip(self), fields(start_url = %self.start_url, domain = %self.domain))]
    pub async fn crawl(self) -> CrawlResult {
        self.started.store(true, Ordering::SeqCst);
        tracing::info!(
            inflight_cap = self.config.inflight.cap,
            rate_per_second = self.config.rate.per_second,
            "crawl started"
        );

        let deadline = Duration::from_secs(self.config.deadline.seconds);
        let deadline_cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = deadline_cancel.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    tracing::info!("deadline reached, cancelling outstanding work");
                    deadline_cancel.cancel();
                }
            }
        });

        tokio::spawn(self.clone().drain_frontier());

        // Seed the crawl; the semaphore is fresh so this never blocks.
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => {
                let start = url_utils::canonicalize(&self.start_url);
                tokio::spawn(self.clone().crawl_page(start, 0, permit));
            }
            Err(_) => {
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                self.cancel.cancel();
            }
        }

        self.cancel.cancelled().await;

        let mut state = self.paths.lock().await;
        let pages: Vec<Page> = state.pages.drain().flat_map(|(_, pages)| pages).collect();
        drop(state);

        let subdomains: BTreeSet<String> = pages
            .iter()
            .filter_map(|p| Url::parse(&p.url).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .filter(|host| *host != self.domain)
            .collect();

        let result = CrawlResult {
            domain: self.domain.clone(),
            total_pages: pages.len(),
            pages,
            crawl_time: Utc::now(),
            error_count: self.error_count.load(Ordering::SeqCst),
            subdomains: subdomains.into_iter().collect(),
        };

        tracing::info!(
            total_pages = result.total_pages,
            error_count = result.error_count,
            "crawl finished"
        );
        result
    }

    /// One URL through the pipeline: robots gate, dedup, fetch, extract,
    /// path-family admission, outlink fan-out.
    async fn crawl_page(self, url: String, depth: u32, permit: OwnedSemaphorePermit) {
        let _permit = permit;
        let _guard = WorkGuard {
            outstanding: Arc::clone(&self.outstanding),
            cancel: self.cancel.clone(),
        };

        if self.cancel.is_cancelled() {
            return;
        }

        if !self.robots.is_allowed(&url).await {
            tracing::info!(%url, "skipped: disallowed by robots.txt");
            return;
        }

        if !self.visited.insert(url.clone()) {
            tracing::debug!(%url, "skipped: already visited");
            return;
        }

        let Ok(page_url) = Url::parse(&url) else {
            return;
        };

        let fetched = match self.http.fetch(&self.cancel, &self.limiter, &url).await {
            Ok(fetched) => fetched,
            Err(FetchError::Cancelled) => return,
            Err(e) if e.is_filtered() => {
                tracing::info!(%url, reason = %e, "skipped");
                return;
            }
            Err(e) => {
                self.error_count.fetch_add(1, Ordering::SeqCst);
                tracing::info!(%url, error = %e, "dropped after retries");
                return;
            }
        };

        let extracted = extractor::extract(&fetched.body, &page_url);
        let family = url_utils::path_family(&page_url);

        {
            let mut state = self.paths.lock().await;

            let over_family_budget =
                state.counts.get(&family).copied().unwrap_or(0) >= self.config.max_per_path;
            let over_type_budget = !state.counts.contains_key(&family)
                && state.counts.len() >= self.config.max_path_types;
            if over_family_budget || over_type_budget {
                tracing::info!(%url, %family, "skipped: path budget reached");
                return;
            }

            // Per-family pacing happens inside the lock: admissions for one
            // family are serialized and spaced.
            let spacing = Duration::from_millis(self.config.path_family_delay_ms);
            if let Some(last) = state.delays.get(&family) {
                let since = last.elapsed();
                if since < spacing {
                    tokio::time::sleep(spacing - since).await;
                }
            }
            state.delays.insert(family.clone(), Instant::now());

            if extracted.text.is_empty() {
                tracing::debug!(%url, "skipped: no extractable text");
            } else {
                let page = Page {
                    url: url.clone(),
                    status_code: fetched.status,
                    fetched_at: Utc::now(),
                    etag: fetched.etag,
                    title: extracted.title,
                    description: extracted.description,
                    text: extracted.text,
                    links: extracted.links.clone(),
                    contacts: extracted.contacts,
                    pagerank: 0.0,
                };
                state.pages.entry(family.clone()).or_default().push(page);
                *state.counts.entry(family.clone()).or_insert(0) += 1;
                tracing::info!(%url, depth, %family, "crawled");
            }
        }

        for link in &extracted.links {
            let Some(resolved) = url_utils::resolve(&page_url, &link.to_url) else {
                continue;
            };
            if !url_utils::is_webpage_url(&resolved) {
                continue;
            }
            if resolved.host_str().is_none() {
                continue;
            }
            if !url_utils::same_domain(&resolved, &self.domain) {
                // External URLs stay in the stored link list but are never
                // enqueued.
                continue;
            }
            self.enqueue(url_utils::canonicalize(&resolved), depth + 1);
        }
    }

    /// Hand a URL to a worker if a permit is free, otherwise defer it onto
    /// the frontier.
    fn enqueue(&self, url: String, depth: u32) {
        if self.cancel.is_cancelled() || self.visited.contains(&url) {
            return;
        }

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                tokio::spawn(self.clone().crawl_page(url, depth, permit));
            }
            Err(_) => {
                tracing::debug!(%url, "queued: all permits busy");
                self.frontier.push(url, depth);
            }
        }
    }

    /// Background task feeding deferred URLs back into the worker pool.
    async fn drain_frontier(self) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            let Some((url, depth)) = self.frontier.pop() else {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = self.frontier.wakeup.notified() => {}
                }
                continue;
            };

            match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => {
                    tokio::spawn(self.clone().crawl_page(url, depth, permit));
                }
                Err(_) => {
                    self.frontier.requeue(url, depth);
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                    }
                }
            }
        }
    }
}
