//! robots.txt gate: fetched once per crawl, cached, fail-open.

use robotstxt::DefaultMatcher;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

use crate::network::HttpClient;

/// Answers allow/deny per URL against the site's robots.txt.
///
/// The ruleset is fetched on first use and cached for the lifetime of the
/// crawl. Any fetch failure or non-200 response means every URL is allowed.
pub struct RobotsGate {
    robots_url: String,
    agent: String,
    http: Arc<HttpClient>,
    rules: OnceCell<Option<String>>,
}

impl RobotsGate {
    /// Build a gate for the origin of the start URL. The scheme, host, and
    /// port are kept as-is so crawls against non-default ports work.
    pub fn new(start_url: &Url, agent: impl Into<String>, http: Arc<HttpClient>) -> Self {
        let mut robots_url = start_url.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        Self {
            robots_url: robots_url.to_string(),
            agent: agent.into(),
            http,
            rules: OnceCell::new(),
        }
    }

    pub async fn is_allowed(&self, url: &str) -> bool {
        let rules = self
            .rules
            .get_or_init(|| async {
                let body = self.http.fetch_text(&self.robots_url).await;
                match &body {
                    Some(_) => tracing::debug!(url = %self.robots_url, "robots.txt loaded"),
                    None => {
                        tracing::debug!(url = %self.robots_url, "robots.txt unavailable, allowing all")
                    }
                }
                body
            })
            .await;

        match rules {
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, &self.agent, url)
            }
            None => true,
        }
    }
}
