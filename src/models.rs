use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hyperlink from one page to another, as found in the markup.
/// `to_url` keeps the raw href; resolution against the page URL happens
/// wherever the link graph is actually consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub to_url: String,
    pub anchor_text: String,
}

/// Contact-like identifiers harvested from a page, each list deduplicated
/// in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub whatsapps: Vec<String>,
    pub x_handles: Vec<String>,
    pub linkedins: Vec<String>,
}

impl Contacts {
    /// Total number of identifiers across all five lists
    pub fn len(&self) -> usize {
        self.emails.len()
            + self.phones.len()
            + self.whatsapps.len()
            + self.x_handles.len()
            + self.linkedins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A successfully crawled page. Created once a fetch succeeded, produced
/// non-empty normalized text, and passed path-family admission; only the
/// `pagerank` field is written after that, once the crawl loop terminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Canonical URL of the page
    pub url: String,

    /// HTTP status code of the fetch that produced this page
    pub status_code: u16,

    /// When the page was admitted into the result
    pub fetched_at: DateTime<Utc>,

    /// Opaque ETag header value, "N/A" when absent
    pub etag: String,

    /// First <title> text, "x" when absent
    pub title: String,

    /// First <meta name="description"> content, "x" when absent
    pub description: String,

    /// Normalized main-body text
    pub text: String,

    /// Outgoing links in document order, deduplicated by raw href
    pub links: Vec<Link>,

    #[serde(flatten)]
    pub contacts: Contacts,

    /// Link-graph score, zero until scoring runs
    pub pagerank: f64,
}

/// The complete outcome of one crawl invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Registrable domain the crawl was bounded to
    pub domain: String,

    /// Stored pages, in completion order
    pub pages: Vec<Page>,

    pub total_pages: usize,

    /// When the crawl finished
    pub crawl_time: DateTime<Utc>,

    /// Number of fetches dropped after exhausting retries
    pub error_count: usize,

    /// Distinct page hosts under the domain that are not the apex, sorted
    pub subdomains: Vec<String>,
}
