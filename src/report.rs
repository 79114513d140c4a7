//! Plain-text rendering of stored crawl data.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use url::Url;

use crate::models::Page;
use crate::url_utils;

const TOP_PAGES: usize = 10;
const TOP_TARGETS: usize = 10;

/// Render a human-readable summary of a stored page set for a domain.
pub fn render(pages: &[Page], domain: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Crawl report for {}", domain);
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "Pages stored:        {}", pages.len());

    let with_title = pages.iter().filter(|p| p.title != "x").count();
    let with_description = pages.iter().filter(|p| p.description != "x").count();
    let with_contacts = pages.iter().filter(|p| !p.contacts.is_empty()).count();
    let _ = writeln!(out, "With <title>:        {}", with_title);
    let _ = writeln!(out, "With description:    {}", with_description);
    let _ = writeln!(out, "With contact info:   {}", with_contacts);

    let emails: usize = pages.iter().map(|p| p.contacts.emails.len()).sum();
    let phones: usize = pages.iter().map(|p| p.contacts.phones.len()).sum();
    let _ = writeln!(out, "Emails / phones:     {} / {}", emails, phones);

    let targets = most_linked_targets(pages);
    if !targets.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Most-linked targets:");
        for (target, count) in targets.into_iter().take(TOP_TARGETS) {
            let _ = writeln!(out, "  {:>4}  {}", count, target);
        }
    }

    let scored = pages.iter().any(|p| p.pagerank > 0.0);
    if scored {
        let mut ranked: Vec<&Page> = pages.iter().collect();
        ranked.sort_by(|a, b| {
            b.pagerank
                .partial_cmp(&a.pagerank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let _ = writeln!(out);
        let _ = writeln!(out, "Top pages by PageRank:");
        for page in ranked.iter().take(TOP_PAGES) {
            let _ = writeln!(out, "  {:.6}  {}  ({})", page.pagerank, page.url, page.title);
        }
    } else {
        let _ = writeln!(out);
        let _ = writeln!(out, "Pages are unscored; run `analyze` to compute PageRank.");
    }

    out
}

/// Targets tallied by distinct linking pages, descending count with ties
/// broken by ascending URL. Fragment links are dropped.
fn most_linked_targets(pages: &[Page]) -> Vec<(String, usize)> {
    let mut inbound: HashMap<String, HashSet<&str>> = HashMap::new();
    for page in pages {
        let Ok(base) = Url::parse(&page.url) else {
            continue;
        };
        for link in &page.links {
            let Some(resolved) = url_utils::resolve(&base, &link.to_url) else {
                continue;
            };
            let abs = resolved.to_string();
            if abs.contains('#') {
                continue;
            }
            inbound.entry(abs).or_default().insert(page.url.as_str());
        }
    }

    let mut targets: Vec<(String, usize)> = inbound
        .into_iter()
        .map(|(target, sources)| (target, sources.len()))
        .collect();
    targets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    targets
}
