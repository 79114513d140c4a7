//! PageRank over the crawled link graph.
//!
//! Adjacency is built lazily from the stored raw hrefs: each link is
//! resolved against its page's URL and only edges landing on crawled pages
//! enter the graph. Pages with no in-graph outlinks are dangling; their
//! mass is redistributed uniformly each iteration, which keeps the scores
//! a probability distribution.

use std::collections::HashMap;
use url::Url;

use crate::models::CrawlResult;
use crate::url_utils;

const DAMPING: f64 = 0.85;
const ITERATIONS: usize = 100;

/// Compute PageRank and write the score back onto each page in place.
/// Never fails; an empty result is left untouched.
pub fn score(result: &mut CrawlResult) {
    let n = result.pages.len();
    if n == 0 {
        return;
    }

    let index: HashMap<&str, usize> = result
        .pages
        .iter()
        .enumerate()
        .map(|(i, page)| (page.url.as_str(), i))
        .collect();

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, page) in result.pages.iter().enumerate() {
        let Ok(base) = Url::parse(&page.url) else {
            continue;
        };
        for link in &page.links {
            if let Some(resolved) = url_utils::resolve(&base, &link.to_url) {
                if let Some(&j) = index.get(url_utils::canonicalize(&resolved).as_str()) {
                    outgoing[i].push(j);
                }
            }
        }
    }

    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, targets) in outgoing.iter().enumerate() {
        for &j in targets {
            incoming[j].push(i);
        }
    }

    let mut rank = vec![1.0 / n as f64; n];
    for _ in 0..ITERATIONS {
        let dangling: f64 = outgoing
            .iter()
            .zip(&rank)
            .filter(|(targets, _)| targets.is_empty())
            .map(|(_, r)| *r)
            .sum();
        let base = (1.0 - DAMPING) / n as f64 + DAMPING * dangling / n as f64;

        rank = (0..n)
            .map(|u| {
                base + DAMPING
                    * incoming[u]
                        .iter()
                        .map(|&v| rank[v] / outgoing[v].len() as f64)
                        .sum::<f64>()
            })
            .collect();
    }

    for (page, r) in result.pages.iter_mut().zip(rank) {
        page.pagerank = r;
    }
}
