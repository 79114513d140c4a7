//! Output artifacts written after a crawl: the text/metadata/link-map
//! files consumed downstream, plus a JSONL page dump for the report
//! renderer. Schemas are a compatibility surface; keep them byte-stable.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use url::Url;

use crate::extractor;
use crate::models::{CrawlResult, Page};
use crate::url_utils;

const LINKS_HEADER: &str = "from_url\tto_url\tanchor_text/img_url";
const SUMMARY_HEADER: &str = "to_url\tcount_uniques";
const DOMAINS_HEADER: &str = "domain\tcount_uniques";

/// Write the eight crawl artifacts into `dir`, creating it if needed.
pub fn save_results(result: &CrawlResult, dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut text_rows: Vec<String> = Vec::new();
    let mut all_text = String::new();
    let mut internal_rows: Vec<String> = Vec::new();
    let mut external_rows: Vec<String> = Vec::new();
    // target -> distinct source pages
    let mut internal_pairs: HashMap<String, HashSet<String>> = HashMap::new();
    let mut external_pairs: HashMap<String, HashSet<String>> = HashMap::new();
    // host -> distinct (from, to) pairs
    let mut domain_pairs: HashMap<String, HashSet<String>> = HashMap::new();

    let mut metadata = BufWriter::new(File::create(dir.join("origin_metadata.tsv"))?);

    for page in &result.pages {
        text_rows.push(format!(
            "{}\t{}\t{}",
            page.url,
            page.text,
            page.contacts.emails.join(" ")
        ));
        all_text.push_str(&page.text);
        all_text.push(';');
        writeln!(
            metadata,
            "{}\t{}\t{}\t{}",
            page.url, page.title, page.description, page.etag
        )?;

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
            let Some(host) = resolved.host_str() else {
                continue;
            };

            let anchor = link.anchor_text.replace('\t', " ");
            let row = format!("{}\t{}\t{}", page.url, abs, anchor);

            if url_utils::registrable_domain(host) == result.domain {
                internal_rows.push(row);
                internal_pairs
                    .entry(abs)
                    .or_default()
                    .insert(page.url.clone());
            } else {
                external_rows.push(row);
                external_pairs
                    .entry(abs.clone())
                    .or_default()
                    .insert(page.url.clone());
                domain_pairs
                    .entry(host.to_string())
                    .or_default()
                    .insert(format!("{}\t{}", page.url, abs));
            }
        }
    }
    metadata.flush()?;

    text_rows.sort();
    write_lines(&dir.join("urls_with_text.txt"), None, &text_rows)?;

    std::fs::write(
        dir.join("all_texts.txt"),
        extractor::normalize_text(&all_text),
    )?;

    internal_rows.sort();
    write_lines(
        &dir.join("internal_links_map.tsv"),
        Some(LINKS_HEADER),
        &internal_rows,
    )?;
    external_rows.sort();
    write_lines(
        &dir.join("external_links_map.tsv"),
        Some(LINKS_HEADER),
        &external_rows,
    )?;

    write_summary(
        &dir.join("internal_links_map_summary.tsv"),
        SUMMARY_HEADER,
        internal_pairs,
    )?;
    write_summary(
        &dir.join("external_links_map_summary.tsv"),
        SUMMARY_HEADER,
        external_pairs,
    )?;
    write_summary(
        &dir.join("external_top_linked_domains.tsv"),
        DOMAINS_HEADER,
        domain_pairs,
    )?;

    Ok(())
}

fn write_lines(path: &Path, header: Option<&str>, rows: &[String]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    if let Some(header) = header {
        writeln!(writer, "{}", header)?;
    }
    for row in rows {
        writeln!(writer, "{}", row)?;
    }
    writer.flush()
}

/// Descending unique-count order, ties broken by ascending key
fn write_summary(
    path: &Path,
    header: &str,
    pairs: HashMap<String, HashSet<String>>,
) -> io::Result<()> {
    let mut entries: Vec<(String, usize)> = pairs
        .into_iter()
        .map(|(key, sources)| (key, sources.len()))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", header)?;
    for (key, count) in entries {
        writeln!(writer, "{}\t{}", key, count)?;
    }
    writer.flush()
}

/// One JSON page record per line
pub fn write_pages_jsonl(result: &CrawlResult, path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for page in &result.pages {
        serde_json::to_writer(&mut writer, page)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

pub fn read_pages_jsonl(path: &Path) -> io::Result<Vec<Page>> {
    let reader = BufReader::new(File::open(path)?);
    let mut pages = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        pages.push(serde_json::from_str(&line)?);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contacts, Link};
    use chrono::Utc;
    use tempfile::TempDir;

    fn page(url: &str, text: &str, links: &[(&str, &str)]) -> Page {
        Page {
            url: url.to_string(),
            status_code: 200,
            fetched_at: Utc::now(),
            etag: "N/A".to_string(),
            title: "x".to_string(),
            description: "x".to_string(),
            text: text.to_string(),
            links: links
                .iter()
                .map(|(to, anchor)| Link {
                    to_url: to.to_string(),
                    anchor_text: anchor.to_string(),
                })
                .collect(),
            contacts: Contacts::default(),
            pagerank: 0.0,
        }
    }

    fn sample_result() -> CrawlResult {
        let pages = vec![
            page(
                "https://example.com/",
                "home text",
                &[
                    ("/about", "About"),
                    ("https://partner.org/x", "Partner"),
                    ("/skip#frag", "Skipped"),
                ],
            ),
            page(
                "https://example.com/about",
                "about text",
                &[("/", "Home"), ("https://partner.org/x", "Partner again")],
            ),
        ];
        CrawlResult {
            domain: "example.com".to_string(),
            total_pages: pages.len(),
            pages,
            crawl_time: Utc::now(),
            error_count: 0,
            subdomains: Vec::new(),
        }
    }

    fn read(dir: &TempDir, name: &str) -> String {
        std::fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_save_results_writes_all_artifacts() {
        let dir = TempDir::new().unwrap();
        save_results(&sample_result(), dir.path()).unwrap();

        for name in [
            "urls_with_text.txt",
            "all_texts.txt",
            "origin_metadata.tsv",
            "internal_links_map.tsv",
            "external_links_map.tsv",
            "internal_links_map_summary.tsv",
            "external_links_map_summary.tsv",
            "external_top_linked_domains.tsv",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }
    }

    #[test]
    fn test_links_are_classified_and_fragments_dropped() {
        let dir = TempDir::new().unwrap();
        save_results(&sample_result(), dir.path()).unwrap();

        let internal = read(&dir, "internal_links_map.tsv");
        let external = read(&dir, "external_links_map.tsv");

        assert!(internal.starts_with("from_url\tto_url\tanchor_text/img_url\n"));
        assert!(internal.contains("https://example.com/\thttps://example.com/about\tAbout"));
        assert!(internal.contains("https://example.com/about\thttps://example.com/\tHome"));
        assert!(!internal.contains("skip"));

        assert!(external.contains("https://example.com/\thttps://partner.org/x\tPartner"));
        assert!(!external.contains("example.com/about\thttps://example.com"));
    }

    #[test]
    fn test_summaries_count_unique_sources() {
        let dir = TempDir::new().unwrap();
        save_results(&sample_result(), dir.path()).unwrap();

        let external_summary = read(&dir, "external_links_map_summary.tsv");
        // Two distinct pages link to the partner URL
        assert!(external_summary.contains("https://partner.org/x\t2"));

        let domains = read(&dir, "external_top_linked_domains.tsv");
        assert!(domains.starts_with("domain\tcount_uniques\n"));
        assert!(domains.contains("partner.org\t2"));
    }

    #[test]
    fn test_summary_ordering_breaks_ties_ascending() {
        let dir = TempDir::new().unwrap();
        let mut pairs: HashMap<String, HashSet<String>> = HashMap::new();
        pairs.insert("b".to_string(), HashSet::from(["s1".to_string()]));
        pairs.insert("a".to_string(), HashSet::from(["s1".to_string()]));
        pairs.insert(
            "c".to_string(),
            HashSet::from(["s1".to_string(), "s2".to_string()]),
        );

        let path = dir.path().join("summary.tsv");
        write_summary(&path, SUMMARY_HEADER, pairs).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["to_url\tcount_uniques", "c\t2", "a\t1", "b\t1"]);
    }

    #[test]
    fn test_pages_jsonl_round_trip() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        let path = dir.path().join("pages.jsonl");

        write_pages_jsonl(&result, &path).unwrap();
        let pages = read_pages_jsonl(&path).unwrap();

        assert_eq!(pages.len(), result.pages.len());
        assert_eq!(pages[0].url, result.pages[0].url);
        assert_eq!(pages[0].links, result.pages[0].links);
    }

    #[test]
    fn test_rows_are_sorted() {
        let dir = TempDir::new().unwrap();
        save_results(&sample_result(), dir.path()).unwrap();

        let rows: Vec<String> = read(&dir, "urls_with_text.txt")
            .lines()
            .map(str::to_string)
            .collect();
        let mut sorted = rows.clone();
        sorted.sort();
        assert_eq!(rows, sorted);
    }
}
