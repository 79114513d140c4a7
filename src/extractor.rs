//! HTML extraction: main-body text, hyperlinks with anchor text, page
//! metadata, and contact-like identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::models::{Contacts, Link};
use crate::url_utils;

static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", "main", r#"[role="main"]"#]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, h1, h2, h3, h4, h5, h6, li").expect("static selector"));

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("static selector"));

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));

static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("static selector"));

static NON_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s.,!?-]").expect("static regex"));

// The five contact patterns are a compatibility surface; downstream
// consumers parse their output verbatim.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}").expect("static regex"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\+?\d[\d\-\s]{7,}\d").expect("static regex"));

static WHATSAPP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(https?://)?(wa\.me|api\.whatsapp\.com)/[^\s"'<>)]+"#).expect("static regex")
});

static X_HANDLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(https?://)?(www\.)?(x\.com|twitter\.com)/[a-zA-Z0-9_]{1,15}|@[a-zA-Z0-9_]{1,15}")
        .expect("static regex")
});

static LINKEDIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(https?://)?(www\.)?linkedin\.com/in/[a-zA-Z0-9\-_%]+").expect("static regex")
});

/// Everything pulled out of one response body
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// Normalized main-body text; empty when the page had none
    pub text: String,
    /// Links in document order, deduplicated by raw href
    pub links: Vec<Link>,
    /// "x" when the page has no title
    pub title: String,
    /// "x" when the page has no meta description
    pub description: String,
    pub contacts: Contacts,
}

/// Extract text, links, metadata, and contacts from a response body.
pub fn extract(body: &str, base: &Url) -> ExtractedPage {
    let document = Html::parse_document(body);

    let raw_text = {
        let main = main_content_text(&document);
        if main.is_empty() {
            fallback_text(&document)
        } else {
            main
        }
    };
    let text = normalize_text(&raw_text);

    let links = extract_links(&document, base);
    let title = extract_title(&document);
    let description = extract_description(&document);

    let combined = format!("{};{}", text, body);
    let contacts = extract_contacts(&combined);

    ExtractedPage {
        text,
        links,
        title,
        description,
        contacts,
    }
}

/// Lowercase, strip characters outside `[\w\s.,!?-]`, and trim.
pub fn normalize_text(text: &str) -> String {
    NON_TEXT_RE
        .replace_all(text, "")
        .to_lowercase()
        .trim()
        .to_string()
}

/// Main-content pass: paragraphs of the first article/main container,
/// boilerplate left behind, joined with ";". Empty when no container hits.
fn main_content_text(document: &Html) -> String {
    for selector in CONTENT_SELECTORS.iter() {
        if let Some(root) = document.select(selector).next() {
            let paragraphs: Vec<String> = root
                .select(&PARAGRAPH_SELECTOR)
                .map(|el| {
                    el.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|p| !p.is_empty())
                .collect();
            if !paragraphs.is_empty() {
                return paragraphs.join(";");
            }
        }
    }
    String::new()
}

/// Fallback pass: every text node in the document, each followed by ";".
fn fallback_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.root_element().descendants() {
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
            out.push(';');
        }
    }
    out
}

fn extract_links(document: &Html, base: &Url) -> Vec<Link> {
    let mut links = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.is_empty() || !seen.insert(href) {
            continue;
        }

        let mut anchor = anchor_text(element, base);
        if anchor.is_empty() {
            anchor = "N/A".to_string();
        }
        links.push(Link {
            to_url: href.to_string(),
            anchor_text: anchor,
        });
    }

    links
}

/// Anchor text is the concatenation of descendant text nodes; an `<img>`
/// descendant contributes its resolved src instead.
fn anchor_text(element: ElementRef, base: &Url) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            out.push_str(text.trim());
        } else if let Some(el) = node.value().as_element() {
            if el.name() == "img" {
                if let Some(src) = el.attr("src") {
                    match url_utils::resolve(base, src) {
                        Some(resolved) => out.push_str(resolved.as_str()),
                        None => out.push_str(src),
                    }
                }
            }
        }
    }
    out.trim().to_string()
}

fn extract_title(document: &Html) -> String {
    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .and_then(|el| el.text().next())
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if title.is_empty() {
        "x".to_string()
    } else {
        title
    }
}

fn extract_description(document: &Html) -> String {
    for element in document.select(&META_SELECTOR) {
        let is_description = element
            .value()
            .attr("name")
            .map(|n| n.eq_ignore_ascii_case("description"))
            .unwrap_or(false);
        if !is_description {
            continue;
        }
        if let Some(content) = element.value().attr("content") {
            let content = content.trim();
            if !content.is_empty() {
                return content.to_string();
            }
        }
    }
    "x".to_string()
}

fn extract_contacts(combined: &str) -> Contacts {
    Contacts {
        emails: dedup_matches(&EMAIL_RE, combined),
        phones: dedup_matches(&PHONE_RE, combined),
        whatsapps: dedup_matches(&WHATSAPP_RE, combined),
        x_handles: dedup_matches(&X_HANDLE_RE, combined),
        linkedins: dedup_matches(&LINKEDIN_RE, combined),
    }
}

/// All matches, deduplicated in first-seen order
fn dedup_matches(re: &Regex, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in re.find_iter(text) {
        let value = m.as_str();
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/dir/page").unwrap()
    }

    #[test]
    fn test_fallback_text_walks_every_text_node() {
        let html = "<html><body><div>Hello</div><p>World</p></body></html>";
        let extracted = extract(html, &base());
        assert!(extracted.text.contains("hello"));
        assert!(extracted.text.contains("world"));
    }

    #[test]
    fn test_main_content_preferred_over_fallback() {
        let html = r#"
            <html><body>
            <nav>Navigation boilerplate</nav>
            <article><p>First paragraph.</p><p>Second paragraph.</p></article>
            <footer>Footer junk</footer>
            </body></html>
        "#;
        let extracted = extract(html, &base());
        assert!(extracted.text.contains("first paragraph"));
        assert!(extracted.text.contains("second paragraph"));
        assert!(!extracted.text.contains("boilerplate"));
        assert!(!extracted.text.contains("footer"));
    }

    #[test]
    fn test_normalize_text_strips_punctuation() {
        assert_eq!(normalize_text("  Hello, World! [x] (y) @#$ "), "hello, world! x y");
        assert_eq!(normalize_text("a;b"), "ab");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_links_deduplicated_in_document_order() {
        let html = r#"<a href="/a">One</a><a href="/b">Two</a><a href="/a">Again</a>"#;
        let extracted = extract(html, &base());
        let hrefs: Vec<&str> = extracted.links.iter().map(|l| l.to_url.as_str()).collect();
        assert_eq!(hrefs, vec!["/a", "/b"]);
        assert_eq!(extracted.links[0].anchor_text, "One");
    }

    #[test]
    fn test_empty_anchor_text_becomes_na() {
        let html = r#"<a href="/empty"></a>"#;
        let extracted = extract(html, &base());
        assert_eq!(extracted.links[0].anchor_text, "N/A");
    }

    #[test]
    fn test_img_anchor_uses_resolved_src() {
        let html = r#"<a href="/logo-page"><img src="/img/logo.png"></a>"#;
        let extracted = extract(html, &base());
        assert_eq!(
            extracted.links[0].anchor_text,
            "https://example.com/img/logo.png"
        );
    }

    #[test]
    fn test_metadata_defaults_to_x() {
        let extracted = extract("<html><body><p>hi</p></body></html>", &base());
        assert_eq!(extracted.title, "x");
        assert_eq!(extracted.description, "x");
    }

    #[test]
    fn test_metadata_extraction() {
        let html = r#"
            <html><head>
            <title> Test Page </title>
            <meta NAME="Description" content=" First description ">
            <meta name="description" content="Second description">
            </head><body></body></html>
        "#;
        let extracted = extract(html, &base());
        assert_eq!(extracted.title, "Test Page");
        assert_eq!(extracted.description, "First description");
    }

    #[test]
    fn test_contact_extraction() {
        let html = r#"
            <html><body>
            <p>Email: contact@example.com or CONTACT@example.com</p>
            <p>Phone: +1-234-567-8900</p>
            <a href="https://wa.me/15551234567">WhatsApp</a>
            <a href="https://twitter.com/testuser">on X</a>
            <a href="https://www.linkedin.com/in/jane-doe">profile</a>
            </body></html>
        "#;
        let extracted = extract(html, &base());

        assert!(extracted
            .contacts
            .emails
            .contains(&"contact@example.com".to_string()));
        assert!(extracted
            .contacts
            .phones
            .contains(&"+1-234-567-8900".to_string()));
        assert!(extracted
            .contacts
            .whatsapps
            .contains(&"https://wa.me/15551234567".to_string()));
        assert!(extracted
            .contacts
            .x_handles
            .iter()
            .any(|h| h.contains("twitter.com/testuser")));
        assert!(extracted
            .contacts
            .linkedins
            .contains(&"https://www.linkedin.com/in/jane-doe".to_string()));
    }

    #[test]
    fn test_contact_extraction_is_idempotent_and_ordered() {
        let html = r#"
            <p>a@example.com then b@example.com then a@example.com</p>
        "#;
        let first = extract(html, &base());
        let second = extract(html, &base());

        assert_eq!(first.contacts, second.contacts);
        assert_eq!(
            first.contacts.emails,
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }
}
