//! URL helper functions used throughout the crawler

use url::Url;

/// File extensions that never point at a crawlable HTML page
const NON_WEBPAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".pdf", ".zip", ".mp4", ".mp3", ".css", ".js",
];

/// Canonical string form of a URL: lowercased scheme and host, fragment
/// stripped, path and query untouched
pub fn canonicalize(url: &Url) -> String {
    let mut canonical = url.clone();
    canonical.set_fragment(None);
    canonical.to_string()
}

/// Resolve a possibly-relative href against the provided base URL
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}

/// Determine whether a URL is eligible for crawling
pub fn is_webpage_url(url: &Url) -> bool {
    if url.fragment().is_some() {
        return false;
    }

    let path = url.path().to_lowercase();
    !NON_WEBPAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Return the coarse admission bucket for a URL: "/" plus the first
/// non-empty path segment, or "/" for an empty path
pub fn path_family(url: &Url) -> String {
    match url.path().trim_matches('/').split('/').next() {
        Some(segment) if !segment.is_empty() => format!("/{}", segment),
        _ => "/".to_string(),
    }
}

/// Effective TLD + 1 for a host. Hosts outside the public suffix list
/// (IP literals, bare test hosts) fall back to the full host string so
/// crawls against loopback servers still bound to one site.
pub fn registrable_domain(host: &str) -> String {
    psl::domain_str(host)
        .map(str::to_string)
        .unwrap_or_else(|| host.to_string())
}

/// Check whether a URL belongs to the given registrable domain
pub fn same_domain(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|host| registrable_domain(host) == domain)
        .unwrap_or(false)
}

/// Normalize CLI input by adding https:// when no scheme is provided
pub fn normalize_url_for_cli(url: &str) -> String {
    let trimmed = url.trim();

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }

    format!("https://{}", trimmed)
}
