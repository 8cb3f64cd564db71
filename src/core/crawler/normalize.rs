//! URL normalization and same-site checks.
//!
//! Page identity is the normalized URL: scheme + host + path, with
//! the fragment, query string and trailing slash stripped. Two URLs
//! that normalize identically are the same page; content-level
//! deduplication is deliberately out of scope.

use url::Url;

/// Normalize a URL for identity and dedup purposes.
///
/// Fixed policy: drop the fragment, drop the query string, strip a
/// trailing slash from non-root paths, lowercase the host. Returns
/// `None` for non-HTTP(S) or unparseable URLs.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;

    url.set_fragment(None);
    url.set_query(None);

    let mut normalized = url.to_string();
    // Url always renders the root path as "/"; strip only deeper
    // trailing slashes so "https://x.com/" and "https://x.com/a/"
    // both have a single canonical form.
    if normalized.ends_with('/') && url.path() != "/" {
        normalized.pop();
    }

    Some(normalized)
}

/// Resolve a possibly-relative href against the page it appeared on.
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let joined = base.join(href).ok()?;
    normalize_url(joined.as_str())
}

/// Whether `url` belongs to the same host as `seed`.
///
/// Off-site links are discarded by the crawler; subdomains count as
/// different hosts.
pub fn same_site(seed: &str, url: &str) -> bool {
    let seed_host = Url::parse(seed).ok().and_then(|u| u.host_str().map(str::to_string));
    let url_host = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string));
    match (seed_host, url_host) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
