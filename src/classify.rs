use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::decode::leading_text;

static ROOT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:[\w.-]+:)?(?:urlset|sitemapindex)[\s>/]").unwrap());

const SITEMAP_CONTENT_TYPES: &[&str] = &[
    "application/xml",
    "text/xml",
    "application/sitemap+xml",
    "application/x-sitemap+xml",
];

/// Decide whether a document should be handled as a sitemap.
///
/// An explicit flag from upstream is authoritative either way. Otherwise a
/// sitemap XML content type is enough, and as a last resort the first
/// `sniff_window` bytes are searched for a `urlset`/`sitemapindex` root.
pub fn classify(
    declared: Option<bool>,
    content_type: Option<&str>,
    raw: &[u8],
    sniff: bool,
    sniff_window: usize,
) -> bool {
    if let Some(flag) = declared {
        debug!(flag, "Sitemap flag declared upstream");
        return flag;
    }
    if content_type.is_some_and(is_sitemap_content_type) {
        return true;
    }
    sniff && sniff_root_marker(raw, sniff_window)
}

pub fn is_sitemap_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    SITEMAP_CONTENT_TYPES.contains(&mime.as_str())
}

pub fn sniff_root_marker(raw: &[u8], window: usize) -> bool {
    let head = leading_text(raw, window);
    ROOT_MARKER_RE.is_match(&head)
}

// ── Tests ──
