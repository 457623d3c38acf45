//! Link target resolution
//!
//! Decides whether an activated link points at another trackable content item.

use percent_encoding::percent_decode_str;
use url::Url;

/// Origin that relative hrefs are resolved against
const SITE_ROOT: &str = "http://localhost/";

/// Extract the content id an href points at, if it is trackable.
///
/// Accepts absolute URLs, scheme-relative URLs and paths; paths resolve
/// against the site root. Only the URL path is matched, so prefixes that
/// appear in a query string or fragment never count. The id is the first
/// path segment after a matching prefix, percent-decoded.
pub fn resolve_content_link(href: &str, prefixes: &[String]) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let root = Url::parse(SITE_ROOT).ok()?;
    let url = Url::options().base_url(Some(&root)).parse(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.collect();

    prefixes.iter().find_map(|prefix| {
        let prefix_segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        if prefix_segments.is_empty() || !segments.starts_with(&prefix_segments) {
            return None;
        }
        let raw = segments.get(prefix_segments.len())?;
        let id = percent_decode_str(raw).decode_utf8().ok()?;
        (!id.is_empty()).then(|| id.into_owned())
    })
}
