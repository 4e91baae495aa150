//! Normalized URL identity used for deduplicating post and index URLs.

use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameters that select a distinct page and survive normalization.
///
/// `?p=123` and `?page_id=` are WordPress permalinks, `?page=2` is the most
/// common index pagination scheme. Everything else (tracking, sorting, `ref`)
/// is dropped.
const SIGNIFICANT_QUERY_PARAMS: &[&str] = &["p", "page_id", "id", "page", "post"];

/// Canonical form of a URL: scheme + host + port + path, trailing slash
/// removed, fragment and insignificant query parameters stripped. The host is
/// compared the way [`host_key`] compares it, so `www.` is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlKey(String);

impl UrlKey {
    /// Compute the identity of `url`.
    pub fn new(url: &Url) -> Self {
        let mut key = String::with_capacity(url.as_str().len());
        key.push_str(url.scheme());
        key.push_str("://");
        key.push_str(&host_key(url));
        if let Some(port) = url.port() {
            key.push(':');
            key.push_str(&port.to_string());
        }

        let path = url.path();
        let trimmed = path.trim_end_matches('/');
        key.push_str(if trimmed.is_empty() { "/" } else { trimmed });

        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| SIGNIFICANT_QUERY_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if !params.is_empty() {
            params.sort();
            let query = params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            key.push('?');
            key.push_str(&query);
        }

        Self(key)
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UrlKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host used to look up per-site parsers and hints (`www.` ignored).
pub fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> String {
        UrlKey::new(&Url::parse(s).unwrap()).to_string()
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(
            key("https://example.com/blog/post-one/"),
            key("https://example.com/blog/post-one")
        );
    }

    #[test]
    fn fragment_and_tracking_query_are_stripped() {
        assert_eq!(
            key("https://Example.com/blog/post?utm_source=x#comments"),
            "https://example.com/blog/post"
        );
    }

    #[test]
    fn significant_query_is_kept_and_sorted() {
        assert_eq!(
            key("https://example.com/?utm=1&p=42"),
            "https://example.com/?p=42"
        );
        assert_ne!(
            key("https://example.com/blog?page=2"),
            key("https://example.com/blog?page=3")
        );
    }

    #[test]
    fn root_path_keeps_slash() {
        assert_eq!(key("https://example.com"), "https://example.com/");
        assert_eq!(key("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn explicit_port_is_kept() {
        assert_eq!(
            key("http://127.0.0.1:8080/blog/"),
            "http://127.0.0.1:8080/blog"
        );
    }

    #[test]
    fn www_host_is_the_same_identity() {
        assert_eq!(
            key("https://www.Example.com/blog/p"),
            key("https://example.com/blog/p/")
        );
        assert_eq!(key("https://www.example.com/blog/p"), "https://example.com/blog/p");
    }

    #[test]
    fn host_key_strips_www() {
        let url = Url::parse("https://www.TigerBeetle.com/blog/").unwrap();
        assert_eq!(host_key(&url), "tigerbeetle.com");
    }
}
