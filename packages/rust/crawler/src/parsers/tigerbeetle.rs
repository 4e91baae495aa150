//! tigerbeetle.com blog parser.
//!
//! The index lists posts as `<a class="post" href="2024-12-19-slug">` cards
//! with the title in an inner `<h2>`; the date only appears in the href.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use blogbook_content::{collapse_text, normalize_text};
use blogbook_shared::{ClassifiedLink, LinkHint, LinkKind, PostMetadata, host_key};

use super::generic::{self, GenericParser};
use super::{PageParser, ParseContext};
use crate::dates;

const HOST: &str = "tigerbeetle.com";

const MIN_TITLE_CHARS: usize = 5;

static POST_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.post[href]").expect("valid selector"));

static H2: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").expect("valid selector"));

static STRIP_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)author|byline|meta").expect("valid regex"));

/// Parser for the TigerBeetle engineering blog.
pub struct TigerBeetleParser;

impl PageParser for TigerBeetleParser {
    fn name(&self) -> &str {
        "tigerbeetle"
    }

    fn detect(&self, url: &Url) -> bool {
        host_key(url) == HOST
    }

    fn blog_title(&self, _doc: &Html, _cx: &ParseContext<'_>) -> Option<String> {
        Some("TigerBeetle Engineering Blog".into())
    }

    fn extract_links(&self, doc: &Html, cx: &ParseContext<'_>) -> Vec<ClassifiedLink> {
        if cx.overrides_links() {
            return GenericParser.extract_links(doc, cx);
        }

        // Card hrefs are relative to the listing directory even when the
        // index URL lacks its trailing slash.
        let base = directory_url(cx.page_url);

        let mut links: Vec<ClassifiedLink> = doc
            .select(&POST_CARD)
            .filter_map(|card| {
                let url = generic::resolve_href(card, &base)?;
                let title = card
                    .select(&H2)
                    .next()
                    .map(collapse_text)
                    .unwrap_or_else(|| collapse_text(card));
                if title.chars().count() < MIN_TITLE_CHARS || !generic::same_site(&url, cx) {
                    return None;
                }

                let date = dates::date_from_url(&url);
                let mut link = ClassifiedLink::new(url, LinkKind::PostCandidate);
                link.hint = LinkHint {
                    title: Some(normalize_text(&title)),
                    date,
                };
                Some(link)
            })
            .collect();

        links.extend(generic::pagination_links(doc, cx));
        links
    }

    fn extract_post(&self, doc: &Html, cx: &ParseContext<'_>, hint: &LinkHint) -> PostMetadata {
        generic::post_metadata(doc, cx, hint, |el| {
            generic::class_matches(el, &STRIP_CLASS_RE)
        })
    }
}

fn directory_url(url: &Url) -> Url {
    let mut dir = url.clone();
    if !dir.path().ends_with('/') {
        let path = format!("{}/", dir.path());
        dir.set_path(&path);
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogbook_shared::CompiledHints;

    #[test]
    fn cards_resolve_against_listing_directory() {
        let doc = Html::parse_document(
            r#"<body>
                <a class="post" href="2024-12-19-enum-of-arrays"><h2>Enum of Arrays</h2><p>teaser</p></a>
                <a class="post" href="2023-07-11-a-friendly-abstraction"><h2>A Friendly Abstraction</h2></a>
                <a href="/company">Company</a>
            </body>"#,
        );
        let page = Url::parse("https://tigerbeetle.com/blog").unwrap();
        let hints = CompiledHints::default();
        let cx = ParseContext {
            page_url: &page,
            blog_root: &page,
            hints: &hints,
        };

        let posts: Vec<_> = TigerBeetleParser
            .extract_links(&doc, &cx)
            .into_iter()
            .filter(|l| l.kind == LinkKind::PostCandidate)
            .collect();

        assert_eq!(posts.len(), 2);
        assert_eq!(
            posts[0].url.as_str(),
            "https://tigerbeetle.com/blog/2024-12-19-enum-of-arrays"
        );
        assert_eq!(posts[0].hint.title.as_deref(), Some("Enum of Arrays"));
        assert_eq!(
            posts[0].hint.date,
            chrono::NaiveDate::from_ymd_opt(2024, 12, 19)
        );
    }

    #[test]
    fn strips_author_blocks() {
        let doc = Html::parse_document(
            r#"<body><article><h1>Enum of Arrays</h1>
                <div class="post-author">Joran</div><p>Body text.</p></article></body>"#,
        );
        let page = Url::parse("https://tigerbeetle.com/blog/2024-12-19-enum-of-arrays").unwrap();
        let root = Url::parse("https://tigerbeetle.com/blog/").unwrap();
        let hints = CompiledHints::default();
        let cx = ParseContext {
            page_url: &page,
            blog_root: &root,
            hints: &hints,
        };

        let meta = TigerBeetleParser.extract_post(&doc, &cx, &LinkHint::default());
        assert_eq!(meta.title, "Enum of Arrays");
        assert_eq!(meta.published, chrono::NaiveDate::from_ymd_opt(2024, 12, 19));
        assert!(meta.body_html.contains("Body text."));
        assert!(!meta.body_html.contains("Joran"));
    }
}
