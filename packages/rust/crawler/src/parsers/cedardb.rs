//! cedardb.com blog parser.
//!
//! Listing cards are links under `/blog/` whose text starts with a
//! `DD/MM/YYYY` date, usually with the title in an inner `<h3>`. Post pages end
//! with a grid of related-post cards that must not reach the document.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use blogbook_content::{collapse_text, normalize_text};
use blogbook_shared::{ClassifiedLink, LinkHint, LinkKind, PostMetadata, host_key};

use super::generic::{self, ANCHORS, GenericParser};
use super::{PageParser, ParseContext};

const HOST: &str = "cedardb.com";

const MIN_TITLE_CHARS: usize = 5;

/// A container with at least this many `/blog/` links is a related-posts grid.
const RELATED_GRID_LINKS: usize = 3;

static H3: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").expect("valid selector"));

static BLOG_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/blog/"]"#).expect("valid selector"));

static LISTING_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("valid regex"));

static STRIP_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)author|byline|meta|date|listing|button|cta|start-now|signup|waitlist")
        .expect("valid regex")
});

/// Parser for the CedarDB blog.
pub struct CedarDbParser;

impl PageParser for CedarDbParser {
    fn name(&self) -> &str {
        "cedardb"
    }

    fn detect(&self, url: &Url) -> bool {
        host_key(url) == HOST
    }

    fn blog_title(&self, _doc: &Html, _cx: &ParseContext<'_>) -> Option<String> {
        Some("CedarDB Engineering Blog".into())
    }

    fn extract_links(&self, doc: &Html, cx: &ParseContext<'_>) -> Vec<ClassifiedLink> {
        if cx.overrides_links() {
            return GenericParser.extract_links(doc, cx);
        }

        let mut links: Vec<ClassifiedLink> = doc
            .select(&ANCHORS)
            .filter_map(|el| listing_card(el, cx))
            .collect();
        links.extend(generic::pagination_links(doc, cx));
        links
    }

    fn extract_post(&self, doc: &Html, cx: &ParseContext<'_>, hint: &LinkHint) -> PostMetadata {
        generic::post_metadata(doc, cx, hint, |el| {
            generic::class_matches(el, &STRIP_CLASS_RE) || is_related_grid(el)
        })
    }
}

fn listing_card(el: ElementRef<'_>, cx: &ParseContext<'_>) -> Option<ClassifiedLink> {
    let url = generic::resolve_href(el, cx.page_url)?;
    let path = url.path().to_ascii_lowercase();
    if !generic::same_site(&url, cx)
        || !path.contains("/blog/")
        || path.trim_end_matches('/').ends_with("/blog")
        || path.contains("subscribe")
        || path.contains("newsletter")
    {
        return None;
    }

    let text = collapse_text(el);
    let date = LISTING_DATE_RE
        .find(&text)
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%d/%m/%Y").ok());

    let title = match el.select(&H3).next() {
        Some(h3) => collapse_text(h3),
        None => {
            let stripped = LISTING_DATE_RE
                .find(&text)
                .filter(|m| m.start() == 0)
                .map_or(text.as_str(), |m| &text[m.end()..]);
            stripped.trim().to_string()
        }
    };
    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }

    let mut link = ClassifiedLink::new(url, LinkKind::PostCandidate);
    link.hint = LinkHint {
        title: Some(normalize_text(&title)),
        date,
    };
    Some(link)
}

/// `section`/`div` made mostly of links to other posts.
fn is_related_grid(el: ElementRef<'_>) -> bool {
    if !matches!(el.value().name(), "section" | "div") {
        return false;
    }
    let links: Vec<_> = el.select(&BLOG_LINKS).collect();
    if links.len() < RELATED_GRID_LINKS {
        return false;
    }
    let link_chars: usize = links.iter().map(|a| collapse_text(*a).len()).sum();
    link_chars * 2 >= collapse_text(el).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogbook_shared::CompiledHints;

    fn context<'a>(page: &'a Url, hints: &'a CompiledHints) -> ParseContext<'a> {
        ParseContext {
            page_url: page,
            blog_root: page,
            hints,
        }
    }

    #[test]
    fn listing_cards_with_dates() {
        let doc = Html::parse_document(
            r#"<body>
                <a href="/blog/">Blog</a>
                <a href="/blog/ssd-writes/"><span>31/10/2025</span><h3>Why SSD writes are slow</h3><p>desc</p></a>
                <a href="/blog/join-order">12/03/2024Join ordering explained</a>
                <a href="/blog/newsletter">Join our newsletter today</a>
            </body>"#,
        );
        let page = Url::parse("https://cedardb.com/blog/").unwrap();
        let hints = CompiledHints::default();
        let links = CedarDbParser.extract_links(&doc, &context(&page, &hints));

        let posts: Vec<_> = links
            .iter()
            .filter(|l| l.kind == LinkKind::PostCandidate)
            .collect();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].hint.title.as_deref(), Some("Why SSD writes are slow"));
        assert_eq!(posts[0].hint.date, NaiveDate::from_ymd_opt(2025, 10, 31));
        assert_eq!(posts[1].hint.title.as_deref(), Some("Join ordering explained"));
        assert_eq!(posts[1].hint.date, NaiveDate::from_ymd_opt(2024, 3, 12));
    }

    #[test]
    fn related_grid_is_stripped_but_prose_links_kept() {
        let doc = Html::parse_document(
            r#"<body><article>
                <h1>Post</h1>
                <div class="prose"><p>We covered <a href="/blog/a">a</a>, <a href="/blog/b">b</a>
                   and <a href="/blog/c">c</a> before, in a long paragraph of prose text that is
                   clearly the body of the article and not a grid of cards.</p></div>
                <div class="grid">
                  <a href="/blog/x">Another post title</a>
                  <a href="/blog/y">Yet another post</a>
                  <a href="/blog/z">Third related post</a>
                </div>
                <div class="author-card">Written by someone</div>
            </article></body>"#,
        );
        let page = Url::parse("https://cedardb.com/blog/post").unwrap();
        let hints = CompiledHints::default();
        let meta = CedarDbParser.extract_post(&doc, &context(&page, &hints), &LinkHint::default());

        assert!(meta.body_html.contains("We covered"));
        assert!(!meta.body_html.contains("Third related post"));
        assert!(!meta.body_html.contains("Written by someone"));
    }
}
