//! Generic (fallback) page parser.
//!
//! Works on arbitrary blog templates using structural heuristics. The helper
//! functions are shared with the site parsers, which only override the parts
//! of the template they know better.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use blogbook_content::{collapse_text, extract_body, normalize_text, select_container};
use blogbook_shared::{ClassifiedLink, LinkHint, LinkKind, PostMetadata, host_key};

use super::{PageParser, ParseContext};
use crate::dates;

/// Link text shorter than this is navigation, not a post title.
const MIN_TITLE_CHARS: usize = 10;

/// Ancestors searched for a date next to a post link.
const HINT_DATE_LEVELS: usize = 5;

/// Ancestors with more text than this are listing-wide, not one item.
const HINT_DATE_MAX_TEXT: usize = 500;

/// Path fragments that never lead to a post.
const NON_POST_PATHS: &[&str] = &[
    "/tag/", "/tags/", "/category/", "/categories/", "/author/", "/page/", "/search", "/about",
    "/contact", "/subscribe", "/feed", ".xml", ".rss", ".atom", ".json",
];

pub(crate) static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector")
});

static OG_SITE_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:site_name"]"#).expect("valid selector")
});

static PAGINATION_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:older|next|more)(?:\s*(?:posts?|page|entries|articles))?|load\s*more(?:\s*posts?)?)?\s*[→»›]?$",
    )
    .expect("valid regex")
});

static PAGE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/page/\d+/?$").expect("valid regex"));

/// Generic parser for blogs without a dedicated parser.
pub struct GenericParser;

impl PageParser for GenericParser {
    fn name(&self) -> &str {
        "generic"
    }

    fn detect(&self, _url: &Url) -> bool {
        true
    }

    fn blog_title(&self, doc: &Html, _cx: &ParseContext<'_>) -> Option<String> {
        meta_content(doc, &OG_SITE_NAME).or_else(|| document_title(doc))
    }

    fn extract_links(&self, doc: &Html, cx: &ParseContext<'_>) -> Vec<ClassifiedLink> {
        classify_links(doc, cx)
    }

    fn extract_post(&self, doc: &Html, cx: &ParseContext<'_>, hint: &LinkHint) -> PostMetadata {
        post_metadata(doc, cx, hint, |_| false)
    }
}

// ---------------------------------------------------------------------------
// Link classification
// ---------------------------------------------------------------------------

/// Classify all anchors on an index page with the generic heuristics, or with
/// the configured selectors when the site has any.
pub(crate) fn classify_links(doc: &Html, cx: &ParseContext<'_>) -> Vec<ClassifiedLink> {
    doc.select(&ANCHORS)
        .filter_map(|el| {
            let url = resolve_href(el, cx.page_url)?;
            let kind = if is_pagination(el, &url, cx) {
                LinkKind::Pagination
            } else if is_post_candidate(el, &url, cx) {
                LinkKind::PostCandidate
            } else {
                LinkKind::Ignored
            };

            let mut link = ClassifiedLink::new(url, kind);
            if kind == LinkKind::PostCandidate {
                link.hint = index_hint(el, &link.url, &cx.hints.date_formats);
            }
            Some(link)
        })
        .collect()
}

/// Only the pagination links of a page; used by site parsers that classify
/// posts themselves.
pub(crate) fn pagination_links(doc: &Html, cx: &ParseContext<'_>) -> Vec<ClassifiedLink> {
    doc.select(&ANCHORS)
        .filter_map(|el| {
            let url = resolve_href(el, cx.page_url)?;
            is_pagination(el, &url, cx).then(|| ClassifiedLink::new(url, LinkKind::Pagination))
        })
        .collect()
}

/// Resolve an anchor's `href` against `base`, dropping the fragment.
/// Non-HTTP targets (`mailto:`, `javascript:`, in-page `#`) yield `None`.
pub(crate) fn resolve_href(el: ElementRef<'_>, base: &Url) -> Option<Url> {
    let href = el.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

pub(crate) fn same_site(url: &Url, cx: &ParseContext<'_>) -> bool {
    host_key(url) == host_key(cx.blog_root)
}

fn is_pagination(el: ElementRef<'_>, url: &Url, cx: &ParseContext<'_>) -> bool {
    if !same_site(url, cx) {
        return false;
    }
    if let Some(sel) = &cx.hints.pagination {
        return sel.matches(&el);
    }

    let rel_next = el
        .value()
        .attr("rel")
        .is_some_and(|r| r.split_whitespace().any(|t| t.eq_ignore_ascii_case("next")));
    if rel_next {
        return true;
    }

    if PAGE_PATH_RE.is_match(url.path()) || url.query_pairs().any(|(k, v)| k == "page" && v.parse::<u32>().is_ok()) {
        return true;
    }

    // "More »" next to a listing item is a read-more link, not pagination.
    let text = collapse_text(el);
    !text.is_empty() && PAGINATION_TEXT_RE.is_match(&text) && !is_post_path(url, cx)
}

fn is_post_candidate(el: ElementRef<'_>, url: &Url, cx: &ParseContext<'_>) -> bool {
    if !same_site(url, cx) {
        return false;
    }
    if let Some(sel) = &cx.hints.post_link {
        return sel.matches(&el);
    }

    is_post_path(url, cx) && collapse_text(el).chars().count() >= MIN_TITLE_CHARS
}

/// Whether `url` sits strictly below the blog root, on a segment boundary, and
/// outside the known non-post sections.
fn is_post_path(url: &Url, cx: &ParseContext<'_>) -> bool {
    let root_path = cx.blog_root.path().trim_end_matches('/');
    let path = url.path();
    let below_root = path
        .trim_end_matches('/')
        .strip_prefix(root_path)
        .is_some_and(|rest| rest.starts_with('/'));
    if !below_root {
        return false;
    }

    let lower = path.to_ascii_lowercase();
    !NON_POST_PATHS.iter().any(|p| lower.contains(p))
}

/// Title and date shown next to a post link on an index page.
pub(crate) fn index_hint(el: ElementRef<'_>, url: &Url, date_formats: &[String]) -> LinkHint {
    let title = normalize_text(&collapse_text(el));
    LinkHint {
        title: (!title.is_empty()).then_some(title),
        date: date_near(el, date_formats).or_else(|| dates::date_from_url(url)),
    }
}

/// Search the link and its closest ancestors for a date, stopping at
/// containers that hold a whole listing.
fn date_near(el: ElementRef<'_>, date_formats: &[String]) -> Option<chrono::NaiveDate> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .take(HINT_DATE_LEVELS + 1)
        .take_while(|a| !matches!(a.value().name(), "body" | "html" | "main"))
        .map(collapse_text)
        .take_while(|text| text.len() < HINT_DATE_MAX_TEXT)
        .find_map(|text| dates::parse_date_text(&text, date_formats))
}

// ---------------------------------------------------------------------------
// Post extraction
// ---------------------------------------------------------------------------

/// Generic post extraction; `strip` removes template-specific blocks from the
/// body.
pub(crate) fn post_metadata(
    doc: &Html,
    cx: &ParseContext<'_>,
    hint: &LinkHint,
    strip: impl Fn(ElementRef<'_>) -> bool,
) -> PostMetadata {
    let container = select_container(doc, cx.hints.content.as_ref());

    let title = container
        .and_then(|c| c.select(&H1).next())
        .map(collapse_text)
        .filter(|t| !t.is_empty())
        .or_else(|| meta_content(doc, &OG_TITLE))
        .or_else(|| document_title(doc))
        .or_else(|| hint.title.clone())
        .map(|t| normalize_text(&t))
        .unwrap_or_default();

    let published = dates::date_from_document(doc, &cx.hints.date_formats)
        .or_else(|| dates::date_from_url(cx.page_url))
        .or(hint.date);

    let body_html = container
        .map(|c| extract_body(c, strip))
        .unwrap_or_default();

    PostMetadata {
        title,
        published,
        body_html,
    }
}

pub(crate) fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|c| !c.is_empty())
}

pub(crate) fn document_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE)
        .next()
        .map(collapse_text)
        .filter(|t| !t.is_empty())
}

/// Whether `el`'s `class` attribute matches `re`.
pub(crate) fn class_matches(el: ElementRef<'_>, re: &Regex) -> bool {
    el.value().attr("class").is_some_and(|c| re.is_match(c))
}
