//! sirupsen.com parser.
//!
//! The home page is a plain `<li>` list of `Title  Mon YYYY` entries mixed with
//! external links (talks, podcasts) that are not posts.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use blogbook_content::{collapse_text, normalize_text};
use blogbook_shared::{ClassifiedLink, LinkHint, LinkKind, PostMetadata, host_key};

use super::generic::{self, ANCHORS, GenericParser};
use super::{PageParser, ParseContext};

const HOST: &str = "sirupsen.com";

const MIN_TITLE_CHARS: usize = 3;

static LIST_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid selector"));

static MONTH_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z]{3})\s+(\d{4})\b").expect("valid regex"));

static STRIP_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)author|byline|meta|subscribe|newsletter|signup|related|also-like|recommended")
        .expect("valid regex")
});

/// Parser for Simon Eskildsen's blog.
pub struct SirupsenParser;

impl PageParser for SirupsenParser {
    fn name(&self) -> &str {
        "sirupsen"
    }

    fn detect(&self, url: &Url) -> bool {
        host_key(url) == HOST
    }

    fn blog_title(&self, _doc: &Html, _cx: &ParseContext<'_>) -> Option<String> {
        Some("Simon Eskildsen's Blog".into())
    }

    fn extract_links(&self, doc: &Html, cx: &ParseContext<'_>) -> Vec<ClassifiedLink> {
        if cx.overrides_links() {
            return GenericParser.extract_links(doc, cx);
        }

        let mut links: Vec<ClassifiedLink> = doc
            .select(&LIST_ITEM)
            .filter_map(|li| list_entry(li, cx))
            .collect();
        links.extend(generic::pagination_links(doc, cx));
        links
    }

    fn extract_post(&self, doc: &Html, cx: &ParseContext<'_>, hint: &LinkHint) -> PostMetadata {
        generic::post_metadata(doc, cx, hint, |el| {
            el.value().name() == "form" || generic::class_matches(el, &STRIP_CLASS_RE)
        })
    }
}

fn list_entry(li: ElementRef<'_>, cx: &ParseContext<'_>) -> Option<ClassifiedLink> {
    let anchor = li.select(&ANCHORS).next()?;
    let url = generic::resolve_href(anchor, cx.page_url)?;
    if !generic::same_site(&url, cx) || url.path().trim_end_matches('/').is_empty() {
        return None;
    }

    let title = collapse_text(anchor);
    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }

    let mut link = ClassifiedLink::new(url, LinkKind::PostCandidate);
    link.hint = LinkHint {
        title: Some(normalize_text(&title)),
        date: month_year(&collapse_text(li)),
    };
    Some(link)
}

/// `Dec 2016` as the first of that month.
fn month_year(text: &str) -> Option<NaiveDate> {
    MONTH_YEAR_RE.captures_iter(text).find_map(|c| {
        let month = match c[1].to_ascii_lowercase().as_str() {
            "jan" => 1,
            "feb" => 2,
            "mar" => 3,
            "apr" => 4,
            "may" => 5,
            "jun" => 6,
            "jul" => 7,
            "aug" => 8,
            "sep" => 9,
            "oct" => 10,
            "nov" => 11,
            "dec" => 12,
            _ => return None,
        };
        NaiveDate::from_ymd_opt(c[2].parse().ok()?, month, 1)
    })
}
