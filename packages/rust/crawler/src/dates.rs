//! Publish date extraction.
//!
//! Candidates are tried in order of reliability: structured metadata, JSON-LD,
//! `<time datetime>`, then visible date text. Each candidate string is run
//! through [`parse_date_text`]; the first valid calendar date wins.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use blogbook_content::collapse_text;

/// ISO 8601 timestamps that RFC 3339 rejects: no offset, or `+0000`.
const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

const ISO_DATETIME_OFFSET_FORMATS: &[&str] =
    &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Visible text longer than this is not treated as a date label.
const MAX_DATE_TEXT: usize = 200;

/// Textual date shapes found in blog templates, with the chrono formats to try
/// on a normalized match (commas, ordinal suffixes and dots removed).
static TEXT_PATTERNS: LazyLock<Vec<(Regex, &'static [&'static str])>> = LazyLock::new(|| {
    let table: [(&str, &'static [&'static str]); 4] = [
        (r"\b\d{4}-\d{1,2}-\d{1,2}(?:T|\b)", &["%Y-%m-%d", "%Y-%m-%dT"]),
        (r"\b\d{1,2}/\d{1,2}/\d{4}\b", &["%d/%m/%Y", "%m/%d/%Y"]),
        (
            r"\b[A-Z][a-z]+\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}\b",
            &["%B %d %Y"],
        ),
        (
            r"\b\d{1,2}(?:st|nd|rd|th)?\s+[A-Z][a-z]+\.?,?\s+\d{4}\b",
            &["%d %B %Y"],
        ),
    ];
    table
        .into_iter()
        .map(|(re, formats)| (Regex::new(re).expect("valid regex"), formats))
        .collect()
});

static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)(?:st|nd|rd|th)\b").expect("valid regex"));

static URL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(\d{4})/(\d{2})/(\d{2})(?:/|$)|/(\d{4})-(\d{2})-(\d{2})-").expect("valid regex")
});

/// `<meta>` and microdata sources, most specific first.
static META_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"meta[property="article:published_time"]"#,
        r#"meta[itemprop="datePublished"]"#,
        r#"[itemprop="datePublished"]"#,
        r#"meta[name="date"]"#,
        r#"meta[name="pubdate"]"#,
        r#"meta[name="publish-date"]"#,
        r#"meta[name="DC.date.issued"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

static TIME_DATETIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").expect("valid selector"));

static VISIBLE_DATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"time, [class*="date"], .published, .post-meta, .meta"#)
        .expect("valid selector")
});

/// Parse a date out of free text.
///
/// Tries RFC 3339 and other ISO timestamps, then `extra_formats` against the
/// whole trimmed text, then every textual date shape found anywhere in the text.
pub fn parse_date_text(text: &str, extra_formats: &[String]) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    if let Some(date) = parse_iso_datetime(trimmed) {
        return Some(date);
    }

    if let Some(date) = extra_formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(trimmed, f).ok())
    {
        return Some(date);
    }

    TEXT_PATTERNS.iter().find_map(|(re, formats)| {
        re.find_iter(trimmed).find_map(|m| {
            let cleaned = clean_match(m.as_str());
            formats
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(&cleaned, f).ok())
        })
    })
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDate> {
    ISO_DATETIME_OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(text, f).ok())
        .map(|dt| dt.date_naive())
        .or_else(|| {
            ISO_DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| dt.date())
        })
}

fn clean_match(raw: &str) -> String {
    let no_ordinals = ORDINAL_RE.replace_all(raw, "$1");
    no_ordinals
        .replace([',', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Date encoded in a post URL (`/2024/01/10/` or `/2024-01-10-slug`).
pub fn date_from_url(url: &Url) -> Option<NaiveDate> {
    URL_DATE_RE.captures_iter(url.path()).find_map(|c| {
        let (y, m, d) = match (c.get(1), c.get(4)) {
            (Some(_), _) => (c.get(1)?, c.get(2)?, c.get(3)?),
            (None, Some(_)) => (c.get(4)?, c.get(5)?, c.get(6)?),
            _ => return None,
        };
        NaiveDate::from_ymd_opt(
            y.as_str().parse().ok()?,
            m.as_str().parse().ok()?,
            d.as_str().parse().ok()?,
        )
    })
}

/// Publish date found in a post page's markup.
pub fn date_from_document(doc: &Html, extra_formats: &[String]) -> Option<NaiveDate> {
    let parse = |s: &str| parse_date_text(s, extra_formats);

    let from_meta = META_SELECTORS.iter().find_map(|sel| {
        doc.select(sel).find_map(|el| {
            let v = el.value();
            v.attr("content")
                .or_else(|| v.attr("datetime"))
                .and_then(parse)
                .or_else(|| parse(&collapse_text(el)))
        })
    });
    if from_meta.is_some() {
        return from_meta;
    }

    let from_json_ld = doc
        .select(&JSON_LD)
        .filter_map(|el| serde_json::from_str::<serde_json::Value>(&el.text().collect::<String>()).ok())
        .find_map(|v| json_date_published(&v).and_then(parse));
    if from_json_ld.is_some() {
        return from_json_ld;
    }

    let from_time = doc
        .select(&TIME_DATETIME)
        .find_map(|el| el.value().attr("datetime").and_then(parse));
    if from_time.is_some() {
        return from_time;
    }

    doc.select(&VISIBLE_DATE).find_map(|el| {
        let text = collapse_text(el);
        (text.len() <= MAX_DATE_TEXT).then(|| parse(&text)).flatten()
    })
}

/// Find `datePublished` anywhere in a JSON-LD value (`@graph` arrays included).
fn json_date_published(value: &serde_json::Value) -> Option<&str> {
    match value {
        serde_json::Value::Object(map) => map
            .get("datePublished")
            .and_then(|v| v.as_str())
            .or_else(|| map.values().find_map(json_date_published)),
        serde_json::Value::Array(items) => items.iter().find_map(json_date_published),
        _ => None,
    }
}
