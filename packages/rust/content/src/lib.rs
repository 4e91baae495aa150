//! HTML content handling for blog posts.
//!
//! Locates the article container on a post page, serializes it without page
//! chrome, and cleans the resulting fragment for print (see [`sanitize_body`]).

mod sanitize;
mod serialize;
mod text;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use serialize::WriteOptions;

pub use sanitize::sanitize_body;
pub use text::normalize_text;

/// Page chrome dropped from every extracted body.
static CHROME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("nav, header, footer, aside, script, style, noscript")
        .expect("valid selector")
});

/// Content containers tried in priority order after a site hint.
static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "article",
        "main",
        "[role=\"main\"]",
        "div.post-content",
        "div.article-content",
        "div.entry-content",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").expect("valid selector"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

static GENERIC_CONTAINER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content|post|article").expect("valid regex"));

/// Find the element holding the article body.
///
/// `preferred` (a site's `content_selector`) wins when it matches. Otherwise
/// semantic containers, then `div`s whose class or id looks like content,
/// then `<body>`.
pub fn select_container<'a>(doc: &'a Html, preferred: Option<&Selector>) -> Option<ElementRef<'a>> {
    if let Some(el) = preferred.and_then(|sel| doc.select(sel).next()) {
        return Some(el);
    }

    if let Some(el) = CONTAINERS.iter().find_map(|sel| doc.select(sel).next()) {
        return Some(el);
    }

    for attr in ["class", "id"] {
        let found = doc.select(&DIV).find(|d| {
            d.value()
                .attr(attr)
                .is_some_and(|v| GENERIC_CONTAINER_RE.is_match(v))
        });
        if found.is_some() {
            return found;
        }
    }

    doc.select(&BODY).next()
}

/// Serialize a content container with page chrome removed.
///
/// Elements for which `strip` returns true are removed along with their
/// subtree; site parsers use this for author blocks and related-post grids.
/// `<body>` is unwrapped; any other container keeps its own tag.
pub fn extract_body(container: ElementRef<'_>, strip: impl Fn(ElementRef<'_>) -> bool) -> String {
    let mut skip: HashSet<_> = container.select(&CHROME).map(|el| el.id()).collect();
    skip.extend(
        container
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| strip(*el))
            .map(|el| el.id()),
    );

    let opts = WriteOptions {
        skip,
        ..WriteOptions::default()
    };
    if container.value().name() == "body" {
        serialize::inner_html(container, &opts)
    } else {
        serialize::outer_html(container, &opts)
    }
}

/// Text content of an element with whitespace runs collapsed to one space.
pub fn collapse_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for piece in el.text() {
        for word in piece.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_selector_wins() {
        let doc = Html::parse_document(
            r#"<body><article><p>teaser</p></article><div class="prose"><p>body</p></div></body>"#,
        );
        let hint = Selector::parse(".prose").unwrap();
        let el = select_container(&doc, Some(&hint)).unwrap();
        assert_eq!(el.value().attr("class"), Some("prose"));
    }

    #[test]
    fn article_before_main() {
        let doc = Html::parse_document(
            "<body><main><article><p>post</p></article><p>more</p></main></body>",
        );
        let el = select_container(&doc, None).unwrap();
        assert_eq!(el.value().name(), "article");
    }

    #[test]
    fn content_div_then_body() {
        let doc = Html::parse_document(
            r#"<body><div id="wrapper"><div class="the-post-body"><p>x</p></div></div></body>"#,
        );
        let el = select_container(&doc, None).unwrap();
        assert_eq!(el.value().attr("class"), Some("the-post-body"));

        let doc = Html::parse_document("<body><p>bare</p></body>");
        let el = select_container(&doc, None).unwrap();
        assert_eq!(el.value().name(), "body");
    }

    #[test]
    fn extract_body_drops_chrome_and_stripped() {
        let doc = Html::parse_document(
            r#"<body><article>
                <header>site header</header>
                <p>keep me</p>
                <div class="author">by someone</div>
                <script>track()</script>
                <footer>footer</footer>
            </article></body>"#,
        );
        let el = select_container(&doc, None).unwrap();
        let html = extract_body(el, |e| e.value().attr("class") == Some("author"));

        assert!(html.starts_with("<article>"));
        assert!(html.contains("keep me"));
        assert!(!html.contains("site header"));
        assert!(!html.contains("by someone"));
        assert!(!html.contains("track()"));
        assert!(!html.contains("footer"));
    }

    #[test]
    fn body_container_is_unwrapped() {
        let doc = Html::parse_document("<body><nav>menu</nav><p>text</p></body>");
        let body = doc.select(&BODY).next().unwrap();
        assert_eq!(extract_body(body, |_| false), "<p>text</p>");
    }

    #[test]
    fn collapse_text_joins_words() {
        let doc = Html::parse_fragment("<div>  Hello\n  <b>big</b>\tworld </div>");
        let el = doc.select(&DIV).next().unwrap();
        assert_eq!(collapse_text(el), "Hello big world");
    }
}
