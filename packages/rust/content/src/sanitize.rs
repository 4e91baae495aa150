//! Body sanitation applied when a post is laid out in the document.
//!
//! Removes page chrome that survived container selection (subscribe forms,
//! share bars, related-post cards, comment sections), drops the leading `h1`
//! (the section heading replaces it), resolves relative links against the
//! post URL and normalizes text.

use std::collections::HashSet;
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::trace;
use url::Url;

use crate::collapse_text;
use crate::serialize::{self, WriteOptions};

/// Blocks longer than this are never removed on text heuristics alone.
const SHORT_BLOCK_CHARS: usize = 300;

/// Tags removed together with their subtree.
const REMOVED_TAGS: &[&str] = &[
    "form", "iframe", "button", "input", "select", "textarea", "script", "style", "noscript",
    "object", "embed",
];

/// Tags inspected for call-to-action text.
const TEXT_CHECKED_TAGS: &[&str] = &["div", "section", "aside", "p", "h1", "h2", "h3", "span"];

/// A short block whose text starts with one of these is a call to action.
const CTA_PREFIXES: &[&str] = &[
    "subscribe",
    "sign up",
    "you might also like",
    "read more in",
    "view all",
    "close editor",
    "run query",
    "query stats",
    "try it in",
];

/// A short `p`/`div`/`section` containing one of these is a call to action.
const ACTION_PHRASES: &[&str] = &[
    "if you liked this",
    "consider subscribing",
    "subscribe to",
    "email updates",
    "sharing it on",
    "share this post",
    "follow me on",
    "here's a preview",
    "related post",
    "continue reading",
];

const PREVIEW_PHRASES: &[&str] = &["continue reading", "read more", "related:", "see also:"];

/// Class/id tokens marking non-article blocks. Matched against whole
/// `-`/`_`-separated words so `share` does not hit `shared-memory`.
static UNWANTED_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    let words = [
        "subscribe", "subscription", "newsletter", "signup", "sign-up", "email-form",
        "mailchimp", "related", "you-might", "also-like", "recommended", "more-posts",
        "suggested", "read-more", "readmore", "more-from", "other-posts", "next-posts",
        "previous-posts", "share", "sharing", "social", "twitter", "facebook", "linkedin",
        "author-bio", "author-info", "about-author", "post-author", "byline", "comment",
        "disqus", "prev-next", "pagination", "nav-post", "post-nav", "editor", "playground",
        "code-runner", "run-button", "try-it", "demo-controls", "toolbar", "action-bar",
        "query-stats", "execution-stats", "cta", "call-to-action", "promo", "banner",
        "waitlist",
    ];
    Regex::new(&format!(r"(?i)(?:^|[\s_-])(?:{})s?(?:$|[\s_-])", words.join("|")))
        .expect("unwanted attribute regex")
});

/// Clean a post body fragment for print.
pub fn sanitize_body(fragment: &str, base_url: &Url) -> String {
    let doc = Html::parse_fragment(fragment);
    let root = doc.root_element();
    let skip = removal_set(root);
    trace!(removed = skip.len(), url = %base_url, "sanitized post body");

    let opts = WriteOptions {
        skip,
        base_url: Some(base_url),
        rewrite_text: true,
    };
    serialize::inner_html(root, &opts).trim().to_string()
}

/// Collect the ids of every element to drop from `root`'s subtree.
fn removal_set(root: ElementRef<'_>) -> HashSet<NodeId> {
    let mut skip = HashSet::new();
    let mut first_h1_seen = false;

    for node in root.descendants().skip(1) {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if node.ancestors().any(|a| skip.contains(&a.id())) {
            continue;
        }

        let name = el.value().name();
        if name == "h1" && !first_h1_seen {
            first_h1_seen = true;
            skip.insert(node.id());
            continue;
        }

        if is_unwanted(el) {
            skip.insert(node.id());
        }
    }

    skip
}

fn is_unwanted(el: ElementRef<'_>) -> bool {
    let value = el.value();
    let name = value.name();

    if REMOVED_TAGS.contains(&name) || value.attr("onclick").is_some() {
        return true;
    }

    let attr_hit = |attr: &str| value.attr(attr).is_some_and(|v| UNWANTED_ATTR_RE.is_match(v));
    if attr_hit("class") || attr_hit("id") {
        return true;
    }

    if name == "blockquote" {
        return is_preview_card(el);
    }

    if !TEXT_CHECKED_TAGS.contains(&name) {
        return false;
    }

    let text = collapse_text(el).to_lowercase();
    if text.chars().count() >= SHORT_BLOCK_CHARS {
        return false;
    }

    if CTA_PREFIXES.iter().any(|p| text.starts_with(p)) {
        return true;
    }

    matches!(name, "p" | "div" | "section") && ACTION_PHRASES.iter().any(|p| text.contains(p))
}

/// Inline-styled blockquotes used as "related post" cards.
fn is_preview_card(el: ElementRef<'_>) -> bool {
    let style = el.value().attr("style").unwrap_or_default();
    let styled_card = style.contains("border-left") && style.contains("padding");
    if !styled_card {
        return false;
    }

    let text = collapse_text(el).to_lowercase();
    if PREVIEW_PHRASES.iter().any(|p| text.contains(p)) {
        return true;
    }

    el.children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == "p")
        .and_then(|p| p.value().attr("style"))
        .is_some_and(|s| {
            s.contains("font-weight") && (s.contains("600") || s.to_lowercase().contains("bold"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post/").unwrap()
    }

    #[test]
    fn removes_chrome_blocks() {
        let html = r#"
            <article>
              <h1>Title</h1>
              <p>Real content here.</p>
              <div class="share-buttons">Share on X</div>
              <div id="comments">42 comments</div>
              <form><input type="email"></form>
              <iframe src="https://youtube.com/embed/x"></iframe>
              <p>More content.</p>
            </article>"#;
        let out = sanitize_body(html, &base());

        assert!(out.contains("Real content here."));
        assert!(out.contains("More content."));
        assert!(!out.contains("Title"));
        assert!(!out.contains("Share on X"));
        assert!(!out.contains("42 comments"));
        assert!(!out.contains("<form"));
        assert!(!out.contains("<iframe"));
    }

    #[test]
    fn unwanted_words_match_whole_tokens() {
        let html = r#"<div class="shared-memory-diagram"><p>kept</p></div><div class="post-footer cta">gone</div>"#;
        let out = sanitize_body(html, &base());
        assert!(out.contains("kept"));
        assert!(!out.contains("gone"));
    }

    #[test]
    fn short_call_to_action_blocks_are_dropped() {
        let html = r#"
            <p>Body text.</p>
            <p>If you liked this, consider subscribing to my newsletter.</p>
            <h3>Subscribe to updates</h3>"#;
        let out = sanitize_body(html, &base());
        assert!(out.contains("Body text."));
        assert!(!out.contains("If you liked this"));
        assert!(!out.contains("Subscribe to updates"));
    }

    #[test]
    fn long_paragraph_mentioning_subscribe_is_kept() {
        let long = "The subscriber pattern ".repeat(20);
        let html = format!("<p>{long} and continue reading the log.</p>");
        let out = sanitize_body(&html, &base());
        assert!(out.contains("continue reading the log"));
    }

    #[test]
    fn only_first_h1_is_removed() {
        let out = sanitize_body("<h1>Title</h1><p>x</p><h1>Second</h1>", &base());
        assert!(!out.contains("Title"));
        assert!(out.contains("Second"));
    }

    #[test]
    fn preview_blockquote_is_dropped() {
        let html = r#"
            <blockquote><p>A real quote.</p></blockquote>
            <blockquote style="border-left: 2px solid; padding: 1em">
              <p style="font-weight: 600">Another Post</p><p>Continue reading</p>
            </blockquote>"#;
        let out = sanitize_body(html, &base());
        assert!(out.contains("A real quote."));
        assert!(!out.contains("Another Post"));
    }

    #[test]
    fn links_are_resolved_and_text_normalized() {
        let html = "<p>See <a href=\"../other/\">this</a> \u{2014} it\u{2019}s 10⁶ ops.</p>\
                    <img src=\"fig.png\">";
        let out = sanitize_body(html, &base());
        assert!(out.contains(r#"href="https://example.com/blog/other/""#));
        assert!(out.contains(r#"src="https://example.com/blog/post/fig.png""#));
        assert!(out.contains("it's 10<sup>6</sup> ops"));
    }

    #[test]
    fn code_blocks_keep_tex() {
        let html = r"<pre><code>let s = \(x^2\);</code></pre><p>\(x^2\)</p>";
        let out = sanitize_body(html, &base());
        assert!(out.contains(r"<code>let s = \(x^2\);</code>"));
        assert!(out.contains("<p>x<sup>2</sup></p>"));
    }
}
