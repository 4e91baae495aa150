//! Page parser trait and built-in parsers.
//!
//! A parser turns one HTML document into classified links (index pages) or
//! post metadata (post pages). Site-specific parsers are selected by host;
//! [`GenericParser`] handles every other blog. All extraction is best-effort:
//! missing fields fall back to their defaults, nothing here returns an error.

mod cedardb;
mod generic;
mod sirupsen;
mod tigerbeetle;

use scraper::Html;
use url::Url;

use blogbook_shared::{ClassifiedLink, CompiledHints, LinkHint, PostMetadata};

pub use cedardb::CedarDbParser;
pub use generic::GenericParser;
pub use sirupsen::SirupsenParser;
pub use tigerbeetle::TigerBeetleParser;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Inputs shared by every parse call for one blog.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Resolved URL of the page being parsed (after redirects).
    pub page_url: &'a Url,
    /// The blog's seed URL; post candidates must live under its path.
    pub blog_root: &'a Url,
    /// Per-site selector overrides and extra date formats.
    pub hints: &'a CompiledHints,
}

impl ParseContext<'_> {
    /// Whether configured selectors replace link classification heuristics.
    pub fn overrides_links(&self) -> bool {
        self.hints.post_link.is_some() || self.hints.pagination.is_some()
    }
}

/// Extracts links and post content from blog pages.
pub trait PageParser: Send + Sync {
    /// Parser name for tracing.
    fn name(&self) -> &str;

    /// Whether this parser handles the blog at `url`.
    fn detect(&self, url: &Url) -> bool;

    /// Title for the document cover, taken from the seed page.
    fn blog_title(&self, doc: &Html, cx: &ParseContext<'_>) -> Option<String>;

    /// Classify every link on an index page.
    fn extract_links(&self, doc: &Html, cx: &ParseContext<'_>) -> Vec<ClassifiedLink>;

    /// Title, publish date and body of a post page.
    ///
    /// `hint` is what the index page showed next to the link and is used when
    /// the post page itself has no title or date.
    fn extract_post(&self, doc: &Html, cx: &ParseContext<'_>, hint: &LinkHint) -> PostMetadata;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered parsers in priority order.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn PageParser>>,
    fallback: GenericParser,
}

impl ParserRegistry {
    /// Create a registry with the built-in site parsers.
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(TigerBeetleParser),
                Box::new(CedarDbParser),
                Box::new(SirupsenParser),
            ],
            fallback: GenericParser,
        }
    }

    /// Register an additional parser ahead of the built-in ones.
    pub fn register(&mut self, parser: Box<dyn PageParser>) {
        self.parsers.insert(0, parser);
    }

    /// Parser for the blog at `url`; the generic parser when none claims it.
    pub fn detect(&self, url: &Url) -> &dyn PageParser {
        self.parsers
            .iter()
            .find(|p| p.detect(url))
            .map(|p| p.as_ref())
            .unwrap_or(&self.fallback)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
