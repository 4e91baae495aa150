//! Core data model for the blog → document pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::identity::UrlKey;

/// TOC/section label for posts without a parsable publish date.
pub const UNDATED_LABEL: &str = "Undated";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The seed URL identifying the blog root/index page. Created once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogSource {
    /// Seed index URL as given by the user.
    pub seed: Url,
}

impl BlogSource {
    pub fn new(seed: Url) -> Self {
        Self { seed }
    }

    /// Parse a user-supplied URL string.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let seed = Url::parse(raw)
            .map_err(|e| crate::BlogbookError::validation(format!("invalid URL '{raw}': {e}")))?;
        match seed.scheme() {
            "http" | "https" => Ok(Self { seed }),
            other => Err(crate::BlogbookError::validation(format!(
                "unsupported URL scheme '{other}' in {raw}"
            ))),
        }
    }
}

/// Raw result of fetching one page. Discarded once parsed.
#[derive(Debug, Clone)]
pub struct PageFetchResult {
    /// Response body.
    pub html: String,
    /// URL after redirects.
    pub final_url: Url,
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
}

impl PageFetchResult {
    /// Whether the body should be treated as HTML.
    ///
    /// A missing content type is given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.to_ascii_lowercase().contains("html"),
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// How a page parser classified a link found on an index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    PostCandidate,
    Pagination,
    Ignored,
}

/// Metadata seen next to a post link on an index page.
///
/// Used as the last-resort fallback when the post page itself lacks a title
/// or a date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// A link found on an index page, resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub url: Url,
    pub kind: LinkKind,
    pub hint: LinkHint,
}

impl ClassifiedLink {
    pub fn new(url: Url, kind: LinkKind) -> Self {
        Self {
            url,
            kind,
            hint: LinkHint::default(),
        }
    }
}

/// A URL believed to reference a post. Identity is [`PostLink::key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostLink {
    /// Absolute URL as first discovered.
    pub url: Url,
    /// Normalized identity used for deduplication.
    pub key: UrlKey,
    /// Position in discovery order (0-based). Used as the ordering tie-break.
    pub discovery_index: usize,
    /// Index-page metadata seen alongside the first occurrence of this link.
    #[serde(default)]
    pub hint: LinkHint,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// What a page parser extracts from a post page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostMetadata {
    /// Empty when no title source yielded text.
    pub title: String,
    /// Absent when no candidate parsed to a valid calendar date.
    pub published: Option<NaiveDate>,
    /// Main content as an HTML fragment.
    pub body_html: String,
}

/// A successfully extracted post. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub source_url: Url,
    pub title: String,
    pub published: Option<NaiveDate>,
    pub body_html: String,
    pub discovery_index: usize,
}

/// A [`PostRecord`] with its final position in the document (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedPostRecord {
    pub ordinal: usize,
    pub record: PostRecord,
}

/// A post that could not be fetched or parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedPost {
    pub url: Url,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A single entry in the generated table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    /// Formatted date, or [`UNDATED_LABEL`].
    pub display_date: String,
    pub undated: bool,
    /// In-document anchor of the section this entry points to.
    pub target: String,
}

/// Title page of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    pub title: String,
    pub subtitle: String,
    pub source_url: String,
}

/// One laid-out post section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// 1-based position in reading order.
    pub ordinal: usize,
    /// Anchor id, unique within the document.
    pub anchor: String,
    pub title: String,
    pub display_date: String,
    pub source_url: String,
    /// Sanitized body fragment.
    pub body_html: String,
}

/// The root artifact handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub cover: Cover,
    pub toc: Vec<TocEntry>,
    pub sections: Vec<Section>,
}

/// Format a publish date for display (`January 10, 2024`).
pub fn display_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%B %d, %Y").to_string(),
        None => UNDATED_LABEL.to_string(),
    }
}
