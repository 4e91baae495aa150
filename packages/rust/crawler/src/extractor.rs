//! Concurrent post extraction.
//!
//! Every discovered post is fetched and parsed in its own task, bounded by a
//! semaphore. Tasks finish in any order; results are put back in discovery
//! order before they are returned. A post that fails is skipped, never fatal.

use std::collections::HashMap;
use std::sync::Arc;

use scraper::Html;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use blogbook_shared::{
    BlogbookError, CompiledHints, PageFetchResult, PostLink, PostRecord, Result, SkippedPost,
};

use crate::fetch::Fetcher;
use crate::parsers::{PageParser, ParseContext, ParserRegistry};

/// Outcome of extracting every discovered post.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Extracted posts in discovery order.
    pub records: Vec<PostRecord>,
    /// Posts that could not be fetched or parsed, in discovery order.
    pub skipped: Vec<SkippedPost>,
}

/// Fetches and parses post pages with bounded concurrency.
pub struct PostExtractor {
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<ParserRegistry>,
    concurrency: usize,
}

impl PostExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher>, registry: Arc<ParserRegistry>, concurrency: usize) -> Self {
        Self {
            fetcher,
            registry,
            concurrency: concurrency.max(1),
        }
    }

    /// Extract all `links`. Returns [`BlogbookError::Cancelled`] if `cancel`
    /// fires first; in-flight requests are aborted.
    #[instrument(skip_all, fields(posts = links.len(), concurrency = self.concurrency))]
    pub async fn extract(
        &self,
        links: &[PostLink],
        blog_root: &Url,
        hints: &CompiledHints,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let blog_root = Arc::new(blog_root.clone());
        let hints = Arc::new(hints.clone());

        let mut tasks = JoinSet::new();
        let mut task_slots = HashMap::new();

        for (slot, link) in links.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let registry = Arc::clone(&self.registry);
            let semaphore = Arc::clone(&semaphore);
            let blog_root = Arc::clone(&blog_root);
            let hints = Arc::clone(&hints);
            let link = link.clone();

            let handle = tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| BlogbookError::Cancelled)?;
                extract_one(fetcher.as_ref(), &registry, &link, &blog_root, &hints).await
            });
            task_slots.insert(handle.id(), slot);
        }

        let mut outcomes: Vec<Option<std::result::Result<PostRecord, String>>> =
            vec![None; links.len()];

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    info!("extraction cancelled");
                    return Err(BlogbookError::Cancelled);
                }
                joined = tasks.join_next_with_id() => joined,
            };

            match joined {
                None => break,
                Some(Ok((id, outcome))) => {
                    if let Some(&slot) = task_slots.get(&id) {
                        outcomes[slot] = Some(outcome.map_err(|e| e.to_string()));
                    }
                }
                Some(Err(e)) => {
                    if let Some(&slot) = task_slots.get(&e.id()) {
                        outcomes[slot] = Some(Err(format!("extraction task failed: {e}")));
                    }
                }
            }
        }

        let mut result = ExtractionResult::default();
        for (link, outcome) in links.iter().zip(outcomes) {
            match outcome {
                Some(Ok(record)) => result.records.push(record),
                Some(Err(reason)) => {
                    warn!(url = %link.url, %reason, "skipping post");
                    result.skipped.push(SkippedPost {
                        url: link.url.clone(),
                        reason,
                    });
                }
                None => result.skipped.push(SkippedPost {
                    url: link.url.clone(),
                    reason: "extraction did not complete".into(),
                }),
            }
        }

        info!(
            extracted = result.records.len(),
            skipped = result.skipped.len(),
            "extraction completed"
        );

        Ok(result)
    }
}

async fn extract_one(
    fetcher: &dyn Fetcher,
    registry: &ParserRegistry,
    link: &PostLink,
    blog_root: &Url,
    hints: &CompiledHints,
) -> Result<PostRecord> {
    let page = fetcher.fetch(&link.url).await?;
    if !page.is_html() {
        return Err(BlogbookError::parse(format!(
            "{} is not HTML ({})",
            link.url,
            page.content_type.as_deref().unwrap_or_default()
        )));
    }

    let parser = registry.detect(blog_root);
    let record = parse_post(parser, &page, blog_root, hints, link);
    debug!(
        url = %link.url,
        parser = parser.name(),
        title = %record.title,
        dated = record.published.is_some(),
        "extracted post"
    );
    Ok(record)
}

/// Parse a fetched post page. Kept synchronous: `Html` is not `Send` and
/// must not live across an await point.
fn parse_post(
    parser: &dyn PageParser,
    page: &PageFetchResult,
    blog_root: &Url,
    hints: &CompiledHints,
    link: &PostLink,
) -> PostRecord {
    let doc = Html::parse_document(&page.html);
    let cx = ParseContext {
        page_url: &page.final_url,
        blog_root,
        hints,
    };
    let meta = parser.extract_post(&doc, &cx, &link.hint);

    PostRecord {
        source_url: page.final_url.clone(),
        title: meta.title,
        published: meta.published,
        body_html: meta.body_html,
        discovery_index: link.discovery_index,
    }
}
