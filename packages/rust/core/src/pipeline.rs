//! End-to-end `convert` pipeline: seed URL → discovery → extraction →
//! ordering → assembly → render.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use blogbook_crawler::{Fetcher, HttpFetcher, ParserRegistry, PostExtractor};
use blogbook_discovery::DiscoveryEngine;
use blogbook_render::{RenderOutput, Renderer, renderer_for};
use blogbook_shared::{BlogSource, BlogbookError, Result, RunConfig, SkippedPost};

use crate::{assembler, ordering};

/// Input for one conversion.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Blog to convert.
    pub source: BlogSource,
    /// Output file; its extension selects the renderer.
    pub output: PathBuf,
    /// Runtime settings merged from the config file and CLI flags.
    pub run: RunConfig,
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub blog_title: String,
    /// Page parser used for the blog.
    pub parser: String,
    /// Unique post links found during discovery.
    pub discovered: usize,
    /// Posts that made it into the document.
    pub extracted: usize,
    /// Posts left out, with the reason.
    pub skipped: Vec<SkippedPost>,
    /// Index pages that failed and were pruned.
    pub failed_index_pages: usize,
    pub output: RenderOutput,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once discovery has finished.
    fn posts_discovered(&self, count: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ConvertResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn posts_discovered(&self, _count: usize) {}
    fn done(&self, _result: &ConvertResult) {}
}

/// The collaborators a conversion runs with.
pub struct Converter {
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<ParserRegistry>,
    renderer: Arc<dyn Renderer>,
}

impl Converter {
    /// HTTP fetcher, built-in parsers and the renderer matching `config.output`.
    pub fn from_config(config: &ConvertConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.run)?;
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(ParserRegistry::new()),
            Arc::from(renderer_for(&config.output, &config.run)),
        ))
    }

    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<ParserRegistry>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            renderer,
        }
    }

    /// Run the full conversion.
    ///
    /// 1. Discover post links across the index pages
    /// 2. Fetch and parse every post concurrently
    /// 3. Order posts oldest first
    /// 4. Assemble the document
    /// 5. Render it to `config.output`
    ///
    /// `cancel` is honoured between stages and during fetches; a cancelled run
    /// writes nothing.
    #[instrument(skip_all, fields(seed = %config.source.seed, output = %config.output.display()))]
    pub async fn convert(
        &self,
        config: &ConvertConfig,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ConvertResult> {
        let start = Instant::now();
        let hints = config.run.hints_for(&config.source.seed);

        // --- Phase 1: Discovery ---
        progress.phase("Discovering posts");
        let engine = DiscoveryEngine::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.registry),
            config.run.max_index_pages,
        );
        let discovery = engine.discover(&config.source, &hints, cancel).await?;
        progress.posts_discovered(discovery.posts.len());

        if discovery.posts.is_empty() {
            return Err(BlogbookError::NoPosts {
                discovered: 0,
                skipped: 0,
            });
        }
        check_cancelled(cancel)?;

        // --- Phase 2: Extraction ---
        progress.phase("Extracting posts");
        let extractor = PostExtractor::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.registry),
            config.run.concurrency as usize,
        );
        let extraction = extractor
            .extract(&discovery.posts, &config.source.seed, &hints, cancel)
            .await?;

        if extraction.records.is_empty() {
            return Err(BlogbookError::NoPosts {
                discovered: discovery.posts.len(),
                skipped: extraction.skipped.len(),
            });
        }
        check_cancelled(cancel)?;

        // --- Phase 3: Ordering ---
        progress.phase("Ordering posts");
        let extracted = extraction.records.len();
        let ordered = ordering::order_posts(extraction.records);
        ordering::validate_order(&ordered)?;

        // --- Phase 4: Assembly ---
        progress.phase("Assembling document");
        let document = assembler::assemble(&discovery.blog_title, &config.source.seed, &ordered)?;
        check_cancelled(cancel)?;

        // --- Phase 5: Render ---
        progress.phase("Rendering document");
        let renderer = Arc::clone(&self.renderer);
        let output_path = config.output.clone();
        let output = tokio::task::spawn_blocking(move || renderer.render(&document, &output_path))
            .await
            .map_err(|e| BlogbookError::render(format!("render task failed: {e}")))??;

        if !extraction.skipped.is_empty() {
            warn!(skipped = extraction.skipped.len(), "some posts were skipped");
        }

        let result = ConvertResult {
            blog_title: discovery.blog_title,
            parser: discovery.parser,
            discovered: discovery.posts.len(),
            extracted,
            skipped: extraction.skipped,
            failed_index_pages: discovery.failed_index_pages.len(),
            output,
            elapsed: start.elapsed(),
        };

        progress.done(&result);

        info!(
            discovered = result.discovered,
            extracted = result.extracted,
            skipped = result.skipped.len(),
            renderer = self.renderer.name(),
            elapsed_ms = result.elapsed.as_millis(),
            "convert pipeline complete"
        );

        Ok(result)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        info!("run cancelled between stages");
        return Err(BlogbookError::Cancelled);
    }
    Ok(())
}
