//! Post discovery across paginated blog index pages.
//!
//! Starting from the seed URL, the engine walks index pages breadth-first
//! through pagination links. Every index URL is fetched at most once (tracked
//! by normalized identity), so cyclic or duplicated pagination terminates.
//! Post links are accumulated in discovery order and deduplicated the same way.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use blogbook_crawler::{Fetcher, PageParser, ParseContext, ParserRegistry};
use blogbook_shared::{
    BlogSource, BlogbookError, ClassifiedLink, CompiledHints, LinkKind, PageFetchResult,
    PostLink, Result, UrlKey, host_key,
};

// ---------------------------------------------------------------------------
// DiscoveryResult
// ---------------------------------------------------------------------------

/// An index page that could not be fetched; its pagination branch is pruned.
#[derive(Debug, Clone)]
pub struct IndexFailure {
    pub url: Url,
    pub reason: String,
}

/// Outcome of walking a blog's index pages.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    /// Title for the document cover.
    pub blog_title: String,
    /// Name of the page parser used for this blog.
    pub parser: String,
    /// Deduplicated post links in discovery order.
    pub posts: Vec<PostLink>,
    /// Index pages fetched successfully.
    pub index_pages_visited: usize,
    /// Fetches that redirected to an index page already parsed.
    pub duplicate_index_pages: usize,
    /// Index pages that failed after the seed.
    pub failed_index_pages: Vec<IndexFailure>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Walks index pages and collects post links.
pub struct DiscoveryEngine {
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<ParserRegistry>,
    max_index_pages: usize,
}

/// Mutable walk state for one discovery run.
#[derive(Default)]
struct Walk {
    pending: VecDeque<Url>,
    /// Identities of every index URL ever queued, fetched or not.
    seen_index: HashSet<UrlKey>,
    /// Index pages already parsed, under both the requested and final URL.
    parsed_index: HashSet<UrlKey>,
    seen_posts: HashSet<UrlKey>,
    posts: Vec<PostLink>,
    visited: usize,
    duplicates: usize,
    failed: Vec<IndexFailure>,
}

impl Walk {
    fn enqueue_index(&mut self, url: Url) {
        let key = UrlKey::new(&url);
        if !self.seen_posts.contains(&key) && self.seen_index.insert(key) {
            self.pending.push_back(url);
        }
    }

    /// Record a post link. A post outranks an index entry for the same URL
    /// that is still queued; a page already parsed as an index stays one.
    fn add_post(&mut self, link: ClassifiedLink) {
        let key = UrlKey::new(&link.url);
        if self.parsed_index.contains(&key) || !self.seen_posts.insert(key.clone()) {
            return;
        }
        if self.seen_index.remove(&key) {
            self.pending.retain(|u| UrlKey::new(u) != key);
        }
        self.posts.push(PostLink {
            url: link.url,
            key,
            discovery_index: self.posts.len(),
            hint: link.hint,
        });
    }
}

impl DiscoveryEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, registry: Arc<ParserRegistry>, max_index_pages: usize) -> Self {
        Self {
            fetcher,
            registry,
            max_index_pages: max_index_pages.max(1),
        }
    }

    /// Discover every post reachable from `source` through pagination.
    ///
    /// Fails only when the seed page is unreachable or not HTML, or on
    /// cancellation. Later index failures are recorded and skipped.
    #[instrument(skip_all, fields(seed = %source.seed))]
    pub async fn discover(
        &self,
        source: &BlogSource,
        hints: &CompiledHints,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult> {
        let parser = self.registry.detect(&source.seed);
        info!(
            parser = parser.name(),
            max_index_pages = self.max_index_pages,
            "starting discovery"
        );

        let mut walk = Walk::default();
        walk.enqueue_index(source.seed.clone());
        let mut blog_title = None;

        while let Some(url) = walk.pending.pop_front() {
            if cancel.is_cancelled() {
                return Err(BlogbookError::Cancelled);
            }
            let requested = UrlKey::new(&url);
            if walk.parsed_index.contains(&requested) {
                continue;
            }
            if walk.visited >= self.max_index_pages {
                warn!(
                    limit = self.max_index_pages,
                    remaining = walk.pending.len() + 1,
                    "index page limit reached, stopping discovery"
                );
                break;
            }

            let is_seed = blog_title.is_none();
            let page = tokio::select! {
                _ = cancel.cancelled() => return Err(BlogbookError::Cancelled),
                fetched = self.fetcher.fetch(&url) => fetched,
            };

            let page = match check_page(page, &url) {
                Ok(page) => page,
                Err(e) if is_seed => return Err(seed_error(e, &url)),
                Err(e) => {
                    warn!(%url, error = %e, "index page failed, pruning branch");
                    walk.failed.push(IndexFailure {
                        url,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // A redirect target is the same index page.
            let landed = UrlKey::new(&page.final_url);
            if landed != requested && walk.parsed_index.contains(&landed) {
                debug!(
                    %url,
                    final_url = %page.final_url,
                    "redirected to an index page already parsed"
                );
                walk.duplicates += 1;
                continue;
            }
            walk.visited += 1;
            walk.parsed_index.insert(requested);
            walk.seen_index.insert(landed.clone());
            walk.parsed_index.insert(landed);

            let parsed = parse_index(parser, &page, &source.seed, hints);
            if is_seed {
                blog_title = Some(
                    hints
                        .blog_title
                        .clone()
                        .or(parsed.title)
                        .unwrap_or_else(|| host_key(&source.seed)),
                );
            }

            let (mut new_posts, mut new_pages) = (0usize, 0usize);
            for link in parsed.links {
                match link.kind {
                    LinkKind::PostCandidate => {
                        let before = walk.posts.len();
                        walk.add_post(link);
                        new_posts += walk.posts.len() - before;
                    }
                    LinkKind::Pagination => {
                        let before = walk.pending.len();
                        walk.enqueue_index(link.url);
                        new_pages += walk.pending.len() - before;
                    }
                    LinkKind::Ignored => {}
                }
            }
            debug!(%url, new_posts, new_pages, "index page parsed");
        }

        let result = DiscoveryResult {
            blog_title: blog_title.unwrap_or_else(|| host_key(&source.seed)),
            parser: parser.name().to_string(),
            posts: walk.posts,
            index_pages_visited: walk.visited,
            duplicate_index_pages: walk.duplicates,
            failed_index_pages: walk.failed,
        };

        info!(
            posts = result.posts.len(),
            index_pages = result.index_pages_visited,
            duplicates = result.duplicate_index_pages,
            failed = result.failed_index_pages.len(),
            "discovery completed"
        );

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct ParsedIndex {
    title: Option<String>,
    links: Vec<ClassifiedLink>,
}

fn check_page(page: Result<PageFetchResult>, url: &Url) -> Result<PageFetchResult> {
    let page = page?;
    if !page.is_html() {
        return Err(BlogbookError::NotHtml {
            url: url.to_string(),
            content_type: page.content_type.unwrap_or_default(),
        });
    }
    Ok(page)
}

/// Fetch failures on the seed become [`BlogbookError::SeedUnreachable`].
fn seed_error(err: BlogbookError, url: &Url) -> BlogbookError {
    match err {
        BlogbookError::NotHtml { .. } | BlogbookError::Cancelled => err,
        other => BlogbookError::SeedUnreachable {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Parse an index page. Synchronous so the `Html` tree never crosses an await.
fn parse_index(
    parser: &dyn PageParser,
    page: &PageFetchResult,
    blog_root: &Url,
    hints: &CompiledHints,
) -> ParsedIndex {
    let doc = Html::parse_document(&page.html);
    let cx = ParseContext {
        page_url: &page.final_url,
        blog_root,
        hints,
    };
    ParsedIndex {
        title: parser.blog_title(&doc, &cx),
        links: parser.extract_links(&doc, &cx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use blogbook_crawler::HttpFetcher;
    use blogbook_shared::RunConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(
            format!("<html><head><title>Test Blog</title></head><body>{body}</body></html>"),
            "text/html; charset=utf-8",
        )
    }

    fn engine(max_pages: usize) -> DiscoveryEngine {
        let config = RunConfig {
            rate_limit_ms: 0,
            ..RunConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        DiscoveryEngine::new(Arc::new(fetcher), Arc::new(ParserRegistry::new()), max_pages)
    }

    fn source(server: &MockServer, p: &str) -> BlogSource {
        BlogSource::new(Url::parse(&format!("{}{p}", server.uri())).unwrap())
    }

    async fn discover(engine: &DiscoveryEngine, source: &BlogSource) -> Result<DiscoveryResult> {
        engine
            .discover(source, &CompiledHints::default(), &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn follows_pagination_and_dedups_posts() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/blog/"))
            .respond_with(html(
                r#"<ul>
                    <li><a href="/blog/first-post">The first post ever</a></li>
                    <li><a href="/blog/second-post/">The second post here</a></li>
                </ul>
                <a href="/blog/page/2/">Older posts</a>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        // Page 2 repeats a post without its trailing slash and links back to
        // both index pages.
        Mock::given(method("GET"))
            .and(path("/blog/page/2/"))
            .respond_with(html(
                r#"<ul>
                    <li><a href="/blog/second-post">The second post here</a></li>
                    <li><a href="/blog/third-post">A third post, older</a></li>
                </ul>
                <a href="/blog/">Newer posts</a>
                <a href="/blog/page/2">2</a>
                <a href="/blog/page/1/" rel="next">Next</a>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/blog/page/1/"))
            .respond_with(html(r#"<a href="/blog/page/2/">Older posts</a>"#))
            .expect(1)
            .mount(&server)
            .await;

        let result = discover(&engine(50), &source(&server, "/blog/")).await.unwrap();

        let paths: Vec<_> = result.posts.iter().map(|p| p.url.path()).collect();
        assert_eq!(
            paths,
            vec!["/blog/first-post", "/blog/second-post/", "/blog/third-post"]
        );
        let indices: Vec<_> = result.posts.iter().map(|p| p.discovery_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(result.index_pages_visited, 3);
        assert_eq!(result.blog_title, "Test Blog");
        assert!(result.failed_index_pages.is_empty());
    }

    #[tokio::test]
    async fn seed_unreachable_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(path("/blog/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = discover(&engine(50), &source(&server, "/blog/")).await.unwrap_err();
        assert!(matches!(err, BlogbookError::SeedUnreachable { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn seed_not_html_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let err = discover(&engine(50), &source(&server, "/feed")).await.unwrap_err();
        assert!(matches!(err, BlogbookError::NotHtml { .. }));
    }

    #[tokio::test]
    async fn failed_index_page_is_pruned() {
        let server = MockServer::start().await;
        Mock::given(path("/blog/"))
            .respond_with(html(
                r#"<a href="/blog/only-post">The only reachable post</a>
                   <a href="/blog/page/2/">Older posts</a>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(path("/blog/page/2/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = discover(&engine(50), &source(&server, "/blog/")).await.unwrap();
        assert_eq!(result.posts.len(), 1);
        assert_eq!(result.index_pages_visited, 1);
        assert_eq!(result.failed_index_pages.len(), 1);
        assert!(result.failed_index_pages[0].reason.contains("500"));
    }

    /// Every page links to the next one, forever.
    struct EndlessFetcher {
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for EndlessFetcher {
        async fn fetch(&self, url: &Url) -> Result<PageFetchResult> {
            self.fetched.lock().unwrap().push(url.to_string());
            let n: u32 = url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            Ok(PageFetchResult {
                html: format!(
                    r#"<a href="/blog/post-{n}">Post number {n} of many</a>
                       <a href="/blog/page/{}">Older posts</a>"#,
                    n + 1
                ),
                final_url: url.clone(),
                status: 200,
                content_type: None,
            })
        }
    }

    #[tokio::test]
    async fn index_page_limit_bounds_the_walk() {
        let fetcher = Arc::new(EndlessFetcher {
            fetched: Mutex::new(Vec::new()),
        });
        let engine = DiscoveryEngine::new(fetcher.clone(), Arc::new(ParserRegistry::new()), 4);
        let source = BlogSource::parse("https://example.com/blog/").unwrap();

        let result = engine
            .discover(&source, &CompiledHints::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.index_pages_visited, 4);
        assert_eq!(result.posts.len(), 4);
        assert_eq!(fetcher.fetched.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let fetcher = Arc::new(EndlessFetcher {
            fetched: Mutex::new(Vec::new()),
        });
        let engine = DiscoveryEngine::new(fetcher.clone(), Arc::new(ParserRegistry::new()), 4);
        let source = BlogSource::parse("https://example.com/blog/").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine
            .discover(&source, &CompiledHints::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BlogbookError::Cancelled));
        assert!(fetcher.fetched.lock().unwrap().is_empty());
    }

    /// Fixed pages keyed by path, each with the path it finally lands on.
    struct StaticBlog {
        pages: Vec<(&'static str, &'static str, &'static str)>,
        fetched: Mutex<Vec<String>>,
    }

    impl StaticBlog {
        fn new(pages: Vec<(&'static str, &'static str, &'static str)>) -> Self {
            Self {
                pages,
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StaticBlog {
        async fn fetch(&self, url: &Url) -> Result<PageFetchResult> {
            self.fetched.lock().unwrap().push(url.path().to_string());
            let (_, landed, body) = self
                .pages
                .iter()
                .find(|(p, _, _)| *p == url.path())
                .ok_or_else(|| BlogbookError::Fetch {
                    url: url.to_string(),
                    status: 404,
                })?;
            Ok(PageFetchResult {
                html: format!("<html><body>{body}</body></html>"),
                final_url: url.join(landed).unwrap(),
                status: 200,
                content_type: Some("text/html".into()),
            })
        }
    }

    async fn discover_static(blog: Arc<StaticBlog>) -> DiscoveryResult {
        let engine = DiscoveryEngine::new(blog, Arc::new(ParserRegistry::new()), 50);
        let source = BlogSource::parse("https://example.com/blog/").unwrap();
        engine
            .discover(&source, &CompiledHints::default(), &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn read_more_link_does_not_swallow_the_post() {
        let blog = Arc::new(StaticBlog::new(vec![(
            "/blog/",
            "/blog/",
            r#"<ul><li><a href="/blog/real-post">More &raquo;</a>
                <h2><a href="/blog/real-post">A genuine post title</a></h2></li></ul>"#,
        )]));

        let result = discover_static(blog.clone()).await;

        let paths: Vec<_> = result.posts.iter().map(|p| p.url.path()).collect();
        assert_eq!(paths, vec!["/blog/real-post"]);
        assert_eq!(result.posts[0].hint.title.as_deref(), Some("A genuine post title"));
        assert_eq!(result.index_pages_visited, 1);
        assert_eq!(*blog.fetched.lock().unwrap(), vec!["/blog/"]);
    }

    #[test]
    fn post_link_replaces_a_queued_index_entry() {
        let url = Url::parse("https://example.com/blog/real-post").unwrap();
        let mut walk = Walk::default();
        walk.enqueue_index(url.clone());
        walk.add_post(ClassifiedLink::new(url.clone(), LinkKind::PostCandidate));
        walk.enqueue_index(url.clone());

        assert!(walk.pending.is_empty());
        assert_eq!(walk.posts.len(), 1);
        assert_eq!(walk.posts[0].url, url);
    }

    #[tokio::test]
    async fn redirect_to_a_parsed_index_is_a_duplicate() {
        let seed = r#"<a href="/blog/first-post">The first post ever</a>
            <a href="/blog/second-post">The second post here</a>
            <a href="/blog/page/1/" rel="next">Next</a>"#;
        let blog = Arc::new(StaticBlog::new(vec![
            ("/blog/", "/blog/", seed),
            ("/blog/page/1/", "/blog/", seed),
        ]));

        let result = discover_static(blog.clone()).await;

        assert_eq!(result.posts.len(), 2);
        assert_eq!(result.index_pages_visited, 1);
        assert_eq!(result.duplicate_index_pages, 1);
        assert_eq!(*blog.fetched.lock().unwrap(), vec!["/blog/", "/blog/page/1/"]);
    }

    #[tokio::test]
    async fn www_and_bare_host_links_are_one_post() {
        let blog = Arc::new(StaticBlog::new(vec![(
            "/blog/",
            "/blog/",
            r#"<a href="https://www.example.com/blog/shared-post">A post linked from www</a>
               <a href="https://example.com/blog/shared-post/">A post linked from bare</a>"#,
        )]));

        let result = discover_static(blog).await;
        assert_eq!(result.posts.len(), 1);
    }

    #[tokio::test]
    async fn blog_title_hint_wins() {
        let server = MockServer::start().await;
        Mock::given(path("/"))
            .respond_with(html("<p>empty</p>"))
            .mount(&server)
            .await;

        let hints = CompiledHints {
            blog_title: Some("Configured Title".into()),
            ..CompiledHints::default()
        };
        let result = engine(50)
            .discover(&source(&server, "/"), &hints, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.blog_title, "Configured Title");
        assert!(result.posts.is_empty());
    }
}
