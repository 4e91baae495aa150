//! Page fetching.
//!
//! The pipeline only depends on the [`Fetcher`] trait; [`HttpFetcher`] is the
//! `reqwest`-backed implementation used by the CLI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, instrument};
use url::Url;

use blogbook_shared::{BlogbookError, PageFetchResult, Result, RunConfig};

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("blogbook/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Retrieves raw HTML for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`. Transport failures and non-2xx statuses are errors.
    async fn fetch(&self, url: &Url) -> Result<PageFetchResult>;
}

/// HTTP fetcher with a fixed User-Agent, bounded redirects and an optional
/// politeness delay before every request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    delay: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from the run configuration.
    pub fn new(config: &RunConfig) -> Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or(USER_AGENT);
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BlogbookError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            delay: Duration::from_millis(config.rate_limit_ms),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<PageFetchResult> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| BlogbookError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlogbookError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let html = response
            .text()
            .await
            .map_err(|e| BlogbookError::Network(format!("{url}: body read failed: {e}")))?;

        debug!(status = status.as_u16(), %final_url, bytes = html.len(), "fetched page");

        Ok(PageFetchResult {
            html,
            final_url,
            status: status.as_u16(),
            content_type,
        })
    }
}
