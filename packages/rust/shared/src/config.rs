//! Application configuration for blogbook.
//!
//! User config lives at `~/.blogbook/blogbook.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BlogbookError, Result};
use crate::identity::host_key;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "blogbook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blogbook";

// ---------------------------------------------------------------------------
// Config structs (matching blogbook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Output rendering settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Per-site extraction hints.
    #[serde(default)]
    pub sites: Vec<SiteHints>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum concurrent post fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Delay in ms before each post fetch.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Upper bound on index pages fetched during discovery.
    #[serde(default = "default_max_index_pages")]
    pub max_index_pages: usize,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Overrides the built-in User-Agent header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            rate_limit_ms: default_rate_limit(),
            max_index_pages: default_max_index_pages(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

fn default_concurrency() -> u32 {
    4
}
fn default_rate_limit() -> u64 {
    200
}
fn default_max_index_pages() -> usize {
    50
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Command converting the print HTML into a PDF.
    /// `{input}` and `{output}` are replaced with file paths.
    #[serde(default = "default_pdf_command")]
    pub pdf_command: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pdf_command: default_pdf_command(),
        }
    }
}

fn default_pdf_command() -> Vec<String> {
    vec!["weasyprint".into(), "{input}".into(), "{output}".into()]
}

/// `[[sites]]` entry: selector overrides and extra date patterns for one blog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteHints {
    /// Host the hints apply to (`www.` is ignored).
    pub host: String,

    /// Links matching this selector are the post candidates on index pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_link_selector: Option<String>,

    /// Links matching this selector are the pagination links on index pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_selector: Option<String>,

    /// Container holding a post's body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_selector: Option<String>,

    /// Additional chrono `strftime` patterns tried when parsing dates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_formats: Vec<String>,

    /// Fixed blog title for the cover page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_title: Option<String>,
}

/// [`SiteHints`] with selectors parsed, ready for the page parsers.
#[derive(Debug, Clone, Default)]
pub struct CompiledHints {
    pub post_link: Option<Selector>,
    pub pagination: Option<Selector>,
    pub content: Option<Selector>,
    pub date_formats: Vec<String>,
    pub blog_title: Option<String>,
}

impl CompiledHints {
    /// Parse the selectors in `hints`. An invalid selector is a config error.
    pub fn compile(hints: &SiteHints) -> Result<Self> {
        let parse = |field: &str, raw: &Option<String>| -> Result<Option<Selector>> {
            raw.as_deref()
                .map(|s| {
                    Selector::parse(s).map_err(|e| {
                        BlogbookError::config(format!(
                            "sites[{}].{field}: invalid selector '{s}': {e}",
                            hints.host
                        ))
                    })
                })
                .transpose()
        };

        Ok(Self {
            post_link: parse("post_link_selector", &hints.post_link_selector)?,
            pagination: parse("pagination_selector", &hints.pagination_selector)?,
            content: parse("content_selector", &hints.content_selector)?,
            date_formats: hints.date_formats.clone(),
            blog_title: hints.blog_title.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one conversion, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum concurrent post fetches.
    pub concurrency: u32,
    /// Delay in ms before each post fetch.
    pub rate_limit_ms: u64,
    /// Upper bound on index pages fetched during discovery.
    pub max_index_pages: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// External HTML → PDF command template.
    pub pdf_command: Vec<String>,
    /// Compiled hints keyed by host.
    pub sites: HashMap<String, CompiledHints>,
}

impl RunConfig {
    /// Build the runtime config, compiling every site's hints up front.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        let mut sites = HashMap::new();
        for site in &config.sites {
            let host = site.host.trim().to_ascii_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
            if host.is_empty() {
                return Err(BlogbookError::config("sites entry with empty host"));
            }
            sites.insert(host, CompiledHints::compile(site)?);
        }

        Ok(Self {
            concurrency: config.defaults.concurrency.max(1),
            rate_limit_ms: config.defaults.rate_limit_ms,
            max_index_pages: config.defaults.max_index_pages.max(1),
            timeout_secs: config.defaults.timeout_secs,
            user_agent: config.defaults.user_agent.clone(),
            pdf_command: config.render.pdf_command.clone(),
            sites,
        })
    }

    /// Hints configured for the blog at `url`, or empty hints.
    pub fn hints_for(&self, url: &Url) -> CompiledHints {
        self.sites.get(&host_key(url)).cloned().unwrap_or_default()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            rate_limit_ms: default_rate_limit(),
            max_index_pages: default_max_index_pages(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            pdf_command: default_pdf_command(),
            sites: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blogbook/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BlogbookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blogbook/blogbook.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BlogbookError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BlogbookError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BlogbookError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BlogbookError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BlogbookError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
