//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use blogbook_core::{ConvertConfig, ConvertResult, Converter, ProgressReporter};
use blogbook_shared::{
    AppConfig, BlogSource, RunConfig, host_key, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// blogbook: turn a blog into a print-ready book.
#[derive(Parser)]
#[command(
    name = "blogbook",
    version,
    about = "Convert a blog into a single print-ready document with a table of contents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert a blog into a PDF (or HTML) document.
    Convert {
        /// Blog index URL.
        url: String,

        /// Output file. `.html`/`.htm` writes HTML, anything else PDF.
        /// Defaults to `{domain}_blog.pdf`.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file to use instead of `~/.blogbook/blogbook.toml`.
        #[arg(long, env = "BLOGBOOK_CONFIG")]
        config: Option<PathBuf>,

        /// Maximum concurrent post fetches.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Maximum index pages visited during discovery.
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "blogbook=info",
        1 => "blogbook=debug",
        _ => "blogbook=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert {
            url,
            output,
            config,
            concurrency,
            max_pages,
        } => cmd_convert(&url, output, config.as_deref(), concurrency, max_pages).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// convert
// ---------------------------------------------------------------------------

async fn cmd_convert(
    url: &str,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
    concurrency: Option<u32>,
    max_pages: Option<usize>,
) -> Result<()> {
    let source = BlogSource::parse(url)?;
    let app_config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let mut run = RunConfig::from_app(&app_config)?;
    if let Some(n) = concurrency {
        run.concurrency = n.max(1);
    }
    if let Some(n) = max_pages {
        run.max_index_pages = n.max(1);
    }

    let output = output.unwrap_or_else(|| default_output(&source.seed));
    let config = ConvertConfig {
        source,
        output,
        run,
    };

    info!(
        url,
        output = %config.output.display(),
        concurrency = config.run.concurrency,
        "converting blog"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let converter = Converter::from_config(&config)?;
    let reporter = CliProgress::new();
    let result = converter
        .convert(&config, &reporter, &cancel)
        .await
        .wrap_err_with(|| format!("failed to convert {url}"))?;

    print_summary(&result);
    Ok(())
}

/// `{domain}_blog.pdf` in the working directory, `www.` dropped and dots
/// replaced with underscores.
fn default_output(seed: &Url) -> PathBuf {
    let domain = host_key(seed).replace('.', "_");
    let domain = if domain.is_empty() { "blog".to_string() } else { domain };
    PathBuf::from(format!("{domain}_blog.pdf"))
}

fn print_summary(result: &ConvertResult) {
    for skipped in &result.skipped {
        eprintln!("  warning: skipped {}: {}", skipped.url, skipped.reason);
    }
    if result.failed_index_pages > 0 {
        eprintln!(
            "  warning: {} index page(s) could not be fetched",
            result.failed_index_pages
        );
    }
    println!(
        "discovered {}, extracted {}, skipped {}, output: {}",
        result.discovered,
        result.extracted,
        result.skipped.len(),
        result.output.path.display()
    );
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn posts_discovered(&self, count: usize) {
        self.spinner.println(format!("  found {count} posts"));
    }

    fn done(&self, _result: &ConvertResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
