//! blogbook CLI: convert a blog into a single print-ready document.
//!
//! Discovers every post reachable from a blog's index, orders them oldest
//! first and renders a PDF (or HTML) book with a table of contents.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
