//! Shared types, error model, and configuration for blogbook.
//!
//! This crate is the foundation depended on by all other blogbook crates.
//! It provides:
//! - [`BlogbookError`], the unified error type
//! - The pipeline data model ([`PostLink`], [`PostRecord`], [`OrderedPostRecord`],
//!   [`TocEntry`], [`Document`])
//! - URL identity normalization ([`UrlKey`])
//! - Configuration ([`AppConfig`], [`RunConfig`], [`SiteHints`], config loading)

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompiledHints, DefaultsConfig, RenderConfig, RunConfig, SiteHints, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{BlogbookError, Result};
pub use identity::{UrlKey, host_key};
pub use types::{
    BlogSource, ClassifiedLink, Cover, Document, LinkHint, LinkKind, OrderedPostRecord,
    PageFetchResult, PostLink, PostMetadata, PostRecord, Section, SkippedPost, TocEntry,
    UNDATED_LABEL, display_date,
};
