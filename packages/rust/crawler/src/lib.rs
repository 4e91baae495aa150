//! Fetching, page parsing and post extraction.
//!
//! This crate provides:
//! - [`Fetcher`] / [`HttpFetcher`]: retrieve raw HTML
//! - [`parsers`]: the [`PageParser`] trait, the generic parser and built-in
//!   per-site parsers, selected through [`ParserRegistry`]
//! - [`dates`]: publish date extraction
//! - [`PostExtractor`]: concurrent, cancellable extraction of discovered posts

pub mod dates;
pub mod extractor;
pub mod fetch;
pub mod parsers;

pub use extractor::{ExtractionResult, PostExtractor};
pub use fetch::{Fetcher, HttpFetcher};
pub use parsers::{
    CedarDbParser, GenericParser, PageParser, ParseContext, ParserRegistry, SirupsenParser,
    TigerBeetleParser,
};
