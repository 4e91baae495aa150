//! Pipeline orchestration and document logic for blogbook.
//!
//! This crate ties together discovery, extraction, ordering, assembly and
//! rendering into the end-to-end [`Converter::convert`] workflow.

pub mod assembler;
pub mod ordering;
pub mod pipeline;
pub mod toc;

pub use assembler::assemble;
pub use ordering::{order_posts, validate_order};
pub use pipeline::{ConvertConfig, ConvertResult, Converter, ProgressReporter, SilentProgress};
