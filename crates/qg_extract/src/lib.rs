//! `qg_extract` - SQL statement extraction and cleanup
//!
//! This crate provides:
//! - Markdown/boilerplate stripping for LLM-generated SQL text
//! - Fenced-code-block statement extraction with keyword-anchored
//!   fallbacks
//! - Position-preserving candidate lists for per-statement result
//!   traceability

pub mod clean;
pub mod extract;

pub use clean::{SqlCleaner, clean_sql};
pub use extract::{SqlExtractor, extract_statements};
