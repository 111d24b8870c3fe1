//! Locates SQL statements inside a full LLM response.
//!
//! Search order:
//! 1. Fenced ```sql blocks (case-insensitive, spanning newlines)
//! 2. Any fenced ``` blocks
//! 3. The whole input, cleaned, when it starts with a SQL keyword
//! 4. Keyword-anchored `SELECT`/`WITH` spans as a last resort
//!
//! Every fenced block yields exactly one candidate, in input order, even
//! when cleaning leaves it empty; callers turn empty candidates into
//! per-position error records instead of dropping them.

use crate::clean::SqlCleaner;
use regex::Regex;
use tracing::debug;

/// Statement extractor with pre-compiled patterns and a cleaner
pub struct SqlExtractor {
    fenced_sql: Regex,
    fenced_any: Regex,
    sql_start: Regex,
    keyword_span: Regex,
    cleaner: SqlCleaner,
}

impl Default for SqlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlExtractor {
    /// Compile the extraction patterns.
    ///
    /// # Panics
    ///
    /// Panics if a built-in pattern fails to compile; the patterns are
    /// fixed, so this cannot happen at runtime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fenced_sql: Regex::new(r"(?is)```\s*sql\s*(.*?)```").expect("invalid fence pattern"),
            fenced_any: Regex::new(r"(?s)```(.*?)```").expect("invalid fence pattern"),
            sql_start: Regex::new(r"(?im)^\s*(SELECT|WITH|DECLARE)\b")
                .expect("invalid keyword pattern"),
            keyword_span: Regex::new(r"(?is)((?:WITH|SELECT)\b.*?(?:;|$))")
                .expect("invalid span pattern"),
            cleaner: SqlCleaner::new(),
        }
    }

    /// Extract cleaned statement candidates from an LLM response.
    ///
    /// An empty return means no SQL could be located by any strategy.
    /// When fenced blocks are present, the result has exactly one entry
    /// per block (possibly empty after cleaning), preserving positions.
    #[must_use]
    pub fn extract(&self, llm_text: &str) -> Vec<String> {
        let blocks = self.fenced_blocks(llm_text);
        if !blocks.is_empty() {
            debug!(count = blocks.len(), "extracted fenced SQL blocks");
            return blocks
                .into_iter()
                .map(|b| self.cleaner.clean(&b))
                .collect();
        }

        // No code blocks: maybe the whole response is one bare statement
        // wrapped in markdown chatter.
        let cleaned = self.cleaner.clean(llm_text);
        if !cleaned.trim().is_empty() && self.sql_start.is_match(&cleaned) {
            return vec![cleaned];
        }

        // Last resort: pull keyword-anchored spans out of the raw text
        let spans: Vec<String> = self
            .keyword_span
            .captures_iter(llm_text)
            .map(|caps| self.cleaner.clean(&caps[1]))
            .filter(|s| !s.trim().is_empty())
            .collect();
        if !spans.is_empty() {
            debug!(count = spans.len(), "extracted keyword-anchored spans");
        }
        spans
    }

    fn fenced_blocks(&self, llm_text: &str) -> Vec<String> {
        let sql_blocks: Vec<String> = self
            .fenced_sql
            .captures_iter(llm_text)
            .map(|caps| caps[1].to_string())
            .collect();
        if !sql_blocks.is_empty() {
            return sql_blocks;
        }

        self.fenced_any
            .captures_iter(llm_text)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

/// Extract statements with a freshly built extractor
#[must_use]
pub fn extract_statements(llm_text: &str) -> Vec<String> {
    SqlExtractor::new().extract(llm_text)
}

// ============================================================================
// Tests
// ============================================================================
