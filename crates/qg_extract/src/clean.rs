//! Strips LLM chatter from raw SQL text, line by line.
//!
//! The cleaner removes markdown headings, stray fence markers, list
//! prefixes, and known boilerplate sentences while leaving legitimate
//! SQL (including `--` comments) untouched. Prose-looking lines are only
//! dropped when the text as a whole contains no SQL keyword, so the
//! cleaner cannot eat real query text.

use regex::Regex;

/// Whole-line boilerplate sentences LLMs wrap around generated SQL
const BOILERPLATE_LINES: &[&str] = &[
    r"(?i)^\s*here\s+is\s+the\s+.*query.*$",
    r"(?i)^\s*the\s+following\s+query.*$",
    r"(?i)^\s*this\s+query.*$",
    r"(?i)^\s*query\s+explanation.*$",
    r"(?i)^\s*sql\s+query.*$",
    r"(?i)^\s*analysis.*$",
    r"(?i)^\s*chart.*$",
    r"(?i)^\s*report.*$",
    r"(?i)^\s*explanation.*$",
    r"(?i)^\s*description.*$",
];

/// Line-oriented SQL cleaner with pre-compiled rules
pub struct SqlCleaner {
    fence_marker: Regex,
    numbered_item: Regex,
    bullet_item: Regex,
    boilerplate: Vec<Regex>,
    sql_line_keyword: Regex,
    sql_text_keyword: Regex,
    narrative_word: Regex,
    demonstrative_start: Regex,
}

impl Default for SqlCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCleaner {
    /// Compile the cleanup rules.
    ///
    /// # Panics
    ///
    /// Panics if a built-in pattern fails to compile; the tables are
    /// fixed, so this cannot happen at runtime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fence_marker: Regex::new(r"(?i)^\s*```\s*(sql)?\s*$").expect("invalid fence pattern"),
            numbered_item: Regex::new(r"^\s*\d+\.\s+(.*)$").expect("invalid list pattern"),
            bullet_item: Regex::new(r"^\s*[-*]\s+").expect("invalid bullet pattern"),
            boilerplate: BOILERPLATE_LINES
                .iter()
                .map(|p| Regex::new(p).expect("invalid boilerplate pattern"))
                .collect(),
            sql_line_keyword: Regex::new(
                r"(?i)^\s*(SELECT|WITH|DECLARE|FROM|WHERE|GROUP|ORDER|JOIN|UNION)\b",
            )
            .expect("invalid keyword pattern"),
            sql_text_keyword: Regex::new(
                r"(?i)\b(SELECT|FROM|WHERE|GROUP|ORDER|JOIN|UNION|INSERT|UPDATE|DELETE)\b",
            )
            .expect("invalid keyword pattern"),
            narrative_word: Regex::new(
                r"(?i)\b(will|shows?|gives?|returns?|provides?|analysis|breakdown|complete)\b",
            )
            .expect("invalid prose pattern"),
            demonstrative_start: Regex::new(r"(?i)^\s*(This|That|These|Those)\s+")
                .expect("invalid prose pattern"),
        }
    }

    /// Remove LLM artifacts from one candidate SQL string.
    ///
    /// Pure and idempotent; empty input is returned unchanged.
    #[must_use]
    pub fn clean(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        // Prose removal is only allowed when nothing in the text looks
        // like SQL, so a legitimate query can never lose its lines.
        let text_has_sql = self.sql_text_keyword.is_match(raw);

        let kept: Vec<&str> = raw
            .lines()
            .filter(|line| !self.should_drop(line, text_has_sql))
            .filter(|line| !line.trim().is_empty())
            .collect();

        kept.join("\n").trim().to_string()
    }

    fn should_drop(&self, line: &str, text_has_sql: bool) -> bool {
        // Markdown headings
        if line.starts_with('#') {
            return true;
        }

        // Stray fence markers on their own line
        if self.fence_marker.is_match(line) {
            return true;
        }

        // Numbered list items that do not continue into SQL
        if let Some(caps) = self.numbered_item.captures(line)
            && !self.sql_line_keyword.is_match(&caps[1])
        {
            return true;
        }

        // Bullet lines without any SQL keyword
        if self.bullet_item.is_match(line) && !self.sql_text_keyword.is_match(line) {
            return true;
        }

        // Known boilerplate sentences
        if self.boilerplate.iter().any(|p| p.is_match(line)) {
            return true;
        }

        // Generic prose, only when the whole text carries no SQL at all
        if !text_has_sql {
            let trimmed = line.trim_start();
            let is_comment = trimmed.starts_with("--");
            let ends_like_sql = line.trim_end().ends_with(';');
            if !is_comment
                && !ends_like_sql
                && (self.narrative_word.is_match(line) || self.demonstrative_start.is_match(line))
            {
                return true;
            }
        }

        false
    }
}

/// Clean a single candidate with a freshly built cleaner
#[must_use]
pub fn clean_sql(raw: &str) -> String {
    SqlCleaner::new().clean(raw)
}

// ============================================================================
// Tests
// ============================================================================
