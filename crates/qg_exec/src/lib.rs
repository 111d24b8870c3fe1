//! `qg_exec` - Validated batch execution of extracted SQL
//!
//! This crate provides:
//! - Per-statement orchestration: extract, validate, execute, record
//! - `ExecutionRecord` results with 1:1 positional correspondence to
//!   extracted statements
//! - Partial-failure semantics: one bad statement never aborts the batch
//!
//! Statements run sequentially; a statement that fails the guardrails is
//! never handed to the store.

use qg_extract::SqlExtractor;
use qg_guard::{GuardrailConfig, SqlGuardrails};
use qg_store::AnalyticsStore;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::{debug, warn};

/// Outcome category for one statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    Success,
    ValidationError,
    ConnectionError,
    FormatError,
    ExecutionError,
    JsonError,
}

impl ExecStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecStatus::Success => "success",
            ExecStatus::ValidationError => "validation_error",
            ExecStatus::ConnectionError => "connection_error",
            ExecStatus::FormatError => "format_error",
            ExecStatus::ExecutionError => "execution_error",
            ExecStatus::JsonError => "json_error",
        }
    }
}

/// Per-statement result record, one per extracted candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub query: String,
    pub status: ExecStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Serialized rows on success, a human-readable message otherwise
    pub result: String,
}

impl ExecutionRecord {
    fn error(query: impl Into<String>, status: ExecStatus, message: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            status,
            row_count: None,
            column_count: None,
            columns: None,
            result: message.into(),
        }
    }
}

/// Batch executor: extraction + guardrails + sequential store execution
pub struct BatchExecutor {
    store: AnalyticsStore,
    guardrails: SqlGuardrails,
    extractor: SqlExtractor,
}

impl BatchExecutor {
    /// Executor with default guardrail limits
    #[must_use]
    pub fn new(store: AnalyticsStore) -> Self {
        Self::with_guardrails(store, SqlGuardrails::default())
    }

    /// Executor with a caller-provided engine
    #[must_use]
    pub fn with_guardrails(store: AnalyticsStore, guardrails: SqlGuardrails) -> Self {
        Self {
            store,
            guardrails,
            extractor: SqlExtractor::new(),
        }
    }

    /// Executor configured from guardrail limits
    #[must_use]
    pub fn with_config(store: AnalyticsStore, config: GuardrailConfig) -> Self {
        Self::with_guardrails(store, SqlGuardrails::new(config))
    }

    /// Run every statement found in `llm_text` and return one record per
    /// candidate, in extraction order.
    ///
    /// Unsafe statements are rejected without touching the store; failed
    /// statements do not stop later ones.
    #[must_use]
    pub fn execute_batch(&self, llm_text: &str) -> Vec<ExecutionRecord> {
        let candidates = self.extractor.extract(llm_text);

        if candidates.is_empty() {
            return vec![ExecutionRecord::error(
                truncate(llm_text, 200),
                ExecStatus::FormatError,
                "No SQL queries found in the provided code. Please format queries in ```sql code blocks.",
            )];
        }

        candidates
            .iter()
            .enumerate()
            .map(|(idx, query)| self.execute_one(idx, query))
            .collect()
    }

    fn execute_one(&self, idx: usize, query: &str) -> ExecutionRecord {
        let query = query.trim();

        if query.is_empty() {
            return ExecutionRecord::error(
                "",
                ExecStatus::ValidationError,
                format!("Empty query found in code block #{}", idx + 1),
            );
        }

        // An engine panic must not take the rest of the batch down
        let verdict = match catch_unwind(AssertUnwindSafe(|| self.guardrails.validate(query))) {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!(block = idx + 1, "guardrail engine panicked");
                return ExecutionRecord::error(
                    query,
                    ExecStatus::ExecutionError,
                    "Query validation failed: guardrail evaluation failed",
                );
            }
        };

        if !verdict.is_safe {
            let messages: Vec<&str> = verdict
                .blocking_violations()
                .iter()
                .map(|v| v.message.as_str())
                .collect();
            return ExecutionRecord::error(
                query,
                ExecStatus::ValidationError,
                format!("Query validation failed: {}", messages.join("; ")),
            );
        }

        debug!(block = idx + 1, "executing validated statement");
        match self.store.query_table(query) {
            Ok(data) => {
                let mut record = ExecutionRecord {
                    query: query.to_string(),
                    status: ExecStatus::Success,
                    row_count: Some(data.rows.len()),
                    column_count: Some(data.columns.len()),
                    columns: Some(data.columns),
                    result: String::new(),
                };
                match serde_json::to_string(&data.rows) {
                    Ok(payload) => record.result = payload,
                    Err(e) => {
                        record.status = ExecStatus::JsonError;
                        record.result = format!("Error converting results to JSON: {e}");
                    }
                }
                record
            }
            Err(e) => ExecutionRecord::error(
                query,
                ExecStatus::ExecutionError,
                format!("Error executing SQL: {e}"),
            ),
        }
    }
}

/// Execute a batch against an existing store with default guardrails
#[must_use]
pub fn execute_sql_batch(llm_text: &str, store: &AnalyticsStore) -> Vec<ExecutionRecord> {
    BatchExecutor::new(store.clone()).execute_batch(llm_text)
}

/// Open the store at `path` and execute a batch against it.
///
/// A store that cannot be opened yields a single `connection_error`
/// record instead of an error.
#[must_use]
pub fn execute_with_store_at(llm_text: &str, path: &Path) -> Vec<ExecutionRecord> {
    match AnalyticsStore::open(path) {
        Ok(store) => execute_sql_batch(llm_text, &store),
        Err(e) => vec![ExecutionRecord::error(
            "",
            ExecStatus::ConnectionError,
            format!("Could not connect to analytics store: {e}"),
        )],
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let prefix: String = text.chars().take(limit).collect();
        format!("{prefix}...")
    } else {
        text.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
