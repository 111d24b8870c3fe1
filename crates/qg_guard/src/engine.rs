//! The guardrail engine: a fixed battery of checks over normalized SQL.
//!
//! Pipeline per statement:
//! 1. Strip comments, collapse whitespace, uppercase for matching
//! 2. Run check families in order: security, safety, performance,
//!    schema (when enabled), format
//! 3. Partition violations into blocking and advisory
//!
//! The engine is total: every string input, including the empty string,
//! produces a verdict rather than an error.

use crate::config::GuardrailConfig;
use crate::{GuardrailResult, ResultMetadata, RiskLevel, Violation, ViolationType};
use chrono::Utc;
use regex::Regex;
use tracing::debug;

// ============================================================================
// Rule tables
// ============================================================================

/// Injection and obfuscation signatures. All fire as Critical and block.
const INJECTION_PATTERNS: &[(&str, &str)] = &[
    (r";\s*DROP\s+TABLE", "SQL injection: DROP TABLE after semicolon"),
    (r";\s*DELETE\s+FROM", "SQL injection: DELETE after semicolon"),
    (r";\s*UPDATE\s+", "SQL injection: UPDATE after semicolon"),
    (r"UNION\s+.*?\s+SELECT.*?--", "SQL injection: UNION with comment"),
    (
        r#"'\s*OR\s+['"]\s*['"]?\s*=\s*['"]"#,
        "SQL injection: OR with always-true condition",
    ),
    (r"'\s*OR\s+1\s*=\s*1", "SQL injection: OR 1=1"),
    (r"EXEC\s*\(", "Dynamic SQL execution attempt"),
    (r"EXECUTE\s*\(", "Dynamic SQL execution attempt"),
    (r"XP_CMDSHELL", "OS command execution attempt"),
    (r"SP_EXECUTESQL", "Dynamic SQL execution attempt"),
];

/// Encoding primitives used to smuggle payloads past keyword filters
const OBFUSCATION_PATTERN: &str = r"CHAR\s*\(|ASCII\s*\(|CONVERT\s*\(";

/// Destructive verbs, matched as whole words anywhere in the statement.
/// One violation per matched verb; deliberately not deduplicated.
const DESTRUCTIVE_OPS: &[(&str, &str)] = &[
    ("DELETE", "DELETE operation"),
    ("UPDATE", "UPDATE operation"),
    ("INSERT", "INSERT operation"),
    ("TRUNCATE", "TRUNCATE operation"),
    ("DROP", "DROP operation"),
    ("ALTER", "ALTER operation"),
    ("CREATE", "CREATE operation"),
    ("MERGE", "MERGE operation"),
];

/// A compiled injection signature
struct InjectionRule {
    regex: Regex,
    message: &'static str,
}

/// A compiled destructive-verb rule
struct DestructiveRule {
    regex: Regex,
    description: &'static str,
}

// ============================================================================
// Engine
// ============================================================================

/// SQL guardrail engine with pre-compiled rule tables
pub struct SqlGuardrails {
    config: GuardrailConfig,
    injection_rules: Vec<InjectionRule>,
    destructive_rules: Vec<DestructiveRule>,
    obfuscation: Regex,
    line_comment: Regex,
    block_comment: Regex,
    select_into: Regex,
    from_word: Regex,
    where_word: Regex,
    row_limit_word: Regex,
    join_word: Regex,
    select_star: Regex,
    top_value: Regex,
    table_ref: Regex,
    leading_keyword: Regex,
}

impl Default for SqlGuardrails {
    fn default() -> Self {
        Self::new(GuardrailConfig::default())
    }
}

impl SqlGuardrails {
    /// Compile the rule battery against a configuration.
    ///
    /// # Panics
    ///
    /// Panics if a built-in pattern fails to compile, which would be a
    /// bug in the pattern tables rather than a runtime condition.
    #[must_use]
    pub fn new(config: GuardrailConfig) -> Self {
        let injection_rules = INJECTION_PATTERNS
            .iter()
            .map(|&(pattern, message)| InjectionRule {
                regex: Regex::new(&format!("(?i){pattern}")).expect("invalid injection pattern"),
                message,
            })
            .collect();

        let destructive_rules = DESTRUCTIVE_OPS
            .iter()
            .map(|&(op, description)| DestructiveRule {
                regex: Regex::new(&format!(r"\b{op}\b")).expect("invalid destructive pattern"),
                description,
            })
            .collect();

        Self {
            config,
            injection_rules,
            destructive_rules,
            obfuscation: Regex::new(OBFUSCATION_PATTERN).expect("invalid obfuscation pattern"),
            line_comment: Regex::new(r"--[^\n]*(\n|$)").expect("invalid comment pattern"),
            block_comment: Regex::new(r"(?s)/\*.*?\*/").expect("invalid comment pattern"),
            select_into: Regex::new(r"SELECT\s+.*?\s+INTO\s+").expect("invalid pattern"),
            from_word: Regex::new(r"\bFROM\b").expect("invalid pattern"),
            where_word: Regex::new(r"\bWHERE\b").expect("invalid pattern"),
            row_limit_word: Regex::new(r"\bTOP\b|\bLIMIT\b").expect("invalid pattern"),
            join_word: Regex::new(r"\bJOIN\b").expect("invalid pattern"),
            select_star: Regex::new(r"SELECT\s+\*").expect("invalid pattern"),
            top_value: Regex::new(r"\bTOP\s+(\d+)\b").expect("invalid pattern"),
            table_ref: Regex::new(r"\bFROM\s+(\w+)|JOIN\s+(\w+)").expect("invalid pattern"),
            leading_keyword: Regex::new(r"(?i)^\s*(SELECT|WITH)\b").expect("invalid pattern"),
        }
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// Strip SQL comments and collapse whitespace runs to single spaces
    #[must_use]
    pub fn normalize(&self, query: &str) -> String {
        let without_line = self.line_comment.replace_all(query, " ");
        let without_block = self.block_comment.replace_all(&without_line, " ");
        without_block.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Validate one statement and return a verdict.
    ///
    /// Never fails for malformed SQL; malformed input surfaces as format
    /// violations in the verdict instead.
    #[must_use]
    pub fn validate(&self, query: &str) -> GuardrailResult {
        let normalized = self.normalize(query);
        let upper = normalized.to_uppercase();

        let mut violations = Vec::new();
        violations.extend(self.check_security(query, &upper));
        violations.extend(self.check_safety(&upper));
        violations.extend(self.check_performance(query, &upper));
        if self.config.validate_tables {
            violations.extend(self.check_schema(&upper));
        }
        violations.extend(self.check_format(query, &normalized));

        let (blocking, advisory): (Vec<Violation>, Vec<Violation>) =
            violations.into_iter().partition(|v| v.blocks_execution);

        let is_safe = blocking.is_empty();
        if !is_safe {
            debug!(
                blocking = blocking.len(),
                advisory = advisory.len(),
                "query blocked by guardrails"
            );
        }

        GuardrailResult {
            is_safe,
            violations: blocking,
            warnings: advisory,
            metadata: ResultMetadata {
                timestamp: Utc::now().to_rfc3339(),
                query_length: query.chars().count(),
                normalized_query: normalized,
            },
        }
    }

    // ========================================================================
    // Security checks
    // ========================================================================

    fn check_security(&self, raw: &str, upper: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        for rule in &self.injection_rules {
            if rule.regex.is_match(upper) {
                violations.push(Violation {
                    violation_type: ViolationType::Security,
                    risk_level: RiskLevel::Critical,
                    message: format!("Security violation: {}", rule.message),
                    query_snippet: Some(extract_snippet(raw, &rule.regex)),
                    suggestion: Some("Remove malicious SQL patterns".to_string()),
                    blocks_execution: true,
                });
            }
        }

        if self.obfuscation.is_match(upper) {
            violations.push(Violation::blocking(
                ViolationType::Security,
                RiskLevel::High,
                "Potential obfuscation detected (CHAR/ASCII/CONVERT)",
                "Use plain SQL without encoding",
            ));
        }

        violations
    }

    // ========================================================================
    // Safety checks
    // ========================================================================

    fn check_safety(&self, upper: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        for rule in &self.destructive_rules {
            if rule.regex.is_match(upper) {
                violations.push(Violation::blocking(
                    ViolationType::Safety,
                    RiskLevel::Critical,
                    format!("Destructive operation blocked: {}", rule.description),
                    "Only SELECT queries are allowed",
                ));
            }
        }

        if self.select_into.is_match(upper) {
            violations.push(Violation::blocking(
                ViolationType::Safety,
                RiskLevel::High,
                "SELECT INTO operation blocked (creates tables)",
                "Use standard SELECT without INTO",
            ));
        }

        // Unbounded scans are worth flagging but not worth blocking
        if self.from_word.is_match(upper)
            && !self.where_word.is_match(upper)
            && !self.row_limit_word.is_match(upper)
        {
            violations.push(Violation::advisory(
                ViolationType::Performance,
                RiskLevel::Medium,
                "Query missing WHERE clause and row limit",
                "Add WHERE clause or TOP/LIMIT to prevent full table scan",
            ));
        }

        violations
    }

    // ========================================================================
    // Performance checks
    // ========================================================================

    fn check_performance(&self, raw: &str, upper: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        let query_length = raw.chars().count();
        if query_length > self.config.max_query_length {
            violations.push(Violation::blocking(
                ViolationType::Performance,
                RiskLevel::High,
                format!(
                    "Query too long ({} chars, max {})",
                    query_length, self.config.max_query_length
                ),
                "Simplify query or break into smaller queries",
            ));
        }

        let join_count = self.join_word.find_iter(upper).count();
        if join_count > self.config.max_joins {
            violations.push(Violation::blocking(
                ViolationType::Performance,
                RiskLevel::High,
                format!(
                    "Too many JOINs ({join_count}, max {})",
                    self.config.max_joins
                ),
                "Reduce number of JOINs or use temporary tables",
            ));
        }

        // Every SELECT beyond the first is counted as a subquery
        let subquery_count = upper.matches("SELECT").count() as i64 - 1;
        if subquery_count > self.config.max_subqueries as i64 {
            violations.push(Violation::advisory(
                ViolationType::Performance,
                RiskLevel::Medium,
                format!(
                    "Too many subqueries ({subquery_count}, max {})",
                    self.config.max_subqueries
                ),
                "Simplify query or use CTEs",
            ));
        }

        if self.select_star.is_match(upper) {
            violations.push(Violation::advisory(
                ViolationType::Performance,
                RiskLevel::Low,
                "SELECT * may return unnecessary columns",
                "Specify only needed columns",
            ));
        }

        if let Some(caps) = self.top_value.captures(upper)
            && let Ok(top_value) = caps[1].parse::<usize>()
            && top_value > self.config.max_rows
        {
            violations.push(Violation::blocking(
                ViolationType::Performance,
                RiskLevel::High,
                format!(
                    "TOP value too large ({top_value}, max {})",
                    self.config.max_rows
                ),
                format!("Reduce TOP to {} or less", self.config.max_rows),
            ));
        }

        violations
    }

    // ========================================================================
    // Schema checks
    // ========================================================================

    /// Compare FROM/JOIN targets against the allow-list.
    ///
    /// The extraction regex only sees plain word identifiers; bracketed or
    /// schema-qualified names (`[master].[dbo].[t]`) are not resolved.
    /// This mirrors the closed query surface the engine is built for.
    fn check_schema(&self, upper: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        for caps in self.table_ref.captures_iter(upper) {
            let referenced = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();

            // Strip a schema prefix when one survives extraction
            let table = referenced.rsplit('.').next().unwrap_or(referenced);

            if !self.config.knows_table(table) {
                violations.push(Violation::blocking(
                    ViolationType::Schema,
                    RiskLevel::High,
                    format!("Unknown table referenced: {referenced}"),
                    format!(
                        "Use one of the known tables: {}",
                        self.config.known_tables.join(", ")
                    ),
                ));
            }
        }

        violations
    }

    // ========================================================================
    // Format checks
    // ========================================================================

    fn check_format(&self, raw: &str, normalized: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        if raw.trim().is_empty() {
            violations.push(Violation::blocking(
                ViolationType::Format,
                RiskLevel::Critical,
                "Query is empty",
                "Provide a valid SQL query",
            ));
            return violations;
        }

        if !self.leading_keyword.is_match(normalized) {
            violations.push(Violation::blocking(
                ViolationType::Format,
                RiskLevel::High,
                "Query must start with SELECT or WITH",
                "Only SELECT and CTE queries are allowed",
            ));
        }

        let open_parens = normalized.matches('(').count();
        let close_parens = normalized.matches(')').count();
        if open_parens != close_parens {
            violations.push(Violation::blocking(
                ViolationType::Format,
                RiskLevel::High,
                format!("Unbalanced parentheses (open: {open_parens}, close: {close_parens})"),
                "Check query syntax for missing parentheses",
            ));
        }

        violations
    }
}

/// Extract ~50 chars of context around the first match in the raw query
fn extract_snippet(raw: &str, regex: &Regex) -> String {
    let upper = raw.to_uppercase();
    if let Some(m) = regex.find(&upper) {
        // Offsets come from the uppercased copy, which can differ in length
        // from the raw text for non-ASCII input; clamp before slicing.
        let end = floor_char_boundary(raw, (m.end() + 50).min(raw.len()));
        let start = floor_char_boundary(raw, m.start().saturating_sub(50).min(end));
        return format!("...{}...", &raw[start..end]);
    }
    let end = floor_char_boundary(raw, raw.len().min(100));
    format!("{}...", &raw[..end])
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// ============================================================================
// Convenience wrappers
// ============================================================================

/// Validate with default limits and collapse the verdict to a one-liner.
///
/// Blocking violations below Critical do not fail the quick check; the
/// detailed path via [`SqlGuardrails::validate`] is authoritative.
#[must_use]
pub fn quick_validate(query: &str) -> (bool, String) {
    let guardrails = SqlGuardrails::default();
    let result = guardrails.validate(query);

    if result.is_safe {
        return (true, "Query passed all guardrail checks".to_string());
    }

    let critical = result.critical_violations();
    if critical.is_empty() {
        (true, "Query has warnings but is allowed".to_string())
    } else {
        let messages: Vec<&str> = critical.iter().map(|v| v.message.as_str()).collect();
        (false, messages.join("; "))
    }
}

/// Validate with default limits and return the full serialized report
#[must_use]
pub fn validate_and_report(query: &str) -> serde_json::Value {
    SqlGuardrails::default().report(query)
}

impl SqlGuardrails {
    /// Serialized form of a verdict, suitable for JSON transport
    #[must_use]
    pub fn report(&self, query: &str) -> serde_json::Value {
        let result = self.validate(query);

        let serialize = |items: &[Violation]| -> Vec<serde_json::Value> {
            items
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "type": v.violation_type.as_str(),
                        "risk_level": v.risk_level.as_str(),
                        "message": v.message,
                        "suggestion": v.suggestion,
                    })
                })
                .collect()
        };

        serde_json::json!({
            "is_safe": result.is_safe,
            "violations": serialize(&result.violations),
            "warnings": serialize(&result.warnings),
            "metadata": {
                "timestamp": result.metadata.timestamp,
                "query_length": result.metadata.query_length,
                "normalized_query": result.metadata.normalized_query,
            },
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
