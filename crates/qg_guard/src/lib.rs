//! `qg_guard` - SQL safety guardrail engine
//!
//! This crate provides:
//! - Layered validation of LLM-generated SQL (security, safety,
//!   performance, schema, format checks)
//! - Risk classification and per-violation blocking decisions
//! - Tunable limits via [`GuardrailConfig`]
//! - Serialized validation reports for API transport

use serde::{Deserialize, Serialize};

pub mod config;
pub mod engine;

pub use config::{GuardrailConfig, GuardrailOverrides};
pub use engine::{SqlGuardrails, quick_validate, validate_and_report};

/// Categories of guardrail violations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Security,
    Safety,
    Performance,
    Schema,
    Complexity,
    Format,
}

impl ViolationType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::Security => "security",
            ViolationType::Safety => "safety",
            ViolationType::Performance => "performance",
            ViolationType::Schema => "schema",
            ViolationType::Complexity => "complexity",
            ViolationType::Format => "format",
        }
    }
}

/// Risk levels for violations, most severe first.
///
/// Critical and High block execution; the rest are advisory unless the
/// rule that produced the violation says otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
            RiskLevel::Info => "info",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "critical" => Ok(RiskLevel::Critical),
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            "info" => Ok(RiskLevel::Info),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// A single guardrail rule firing.
///
/// Created by a check and never mutated afterwards. `blocks_execution` is
/// decided per rule, not derived from the risk level alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub violation_type: ViolationType,
    pub risk_level: RiskLevel,
    pub message: String,
    pub query_snippet: Option<String>,
    pub suggestion: Option<String>,
    pub blocks_execution: bool,
}

impl Violation {
    /// Shorthand for a blocking violation with no snippet
    #[must_use]
    pub fn blocking(
        violation_type: ViolationType,
        risk_level: RiskLevel,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            risk_level,
            message: message.into(),
            query_snippet: None,
            suggestion: Some(suggestion.into()),
            blocks_execution: true,
        }
    }

    /// Shorthand for an advisory violation with no snippet
    #[must_use]
    pub fn advisory(
        violation_type: ViolationType,
        risk_level: RiskLevel,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            risk_level,
            message: message.into(),
            query_snippet: None,
            suggestion: Some(suggestion.into()),
            blocks_execution: false,
        }
    }
}

/// Metadata attached to every validation verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// RFC 3339 timestamp of the validation pass
    pub timestamp: String,
    /// Length of the raw query before normalization
    pub query_length: usize,
    /// Comment-stripped, whitespace-collapsed query text
    pub normalized_query: String,
}

/// The verdict of one engine invocation.
///
/// `violations` holds only blocking entries, `warnings` only advisory
/// ones; `is_safe` is true iff `violations` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub is_safe: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Violation>,
    pub metadata: ResultMetadata,
}

impl GuardrailResult {
    /// Violations at Critical risk
    #[must_use]
    pub fn critical_violations(&self) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.risk_level == RiskLevel::Critical)
            .collect()
    }

    /// All violations that block execution
    #[must_use]
    pub fn blocking_violations(&self) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.blocks_execution)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // ViolationType tests
    // ========================================================================

    #[test]
    fn test_violation_type_as_str() {
        assert_eq!(ViolationType::Security.as_str(), "security");
        assert_eq!(ViolationType::Safety.as_str(), "safety");
        assert_eq!(ViolationType::Performance.as_str(), "performance");
        assert_eq!(ViolationType::Schema.as_str(), "schema");
        assert_eq!(ViolationType::Complexity.as_str(), "complexity");
        assert_eq!(ViolationType::Format.as_str(), "format");
    }

    #[test]
    fn test_violation_type_serialization() {
        let json = serde_json::to_string(&ViolationType::Security).unwrap();
        assert_eq!(json, "\"security\"");

        let parsed: ViolationType = serde_json::from_str("\"schema\"").unwrap();
        assert_eq!(parsed, ViolationType::Schema);
    }

    // ========================================================================
    // RiskLevel tests
    // ========================================================================

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Critical < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Info);
    }

    #[test]
    fn test_risk_level_from_str_roundtrip() {
        for s in ["critical", "high", "medium", "low", "info"] {
            let parsed: RiskLevel = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn test_risk_level_from_str_invalid() {
        assert!("fatal".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_risk_level_serialization() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    // ========================================================================
    // Violation constructor tests
    // ========================================================================

    #[test]
    fn test_violation_blocking() {
        let v = Violation::blocking(
            ViolationType::Safety,
            RiskLevel::Critical,
            "Destructive operation blocked: DELETE operation",
            "Only SELECT queries are allowed",
        );
        assert!(v.blocks_execution);
        assert!(v.query_snippet.is_none());
        assert_eq!(v.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_violation_advisory() {
        let v = Violation::advisory(
            ViolationType::Performance,
            RiskLevel::Low,
            "SELECT * may return unnecessary columns",
            "Specify only needed columns",
        );
        assert!(!v.blocks_execution);
        assert_eq!(v.violation_type, ViolationType::Performance);
    }

    // ========================================================================
    // GuardrailResult accessor tests
    // ========================================================================

    fn sample_result() -> GuardrailResult {
        GuardrailResult {
            is_safe: false,
            violations: vec![
                Violation::blocking(
                    ViolationType::Safety,
                    RiskLevel::Critical,
                    "critical one",
                    "fix",
                ),
                Violation::blocking(ViolationType::Schema, RiskLevel::High, "high one", "fix"),
            ],
            warnings: vec![Violation::advisory(
                ViolationType::Performance,
                RiskLevel::Low,
                "advisory",
                "fix",
            )],
            metadata: ResultMetadata {
                timestamp: "2026-01-01T00:00:00Z".to_string(),
                query_length: 10,
                normalized_query: "SELECT 1".to_string(),
            },
        }
    }

    #[test]
    fn test_critical_violations_filter() {
        let result = sample_result();
        let critical = result.critical_violations();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].message, "critical one");
    }

    #[test]
    fn test_blocking_violations_filter() {
        let result = sample_result();
        assert_eq!(result.blocking_violations().len(), 2);
    }

    #[test]
    fn test_result_serialization_roundtrip() {
        let result = sample_result();
        let json = serde_json::to_string(&result).unwrap();
        let parsed: GuardrailResult = serde_json::from_str(&json).unwrap();
        assert!(!parsed.is_safe);
        assert_eq!(parsed.violations.len(), 2);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.metadata.query_length, 10);
    }
}
