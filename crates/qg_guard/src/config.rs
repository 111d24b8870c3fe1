//! Guardrail limits and the known-table allow-list.

use serde::{Deserialize, Serialize};

/// Tables the engine will allow a query to reference when
/// `validate_tables` is enabled.
pub const DEFAULT_KNOWN_TABLES: &[&str] = &[
    "customer_information",
    "transaction_history",
    "crs",
    "crs_account_report",
    "crs_countrycode",
    "crs_messagespec",
];

/// Tunable limits consumed by the guardrail engine.
///
/// Read-only during validation; reconfiguration happens between requests
/// via [`GuardrailConfig::apply`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Hard ceiling on an explicit TOP value
    pub max_rows: usize,
    /// Row limit injected by upstream prompt templates
    pub default_row_limit: usize,
    /// Row count above which results are worth a warning
    pub warn_row_threshold: usize,
    /// Maximum JOIN occurrences per statement
    pub max_joins: usize,
    /// Maximum nested SELECTs per statement (advisory)
    pub max_subqueries: usize,
    /// Maximum statement length in characters
    pub max_query_length: usize,
    /// Pass-through execution timeout for the database collaborator
    pub timeout_seconds: u64,
    pub allow_modifications: bool,
    pub allow_schema_changes: bool,
    pub require_where_for_delete: bool,
    /// Check FROM/JOIN targets against `known_tables`
    pub validate_tables: bool,
    /// Accepted but not enforced; column metadata is not wired up
    pub validate_columns: bool,
    /// Allow-listed table names, compared case-insensitively
    pub known_tables: Vec<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            default_row_limit: 1_000,
            warn_row_threshold: 5_000,
            max_joins: 5,
            max_subqueries: 3,
            max_query_length: 5_000,
            timeout_seconds: 30,
            allow_modifications: false,
            allow_schema_changes: false,
            require_where_for_delete: true,
            validate_tables: true,
            validate_columns: false,
            known_tables: DEFAULT_KNOWN_TABLES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl GuardrailConfig {
    /// Replace the keys present in `overrides`, leaving the rest intact.
    pub fn apply(&mut self, overrides: &GuardrailOverrides) {
        if let Some(v) = overrides.max_rows {
            self.max_rows = v;
        }
        if let Some(v) = overrides.default_row_limit {
            self.default_row_limit = v;
        }
        if let Some(v) = overrides.warn_row_threshold {
            self.warn_row_threshold = v;
        }
        if let Some(v) = overrides.max_joins {
            self.max_joins = v;
        }
        if let Some(v) = overrides.max_subqueries {
            self.max_subqueries = v;
        }
        if let Some(v) = overrides.max_query_length {
            self.max_query_length = v;
        }
        if let Some(v) = overrides.timeout_seconds {
            self.timeout_seconds = v;
        }
        if let Some(v) = overrides.allow_modifications {
            self.allow_modifications = v;
        }
        if let Some(v) = overrides.allow_schema_changes {
            self.allow_schema_changes = v;
        }
        if let Some(v) = overrides.require_where_for_delete {
            self.require_where_for_delete = v;
        }
        if let Some(v) = overrides.validate_tables {
            self.validate_tables = v;
        }
        if let Some(v) = overrides.validate_columns {
            self.validate_columns = v;
        }
        if let Some(ref v) = overrides.known_tables {
            self.known_tables = v.clone();
        }
    }

    /// True when `table` is in the allow-list, ignoring case
    #[must_use]
    pub fn knows_table(&self, table: &str) -> bool {
        self.known_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }
}

/// Partial configuration for selective updates, e.g. from a config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailOverrides {
    pub max_rows: Option<usize>,
    pub default_row_limit: Option<usize>,
    pub warn_row_threshold: Option<usize>,
    pub max_joins: Option<usize>,
    pub max_subqueries: Option<usize>,
    pub max_query_length: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub allow_modifications: Option<bool>,
    pub allow_schema_changes: Option<bool>,
    pub require_where_for_delete: Option<bool>,
    pub validate_tables: Option<bool>,
    pub validate_columns: Option<bool>,
    pub known_tables: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Default value tests
    // ========================================================================

    #[test]
    fn test_default_limits() {
        let config = GuardrailConfig::default();
        assert_eq!(config.max_rows, 10_000);
        assert_eq!(config.default_row_limit, 1_000);
        assert_eq!(config.warn_row_threshold, 5_000);
        assert_eq!(config.max_joins, 5);
        assert_eq!(config.max_subqueries, 3);
        assert_eq!(config.max_query_length, 5_000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_default_flags() {
        let config = GuardrailConfig::default();
        assert!(!config.allow_modifications);
        assert!(!config.allow_schema_changes);
        assert!(config.require_where_for_delete);
        assert!(config.validate_tables);
        assert!(!config.validate_columns);
    }

    #[test]
    fn test_default_known_tables() {
        let config = GuardrailConfig::default();
        assert_eq!(config.known_tables.len(), 6);
        assert!(config.knows_table("customer_information"));
        assert!(config.knows_table("crs_messagespec"));
    }

    // ========================================================================
    // Table lookup tests
    // ========================================================================

    #[test]
    fn test_knows_table_case_insensitive() {
        let config = GuardrailConfig::default();
        assert!(config.knows_table("CUSTOMER_INFORMATION"));
        assert!(config.knows_table("Transaction_History"));
    }

    #[test]
    fn test_knows_table_unknown() {
        let config = GuardrailConfig::default();
        assert!(!config.knows_table("users"));
        assert!(!config.knows_table(""));
    }

    // ========================================================================
    // Override tests
    // ========================================================================

    #[test]
    fn test_apply_replaces_selected_keys() {
        let mut config = GuardrailConfig::default();
        let overrides = GuardrailOverrides {
            max_rows: Some(500),
            validate_tables: Some(false),
            ..Default::default()
        };
        config.apply(&overrides);

        assert_eq!(config.max_rows, 500);
        assert!(!config.validate_tables);
        // Untouched keys keep their defaults
        assert_eq!(config.max_joins, 5);
        assert_eq!(config.known_tables.len(), 6);
    }

    #[test]
    fn test_apply_empty_overrides_is_noop() {
        let mut config = GuardrailConfig::default();
        config.apply(&GuardrailOverrides::default());
        assert_eq!(config, GuardrailConfig::default());
    }

    #[test]
    fn test_apply_known_tables() {
        let mut config = GuardrailConfig::default();
        let overrides = GuardrailOverrides {
            known_tables: Some(vec!["machines".to_string()]),
            ..Default::default()
        };
        config.apply(&overrides);
        assert!(config.knows_table("machines"));
        assert!(!config.knows_table("customer_information"));
    }

    // ========================================================================
    // Serialization tests
    // ========================================================================

    #[test]
    fn test_config_serde_roundtrip() {
        let config = GuardrailConfig::default();
        let serialized = serde_json::to_string(&config).unwrap();
        let parsed: GuardrailConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_overrides_deserialize_partial() {
        let overrides: GuardrailOverrides =
            serde_json::from_str(r#"{"max_joins": 2}"#).unwrap();
        assert_eq!(overrides.max_joins, Some(2));
        assert!(overrides.max_rows.is_none());
    }
}
