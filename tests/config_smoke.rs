mod common;

use common::init_tracing;
use qg_config::QgConfig;
use qg_guard::GuardrailConfig;

#[test]
fn test_default_config_resolves_engine_defaults() {
    init_tracing();
    let config = QgConfig::default();
    assert_eq!(config.guardrail_config(), GuardrailConfig::default());
    assert!(config.global.db_path.ends_with("querygate.duckdb"));
}

#[test]
fn test_toml_overrides_reach_the_engine() {
    init_tracing();
    let config = QgConfig::from_toml(
        r#"
        [guardrails]
        max_rows = 100
        validate_tables = false
        "#,
    )
    .unwrap();

    let resolved = config.guardrail_config();
    assert_eq!(resolved.max_rows, 100);
    assert!(!resolved.validate_tables);
    assert_eq!(resolved.max_joins, 5);
}
