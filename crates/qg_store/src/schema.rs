//! Analytic table definitions.
//!
//! These are the tables the guardrail allow-list refers to: the customer
//! and transaction data plus the CRS reporting reference tables.

/// Tables created by the migrations, in creation order
pub const KNOWN_TABLES: &[&str] = &[
    "customer_information",
    "transaction_history",
    "crs",
    "crs_account_report",
    "crs_countrycode",
    "crs_messagespec",
];

pub const CUSTOMER_TABLES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS customer_information (
    customer_id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL,
    age INTEGER,
    account_type TEXT,
    balance DOUBLE,
    loan_status TEXT,
    product_holding TEXT,
    created_at TIMESTAMP DEFAULT current_timestamp
);

CREATE TABLE IF NOT EXISTS transaction_history (
    transaction_id INTEGER PRIMARY KEY,
    customer_id INTEGER,
    transaction_date TIMESTAMP,
    transaction_type TEXT,
    amount DOUBLE,
    status TEXT
);
";

pub const CRS_TABLES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS crs (
    record_id INTEGER PRIMARY KEY,
    account_holder_name TEXT,
    account_number TEXT,
    res_country_code TEXT,
    tin TEXT,
    birth_date DATE
);

CREATE TABLE IF NOT EXISTS crs_account_report (
    report_id INTEGER PRIMARY KEY,
    message_ref_id TEXT,
    account_number TEXT,
    account_balance DOUBLE,
    currency_code TEXT,
    res_country_code TEXT
);

CREATE TABLE IF NOT EXISTS crs_countrycode (
    country_code TEXT PRIMARY KEY,
    country_name TEXT
);

CREATE TABLE IF NOT EXISTS crs_messagespec (
    message_ref_id TEXT PRIMARY KEY,
    sending_company TEXT,
    transmitting_country TEXT,
    receiving_country TEXT,
    message_type TEXT,
    reporting_period DATE
);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tables_count() {
        assert_eq!(KNOWN_TABLES.len(), 6);
    }

    #[test]
    fn test_ddl_covers_known_tables() {
        let ddl = format!("{CUSTOMER_TABLES_SQL}{CRS_TABLES_SQL}");
        for table in KNOWN_TABLES {
            assert!(
                ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "missing DDL for {table}"
            );
        }
    }
}
