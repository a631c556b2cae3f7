//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- Latest aggregated observation per token. Fixed-point values are
-- decimal strings since SQLite integers stop at 64 bits.
CREATE TABLE IF NOT EXISTS observations (
    token TEXT PRIMARY KEY,
    price TEXT NOT NULL,
    token_liquidity TEXT NOT NULL,
    quote_token_liquidity TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);
"#;
