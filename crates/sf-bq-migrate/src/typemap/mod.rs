//! Type mapping between Snowflake and BigQuery.

/// Map a Snowflake data type to BigQuery.
///
/// Precision suffixes are ignored: `NUMBER(10,2)` maps the same as `NUMBER`.
/// Returns `None` for types with no defined mapping; callers surface that as
/// an `UnmappableType` error instead of defaulting.
pub fn snowflake_to_bigquery(snowflake_type: &str) -> Option<&'static str> {
    let base = snowflake_type
        .to_uppercase()
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    let mapped = match base.as_str() {
        // Numeric
        "NUMBER" | "DECIMAL" | "NUMERIC" => "NUMERIC",
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "BYTEINT" => "INTEGER",
        "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE_PRECISION" | "REAL" => "FLOAT64",

        // Text and binary
        "VARCHAR" | "CHAR" | "CHARACTER" | "STRING" | "TEXT" => "STRING",
        "BINARY" | "VARBINARY" => "BYTES",

        "BOOLEAN" => "BOOLEAN",

        // Date/time
        "DATE" => "DATE",
        "DATETIME" => "DATETIME",
        "TIME" => "TIME",
        "TIMESTAMP" | "TIMESTAMP_LTZ" | "TIMESTAMP_NTZ" | "TIMESTAMP_TZ" => "TIMESTAMP",

        // Semi-structured
        "VARIANT" | "OBJECT" | "ARRAY" => "JSON",

        "GEOGRAPHY" => "GEOGRAPHY",

        _ => return None,
    };

    Some(mapped)
}
