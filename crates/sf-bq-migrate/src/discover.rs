//! Table rule resolution against the source catalog.
//!
//! A rule names anything from one table to a whole database; discovery
//! expands it into concrete tables by querying INFORMATION_SCHEMA.

use serde::{Deserialize, Serialize};

use crate::core::plan::{ColumnMeta, TableTarget};
use crate::error::{MigrateError, Result};

/// One entry from the table list in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRule {
    pub database: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// SQL LIKE patterns excluding whole schemas, uppercased before use.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_schema_like: Vec<String>,

    /// SQL LIKE patterns excluding tables by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_table_like: Vec<String>,

    /// Include views alongside base tables.
    #[serde(default)]
    pub with_views: bool,
}

/// What a rule actually addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// `database` + `schema` + `table` all set.
    SpecificTable,
    /// `database` + `schema`, every table in the schema.
    SchemaWildcard,
    /// `database` alone, every table in every schema.
    DatabaseWildcard,
}

impl TableRule {
    pub fn scope(&self) -> Result<RuleScope> {
        match (&self.schema, &self.table) {
            (Some(_), Some(_)) => Ok(RuleScope::SpecificTable),
            (Some(_), None) => Ok(RuleScope::SchemaWildcard),
            (None, None) => Ok(RuleScope::DatabaseWildcard),
            (None, Some(table)) => Err(MigrateError::Config(format!(
                "rule for table '{}' in database '{}' names a table without a schema",
                table, self.database
            ))),
        }
    }

    /// The metadata query run against the source catalog. One row per
    /// column, ordered so consecutive rows for a table stay together.
    pub fn metadata_query(&self) -> String {
        let mut clauses = Vec::new();
        if !self.with_views {
            clauses.push("t.table_type = 'BASE TABLE'".to_string());
        }
        if let Some(schema) = &self.schema {
            clauses.push(format!("c.table_schema = '{}'", schema.to_uppercase()));
        }
        if let Some(table) = &self.table {
            clauses.push(format!("c.table_name = '{}'", table.to_uppercase()));
        }
        for pattern in &self.exclude_schema_like {
            if !pattern.is_empty() {
                clauses.push(format!("c.table_schema NOT LIKE '{}'", pattern.to_uppercase()));
            }
        }
        for pattern in &self.exclude_table_like {
            if !pattern.is_empty() {
                clauses.push(format!("c.table_name NOT LIKE '{}'", pattern.to_uppercase()));
            }
        }

        let mut query = format!(
            "SELECT\n\
             \x20   c.table_catalog AS database_name,\n\
             \x20   c.table_schema AS schema_name,\n\
             \x20   c.table_name,\n\
             \x20   c.column_name,\n\
             \x20   c.data_type,\n\
             \x20   c.ordinal_position,\n\
             \x20   t.table_type AS table_type\n\
             FROM {db}.INFORMATION_SCHEMA.COLUMNS c\n\
             JOIN {db}.INFORMATION_SCHEMA.TABLES t\n\
             \x20   ON c.table_name = t.table_name\n\
             \x20   AND c.table_schema = t.table_schema",
            db = self.database
        );
        if !clauses.is_empty() {
            query.push_str("\nWHERE ");
            query.push_str(&clauses.join("\n  AND "));
        }
        query.push_str("\nORDER BY c.table_schema, c.table_name, c.ordinal_position");
        query
    }
}

/// One row of the metadata query result.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRow {
    #[serde(rename = "DATABASE_NAME")]
    pub database: String,
    #[serde(rename = "SCHEMA_NAME")]
    pub schema: String,
    #[serde(rename = "TABLE_NAME")]
    pub table: String,
    #[serde(rename = "COLUMN_NAME")]
    pub column: String,
    #[serde(rename = "DATA_TYPE")]
    pub data_type: String,
    // snowsql's JSON output renders numbers as strings
    #[serde(rename = "ORDINAL_POSITION", deserialize_with = "ordinal_from_any")]
    pub ordinal: usize,
    #[serde(rename = "TABLE_TYPE")]
    pub table_type: String,
}

fn ordinal_from_any<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(usize),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(D::Error::custom),
    }
}

/// Group ordered metadata rows into tables, preserving catalog order.
/// Row counts are filled in separately by the caller.
pub fn group_metadata_rows(rows: Vec<MetadataRow>) -> Vec<(TableTarget, Vec<ColumnMeta>)> {
    let mut tables: Vec<(TableTarget, Vec<ColumnMeta>)> = Vec::new();
    for row in rows {
        let meta = ColumnMeta {
            name: row.column,
            data_type: row.data_type,
            ordinal: row.ordinal,
        };
        match tables.last_mut() {
            Some((target, columns))
                if target.database == row.database
                    && target.schema == row.schema
                    && target.table == row.table =>
            {
                columns.push(meta);
            }
            _ => {
                tables.push((
                    TableTarget {
                        database: row.database,
                        schema: row.schema,
                        table: row.table,
                        is_view: row.table_type == "VIEW",
                        row_count: 0,
                    },
                    vec![meta],
                ));
            }
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_scope() {
        let mut rule = TableRule {
            database: "PROD".into(),
            schema: Some("SALES".into()),
            table: Some("ORDERS".into()),
            exclude_schema_like: vec![],
            exclude_table_like: vec![],
            with_views: false,
        };
        assert_eq!(rule.scope().unwrap(), RuleScope::SpecificTable);
        rule.table = None;
        assert_eq!(rule.scope().unwrap(), RuleScope::SchemaWildcard);
        rule.schema = None;
        assert_eq!(rule.scope().unwrap(), RuleScope::DatabaseWildcard);
        rule.table = Some("ORDERS".into());
        assert!(rule.scope().is_err());
    }

    #[test]
    fn test_metadata_query_filters_uppercased() {
        let rule = TableRule {
            database: "prod".into(),
            schema: Some("sales".into()),
            table: None,
            exclude_schema_like: vec!["tmp_%".into(), String::new()],
            exclude_table_like: vec!["bak_%".into()],
            with_views: false,
        };
        let q = rule.metadata_query();
        assert!(q.contains("t.table_type = 'BASE TABLE'"));
        assert!(q.contains("c.table_schema = 'SALES'"));
        assert!(q.contains("c.table_schema NOT LIKE 'TMP_%'"));
        assert!(q.contains("c.table_name NOT LIKE 'BAK_%'"));
        assert!(!q.contains("NOT LIKE ''"));
        assert!(q.ends_with("ORDER BY c.table_schema, c.table_name, c.ordinal_position"));
    }

    #[test]
    fn test_metadata_query_with_views_drops_type_filter() {
        let rule = TableRule {
            database: "PROD".into(),
            schema: None,
            table: None,
            exclude_schema_like: vec![],
            exclude_table_like: vec![],
            with_views: true,
        };
        assert!(!rule.metadata_query().contains("table_type = 'BASE TABLE'"));
    }

    #[test]
    fn test_metadata_row_parses_string_ordinals() {
        let row: MetadataRow = serde_json::from_str(
            r#"{"DATABASE_NAME":"P","SCHEMA_NAME":"S","TABLE_NAME":"T",
            "COLUMN_NAME":"C","DATA_TYPE":"NUMBER(38,0)","ORDINAL_POSITION":"3",
            "TABLE_TYPE":"VIEW"}"#,
        )
        .unwrap();
        assert_eq!(row.ordinal, 3);
        assert_eq!(row.table_type, "VIEW");
    }

    #[test]
    fn test_group_metadata_rows_preserves_order() {
        let row = |table: &str, column: &str, ordinal: usize| MetadataRow {
            database: "P".into(),
            schema: "S".into(),
            table: table.into(),
            column: column.into(),
            data_type: "VARCHAR".into(),
            ordinal,
            table_type: "BASE TABLE".into(),
        };
        let grouped = group_metadata_rows(vec![
            row("A", "C1", 1),
            row("A", "C2", 2),
            row("B", "C1", 1),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0.table, "A");
        assert_eq!(grouped[0].1.len(), 2);
        assert_eq!(grouped[1].0.table, "B");
        assert!(!grouped[1].0.is_view);
    }
}
