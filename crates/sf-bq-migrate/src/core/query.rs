//! Export query generation.
//!
//! Two statements per table: a REMOVE that clears any prior attempt's
//! files from the stage path, and a COPY INTO that unloads the projected
//! columns as Parquet.

use serde::{Deserialize, Serialize};

use super::plan::{ColumnPlan, TableTarget};

/// Knobs that shape the generated queries for one run.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// When set, the export SELECT is capped with `LIMIT n`.
    pub sample_limit: Option<usize>,
}

/// The statement pair for one table attempt.
///
/// Operators may replace either statement wholesale through the editor;
/// the text here is what actually runs, not a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPair {
    /// REMOVE statement run before the export. `None` only after an
    /// operator deletes it in the editor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning_query: Option<String>,

    /// COPY INTO statement that performs the unload.
    pub copy_query: String,

    /// 1-based attempt counter, bumped on every regeneration.
    pub attempt: u32,
}

/// Builds the statement pair for a table from its column plan.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    stage: String,
}

impl QueryBuilder {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
        }
    }

    pub fn build(&self, table: &TableTarget, plan: &ColumnPlan, opts: &QueryOptions) -> QueryPair {
        QueryPair {
            cleaning_query: Some(self.cleaning_query(table)),
            copy_query: self.copy_query(table, plan, opts),
            attempt: 1,
        }
    }

    /// `REMOVE @stage/db/schema/table/`
    pub fn cleaning_query(&self, table: &TableTarget) -> String {
        format!("REMOVE @{}/{}", self.stage, table.stage_path())
    }

    /// COPY INTO with one projection line per column, quoted on both
    /// sides so case and punctuation survive verbatim.
    pub fn copy_query(&self, table: &TableTarget, plan: &ColumnPlan, opts: &QueryOptions) -> String {
        let projections = plan
            .columns
            .iter()
            .map(|col| {
                let source = quote_ident(&col.source_name);
                let alias = quote_ident(&col.dest_name);
                match &col.cast_target {
                    Some(target) if col.needs_cast => {
                        format!("        CAST({source} AS {target}) AS {alias}")
                    }
                    _ => format!("        {source} AS {alias}"),
                }
            })
            .collect::<Vec<_>>()
            .join(",\n");

        let limit = match opts.sample_limit {
            Some(n) => format!("\n    LIMIT {n}"),
            None => String::new(),
        };

        format!(
            "COPY INTO @{stage}/{path}\n\
             FROM (\n\
             \x20   SELECT\n\
             {projections}\n\
             \x20   FROM {table}{limit}\n\
             )\n\
             FILE_FORMAT = (TYPE = PARQUET, SNAPPY_COMPRESSION = TRUE)\n\
             OVERWRITE = TRUE\n\
             HEADER = TRUE;",
            stage = self.stage,
            path = table.stage_path(),
            projections = projections,
            table = table.full_name(),
            limit = limit,
        )
    }
}

/// Double-quote an identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::{ColumnMeta, ColumnPlan};

    fn table() -> TableTarget {
        TableTarget {
            database: "PROD".into(),
            schema: "SALES".into(),
            table: "ORDERS".into(),
            is_view: false,
            row_count: 42,
        }
    }

    fn plan() -> ColumnPlan {
        ColumnPlan::build(
            &[
                ColumnMeta {
                    name: "Order ID".into(),
                    data_type: "NUMBER".into(),
                    ordinal: 1,
                },
                ColumnMeta {
                    name: "TS".into(),
                    data_type: "TIMESTAMP_TZ".into(),
                    ordinal: 2,
                },
            ],
            true,
        )
    }

    #[test]
    fn test_cleaning_query() {
        let b = QueryBuilder::new("MIGRATION_STAGE");
        assert_eq!(
            b.cleaning_query(&table()),
            "REMOVE @MIGRATION_STAGE/prod/sales/orders/"
        );
    }

    #[test]
    fn test_copy_query_exact_shape() {
        let b = QueryBuilder::new("MIGRATION_STAGE");
        let q = b.copy_query(
            &table(),
            &plan(),
            &QueryOptions {
                sample_limit: Some(100),
            },
        );
        let expected = "COPY INTO @MIGRATION_STAGE/prod/sales/orders/\n\
FROM (\n\
\x20   SELECT\n\
\x20       \"Order ID\" AS \"order_id\",\n\
\x20       CAST(\"TS\" AS STRING) AS \"ts\"\n\
\x20   FROM PROD.SALES.ORDERS\n\
\x20   LIMIT 100\n\
)\n\
FILE_FORMAT = (TYPE = PARQUET, SNAPPY_COMPRESSION = TRUE)\n\
OVERWRITE = TRUE\n\
HEADER = TRUE;";
        assert_eq!(q, expected);
    }

    #[test]
    fn test_copy_query_no_limit() {
        let b = QueryBuilder::new("S");
        let q = b.copy_query(&table(), &plan(), &QueryOptions::default());
        assert!(!q.contains("LIMIT"));
        assert!(q.contains("FROM PROD.SALES.ORDERS\n)"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let b = QueryBuilder::new("S");
        let opts = QueryOptions {
            sample_limit: Some(100),
        };
        assert_eq!(
            b.build(&table(), &plan(), &opts),
            b.build(&table(), &plan(), &opts)
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
