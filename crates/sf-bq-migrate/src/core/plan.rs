//! Table and column metadata types plus the per-table column plan.

use serde::{Deserialize, Serialize};

use super::normalize::NameAllocator;

/// Snowflake types that carry a timezone and get cast to STRING on export.
pub const TIMESTAMP_TZ_TYPES: [&str; 2] = ["TIMESTAMP_TZ", "TIMESTAMP_LTZ"];

/// Cast target for timezone-carrying timestamp columns.
pub const TIMESTAMP_CAST_TARGET: &str = "STRING";

/// A resolved source table. Built once at discovery, immutable afterwards
/// apart from the row count fetched in the same phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTarget {
    /// Source database name.
    pub database: String,

    /// Source schema name.
    pub schema: String,

    /// Table name.
    pub table: String,

    /// Whether the source object is a view rather than a base table.
    pub is_view: bool,

    /// Source row count at discovery time.
    pub row_count: i64,
}

impl TableTarget {
    /// Fully qualified `database.schema.table` name.
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }

    /// Staging path under the external stage, lowercased with a trailing
    /// slash: `db/schema/table/`.
    pub fn stage_path(&self) -> String {
        format!(
            "{}/{}/{}/",
            self.database.to_lowercase(),
            self.schema.to_lowercase(),
            self.table.to_lowercase()
        )
    }

    /// Destination dataset id: `{prefix}{database}_{schema}`, lowercased,
    /// with dashes flattened to underscores.
    pub fn dataset_id(&self, prefix: &str) -> String {
        format!("{}{}_{}", prefix, self.database, self.schema)
            .replace('-', "_")
            .to_lowercase()
    }

    /// Destination table id.
    pub fn table_id(&self) -> String {
        self.table.to_lowercase()
    }

    /// Source object type label, as INFORMATION_SCHEMA reports it.
    pub fn table_type(&self) -> &'static str {
        if self.is_view {
            "VIEW"
        } else {
            "BASE TABLE"
        }
    }
}

/// Source column metadata, fetched once per table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name exactly as the source reports it.
    pub name: String,

    /// Source data type, e.g. `NUMBER(10,2)` or `TIMESTAMP_TZ`.
    pub data_type: String,

    /// 1-based ordinal position within the table.
    pub ordinal: usize,
}

impl ColumnMeta {
    /// Whether the source type carries a timezone.
    pub fn is_timestamp_tz(&self) -> bool {
        let base = self
            .data_type
            .to_uppercase()
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        TIMESTAMP_TZ_TYPES.contains(&base.as_str())
    }
}

/// One source column with its destination-safe alias and cast decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedColumn {
    /// Column name at the source.
    pub source_name: String,

    /// Unique destination name within the table.
    pub dest_name: String,

    /// Whether the export projection wraps the column in a cast.
    pub needs_cast: bool,

    /// Cast target type when `needs_cast` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast_target: Option<String>,
}

/// Ordered projection plan for one table.
///
/// Rebuilt fresh from the immutable [`ColumnMeta`] list whenever a table
/// (re)enters query planning; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub columns: Vec<NormalizedColumn>,
}

impl ColumnPlan {
    /// Build the plan in source column order.
    ///
    /// `cast_timestamps` controls the STRING cast for timezone-carrying
    /// timestamp columns; other types are never cast.
    pub fn build(columns: &[ColumnMeta], cast_timestamps: bool) -> Self {
        let mut alloc = NameAllocator::new();
        let columns = columns
            .iter()
            .map(|meta| {
                let needs_cast = cast_timestamps && meta.is_timestamp_tz();
                NormalizedColumn {
                    source_name: meta.name.clone(),
                    dest_name: alloc.assign(&meta.name),
                    needs_cast,
                    cast_target: needs_cast.then(|| TIMESTAMP_CAST_TARGET.to_string()),
                }
            })
            .collect();
        Self { columns }
    }

    pub fn dest_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.dest_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, data_type: &str, ordinal: usize) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            data_type: data_type.to_string(),
            ordinal,
        }
    }

    #[test]
    fn test_stage_path_lowercased() {
        let t = TableTarget {
            database: "PROD".into(),
            schema: "SALES".into(),
            table: "ORDERS".into(),
            is_view: false,
            row_count: 0,
        };
        assert_eq!(t.stage_path(), "prod/sales/orders/");
        assert_eq!(t.full_name(), "PROD.SALES.ORDERS");
        assert_eq!(t.dataset_id("snowflake_"), "snowflake_prod_sales");
    }

    #[test]
    fn test_dataset_id_flattens_dashes() {
        let t = TableTarget {
            database: "MY-DB".into(),
            schema: "S1".into(),
            table: "T".into(),
            is_view: false,
            row_count: 0,
        };
        assert_eq!(t.dataset_id("snowflake_"), "snowflake_my_db_s1");
    }

    #[test]
    fn test_timestamp_tz_detection() {
        assert!(meta("C", "TIMESTAMP_TZ", 1).is_timestamp_tz());
        assert!(meta("C", "TIMESTAMP_LTZ(9)", 1).is_timestamp_tz());
        assert!(!meta("C", "TIMESTAMP_NTZ", 1).is_timestamp_tz());
        assert!(!meta("C", "VARCHAR", 1).is_timestamp_tz());
    }

    #[test]
    fn test_plan_casts_only_tz_timestamps() {
        let cols = vec![
            meta("ID", "NUMBER", 1),
            meta("CREATED_AT", "TIMESTAMP_TZ", 2),
            meta("UPDATED_AT", "TIMESTAMP_NTZ", 3),
        ];
        let plan = ColumnPlan::build(&cols, true);
        assert!(!plan.columns[0].needs_cast);
        assert!(plan.columns[1].needs_cast);
        assert_eq!(plan.columns[1].cast_target.as_deref(), Some("STRING"));
        assert!(!plan.columns[2].needs_cast);

        let raw = ColumnPlan::build(&cols, false);
        assert!(raw.columns.iter().all(|c| !c.needs_cast));
    }

    #[test]
    fn test_plan_dest_names_are_distinct() {
        let cols = vec![
            meta("user.name", "VARCHAR", 1),
            meta("user_name", "VARCHAR", 2),
        ];
        let plan = ColumnPlan::build(&cols, true);
        assert_eq!(plan.dest_names(), vec!["user_name", "user_name_2"]);
    }
}
