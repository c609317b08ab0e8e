//! Destination schema representation and inference.

use serde::{Deserialize, Serialize};

use crate::core::plan::{ColumnMeta, ColumnPlan};
use crate::error::{MigrateError, Result};
use crate::typemap;

/// One field in an explicit destination schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "NULLABLE".to_string()
}

impl SchemaField {
    pub fn nullable(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            mode: default_mode(),
        }
    }
}

/// How the destination table's schema is determined at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationSchema {
    /// Let the destination infer the schema from the staged files.
    Autodetect,

    /// Field list supplied verbatim to the load job.
    Explicit(Vec<SchemaField>),
}

impl DestinationSchema {
    /// JSON form handed to the editor and to the load job. Autodetect
    /// serializes as an empty array.
    pub fn to_json(&self) -> Result<String> {
        match self {
            Self::Autodetect => Ok("[]".to_string()),
            Self::Explicit(fields) => Ok(serde_json::to_string_pretty(fields)?),
        }
    }

    /// Parse editor output back. An empty array means autodetect.
    pub fn from_json(text: &str) -> Result<Self> {
        let fields: Vec<SchemaField> = serde_json::from_str(text)?;
        if fields.is_empty() {
            Ok(Self::Autodetect)
        } else {
            Ok(Self::Explicit(fields))
        }
    }
}

/// Time partitioning granularity for the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionGranularity {
    Day,
    Hour,
    Month,
    Year,
}

impl PartitionGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Month => "MONTH",
            Self::Year => "YEAR",
        }
    }
}

/// Optional partitioning and clustering settings for one table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartitionClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_granularity: Option<PartitionGranularity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_fields: Vec<String>,
}

impl PartitionClusterSpec {
    pub fn is_empty(&self) -> bool {
        self.partition_field.is_none() && self.cluster_fields.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Decide the destination schema for one table.
///
/// Precedence: an explicit schema from configuration wins outright; a
/// non-empty partition/cluster spec forces autodetect so the load job can
/// honor it; otherwise every column is mapped through the type table.
/// Casted columns land as their cast target regardless of source type.
pub fn infer_schema(
    table_name: &str,
    columns: &[ColumnMeta],
    plan: &ColumnPlan,
    explicit: Option<&[SchemaField]>,
    partitioning: &PartitionClusterSpec,
) -> Result<DestinationSchema> {
    if let Some(fields) = explicit {
        return Ok(DestinationSchema::Explicit(fields.to_vec()));
    }
    if !partitioning.is_empty() {
        return Ok(DestinationSchema::Autodetect);
    }

    let mut fields = Vec::with_capacity(columns.len());
    for (meta, normalized) in columns.iter().zip(&plan.columns) {
        let field_type = match &normalized.cast_target {
            Some(target) if normalized.needs_cast => target.clone(),
            _ => typemap::snowflake_to_bigquery(&meta.data_type)
                .ok_or_else(|| MigrateError::UnmappableType {
                    table: table_name.to_string(),
                    column: meta.name.clone(),
                    data_type: meta.data_type.clone(),
                })?
                .to_string(),
        };
        fields.push(SchemaField::nullable(&normalized.dest_name, field_type));
    }
    Ok(DestinationSchema::Explicit(fields))
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
    fn test_infer_schema_from_typemap() {
        let cols = vec![
            meta("ID", "NUMBER(38,0)", 1),
            meta("NAME", "VARCHAR(100)", 2),
            meta("TS", "TIMESTAMP_TZ", 3),
        ];
        let plan = ColumnPlan::build(&cols, true);
        let schema = infer_schema("T", &cols, &plan, None, &PartitionClusterSpec::default())
            .expect("schema");
        let DestinationSchema::Explicit(fields) = schema else {
            panic!("expected explicit schema");
        };
        assert_eq!(fields[0].field_type, "NUMERIC");
        assert_eq!(fields[1].field_type, "STRING");
        // tz timestamps exported as strings land as STRING, not TIMESTAMP
        assert_eq!(fields[2].field_type, "STRING");
        assert!(fields.iter().all(|f| f.mode == "NULLABLE"));
    }

    #[test]
    fn test_explicit_schema_wins() {
        let cols = vec![meta("X", "GEOMETRY", 1)];
        let plan = ColumnPlan::build(&cols, true);
        let explicit = vec![SchemaField::nullable("x", "STRING")];
        let spec = PartitionClusterSpec {
            partition_field: Some("x".into()),
            partition_granularity: Some(PartitionGranularity::Day),
            cluster_fields: vec![],
        };
        let schema = infer_schema("T", &cols, &plan, Some(&explicit), &spec).expect("schema");
        assert_eq!(schema, DestinationSchema::Explicit(explicit));
    }

    #[test]
    fn test_partitioning_forces_autodetect() {
        let cols = vec![meta("ID", "NUMBER", 1)];
        let plan = ColumnPlan::build(&cols, true);
        let spec = PartitionClusterSpec {
            partition_field: Some("id".into()),
            partition_granularity: Some(PartitionGranularity::Day),
            cluster_fields: vec![],
        };
        let schema = infer_schema("T", &cols, &plan, None, &spec).expect("schema");
        assert_eq!(schema, DestinationSchema::Autodetect);
    }

    #[test]
    fn test_unmappable_type_is_an_error() {
        let cols = vec![meta("SHAPE", "GEOMETRY", 1)];
        let plan = ColumnPlan::build(&cols, true);
        let err = infer_schema("T", &cols, &plan, None, &PartitionClusterSpec::default())
            .expect_err("geometry has no mapping");
        assert!(matches!(err, MigrateError::UnmappableType { .. }));
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = DestinationSchema::Explicit(vec![SchemaField::nullable("id", "INTEGER")]);
        let json = schema.to_json().expect("json");
        assert_eq!(DestinationSchema::from_json(&json).expect("parse"), schema);
        assert_eq!(
            DestinationSchema::from_json("[]").expect("parse"),
            DestinationSchema::Autodetect
        );
    }
}
