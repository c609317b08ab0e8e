//! Configuration structs deserialized from the YAML config file.

use serde::{Deserialize, Serialize};

use crate::discover::TableRule;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub snowflake: SourceConfig,
    pub bigquery: TargetConfig,
    pub migration: MigrationConfig,
}

/// Source warehouse settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Named connection the vendor CLI authenticates with.
    pub connection_name: String,

    /// External stage the export writes to, without the `@`.
    pub external_stage: String,
}

/// Destination warehouse settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub project_id: String,

    /// Bucket URI backing the external stage, e.g. `gs://bucket/prefix`.
    pub gcs_uri: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_dataset_prefix")]
    pub dataset_prefix: String,
}

fn default_location() -> String {
    "EU".to_string()
}

fn default_dataset_prefix() -> String {
    "snowflake_".to_string()
}

/// Run-wide migration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub tables: Vec<TableRule>,

    /// Row cap applied when the run is in sample mode.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Directory for result record files.
    #[serde(default = "default_logs_path")]
    pub logs_path: String,

    /// Export timezone-carrying timestamps as strings.
    #[serde(default = "default_true")]
    pub cast_timestamp_to_string: bool,
}

fn default_sample_limit() -> usize {
    100
}

fn default_logs_path() -> String {
    "logs".to_string()
}

fn default_true() -> bool {
    true
}

/// Run-mode flags from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub interactive: bool,
    pub sample: bool,
    pub verbose: bool,

    /// Disable the timestamp-to-string cast for this run.
    pub raw_timestamps: bool,
}
