//! # sf-bq-migrate
//!
//! Snowflake to BigQuery table migration library.
//!
//! Data moves source → external stage (Parquet on GCS) → destination.
//! The library owns the deterministic parts of that pipeline:
//!
//! - **Identifier normalization** to destination-safe column names
//! - **Query generation** for stage cleanup and Parquet export
//! - **Schema inference** through a fixed type map, with autodetect
//!   and explicit-schema overrides
//! - **The per-table workflow** with interactive preview, retry and
//!   edit checkpoints, and row count validation
//! - **Result recording** to per-run YAML files
//!
//! Warehouse access, editor launch, and operator prompts sit behind the
//! traits in [`core::traits`]; the CLI crate supplies implementations.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sf_bq_migrate::Config;
//!
//! fn main() -> sf_bq_migrate::Result<()> {
//!     let config = Config::load("config.yml")?;
//!     println!("{} table rules", config.migration.tables.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod discover;
pub mod error;
pub mod report;
pub mod typemap;
pub mod validator;
pub mod workflow;

// Re-exports for convenient access
pub use crate::core::dest_schema::{
    DestinationSchema, PartitionClusterSpec, PartitionGranularity, SchemaField,
};
pub use crate::core::plan::{ColumnMeta, ColumnPlan, NormalizedColumn, TableTarget};
pub use crate::core::query::{QueryBuilder, QueryOptions, QueryPair};
pub use crate::core::traits::{
    Choice, EditorLauncher, Interaction, JobRunner, MetadataProvider, NoInteraction, ResultSink,
};
pub use config::{Config, MigrationConfig, RunOptions, SourceConfig, TargetConfig};
pub use discover::{RuleScope, TableRule};
pub use error::{MigrateError, Result};
pub use report::{AttemptRecord, MemorySink, Outcome, RunReport, YamlSink};
pub use workflow::{MigrationWorkflow, TablePlan};
