//! Collaborator traits the workflow is written against.
//!
//! Production wires CLI-backed implementations; tests wire mocks.

use async_trait::async_trait;

use crate::core::dest_schema::{DestinationSchema, PartitionClusterSpec};
use crate::core::plan::{ColumnMeta, TableTarget};
use crate::discover::TableRule;
use crate::error::Result;
use crate::report::AttemptRecord;

/// Resolves table rules against the source catalog.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Expand one rule into concrete tables with their column metadata,
    /// in catalog order.
    async fn discover(&self, rule: &TableRule) -> Result<Vec<(TableTarget, Vec<ColumnMeta>)>>;

    /// Current source row count for a table.
    async fn row_count(&self, table: &TableTarget) -> Result<i64>;
}

/// Runs the remote statements and load jobs for one table.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Execute one export-side statement (cleaning or copy) at the source.
    async fn run_export(&self, table: &TableTarget, query: &str) -> Result<()>;

    /// Load the staged files into the destination table and return the
    /// destination row count afterwards.
    async fn run_load(
        &self,
        table: &TableTarget,
        schema: &DestinationSchema,
        partitioning: &PartitionClusterSpec,
        source_uri: &str,
    ) -> Result<i64>;
}

/// Opens an external editor on a piece of text and returns the result.
pub trait EditorLauncher: Send {
    fn edit(&self, text: &str) -> Result<String>;
}

/// Receives one record per attempted table.
pub trait ResultSink: Send {
    fn record(&mut self, record: &AttemptRecord) -> Result<()>;
}

/// An operator decision offered at a workflow checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Proceed,
    Skip,
    Retry,
    EditAndRetry,
    EditCleaning,
    EditCopy,
    EditSchema,
    EditPartition,
    EditCluster,
    Abort,
}

impl Choice {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Proceed => "Proceed",
            Self::Skip => "Skip this table",
            Self::Retry => "Retry",
            Self::EditAndRetry => "Edit query and retry",
            Self::EditCleaning => "Edit cleaning query",
            Self::EditCopy => "Edit copy query",
            Self::EditSchema => "Edit schema",
            Self::EditPartition => "Edit partitioning",
            Self::EditCluster => "Edit clustering",
            Self::Abort => "Abort run",
        }
    }
}

/// Presents checkpoints to the operator.
pub trait Interaction: Send {
    /// Show a prompt and the offered choices, return the one picked.
    /// Implementations must return a member of `choices`.
    fn choose(&mut self, prompt: &str, choices: &[Choice]) -> Result<Choice>;
}

/// Interaction stub for non-interactive runs. Always proceeds.
pub struct NoInteraction;

impl Interaction for NoInteraction {
    fn choose(&mut self, _prompt: &str, choices: &[Choice]) -> Result<Choice> {
        Ok(choices.first().copied().unwrap_or(Choice::Proceed))
    }
}
