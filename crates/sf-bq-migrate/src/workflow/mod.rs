//! The per-table migration state machine.
//!
//! Tables run sequentially in configuration order. Each table walks
//! discover, query planning, optional preview, export, optional settings
//! preview, load and validate, then records exactly one outcome. Failures
//! stay inside the table; only an operator abort stops the run.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{self, Config, RunOptions};
use crate::core::dest_schema::{
    infer_schema, DestinationSchema, PartitionClusterSpec, SchemaField,
};
use crate::core::plan::{ColumnMeta, ColumnPlan, TableTarget};
use crate::core::query::{QueryBuilder, QueryOptions};
use crate::core::traits::{
    Choice, EditorLauncher, Interaction, JobRunner, MetadataProvider, ResultSink,
};
use crate::error::{MigrateError, Result};
use crate::report::{AttemptRecord, Outcome, RunReport};
use crate::validator::{self, Validation};

/// Serializable per-table plan emitted by dry runs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TablePlan {
    pub table: String,
    pub dataset: String,
    pub source_rows: i64,
    pub cleaning_query: Option<String>,
    pub copy_query: String,
    /// `None` means schema autodetect at load time.
    pub schema: Option<Vec<SchemaField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

enum TableStatus {
    Succeeded { loaded_rows: i64 },
    Skipped,
    Failed { error: String },
}

enum Recovery {
    Retry,
    EditRetry,
    Fail(String),
}

pub struct MigrationWorkflow {
    config: Config,
    options: RunOptions,
    metadata: Arc<dyn MetadataProvider>,
    jobs: Arc<dyn JobRunner>,
    editor: Box<dyn EditorLauncher>,
    interaction: Box<dyn Interaction>,
    sink: Box<dyn ResultSink>,
}

impl MigrationWorkflow {
    pub fn new(
        config: Config,
        options: RunOptions,
        metadata: Arc<dyn MetadataProvider>,
        jobs: Arc<dyn JobRunner>,
        editor: Box<dyn EditorLauncher>,
        interaction: Box<dyn Interaction>,
        sink: Box<dyn ResultSink>,
    ) -> Result<Self> {
        config::validate_options(&config, &options)?;
        Ok(Self {
            config,
            options,
            metadata,
            jobs,
            editor,
            interaction,
            sink,
        })
    }

    fn cast_timestamps(&self) -> bool {
        self.config.migration.cast_timestamp_to_string && !self.options.raw_timestamps
    }

    fn query_options(&self) -> QueryOptions {
        QueryOptions {
            sample_limit: self
                .options
                .sample
                .then_some(self.config.migration.sample_limit),
        }
    }

    fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(&self.config.snowflake.external_stage)
    }

    fn source_uri(&self, table: &TableTarget) -> String {
        format!(
            "{}/{}*",
            self.config.bigquery.gcs_uri.trim_end_matches('/'),
            table.stage_path()
        )
    }

    /// Expand every rule into concrete tables with their columns and row
    /// counts, in configuration then catalog order.
    async fn discover_all(&self) -> Result<Vec<(TableTarget, Vec<ColumnMeta>)>> {
        let mut tables = Vec::new();
        for rule in &self.config.migration.tables {
            let mut found = self.metadata.discover(rule).await?;
            if found.is_empty() {
                warn!(database = %rule.database, "rule matched no tables");
            }
            for (target, _) in &mut found {
                target.row_count = self.metadata.row_count(target).await?;
            }
            tables.append(&mut found);
        }
        info!(tables = tables.len(), "discovery complete");
        Ok(tables)
    }

    /// Generate the full plan without executing anything.
    pub async fn plan(&self) -> Result<Vec<TablePlan>> {
        let builder = self.builder();
        let opts = self.query_options();
        let mut plans = Vec::new();
        for (table, columns) in self.discover_all().await? {
            let column_plan = ColumnPlan::build(&columns, self.cast_timestamps());
            let pair = builder.build(&table, &column_plan, &opts);
            let (schema, error) = match infer_schema(
                &table.full_name(),
                &columns,
                &column_plan,
                None,
                &PartitionClusterSpec::default(),
            ) {
                Ok(DestinationSchema::Explicit(fields)) => (Some(fields), None),
                Ok(DestinationSchema::Autodetect) => (None, None),
                Err(e) => (None, Some(e.to_string())),
            };
            plans.push(TablePlan {
                table: table.full_name(),
                dataset: table.dataset_id(&self.config.bigquery.dataset_prefix),
                source_rows: table.row_count,
                cleaning_query: pair.cleaning_query,
                copy_query: pair.copy_query,
                schema,
                error,
            });
        }
        Ok(plans)
    }

    /// Run the whole migration and return the per-table report.
    pub async fn run(&mut self) -> Result<RunReport> {
        let tables = self.discover_all().await?;
        let mut report = RunReport::default();
        for (table, columns) in tables {
            let name = table.full_name();
            let started_at = Utc::now();
            info!(table = %name, rows = table.row_count, "processing table");
            let (status, attempts) = match self.process_table(&table, &columns).await {
                Ok(result) => result,
                Err(MigrateError::Aborted) => {
                    warn!(table = %name, "run aborted by operator");
                    report.completed_at = Some(Utc::now());
                    return Ok(report);
                }
                // Anything else stays confined to the current table.
                Err(e) => {
                    error!(table = %name, error = %e, "table processing error");
                    (TableStatus::Failed { error: e.to_string() }, 1)
                }
            };
            let record = match status {
                TableStatus::Succeeded { loaded_rows } => {
                    info!(table = %name, loaded_rows, "table migrated");
                    AttemptRecord {
                        table: name,
                        outcome: Outcome::Succeeded,
                        attempts,
                        started_at,
                        completed_at: Utc::now(),
                        source_rows: table.row_count,
                        loaded_rows: Some(loaded_rows),
                        error: None,
                    }
                }
                TableStatus::Skipped => AttemptRecord {
                    table: name,
                    outcome: Outcome::Skipped,
                    attempts,
                    started_at,
                    completed_at: Utc::now(),
                    source_rows: table.row_count,
                    loaded_rows: None,
                    error: None,
                },
                TableStatus::Failed { error: message } => {
                    error!(table = %name, error = %message, "table failed");
                    AttemptRecord {
                        table: name,
                        outcome: Outcome::Failed,
                        attempts,
                        started_at,
                        completed_at: Utc::now(),
                        source_rows: table.row_count,
                        loaded_rows: None,
                        error: Some(message),
                    }
                }
            };
            self.sink.record(&record)?;
            report.push(record);
        }
        report.completed_at = Some(Utc::now());
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "run complete"
        );
        Ok(report)
    }

    /// Walk one table through the state machine. Returns the terminal
    /// status and the attempt count; `Err(Aborted)` is the only error
    /// that escapes to the run level.
    async fn process_table(
        &mut self,
        table: &TableTarget,
        columns: &[ColumnMeta],
    ) -> Result<(TableStatus, u32)> {
        let name = table.full_name();
        let column_plan = ColumnPlan::build(columns, self.cast_timestamps());
        let mut pair = self.builder().build(table, &column_plan, &self.query_options());

        // Preview: interactive pauses, verbose prints and carries on.
        if self.options.interactive {
            loop {
                let prompt = format!(
                    "{}\n\n-- cleaning --\n{}\n\n-- copy --\n{}",
                    name,
                    pair.cleaning_query.as_deref().unwrap_or("(none)"),
                    pair.copy_query
                );
                match self.interaction.choose(
                    &prompt,
                    &[
                        Choice::Proceed,
                        Choice::Skip,
                        Choice::EditCleaning,
                        Choice::EditCopy,
                        Choice::Abort,
                    ],
                )? {
                    Choice::Proceed => break,
                    Choice::Skip => return Ok((TableStatus::Skipped, pair.attempt)),
                    Choice::EditCleaning => {
                        let current = pair.cleaning_query.clone().unwrap_or_default();
                        match self.editor.edit(&current) {
                            Ok(edited) => {
                                pair.cleaning_query =
                                    (!edited.trim().is_empty()).then(|| edited.trim().to_string());
                            }
                            Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                        }
                    }
                    Choice::EditCopy => match self.editor.edit(&pair.copy_query) {
                        Ok(edited) => pair.copy_query = edited.trim().to_string(),
                        Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                    },
                    Choice::Abort => return Err(MigrateError::Aborted),
                    _ => {}
                }
            }
        } else if self.options.verbose {
            if let Some(q) = &pair.cleaning_query {
                info!(table = %name, query = %q, "cleaning query");
            }
            info!(table = %name, query = %pair.copy_query, "copy query");
        }

        // Stage cleanup, then the export itself. Each loops on operator
        // retries with no automatic limit.
        loop {
            let Some(query) = pair.cleaning_query.clone() else {
                break;
            };
            match self.jobs.run_export(table, &query).await {
                Ok(()) => break,
                Err(e) => match self.recover(&name, "cleaning failed", &e)? {
                    Recovery::Retry => pair.attempt += 1,
                    Recovery::EditRetry => {
                        pair.attempt += 1;
                        match self.editor.edit(&query) {
                            Ok(edited) => {
                                pair.cleaning_query =
                                    (!edited.trim().is_empty()).then(|| edited.trim().to_string());
                            }
                            Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                        }
                    }
                    Recovery::Fail(message) => {
                        return Ok((TableStatus::Failed { error: message }, pair.attempt))
                    }
                },
            }
        }

        loop {
            match self.jobs.run_export(table, &pair.copy_query).await {
                Ok(()) => break,
                Err(e) => match self.recover(&name, "export failed", &e)? {
                    Recovery::Retry => pair.attempt += 1,
                    Recovery::EditRetry => {
                        pair.attempt += 1;
                        match self.editor.edit(&pair.copy_query) {
                            Ok(edited) => pair.copy_query = edited.trim().to_string(),
                            Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                        }
                    }
                    Recovery::Fail(message) => {
                        return Ok((TableStatus::Failed { error: message }, pair.attempt))
                    }
                },
            }
        }

        // Destination settings. An unmappable type is fatal unless the
        // operator supplies a schema by hand.
        let mut partitioning = PartitionClusterSpec::default();
        let mut schema_edited = false;
        let mut schema =
            match infer_schema(&name, columns, &column_plan, None, &partitioning) {
                Ok(schema) => schema,
                Err(e @ MigrateError::UnmappableType { .. }) => {
                    error!(table = %name, error = %e, "schema inference failed");
                    if !self.options.interactive {
                        return Ok((TableStatus::Failed { error: e.to_string() }, pair.attempt));
                    }
                    loop {
                        match self
                            .interaction
                            .choose(&format!("{name}: {e}"), &[Choice::EditSchema, Choice::Skip])?
                        {
                            Choice::EditSchema => {
                                match self.edit_schema(&DestinationSchema::Autodetect) {
                                    Ok(edited) => {
                                        schema_edited = true;
                                        break edited;
                                    }
                                    Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                                }
                            }
                            _ => return Ok((TableStatus::Skipped, pair.attempt)),
                        }
                    }
                }
                Err(e) => return Err(e),
            };

        if self.options.interactive {
            loop {
                let prompt = format!(
                    "{}\n\n-- schema --\n{}\n\n-- partitioning --\n{}",
                    name,
                    schema.to_json()?,
                    partitioning.to_json()?
                );
                match self.interaction.choose(
                    &prompt,
                    &[
                        Choice::Proceed,
                        Choice::Skip,
                        Choice::EditSchema,
                        Choice::EditPartition,
                        Choice::EditCluster,
                        Choice::Abort,
                    ],
                )? {
                    Choice::Proceed => break,
                    Choice::Skip => return Ok((TableStatus::Skipped, pair.attempt)),
                    Choice::EditSchema => match self.edit_schema(&schema) {
                        Ok(edited) => {
                            schema = edited;
                            schema_edited = true;
                        }
                        Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                    },
                    Choice::EditPartition => match self.edit_partitioning(&partitioning) {
                        Ok(edited) => {
                            partitioning = edited;
                            if !schema_edited {
                                schema =
                                    infer_schema(&name, columns, &column_plan, None, &partitioning)?;
                            }
                        }
                        Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                    },
                    Choice::EditCluster => {
                        match self.edit_cluster_fields(&partitioning.cluster_fields) {
                            Ok(edited) => {
                                partitioning.cluster_fields = edited;
                                if !schema_edited {
                                    schema = infer_schema(
                                        &name,
                                        columns,
                                        &column_plan,
                                        None,
                                        &partitioning,
                                    )?;
                                }
                            }
                            Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                        }
                    }
                    Choice::Abort => return Err(MigrateError::Aborted),
                    _ => {}
                }
            }
        }

        // Load and validate; a mismatch retries the load half only.
        let source_uri = self.source_uri(table);
        loop {
            let loaded = match self
                .jobs
                .run_load(table, &schema, &partitioning, &source_uri)
                .await
            {
                Ok(loaded) => loaded,
                Err(e) => match self.recover_load(&name, "load failed", &e)? {
                    Recovery::Retry => {
                        pair.attempt += 1;
                        continue;
                    }
                    Recovery::EditRetry => {
                        pair.attempt += 1;
                        match self.edit_schema(&schema) {
                            Ok(edited) => schema = edited,
                            Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                        }
                        continue;
                    }
                    Recovery::Fail(message) => {
                        return Ok((TableStatus::Failed { error: message }, pair.attempt))
                    }
                },
            };

            let sample_limit = self.query_options().sample_limit;
            match validator::validate(&name, table.row_count, loaded, sample_limit) {
                Validation::Match => {
                    return Ok((TableStatus::Succeeded { loaded_rows: loaded }, pair.attempt))
                }
                Validation::Mismatch { expected, actual } => {
                    let e = MigrateError::RowCountMismatch {
                        table: name.clone(),
                        expected,
                        actual,
                    };
                    match self.recover_load(&name, "validation failed", &e)? {
                        Recovery::Retry => pair.attempt += 1,
                        Recovery::EditRetry => {
                            pair.attempt += 1;
                            match self.edit_schema(&schema) {
                                Ok(edited) => schema = edited,
                                Err(e) => warn!(table = %name, error = %e, "edit discarded"),
                            }
                        }
                        Recovery::Fail(message) => {
                            return Ok((TableStatus::Failed { error: message }, pair.attempt))
                        }
                    }
                }
            }
        }
    }

    // Editor round-trips for destination settings. Errors from the editor
    // or from malformed JSON come back as Err so callers can discard the
    // edit and re-offer the menu.
    fn edit_schema(&mut self, current: &DestinationSchema) -> Result<DestinationSchema> {
        DestinationSchema::from_json(&self.editor.edit(&current.to_json()?)?)
    }

    fn edit_partitioning(&mut self, current: &PartitionClusterSpec) -> Result<PartitionClusterSpec> {
        PartitionClusterSpec::from_json(&self.editor.edit(&current.to_json()?)?)
    }

    fn edit_cluster_fields(&mut self, current: &[String]) -> Result<Vec<String>> {
        let json = serde_json::to_string_pretty(current)?;
        Ok(serde_json::from_str(&self.editor.edit(&json)?)?)
    }

    /// Failure checkpoint for export-side errors. Interactive runs get
    /// retry / edit-and-retry / skip; anything else fails the table.
    fn recover(&mut self, table: &str, context: &str, err: &MigrateError) -> Result<Recovery> {
        self.recover_with(table, context, err, Choice::EditAndRetry)
    }

    /// Failure checkpoint for load-side errors; the edit option opens the
    /// destination schema instead of a query.
    fn recover_load(&mut self, table: &str, context: &str, err: &MigrateError) -> Result<Recovery> {
        self.recover_with(table, context, err, Choice::EditSchema)
    }

    fn recover_with(
        &mut self,
        table: &str,
        context: &str,
        err: &MigrateError,
        edit: Choice,
    ) -> Result<Recovery> {
        error!(table, error = %err, "{context}");
        if !self.options.interactive {
            return Ok(Recovery::Fail(err.to_string()));
        }
        let prompt = format!("{table}: {context}: {err}");
        match self
            .interaction
            .choose(&prompt, &[Choice::Retry, edit, Choice::Skip])?
        {
            Choice::Retry => Ok(Recovery::Retry),
            c if c == edit => Ok(Recovery::EditRetry),
            _ => Ok(Recovery::Fail(err.to_string())),
        }
    }
}
