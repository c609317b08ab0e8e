//! Collaborator implementations backed by the vendor CLIs.
//!
//! Authentication and network transport stay inside `snowsql` and `bq`;
//! this module only builds argument lists and parses their JSON output.

use std::io::Write;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use sf_bq_migrate::discover::{group_metadata_rows, MetadataRow};
use sf_bq_migrate::{
    ColumnMeta, DestinationSchema, JobRunner, MetadataProvider, MigrateError, PartitionClusterSpec,
    Result, TableRule, TableTarget,
};

/// Thin wrapper over the `snowsql` CLI using a named connection.
pub struct SnowSql {
    connection_name: String,
}

impl SnowSql {
    pub fn new(connection_name: impl Into<String>) -> Self {
        Self {
            connection_name: connection_name.into(),
        }
    }

    async fn run(&self, query: &str) -> Result<String> {
        debug!(query, "running snowsql");
        let output = Command::new("snowsql")
            .arg("-c")
            .arg(&self.connection_name)
            .arg("-o")
            .arg("output_format=json")
            .arg("-o")
            .arg("friendly=false")
            .arg("-o")
            .arg("timing=false")
            .arg("-q")
            .arg(query)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(MigrateError::remote(
                "snowsql",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a query and parse the JSON result rows.
    async fn query_json(&self, query: &str) -> Result<Vec<serde_json::Value>> {
        let stdout = self.run(query).await?;
        // snowsql prints the result set as a single JSON array
        let start = stdout.find('[').ok_or_else(|| {
            MigrateError::remote("snowsql", "no JSON array in snowsql output")
        })?;
        let end = stdout.rfind(']').ok_or_else(|| {
            MigrateError::remote("snowsql", "unterminated JSON array in snowsql output")
        })?;
        Ok(serde_json::from_str(&stdout[start..=end])?)
    }
}

fn value_as_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl MetadataProvider for SnowSql {
    async fn discover(&self, rule: &TableRule) -> Result<Vec<(TableTarget, Vec<ColumnMeta>)>> {
        let rows = self.query_json(&rule.metadata_query()).await?;
        let rows = rows
            .into_iter()
            .map(serde_json::from_value::<MetadataRow>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(group_metadata_rows(rows))
    }

    async fn row_count(&self, table: &TableTarget) -> Result<i64> {
        let query = format!("SELECT COUNT(*) AS CNT FROM {}", table.full_name());
        let rows = self.query_json(&query).await?;
        rows.first()
            .and_then(|row| row.get("CNT"))
            .and_then(value_as_i64)
            .ok_or_else(|| MigrateError::remote("snowsql", "count query returned no rows"))
    }
}

/// Thin wrapper over the `bq` CLI.
pub struct BqCli {
    project_id: String,
    location: String,
}

impl BqCli {
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
        }
    }

    async fn run(&self, stage: &str, args: &[String]) -> Result<String> {
        debug!(?args, "running bq");
        let output = Command::new("bq")
            .arg(format!("--project_id={}", self.project_id))
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(MigrateError::remote(
                stage,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Create the dataset if it does not exist yet.
    async fn ensure_dataset(&self, dataset: &str) -> Result<()> {
        let args = vec![
            "mk".to_string(),
            "--dataset".to_string(),
            format!("--location={}", self.location),
            dataset.to_string(),
        ];
        match self.run("dataset", &args).await {
            Ok(_) => Ok(()),
            Err(MigrateError::RemoteJob { message, .. }) if message.contains("already exists") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn load(
        &self,
        dataset: &str,
        table_id: &str,
        schema: &DestinationSchema,
        partitioning: &PartitionClusterSpec,
        source_uri: &str,
    ) -> Result<()> {
        let mut args = vec![
            format!("--location={}", self.location),
            "load".to_string(),
            "--source_format=PARQUET".to_string(),
            "--replace".to_string(),
        ];
        if let Some(field) = &partitioning.partition_field {
            args.push(format!("--time_partitioning_field={field}"));
            if let Some(granularity) = partitioning.partition_granularity {
                args.push(format!("--time_partitioning_type={}", granularity.as_str()));
            }
        }
        if !partitioning.cluster_fields.is_empty() {
            args.push(format!(
                "--clustering_fields={}",
                partitioning.cluster_fields.join(",")
            ));
        }

        // Explicit schemas go through a temp file; autodetect otherwise.
        let mut schema_file = None;
        match schema {
            DestinationSchema::Autodetect => args.push("--autodetect".to_string()),
            DestinationSchema::Explicit(_) => {
                let mut file = tempfile::NamedTempFile::new()?;
                file.write_all(schema.to_json()?.as_bytes())?;
                file.flush()?;
                schema_file = Some(file);
            }
        }

        args.push(format!("{dataset}.{table_id}"));
        args.push(source_uri.to_string());
        if let Some(file) = &schema_file {
            args.push(file.path().to_string_lossy().into_owned());
        }

        self.run("load", &args).await?;
        Ok(())
    }

    async fn count_rows(&self, dataset: &str, table_id: &str) -> Result<i64> {
        let query = format!(
            "SELECT COUNT(*) AS cnt FROM `{}.{}.{}`",
            self.project_id, dataset, table_id
        );
        let args = vec![
            "query".to_string(),
            "--nouse_legacy_sql".to_string(),
            "--format=json".to_string(),
            query,
        ];
        let stdout = self.run("count", &args).await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(stdout.trim())?;
        rows.first()
            .and_then(|row| row.get("cnt"))
            .and_then(value_as_i64)
            .ok_or_else(|| MigrateError::remote("count", "count query returned no rows"))
    }
}

/// Runs exports through snowsql and loads through bq.
pub struct CliJobRunner {
    snowsql: SnowSql,
    bq: BqCli,
    dataset_prefix: String,
}

impl CliJobRunner {
    pub fn new(snowsql: SnowSql, bq: BqCli, dataset_prefix: impl Into<String>) -> Self {
        Self {
            snowsql,
            bq,
            dataset_prefix: dataset_prefix.into(),
        }
    }
}

#[async_trait]
impl JobRunner for CliJobRunner {
    async fn run_export(&self, table: &TableTarget, query: &str) -> Result<()> {
        // USE DATABASE so the stage resolves in the right context
        let statement = format!("USE DATABASE {};\n{}", table.database, query);
        self.snowsql.run(&statement).await?;
        info!(table = %table.full_name(), "export statement completed");
        Ok(())
    }

    async fn run_load(
        &self,
        table: &TableTarget,
        schema: &DestinationSchema,
        partitioning: &PartitionClusterSpec,
        source_uri: &str,
    ) -> Result<i64> {
        let dataset = table.dataset_id(&self.dataset_prefix);
        let table_id = table.table_id();
        self.bq.ensure_dataset(&dataset).await?;
        self.bq
            .load(&dataset, &table_id, schema, partitioning, source_uri)
            .await?;
        let loaded = self.bq.count_rows(&dataset, &table_id).await?;
        info!(table = %table.full_name(), dataset = %dataset, loaded, "load completed");
        Ok(loaded)
    }
}
