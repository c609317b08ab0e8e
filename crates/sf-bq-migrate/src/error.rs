//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source type has no BigQuery equivalent in the type map.
    ///
    /// Fatal for the current table: the load cannot proceed until the
    /// operator supplies an explicit schema.
    #[error("No BigQuery type mapping for {table}.{column} (source type {data_type}) - supply an explicit schema")]
    UnmappableType {
        table: String,
        column: String,
        data_type: String,
    },

    /// A remote warehouse job (cleaning, export, load) failed.
    #[error("{stage} job failed: {message}")]
    RemoteJob { stage: String, message: String },

    /// Source and destination row counts disagree after a load.
    #[error("Row count mismatch for {table}: expected {expected}, actual {actual}")]
    RowCountMismatch {
        table: String,
        expected: i64,
        actual: i64,
    },

    /// The operator chose to abort the run. Control signal, not a failure.
    #[error("Migration aborted by operator")]
    Aborted,

    /// Launching or reading back from the external editor failed.
    #[error("Editor error: {0}")]
    Editor(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a RemoteJob error for a named pipeline stage.
    pub fn remote(stage: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::RemoteJob {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether the operator may retry past this error.
    ///
    /// Recoverable errors route to the Failed side state with
    /// retry/edit/skip options; everything else ends the table (or, for
    /// [`MigrateError::Aborted`], the run).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MigrateError::RemoteJob { .. } | MigrateError::RowCountMismatch { .. }
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) => 2,
            MigrateError::Aborted => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
