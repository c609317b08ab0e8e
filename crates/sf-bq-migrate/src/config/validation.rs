//! Configuration validation.

use crate::config::types::{Config, RunOptions};
use crate::error::{MigrateError, Result};

pub fn validate(config: &Config) -> Result<()> {
    if config.snowflake.connection_name.trim().is_empty() {
        return Err(MigrateError::Config(
            "snowflake.connection_name must not be empty".into(),
        ));
    }
    if config.snowflake.external_stage.trim().is_empty() {
        return Err(MigrateError::Config(
            "snowflake.external_stage must not be empty".into(),
        ));
    }
    if config.snowflake.external_stage.starts_with('@') {
        return Err(MigrateError::Config(
            "snowflake.external_stage must not include the '@' prefix".into(),
        ));
    }
    if config.bigquery.project_id.trim().is_empty() {
        return Err(MigrateError::Config(
            "bigquery.project_id must not be empty".into(),
        ));
    }
    if !config.bigquery.gcs_uri.starts_with("gs://") {
        return Err(MigrateError::Config(format!(
            "bigquery.gcs_uri must start with gs://, got '{}'",
            config.bigquery.gcs_uri
        )));
    }
    if config.migration.tables.is_empty() {
        return Err(MigrateError::Config(
            "migration.tables must list at least one rule".into(),
        ));
    }
    if config.migration.sample_limit == 0 {
        return Err(MigrateError::Config(
            "migration.sample_limit must be positive".into(),
        ));
    }
    for rule in &config.migration.tables {
        rule.scope()?;
        if rule.database.trim().is_empty() {
            return Err(MigrateError::Config(
                "table rule has an empty database".into(),
            ));
        }
    }
    Ok(())
}

/// Validate run-mode flags against the loaded config. Disabling the
/// timestamp cast, by flag or by config, is only legal when the operator
/// can see and veto the generated queries.
pub fn validate_options(config: &Config, options: &RunOptions) -> Result<()> {
    let supervised = options.interactive && options.verbose;
    if options.raw_timestamps && !supervised {
        return Err(MigrateError::Config(
            "--raw-timestamps requires both --interactive and --verbose".into(),
        ));
    }
    if !config.migration.cast_timestamp_to_string && !supervised {
        return Err(MigrateError::Config(
            "migration.cast_timestamp_to_string: false requires both --interactive and --verbose"
                .into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{MigrationConfig, SourceConfig, TargetConfig};
    use crate::discover::TableRule;

    fn config() -> Config {
        Config {
            snowflake: SourceConfig {
                connection_name: "default".into(),
                external_stage: "MIGRATION_STAGE".into(),
            },
            bigquery: TargetConfig {
                project_id: "my-project".into(),
                gcs_uri: "gs://bucket/stage".into(),
                location: "EU".into(),
                dataset_prefix: "snowflake_".into(),
            },
            migration: MigrationConfig {
                tables: vec![TableRule {
                    database: "PROD".into(),
                    schema: Some("SALES".into()),
                    table: Some("ORDERS".into()),
                    exclude_schema_like: vec![],
                    exclude_table_like: vec![],
                    with_views: false,
                }],
                sample_limit: 100,
                logs_path: "logs".into(),
                cast_timestamp_to_string: true,
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&config()).is_ok());
    }

    #[test]
    fn test_stage_with_at_prefix_rejected() {
        let mut c = config();
        c.snowflake.external_stage = "@MIGRATION_STAGE".into();
        assert!(validate(&c).is_err());
    }

    #[test]
    fn test_bad_gcs_uri_rejected() {
        let mut c = config();
        c.bigquery.gcs_uri = "s3://bucket".into();
        assert!(validate(&c).is_err());
    }

    #[test]
    fn test_empty_tables_rejected() {
        let mut c = config();
        c.migration.tables.clear();
        assert!(validate(&c).is_err());
    }

    #[test]
    fn test_raw_timestamps_needs_interactive_verbose() {
        let c = config();
        let mut opts = RunOptions {
            raw_timestamps: true,
            ..Default::default()
        };
        assert!(validate_options(&c, &opts).is_err());
        opts.interactive = true;
        assert!(validate_options(&c, &opts).is_err());
        opts.verbose = true;
        assert!(validate_options(&c, &opts).is_ok());
    }

    #[test]
    fn test_config_cast_opt_out_needs_interactive_verbose() {
        let mut c = config();
        c.migration.cast_timestamp_to_string = false;
        let mut opts = RunOptions::default();
        assert!(validate_options(&c, &opts).is_err());
        opts.interactive = true;
        opts.verbose = true;
        assert!(validate_options(&c, &opts).is_ok());
    }
}
