//! sf-bq-migrate CLI - Snowflake to BigQuery table migration.

mod exec;
mod interact;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use exec::{BqCli, CliJobRunner, SnowSql};
use interact::{ShellEditor, TerminalInteraction};
use sf_bq_migrate::{
    Config, Interaction, MigrateError, MigrationWorkflow, NoInteraction, RunOptions, YamlSink,
};

#[derive(Parser)]
#[command(name = "sf-bq-migrate")]
#[command(about = "Snowflake to BigQuery table migration via GCS staging")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Generate queries and a plan file without executing anything
    #[arg(long)]
    dry_run: bool,

    /// Pause at preview checkpoints for operator decisions
    #[arg(short, long)]
    interactive: bool,

    /// Cap exported rows at the configured sample limit
    #[arg(long)]
    sample: bool,

    /// Print generated queries before execution
    #[arg(short, long)]
    verbose: bool,

    /// Export timezone-carrying timestamps without the string cast
    #[arg(long)]
    raw_timestamps: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    let config = Config::load(&cli.config)?;
    let options = RunOptions {
        dry_run: cli.dry_run,
        interactive: cli.interactive,
        sample: cli.sample,
        verbose: cli.verbose,
        raw_timestamps: cli.raw_timestamps,
    };

    let metadata = Arc::new(SnowSql::new(&config.snowflake.connection_name));
    let jobs = Arc::new(CliJobRunner::new(
        SnowSql::new(&config.snowflake.connection_name),
        BqCli::new(&config.bigquery.project_id, &config.bigquery.location),
        &config.bigquery.dataset_prefix,
    ));
    let interaction: Box<dyn Interaction> = if cli.interactive {
        Box::new(TerminalInteraction)
    } else {
        Box::new(NoInteraction)
    };
    let sink = YamlSink::new(&config.migration.logs_path);
    let logs_path = PathBuf::from(&config.migration.logs_path);
    let plan_path = logs_path.join(format!("migration_plan_{}.yml", sink.run_id()));

    let mut workflow = MigrationWorkflow::new(
        config,
        options,
        metadata,
        jobs,
        Box::new(ShellEditor),
        interaction,
        Box::new(sink),
    )?;

    if cli.dry_run {
        let plans = workflow.plan().await?;
        sf_bq_migrate::report::write_plan_file(&plan_path, &plans)?;
        info!(
            tables = plans.len(),
            path = %plan_path.display(),
            "dry run complete"
        );
        return Ok(());
    }

    let report = workflow.run().await?;
    info!(
        run_id = %report.run_id,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "migration finished"
    );
    if report.failed > 0 {
        return Err(MigrateError::remote(
            "run",
            format!("{} of {} tables failed", report.failed, report.total()),
        ));
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
