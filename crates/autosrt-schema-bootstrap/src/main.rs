//! autosrt-bootstrap - create the autosrt collections and unique indexes.
//!
//! This is the main entry point for the schema bootstrapper.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autosrt_schema_bootstrap::{BootstrapConfig, BootstrapError, Bootstrapper};
use autosrt_schema_store::MongoCatalog;

/// Create the autosrt collections and unique indexes.
#[derive(Parser, Debug)]
#[command(name = "autosrt-bootstrap")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// MongoDB connection string (overrides `MONGO_URI`)
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Target database (overrides `MONGO_DB_NAME`)
    #[arg(long, global = true)]
    database: Option<String>,

    /// JSON schema table to apply instead of the built-in one (overrides `SCHEMA_FILE`)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Create missing collections and indexes (default)
    #[default]
    Apply,
    /// Show what apply would change without changing anything
    Plan,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,autosrt_schema=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Schema bootstrap failed");
            eprintln!("{e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

/// Exit code of a plan that found conflicting index definitions.
const PLAN_CONFLICT_EXIT_CODE: u8 = 5;

async fn run(cli: Cli) -> Result<ExitCode, BootstrapError> {
    let mut config = BootstrapConfig::from_env()?;
    if let Some(uri) = cli.uri {
        config.mongo_uri = uri;
    }
    if cli.database.is_some() {
        config.database = cli.database;
    }
    if cli.schema.is_some() {
        config.schema_file = cli.schema;
    }

    let schema = config.load_schema()?;
    tracing::info!(
        database = %schema.database,
        schema_file = ?config.schema_file,
        soft_delete_filter = %config.soft_delete_filter,
        declaration_timeout_seconds = config.declaration_timeout_seconds,
        "Bootstrap configuration loaded"
    );

    let catalog =
        MongoCatalog::connect_with_timeout(&config.mongo_uri, &schema.database, config.connect_timeout())
            .await?;
    let bootstrapper = Bootstrapper::new(Arc::new(catalog))
        .with_declaration_timeout(config.declaration_timeout());

    let command = cli.command.unwrap_or_default();
    let report = match command {
        Command::Apply => bootstrapper.apply(&schema).await?,
        Command::Plan => bootstrapper.plan(&schema).await?,
    };

    report
        .write_to(cli.json, &mut std::io::stdout().lock(), &mut std::io::stderr().lock())
        .map_err(|e| BootstrapError::Store(format!("failed to write report: {e}")))?;

    match command {
        Command::Apply => Ok(ExitCode::SUCCESS),
        Command::Plan if report.conflicts().next().is_some() => {
            tracing::warn!(
                conflicts = report.conflicts().count(),
                "Plan found conflicting index definitions"
            );
            Ok(ExitCode::from(PLAN_CONFLICT_EXIT_CODE))
        }
        Command::Plan => Ok(ExitCode::SUCCESS),
    }
}
