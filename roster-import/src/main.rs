//! roster-import - School roster import service
//!
//! Imports teacher, student, class, subject and schedule rosters from
//! spreadsheets, resolving drifted identifiers against the existing records.
//! Runs as an HTTP service (`serve`) or as one-shot commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roster_common::config::{load_config, resolve_root_folder, RootFolderInitializer, TomlConfig};
use roster_import::batch::BatchProcessor;
use roster_import::models::{EntityKind, RegistryKind};
use roster_import::report::{audit_table, render_text, template, to_csv, to_table};
use roster_import::resolve::IdentifierResolver;
use roster_import::store::SqliteStore;
use roster_import::validate::{ReferencePolicy, ValidationRules};
use roster_import::{build_router, AppState};

/// Command-line arguments for roster-import
#[derive(Parser, Debug)]
#[command(name = "roster-import")]
#[command(about = "School roster import with identifier reconciliation")]
#[command(version)]
struct Cli {
    /// Root folder holding roster.db
    #[arg(short, long, global = true)]
    root_folder: Option<String>,

    /// Config file (default: $ROSTER_CONFIG or <config dir>/roster/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Import one CSV file
    Import {
        #[arg(short, long)]
        kind: EntityKind,
        #[arg(short, long)]
        file: PathBuf,
        /// Cancel remaining rows after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print a per-row table instead of JSON
        #[arg(long)]
        table: bool,
        /// Keep unresolved reference values instead of failing the row
        #[arg(long)]
        email_fix: bool,
    },

    /// Print a CSV template for a kind
    Template {
        #[arg(short, long)]
        kind: EntityKind,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how identifiers (one per line) would resolve, without importing
    Audit {
        #[arg(short, long)]
        registry: RegistryKind,
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config first: it carries the default log level
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting roster-import v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match cli.command {
        Command::Serve { host, port } => serve(&cli.root_folder, &config, host, port).await,
        Command::Import {
            kind,
            file,
            timeout_secs,
            table,
            email_fix,
        } => {
            let mut processor = open_processor(&cli.root_folder, &config).await?;
            if email_fix {
                processor = processor.with_policy(ReferencePolicy::PassThrough);
            }
            import(&processor, kind, &file, timeout_secs, table).await
        }
        Command::Template { kind, output } => {
            let csv = to_csv(&template(kind))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} template to {}", kind, path.display());
                }
                None => print!("{}", csv),
            }
            Ok(())
        }
        Command::Audit { registry, file } => {
            let processor = open_processor(&cli.root_folder, &config).await?;
            audit(&processor, registry, &file).await
        }
    }
}

async fn open_processor(root_folder: &Option<String>, config: &TomlConfig) -> Result<BatchProcessor> {
    let root_folder = resolve_root_folder(root_folder.as_deref(), config);
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let store = SqliteStore::open(&db_path).await?;

    let resolver = IdentifierResolver::from_config(&config.resolver);
    info!(
        overrides = config.resolver.overrides.len(),
        compound_aliases = config.resolver.compound_aliases.len(),
        "Resolver configured"
    );

    Ok(BatchProcessor::new(
        Arc::new(store),
        Arc::new(resolver),
        ValidationRules::from_config(&config.schedule),
    ))
}

async fn serve(
    root_folder: &Option<String>,
    config: &TomlConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let processor = open_processor(root_folder, config).await?;
    let app = build_router(AppState::new(processor));

    let mut server = config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }
    let addr = server.bind_address();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn import(
    processor: &BatchProcessor,
    kind: EntityKind,
    file: &Path,
    timeout_secs: Option<u64>,
    table: bool,
) -> Result<()> {
    let content = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let cancel = CancellationToken::new();
    if let Some(secs) = timeout_secs {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(timeout_secs = secs, "Import timed out, cancelling remaining rows");
            token.cancel();
        });
    }
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining rows");
            token.cancel();
        }
    });

    let (batch_id, report) = processor
        .import_csv(content.as_slice(), kind, &cancel)
        .await?;
    info!(batch_id = %batch_id, "Import recorded");

    if table {
        print!("{}", render_text(&to_table(&report)));
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn audit(processor: &BatchProcessor, registry: RegistryKind, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let identifiers: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let results = processor.audit(&identifiers, registry).await?;
    print!("{}", render_text(&audit_table(&results)));
    Ok(())
}
