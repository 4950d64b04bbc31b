mod config;
mod registry;
mod session;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use snowcask_core::{Error as CoreError, ListingStrategy, StrategyRegistry, archive, prepare};
use snowcask_extract::SnapshotExtractor;
use snowcask_replay::{Replayer, load_manifest, validate_manifest};
use thiserror::Error;
use uuid::Uuid;

use config::{DEFAULT_CONFIG_PATH, SnowcaskConfig, load_or_create_config};
use registry::{
    RunCommand, RunContext, RunPaths, init_run_logging, redact_connection_string, start_run,
    write_report,
};
use session::PgWireSession;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
    #[error("manifest failed validation with {0} error(s)")]
    ManifestRejected(usize),
}

#[derive(Parser, Debug)]
#[command(name = "snowcask", version, about = "Snapshot and replay warehouse catalogs")]
struct Cli {
    /// Path to the config file; created with defaults when missing.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Snapshot the source catalog into the staging tree and archive it.
    Copy(CopyArgs),
    /// Replay the staging tree against a target catalog.
    Paste(PasteArgs),
    /// Print the configured object kinds and how each is listed and reconstructed.
    Kinds(KindsArgs),
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Connection string; falls back to SNOWCASK_CONN.
    #[arg(long, value_name = "CONNECTION_STRING", env = "SNOWCASK_CONN")]
    conn: Option<String>,
}

#[derive(Args, Debug)]
struct CopyArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Skip table row export.
    #[arg(long, default_value_t = false)]
    no_table_data: bool,
    /// Skip stage file download.
    #[arg(long, default_value_t = false)]
    no_stage_data: bool,
    /// Leave the staging tree without archiving it.
    #[arg(long, default_value_t = false)]
    no_archive: bool,
}

#[derive(Args, Debug)]
struct KindsArgs {
    /// Show only this kind, e.g. `TABLE` or `file_format`.
    label: Option<String>,
}

#[derive(Args, Debug)]
struct PasteArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Manifest file (.json or .toml) replacing the configured build manifest.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Staging tree to replay; defaults to the configured staging directory.
    #[arg(long)]
    staging: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Copy(args) => run_copy(&cli.config, args).await,
        Command::Paste(args) => run_paste(&cli.config, args).await,
        Command::Kinds(args) => {
            let config = load_or_create_config(&cli.config)?;
            for line in describe_kinds(&config.registry()?, args.label.as_deref())? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

async fn run_copy(config_path: &Path, args: CopyArgs) -> Result<(), CliError> {
    let config = load_or_create_config(config_path)?;
    let conn = resolve_conn(args.connection)?;
    let registry = config.registry()?;
    let layout = config.layout();
    let mut options = config.extract_options();
    options.table_data &= !args.no_table_data;
    options.stage_data &= !args.no_stage_data;

    let run_options = serde_json::json!({
        "source": config.source,
        "objects": registry.kinds(),
        "table_data": options.table_data,
        "stage_data": options.stage_data,
        "archive": !args.no_archive,
    });
    let run_paths = begin_run(&config, RunCommand::Copy, &conn, run_options)?;

    let timer = Instant::now();
    let session = PgWireSession::connect(&conn, &config.session.stage_root).await?;

    let extractor = SnapshotExtractor::new(&session, &registry, &layout, options);
    extractor.preflight().await.map_err(unsupported_source)?;
    prepare(&layout, &registry.kinds())?;
    let report = extractor.run().await?;
    write_report(&run_paths, &report)?;

    for skipped in report
        .definitions
        .skipped
        .iter()
        .chain(&report.tables.skipped)
        .chain(&report.stages.skipped)
    {
        println!("skipped {} {}: {}", skipped.kind, skipped.name, skipped.reason);
    }
    println!(
        "extracted {} definitions, {} tables, {} stages into {}",
        report.definitions.completed.len(),
        report.tables.completed.len(),
        report.stages.completed.len(),
        layout.root().display()
    );

    if !args.no_archive {
        let archive_path = archive(layout.root(), &config.archive_prefix())?;
        println!("archived snapshot to {}", archive_path.display());
    }

    tracing::info!(
        event = "run_finished",
        status = "success",
        skipped = report.skipped_count(),
        duration_ms = timer.elapsed().as_millis()
    );
    Ok(())
}

async fn run_paste(config_path: &Path, args: PasteArgs) -> Result<(), CliError> {
    let config = load_or_create_config(config_path)?;
    let conn = resolve_conn(args.connection)?;
    let manifest = match &args.manifest {
        Some(path) => load_manifest(path)?,
        None => config.manifest()?,
    };
    let staging_root = args
        .staging
        .clone()
        .unwrap_or_else(|| config.staging.directory.clone());

    let validation = validate_manifest(&manifest, &staging_root);
    for issue in validation.errors.iter().chain(&validation.warnings) {
        println!("{:?} [step {}] {}: {}", issue.severity, issue.step, issue.code, issue.message);
    }
    if !validation.is_ok() {
        return Err(CliError::ManifestRejected(validation.errors.len()));
    }

    let run_options = serde_json::json!({
        "manifest": args.manifest,
        "staging": staging_root,
        "steps": manifest.steps.len(),
        "validation": validation,
    });
    let run_paths = begin_run(&config, RunCommand::Paste, &conn, run_options)?;

    let timer = Instant::now();
    let session = PgWireSession::connect(&conn, &config.session.stage_root).await?;
    let report = Replayer::new(&session, &staging_root).run(&manifest).await?;
    write_report(&run_paths, &report)?;

    for step in &report.steps {
        println!("[{}] {}", step.step_type, step.name);
        for line in &step.results.completed {
            println!("    {line}");
        }
        for skipped in &step.results.skipped {
            println!("    Error: {} {}: {}", skipped.kind, skipped.name, skipped.reason);
        }
    }

    tracing::info!(
        event = "run_finished",
        status = "success",
        skipped = report.skipped_count(),
        duration_ms = timer.elapsed().as_millis()
    );
    Ok(())
}

fn begin_run(
    config: &SnowcaskConfig,
    command: RunCommand,
    conn: &str,
    options: serde_json::Value,
) -> Result<RunPaths, CliError> {
    let run_id = Uuid::new_v4().to_string();
    let ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command,
        run_dir: config.staging.runs_directory.clone(),
        staging_dir: config.staging.directory.clone(),
        connection: redact_connection_string(conn),
        options,
    };

    let run_paths = start_run(&ctx)?;
    init_run_logging(&run_paths.logs_path)?;
    tracing::info!(event = "run_started", run_id = %run_id, command = ?command);
    Ok(run_paths)
}

fn resolve_conn(args: ConnectionArgs) -> Result<String, CliError> {
    let conn = args.conn.ok_or_else(|| {
        CliError::InvalidConfig("connection string is required (--conn or SNOWCASK_CONN)".to_string())
    })?;
    detect_engine(&conn)?;
    Ok(conn)
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(
            redact_connection_string(conn).redacted,
        ))
    }
}

/// A source that cannot list a configured kind is a configuration problem.
fn unsupported_source(err: CoreError) -> CliError {
    match err {
        CoreError::ListingFailure { kind, reason } => CliError::InvalidConfig(format!(
            "source cannot list {kind} objects ({reason}); remove {kind} from [extract] objects"
        )),
        other => CliError::Core(other),
    }
}

fn describe_kinds(registry: &StrategyRegistry, label: Option<&str>) -> Result<Vec<String>, CliError> {
    let resolutions = match label {
        Some(label) => vec![registry.resolve_label(label)?],
        None => registry
            .kinds()
            .into_iter()
            .map(|kind| registry.resolve(kind))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let mut lines = vec![format!(
        "{:<12} {:<30} {:<26} PREDICATES",
        "KIND", "SOURCE", "RECONSTRUCTION"
    )];
    for resolution in resolutions {
        let config = resolution.config;
        let source = match resolution.listing {
            ListingStrategy::CatalogMetadata => format!("INFORMATION_SCHEMA.{}", config.plural),
            ListingStrategy::Introspective => format!("SHOW {}", config.plural),
        };
        let predicates = config
            .predicates
            .iter()
            .map(|predicate| predicate.to_sql())
            .collect::<Vec<_>>()
            .join(" AND ");
        lines.push(format!(
            "{:<12} {:<30} {:<26} {}",
            config.kind.label(),
            source,
            format!("{:?}", resolution.reconstruction),
            predicates
        ));
    }
    Ok(lines)
}
