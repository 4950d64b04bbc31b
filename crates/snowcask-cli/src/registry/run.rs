use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{RedactedConnection, RegistryError, RegistryResult};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCommand {
    Copy,
    Paste,
}

/// Metadata captured at run start.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: RunCommand,
    #[serde(skip)]
    pub run_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub connection: RedactedConnection,
    /// Resolved options of the command (config sections, flags).
    pub options: serde_json::Value,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with `config.json` and an empty
/// `logs.ndjson`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");
    let report_path = root.join("report.json");

    write_json(&config_path, ctx)?;

    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        root,
        logs_path,
        report_path,
    })
}

pub fn write_report<T: Serialize>(paths: &RunPaths, report: &T) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
