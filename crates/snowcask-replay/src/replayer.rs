use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use snowcask_core::{BatchReport, CatalogSession, Error, FailurePolicy, ObjectKind, Result};

use crate::input::read_rowset_csv;
use crate::manifest::{DataTarget, Manifest, ManifestStep};

/// What one manifest step produced.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    #[serde(rename = "type")]
    pub step_type: String,
    pub name: String,
    pub path: PathBuf,
    /// One line per executed file, load or upload.
    pub results: BatchReport<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
}

impl ReplayReport {
    pub fn skipped_count(&self) -> usize {
        self.steps.iter().map(|step| step.results.skipped.len()).sum()
    }
}

/// Replays a staged snapshot against a target catalog, step by step.
pub struct Replayer<'a> {
    session: &'a dyn CatalogSession,
    staging_root: &'a Path,
}

impl<'a> Replayer<'a> {
    pub fn new(session: &'a dyn CatalogSession, staging_root: &'a Path) -> Self {
        Self {
            session,
            staging_root,
        }
    }

    /// Run every step in manifest order.
    ///
    /// An infrastructure failure stops the replay. Failed table loads and
    /// stage uploads are recorded in the step's report and skipped.
    pub async fn run(&self, manifest: &Manifest) -> Result<ReplayReport> {
        let mut report = ReplayReport::default();
        for step in &manifest.steps {
            report.steps.push(self.run_step(step).await?);
        }
        info!(
            event = "replay_finished",
            steps = report.steps.len(),
            skipped = report.skipped_count()
        );
        Ok(report)
    }

    pub async fn run_step(&self, step: &ManifestStep) -> Result<StepReport> {
        let dir = self.staging_root.join(step.path());
        info!(
            event = "step_started",
            step_type = step.type_label(),
            name = %step.name(),
            path = %dir.display()
        );

        let results = match step {
            ManifestStep::Infrastructure { .. } => self.replay_infrastructure(&dir).await?,
            ManifestStep::Data {
                target: DataTarget::Tables,
                ..
            } => self.replay_tables(&dir).await?,
            ManifestStep::Data {
                target: DataTarget::Stages,
                ..
            } => self.replay_stages(&dir).await?,
            ManifestStep::Command { name, .. } => {
                info!(event = "command_step_skipped", name = %name);
                BatchReport::new()
            }
        };

        for line in &results.completed {
            info!(event = "step_output", step_type = step.type_label(), output = %line);
        }
        Ok(StepReport {
            step_type: step.type_label().to_string(),
            name: step.name().to_string(),
            path: step.path().to_path_buf(),
            results,
        })
    }

    async fn replay_infrastructure(&self, dir: &Path) -> Result<BatchReport<String>> {
        let mut results = BatchReport::new();
        for file in sorted_entries(dir, EntryType::File)? {
            if file.extension().and_then(|ext| ext.to_str()) != Some("sql") {
                debug!(event = "file_ignored", path = %file.display());
                continue;
            }

            let failure = |reason: String| Error::InfrastructureReplayFailure {
                file: file.clone(),
                reason,
            };
            let statement =
                std::fs::read_to_string(&file).map_err(|err| failure(err.to_string()))?;
            let rows = self
                .session
                .execute(&statement)
                .await
                .map_err(|err| failure(err.to_string()))?;
            results
                .completed
                .push(rows.first_value().unwrap_or_default().to_string());
        }
        Ok(results)
    }

    async fn replay_tables(&self, dir: &Path) -> Result<BatchReport<String>> {
        let mut results = BatchReport::new();
        for file in sorted_entries(dir, EntryType::File)? {
            if file.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                debug!(event = "file_ignored", path = %file.display());
                continue;
            }
            let table = file_name(&file, true);
            let result = self.load_table(&file, &table).await;
            results.absorb(FailurePolicy::SkipAndLog, ObjectKind::Table, &table, result)?;
        }
        Ok(results)
    }

    async fn load_table(&self, file: &Path, table: &str) -> Result<String> {
        let failure = |reason: String| Error::DataReplayFailure {
            kind: ObjectKind::Table,
            name: table.to_string(),
            reason,
        };
        let rows = read_rowset_csv(file).map_err(|err| failure(err.to_string()))?;
        let loaded = self
            .session
            .bulk_load(table, &rows)
            .await
            .map_err(|err| failure(err.to_string()))?;
        Ok(format!(
            "Successfully loaded {loaded} records into table: {table}"
        ))
    }

    async fn replay_stages(&self, dir: &Path) -> Result<BatchReport<String>> {
        let mut results = BatchReport::new();
        for stage_dir in sorted_entries(dir, EntryType::Dir)? {
            let stage = file_name(&stage_dir, false);
            let location = format!("@{stage}");
            for file in sorted_entries(&stage_dir, EntryType::File)? {
                let name = format!("{stage}/{}", file_name(&file, false));
                let result = self
                    .session
                    .upload(&file, &location)
                    .await
                    .map(|outcome| format!("{} - {}", outcome.source, outcome.status))
                    .map_err(|err| Error::DataReplayFailure {
                        kind: ObjectKind::Stage,
                        name: name.clone(),
                        reason: err.to_string(),
                    });
                results.absorb(FailurePolicy::SkipAndLog, ObjectKind::Stage, &name, result)?;
            }
        }
        Ok(results)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryType {
    File,
    Dir,
}

/// Entries of one type in `dir`, sorted by file name.
fn sorted_entries(dir: &Path, wanted: EntryType) -> Result<Vec<PathBuf>> {
    let unreadable = |err: std::io::Error| {
        Error::InvalidManifest(format!("cannot read step directory {}: {err}", dir.display()))
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        let matches = match wanted {
            EntryType::File => path.is_file(),
            EntryType::Dir => path.is_dir(),
        };
        if matches {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path, strip_extension: bool) -> String {
    let name = if strip_extension {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
