use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use snowcask_core::{Error, ObjectKind, Result};

/// One manifest entry as written in a config or manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawManifestStep {
    #[serde(rename = "type")]
    pub step_type: String,
    pub name: String,
    /// Directory relative to the staging root.
    pub path: String,
}

impl RawManifestStep {
    pub fn new(step_type: &str, name: &str, path: &str) -> Self {
        Self {
            step_type: step_type.to_string(),
            name: name.to_string(),
            path: path.to_string(),
        }
    }
}

/// Which half of the data tree a data step loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataTarget {
    Tables,
    Stages,
}

impl DataTarget {
    pub fn kind(self) -> ObjectKind {
        match self {
            DataTarget::Tables => ObjectKind::Table,
            DataTarget::Stages => ObjectKind::Stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestStep {
    /// Execute every `.sql` file of a directory.
    Infrastructure { name: String, path: PathBuf },
    /// Load table CSVs or upload stage files.
    Data { target: DataTarget, path: PathBuf },
    /// Declared but not executed.
    Command { name: String, path: PathBuf },
}

impl ManifestStep {
    pub fn type_label(&self) -> &'static str {
        match self {
            ManifestStep::Infrastructure { .. } => "infrastructure",
            ManifestStep::Data { .. } => "data",
            ManifestStep::Command { .. } => "command",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ManifestStep::Infrastructure { name, .. } | ManifestStep::Command { name, .. } => name,
            ManifestStep::Data { target, .. } => target.kind().label(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ManifestStep::Infrastructure { path, .. }
            | ManifestStep::Data { path, .. }
            | ManifestStep::Command { path, .. } => path,
        }
    }

    fn from_raw(raw: &RawManifestStep) -> Result<Self> {
        let path = PathBuf::from(raw.path.trim());
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidManifest(format!(
                "{} step {} has an empty path",
                raw.step_type, raw.name
            )));
        }

        match raw.step_type.trim().to_ascii_lowercase().as_str() {
            "infrastructure" => Ok(ManifestStep::Infrastructure {
                name: raw.name.clone(),
                path,
            }),
            "data" => {
                let target = match raw.name.parse::<ObjectKind>()? {
                    ObjectKind::Table => DataTarget::Tables,
                    ObjectKind::Stage => DataTarget::Stages,
                    other => {
                        return Err(Error::InvalidManifest(format!(
                            "data step {other} is not replayable; use TABLE or STAGE"
                        )));
                    }
                };
                Ok(ManifestStep::Data { target, path })
            }
            "command" => Ok(ManifestStep::Command {
                name: raw.name.clone(),
                path,
            }),
            _ => Err(Error::UnknownStepType(raw.step_type.clone())),
        }
    }
}

/// Ordered replay steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub steps: Vec<ManifestStep>,
}

impl Manifest {
    /// Type every raw entry, failing on the first malformed one.
    pub fn from_raw(raw: &[RawManifestStep]) -> Result<Self> {
        let steps = raw
            .iter()
            .map(ManifestStep::from_raw)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestDocument {
    Wrapped { build_manifest: Vec<RawManifestStep> },
    Bare(Vec<RawManifestStep>),
}

impl ManifestDocument {
    fn into_steps(self) -> Vec<RawManifestStep> {
        match self {
            ManifestDocument::Wrapped { build_manifest } => build_manifest,
            ManifestDocument::Bare(steps) => steps,
        }
    }
}

/// Read a manifest from a `.json` or `.toml` file.
///
/// JSON accepts either a bare array of steps or an object with a
/// `build_manifest` array; TOML uses `[[build_manifest]]` tables.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let contents = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let document: ManifestDocument = match extension.as_deref() {
        Some("json") => serde_json::from_str(&contents)
            .map_err(|err| Error::InvalidManifest(format!("{}: {err}", path.display())))?,
        Some("toml") => toml::from_str(&contents)
            .map_err(|err| Error::InvalidManifest(format!("{}: {err}", path.display())))?,
        _ => {
            return Err(Error::InvalidManifest(format!(
                "{}: expected a .json or .toml manifest",
                path.display()
            )));
        }
    };

    Manifest::from_raw(&document.into_steps())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_every_step_kind() {
        let manifest = Manifest::from_raw(&[
            RawManifestStep::new("infrastructure", "TABLE", "infrastructure/tables"),
            RawManifestStep::new("data", "table", "data/tables"),
            RawManifestStep::new("data", "STAGE", "data/stages"),
            RawManifestStep::new("command", "REFRESH", "commands"),
        ])
        .unwrap();

        let labels: Vec<(&str, &str)> = manifest
            .steps
            .iter()
            .map(|step| (step.type_label(), step.name()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("infrastructure", "TABLE"),
                ("data", "TABLE"),
                ("data", "STAGE"),
                ("command", "REFRESH"),
            ]
        );
        assert_eq!(manifest.steps[2].path(), Path::new("data/stages"));
    }

    #[test]
    fn unknown_step_types_fail_fast() {
        let err = Manifest::from_raw(&[
            RawManifestStep::new("infrastructure", "TABLE", "infrastructure/tables"),
            RawManifestStep::new("migrate", "TABLE", "infrastructure/tables"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::UnknownStepType(ref step) if step == "migrate"));
    }

    #[test]
    fn data_steps_only_target_tables_and_stages() {
        let err = Manifest::from_raw(&[RawManifestStep::new("data", "VIEW", "data/views")])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidManifest(_)));

        let err = Manifest::from_raw(&[RawManifestStep::new("data", "SEQUENCE", "data/seq")])
            .unwrap_err();
        assert!(matches!(err, Error::UnregisteredKind(_)));
    }

    #[test]
    fn empty_paths_are_rejected() {
        let err = Manifest::from_raw(&[RawManifestStep::new("command", "NOOP", "  ")])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidManifest(_)));
    }
}
