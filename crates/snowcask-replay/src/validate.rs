use std::path::Path;

use serde::Serialize;

use crate::manifest::{DataTarget, Manifest, ManifestStep};

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Problem found in one manifest step before replay starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    /// Position of the step in the manifest.
    pub step: usize,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        step: usize,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            step,
            message: message.into(),
            hint,
        }
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }
}

/// Check every step against the staging tree without touching the catalog.
pub fn validate_manifest(manifest: &Manifest, staging_root: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    if manifest.is_empty() {
        report.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            "empty_manifest",
            0,
            "manifest has no steps",
            None,
        ));
    }

    for (index, step) in manifest.steps.iter().enumerate() {
        if let ManifestStep::Command { name, .. } = step {
            report.push_warning(ValidationIssue::new(
                IssueSeverity::Warning,
                "command_not_executed",
                index,
                format!("command step {name} is accepted but does nothing"),
                None,
            ));
            continue;
        }

        let dir = staging_root.join(step.path());
        if !dir.is_dir() {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "missing_directory",
                index,
                format!(
                    "{} step {} reads {}, which is not a directory",
                    step.type_label(),
                    step.name(),
                    dir.display()
                ),
                Some("run `snowcask copy` first or fix the step path".to_string()),
            ));
            continue;
        }

        let (extension, code) = match step {
            ManifestStep::Infrastructure { .. } => (Some("sql"), "no_definitions"),
            ManifestStep::Data {
                target: DataTarget::Tables,
                ..
            } => (Some("csv"), "no_table_data"),
            _ => (None, "no_stage_data"),
        };
        if !has_entries(&dir, extension) {
            report.push_warning(ValidationIssue::new(
                IssueSeverity::Warning,
                code,
                index,
                format!("{} has nothing to replay", dir.display()),
                None,
            ));
        }
    }

    report
}

fn has_entries(dir: &Path, extension: Option<&str>) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        match extension {
            Some(extension) => {
                path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(extension)
            }
            None => path.is_dir(),
        }
    })
}
