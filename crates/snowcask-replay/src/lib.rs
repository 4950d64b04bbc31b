//! Manifest-driven replay of a staged snapshot against a target catalog.

pub mod input;
pub mod manifest;
pub mod replayer;
pub mod validate;

pub use input::read_rowset_csv;
pub use manifest::{DataTarget, Manifest, ManifestStep, RawManifestStep, load_manifest};
pub use replayer::{ReplayReport, Replayer, StepReport};
pub use validate::{IssueSeverity, ValidationIssue, ValidationReport, validate_manifest};
