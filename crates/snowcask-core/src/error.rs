use std::path::PathBuf;

use thiserror::Error;

use crate::kind::ObjectKind;

/// Core error type shared across snowcask crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A kind label that names no registered object kind.
    #[error("unregistered object kind: {0}")]
    UnregisteredKind(String),
    /// The object could not be described as a creation statement.
    #[error("definition unavailable for {kind} {name}: {reason}")]
    DefinitionUnavailable {
        kind: ObjectKind,
        name: String,
        reason: String,
    },
    /// The inventory of a kind could not be enumerated.
    #[error("failed to list {kind} objects: {reason}")]
    ListingFailure { kind: ObjectKind, reason: String },
    /// Row data or stage files of one object could not be exported.
    #[error("failed to export {kind} {name}: {reason}")]
    ExportFailure {
        kind: ObjectKind,
        name: String,
        reason: String,
    },
    #[error("failed to prepare staging directory {path}: {source}")]
    DirectoryPrepFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("archive destination already exists: {0}")]
    ArchiveCollision(PathBuf),
    #[error("failed to copy snapshot into archive {path}: {source}")]
    ArchiveCopyFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A creation statement failed while replaying an infrastructure step.
    #[error("infrastructure replay failed for {file}: {reason}")]
    InfrastructureReplayFailure { file: PathBuf, reason: String },
    /// One table load or stage upload failed while replaying a data step.
    #[error("data replay failed for {kind} {name}: {reason}")]
    DataReplayFailure {
        kind: ObjectKind,
        name: String,
        reason: String,
    },
    #[error("unknown manifest step type: {0}")]
    UnknownStepType(String),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The warehouse session rejected a statement or a transfer.
    #[error("session error: {0}")]
    Session(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for failures scoped to a single object, which batch loops
    /// may record and step over.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DefinitionUnavailable { .. }
                | Error::ExportFailure { .. }
                | Error::DataReplayFailure { .. }
        )
    }
}

/// Convenience alias for results returned by snowcask crates.
pub type Result<T> = std::result::Result<T, Error>;
