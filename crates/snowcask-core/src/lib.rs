//! Core contracts and helpers for snowcask.
//!
//! This crate defines the catalog object kinds, the strategy registry that
//! decides how each kind is listed and reconstructed, the session contract the
//! warehouse collaborator implements, and the on-disk staging tree shared by the
//! extraction and replay crates.

pub mod error;
pub mod kind;
pub mod model;
pub mod outcome;
pub mod registry;
pub mod session;
pub mod staging;

pub use error::{Error, Result};
pub use kind::ObjectKind;
pub use model::{CatalogObjectRef, ObjectDefinition};
pub use outcome::{BatchReport, FailurePolicy, Skipped};
pub use registry::{
    CatalogScope, ListingStrategy, ObjectTypeConfig, Predicate, PredicateOp,
    ReconstructionStrategy, Resolution, StrategyRegistry,
};
pub use session::{CatalogSession, RowSet, UploadOutcome};
pub use staging::{
    StagingLayout, archive, archive_at, archive_prefix, check_object_name, prepare, write_bytes_atomic,
};
