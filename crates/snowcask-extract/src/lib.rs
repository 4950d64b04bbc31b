//! Snapshot extraction: list catalog objects, rebuild their creation
//! statements and export table rows and stage files into a staging tree.

pub mod export;
pub mod lister;
pub mod options;
pub mod output;
pub mod queries;
pub mod reconstruct;
pub mod snapshot;

pub use export::{BulkExporter, ExportedStage, ExportedTable};
pub use lister::ObjectLister;
pub use options::ExtractOptions;
pub use reconstruct::{DefinitionReconstructor, TaskDescription};
pub use snapshot::{DefinitionFile, ExtractionReport, ListedKind, SnapshotExtractor};
