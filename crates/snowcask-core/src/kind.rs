use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::registry::{ListingStrategy, ReconstructionStrategy};

/// Kind of schema-level object held in the warehouse catalog.
///
/// Declaration order is the processing order of an extraction pass: kinds
/// listed through catalog metadata come before introspective ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Table,
    View,
    FileFormat,
    Procedure,
    Stream,
    Task,
    Stage,
}

impl ObjectKind {
    /// Every kind, in declared order.
    pub const ALL: [ObjectKind; 7] = [
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::FileFormat,
        ObjectKind::Procedure,
        ObjectKind::Stream,
        ObjectKind::Task,
        ObjectKind::Stage,
    ];

    /// Catalog label used in DDL and describe commands (e.g. `FILE_FORMAT`).
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::FileFormat => "FILE_FORMAT",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Stream => "STREAM",
            ObjectKind::Task => "TASK",
            ObjectKind::Stage => "STAGE",
        }
    }

    /// Plural display name, also the information-schema view and SHOW target.
    pub fn plural(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLES",
            ObjectKind::View => "VIEWS",
            ObjectKind::FileFormat => "FILE_FORMATS",
            ObjectKind::Procedure => "PROCEDURES",
            ObjectKind::Stream => "STREAMS",
            ObjectKind::Task => "TASKS",
            ObjectKind::Stage => "STAGES",
        }
    }

    /// Folder holding this kind's definitions under `infrastructure/`.
    pub fn dir_name(self) -> String {
        self.plural().to_lowercase()
    }

    pub fn listing_strategy(self) -> ListingStrategy {
        match self {
            ObjectKind::Table
            | ObjectKind::View
            | ObjectKind::FileFormat
            | ObjectKind::Procedure => ListingStrategy::CatalogMetadata,
            ObjectKind::Stream | ObjectKind::Task | ObjectKind::Stage => {
                ListingStrategy::Introspective
            }
        }
    }

    pub fn reconstruction_strategy(self) -> ReconstructionStrategy {
        match self {
            ObjectKind::Table
            | ObjectKind::View
            | ObjectKind::FileFormat
            | ObjectKind::Procedure => ReconstructionStrategy::NativePassthrough,
            ObjectKind::Stream => ReconstructionStrategy::SynthesizedStream,
            ObjectKind::Task => ReconstructionStrategy::SynthesizedTask,
            ObjectKind::Stage => ReconstructionStrategy::SynthesizedStage,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    /// Accepts the label in any case, with `_` or a space between words.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase().replace(' ', "_");
        ObjectKind::ALL
            .into_iter()
            .find(|kind| kind.label() == normalized)
            .ok_or_else(|| Error::UnregisteredKind(value.to_string()))
    }
}
