use serde::{Deserialize, Serialize};

use crate::kind::ObjectKind;

/// A listed catalog object awaiting reconstruction or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogObjectRef {
    pub kind: ObjectKind,
    pub name: String,
}

impl CatalogObjectRef {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Creation statement for one object, stored as `<name>.sql`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    pub kind: ObjectKind,
    pub name: String,
    pub statement: String,
}

impl ObjectDefinition {
    pub fn file_name(&self) -> String {
        format!("{}.sql", self.name)
    }
}
