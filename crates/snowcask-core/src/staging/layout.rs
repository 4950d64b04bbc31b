use std::path::{Path, PathBuf};

use crate::kind::ObjectKind;

/// Paths of one staging tree.
///
/// ```text
/// <root>/infrastructure/<kind-plural>/<name>.sql
/// <root>/data/tables/<table>.csv
/// <root>/data/stages/<stage>/<file>
/// ```
#[derive(Debug, Clone)]
pub struct StagingLayout {
    pub root: PathBuf,
    pub infrastructure_dir: PathBuf,
    pub data_dir: PathBuf,
    pub tables_dir: PathBuf,
    pub stages_dir: PathBuf,
}

impl StagingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let infrastructure_dir = root.join("infrastructure");
        let data_dir = root.join("data");
        let tables_dir = data_dir.join("tables");
        let stages_dir = data_dir.join("stages");
        Self {
            root,
            infrastructure_dir,
            data_dir,
            tables_dir,
            stages_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind_dir(&self, kind: ObjectKind) -> PathBuf {
        self.infrastructure_dir.join(kind.dir_name())
    }

    pub fn definition_path(&self, kind: ObjectKind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{name}.sql"))
    }

    pub fn table_data_path(&self, table: &str) -> PathBuf {
        self.tables_dir.join(format!("{table}.csv"))
    }

    pub fn stage_data_dir(&self, stage: &str) -> PathBuf {
        self.stages_dir.join(stage)
    }

    /// Every folder `prepare` must leave behind, parents first.
    pub fn expected_dirs(&self, kinds: &[ObjectKind]) -> Vec<PathBuf> {
        let mut dirs = vec![self.root.clone(), self.infrastructure_dir.clone()];
        dirs.extend(kinds.iter().map(|kind| self.kind_dir(*kind)));
        dirs.push(self.data_dir.clone());
        dirs.push(self.tables_dir.clone());
        dirs.push(self.stages_dir.clone());
        dirs
    }
}

/// Checks that an object name can be used as a single path component.
///
/// Quoted identifiers may contain separators; such names would place files
/// outside their folder, so callers skip the object with the returned reason.
pub fn check_object_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("'{name}' is not a usable file name"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(format!("'{name}' contains a path separator"));
    }
    Ok(())
}
