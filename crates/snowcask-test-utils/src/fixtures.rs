use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::MemoryCatalog;

/// Fresh directory under the system temp dir, unique per call.
pub fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("snowcask_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// Source catalog with table `T1`, view `V1` over `T1` and stage `S1`
/// holding `a.csv`.
pub fn end_to_end_source() -> MemoryCatalog {
    let catalog = MemoryCatalog::new("SALES", "PUBLIC");
    catalog
        .seed("CREATE OR REPLACE TABLE T1 (ID NUMBER(38,0), NAME VARCHAR(100));")
        .seed("CREATE OR REPLACE VIEW V1 AS SELECT ID, NAME FROM T1 WHERE ID > 1;")
        .seed("CREATE OR REPLACE STAGE S1;")
        .insert_rows("T1", &[&["1", "alpha"], &["2", "beta"]])
        .put_stage_file("S1", "a.csv", b"id,amount\n1,10\n");
    catalog
}

/// Relative path -> file contents for every file below `root`.
pub fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    collect(root, root, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).expect("relative path").to_path_buf();
            files.insert(relative, fs::read(&path).expect("read file"));
        }
    }
}
