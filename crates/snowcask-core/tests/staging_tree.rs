use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use snowcask_core::{
    Error, ObjectKind, StagingLayout, archive, archive_at, prepare, write_bytes_atomic,
};

fn temp_root(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("snowcask_core_{label}_{}", uuid::Uuid::new_v4()));
    dir
}

/// Relative path -> contents for every file under `root`; directories map to `None`.
fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    let mut entries = BTreeMap::new();
    collect(root, root, &mut entries);
    entries
}

fn collect(root: &Path, dir: &Path, entries: &mut BTreeMap<PathBuf, Option<Vec<u8>>>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        let relative = path.strip_prefix(root).expect("relative").to_path_buf();
        if path.is_dir() {
            entries.insert(relative, None);
            collect(root, &path, entries);
        } else {
            entries.insert(relative, Some(fs::read(&path).expect("read file")));
        }
    }
}

#[test]
fn prepare_is_idempotent_and_clears_leftovers() {
    let layout = StagingLayout::new(temp_root("prepare"));
    let kinds = ObjectKind::ALL;

    prepare(&layout, &kinds).expect("first prepare");
    let first = snapshot_tree(layout.root());

    write_bytes_atomic(
        &layout.definition_path(ObjectKind::Table, "T1"),
        b"CREATE OR REPLACE TABLE T1 (ID NUMBER);",
    )
    .expect("write leftover definition");
    fs::create_dir_all(layout.stage_data_dir("S1")).expect("create leftover stage dir");
    fs::write(layout.stage_data_dir("S1").join("a.csv"), "1,2\n").expect("write leftover file");

    prepare(&layout, &kinds).expect("second prepare");
    let second = snapshot_tree(layout.root());

    assert_eq!(first, second, "prepare must yield the same empty skeleton");
    assert!(second.values().all(Option::is_none), "no files survive prepare");
    for dir in layout.expected_dirs(&kinds) {
        assert!(dir.is_dir(), "missing {}", dir.display());
    }

    fs::remove_dir_all(layout.root()).expect("cleanup");
}

#[test]
fn prepare_only_creates_folders_for_requested_kinds() {
    let layout = StagingLayout::new(temp_root("prepare_subset"));
    prepare(&layout, &[ObjectKind::Table, ObjectKind::Stage]).expect("prepare");

    assert!(layout.kind_dir(ObjectKind::Table).is_dir());
    assert!(layout.kind_dir(ObjectKind::Stage).is_dir());
    assert!(!layout.kind_dir(ObjectKind::View).exists());
    assert!(layout.tables_dir.is_dir());
    assert!(layout.stages_dir.is_dir());

    fs::remove_dir_all(layout.root()).expect("cleanup");
}

#[test]
fn archive_copies_tree_under_timestamped_name() {
    let base = temp_root("archive");
    let layout = StagingLayout::new(base.join("staging"));
    prepare(&layout, &ObjectKind::ALL).expect("prepare");
    write_bytes_atomic(
        &layout.definition_path(ObjectKind::View, "V1"),
        b"CREATE OR REPLACE VIEW V1 AS SELECT * FROM T1;",
    )
    .expect("write definition");
    fs::write(layout.table_data_path("T1"), "ID\n1\n2\n").expect("write table data");

    let prefix = base.join("archive").join("db_schema");
    let archived = archive(layout.root(), &prefix).expect("archive");

    let name = archived
        .file_name()
        .and_then(|name| name.to_str())
        .expect("utf-8 archive name");
    let suffix = name.strip_prefix("db_schema-").expect("prefix kept");
    assert_eq!(suffix.len(), 14, "timestamp is 14 digits: {suffix}");
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(archived.parent(), prefix.parent());

    assert_eq!(snapshot_tree(layout.root()), snapshot_tree(&archived));

    fs::remove_dir_all(&base).expect("cleanup");
}

#[test]
fn archive_reports_collisions_instead_of_overwriting() {
    let base = temp_root("archive_collision");
    let layout = StagingLayout::new(base.join("staging"));
    prepare(&layout, &[ObjectKind::Table]).expect("prepare");

    let prefix = base.join("archive").join("db_schema");
    let at = NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|date| date.and_hms_opt(7, 5, 1))
        .expect("valid timestamp");

    let first = archive_at(layout.root(), &prefix, at).expect("first archive");
    assert!(first.ends_with("db_schema-20240309070501"));
    fs::write(first.join("marker"), "kept").expect("write marker");

    let err = archive_at(layout.root(), &prefix, at).expect_err("collision");
    assert!(matches!(err, Error::ArchiveCollision(ref path) if path == &first));
    assert_eq!(fs::read_to_string(first.join("marker")).expect("marker"), "kept");

    fs::remove_dir_all(&base).expect("cleanup");
}

#[test]
fn archive_of_missing_source_is_a_copy_failure() {
    let base = temp_root("archive_missing");
    let err = archive(&base.join("absent"), &base.join("archive/x")).expect_err("missing source");
    assert!(matches!(err, Error::ArchiveCopyFailure { .. }));
    let _ = fs::remove_dir_all(&base);
}
