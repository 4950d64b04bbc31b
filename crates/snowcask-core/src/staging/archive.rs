use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::error::{Error, Result};

/// Timestamp suffix of archive folders; digits only, so it never contains the
/// `-` that separates it from the prefix.
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Copy a completed staging tree to `<prefix>-<timestamp>` using local time.
pub fn archive(source: &Path, prefix: &Path) -> Result<PathBuf> {
    archive_at(source, prefix, Local::now().naive_local())
}

/// Copy `source` to `<prefix>-<at>` and return the archive path.
///
/// The tree is copied into a `.partial` sibling first and renamed into place,
/// so an interrupted copy never leaves a folder under the final name.
pub fn archive_at(source: &Path, prefix: &Path, at: NaiveDateTime) -> Result<PathBuf> {
    let timestamp = at.format(ARCHIVE_TIMESTAMP_FORMAT).to_string();
    let archive_path = suffixed(prefix, &format!("-{timestamp}"));
    if archive_path.exists() {
        return Err(Error::ArchiveCollision(archive_path));
    }

    let partial_path = suffixed(&archive_path, ".partial");
    let copy_failure = |source| Error::ArchiveCopyFailure {
        path: archive_path.clone(),
        source,
    };

    if partial_path.exists() {
        std::fs::remove_dir_all(&partial_path).map_err(copy_failure)?;
    }
    if let Some(parent) = archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(copy_failure)?;
        }
    }

    let files = copy_tree(source, &partial_path).map_err(copy_failure)?;
    std::fs::rename(&partial_path, &archive_path).map_err(copy_failure)?;

    info!(
        event = "snapshot_archived",
        source = %source.display(),
        path = %archive_path.display(),
        files = files
    );
    Ok(archive_path)
}

/// Archive prefix for a source scope: `<dir>/<database>_<schema>`, lowercased.
pub fn archive_prefix(dir: &Path, database: Option<&str>, schema: &str) -> PathBuf {
    let label = match database {
        Some(database) => format!("{database}_{schema}"),
        None => schema.to_string(),
    };
    dir.join(label.to_lowercase())
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<u64> {
    std::fs::create_dir_all(dest)?;
    let mut files = 0;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            files += copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            files += 1;
        }
    }
    Ok(files)
}
