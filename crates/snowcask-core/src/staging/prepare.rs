use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::kind::ObjectKind;

use super::layout::StagingLayout;

/// Recreate the staging tree empty: delete `layout.root` when present, then
/// create every infrastructure folder for `kinds` and both data folders.
pub fn prepare(layout: &StagingLayout, kinds: &[ObjectKind]) -> Result<()> {
    if layout.root.exists() {
        std::fs::remove_dir_all(&layout.root).map_err(|source| prep_failure(&layout.root, source))?;
        info!(event = "staging_cleared", path = %layout.root.display());
    }

    for dir in layout.expected_dirs(kinds) {
        std::fs::create_dir_all(&dir).map_err(|source| prep_failure(&dir, source))?;
    }

    info!(
        event = "staging_prepared",
        path = %layout.root.display(),
        kinds = kinds.len()
    );
    Ok(())
}

fn prep_failure(path: &Path, source: std::io::Error) -> Error {
    Error::DirectoryPrepFailure {
        path: path.to_path_buf(),
        source,
    }
}
