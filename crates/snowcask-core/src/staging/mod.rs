//! On-disk snapshot tree: layout, preparation, atomic writes and archival.

mod archive;
mod atomic;
mod layout;
mod prepare;

pub use archive::{ARCHIVE_TIMESTAMP_FORMAT, archive, archive_at, archive_prefix};
pub use atomic::write_bytes_atomic;
pub use layout::{StagingLayout, check_object_name};
pub use prepare::prepare;
