//! Shared test utilities for snowcask integration tests.
//!
//! This crate provides:
//! - [`MemoryCatalog`]: an in-memory warehouse implementing `CatalogSession`
//! - Fixture builders for common source catalogs
//! - Temporary directory and logging helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use snowcask_test_utils::{MemoryCatalog, temp_dir};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let catalog = MemoryCatalog::new("SALES", "PUBLIC");
//!     catalog.seed("CREATE OR REPLACE STAGE S1;");
//!     // ... run extraction against &catalog ...
//! }
//! ```

// Test utilities panic on broken fixtures rather than threading errors.
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod catalog;
pub mod fixtures;

pub use catalog::MemoryCatalog;
pub use fixtures::{end_to_end_source, read_tree, temp_dir};

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("snowcask=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
