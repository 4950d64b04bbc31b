pub mod csv;

pub use csv::{CsvSummary, write_rowset_csv};
