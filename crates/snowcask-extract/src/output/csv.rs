use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use snowcask_core::RowSet;

/// Rows and bytes written for one CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvSummary {
    pub rows: u64,
    pub bytes: u64,
}

/// Write a result set as CSV with a header row; nulls become empty fields.
pub fn write_rowset_csv(path: &Path, rows: &RowSet) -> Result<CsvSummary, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    if !rows.columns.is_empty() {
        writer.write_record(&rows.columns)?;
    }

    for row in &rows.rows {
        writer.write_record(row.iter().map(|value| value.as_deref().unwrap_or_default()))?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(CsvSummary {
        rows: rows.rows.len() as u64,
        bytes: counting.bytes_written(),
    })
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
