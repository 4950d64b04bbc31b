use std::path::Path;

use snowcask_core::RowSet;

/// Read a CSV file with a header row. Empty fields are read back as nulls.
pub fn read_rowset_csv(path: &Path) -> Result<RowSet, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let columns = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = RowSet::new(columns);

    for record in reader.records() {
        let record = record?;
        rows.push_row(
            record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}
