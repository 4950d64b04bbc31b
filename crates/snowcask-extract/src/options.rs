/// Options that control which parts of a snapshot are extracted.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Export every table's rows to `data/tables/<table>.csv`.
    pub table_data: bool,
    /// Download every stage's files to `data/stages/<stage>/`.
    pub stage_data: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            table_data: true,
            stage_data: true,
        }
    }
}
