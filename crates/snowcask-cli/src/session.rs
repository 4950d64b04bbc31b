//! Catalog session over the Postgres wire protocol.
//!
//! The session targets an endpoint that speaks the Postgres wire protocol and
//! understands the warehouse catalog statements (`SHOW`, `DESC`, `GET_DDL` and
//! the `INFORMATION_SCHEMA` views for every registered kind). A plain Postgres
//! server lacks most of them; `copy` lists every kind before touching the
//! staging tree so such a source is rejected up front.
//!
//! Statements go through the simple query protocol, so every value comes back
//! in text form. External `@stage` locations map to folders under a local
//! stage root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolCopyExt, PgPoolOptions, PgRow};
use sqlx::{Column, Row};
use tracing::debug;

use snowcask_core::{CatalogSession, Error, Result, RowSet, UploadOutcome};

pub struct PgWireSession {
    pool: PgPool,
    stages: LocalStages,
}

impl PgWireSession {
    pub async fn connect(conn: &str, stage_root: &Path) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(conn)
            .await?;
        Ok(Self {
            pool,
            stages: LocalStages::new(stage_root),
        })
    }
}

/// Stage storage backed by one folder per stage under a root directory.
///
/// Stage identifiers are unquoted warehouse identifiers and so resolve
/// case-insensitively: `@S1` and `@s1` name the same folder.
#[derive(Debug, Clone)]
pub struct LocalStages {
    root: PathBuf,
}

impl LocalStages {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn stage_dir(&self, location: &str) -> Result<PathBuf> {
        let stage = location
            .strip_prefix('@')
            .filter(|stage| {
                !stage.is_empty() && !stage.contains(['/', '\\']) && !matches!(*stage, "." | "..")
            })
            .ok_or_else(|| Error::Session(format!("invalid stage location '{location}'")))?;
        Ok(self.root.join(stage.to_lowercase()))
    }

    pub fn download(&self, location: &str, dest: &Path) -> Result<Vec<PathBuf>> {
        let stage_dir = self.stage_dir(location)?;
        if !stage_dir.is_dir() {
            return Err(Error::Session(format!(
                "stage {location} does not exist under {}",
                self.root.display()
            )));
        }

        std::fs::create_dir_all(dest)?;
        let mut sources = std::fs::read_dir(&stage_dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        sources.retain(|path| path.is_file());
        sources.sort();

        let mut written = Vec::with_capacity(sources.len());
        for source in sources {
            if let Some(name) = source.file_name() {
                let target = dest.join(name);
                std::fs::copy(&source, &target)?;
                written.push(target);
            }
        }
        Ok(written)
    }

    pub fn upload(&self, local: &Path, location: &str) -> Result<UploadOutcome> {
        let stage_dir = self.stage_dir(location)?;
        let name = local
            .file_name()
            .ok_or_else(|| Error::Session(format!("invalid upload source {}", local.display())))?;

        std::fs::create_dir_all(&stage_dir)?;
        std::fs::copy(local, stage_dir.join(name))?;
        Ok(UploadOutcome {
            source: name.to_string_lossy().into_owned(),
            status: "UPLOADED".to_string(),
        })
    }
}

#[async_trait]
impl CatalogSession for PgWireSession {
    async fn execute(&self, statement: &str) -> Result<RowSet> {
        debug!(event = "statement_sent", sql = %statement);
        let rows = sqlx::raw_sql(statement)
            .fetch_all(&self.pool)
            .await
            .map_err(session_error)?;
        to_rowset(&rows)
    }

    /// The wire protocol returns the result of every statement directly.
    async fn run_and_capture(&self, statement: &str) -> Result<RowSet> {
        self.execute(statement).await
    }

    async fn download(&self, location: &str, dest: &Path) -> Result<Vec<PathBuf>> {
        self.stages.download(location, dest)
    }

    async fn upload(&self, local: &Path, location: &str) -> Result<UploadOutcome> {
        self.stages.upload(local, location)
    }

    async fn bulk_load(&self, table: &str, data: &RowSet) -> Result<u64> {
        if data.columns.is_empty() {
            return Err(Error::Session(format!("no columns to load into {table}")));
        }

        let payload = encode_csv(data)?;
        let statement = format!(
            "COPY {table} ({}) FROM STDIN (FORMAT csv, HEADER true)",
            data.columns.join(", ")
        );
        debug!(event = "copy_started", sql = %statement, bytes = payload.len());

        let mut copy = self
            .pool
            .copy_in_raw(&statement)
            .await
            .map_err(session_error)?;
        copy.send(payload).await.map_err(session_error)?;
        copy.finish().await.map_err(session_error)
    }
}

fn session_error(err: sqlx::Error) -> Error {
    Error::Session(err.to_string())
}

fn to_rowset(rows: &[PgRow]) -> Result<RowSet> {
    let Some(first) = rows.first() else {
        return Ok(RowSet::default());
    };

    let columns = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect::<Vec<_>>();
    let mut set = RowSet::new(columns);
    for row in rows {
        let values = (0..row.len())
            .map(|index| row.try_get_unchecked::<Option<String>, _>(index))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(session_error)?;
        set.push_row(values);
    }
    Ok(set)
}

/// CSV body for `COPY ... FORMAT csv`; nulls are written as unquoted empty
/// fields, which COPY reads back as NULL.
fn encode_csv(data: &RowSet) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let encode_error = |err: csv::Error| Error::Session(format!("failed to encode rows: {err}"));

    writer.write_record(&data.columns).map_err(encode_error)?;
    for row in &data.rows {
        writer
            .write_record(row.iter().map(|value| value.as_deref().unwrap_or_default()))
            .map_err(encode_error)?;
    }
    writer
        .into_inner()
        .map_err(|err| Error::Session(format!("failed to encode rows: {}", err.error())))
}
