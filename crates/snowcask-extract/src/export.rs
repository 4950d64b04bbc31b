use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use snowcask_core::{
    BatchReport, CatalogObjectRef, CatalogScope, CatalogSession, Error, FailurePolicy,
    ObjectKind, Result, StagingLayout, check_object_name,
};

use crate::output::write_rowset_csv;
use crate::queries;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedTable {
    pub table: String,
    pub path: PathBuf,
    pub rows: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedStage {
    pub stage: String,
    pub path: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Copies table rows and stage files into the data half of a staging tree.
pub struct BulkExporter<'a> {
    session: &'a dyn CatalogSession,
    scope: &'a CatalogScope,
    layout: &'a StagingLayout,
}

impl<'a> BulkExporter<'a> {
    pub fn new(
        session: &'a dyn CatalogSession,
        scope: &'a CatalogScope,
        layout: &'a StagingLayout,
    ) -> Self {
        Self {
            session,
            scope,
            layout,
        }
    }

    /// Export every table to `data/tables/<table>.csv`, skipping the ones
    /// that fail.
    pub async fn export_tables(
        &self,
        tables: &[CatalogObjectRef],
    ) -> Result<BatchReport<ExportedTable>> {
        let mut report = BatchReport::new();
        for table in tables {
            let result = self.export_table(&table.name).await;
            report.absorb(FailurePolicy::SkipAndLog, ObjectKind::Table, &table.name, result)?;
        }
        info!(
            event = "tables_exported",
            exported = report.completed.len(),
            skipped = report.skipped.len()
        );
        Ok(report)
    }

    /// Download every stage into `data/stages/<stage>/`, skipping the ones
    /// that fail.
    pub async fn export_stages(
        &self,
        stages: &[CatalogObjectRef],
    ) -> Result<BatchReport<ExportedStage>> {
        let mut report = BatchReport::new();
        for stage in stages {
            let result = self.export_stage(&stage.name).await;
            report.absorb(FailurePolicy::SkipAndLog, ObjectKind::Stage, &stage.name, result)?;
        }
        info!(
            event = "stages_exported",
            exported = report.completed.len(),
            skipped = report.skipped.len()
        );
        Ok(report)
    }

    pub async fn export_table(&self, table: &str) -> Result<ExportedTable> {
        let failure = |reason: String| Error::ExportFailure {
            kind: ObjectKind::Table,
            name: table.to_string(),
            reason,
        };
        check_object_name(table).map_err(failure)?;

        let rows = self
            .session
            .execute(&queries::select_all(&self.scope.qualify(table)))
            .await
            .map_err(|err| failure(err.to_string()))?;

        let path = self.layout.table_data_path(table);
        let summary = write_rowset_csv(&path, &rows).map_err(|err| failure(err.to_string()))?;
        info!(
            event = "table_exported",
            table = %table,
            rows = summary.rows,
            bytes = summary.bytes,
            path = %path.display()
        );
        Ok(ExportedTable {
            table: table.to_string(),
            path,
            rows: summary.rows,
            bytes: summary.bytes,
        })
    }

    pub async fn export_stage(&self, stage: &str) -> Result<ExportedStage> {
        let failure = |reason: String| Error::ExportFailure {
            kind: ObjectKind::Stage,
            name: stage.to_string(),
            reason,
        };
        check_object_name(stage).map_err(failure)?;

        let path = self.layout.stage_data_dir(stage);
        std::fs::create_dir_all(&path).map_err(|err| failure(err.to_string()))?;
        let files = self
            .session
            .download(&queries::stage_location(stage), &path)
            .await
            .map_err(|err| failure(err.to_string()))?;

        info!(
            event = "stage_exported",
            stage = %stage,
            files = files.len(),
            path = %path.display()
        );
        Ok(ExportedStage {
            stage: stage.to_string(),
            path,
            files,
        })
    }
}
