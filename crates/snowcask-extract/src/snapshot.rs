use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use snowcask_core::{
    BatchReport, CatalogObjectRef, CatalogSession, Error, FailurePolicy, ObjectDefinition,
    ObjectKind, Result, StagingLayout, StrategyRegistry, check_object_name, write_bytes_atomic,
};

use crate::export::{BulkExporter, ExportedStage, ExportedTable};
use crate::lister::ObjectLister;
use crate::options::ExtractOptions;
use crate::reconstruct::DefinitionReconstructor;

/// A creation statement written into the staging tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionFile {
    pub kind: ObjectKind,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedKind {
    pub kind: ObjectKind,
    pub count: usize,
}

/// Summary of one extraction pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub listed: Vec<ListedKind>,
    pub definitions: BatchReport<DefinitionFile>,
    pub tables: BatchReport<ExportedTable>,
    pub stages: BatchReport<ExportedStage>,
}

impl ExtractionReport {
    pub fn skipped_count(&self) -> usize {
        self.definitions.skipped.len() + self.tables.skipped.len() + self.stages.skipped.len()
    }
}

/// Runs listing, reconstruction and export over a prepared staging tree.
pub struct SnapshotExtractor<'a> {
    session: &'a dyn CatalogSession,
    registry: &'a StrategyRegistry,
    layout: &'a StagingLayout,
    options: ExtractOptions,
}

impl<'a> SnapshotExtractor<'a> {
    pub fn new(
        session: &'a dyn CatalogSession,
        registry: &'a StrategyRegistry,
        layout: &'a StagingLayout,
        options: ExtractOptions,
    ) -> Self {
        Self {
            session,
            registry,
            layout,
            options,
        }
    }

    /// List every registered kind without writing anything.
    ///
    /// Run before the staging tree is prepared, so a source that cannot list
    /// one of the configured kinds fails before the previous snapshot is
    /// removed.
    pub async fn preflight(&self) -> Result<Vec<ListedKind>> {
        let lister = ObjectLister::new(self.session, self.registry);
        let mut listed = Vec::new();
        for kind in self.registry.kinds() {
            let objects = lister.list(kind).await?;
            listed.push(ListedKind {
                kind,
                count: objects.len(),
            });
        }
        info!(event = "preflight_finished", kinds = listed.len());
        Ok(listed)
    }

    /// Extract every registered kind, then table rows and stage files.
    ///
    /// Listing failures end the pass. Objects whose definition or data cannot
    /// be obtained are skipped and reported.
    pub async fn run(&self) -> Result<ExtractionReport> {
        let lister = ObjectLister::new(self.session, self.registry);
        let reconstructor = DefinitionReconstructor::new(self.session, self.registry);
        let mut report = ExtractionReport::default();
        let mut tables = None;
        let mut stages = None;

        for kind in self.registry.kinds() {
            let objects = lister.list(kind).await?;
            report.listed.push(ListedKind {
                kind,
                count: objects.len(),
            });

            for object in &objects {
                let result = reconstructor
                    .reconstruct(object)
                    .await
                    .and_then(|definition| self.write_definition(definition));
                report
                    .definitions
                    .absorb(FailurePolicy::SkipAndLog, kind, &object.name, result)?;
            }

            match kind {
                ObjectKind::Table => tables = Some(objects),
                ObjectKind::Stage => stages = Some(objects),
                _ => {}
            }
        }

        let exporter = BulkExporter::new(self.session, self.registry.scope(), self.layout);
        if self.options.table_data {
            let tables = listed_or_list(&lister, ObjectKind::Table, tables).await?;
            report.tables = exporter.export_tables(&tables).await?;
        }
        if self.options.stage_data {
            let stages = listed_or_list(&lister, ObjectKind::Stage, stages).await?;
            report.stages = exporter.export_stages(&stages).await?;
        }

        info!(
            event = "extraction_finished",
            definitions = report.definitions.completed.len(),
            tables = report.tables.completed.len(),
            stages = report.stages.completed.len(),
            skipped = report.skipped_count()
        );
        Ok(report)
    }

    fn write_definition(&self, definition: ObjectDefinition) -> Result<DefinitionFile> {
        check_object_name(&definition.name).map_err(|reason| Error::DefinitionUnavailable {
            kind: definition.kind,
            name: definition.name.clone(),
            reason,
        })?;
        let path = self
            .layout
            .definition_path(definition.kind, &definition.name);
        write_bytes_atomic(&path, definition.statement.as_bytes())?;
        info!(
            event = "definition_written",
            kind = %definition.kind,
            name = %definition.name,
            path = %path.display()
        );
        Ok(DefinitionFile {
            kind: definition.kind,
            name: definition.name,
            path,
        })
    }
}

async fn listed_or_list(
    lister: &ObjectLister<'_>,
    kind: ObjectKind,
    listed: Option<Vec<CatalogObjectRef>>,
) -> Result<Vec<CatalogObjectRef>> {
    match listed {
        Some(objects) => Ok(objects),
        None => lister.list(kind).await,
    }
}
