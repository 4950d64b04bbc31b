use tracing::debug;

use snowcask_core::{
    CatalogObjectRef, CatalogSession, Error, ObjectDefinition, ObjectKind,
    ReconstructionStrategy, Result, StrategyRegistry,
};

use crate::queries;

/// Produces an executable creation statement for one listed object.
pub struct DefinitionReconstructor<'a> {
    session: &'a dyn CatalogSession,
    registry: &'a StrategyRegistry,
}

/// Fields of `DESC TASK` that survive reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDescription {
    pub name: String,
    pub warehouse: Option<String>,
    pub schedule: Option<String>,
    pub condition: Option<String>,
    pub definition: String,
}

impl<'a> DefinitionReconstructor<'a> {
    pub fn new(session: &'a dyn CatalogSession, registry: &'a StrategyRegistry) -> Self {
        Self { session, registry }
    }

    /// Rebuild the creation statement of `object`.
    ///
    /// Anything that prevents a statement from being produced for this one
    /// object is reported as `DefinitionUnavailable`.
    pub async fn reconstruct(&self, object: &CatalogObjectRef) -> Result<ObjectDefinition> {
        let resolution = self.registry.resolve(object.kind)?;
        debug!(
            event = "reconstruct_started",
            kind = %object.kind,
            name = %object.name,
            strategy = ?resolution.reconstruction
        );

        let statement = match resolution.reconstruction {
            ReconstructionStrategy::NativePassthrough => self.native(object).await?,
            ReconstructionStrategy::SynthesizedStream => self.stream(object).await?,
            ReconstructionStrategy::SynthesizedTask => self.task(object).await?,
            ReconstructionStrategy::SynthesizedStage => stage_statement(&object.name),
        };

        Ok(ObjectDefinition {
            kind: object.kind,
            name: object.name.clone(),
            statement,
        })
    }

    async fn native(&self, object: &CatalogObjectRef) -> Result<String> {
        let qualified = self.registry.scope().qualify(&object.name);
        let rows = self
            .session
            .execute(&queries::get_ddl(object.kind, &qualified))
            .await
            .map_err(|err| unavailable(object, err.to_string()))?;

        rows.first_value()
            .filter(|ddl| !ddl.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| unavailable(object, "catalog returned no definition"))
    }

    async fn stream(&self, object: &CatalogObjectRef) -> Result<String> {
        let rows = self
            .session
            .run_and_capture(&queries::describe(ObjectKind::Stream, &object.name))
            .await
            .map_err(|err| unavailable(object, err.to_string()))?;

        let name = rows
            .get(0, "name")
            .ok_or_else(|| unavailable(object, "describe returned no stream name"))?;
        let table = rows
            .get(0, "table_name")
            .ok_or_else(|| unavailable(object, "describe returned no source table"))?;
        Ok(stream_statement(name, table))
    }

    async fn task(&self, object: &CatalogObjectRef) -> Result<String> {
        let rows = self
            .session
            .run_and_capture(&queries::describe(ObjectKind::Task, &object.name))
            .await
            .map_err(|err| unavailable(object, err.to_string()))?;

        let present = |column: &str| {
            rows.get(0, column)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let description = TaskDescription {
            name: present("name").ok_or_else(|| unavailable(object, "describe returned no task name"))?,
            warehouse: present("warehouse"),
            schedule: present("schedule"),
            condition: present("condition"),
            definition: present("definition")
                .ok_or_else(|| unavailable(object, "describe returned no task body"))?,
        };
        Ok(task_statement(&description))
    }
}

fn unavailable(object: &CatalogObjectRef, reason: impl Into<String>) -> Error {
    Error::DefinitionUnavailable {
        kind: object.kind,
        name: object.name.clone(),
        reason: reason.into(),
    }
}

/// Streams keep only their source table; mode and offset are not captured.
pub fn stream_statement(name: &str, table: &str) -> String {
    format!("CREATE OR REPLACE STREAM {name} ON TABLE {table};")
}

/// Scheduled task statement; absent clauses are left out. Predecessor
/// (`AFTER`) links are not captured.
pub fn task_statement(task: &TaskDescription) -> String {
    let mut statement = format!("CREATE OR REPLACE TASK {}", task.name);
    if let Some(warehouse) = &task.warehouse {
        statement.push_str(&format!("\n  WAREHOUSE = {warehouse}"));
    }
    if let Some(schedule) = &task.schedule {
        statement.push_str(&format!("\n  SCHEDULE = '{}'", schedule.replace('\'', "''")));
    }
    if let Some(condition) = &task.condition {
        statement.push_str(&format!("\n  WHEN {condition}"));
    }
    statement.push_str(&format!(
        "\nAS {};",
        task.definition.trim_end().trim_end_matches(';')
    ));
    statement
}

/// Stages are recreated by name only; URL, credentials and format are lost.
pub fn stage_statement(name: &str) -> String {
    format!("CREATE OR REPLACE STAGE {name};")
}
