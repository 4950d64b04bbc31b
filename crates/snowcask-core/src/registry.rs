//! Object strategy registry.
//!
//! Maps every [`ObjectKind`] to how its inventory is listed and how its
//! creation statement is rebuilt, together with the per-kind introspection
//! metadata ([`ObjectTypeConfig`]) those strategies consume.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kind::ObjectKind;
use crate::session::RowSet;

/// How the live inventory of a kind is enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStrategy {
    /// Select from the kind's `INFORMATION_SCHEMA` view.
    CatalogMetadata,
    /// Run `SHOW <PLURAL>` and project the captured result set.
    Introspective,
}

/// How a creation statement is produced for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionStrategy {
    /// The catalog's own `GET_DDL` output, used verbatim.
    NativePassthrough,
    /// `CREATE OR REPLACE STREAM .. ON TABLE ..` from `DESC STREAM`.
    SynthesizedStream,
    /// `CREATE OR REPLACE TASK ..` from `DESC TASK`.
    SynthesizedTask,
    /// Bare `CREATE OR REPLACE STAGE ..`.
    SynthesizedStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    Eq,
    NotEq,
}

/// Filter applied to a listing result, `column <op> 'value'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: PredicateOp,
    pub value: String,
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: PredicateOp::Eq,
            value: value.into(),
        }
    }

    pub fn not_eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: PredicateOp::NotEq,
            value: value.into(),
        }
    }

    /// Render as a SQL condition with the value quoted as a string literal.
    pub fn to_sql(&self) -> String {
        let op = match self.op {
            PredicateOp::Eq => "=",
            PredicateOp::NotEq => "<>",
        };
        format!(
            "{} {op} '{}'",
            self.column,
            self.value.replace('\'', "''")
        )
    }

    /// Evaluate against one captured row. `None` when the column is absent.
    pub fn matches(&self, rows: &RowSet, row: usize) -> Option<bool> {
        let index = rows.column_index(&self.column)?;
        let value = rows.value(row, index);
        let equal = value == Some(self.value.as_str());
        Some(match self.op {
            PredicateOp::Eq => equal,
            PredicateOp::NotEq => !equal,
        })
    }
}

/// Per-kind introspection metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTypeConfig {
    pub kind: ObjectKind,
    /// Plural display name; also the metadata view or SHOW target.
    pub plural: String,
    /// Column carrying the object's name in listing results.
    pub field_name: String,
    pub predicates: Vec<Predicate>,
}

impl ObjectTypeConfig {
    /// Default metadata for `kind` scoped to `scope`.
    pub fn standard(kind: ObjectKind, scope: &CatalogScope) -> Self {
        let (field_name, predicates) = match kind.listing_strategy() {
            ListingStrategy::CatalogMetadata => {
                let prefix = metadata_prefix(kind);
                let mut predicates = vec![Predicate::eq(
                    format!("{prefix}_SCHEMA"),
                    scope.schema.clone(),
                )];
                if let Some(database) = &scope.database {
                    predicates.push(Predicate::eq(format!("{prefix}_CATALOG"), database.clone()));
                }
                if kind == ObjectKind::Table {
                    predicates.push(Predicate::eq("TABLE_TYPE", "BASE TABLE"));
                }
                (format!("{prefix}_NAME"), predicates)
            }
            ListingStrategy::Introspective => {
                let mut predicates = vec![Predicate::eq("schema_name", scope.schema.clone())];
                if let Some(database) = &scope.database {
                    predicates.push(Predicate::eq("database_name", database.clone()));
                }
                ("name".to_string(), predicates)
            }
        };

        Self {
            kind,
            plural: kind.plural().to_string(),
            field_name,
            predicates,
        }
    }
}

fn metadata_prefix(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Table | ObjectKind::View => "TABLE",
        ObjectKind::FileFormat => "FILE_FORMAT",
        ObjectKind::Procedure => "PROCEDURE",
        ObjectKind::Stream | ObjectKind::Task | ObjectKind::Stage => "",
    }
}

/// Database and schema a snapshot is taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogScope {
    pub database: Option<String>,
    pub schema: String,
}

impl CatalogScope {
    pub fn new(database: Option<String>, schema: impl Into<String>) -> Self {
        Self {
            database,
            schema: schema.into(),
        }
    }

    /// Fully qualified object name (`DB.SCHEMA.NAME` or `SCHEMA.NAME`).
    pub fn qualify(&self, name: &str) -> String {
        match &self.database {
            Some(database) => format!("{database}.{}.{name}", self.schema),
            None => format!("{}.{name}", self.schema),
        }
    }
}

impl Default for CatalogScope {
    fn default() -> Self {
        Self {
            database: None,
            schema: "PUBLIC".to_string(),
        }
    }
}

/// Strategies and metadata resolved for one kind.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub listing: ListingStrategy,
    pub reconstruction: ReconstructionStrategy,
    pub config: &'a ObjectTypeConfig,
}

/// Read-only table of registered kinds, built once per run.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    scope: CatalogScope,
    configs: Vec<ObjectTypeConfig>,
}

impl StrategyRegistry {
    /// Register every kind with its default metadata.
    pub fn standard(scope: CatalogScope) -> Self {
        Self::with_kinds(scope, &ObjectKind::ALL)
    }

    /// Register a subset of kinds with default metadata.
    pub fn with_kinds(scope: CatalogScope, kinds: &[ObjectKind]) -> Self {
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();
        let configs = kinds
            .into_iter()
            .map(|kind| ObjectTypeConfig::standard(kind, &scope))
            .collect();
        Self { scope, configs }
    }

    /// Register explicit metadata; one config per kind.
    pub fn from_configs(scope: CatalogScope, mut configs: Vec<ObjectTypeConfig>) -> Result<Self> {
        configs.sort_by_key(|config| config.kind);
        if let Some(pair) = configs.windows(2).find(|pair| pair[0].kind == pair[1].kind) {
            return Err(Error::InvalidConfig(format!(
                "object kind {} registered more than once",
                pair[0].kind
            )));
        }
        Ok(Self { scope, configs })
    }

    pub fn scope(&self) -> &CatalogScope {
        &self.scope
    }

    /// Registered configs in declared kind order.
    pub fn configs(&self) -> impl Iterator<Item = &ObjectTypeConfig> {
        self.configs.iter()
    }

    pub fn kinds(&self) -> Vec<ObjectKind> {
        self.configs.iter().map(|config| config.kind).collect()
    }

    pub fn resolve(&self, kind: ObjectKind) -> Result<Resolution<'_>> {
        let config = self
            .configs
            .iter()
            .find(|config| config.kind == kind)
            .ok_or_else(|| Error::UnregisteredKind(kind.label().to_string()))?;

        Ok(Resolution {
            listing: kind.listing_strategy(),
            reconstruction: kind.reconstruction_strategy(),
            config,
        })
    }

    pub fn resolve_label(&self, label: &str) -> Result<Resolution<'_>> {
        self.resolve(label.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> CatalogScope {
        CatalogScope::new(Some("SALES".to_string()), "PUBLIC")
    }

    #[test]
    fn resolves_every_registered_kind() {
        let registry = StrategyRegistry::standard(scope());
        for kind in ObjectKind::ALL {
            let resolution = registry.resolve(kind).unwrap();
            assert_eq!(resolution.config.kind, kind);
            assert_eq!(resolution.listing, kind.listing_strategy());
            assert_eq!(resolution.reconstruction, kind.reconstruction_strategy());
        }
    }

    #[test]
    fn subset_registry_rejects_missing_kinds() {
        let registry = StrategyRegistry::with_kinds(scope(), &[ObjectKind::Stage, ObjectKind::Table]);
        assert_eq!(registry.kinds(), vec![ObjectKind::Table, ObjectKind::Stage]);

        let err = registry.resolve(ObjectKind::Task).unwrap_err();
        assert!(matches!(err, Error::UnregisteredKind(label) if label == "TASK"));
    }

    #[test]
    fn resolve_label_surfaces_unknown_labels() {
        let registry = StrategyRegistry::standard(scope());
        assert!(matches!(
            registry.resolve_label("materialized_view"),
            Err(Error::UnregisteredKind(_))
        ));
        assert_eq!(
            registry.resolve_label("file_format").unwrap().config.field_name,
            "FILE_FORMAT_NAME"
        );
    }

    #[test]
    fn duplicate_configs_are_a_configuration_error() {
        let scope = scope();
        let configs = vec![
            ObjectTypeConfig::standard(ObjectKind::View, &scope),
            ObjectTypeConfig::standard(ObjectKind::View, &scope),
        ];
        assert!(matches!(
            StrategyRegistry::from_configs(scope, configs),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn table_listing_excludes_views() {
        let config = ObjectTypeConfig::standard(ObjectKind::Table, &scope());
        let rendered: Vec<String> = config.predicates.iter().map(Predicate::to_sql).collect();
        assert_eq!(
            rendered,
            vec![
                "TABLE_SCHEMA = 'PUBLIC'",
                "TABLE_CATALOG = 'SALES'",
                "TABLE_TYPE = 'BASE TABLE'"
            ]
        );
    }

    #[test]
    fn introspective_kinds_filter_on_show_columns() {
        let config = ObjectTypeConfig::standard(ObjectKind::Stream, &CatalogScope::default());
        assert_eq!(config.field_name, "name");
        assert_eq!(config.predicates, vec![Predicate::eq("schema_name", "PUBLIC")]);
    }

    #[test]
    fn predicate_quotes_embedded_apostrophes() {
        assert_eq!(
            Predicate::not_eq("TABLE_NAME", "O'HARA").to_sql(),
            "TABLE_NAME <> 'O''HARA'"
        );
    }

    #[test]
    fn qualifies_names_with_scope() {
        assert_eq!(scope().qualify("ORDERS"), "SALES.PUBLIC.ORDERS");
        assert_eq!(CatalogScope::default().qualify("ORDERS"), "PUBLIC.ORDERS");
    }
}
