use tracing::{debug, info};

use snowcask_core::{
    CatalogObjectRef, CatalogSession, Error, ListingStrategy, ObjectKind, ObjectTypeConfig,
    Result, RowSet, StrategyRegistry,
};

use crate::queries;

/// Enumerates the live inventory of one object kind.
pub struct ObjectLister<'a> {
    session: &'a dyn CatalogSession,
    registry: &'a StrategyRegistry,
}

impl<'a> ObjectLister<'a> {
    pub fn new(session: &'a dyn CatalogSession, registry: &'a StrategyRegistry) -> Self {
        Self { session, registry }
    }

    /// List every object of `kind`, in the order the catalog returns them.
    ///
    /// Fails with `UnregisteredKind` when the registry has no config for the
    /// kind and with `ListingFailure` when the catalog cannot be enumerated.
    pub async fn list(&self, kind: ObjectKind) -> Result<Vec<CatalogObjectRef>> {
        let resolution = self.registry.resolve(kind)?;
        info!(
            event = "listing_started",
            kind = %kind,
            strategy = ?resolution.listing
        );

        let names = match resolution.listing {
            ListingStrategy::CatalogMetadata => self.list_from_metadata(resolution.config).await,
            ListingStrategy::Introspective => self.list_introspective(resolution.config).await,
        }
        .map_err(|err| Error::ListingFailure {
            kind,
            reason: err.to_string(),
        })?;

        info!(event = "listing_finished", kind = %kind, count = names.len());
        Ok(names
            .into_iter()
            .map(|name| CatalogObjectRef::new(kind, name))
            .collect())
    }

    async fn list_from_metadata(&self, config: &ObjectTypeConfig) -> Result<Vec<String>> {
        let sql = queries::catalog_listing(config);
        debug!(event = "listing_query", sql = %sql);
        let rows = self.session.execute(&sql).await?;
        project_names(&rows, config, |_| Ok(true))
    }

    async fn list_introspective(&self, config: &ObjectTypeConfig) -> Result<Vec<String>> {
        let sql = queries::show_objects(config);
        debug!(event = "listing_query", sql = %sql);
        let rows = self.session.run_and_capture(&sql).await?;
        project_names(&rows, config, |row| {
            for predicate in &config.predicates {
                match predicate.matches(&rows, row) {
                    Some(true) => {}
                    Some(false) => return Ok(false),
                    None => {
                        return Err(Error::Session(format!(
                            "column {} missing from {} result",
                            predicate.column,
                            queries::show_objects(config)
                        )));
                    }
                }
            }
            Ok(true)
        })
    }
}

fn project_names(
    rows: &RowSet,
    config: &ObjectTypeConfig,
    keep: impl Fn(usize) -> Result<bool>,
) -> Result<Vec<String>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let index = rows.column_index(&config.field_name).ok_or_else(|| {
        Error::Session(format!(
            "column {} missing from listing result",
            config.field_name
        ))
    })?;

    let mut names = Vec::with_capacity(rows.len());
    for row in 0..rows.len() {
        if !keep(row)? {
            continue;
        }
        match rows.value(row, index) {
            Some(name) => names.push(name.to_string()),
            None => debug!(event = "null_name_dropped", kind = %config.kind, row = row),
        }
    }
    Ok(names)
}
