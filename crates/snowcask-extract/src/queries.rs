//! Statement text issued against the catalog.

use snowcask_core::{ObjectKind, ObjectTypeConfig};

/// `SELECT <field> FROM INFORMATION_SCHEMA.<PLURAL> WHERE 1=1 AND ...`
pub fn catalog_listing(config: &ObjectTypeConfig) -> String {
    let mut sql = format!(
        "SELECT {} FROM INFORMATION_SCHEMA.{} WHERE 1=1",
        config.field_name, config.plural
    );
    for predicate in &config.predicates {
        sql.push_str(" AND ");
        sql.push_str(&predicate.to_sql());
    }
    sql
}

pub fn show_objects(config: &ObjectTypeConfig) -> String {
    format!("SHOW {}", config.plural)
}

/// Native DDL lookup. Procedures get an empty argument list since overloads
/// are not resolved by signature.
pub fn get_ddl(kind: ObjectKind, qualified_name: &str) -> String {
    let signature = if kind == ObjectKind::Procedure { "()" } else { "" };
    format!(
        "SELECT GET_DDL('{}', '{qualified_name}{signature}')",
        kind.label()
    )
}

pub fn describe(kind: ObjectKind, name: &str) -> String {
    format!("DESC {} {name}", kind.label())
}

pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM {table}")
}

/// External location of a named stage.
pub fn stage_location(stage: &str) -> String {
    format!("@{}", stage.to_lowercase())
}
