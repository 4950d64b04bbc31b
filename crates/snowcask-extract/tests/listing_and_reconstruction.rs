use snowcask_core::{CatalogObjectRef, CatalogScope, Error, ObjectKind, StrategyRegistry};
use snowcask_extract::{DefinitionReconstructor, ObjectLister};
use snowcask_test_utils::{MemoryCatalog, end_to_end_source, init_test_logging};

fn sales_scope() -> CatalogScope {
    CatalogScope::new(Some("SALES".to_string()), "PUBLIC")
}

fn names(objects: &[CatalogObjectRef]) -> Vec<&str> {
    objects.iter().map(|object| object.name.as_str()).collect()
}

#[tokio::test]
async fn table_listing_excludes_views() {
    init_test_logging();
    let catalog = end_to_end_source();
    let registry = StrategyRegistry::standard(sales_scope());
    let lister = ObjectLister::new(&catalog, &registry);

    let tables = lister.list(ObjectKind::Table).await.expect("list tables");
    let views = lister.list(ObjectKind::View).await.expect("list views");

    assert_eq!(names(&tables), vec!["T1"]);
    assert_eq!(names(&views), vec!["V1"]);
    assert!(catalog.statements().iter().any(|sql| sql.contains(
        "FROM INFORMATION_SCHEMA.TABLES WHERE 1=1 AND TABLE_SCHEMA = 'PUBLIC' \
         AND TABLE_CATALOG = 'SALES' AND TABLE_TYPE = 'BASE TABLE'"
    )));
}

#[tokio::test]
async fn introspective_listing_keeps_catalog_order() {
    let catalog = MemoryCatalog::new("SALES", "PUBLIC");
    catalog
        .seed("CREATE OR REPLACE STAGE RAW;")
        .seed("CREATE OR REPLACE STAGE ARCHIVED;")
        .seed("CREATE OR REPLACE STAGE LANDING;");
    let registry = StrategyRegistry::standard(sales_scope());

    let stages = ObjectLister::new(&catalog, &registry)
        .list(ObjectKind::Stage)
        .await
        .expect("list stages");

    assert_eq!(names(&stages), vec!["RAW", "ARCHIVED", "LANDING"]);
    assert_eq!(catalog.statements(), vec!["SHOW STAGES".to_string()]);
}

#[tokio::test]
async fn listing_predicates_filter_other_schemas() {
    let catalog = end_to_end_source();
    let registry = StrategyRegistry::standard(CatalogScope::new(
        Some("SALES".to_string()),
        "STAGING",
    ));
    let lister = ObjectLister::new(&catalog, &registry);

    assert!(lister.list(ObjectKind::Table).await.expect("tables").is_empty());
    assert!(lister.list(ObjectKind::Stage).await.expect("stages").is_empty());
}

#[tokio::test]
async fn listing_an_unregistered_kind_fails() {
    let catalog = end_to_end_source();
    let registry = StrategyRegistry::with_kinds(sales_scope(), &[ObjectKind::Table]);

    let err = ObjectLister::new(&catalog, &registry)
        .list(ObjectKind::View)
        .await
        .expect_err("view is not registered");

    assert!(matches!(err, Error::UnregisteredKind(label) if label == "VIEW"));
    assert!(catalog.statements().is_empty());
}

#[tokio::test]
async fn catalog_errors_become_listing_failures() {
    let catalog = end_to_end_source();
    catalog.fail_statements_containing("INFORMATION_SCHEMA.VIEWS");
    let registry = StrategyRegistry::standard(sales_scope());

    let err = ObjectLister::new(&catalog, &registry)
        .list(ObjectKind::View)
        .await
        .expect_err("listing must fail");

    match err {
        Error::ListingFailure { kind, reason } => {
            assert_eq!(kind, ObjectKind::View);
            assert!(reason.contains("INFORMATION_SCHEMA.VIEWS"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn native_definitions_use_qualified_names() {
    let catalog = end_to_end_source();
    let registry = StrategyRegistry::standard(sales_scope());

    let definition = DefinitionReconstructor::new(&catalog, &registry)
        .reconstruct(&CatalogObjectRef::new(ObjectKind::Table, "T1"))
        .await
        .expect("reconstruct table");

    assert_eq!(
        definition.statement,
        "CREATE OR REPLACE TABLE T1 (ID NUMBER(38,0), NAME VARCHAR(100));"
    );
    assert_eq!(
        catalog.statements(),
        vec!["SELECT GET_DDL('TABLE', 'SALES.PUBLIC.T1')".to_string()]
    );
}

#[tokio::test]
async fn procedure_definitions_request_an_empty_signature() {
    let catalog = MemoryCatalog::new("SALES", "PUBLIC");
    catalog.seed(
        "CREATE OR REPLACE PROCEDURE LOAD_ALL() RETURNS VARCHAR LANGUAGE SQL AS 'SELECT 1';",
    );
    let registry = StrategyRegistry::standard(sales_scope());

    let definition = DefinitionReconstructor::new(&catalog, &registry)
        .reconstruct(&CatalogObjectRef::new(ObjectKind::Procedure, "LOAD_ALL"))
        .await
        .expect("reconstruct procedure");

    assert!(definition.statement.starts_with("CREATE OR REPLACE PROCEDURE LOAD_ALL()"));
    assert_eq!(
        catalog.statements(),
        vec!["SELECT GET_DDL('PROCEDURE', 'SALES.PUBLIC.LOAD_ALL()')".to_string()]
    );
}

#[tokio::test]
async fn native_definitions_are_kept_verbatim() {
    let catalog = end_to_end_source();
    let ddl = "create or replace TABLE T1 (\n\tID NUMBER(38,0),\n\tNAME VARCHAR(100)\n);\n";
    catalog.override_ddl(ObjectKind::Table, "T1", ddl);
    let registry = StrategyRegistry::standard(sales_scope());

    let definition = DefinitionReconstructor::new(&catalog, &registry)
        .reconstruct(&CatalogObjectRef::new(ObjectKind::Table, "T1"))
        .await
        .expect("reconstruct table");

    assert_eq!(definition.statement, ddl);
}

#[tokio::test]
async fn blank_native_definitions_are_unavailable() {
    let catalog = end_to_end_source();
    catalog.override_ddl(ObjectKind::View, "V1", "  \n");
    let registry = StrategyRegistry::standard(sales_scope());

    let err = DefinitionReconstructor::new(&catalog, &registry)
        .reconstruct(&CatalogObjectRef::new(ObjectKind::View, "V1"))
        .await
        .expect_err("blank DDL");

    assert!(matches!(
        err,
        Error::DefinitionUnavailable { kind: ObjectKind::View, ref name, .. } if name == "V1"
    ));
}

#[tokio::test]
async fn stream_definitions_are_synthesized_from_describe() {
    let catalog = end_to_end_source();
    catalog.seed("CREATE OR REPLACE STREAM T1_CHANGES ON TABLE T1 APPEND_ONLY = TRUE;");
    let registry = StrategyRegistry::standard(sales_scope());

    let definition = DefinitionReconstructor::new(&catalog, &registry)
        .reconstruct(&CatalogObjectRef::new(ObjectKind::Stream, "T1_CHANGES"))
        .await
        .expect("reconstruct stream");

    assert_eq!(
        definition.statement,
        "CREATE OR REPLACE STREAM T1_CHANGES ON TABLE T1;"
    );
    assert_eq!(catalog.statements(), vec!["DESC STREAM T1_CHANGES".to_string()]);
}

#[tokio::test]
async fn task_definitions_are_synthesized_from_describe() {
    let catalog = end_to_end_source();
    catalog.seed(
        "CREATE OR REPLACE TASK REFRESH WAREHOUSE = ETL_WH SCHEDULE = '60 MINUTE' \
         AS INSERT INTO T1 SELECT 3, 'gamma';",
    );
    let registry = StrategyRegistry::standard(sales_scope());

    let definition = DefinitionReconstructor::new(&catalog, &registry)
        .reconstruct(&CatalogObjectRef::new(ObjectKind::Task, "REFRESH"))
        .await
        .expect("reconstruct task");

    assert_eq!(
        definition.statement,
        "CREATE OR REPLACE TASK REFRESH\n  WAREHOUSE = ETL_WH\n  SCHEDULE = '60 MINUTE'\n\
         AS INSERT INTO T1 SELECT 3, 'gamma';"
    );

    // The synthesized statement must be accepted by a fresh catalog.
    let target = MemoryCatalog::new("SALES", "PUBLIC");
    target.seed("CREATE OR REPLACE TABLE T1 (ID NUMBER, NAME VARCHAR);");
    target.seed(&definition.statement);
    assert_eq!(target.object_names(ObjectKind::Task), vec!["REFRESH"]);
}

#[tokio::test]
async fn stage_definitions_need_no_introspection() {
    let catalog = end_to_end_source();
    let registry = StrategyRegistry::standard(sales_scope());

    let definition = DefinitionReconstructor::new(&catalog, &registry)
        .reconstruct(&CatalogObjectRef::new(ObjectKind::Stage, "S1"))
        .await
        .expect("reconstruct stage");

    assert_eq!(definition.statement, "CREATE OR REPLACE STAGE S1;");
    assert_eq!(definition.file_name(), "S1.sql");
    assert!(catalog.statements().is_empty());
}

#[tokio::test]
async fn missing_objects_are_unavailable() {
    let catalog = end_to_end_source();
    let registry = StrategyRegistry::standard(sales_scope());
    let reconstructor = DefinitionReconstructor::new(&catalog, &registry);

    let view = reconstructor
        .reconstruct(&CatalogObjectRef::new(ObjectKind::View, "GHOST"))
        .await
        .expect_err("view does not exist");
    let task = reconstructor
        .reconstruct(&CatalogObjectRef::new(ObjectKind::Task, "GHOST"))
        .await
        .expect_err("task does not exist");

    for err in [view, task] {
        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            Error::DefinitionUnavailable { ref name, .. } if name == "GHOST"
        ));
    }
}
