use std::path::PathBuf;

use snowcask_core::{CatalogScope, Error, ObjectKind, StagingLayout, StrategyRegistry, prepare};
use snowcask_extract::{ExtractOptions, SnapshotExtractor};
use snowcask_test_utils::{MemoryCatalog, end_to_end_source, init_test_logging, read_tree, temp_dir};

fn sales_registry(kinds: &[ObjectKind]) -> StrategyRegistry {
    StrategyRegistry::with_kinds(CatalogScope::new(Some("SALES".to_string()), "PUBLIC"), kinds)
}

fn prepared_layout(label: &str, registry: &StrategyRegistry) -> StagingLayout {
    let layout = StagingLayout::new(temp_dir(label).join("staging"));
    prepare(&layout, &registry.kinds()).expect("prepare staging tree");
    layout
}

#[tokio::test]
async fn end_to_end_snapshot_writes_expected_files() -> anyhow::Result<()> {
    init_test_logging();
    let catalog = end_to_end_source();
    let registry = sales_registry(&ObjectKind::ALL);
    let layout = prepared_layout("snapshot", &registry);

    let report = SnapshotExtractor::new(&catalog, &registry, &layout, ExtractOptions::default())
        .run()
        .await?;

    let files = read_tree(layout.root());
    let paths: Vec<PathBuf> = files.keys().cloned().collect();
    assert_eq!(
        paths,
        vec![
            PathBuf::from("data/stages/S1/a.csv"),
            PathBuf::from("data/tables/T1.csv"),
            PathBuf::from("infrastructure/stages/S1.sql"),
            PathBuf::from("infrastructure/tables/T1.sql"),
            PathBuf::from("infrastructure/views/V1.sql"),
        ]
    );
    assert_eq!(
        files[&PathBuf::from("infrastructure/tables/T1.sql")],
        b"CREATE OR REPLACE TABLE T1 (ID NUMBER(38,0), NAME VARCHAR(100));"
    );
    assert_eq!(
        files[&PathBuf::from("infrastructure/views/V1.sql")],
        b"CREATE OR REPLACE VIEW V1 AS SELECT ID, NAME FROM T1 WHERE ID > 1;"
    );
    assert_eq!(
        files[&PathBuf::from("infrastructure/stages/S1.sql")],
        b"CREATE OR REPLACE STAGE S1;"
    );
    assert_eq!(
        files[&PathBuf::from("data/tables/T1.csv")],
        b"ID,NAME\n1,alpha\n2,beta\n"
    );
    assert_eq!(
        files[&PathBuf::from("data/stages/S1/a.csv")],
        b"id,amount\n1,10\n"
    );

    assert_eq!(report.listed.len(), ObjectKind::ALL.len());
    assert_eq!(report.definitions.completed.len(), 3);
    assert_eq!(report.tables.completed[0].rows, 2);
    assert_eq!(report.stages.completed[0].files.len(), 1);
    assert_eq!(report.skipped_count(), 0);

    // Tables and stages are listed once and reused for the data export.
    let statements = catalog.statements();
    let show_stages = statements.iter().filter(|sql| *sql == "SHOW STAGES").count();
    assert_eq!(show_stages, 1);
    assert!(statements.contains(&"GET @s1".to_string()));
    Ok(())
}

#[tokio::test]
async fn one_unavailable_definition_is_skipped_at_any_position() -> anyhow::Result<()> {
    for failing in ["V1", "V2", "V3"] {
        let catalog = MemoryCatalog::new("SALES", "PUBLIC");
        catalog
            .seed("CREATE OR REPLACE TABLE T1 (ID NUMBER);")
            .seed("CREATE OR REPLACE VIEW V1 AS SELECT ID FROM T1;")
            .seed("CREATE OR REPLACE VIEW V2 AS SELECT ID FROM T1;")
            .seed("CREATE OR REPLACE VIEW V3 AS SELECT ID FROM T1;")
            .fail_statements_containing(&format!("'SALES.PUBLIC.{failing}'"));
        let registry = sales_registry(&[ObjectKind::View]);
        let layout = prepared_layout("skip", &registry);
        let options = ExtractOptions {
            table_data: false,
            stage_data: false,
        };

        let report = SnapshotExtractor::new(&catalog, &registry, &layout, options)
            .run()
            .await?;

        let files: Vec<PathBuf> = read_tree(layout.root()).into_keys().collect();
        let expected: Vec<PathBuf> = ["V1", "V2", "V3"]
            .into_iter()
            .filter(|view| *view != failing)
            .map(|view| PathBuf::from(format!("infrastructure/views/{view}.sql")))
            .collect();
        assert_eq!(files, expected, "failing {failing}");
        assert_eq!(report.definitions.completed.len(), 2);
        assert_eq!(report.definitions.skipped.len(), 1);
        assert_eq!(report.definitions.skipped[0].kind, ObjectKind::View);
        assert_eq!(report.definitions.skipped[0].name, failing);
    }
    Ok(())
}

#[tokio::test]
async fn names_with_path_separators_are_skipped() -> anyhow::Result<()> {
    let catalog = end_to_end_source();
    catalog
        .seed(r#"CREATE OR REPLACE TABLE "x/y" (ID NUMBER);"#)
        .seed(r#"CREATE OR REPLACE STAGE "../escape";"#);
    let registry = sales_registry(&[ObjectKind::Table, ObjectKind::Stage]);
    let layout = prepared_layout("unsafe_names", &registry);

    let report = SnapshotExtractor::new(&catalog, &registry, &layout, ExtractOptions::default())
        .run()
        .await?;

    let files: Vec<PathBuf> = read_tree(layout.root()).into_keys().collect();
    assert_eq!(
        files,
        vec![
            PathBuf::from("data/stages/S1/a.csv"),
            PathBuf::from("data/tables/T1.csv"),
            PathBuf::from("infrastructure/stages/S1.sql"),
            PathBuf::from("infrastructure/tables/T1.sql"),
        ]
    );

    let skipped_definitions: Vec<&str> = report
        .definitions
        .skipped
        .iter()
        .map(|skipped| skipped.name.as_str())
        .collect();
    assert_eq!(skipped_definitions, vec!["x/y", "../escape"]);
    assert_eq!(report.tables.skipped[0].name, "x/y");
    assert_eq!(report.stages.skipped[0].name, "../escape");
    for skipped in report
        .definitions
        .skipped
        .iter()
        .chain(&report.tables.skipped)
        .chain(&report.stages.skipped)
    {
        assert!(skipped.reason.contains("path separator"), "{}", skipped.reason);
    }
    // The stage is never downloaded.
    assert!(!catalog.statements().iter().any(|sql| sql.contains("escape") && sql.starts_with("GET")));
    Ok(())
}

#[tokio::test]
async fn failed_exports_are_skipped() -> anyhow::Result<()> {
    let catalog = end_to_end_source();
    catalog
        .seed("CREATE OR REPLACE TABLE T2 (ID NUMBER);")
        .seed("CREATE OR REPLACE STAGE S2;")
        .put_stage_file("S2", "b.csv", b"2\n")
        .fail_statements_containing("SELECT * FROM SALES.PUBLIC.T2")
        .fail_download("S2");
    let registry = sales_registry(&[ObjectKind::Table, ObjectKind::Stage]);
    let layout = prepared_layout("export", &registry);

    let report = SnapshotExtractor::new(&catalog, &registry, &layout, ExtractOptions::default())
        .run()
        .await?;

    assert_eq!(report.tables.completed.len(), 1);
    assert_eq!(report.tables.completed[0].table, "T1");
    assert_eq!(report.tables.skipped.len(), 1);
    assert_eq!(report.tables.skipped[0].name, "T2");
    assert_eq!(report.stages.completed.len(), 1);
    assert_eq!(report.stages.completed[0].stage, "S1");
    assert_eq!(report.stages.skipped[0].name, "S2");
    assert!(report.stages.skipped[0].reason.contains("access denied"));
    assert!(!layout.table_data_path("T2").exists());
    Ok(())
}

#[tokio::test]
async fn listing_failure_stops_the_pass() {
    let catalog = end_to_end_source();
    catalog.fail_statements_containing("SHOW STREAMS");
    let registry = sales_registry(&ObjectKind::ALL);
    let layout = prepared_layout("listing_failure", &registry);

    let err = SnapshotExtractor::new(&catalog, &registry, &layout, ExtractOptions::default())
        .run()
        .await
        .expect_err("stream listing must fail");

    assert!(matches!(err, Error::ListingFailure { kind: ObjectKind::Stream, .. }));
    // Kinds before the failing one were already written.
    assert!(layout.definition_path(ObjectKind::Table, "T1").exists());
    assert!(!layout.table_data_path("T1").exists());
}

#[tokio::test]
async fn table_data_needs_the_table_kind() {
    let catalog = end_to_end_source();
    let registry = sales_registry(&[ObjectKind::View]);
    let layout = prepared_layout("unregistered", &registry);

    let err = SnapshotExtractor::new(&catalog, &registry, &layout, ExtractOptions::default())
        .run()
        .await
        .expect_err("TABLE is not registered");

    assert!(matches!(err, Error::UnregisteredKind(ref label) if label == "TABLE"));
}

#[tokio::test]
async fn preflight_lists_every_kind_without_writing() -> anyhow::Result<()> {
    let catalog = end_to_end_source();
    let registry = sales_registry(&ObjectKind::ALL);
    let layout = StagingLayout::new(temp_dir("preflight").join("staging"));

    let listed = SnapshotExtractor::new(&catalog, &registry, &layout, ExtractOptions::default())
        .preflight()
        .await?;

    assert_eq!(listed.len(), ObjectKind::ALL.len());
    let counts: Vec<(ObjectKind, usize)> = listed.iter().map(|kind| (kind.kind, kind.count)).collect();
    assert!(counts.contains(&(ObjectKind::Table, 1)));
    assert!(counts.contains(&(ObjectKind::Stream, 0)));
    assert!(!layout.root().exists());
    assert!(!catalog.statements().iter().any(|sql| sql.contains("GET_DDL")));
    Ok(())
}

#[tokio::test]
async fn preflight_reports_kinds_the_source_cannot_list() {
    let catalog = end_to_end_source();
    catalog.fail_statements_containing("INFORMATION_SCHEMA.FILE_FORMATS");
    let registry = sales_registry(&ObjectKind::ALL);
    let layout = StagingLayout::new(temp_dir("preflight_failure").join("staging"));

    let err = SnapshotExtractor::new(&catalog, &registry, &layout, ExtractOptions::default())
        .preflight()
        .await
        .expect_err("file formats cannot be listed");

    assert!(matches!(err, Error::ListingFailure { kind: ObjectKind::FileFormat, .. }));
}
