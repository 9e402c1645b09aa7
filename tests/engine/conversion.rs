use std::path::PathBuf;
use std::sync::Arc;

use mymt::action::MigrationFile;
use mymt::constants::{LEGACY_TRACKING_TABLE, OLDER_LEGACY_TRACKING_TABLE};
use mymt::error::EngineError;
use mymt::handler::HandlerRegistry;
use mymt::manager::conversion::ConversionOutcome;
use mymt::manager::{
    ConversionManager, DatabaseManager, MigrationDirs, MigrationManager, MigrationType,
};
use mymt::progress::MemorySink;
use mymt::task::TaskRegistry;

use crate::helpers::FakeDatabase;

struct Harness {
    db: Arc<FakeDatabase>,
    manager: ConversionManager<FakeDatabase>,
    sink: Arc<MemorySink>,
    app_dir: PathBuf,
    framework_dir: PathBuf,
    scheme_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

fn harness(db: FakeDatabase) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let app_dir = tmp.path().join("migrations");
    let framework_dir = tmp.path().join("framework/migrations");
    let scheme_dir = tmp.path().join("db_scheme");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::create_dir_all(&framework_dir).unwrap();
    std::fs::create_dir_all(&scheme_dir).unwrap();

    let db = Arc::new(db);
    let handlers = Arc::new(HandlerRegistry::with_defaults(Arc::new(TaskRegistry::new())));
    let sink = Arc::new(MemorySink::new());
    let database_manager = DatabaseManager::new(db.clone(), handlers, sink.clone());
    let migration_manager = MigrationManager::new(
        database_manager,
        MigrationDirs {
            app: app_dir.clone(),
            framework: framework_dir.clone(),
        },
        sink.clone(),
    );
    let manager = ConversionManager::new(migration_manager, scheme_dir.clone(), sink.clone());
    Harness {
        db,
        manager,
        sink,
        app_dir,
        framework_dir,
        scheme_dir,
        _tmp: tmp,
    }
}

const SCHEME_V1: &str = r#"
target_version: 1
actions:
  - type: create_table
    table_name: widgets
    fields:
      - name: name
        type: varchar
        size: 50
    constraints: []
"#;

#[tokio::test]
async fn test_convert_writes_files_and_registers_history() {
    let harness = harness(FakeDatabase::with_legacy_version(LEGACY_TRACKING_TABLE, 2));
    std::fs::write(harness.scheme_dir.join("0001.yaml"), SCHEME_V1).unwrap();
    std::fs::write(harness.scheme_dir.join("0002.yaml"), SCHEME_V1.replace("widgets", "gadgets"))
        .unwrap();

    let outcome = harness.manager.convert_from_db_scheme(false).await.unwrap();
    assert_eq!(outcome, ConversionOutcome::Converted { versions: 2 });

    // Converted migration files exist and carry the translated actions.
    let first = harness
        .app_dir
        .join("0000_01_01_000000_legacy_db_scheme_0001.yaml");
    let file = MigrationFile::load(&first).unwrap();
    assert_eq!(file.up_actions().len(), 1);
    assert_eq!(file.down_actions().unwrap().len(), 0);

    // Both versions are recorded as executed under one shared batch, and no
    // action from the legacy sequence ran.
    let rows = harness.db.ledger_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.batch == rows[0].batch));
    assert!(!harness.db.log_contains("CREATE TABLE `widgets`"));
}

#[tokio::test]
async fn test_convert_twice_is_a_noop() {
    let harness = harness(FakeDatabase::with_legacy_version(LEGACY_TRACKING_TABLE, 1));
    std::fs::write(harness.scheme_dir.join("0001.yaml"), SCHEME_V1).unwrap();

    harness.manager.convert_from_db_scheme(false).await.unwrap();
    let rows_after_first = harness.db.ledger_rows();

    let outcome = harness.manager.convert_from_db_scheme(false).await.unwrap();
    assert_eq!(outcome, ConversionOutcome::AlreadyConverted);
    assert_eq!(harness.db.ledger_rows(), rows_after_first);
}

#[tokio::test]
async fn test_missing_scheme_file_becomes_placeholder() {
    let harness = harness(FakeDatabase::with_legacy_version(LEGACY_TRACKING_TABLE, 2));
    std::fs::write(harness.scheme_dir.join("0002.yaml"), SCHEME_V1).unwrap();
    // 0001.yaml is missing.

    let outcome = harness.manager.convert_from_db_scheme(false).await.unwrap();
    assert_eq!(outcome, ConversionOutcome::Converted { versions: 2 });
    assert!(harness.sink.contains("writing placeholder"));

    let placeholder = MigrationFile::load(
        &harness
            .app_dir
            .join("0000_01_01_000000_legacy_db_scheme_0001.yaml"),
    )
    .unwrap();
    assert!(placeholder.up_actions().is_empty());

    // The numeric sequence stays intact in the ledger.
    assert_eq!(harness.db.ledger_rows().len(), 2);
}

#[tokio::test]
async fn test_convert_registers_old_framework_migrations() {
    let harness = harness(FakeDatabase::with_legacy_version(LEGACY_TRACKING_TABLE, 1));
    std::fs::write(harness.scheme_dir.join("0001.yaml"), SCHEME_V1).unwrap();
    std::fs::write(
        harness.framework_dir.join("2023_05_01_000000_framework_base.yaml"),
        "up:\n  actions: []\n",
    )
    .unwrap();
    std::fs::write(
        harness.framework_dir.join("2025_05_01_000000_framework_next.yaml"),
        "up:\n  actions: []\n",
    )
    .unwrap();

    harness.manager.convert_from_db_scheme(false).await.unwrap();

    let rows = harness.db.ledger_rows();
    let framework: Vec<_> = rows
        .iter()
        .filter(|row| row.migration_type == "framework")
        .collect();
    // Only the migration dated before the epoch marker is registered.
    assert_eq!(framework.len(), 1);
    assert_eq!(framework[0].migration, "2023_05_01_000000_framework_base");
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let harness = harness(FakeDatabase::with_legacy_version(LEGACY_TRACKING_TABLE, 1));
    std::fs::write(harness.scheme_dir.join("0001.yaml"), SCHEME_V1).unwrap();

    let outcome = harness.manager.convert_from_db_scheme(true).await.unwrap();
    assert_eq!(outcome, ConversionOutcome::Converted { versions: 1 });

    assert!(harness.db.ledger_rows().is_empty());
    assert!(!harness
        .app_dir
        .join("0000_01_01_000000_legacy_db_scheme_0001.yaml")
        .exists());
    assert!(harness.sink.contains("Would convert version 1"));
}

#[tokio::test]
async fn test_production_guard_on_populated_ledger() {
    let harness = harness(FakeDatabase::new());
    // Populate the ledger through the migration manager first.
    {
        let db = harness.db.clone();
        let handlers = Arc::new(HandlerRegistry::with_defaults(Arc::new(TaskRegistry::new())));
        let sink = Arc::new(MemorySink::new());
        let database_manager = DatabaseManager::new(db, handlers, sink.clone());
        let migration_manager = MigrationManager::new(
            database_manager,
            MigrationDirs {
                app: harness.app_dir.clone(),
                framework: harness.framework_dir.clone(),
            },
            sink,
        );
        migration_manager.ensure_ledger().await.unwrap();
        migration_manager
            .record_migration("2024_06_01_000000_seed", MigrationType::App, 1)
            .await
            .unwrap();
    }

    let outcome = harness.manager.convert_production(false).await.unwrap();
    assert_eq!(outcome, ConversionOutcome::AlreadyConverted);
    assert_eq!(harness.db.ledger_rows().len(), 1);
}

#[tokio::test]
async fn test_production_detects_older_tracking_table() {
    let harness = harness(FakeDatabase::with_legacy_version(
        OLDER_LEGACY_TRACKING_TABLE,
        3,
    ));

    let outcome = harness.manager.convert_production(false).await.unwrap();
    assert_eq!(outcome, ConversionOutcome::Converted { versions: 3 });

    let rows = harness.db.ledger_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].migration, "0000_01_01_000000_legacy_db_scheme_0001");
    assert_eq!(rows[2].migration, "0000_01_01_000000_legacy_db_scheme_0003");
    // Mark-as-applied only: no scheme actions executed, no files required.
    assert!(!harness.db.log_contains("CREATE TABLE `widgets`"));
}

#[tokio::test]
async fn test_production_without_marker_and_no_pending_is_nothing_to_do() {
    let harness = harness(FakeDatabase::new());
    let outcome = harness.manager.convert_production(false).await.unwrap();
    assert_eq!(outcome, ConversionOutcome::NothingToDo);
}

#[tokio::test]
async fn test_production_without_marker_but_pending_is_fatal() {
    let harness = harness(FakeDatabase::new());
    std::fs::write(
        harness.app_dir.join("2024_06_01_000000_create_widgets.yaml"),
        "up:\n  actions: []\n",
    )
    .unwrap();

    let err = harness.manager.convert_production(false).await.unwrap_err();
    assert!(matches!(err, EngineError::Detection(_)));
    assert!(harness.db.ledger_rows().is_empty());
}
