use std::sync::Arc;

use mymt::action::Direction;
use mymt::error::EngineError;
use mymt::handler::HandlerRegistry;
use mymt::manager::{DatabaseManager, MigrationDirs, MigrationManager, MigrationType};
use mymt::progress::MemorySink;
use mymt::task::TaskRegistry;

use crate::helpers::FakeDatabase;

const CREATE_WIDGETS: &str = r#"
up:
  actions:
    - type: create_table
      table_name: widgets
      fields:
        - name: name
          type: varchar
          size: 50
      constraints: []
down:
  actions:
    - type: raw_query
      query: "DROP TABLE `widgets`"
      params: []
"#;

const ADD_LABEL: &str = r#"
up:
  actions:
    - type: add_column
      table_name: widgets
      field:
        name: label
        type: varchar
        size: 20
        nullable: true
down:
  actions:
    - type: raw_query
      query: "ALTER TABLE `widgets` DROP COLUMN `label`"
      params: []
"#;

const UP_ONLY: &str = r#"
actions:
  - type: rename_table
    from: widgets
    to: gadgets
"#;

struct Harness {
    db: Arc<FakeDatabase>,
    manager: MigrationManager<FakeDatabase>,
    sink: Arc<MemorySink>,
    _tmp: tempfile::TempDir,
}

fn harness(files: &[(&str, &str)]) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let app_dir = tmp.path().join("migrations");
    let framework_dir = tmp.path().join("framework/migrations");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::create_dir_all(&framework_dir).unwrap();
    for (name, content) in files {
        std::fs::write(app_dir.join(name), content).unwrap();
    }

    let db = Arc::new(FakeDatabase::new());
    let handlers = Arc::new(HandlerRegistry::with_defaults(Arc::new(TaskRegistry::new())));
    let sink = Arc::new(MemorySink::new());
    let database_manager = DatabaseManager::new(db.clone(), handlers, sink.clone());
    let manager = MigrationManager::new(
        database_manager,
        MigrationDirs {
            app: app_dir,
            framework: framework_dir,
        },
        sink.clone(),
    );
    Harness {
        db,
        manager,
        sink,
        _tmp: tmp,
    }
}

fn write_framework(harness: &Harness, name: &str, content: &str) {
    std::fs::write(
        harness.manager.dirs().framework.join(name),
        content,
    )
    .unwrap();
}

#[tokio::test]
async fn test_pending_is_stable_and_in_discovery_order() {
    let harness = harness(&[
        ("2024_06_02_000000_add_label.yaml", ADD_LABEL),
        ("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS),
    ]);

    let first = harness
        .manager
        .pending_migrations(MigrationType::App)
        .await
        .unwrap();
    let second = harness
        .manager
        .pending_migrations(MigrationType::App)
        .await
        .unwrap();

    let names: Vec<&str> = first.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "2024_06_01_000000_create_widgets",
            "2024_06_02_000000_add_label"
        ]
    );
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_run_pending_shares_one_batch() {
    let harness = harness(&[
        ("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS),
        ("2024_06_02_000000_add_label.yaml", ADD_LABEL),
    ]);

    let applied = harness
        .manager
        .run_pending_migrations(MigrationType::App, false)
        .await
        .unwrap();
    assert_eq!(applied, 2);

    let rows = harness.db.ledger_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.batch == 1));
    assert!(rows.iter().all(|row| row.migration_type == "app"));

    // A later run starts a fresh batch.
    write_framework(
        &harness,
        "2024_06_03_000000_framework_change.yaml",
        UP_ONLY,
    );
    // The rename migration targets `widgets`, which exists by now.
    harness
        .manager
        .run_pending_migrations(MigrationType::Framework, false)
        .await
        .unwrap();
    let rows = harness.db.ledger_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].batch, 2);
    assert_eq!(rows[2].migration_type, "framework");

    // Everything already recorded: nothing further to do.
    let applied = harness
        .manager
        .run_pending_migrations(MigrationType::App, false)
        .await
        .unwrap();
    assert_eq!(applied, 0);
    assert!(harness.sink.contains("Nothing to migrate"));
}

#[tokio::test]
async fn test_up_then_down_leaves_no_ledger_row() {
    let harness = harness(&[("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS)]);
    let migration = harness.manager.discover(MigrationType::App).unwrap()[0].clone();

    harness.manager.ensure_ledger().await.unwrap();
    harness
        .manager
        .run_migration(&migration, 1, MigrationType::App, Direction::Up, false)
        .await
        .unwrap();
    assert_eq!(harness.db.ledger_rows().len(), 1);

    harness
        .manager
        .run_migration(&migration, 1, MigrationType::App, Direction::Down, false)
        .await
        .unwrap();
    assert!(harness.db.ledger_rows().is_empty());
    assert!(harness.db.log_contains("DROP TABLE `widgets`"));
}

#[tokio::test]
async fn test_down_without_actions_is_an_error() {
    let harness = harness(&[("2024_06_01_000000_rename.yaml", UP_ONLY)]);
    let migration = harness.manager.discover(MigrationType::App).unwrap()[0].clone();

    harness.manager.ensure_ledger().await.unwrap();
    let err = harness
        .manager
        .run_migration(&migration, 1, MigrationType::App, Direction::Down, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingDown(_)));
    assert!(err.to_string().contains("2024_06_01_000000_rename"));
}

#[tokio::test]
async fn test_flat_actions_run_as_up() {
    let harness = harness(&[
        ("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS),
        ("2024_06_02_000000_rename.yaml", UP_ONLY),
    ]);

    harness
        .manager
        .run_pending_migrations(MigrationType::App, false)
        .await
        .unwrap();
    assert!(harness.db.log_contains("RENAME TABLE `widgets` TO `gadgets`"));
    assert!(harness.db.table_names().contains(&"gadgets".to_string()));
}

#[tokio::test]
async fn test_dry_run_executes_and_records_nothing() {
    let harness = harness(&[("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS)]);

    let applied = harness
        .manager
        .run_pending_migrations(MigrationType::App, true)
        .await
        .unwrap();
    assert_eq!(applied, 1);

    assert!(harness.db.ledger_rows().is_empty());
    assert!(!harness.db.log_contains("CREATE TABLE `widgets`"));
    assert!(!harness.db.table_names().contains(&"widgets".to_string()));
    assert!(harness.sink.contains("Would run"));
}

#[tokio::test]
async fn test_failed_migration_records_nothing() {
    let harness = harness(&[("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS)]);
    harness.db.fail_on("CREATE TABLE `widgets`");

    let err = harness
        .manager
        .run_pending_migrations(MigrationType::App, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));

    assert!(harness.db.ledger_rows().is_empty());
    assert!(harness.db.log_contains("ROLLBACK"));
}

#[tokio::test]
async fn test_types_are_tracked_independently() {
    let harness = harness(&[("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS)]);
    // Same file name on the framework side.
    write_framework(
        &harness,
        "2024_06_01_000000_create_widgets.yaml",
        CREATE_WIDGETS,
    );

    harness
        .manager
        .run_pending_migrations(MigrationType::App, false)
        .await
        .unwrap();

    // The app run does not mark the framework copy as executed.
    let framework_pending = harness
        .manager
        .pending_migrations(MigrationType::Framework)
        .await
        .unwrap();
    assert_eq!(framework_pending.len(), 1);

    let executed_app = harness
        .manager
        .executed_migrations(MigrationType::App)
        .await
        .unwrap();
    assert_eq!(executed_app, vec!["2024_06_01_000000_create_widgets"]);
}

#[tokio::test]
async fn test_rollback_last_batch_reverses_apply_order() {
    let harness = harness(&[
        ("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS),
        ("2024_06_02_000000_add_label.yaml", ADD_LABEL),
    ]);

    harness
        .manager
        .run_pending_migrations(MigrationType::App, false)
        .await
        .unwrap();
    assert_eq!(harness.db.ledger_rows().len(), 2);

    let rolled_back = harness
        .manager
        .rollback_last_batch(MigrationType::App, false)
        .await
        .unwrap();
    assert_eq!(rolled_back, 2);
    assert!(harness.db.ledger_rows().is_empty());

    // The add_label down ran before the create_widgets down.
    let sql = harness.db.executed_sql();
    let drop_label = sql
        .iter()
        .position(|s| s.contains("DROP COLUMN `label`"))
        .unwrap();
    let drop_table = sql
        .iter()
        .position(|s| s.contains("DROP TABLE `widgets`"))
        .unwrap();
    assert!(drop_label < drop_table);
}

#[tokio::test]
async fn test_rollback_with_missing_file_fails() {
    let harness = harness(&[("2024_06_01_000000_create_widgets.yaml", CREATE_WIDGETS)]);

    harness
        .manager
        .run_pending_migrations(MigrationType::App, false)
        .await
        .unwrap();
    std::fs::remove_file(
        harness
            .manager
            .dirs()
            .app
            .join("2024_06_01_000000_create_widgets.yaml"),
    )
    .unwrap();

    let err = harness
        .manager
        .rollback_last_batch(MigrationType::App, false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no file on disk"));
}
