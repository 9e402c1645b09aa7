use std::collections::BTreeMap;
use std::sync::Arc;

use mymt::action::{Action, ChangeSet, ConstraintDef, FieldDef, ReferentialAction};
use mymt::constants::LEGACY_TRACKING_TABLE;
use mymt::error::EngineError;
use mymt::handler::HandlerRegistry;
use mymt::manager::DatabaseManager;
use mymt::progress::MemorySink;
use mymt::task::TaskRegistry;
use mymt::value::SqlValue;

use crate::helpers::FakeDatabase;

fn manager(db: Arc<FakeDatabase>) -> DatabaseManager<FakeDatabase> {
    let handlers = Arc::new(HandlerRegistry::with_defaults(Arc::new(TaskRegistry::new())));
    DatabaseManager::new(db, handlers, Arc::new(MemorySink::new()))
}

fn varchar_field(name: &str, size: u32) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        field_type: "varchar".to_string(),
        nullable: false,
        default: None,
        size: Some(size),
        after: None,
        foreign_table: None,
        foreign_field: None,
        on_delete: ReferentialAction::default(),
        on_update: ReferentialAction::default(),
    }
}

fn create_widgets_change_set(target_version: u32) -> ChangeSet {
    ChangeSet {
        target_version: Some(target_version),
        actions: vec![Action::CreateTable {
            table_name: "widgets".into(),
            fields: vec![varchar_field("name", 50)],
            constraints: vec![],
        }],
    }
}

#[tokio::test]
async fn test_execute_advances_version_and_creates_table() {
    let db = Arc::new(FakeDatabase::new());
    let manager = manager(db.clone());
    manager.initialize().await.unwrap();

    manager
        .execute(&create_widgets_change_set(1), false)
        .await
        .unwrap();

    assert_eq!(manager.current_version().await.unwrap(), 1);
    assert!(db.table_names().contains(&"widgets".to_string()));
    assert!(db.log_contains("`id` INT NOT NULL AUTO_INCREMENT"));
    assert!(db.log_contains("`name` VARCHAR(50) NOT NULL"));

    // The hash was recomputed and stored alongside the version.
    let (version, hash) = db.legacy_row(LEGACY_TRACKING_TABLE).unwrap();
    assert_eq!(version, 1);
    assert!(!hash.is_empty());
    assert!(manager.verify_hash().await.unwrap());
}

#[tokio::test]
async fn test_execute_refuses_version_gap() {
    let db = Arc::new(FakeDatabase::with_legacy_version(LEGACY_TRACKING_TABLE, 2));
    let manager = manager(db.clone());

    let err = manager
        .execute(&create_widgets_change_set(5), false)
        .await
        .unwrap_err();
    match err {
        EngineError::VersionMismatch {
            target,
            current,
            expected,
        } => {
            assert_eq!((target, current, expected), (5, 2, 4));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // No transaction opened, no DDL executed.
    assert!(!db.log_contains("START TRANSACTION"));
    assert!(!db.log_contains("CREATE TABLE `widgets`"));
    assert!(!db.table_names().contains(&"widgets".to_string()));
}

#[tokio::test]
async fn test_execute_requires_target_version() {
    let db = Arc::new(FakeDatabase::new());
    let manager = manager(db);
    manager.initialize().await.unwrap();

    let change_set = ChangeSet {
        target_version: None,
        actions: vec![],
    };
    assert!(matches!(
        manager.execute(&change_set, false).await,
        Err(EngineError::MissingTargetVersion)
    ));
}

#[tokio::test]
async fn test_ignore_version_skips_gate_and_bookkeeping() {
    let db = Arc::new(FakeDatabase::with_legacy_version(LEGACY_TRACKING_TABLE, 2));
    let manager = manager(db.clone());

    // Target version 9 would fail the gate; ignore_version skips it.
    manager
        .execute(&create_widgets_change_set(9), true)
        .await
        .unwrap();

    assert!(db.table_names().contains(&"widgets".to_string()));
    // Version and hash untouched.
    assert_eq!(manager.current_version().await.unwrap(), 2);
    assert_eq!(db.legacy_row(LEGACY_TRACKING_TABLE).unwrap().1, "");
}

#[tokio::test]
async fn test_compile_failure_runs_no_sql() {
    let db = Arc::new(FakeDatabase::new());
    let manager = manager(db.clone());
    manager.initialize().await.unwrap();

    let change_set = ChangeSet {
        target_version: Some(1),
        actions: vec![
            Action::CreateTable {
                table_name: "widgets".into(),
                fields: vec![],
                constraints: vec![],
            },
            // Compilation fails here: index constraints need a name.
            Action::AddConstraint {
                table_name: "widgets".into(),
                constraint: ConstraintDef::Index {
                    columns: vec!["name".into()],
                    name: None,
                },
            },
        ],
    };

    let err = manager.execute(&change_set, false).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::MissingField { field: "name", .. }
    ));
    // Compilation failed before the transaction opened: no SQL at all.
    assert!(!db.log_contains("START TRANSACTION"));
    assert!(!db.log_contains("CREATE TABLE `widgets`"));
    assert!(!db.table_names().contains(&"widgets".to_string()));
}

#[tokio::test]
async fn test_step_failure_rolls_back_everything() {
    let db = Arc::new(FakeDatabase::new());
    let manager = manager(db.clone());
    manager.initialize().await.unwrap();

    db.fail_on("ALTER TABLE `widgets`");
    let change_set = ChangeSet {
        target_version: Some(1),
        actions: vec![
            Action::CreateTable {
                table_name: "widgets".into(),
                fields: vec![varchar_field("name", 50)],
                constraints: vec![],
            },
            Action::AddConstraint {
                table_name: "widgets".into(),
                constraint: ConstraintDef::Unique {
                    columns: vec!["name".into()],
                    name: None,
                },
            },
        ],
    };

    let err = manager.execute(&change_set, false).await.unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));

    assert!(db.log_contains("ROLLBACK"));
    // The table created by the first step is gone with the transaction, and
    // the version never moved.
    assert!(!db.table_names().contains(&"widgets".to_string()));
    assert_eq!(manager.current_version().await.unwrap(), 0);
}

#[tokio::test]
async fn test_hash_invariant_under_row_churn() {
    let db = Arc::new(FakeDatabase::new());
    let manager = manager(db.clone());
    manager.initialize().await.unwrap();
    manager
        .execute(&create_widgets_change_set(1), false)
        .await
        .unwrap();

    let before = manager.calculate_hash().await.unwrap();

    // Row-level inserts bump the table's auto-increment counter but must not
    // move the hash.
    let mut values = BTreeMap::new();
    values.insert("name".to_string(), SqlValue::Text("a".into()));
    manager
        .apply_actions(&[Action::InsertRow {
            table_name: "widgets".into(),
            values,
        }])
        .await
        .unwrap();

    assert_eq!(manager.calculate_hash().await.unwrap(), before);
    assert!(manager.verify_hash().await.unwrap());

    // A DDL change does move the hash.
    manager
        .apply_actions(&[Action::AddColumn {
            table_name: "widgets".into(),
            field: varchar_field("label", 20),
        }])
        .await
        .unwrap();
    assert_ne!(manager.calculate_hash().await.unwrap(), before);
    assert!(!manager.verify_hash().await.unwrap());
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let db = Arc::new(FakeDatabase::new());
    let manager = manager(db.clone());
    assert!(!manager.is_initialized().await.unwrap());

    manager.initialize().await.unwrap();
    assert!(manager.is_initialized().await.unwrap());
    assert_eq!(manager.current_version().await.unwrap(), 0);

    manager.initialize().await.unwrap();
    assert_eq!(manager.current_version().await.unwrap(), 0);
}
