pub mod changeset;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::value::SqlValue;

pub use changeset::{ActionList, ChangeSet, Direction, MigrationFile};

/// Declarative description of one schema change.
///
/// Actions are the unit of the migration language: a migration file carries
/// ordered lists of them, and each compiles to one or more executable steps.
/// The `type` tag in YAML selects the variant; unknown tags and missing
/// fields fail at deserialization, before any SQL is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    CreateTable {
        table_name: String,
        #[serde(default)]
        fields: Vec<FieldDef>,
        #[serde(default)]
        constraints: Vec<ConstraintDef>,
    },
    AddColumn {
        table_name: String,
        field: FieldDef,
    },
    ModifyColumnType {
        table_name: String,
        field: FieldDef,
    },
    RenameColumn {
        table_name: String,
        from: String,
        to: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddConstraint {
        table_name: String,
        constraint: ConstraintDef,
    },
    AddForeignKey {
        table_name: String,
        #[serde(flatten)]
        foreign_key: ForeignKeySpec,
    },
    DropForeignKey {
        table_name: String,
        field: String,
        #[serde(default)]
        name: Option<String>,
    },
    ModifyForeignKey {
        table_name: String,
        #[serde(flatten)]
        foreign_key: ForeignKeySpec,
    },
    InsertRow {
        table_name: String,
        values: BTreeMap<String, SqlValue>,
    },
    RawQuery {
        query: String,
        params: Vec<SqlValue>,
    },
    CreateTrigger {
        name: String,
        table_name: String,
        time: TriggerTime,
        event: TriggerEvent,
        action: String,
    },
    RunTask {
        task: String,
    },
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::CreateTable { .. } => ActionType::CreateTable,
            Action::AddColumn { .. } => ActionType::AddColumn,
            Action::ModifyColumnType { .. } => ActionType::ModifyColumnType,
            Action::RenameColumn { .. } => ActionType::RenameColumn,
            Action::RenameTable { .. } => ActionType::RenameTable,
            Action::AddConstraint { .. } => ActionType::AddConstraint,
            Action::AddForeignKey { .. } => ActionType::AddForeignKey,
            Action::DropForeignKey { .. } => ActionType::DropForeignKey,
            Action::ModifyForeignKey { .. } => ActionType::ModifyForeignKey,
            Action::InsertRow { .. } => ActionType::InsertRow,
            Action::RawQuery { .. } => ActionType::RawQuery,
            Action::CreateTrigger { .. } => ActionType::CreateTrigger,
            Action::RunTask { .. } => ActionType::RunTask,
        }
    }
}

/// Discriminant for [`Action`], used as the handler-registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    CreateTable,
    AddColumn,
    ModifyColumnType,
    RenameColumn,
    RenameTable,
    AddConstraint,
    AddForeignKey,
    DropForeignKey,
    ModifyForeignKey,
    InsertRow,
    RawQuery,
    CreateTrigger,
    RunTask,
}

impl ActionType {
    pub const ALL: [ActionType; 13] = [
        ActionType::CreateTable,
        ActionType::AddColumn,
        ActionType::ModifyColumnType,
        ActionType::RenameColumn,
        ActionType::RenameTable,
        ActionType::AddConstraint,
        ActionType::AddForeignKey,
        ActionType::DropForeignKey,
        ActionType::ModifyForeignKey,
        ActionType::InsertRow,
        ActionType::RawQuery,
        ActionType::CreateTrigger,
        ActionType::RunTask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateTable => "create_table",
            ActionType::AddColumn => "add_column",
            ActionType::ModifyColumnType => "modify_column_type",
            ActionType::RenameColumn => "rename_column",
            ActionType::RenameTable => "rename_table",
            ActionType::AddConstraint => "add_constraint",
            ActionType::AddForeignKey => "add_foreign_key",
            ActionType::DropForeignKey => "drop_foreign_key",
            ActionType::ModifyForeignKey => "modify_foreign_key",
            ActionType::InsertRow => "insert_row",
            ActionType::RawQuery => "raw_query",
            ActionType::CreateTrigger => "create_trigger",
            ActionType::RunTask => "run_task",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column definition.
///
/// `type` is a logical type: `foreign_key` becomes a 32-bit integer with the
/// matching index and constraint clauses, `varchar` requires `size`, and
/// anything else passes through uppercased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SqlValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_field: Option<String>,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
}

impl FieldDef {
    pub fn is_foreign_key(&self) -> bool {
        self.field_type == "foreign_key"
    }
}

/// Table constraint at creation or alter time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintDef {
    /// Unique key; name defaults to `unique_{table}_{columns joined by _}`.
    Unique {
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Plain index; an explicit name is mandatory.
    Index {
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// Foreign-key description shared by `add_foreign_key` and
/// `modify_foreign_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    pub field: String,
    pub foreign_table: String,
    pub foreign_field: String,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    Restrict,
    Cascade,
    SetNull,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerTime {
    Before,
    After,
}

impl TriggerTime {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerTime::Before => "BEFORE",
            TriggerTime::After => "AFTER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}
