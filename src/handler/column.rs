use itertools::Itertools;

use super::clauses::build_column_clauses;
use super::ActionHandler;
use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::step::Step;

/// `add_column`: shares clause construction with `create_table`; a
/// `foreign_key` field brings its index and constraint along in the same
/// ALTER statement.
pub struct AddColumnHandler;

impl ActionHandler for AddColumnHandler {
    fn action_type(&self) -> ActionType {
        ActionType::AddColumn
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::AddColumn { table_name, field } = action else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        let clauses = build_column_clauses("add_column", table_name, field)?;
        let mut alterations = vec![format!("ADD COLUMN {}", clauses.column)];
        alterations.extend(clauses.keys.into_iter().map(|k| format!("ADD {}", k)));

        let sql = format!(
            "ALTER TABLE {} {}",
            quote_ident(table_name)?,
            alterations.iter().join(", ")
        );
        Ok(vec![Step::query(sql, vec![])])
    }
}

/// `modify_column_type`: same clause construction, MODIFY wrapper. Foreign
/// keys are refused here; their index/constraint clauses cannot ride on a
/// MODIFY and the dedicated foreign-key actions handle them.
pub struct ModifyColumnTypeHandler;

impl ActionHandler for ModifyColumnTypeHandler {
    fn action_type(&self) -> ActionType {
        ActionType::ModifyColumnType
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::ModifyColumnType { table_name, field } = action else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        if field.is_foreign_key() {
            return Err(EngineError::invalid_field(
                "modify_column_type",
                "type",
                "foreign_key columns cannot be modified here; \
                 use drop_foreign_key/add_foreign_key",
            ));
        }

        let clauses = build_column_clauses("modify_column_type", table_name, field)?;
        let sql = format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            quote_ident(table_name)?,
            clauses.column
        );
        Ok(vec![Step::query(sql, vec![])])
    }
}

/// `rename_column`
pub struct RenameColumnHandler;

impl ActionHandler for RenameColumnHandler {
    fn action_type(&self) -> ActionType {
        ActionType::RenameColumn
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::RenameColumn {
            table_name,
            from,
            to,
        } = action
        else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        let sql = format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_ident(table_name)?,
            quote_ident(from)?,
            quote_ident(to)?
        );
        Ok(vec![Step::query(sql, vec![])])
    }
}
