use super::ActionHandler;
use crate::action::{Action, ActionType, ForeignKeySpec};
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::step::Step;

fn constraint_name(table: &str, field: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(name) => name.to_string(),
        None => format!("fk_{}_{}", table, field),
    }
}

fn add_step(table: &str, key: &ForeignKeySpec) -> Result<Step, EngineError> {
    let name = constraint_name(table, &key.field, key.name.as_deref());
    let sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) \
         ON DELETE {} ON UPDATE {}",
        quote_ident(table)?,
        quote_ident(&name)?,
        quote_ident(&key.field)?,
        quote_ident(&key.foreign_table)?,
        quote_ident(&key.foreign_field)?,
        key.on_delete.as_sql(),
        key.on_update.as_sql(),
    );
    Ok(Step::query(sql, vec![]))
}

fn drop_step(table: &str, field: &str, explicit: Option<&str>) -> Result<Step, EngineError> {
    let name = constraint_name(table, field, explicit);
    let sql = format!(
        "ALTER TABLE {} DROP FOREIGN KEY {}",
        quote_ident(table)?,
        quote_ident(&name)?
    );
    Ok(Step::query(sql, vec![]))
}

/// `add_foreign_key`
pub struct AddForeignKeyHandler;

impl ActionHandler for AddForeignKeyHandler {
    fn action_type(&self) -> ActionType {
        ActionType::AddForeignKey
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::AddForeignKey {
            table_name,
            foreign_key,
        } = action
        else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };
        Ok(vec![add_step(table_name, foreign_key)?])
    }
}

/// `drop_foreign_key`
pub struct DropForeignKeyHandler;

impl ActionHandler for DropForeignKeyHandler {
    fn action_type(&self) -> ActionType {
        ActionType::DropForeignKey
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::DropForeignKey {
            table_name,
            field,
            name,
        } = action
        else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };
        Ok(vec![drop_step(table_name, field, name.as_deref())?])
    }
}

/// `modify_foreign_key`: always exactly two steps, a drop followed by an
/// add, never combined into one statement. The pair runs inside the change
/// set's transaction, but MySQL DDL commits implicitly, so an interruption
/// between the steps can leave the constraint absent.
pub struct ModifyForeignKeyHandler;

impl ActionHandler for ModifyForeignKeyHandler {
    fn action_type(&self) -> ActionType {
        ActionType::ModifyForeignKey
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::ModifyForeignKey {
            table_name,
            foreign_key,
        } = action
        else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };
        Ok(vec![
            drop_step(table_name, &foreign_key.field, foreign_key.name.as_deref())?,
            add_step(table_name, foreign_key)?,
        ])
    }
}
