use itertools::Itertools;

use super::clauses::{build_column_clauses, build_key_clause};
use super::ActionHandler;
use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::step::Step;

/// `create_table`: every table gets an auto-incrementing `id` primary key in
/// front of the declared fields, InnoDB and utf8mb4.
pub struct CreateTableHandler;

impl ActionHandler for CreateTableHandler {
    fn action_type(&self) -> ActionType {
        ActionType::CreateTable
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::CreateTable {
            table_name,
            fields,
            constraints,
        } = action
        else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        let quoted_table = quote_ident(table_name)?;

        let mut columns = vec!["`id` INT NOT NULL AUTO_INCREMENT".to_string()];
        let mut keys = Vec::new();

        for field in fields {
            let clauses = build_column_clauses("create_table", table_name, field)?;
            columns.push(clauses.column);
            keys.extend(clauses.keys);
        }

        keys.push("PRIMARY KEY (`id`)".to_string());

        for constraint in constraints {
            keys.push(build_key_clause("create_table", table_name, constraint)?);
        }

        let sql = format!(
            "CREATE TABLE {} ({}) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            quoted_table,
            columns.into_iter().chain(keys).join(", ")
        );

        Ok(vec![Step::query(sql, vec![])])
    }
}

/// `rename_table`
pub struct RenameTableHandler;

impl ActionHandler for RenameTableHandler {
    fn action_type(&self) -> ActionType {
        ActionType::RenameTable
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::RenameTable { from, to } = action else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        let sql = format!("RENAME TABLE {} TO {}", quote_ident(from)?, quote_ident(to)?);
        Ok(vec![Step::query(sql, vec![])])
    }
}
