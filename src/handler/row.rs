use itertools::Itertools;

use super::ActionHandler;
use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::step::Step;
use crate::value::SqlValue;

/// `insert_row`: parameterized `INSERT ... SET`.
///
/// A `null` value is emitted as the literal `NULL` keyword with no bound
/// parameter, so "set to SQL NULL" stays distinct from "bind an empty
/// string". Booleans are coerced to `0`/`1` before binding; the driver may
/// reject a raw boolean `false`.
pub struct InsertRowHandler;

impl ActionHandler for InsertRowHandler {
    fn action_type(&self) -> ActionType {
        ActionType::InsertRow
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::InsertRow { table_name, values } = action else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        if values.is_empty() {
            return Err(EngineError::missing_field("insert_row", "values"));
        }

        let mut assignments = Vec::with_capacity(values.len());
        let mut params = Vec::new();
        for (column, value) in values {
            let quoted = quote_ident(column)?;
            if value.is_null() {
                assignments.push(format!("{} = NULL", quoted));
            } else {
                assignments.push(format!("{} = ?", quoted));
                params.push(match value {
                    SqlValue::Bool(b) => SqlValue::Int(i64::from(*b)),
                    other => other.clone(),
                });
            }
        }

        let sql = format!(
            "INSERT INTO {} SET {}",
            quote_ident(table_name)?,
            assignments.iter().join(", ")
        );
        Ok(vec![Step::query(sql, params)])
    }
}
