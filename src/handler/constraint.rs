use super::clauses::build_key_clause;
use super::ActionHandler;
use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::step::Step;

/// `add_constraint`: unique or index key on an existing table.
pub struct AddConstraintHandler;

impl ActionHandler for AddConstraintHandler {
    fn action_type(&self) -> ActionType {
        ActionType::AddConstraint
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::AddConstraint {
            table_name,
            constraint,
        } = action
        else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        let clause = build_key_clause("add_constraint", table_name, constraint)?;
        let sql = format!("ALTER TABLE {} ADD {}", quote_ident(table_name)?, clause);
        Ok(vec![Step::query(sql, vec![])])
    }
}
