use super::ActionHandler;
use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::step::Step;

/// `raw_query`: passthrough of caller-provided SQL and parameters.
///
/// This is the escape hatch for anything the action language cannot express;
/// the caller owns the statement text, so no identifier validation applies.
pub struct RawQueryHandler;

impl ActionHandler for RawQueryHandler {
    fn action_type(&self) -> ActionType {
        ActionType::RawQuery
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::RawQuery { query, params } = action else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };
        Ok(vec![Step::query(query.clone(), params.clone())])
    }
}
