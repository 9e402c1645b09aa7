use super::ActionHandler;
use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::step::Step;

/// `create_trigger`: `CREATE TRIGGER name {BEFORE|AFTER} {event} ON table
/// FOR EACH ROW {body}`. The body is trusted SQL, like `raw_query`.
pub struct CreateTriggerHandler;

impl ActionHandler for CreateTriggerHandler {
    fn action_type(&self) -> ActionType {
        ActionType::CreateTrigger
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::CreateTrigger {
            name,
            table_name,
            time,
            event,
            action: body,
        } = action
        else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };

        if body.trim().is_empty() {
            return Err(EngineError::missing_field("create_trigger", "action"));
        }

        let sql = format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {}",
            quote_ident(name)?,
            time.as_sql(),
            event.as_sql(),
            quote_ident(table_name)?,
            body
        );
        Ok(vec![Step::query(sql, vec![])])
    }
}
