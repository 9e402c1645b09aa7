use std::sync::Arc;

use super::ActionHandler;
use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::step::Step;
use crate::task::TaskRegistry;

/// `run_task`: resolves the task identifier at compile time, so an
/// unresolvable task fails the whole change set before any SQL runs.
pub struct RunTaskHandler {
    tasks: Arc<TaskRegistry>,
}

impl RunTaskHandler {
    pub fn new(tasks: Arc<TaskRegistry>) -> Self {
        Self { tasks }
    }
}

impl ActionHandler for RunTaskHandler {
    fn action_type(&self) -> ActionType {
        ActionType::RunTask
    }

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let Action::RunTask { task } = action else {
            return Err(EngineError::UnknownAction(action.action_type().to_string()));
        };
        Ok(vec![Step::task(self.tasks.resolve(task)?)])
    }
}
