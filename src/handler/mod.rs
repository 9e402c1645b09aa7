pub mod clauses;
pub mod column;
pub mod constraint;
pub mod foreign_key;
pub mod raw;
pub mod row;
pub mod table;
pub mod task;
pub mod trigger;

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{Action, ActionType};
use crate::error::EngineError;
use crate::step::Step;
use crate::task::TaskRegistry;

/// Compiles one action type into executable steps.
///
/// `build_steps` validates every required field and fails with an error
/// naming the field before any SQL text is produced; a handler never emits a
/// statement referencing an unset value.
pub trait ActionHandler: Send + Sync {
    fn action_type(&self) -> ActionType;

    fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError>;
}

/// Strategy map from action type to handler, resolved once at startup.
pub struct HandlerRegistry {
    handlers: HashMap<ActionType, Box<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with every built-in handler. `run_task` actions resolve
    /// through the given task registry.
    pub fn with_defaults(tasks: Arc<TaskRegistry>) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(table::CreateTableHandler));
        registry.register(Box::new(table::RenameTableHandler));
        registry.register(Box::new(column::AddColumnHandler));
        registry.register(Box::new(column::ModifyColumnTypeHandler));
        registry.register(Box::new(column::RenameColumnHandler));
        registry.register(Box::new(constraint::AddConstraintHandler));
        registry.register(Box::new(foreign_key::AddForeignKeyHandler));
        registry.register(Box::new(foreign_key::DropForeignKeyHandler));
        registry.register(Box::new(foreign_key::ModifyForeignKeyHandler));
        registry.register(Box::new(row::InsertRowHandler));
        registry.register(Box::new(raw::RawQueryHandler));
        registry.register(Box::new(trigger::CreateTriggerHandler));
        registry.register(Box::new(task::RunTaskHandler::new(tasks)));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(handler.action_type(), handler);
    }

    /// Dispatch a single action to its handler.
    pub fn build_steps(&self, action: &Action) -> Result<Vec<Step>, EngineError> {
        let handler = self
            .handlers
            .get(&action.action_type())
            .ok_or_else(|| EngineError::UnknownAction(action.action_type().to_string()))?;
        handler.build_steps(action)
    }

    /// Compile an ordered action list, failing fast on the first invalid
    /// action so no SQL runs for a change set that cannot fully compile.
    pub fn compile(&self, actions: &[Action]) -> Result<Vec<Step>, EngineError> {
        let mut steps = Vec::with_capacity(actions.len());
        for action in actions {
            steps.extend(self.build_steps(action)?);
        }
        Ok(steps)
    }
}
