use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EngineError;

/// An injectable unit of work referenced by `run_task` actions.
///
/// Tasks run inside the change-set transaction, between SQL steps, in the
/// order the actions declare.
#[async_trait]
pub trait MigrationTask: Send + Sync {
    /// Identifier the action language resolves this task by.
    fn name(&self) -> &str;

    async fn execute(&self) -> anyhow::Result<()>;
}

impl std::fmt::Debug for dyn MigrationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationTask")
            .field("name", &self.name())
            .finish()
    }
}

/// Name-keyed task registry, populated by the embedding application at
/// startup. Replaces the service-locator lookup of older systems with an
/// explicit dependency.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn MigrationTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Arc<dyn MigrationTask>) {
        self.tasks.insert(task.name().to_string(), task);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn MigrationTask>, EngineError> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::TaskResolution(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
