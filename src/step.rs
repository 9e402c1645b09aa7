use std::fmt;
use std::sync::Arc;

use crate::task::MigrationTask;
use crate::value::SqlValue;

/// The compiled, executable unit produced from an action: either a
/// parameterized statement or a resolved task.
#[derive(Clone)]
pub enum Step {
    Query { sql: String, params: Vec<SqlValue> },
    Task { task: Arc<dyn MigrationTask> },
}

impl Step {
    pub fn query(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Step::Query {
            sql: sql.into(),
            params,
        }
    }

    pub fn task(task: Arc<dyn MigrationTask>) -> Self {
        Step::Task { task }
    }

    /// One-line description for progress output and dry runs.
    pub fn describe(&self) -> String {
        match self {
            Step::Query { sql, params } => {
                if params.is_empty() {
                    sql.clone()
                } else {
                    format!("{} [{} params]", sql, params.len())
                }
            }
            Step::Task { task } => format!("task {}", task.name()),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Query { sql, params } => f
                .debug_struct("Query")
                .field("sql", sql)
                .field("params", params)
                .finish(),
            Step::Task { task } => f.debug_struct("Task").field("name", &task.name()).finish(),
        }
    }
}
