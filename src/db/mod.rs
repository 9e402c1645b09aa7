pub mod connection;
pub mod mysql;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::value::SqlValue;

pub use connection::{connect_to_database, mask_url_password};
pub use mysql::MySqlDatabase;

/// Errors surfaced by a [`Database`] implementation.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("statement failed: {message}\n  sql: {sql}")]
    Statement { sql: String, message: String },

    #[error("failed to connect to database: {0}")]
    Connection(String),

    #[error("result row has no column `{0}`")]
    MissingColumn(String),

    #[error("column `{column}` holds `{found}`, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("commit or rollback without a matching begin")]
    NoOpenTransaction,
}

/// One decoded result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from (column, value) pairs. Mostly used by tests and
    /// fakes; driver implementations insert while decoding.
    pub fn of<const N: usize>(cells: [(&str, SqlValue); N]) -> Self {
        let mut row = Row::new();
        for (column, value) in cells {
            row.insert(column, value);
        }
        row
    }

    pub fn insert(&mut self, column: &str, value: SqlValue) {
        self.cells.insert(column.to_string(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells.get(column)
    }

    /// The single cell of a one-column row (`SHOW TABLES` style results).
    pub fn single(&self) -> Option<&SqlValue> {
        if self.cells.len() == 1 {
            self.cells.values().next()
        } else {
            None
        }
    }

    pub fn get_str(&self, column: &str) -> Result<&str, DbError> {
        let value = self
            .get(column)
            .ok_or_else(|| DbError::MissingColumn(column.to_string()))?;
        value.as_str().ok_or_else(|| DbError::ColumnType {
            column: column.to_string(),
            expected: "a string",
            found: format!("{:?}", value),
        })
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, DbError> {
        let value = self
            .get(column)
            .ok_or_else(|| DbError::MissingColumn(column.to_string()))?;
        value.as_i64().ok_or_else(|| DbError::ColumnType {
            column: column.to_string(),
            expected: "an integer",
            found: format!("{:?}", value),
        })
    }
}

/// The database collaborator the migration engine runs against.
///
/// `begin`/`commit` are depth-counted: only the outermost pair reaches the
/// server, so a caller that is already inside a transaction can safely invoke
/// engine operations that open their own.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError>;

    /// Run a query and decode every result row.
    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError>;

    /// Run an INSERT, returning the generated id.
    async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError>;

    async fn table_exists(&self, table: &str) -> Result<bool, DbError>;

    async fn begin(&self) -> Result<(), DbError>;

    async fn commit(&self) -> Result<(), DbError>;

    async fn rollback(&self) -> Result<(), DbError>;

    fn transaction_depth(&self) -> u32;

    /// First row of a query, if any.
    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<Row>, DbError> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }
}
