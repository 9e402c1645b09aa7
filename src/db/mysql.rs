use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row as _};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

use super::{Database, DbError, Row};
use crate::value::SqlValue;

/// `Database` implementation over a single sqlx MySQL connection.
///
/// A dedicated connection (not a pool) keeps `START TRANSACTION`/`COMMIT`
/// and every statement in between on the same server session. Transaction
/// depth is counted locally; only the outermost begin/commit pair is sent to
/// the server.
pub struct MySqlDatabase {
    conn: Mutex<MySqlConnection>,
    depth: AtomicU32,
}

impl MySqlDatabase {
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let conn = MySqlConnection::connect(url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            depth: AtomicU32::new(0),
        })
    }

    fn statement_error(sql: &str, error: sqlx::Error) -> DbError {
        DbError::Statement {
            sql: sql.to_string(),
            message: error.to_string(),
        }
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(i64::from(*b)),
            SqlValue::Int(n) => query.bind(*n),
            SqlValue::Float(x) => query.bind(*x),
            SqlValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn decode_row(row: &MySqlRow) -> Result<Row, DbError> {
    let mut decoded = Row::new();
    for column in row.columns() {
        decoded.insert(column.name(), decode_cell(row, column.ordinal(), column.name())?);
    }
    Ok(decoded)
}

fn decode_cell(row: &MySqlRow, ordinal: usize, name: &str) -> Result<SqlValue, DbError> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(ordinal) {
        return Ok(value.map(SqlValue::Int).unwrap_or(SqlValue::Null));
    }
    if let Ok(value) = row.try_get::<Option<u64>, _>(ordinal) {
        return Ok(value
            .map(|v| SqlValue::Int(v as i64))
            .unwrap_or(SqlValue::Null));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(ordinal) {
        return Ok(value.map(SqlValue::Float).unwrap_or(SqlValue::Null));
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(ordinal) {
        return Ok(value.map(SqlValue::Text).unwrap_or(SqlValue::Null));
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDateTime>, _>(ordinal) {
        return Ok(value
            .map(|v| SqlValue::Text(v.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(SqlValue::Null));
    }
    Err(DbError::ColumnType {
        column: name.to_string(),
        expected: "an integer, float, string or datetime",
        found: "an undecodable MySQL type".to_string(),
    })
}

#[async_trait]
impl Database for MySqlDatabase {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        let mut conn = self.conn.lock().await;
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| Self::statement_error(sql, e))?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        let mut conn = self.conn.lock().await;
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| Self::statement_error(sql, e))?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        let mut conn = self.conn.lock().await;
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| Self::statement_error(sql, e))?;
        Ok(result.last_insert_id())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let sql = "SELECT 1 FROM information_schema.tables \
                   WHERE table_schema = DATABASE() AND table_name = ?";
        let rows = self
            .fetch_all(sql, &[SqlValue::Text(table.to_string())])
            .await?;
        Ok(!rows.is_empty())
    }

    async fn begin(&self) -> Result<(), DbError> {
        let previous = self.depth.fetch_add(1, Ordering::SeqCst);
        if previous == 0 {
            self.execute("START TRANSACTION", &[]).await?;
        }
        Ok(())
    }

    async fn commit(&self) -> Result<(), DbError> {
        let previous = self.depth.load(Ordering::SeqCst);
        if previous == 0 {
            return Err(DbError::NoOpenTransaction);
        }
        self.depth.store(previous - 1, Ordering::SeqCst);
        if previous == 1 {
            self.execute("COMMIT", &[]).await?;
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DbError> {
        let previous = self.depth.load(Ordering::SeqCst);
        if previous == 0 {
            return Err(DbError::NoOpenTransaction);
        }
        self.depth.store(0, Ordering::SeqCst);
        self.execute("ROLLBACK", &[]).await?;
        Ok(())
    }

    fn transaction_depth(&self) -> u32 {
        self.depth.load(Ordering::SeqCst)
    }
}
