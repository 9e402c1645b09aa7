use std::sync::Arc;

use crate::action::{Action, ChangeSet};
use crate::constants::LEGACY_TRACKING_TABLE;
use crate::db::Database;
use crate::error::EngineError;
use crate::handler::HandlerRegistry;
use crate::ident::quote_ident;
use crate::progress::ProgressSink;
use crate::step::Step;
use crate::value::SqlValue;

/// Owner of the legacy numeric-version scheme: executes a change set inside
/// one transaction, gates on the stored version counter, and maintains a
/// digest of the live schema for drift detection.
pub struct DatabaseManager<D: Database> {
    db: Arc<D>,
    handlers: Arc<HandlerRegistry>,
    progress: Arc<dyn ProgressSink>,
}

impl<D: Database> DatabaseManager<D> {
    pub fn new(
        db: Arc<D>,
        handlers: Arc<HandlerRegistry>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            db,
            handlers,
            progress,
        }
    }

    pub fn database(&self) -> &Arc<D> {
        &self.db
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    /// True iff the legacy tracking table exists.
    pub async fn is_initialized(&self) -> Result<bool, EngineError> {
        Ok(self.db.table_exists(LEGACY_TRACKING_TABLE).await?)
    }

    /// Create the tracking table with version 0 if it is absent.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        if self.is_initialized().await? {
            return Ok(());
        }
        self.db
            .execute(
                &format!(
                    "CREATE TABLE {} (`version` INT NOT NULL, \
                     `hash` VARCHAR(40) NOT NULL DEFAULT '') \
                     ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
                    quote_ident(LEGACY_TRACKING_TABLE)?
                ),
                &[],
            )
            .await?;
        self.db
            .insert(
                &format!(
                    "INSERT INTO {} (`version`, `hash`) VALUES (?, ?)",
                    quote_ident(LEGACY_TRACKING_TABLE)?
                ),
                &[SqlValue::Int(0), SqlValue::Text(String::new())],
            )
            .await?;
        self.progress.line("Initialized legacy schema tracking");
        Ok(())
    }

    /// The last successfully applied numeric version, 0 when untracked.
    pub async fn current_version(&self) -> Result<u32, EngineError> {
        let row = self
            .db
            .fetch_optional(
                &format!(
                    "SELECT `version` FROM {} LIMIT 1",
                    quote_ident(LEGACY_TRACKING_TABLE)?
                ),
                &[],
            )
            .await?;
        match row {
            Some(row) => Ok(row.get_i64("version")? as u32),
            None => Ok(0),
        }
    }

    pub async fn stored_hash(&self) -> Result<String, EngineError> {
        let row = self
            .db
            .fetch_optional(
                &format!(
                    "SELECT `hash` FROM {} LIMIT 1",
                    quote_ident(LEGACY_TRACKING_TABLE)?
                ),
                &[],
            )
            .await?;
        match row {
            Some(row) => Ok(row.get_str("hash")?.to_string()),
            None => Ok(String::new()),
        }
    }

    async fn store_version_and_hash(&self, version: u32, hash: &str) -> Result<(), EngineError> {
        self.db
            .execute(
                &format!(
                    "UPDATE {} SET `version` = ?, `hash` = ?",
                    quote_ident(LEGACY_TRACKING_TABLE)?
                ),
                &[
                    SqlValue::Int(i64::from(version)),
                    SqlValue::Text(hash.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Compile and run an ordered action list inside one transaction.
    ///
    /// Compilation happens in full before the transaction opens, so a change
    /// set that cannot compile runs no SQL at all. A failing step rolls the
    /// transaction back and propagates; nothing is partially applied.
    pub async fn apply_actions(&self, actions: &[Action]) -> Result<usize, EngineError> {
        let steps = self.handlers.compile(actions)?;

        self.db.begin().await?;
        for step in &steps {
            if let Err(error) = self.run_step(step).await {
                self.db.rollback().await?;
                return Err(error);
            }
        }
        self.db.commit().await?;
        Ok(steps.len())
    }

    async fn run_step(&self, step: &Step) -> Result<(), EngineError> {
        tracing::debug!("executing step: {}", step.describe());
        match step {
            Step::Query { sql, params } => {
                self.db.execute(sql, params).await?;
            }
            Step::Task { task } => {
                task.execute()
                    .await
                    .map_err(|e| EngineError::TaskFailed {
                        name: task.name().to_string(),
                        message: format!("{:#}", e),
                    })?;
            }
        }
        Ok(())
    }

    /// Apply a legacy change set.
    ///
    /// With `ignore_version` the version gate and the version/hash bookkeeping
    /// are both skipped; this is how the ledger-based path reuses the
    /// transactional executor.
    pub async fn execute(
        &self,
        change_set: &ChangeSet,
        ignore_version: bool,
    ) -> Result<(), EngineError> {
        if ignore_version {
            self.apply_actions(&change_set.actions).await?;
            return Ok(());
        }

        let target = change_set
            .target_version
            .ok_or(EngineError::MissingTargetVersion)?;
        let expected = target.saturating_sub(1);
        let current = self.current_version().await?;
        if current != expected {
            return Err(EngineError::VersionMismatch {
                target,
                current,
                expected,
            });
        }

        // Compile everything up front: a change set that cannot fully
        // compile opens no transaction and runs no SQL.
        let steps = self.handlers.compile(&change_set.actions)?;

        self.db.begin().await?;
        let result: Result<(), EngineError> = async {
            for step in &steps {
                self.run_step(step).await?;
            }
            let hash = self.calculate_hash().await?;
            self.store_version_and_hash(target, &hash).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.db.commit().await?;
                self.progress
                    .success(&format!("Schema advanced to version {}", target));
                Ok(())
            }
            Err(error) => {
                self.db.rollback().await?;
                Err(error)
            }
        }
    }

    /// Digest of the full live schema.
    ///
    /// Tables are enumerated lexicographically and each `SHOW CREATE TABLE`
    /// statement is stripped of its `AUTO_INCREMENT=N` counter, so the hash
    /// is stable across row churn and reproducible across runs.
    pub async fn calculate_hash(&self) -> Result<String, EngineError> {
        let rows = self.db.fetch_all("SHOW TABLES", &[]).await?;
        let mut tables: Vec<String> = rows
            .iter()
            .filter_map(|row| row.single().and_then(|v| v.as_str()).map(String::from))
            .collect();
        tables.sort();

        let mut schema_ddl = String::new();
        for table in tables {
            let row = self
                .db
                .fetch_optional(&format!("SHOW CREATE TABLE {}", quote_ident(&table)?), &[])
                .await?;
            if let Some(row) = row {
                schema_ddl.push_str(&strip_auto_increment(row.get_str("Create Table")?));
                schema_ddl.push('\n');
            }
        }

        Ok(format!("{:x}", md5::compute(schema_ddl)))
    }

    /// Compare the stored digest against the live schema.
    pub async fn verify_hash(&self) -> Result<bool, EngineError> {
        Ok(self.stored_hash().await? == self.calculate_hash().await?)
    }
}

/// Drop `AUTO_INCREMENT=N` table options; the counter moves on every insert
/// and must not affect the digest.
fn strip_auto_increment(ddl: &str) -> String {
    const MARKER: &str = " AUTO_INCREMENT=";
    let mut out = String::with_capacity(ddl.len());
    let mut rest = ddl;
    while let Some(pos) = rest.find(MARKER) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + MARKER.len()..];
        let digits = after.chars().take_while(|c| c.is_ascii_digit()).count();
        rest = &after[digits..];
    }
    out.push_str(rest);
    out
}
