use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::DatabaseManager;
use crate::action::{Direction, MigrationFile};
use crate::constants::LEDGER_TABLE;
use crate::db::Database;
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::migration::{discover_migrations, ParsedMigration};
use crate::progress::ProgressSink;
use crate::value::SqlValue;

/// Which ledger namespace a migration belongs to. Framework and application
/// migrations live in separate directories and are tracked independently in
/// the shared ledger table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationType {
    App,
    Framework,
}

impl MigrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationType::App => "app",
            MigrationType::Framework => "framework",
        }
    }
}

impl fmt::Display for MigrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk locations of the two migration sets.
#[derive(Debug, Clone)]
pub struct MigrationDirs {
    pub app: PathBuf,
    pub framework: PathBuf,
}

impl MigrationDirs {
    pub fn for_type(&self, migration_type: MigrationType) -> &Path {
        match migration_type {
            MigrationType::App => &self.app,
            MigrationType::Framework => &self.framework,
        }
    }
}

/// Owner of the timestamp-named migration format and its persisted ledger.
pub struct MigrationManager<D: Database> {
    db: Arc<D>,
    database_manager: DatabaseManager<D>,
    dirs: MigrationDirs,
    progress: Arc<dyn ProgressSink>,
}

impl<D: Database> MigrationManager<D> {
    pub fn new(
        database_manager: DatabaseManager<D>,
        dirs: MigrationDirs,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            db: database_manager.database().clone(),
            database_manager,
            dirs,
            progress,
        }
    }

    pub fn dirs(&self) -> &MigrationDirs {
        &self.dirs
    }

    pub fn database_manager(&self) -> &DatabaseManager<D> {
        &self.database_manager
    }

    /// Create the ledger table if it does not exist yet. Idempotent; called
    /// before every operation that touches the ledger.
    pub async fn ensure_ledger(&self) -> Result<(), EngineError> {
        if self.db.table_exists(LEDGER_TABLE).await? {
            return Ok(());
        }
        self.db
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (\
                     `id` INT NOT NULL AUTO_INCREMENT, \
                     `migration` VARCHAR(255) NOT NULL, \
                     `type` VARCHAR(20) NOT NULL DEFAULT 'app', \
                     `batch` INT NOT NULL, \
                     `executed_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
                     PRIMARY KEY (`id`), \
                     UNIQUE KEY `unique_migrations_migration_type` (`migration`, `type`)\
                     ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
                    quote_ident(LEDGER_TABLE)?
                ),
                &[],
            )
            .await?;
        Ok(())
    }

    /// Migration files on disk for one type, in chronological order.
    pub fn discover(&self, migration_type: MigrationType) -> Result<Vec<ParsedMigration>, EngineError> {
        discover_migrations(self.dirs.for_type(migration_type)).map_err(|e| {
            EngineError::MigrationFile {
                path: self.dirs.for_type(migration_type).display().to_string(),
                message: format!("{:#}", e),
            }
        })
    }

    /// Names recorded as executed for one type, in apply order.
    pub async fn executed_migrations(
        &self,
        migration_type: MigrationType,
    ) -> Result<Vec<String>, EngineError> {
        self.ensure_ledger().await?;
        let rows = self
            .db
            .fetch_all(
                &format!(
                    "SELECT `migration` FROM {} WHERE `type` = ? ORDER BY `id`",
                    quote_ident(LEDGER_TABLE)?
                ),
                &[SqlValue::Text(migration_type.as_str().to_string())],
            )
            .await?;
        rows.iter()
            .map(|row| Ok(row.get_str("migration")?.to_string()))
            .collect()
    }

    /// Discovered-but-unrecorded migrations, preserving discovery order.
    pub async fn pending_migrations(
        &self,
        migration_type: MigrationType,
    ) -> Result<Vec<ParsedMigration>, EngineError> {
        let executed = self.executed_migrations(migration_type).await?;
        Ok(self
            .discover(migration_type)?
            .into_iter()
            .filter(|m| !executed.contains(&m.name))
            .collect())
    }

    pub async fn is_recorded(
        &self,
        name: &str,
        migration_type: MigrationType,
    ) -> Result<bool, EngineError> {
        let row = self
            .db
            .fetch_optional(
                &format!(
                    "SELECT `id` FROM {} WHERE `migration` = ? AND `type` = ?",
                    quote_ident(LEDGER_TABLE)?
                ),
                &[
                    SqlValue::Text(name.to_string()),
                    SqlValue::Text(migration_type.as_str().to_string()),
                ],
            )
            .await?;
        Ok(row.is_some())
    }

    /// Record one migration as executed. The unique key on
    /// (`migration`, `type`) turns a duplicate apply into a hard error
    /// instead of a silent second row.
    pub async fn record_migration(
        &self,
        name: &str,
        migration_type: MigrationType,
        batch: i64,
    ) -> Result<(), EngineError> {
        self.db
            .insert(
                &format!(
                    "INSERT INTO {} (`migration`, `type`, `batch`) VALUES (?, ?, ?)",
                    quote_ident(LEDGER_TABLE)?
                ),
                &[
                    SqlValue::Text(name.to_string()),
                    SqlValue::Text(migration_type.as_str().to_string()),
                    SqlValue::Int(batch),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn remove_migration_record(
        &self,
        name: &str,
        migration_type: MigrationType,
    ) -> Result<(), EngineError> {
        self.db
            .execute(
                &format!(
                    "DELETE FROM {} WHERE `migration` = ? AND `type` = ?",
                    quote_ident(LEDGER_TABLE)?
                ),
                &[
                    SqlValue::Text(name.to_string()),
                    SqlValue::Text(migration_type.as_str().to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    /// One more than the highest batch in the ledger, across both types, so
    /// everything applied by one run is grouped as a single operator-visible
    /// unit.
    pub async fn next_batch(&self) -> Result<i64, EngineError> {
        self.ensure_ledger().await?;
        let row = self
            .db
            .fetch_optional(
                &format!(
                    "SELECT MAX(`batch`) AS `max_batch` FROM {}",
                    quote_ident(LEDGER_TABLE)?
                ),
                &[],
            )
            .await?;
        let max = match row {
            Some(row) => row.get("max_batch").and_then(SqlValue::as_i64).unwrap_or(0),
            None => 0,
        };
        Ok(max + 1)
    }

    /// Apply one migration file in the given direction.
    ///
    /// The action list and ledger write share one transaction: the row is
    /// recorded (or removed, for `down`) only if every step succeeded, and a
    /// failure leaves neither applied.
    pub async fn run_migration(
        &self,
        migration: &ParsedMigration,
        batch: i64,
        migration_type: MigrationType,
        direction: Direction,
        dry_run: bool,
    ) -> Result<(), EngineError> {
        let file = MigrationFile::load(&migration.path)?;
        let actions = file
            .actions_for(direction)
            .ok_or_else(|| EngineError::MissingDown(migration.name.clone()))?;

        if dry_run {
            let steps = self.database_manager.handlers().compile(actions)?;
            self.progress.line(&format!(
                "Would run {} ({}): {} steps",
                migration.name,
                direction,
                steps.len()
            ));
            for step in &steps {
                self.progress.line(&format!("  {}", step.describe()));
            }
            return Ok(());
        }

        self.db.begin().await?;
        let result: Result<(), EngineError> = async {
            self.database_manager.apply_actions(actions).await?;
            match direction {
                Direction::Up => {
                    self.record_migration(&migration.name, migration_type, batch)
                        .await
                }
                Direction::Down => {
                    self.remove_migration_record(&migration.name, migration_type)
                        .await
                }
            }
        }
        .await;

        match result {
            Ok(()) => {
                self.db.commit().await?;
                Ok(())
            }
            Err(error) => {
                if self.db.transaction_depth() > 0 {
                    self.db.rollback().await?;
                }
                Err(error)
            }
        }
    }

    /// Apply every pending migration of one type under a single new batch
    /// number. Returns how many migrations ran.
    pub async fn run_pending_migrations(
        &self,
        migration_type: MigrationType,
        dry_run: bool,
    ) -> Result<usize, EngineError> {
        self.ensure_ledger().await?;
        let pending = self.pending_migrations(migration_type).await?;
        if pending.is_empty() {
            self.progress
                .line(&format!("Nothing to migrate for type `{}`", migration_type));
            return Ok(0);
        }

        let batch = self.next_batch().await?;
        for migration in &pending {
            self.progress
                .line(&format!("Migrating ({}): {}", migration_type, migration.name));
            self.run_migration(migration, batch, migration_type, Direction::Up, dry_run)
                .await?;
            if !dry_run {
                self.progress
                    .success(&format!("Migrated: {}", migration.name));
            }
        }
        Ok(pending.len())
    }

    /// Roll back every migration recorded under the most recent batch of one
    /// type, in reverse apply order. Returns how many migrations rolled back.
    pub async fn rollback_last_batch(
        &self,
        migration_type: MigrationType,
        dry_run: bool,
    ) -> Result<usize, EngineError> {
        self.ensure_ledger().await?;
        let rows = self
            .db
            .fetch_all(
                &format!(
                    "SELECT `migration` FROM {table} WHERE `type` = ? AND `batch` = \
                     (SELECT MAX(`batch`) FROM {table} WHERE `type` = ?) \
                     ORDER BY `id` DESC",
                    table = quote_ident(LEDGER_TABLE)?
                ),
                &[
                    SqlValue::Text(migration_type.as_str().to_string()),
                    SqlValue::Text(migration_type.as_str().to_string()),
                ],
            )
            .await?;
        if rows.is_empty() {
            self.progress
                .line(&format!("Nothing to roll back for type `{}`", migration_type));
            return Ok(0);
        }

        let discovered = self.discover(migration_type)?;
        let mut rolled_back = 0;
        for row in &rows {
            let name = row.get_str("migration")?;
            let migration = discovered
                .iter()
                .find(|m| m.name == name)
                .ok_or_else(|| EngineError::MigrationFile {
                    path: self.dirs.for_type(migration_type).display().to_string(),
                    message: format!("recorded migration `{}` has no file on disk", name),
                })?;
            self.progress
                .line(&format!("Rolling back ({}): {}", migration_type, name));
            self.run_migration(migration, 0, migration_type, Direction::Down, dry_run)
                .await?;
            rolled_back += 1;
        }
        Ok(rolled_back)
    }
}
