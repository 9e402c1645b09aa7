use std::path::PathBuf;
use std::sync::Arc;

use super::{DatabaseManager, MigrationManager, MigrationType};
use crate::action::{ActionList, ChangeSet, MigrationFile};
use crate::constants::{
    FRAMEWORK_EPOCH, LEGACY_TRACKING_TABLE, MIGRATION_FILE_EXTENSION,
    OLDER_LEGACY_TRACKING_TABLE,
};
use crate::db::Database;
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::migration::legacy_migration_name;
use crate::progress::ProgressSink;

/// Outcome of a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted { versions: u32 },
    AlreadyConverted,
    NothingToDo,
}

/// One-shot bridge from the legacy numeric scheme to the migration ledger.
///
/// Both entry points are idempotent by detection: re-running after a
/// successful conversion is a no-op, never a duplicate registration.
pub struct ConversionManager<D: Database> {
    db: Arc<D>,
    migration_manager: MigrationManager<D>,
    scheme_dir: PathBuf,
    progress: Arc<dyn ProgressSink>,
}

impl<D: Database> ConversionManager<D> {
    pub fn new(
        migration_manager: MigrationManager<D>,
        scheme_dir: PathBuf,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            db: migration_manager.database_manager().database().clone(),
            migration_manager,
            scheme_dir,
            progress,
        }
    }

    fn database_manager(&self) -> &DatabaseManager<D> {
        self.migration_manager.database_manager()
    }

    /// Convert a development host: translate every legacy scheme file into a
    /// migration file on disk and register the lot as already executed.
    ///
    /// Missing scheme files become placeholder migrations (empty actions)
    /// with a warning, preserving the numeric sequence for future diffing.
    pub async fn convert_from_db_scheme(
        &self,
        dry_run: bool,
    ) -> Result<ConversionOutcome, EngineError> {
        // A converted file on disk means a previous run completed; leave the
        // ledger untouched.
        let migrations_dir = self.migration_manager.dirs().app.clone();
        let first_converted =
            migrations_dir.join(format!("{}.{}", legacy_migration_name(1), MIGRATION_FILE_EXTENSION));
        if first_converted.exists() {
            self.progress
                .line("Legacy scheme already converted; nothing to do");
            return Ok(ConversionOutcome::AlreadyConverted);
        }

        let version = match self.detect_version().await? {
            Some(version) => version,
            None => return self.no_marker_outcome().await,
        };
        if version == 0 {
            self.progress.line("Legacy schema is at version 0; nothing to convert");
            return Ok(ConversionOutcome::NothingToDo);
        }

        if !dry_run {
            self.migration_manager.ensure_ledger().await?;
            std::fs::create_dir_all(&migrations_dir).map_err(|e| EngineError::MigrationFile {
                path: migrations_dir.display().to_string(),
                message: e.to_string(),
            })?;
        }
        let batch = if dry_run {
            1
        } else {
            self.migration_manager.next_batch().await?
        };

        for v in 1..=version {
            let name = legacy_migration_name(v);
            let scheme_path = self.scheme_dir.join(format!("{:04}.yaml", v));
            let actions = if scheme_path.exists() {
                ChangeSet::load(&scheme_path)?.actions
            } else {
                self.progress.warn(&format!(
                    "Scheme file for version {} not found at {}; writing placeholder",
                    v,
                    scheme_path.display()
                ));
                Vec::new()
            };

            let file = MigrationFile {
                up: Some(ActionList { actions }),
                // Legacy scheme never supported rollback.
                down: Some(ActionList::default()),
                actions: None,
            };

            if dry_run {
                self.progress
                    .line(&format!("Would convert version {} as {}", v, name));
                continue;
            }

            let destination =
                migrations_dir.join(format!("{}.{}", name, MIGRATION_FILE_EXTENSION));
            let rendered =
                serde_yaml::to_string(&file).map_err(|e| EngineError::MigrationFile {
                    path: destination.display().to_string(),
                    message: e.to_string(),
                })?;
            std::fs::write(&destination, rendered).map_err(|e| EngineError::MigrationFile {
                path: destination.display().to_string(),
                message: e.to_string(),
            })?;

            if !self
                .migration_manager
                .is_recorded(&name, MigrationType::App)
                .await?
            {
                self.migration_manager
                    .record_migration(&name, MigrationType::App, batch)
                    .await?;
            }
            self.progress
                .line(&format!("Converted version {} as {}", v, name));
        }

        self.register_framework_history(batch, dry_run).await?;

        if !dry_run {
            self.progress
                .success(&format!("Converted {} legacy scheme versions", version));
        }
        Ok(ConversionOutcome::Converted { versions: version })
    }

    /// Convert a production host: detect the legacy version marker and
    /// register the corresponding history in the ledger without requiring
    /// any scheme files on disk. Strictly "mark as already applied" -- no
    /// action from the legacy sequence is ever executed here.
    pub async fn convert_production(
        &self,
        dry_run: bool,
    ) -> Result<ConversionOutcome, EngineError> {
        if self.ledger_has_rows().await? {
            self.progress
                .line("Migration ledger already populated; nothing to convert");
            return Ok(ConversionOutcome::AlreadyConverted);
        }

        let version = match self.detect_version().await? {
            Some(0) => {
                self.progress
                    .line("Legacy schema is at version 0; nothing to convert");
                return Ok(ConversionOutcome::NothingToDo);
            }
            Some(version) => version,
            None => return self.no_marker_outcome().await,
        };

        if dry_run {
            self.progress.line(&format!(
                "Would register legacy versions 1..{} as already executed",
                version
            ));
            return Ok(ConversionOutcome::Converted { versions: version });
        }

        self.migration_manager.ensure_ledger().await?;
        let batch = self.migration_manager.next_batch().await?;
        for v in 1..=version {
            self.migration_manager
                .record_migration(&legacy_migration_name(v), MigrationType::App, batch)
                .await?;
        }
        self.register_framework_history(batch, false).await?;

        self.progress.success(&format!(
            "Registered {} legacy versions as already executed",
            version
        ));
        Ok(ConversionOutcome::Converted { versions: version })
    }

    /// Probe the known tracking tables in priority order for a stored
    /// version.
    async fn detect_version(&self) -> Result<Option<u32>, EngineError> {
        if self.database_manager().is_initialized().await? {
            return Ok(Some(self.database_manager().current_version().await?));
        }
        if self.db.table_exists(OLDER_LEGACY_TRACKING_TABLE).await? {
            let row = self
                .db
                .fetch_optional(
                    &format!(
                        "SELECT `version` FROM {} LIMIT 1",
                        quote_ident(OLDER_LEGACY_TRACKING_TABLE)?
                    ),
                    &[],
                )
                .await?;
            if let Some(row) = row {
                return Ok(Some(row.get_i64("version")? as u32));
            }
        }
        Ok(None)
    }

    /// No version marker anywhere: fatal only if migrations are genuinely
    /// pending, otherwise there is simply nothing to convert.
    async fn no_marker_outcome(&self) -> Result<ConversionOutcome, EngineError> {
        let pending = self
            .migration_manager
            .pending_migrations(MigrationType::App)
            .await?;
        if pending.is_empty() {
            self.progress
                .line("No legacy version marker and no pending migrations; nothing to do");
            Ok(ConversionOutcome::NothingToDo)
        } else {
            Err(EngineError::Detection(format!(
                "no version marker found in `{}` or `{}`, but {} migrations are pending",
                LEGACY_TRACKING_TABLE,
                OLDER_LEGACY_TRACKING_TABLE,
                pending.len()
            )))
        }
    }

    async fn ledger_has_rows(&self) -> Result<bool, EngineError> {
        if !self
            .db
            .table_exists(crate::constants::LEDGER_TABLE)
            .await?
        {
            return Ok(false);
        }
        let executed_app = self
            .migration_manager
            .executed_migrations(MigrationType::App)
            .await?;
        if !executed_app.is_empty() {
            return Ok(true);
        }
        let executed_framework = self
            .migration_manager
            .executed_migrations(MigrationType::Framework)
            .await?;
        Ok(!executed_framework.is_empty())
    }

    /// Framework migrations dated at or before the epoch marker shipped with
    /// the legacy scheme; register them as already applied.
    async fn register_framework_history(
        &self,
        batch: i64,
        dry_run: bool,
    ) -> Result<(), EngineError> {
        let framework = self.migration_manager.discover(MigrationType::Framework)?;
        for migration in framework
            .iter()
            .filter(|m| m.timestamp.as_str() <= FRAMEWORK_EPOCH)
        {
            if dry_run {
                self.progress.line(&format!(
                    "Would register framework migration {} as already executed",
                    migration.name
                ));
                continue;
            }
            if !self
                .migration_manager
                .is_recorded(&migration.name, MigrationType::Framework)
                .await?
            {
                self.migration_manager
                    .record_migration(&migration.name, MigrationType::Framework, batch)
                    .await?;
                self.progress.line(&format!(
                    "Registered framework migration {} as already executed",
                    migration.name
                ));
            }
        }
        Ok(())
    }
}
