mod convert;
mod init;
mod make;
mod migrate;
mod rollback;
mod status;
mod verify;

pub use convert::{cmd_convert, cmd_convert_production};
pub use init::cmd_init;
pub use make::cmd_make;
pub use migrate::cmd_migrate;
pub use rollback::cmd_rollback;
pub use status::{cmd_status, StatusFormat};
pub use verify::cmd_verify;

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{connect_to_database, MySqlDatabase};
use crate::handler::HandlerRegistry;
use crate::manager::{DatabaseManager, MigrationDirs, MigrationManager, MigrationType};
use crate::progress::{ConsoleSink, ProgressSink};
use crate::task::TaskRegistry;

/// Which migration types a command should touch.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MigrationTypeArg {
    #[default]
    All,
    App,
    Framework,
}

impl MigrationTypeArg {
    /// Selected types in apply order: framework migrations run before
    /// application ones.
    pub fn selected(&self) -> Vec<MigrationType> {
        match self {
            MigrationTypeArg::All => vec![MigrationType::Framework, MigrationType::App],
            MigrationTypeArg::App => vec![MigrationType::App],
            MigrationTypeArg::Framework => vec![MigrationType::Framework],
        }
    }
}

/// Connect and assemble the manager stack the commands run on.
///
/// The CLI binary carries no application tasks, so `run_task` actions only
/// resolve when the engine is embedded as a library with a populated
/// registry.
pub(crate) async fn build_migration_manager(
    config: &Config,
) -> Result<MigrationManager<MySqlDatabase>> {
    let db = Arc::new(connect_to_database(&config.database_url, "application database").await?);
    let handlers = Arc::new(HandlerRegistry::with_defaults(Arc::new(TaskRegistry::new())));
    let progress: Arc<dyn ProgressSink> = Arc::new(ConsoleSink);

    let database_manager = DatabaseManager::new(db, handlers, progress.clone());
    let dirs = MigrationDirs {
        app: config.directories.migrations.clone(),
        framework: config.directories.framework_migrations.clone(),
    };
    Ok(MigrationManager::new(database_manager, dirs, progress))
}
