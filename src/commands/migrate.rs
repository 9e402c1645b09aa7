use anyhow::Result;

use super::{build_migration_manager, MigrationTypeArg};
use crate::config::Config;

/// Apply every pending migration for the selected types, framework first.
pub async fn cmd_migrate(
    config: &Config,
    type_arg: MigrationTypeArg,
    dry_run: bool,
) -> Result<()> {
    let manager = build_migration_manager(config).await?;

    let mut total = 0;
    for migration_type in type_arg.selected() {
        total += manager
            .run_pending_migrations(migration_type, dry_run)
            .await?;
    }

    if dry_run {
        println!("Dry run complete; {} migrations would be applied", total);
    } else if total > 0 {
        println!("Applied {} migrations", total);
    }
    Ok(())
}
