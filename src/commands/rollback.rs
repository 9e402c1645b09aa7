use anyhow::Result;

use super::{build_migration_manager, MigrationTypeArg};
use crate::config::Config;

/// Roll back the most recent batch for the selected types. Application
/// migrations are rolled back before framework ones, mirroring apply order.
pub async fn cmd_rollback(
    config: &Config,
    type_arg: MigrationTypeArg,
    dry_run: bool,
) -> Result<()> {
    let manager = build_migration_manager(config).await?;

    let mut selected = type_arg.selected();
    selected.reverse();

    let mut total = 0;
    for migration_type in selected {
        total += manager.rollback_last_batch(migration_type, dry_run).await?;
    }

    if dry_run {
        println!("Dry run complete; {} migrations would be rolled back", total);
    } else if total > 0 {
        println!("Rolled back {} migrations", total);
    }
    Ok(())
}
