use anyhow::Result;
use dialoguer::Confirm;
use std::io::IsTerminal;
use std::sync::Arc;

use super::build_migration_manager;
use crate::config::Config;
use crate::manager::ConversionManager;
use crate::progress::ConsoleSink;

/// Convert a development host from the legacy numeric scheme to the
/// migration ledger, writing converted migration files to disk.
pub async fn cmd_convert(config: &Config, dry_run: bool, yes: bool) -> Result<()> {
    if !dry_run && !yes && std::io::stdin().is_terminal() {
        let confirmed = Confirm::new()
            .with_prompt(
                "Convert this project from the legacy db scheme to the migration ledger?",
            )
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Conversion cancelled");
            return Ok(());
        }
    }

    let manager = conversion_manager(config).await?;
    manager.convert_from_db_scheme(dry_run).await?;
    Ok(())
}

/// Convert a production host: register detected legacy history in the
/// ledger without requiring scheme files on disk.
pub async fn cmd_convert_production(config: &Config, dry_run: bool) -> Result<()> {
    let manager = conversion_manager(config).await?;
    manager.convert_production(dry_run).await?;
    Ok(())
}

async fn conversion_manager(
    config: &Config,
) -> Result<ConversionManager<crate::db::MySqlDatabase>> {
    let migration_manager = build_migration_manager(config).await?;
    Ok(ConversionManager::new(
        migration_manager,
        config.directories.legacy_scheme.clone(),
        Arc::new(ConsoleSink),
    ))
}
