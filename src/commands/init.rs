use anyhow::Result;

use super::build_migration_manager;
use crate::config::Config;

/// Prepare a database for the engine: create the migration ledger, and make
/// sure the legacy tracking state exists for projects still on the numeric
/// scheme.
pub async fn cmd_init(config: &Config) -> Result<()> {
    let manager = build_migration_manager(config).await?;

    manager.ensure_ledger().await?;
    println!("Migration ledger ready");

    manager.database_manager().initialize().await?;
    println!(
        "Database initialized (legacy schema version {})",
        manager.database_manager().current_version().await?
    );
    Ok(())
}
