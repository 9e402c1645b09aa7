use anyhow::Result;

use super::build_migration_manager;
use crate::config::Config;

/// Compare the stored legacy schema hash against the live schema. A
/// mismatch means the schema changed outside the engine; surface it as a
/// failure so CI can alert on drift.
pub async fn cmd_verify(config: &Config) -> Result<()> {
    let manager = build_migration_manager(config).await?;
    let database_manager = manager.database_manager();

    if !database_manager.is_initialized().await? {
        println!("Legacy schema tracking is not initialized; nothing to verify");
        return Ok(());
    }

    if database_manager.verify_hash().await? {
        println!("Schema hash matches the stored value");
        Ok(())
    } else {
        anyhow::bail!(
            "Schema hash mismatch: the live schema differs from the last recorded state"
        );
    }
}
