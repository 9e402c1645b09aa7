use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::manager::MigrationType;
use crate::migration::generate_migration_filename;

const TEMPLATE: &str = "\
up:
  actions: []
    # - type: create_table
    #   table_name: widgets
    #   fields:
    #     - name: name
    #       type: varchar
    #       size: 50
    #   constraints: []

down:
  actions: []
";

/// Write a timestamped migration template and print its path.
pub fn cmd_make(
    config: &Config,
    description: &str,
    migration_type: MigrationType,
) -> Result<PathBuf> {
    let dir = match migration_type {
        MigrationType::App => &config.directories.migrations,
        MigrationType::Framework => &config.directories.framework_migrations,
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create migrations directory {}", dir.display()))?;

    let path = dir.join(generate_migration_filename(description));
    if path.exists() {
        anyhow::bail!("Migration file {} already exists", path.display());
    }
    std::fs::write(&path, TEMPLATE)
        .with_context(|| format!("Failed to write migration file {}", path.display()))?;

    println!("Created migration {}", path.display());
    Ok(path)
}
