use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::constants::{
    LEGACY_MIGRATION_PREFIX, MIGRATION_FILE_EXTENSION, MIGRATION_TIMESTAMP_FORMAT,
};

/// Represents a discovered migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMigration {
    pub path: PathBuf,
    /// Full file stem; this is the name recorded in the ledger.
    pub name: String,
    /// The `YYYY_MM_DD_HHMMSS` prefix.
    pub timestamp: String,
    pub description: String,
}

/// Parse a migration filename like "2024_06_01_123000_add_widgets.yaml".
///
/// The timestamp prefix is lexicographically ordered, so sorting filenames
/// sorts migrations chronologically.
pub fn parse_migration_filename(filename: &str) -> Option<ParsedMigration> {
    let stem = filename.strip_suffix(&format!(".{}", MIGRATION_FILE_EXTENSION))?;

    // 4-2-2-6 digit groups separated by underscores, then the description.
    if stem.len() < 19 {
        return None;
    }
    let (timestamp, rest) = stem.split_at(17);
    let description = rest.strip_prefix('_')?;
    if description.is_empty() {
        return None;
    }

    let groups: Vec<&str> = timestamp.split('_').collect();
    if groups.len() != 4 {
        return None;
    }
    let widths = [4, 2, 2, 6];
    for (group, width) in groups.iter().zip(widths) {
        if group.len() != width || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    Some(ParsedMigration {
        path: PathBuf::new(),
        name: stem.to_string(),
        timestamp: timestamp.to_string(),
        description: description.to_string(),
    })
}

/// Find all migration files in a directory, sorted ascending by filename
/// (i.e. chronologically).
pub fn discover_migrations(migrations_dir: &Path) -> Result<Vec<ParsedMigration>> {
    let mut migrations = Vec::new();

    if !migrations_dir.exists() {
        return Ok(migrations);
    }

    for entry in std::fs::read_dir(migrations_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(filename) = path.file_name().and_then(|n| n.to_str())
            && let Some(mut parsed) = parse_migration_filename(filename)
        {
            parsed.path = path;
            migrations.push(parsed);
        }
    }

    migrations.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(migrations)
}

/// Lowercase a human description into a filename fragment.
pub fn sanitize_description(description: &str) -> String {
    let mut sanitized: String = description
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }
    sanitized.trim_matches('_').to_string()
}

/// Generate a filename for a new migration, stamped with the current time.
pub fn generate_migration_filename(description: &str) -> String {
    format!(
        "{}_{}.{}",
        Utc::now().format(MIGRATION_TIMESTAMP_FORMAT),
        sanitize_description(description),
        MIGRATION_FILE_EXTENSION
    )
}

/// Ledger name for a converted legacy scheme version; the fixed epoch prefix
/// guarantees these sort before any real timestamped migration.
pub fn legacy_migration_name(version: u32) -> String {
    format!("{}{:04}", LEGACY_MIGRATION_PREFIX, version)
}
