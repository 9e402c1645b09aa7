pub mod parsing;

pub use parsing::{
    discover_migrations, generate_migration_filename, legacy_migration_name,
    parse_migration_filename, sanitize_description, ParsedMigration,
};
