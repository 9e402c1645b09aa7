use anyhow::Result;
use serde::Serialize;

use super::build_migration_manager;
use crate::config::Config;
use crate::manager::MigrationType;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StatusFormat {
    #[default]
    Human,
    Json,
}

#[derive(Serialize)]
struct TypeStatus {
    executed: Vec<String>,
    pending: Vec<String>,
}

#[derive(Serialize)]
struct StatusReport {
    framework: TypeStatus,
    app: TypeStatus,
}

/// Show executed and pending migrations per type.
pub async fn cmd_status(config: &Config, format: StatusFormat) -> Result<()> {
    let manager = build_migration_manager(config).await?;

    let mut report = StatusReport {
        framework: TypeStatus {
            executed: vec![],
            pending: vec![],
        },
        app: TypeStatus {
            executed: vec![],
            pending: vec![],
        },
    };

    for migration_type in [MigrationType::Framework, MigrationType::App] {
        let executed = manager.executed_migrations(migration_type).await?;
        let pending = manager
            .pending_migrations(migration_type)
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect();
        let slot = match migration_type {
            MigrationType::Framework => &mut report.framework,
            MigrationType::App => &mut report.app,
        };
        slot.executed = executed;
        slot.pending = pending;
    }

    match format {
        StatusFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        StatusFormat::Human => {
            for (label, status) in [("framework", &report.framework), ("app", &report.app)] {
                println!("{} migrations:", label);
                if status.executed.is_empty() && status.pending.is_empty() {
                    println!("  (none)");
                    continue;
                }
                for name in &status.executed {
                    println!("  [x] {}", name);
                }
                for name in &status.pending {
                    println!("  [ ] {}", name);
                }
            }
        }
    }
    Ok(())
}
