use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use mymt::commands::{self, MigrationTypeArg, StatusFormat};
use mymt::config;
use mymt::manager::MigrationType;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = "mymt.yaml", global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize migration tracking in the database
    Init {
        #[command(flatten)]
        database_args: config::DatabaseArgs,
    },

    /// Apply pending migrations
    Migrate {
        /// Show what would run without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Which migration set to apply
        #[arg(long, value_enum, default_value = "all")]
        migration_type: MigrationTypeArg,

        #[command(flatten)]
        database_args: config::DatabaseArgs,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },

    /// Create a new migration file from a template
    Make {
        /// Description for the migration (becomes part of the filename)
        description: String,

        /// Which migration set the file belongs to
        #[arg(long, value_enum, default_value = "app")]
        migration_type: MakeTypeArg,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },

    /// Roll back the most recent batch
    Rollback {
        /// Show what would run without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Which migration set to roll back
        #[arg(long, value_enum, default_value = "app")]
        migration_type: MigrationTypeArg,

        #[command(flatten)]
        database_args: config::DatabaseArgs,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },

    /// Show executed and pending migrations
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: StatusFormat,

        #[command(flatten)]
        database_args: config::DatabaseArgs,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },

    /// Convert a development project from the legacy db scheme
    Convert {
        /// Show what would be converted without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,

        #[command(flatten)]
        database_args: config::DatabaseArgs,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },

    /// Register legacy history on a production host (no scheme files needed)
    ConvertProduction {
        /// Show what would be registered without changing anything
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        database_args: config::DatabaseArgs,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },

    /// Check the legacy schema hash for out-of-band drift
    Verify {
        #[command(flatten)]
        database_args: config::DatabaseArgs,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MakeTypeArg {
    App,
    Framework,
}

impl From<MakeTypeArg> for MigrationType {
    fn from(arg: MakeTypeArg) -> Self {
        match arg {
            MakeTypeArg::App => MigrationType::App,
            MakeTypeArg::Framework => MigrationType::Framework,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);
    run_main(cli).await
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn resolve_config(
    config_file: &str,
    database_args: config::DatabaseArgs,
    directory_args: Option<config::DirectoryArgs>,
) -> Result<config::Config> {
    let (file_config, root_dir) = config::load_config(config_file)?;
    let cli_config = config::ConfigInput {
        database: Some(database_args.into()),
        directories: directory_args.map(Into::into),
    };
    config::ConfigBuilder::new()
        .with_file(file_config)
        .with_cli_args(cli_config)
        .resolve(&root_dir)
}

async fn run_main(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { database_args } => {
            let config = resolve_config(&cli.config_file, database_args, None)?;
            info!("Initializing migration tracking");
            commands::cmd_init(&config).await
        }
        Commands::Migrate {
            dry_run,
            migration_type,
            database_args,
            directory_args,
        } => {
            let config = resolve_config(&cli.config_file, database_args, Some(directory_args))?;
            info!("Applying pending migrations");
            commands::cmd_migrate(&config, migration_type, dry_run).await
        }
        Commands::Make {
            description,
            migration_type,
            directory_args,
        } => {
            // Make never touches the database; a placeholder URL keeps the
            // config resolvable without one.
            let database_args = config::DatabaseArgs {
                database_url: Some("mysql://unused".to_string()),
            };
            let config = resolve_config(&cli.config_file, database_args, Some(directory_args))?;
            info!("Creating migration file");
            commands::cmd_make(&config, &description, migration_type.into()).map(|_| ())
        }
        Commands::Rollback {
            dry_run,
            migration_type,
            database_args,
            directory_args,
        } => {
            let config = resolve_config(&cli.config_file, database_args, Some(directory_args))?;
            info!("Rolling back last batch");
            commands::cmd_rollback(&config, migration_type, dry_run).await
        }
        Commands::Status {
            format,
            database_args,
            directory_args,
        } => {
            let config = resolve_config(&cli.config_file, database_args, Some(directory_args))?;
            info!("Checking migration status");
            commands::cmd_status(&config, format).await
        }
        Commands::Convert {
            dry_run,
            yes,
            database_args,
            directory_args,
        } => {
            let config = resolve_config(&cli.config_file, database_args, Some(directory_args))?;
            info!("Converting from legacy db scheme");
            commands::cmd_convert(&config, dry_run, yes).await
        }
        Commands::ConvertProduction {
            dry_run,
            database_args,
            directory_args,
        } => {
            let config = resolve_config(&cli.config_file, database_args, Some(directory_args))?;
            info!("Converting production host");
            commands::cmd_convert_production(&config, dry_run).await
        }
        Commands::Verify { database_args } => {
            let config = resolve_config(&cli.config_file, database_args, None)?;
            info!("Verifying schema hash");
            commands::cmd_verify(&config).await
        }
    }
}
