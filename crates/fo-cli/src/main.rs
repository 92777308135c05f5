//! FieldOps administration tool
//!
//! Runs against the configured Postgres database; the in-memory backend has
//! nothing to administer.

use std::io::BufRead;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fo_auth::PasswordHasher;
use fo_core::config::{AppConfig, DatabaseBackend};
use fo_db::{Database, DatabaseConfig, Stores};
use fo_services::{AdminAccount, Seeder};
use tracing::info;

#[derive(Parser)]
#[command(name = "fieldops-admin")]
#[command(about = "Administration commands for FieldOps")]
#[command(version)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations
    Migrate,

    /// Permissions, built-in roles and lookup values
    Seed,

    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "FO_ADMIN_PASSWORD")]
        password: String,
    },

    /// Print the Argon2 hash of a password
    HashPassword {
        /// Taken from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .with_target(false)
        .init();

    match cli.command {
        Command::HashPassword { password } => {
            let password = match password {
                Some(password) => password,
                None => read_line().context("Failed to read password from stdin")?,
            };
            let hash = PasswordHasher::new().hash(&password)?;
            println!("{}", hash);
        }
        Command::Migrate => {
            let database = connect(cli.database_url).await?;
            database.migrate().await.context("Failed to run migrations")?;
            database.close().await;
        }
        Command::Seed => {
            let database = connect(cli.database_url).await?;
            let seeder = Seeder::new(Stores::postgres(database.pool().clone()));
            let report = seeder.run().await?;
            println!(
                "{} permissions, {} roles created, {} lookup values created",
                report.permissions, report.roles_created, report.lookups_created
            );
            database.close().await;
        }
        Command::CreateAdmin {
            username,
            email,
            password,
        } => {
            let database = connect(cli.database_url).await?;
            let seeder = Seeder::new(Stores::postgres(database.pool().clone()));
            seeder.run().await?;
            let user = seeder
                .create_admin(AdminAccount {
                    username,
                    email,
                    password,
                })
                .await?;
            println!("Created administrator {} (id {})", user.username, user.id);
            database.close().await;
        }
    }

    Ok(())
}

async fn connect(url: Option<String>) -> anyhow::Result<Database> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(url) = url {
        config.database.url = url;
        config.database.backend = DatabaseBackend::Postgres;
    }
    if config.database.backend == DatabaseBackend::Memory {
        bail!("The configured database backend is 'memory'; set DATABASE_URL to a Postgres database");
    }

    let database = Database::connect(&DatabaseConfig::from(&config.database))
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");
    Ok(database)
}

fn read_line() -> std::io::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
