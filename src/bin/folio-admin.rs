use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio::analytics::{AnalyticsEngine, GeoIpService, SystemClock};
use folio::config::{Config, DatabaseBackend};
use folio::metrics::Metrics;
use folio::storage::{PostgresStorage, SqliteStorage, Storage};
use serde_json::json;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "folio-admin")]
#[command(about = "Folio administration CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema and the empty profile record
    Init,
    /// Set the administrator's login
    SetCredentials {
        /// At least 3 characters
        username: String,
        /// At least 5 characters; stored as a bcrypt hash
        password: String,
    },
    /// Print every profile section as JSON
    Show,
    /// Print all-time visit counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
    };

    // Every command needs the schema
    storage.init().await?;

    match cli.command {
        Commands::Init => {
            println!("✓ Database initialized at {}", config.database.url);
        }
        Commands::SetCredentials { username, password } => {
            let username = username.trim().to_string();
            if username.chars().count() < 3 || password.chars().count() < 5 {
                bail!("username needs at least 3 characters and password at least 5");
            }
            let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
                .context("Failed to hash password")?;
            storage.set_credentials(&username, &hash).await?;
            println!("✓ Credentials updated for '{}'", username);
        }
        Commands::Show => {
            let profile = json!({
                "basicInfo": storage.basic_info().await?,
                "skills": storage.skills().await?,
                "jobsAndProjects": storage.jobs_and_projects().await?,
                "socials": storage.socials().await?,
            });
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Stats => {
            // Groupings only read stored rows, so no GeoIP database is opened
            let engine = AnalyticsEngine::new(
                Arc::clone(&storage),
                Arc::new(GeoIpService::default()),
                Arc::new(SystemClock),
                Arc::new(Metrics::default()),
            );
            let countries = engine.by_country().await?;
            let browsers = engine.by_browser().await?;
            let devices = engine.by_device().await?;
            let total: i64 = devices.iter().map(|d| d.count).sum();

            println!("Total visits: {}", total);
            if total == 0 {
                return Ok(());
            }

            println!();
            println!("{:<40} {:<6} {:>8}", "Country", "Code", "Visits");
            println!("{}", "-".repeat(56));
            for row in countries {
                println!("{:<40} {:<6} {:>8}", row.country, row.code, row.count);
            }

            println!();
            println!("{:<40} {:>8}", "Browser", "Visits");
            println!("{}", "-".repeat(49));
            for row in browsers {
                println!("{:<40} {:>8}", row.browser, row.count);
            }

            println!();
            println!("{:<40} {:>8}", "Device", "Visits");
            println!("{}", "-".repeat(49));
            for row in devices {
                println!("{:<40} {:>8}", row.device, row.count);
            }
        }
    }

    Ok(())
}
