use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;
use tracing_subscriber::EnvFilter;

use aurahub::config::Config;
use aurahub::routes::create_routes;
use aurahub::services::cleanup::CleanupService;
use aurahub::services::file_service::HttpFileService;
use aurahub::state::AppState;

#[derive(Parser)]
#[command(name = "aurahub", version, about = "AuraHub video hosting backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations and start the HTTP server (default).
    Serve,
    /// Apply pending migrations and exit.
    Migrate,
    /// Drop every table and re-apply all migrations.
    ResetDb,
}

async fn connect(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options.sqlx_logging(false);
    Database::connect(options)
        .await
        .context("failed to connect to database")
}

async fn serve(config: Config, db: DatabaseConnection) -> anyhow::Result<()> {
    Migrator::up(&db, None).await.context("failed to run migrations")?;

    tokio::spawn(CleanupService::new(db.clone()).run_scheduler());

    let files = HttpFileService::new(&config.file_service_url)
        .context("invalid FILE_SERVICE_URL")?;
    if config.github.is_none() {
        info!("GitHub login disabled: GITHUB_CLIENT_ID / GITHUB_CLIENT_SECRET not set");
    }

    let addr = config.bind_addr();
    let state = AppState::new(db, Arc::new(files), config);
    let app = create_routes(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("aurahub=debug,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let db = connect(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::Migrate => {
            Migrator::up(&db, None).await.context("failed to run migrations")?;
            info!("migrations applied");
            Ok(())
        }
        Command::ResetDb => {
            Migrator::fresh(&db).await.context("failed to reset database")?;
            info!("database reset");
            Ok(())
        }
    }
}
