use std::time::Duration;

use ledger::{Coins, Ledger, SqlStore};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, DatabaseConnection};
use server::TokenIssuer;
use settings::{Database, Settings};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "coinshop={level},server={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect(&settings).await?;
    let ledger = Ledger::builder()
        .store(SqlStore::new(db))
        .starting_balance(Coins::new(settings.ledger.starting_balance))
        .unit_timeout(Duration::from_secs(settings.ledger.unit_timeout_secs))
        .build()?;
    let tokens = TokenIssuer::new(&settings.server.jwt_secret);

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    server::run(ledger, tokens, &addr).await?;

    Ok(())
}

async fn connect(
    settings: &Settings,
) -> Result<DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let pool = &settings.database_pool;
    let (url, max_connections) = match &settings.database {
        // Every connection to `sqlite::memory:` is its own database.
        Database::Memory => ("sqlite::memory:".to_string(), 1),
        Database::Sqlite(path) => (format!("sqlite:{path}?mode=rwc"), pool.max_connections),
        Database::Url(url) => (url.clone(), pool.max_connections),
    };

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(pool.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
        .sqlx_logging(false);

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("database ready");
    Ok(database)
}
