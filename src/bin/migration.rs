//! Standalone migration runner: `DATABASE_URL=... cargo run --bin migration`.

use migrations::Migrator;
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("APP__DATABASE_URL"))
        .unwrap_or_else(|_| "sqlite://fieldstock.db?mode=rwc".to_string());

    info!("Running migrations against {}", database_url);
    let db = sea_orm::Database::connect(&database_url).await?;
    Migrator::up(&db, None).await?;
    info!("Migrations complete");

    Ok(())
}
