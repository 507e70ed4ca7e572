use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// Creates a SQLite connection pool and applies the embedded migrations
///
/// The database file is created when missing and foreign keys are enforced
/// on every connection, so referential integrity holds even for writes that
/// bypass the explicit existence checks.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // In-memory databases vanish with their connection, so idle connections are never reaped.
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!(database_url = %database_url, "Database ready");

    Ok(pool)
}
