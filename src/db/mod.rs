pub mod censors;
pub mod mod_logs;
pub mod tickets;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

const SQLITE_MAX_CONNECTIONS: u32 = 5; // sqlite serializes writes anyway

pub async fn connect(database_url: &str) -> Result<SqlitePool, crate::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(SQLITE_MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Current unix timestamp, the format every table stores times in
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // A single connection, every new in-memory connection would be a fresh database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    crate::cmds::migrations::apply(&pool).await.unwrap();

    pool
}
