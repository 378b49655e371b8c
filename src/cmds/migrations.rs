use std::sync::Arc;

use log::info;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::Error;

const SCHEMA: &[(&str, &str)] = &[
    (
        "mod_logs",
        "CREATE TABLE IF NOT EXISTS mod_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            mod_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            reason TEXT NOT NULL,
            type TEXT NOT NULL
        )",
    ),
    (
        "mod_logs_user_id",
        "CREATE INDEX IF NOT EXISTS mod_logs_user_id ON mod_logs (user_id)",
    ),
    (
        "tickets",
        "CREATE TABLE IF NOT EXISTS tickets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            status TEXT NOT NULL,
            guild TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            ticket_topic TEXT NOT NULL,
            log_url TEXT
        )",
    ),
    (
        "censor",
        "CREATE TABLE IF NOT EXISTS censor (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            censor_term TEXT NOT NULL,
            censor_type TEXT NOT NULL,
            censor_threshold INTEGER NOT NULL DEFAULT 65,
            enabled BOOLEAN NOT NULL DEFAULT TRUE,
            excluded_users TEXT NOT NULL DEFAULT '[]',
            excluded_roles TEXT NOT NULL DEFAULT '[]'
        )",
    ),
];

/// Creates every missing table, safe to run on each start
pub async fn apply(pool: &SqlitePool) -> Result<(), Error> {
    let mut tx = pool.begin().await?;

    for (name, query) in SCHEMA {
        log::debug!("Applying schema for {}", name);
        sqlx::query(query).execute(&mut *tx).await?;
    }

    tx.commit().await?;

    Ok(())
}

pub async fn start(config: Arc<Config>) -> Result<(), Error> {
    info!("Connecting to database");

    let pool = crate::db::connect(&config.database_url).await?;

    info!("Starting migrations for sqlite");

    apply(&pool).await?;

    info!("Migrations done");

    Ok(())
}
