pub mod censor;
pub mod durationstring;
pub mod embeds;
pub mod helpers;
pub mod permission_checks;

use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>; // This is constant and should be copy pasted
pub type Command = poise::Command<Data, Error>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and event handler
pub struct Data {
    pub pool: sqlx::SqlitePool,
    pub reqwest: reqwest::Client,
    pub config: Arc<crate::config::Config>,
    pub censors: censor::CensorCache,
    /// Unix timestamp of process start, used by `/stats`
    pub start_time: i64,
}
