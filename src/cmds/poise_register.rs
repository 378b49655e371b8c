use std::sync::Arc;

use log::info;
use serenity::all::HttpBuilder;

use crate::config::Config;
use crate::Error;

/// Registers every slash command in the configured guild
pub async fn register_poise_commands(config: Arc<Config>) -> Result<(), Error> {
    info!("Registering poise commands");

    let commands = crate::bot::raw_commands();

    let http = HttpBuilder::new(&config.discord_auth.token).build();

    let app = http.get_current_application_info().await?;
    http.set_application_id(app.id);

    let commands_builder = poise::builtins::create_application_commands(&commands);
    info!(
        "Registering {} commands in guild {}",
        commands_builder.len(),
        config.guild_id
    );

    config
        .guild_id
        .set_commands(&http, commands_builder)
        .await?;

    Ok(())
}
