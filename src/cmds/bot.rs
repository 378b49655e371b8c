use std::sync::Arc;

use log::{error, info};
use serenity::all::{FullEvent, GatewayIntents, Message};

use crate::botlib::censor::CensorCache;
use crate::config::Config;
use crate::{Data, Error};

async fn event_listener(
    ctx: &serenity::all::Context,
    event: &FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!(
                "{} is ready on shard {}",
                data_about_bot.user.name, ctx.shard_id
            );
        }
        FullEvent::Message { new_message } => {
            enforce_censors(ctx, new_message, data).await?;
        }
        _ => {}
    }

    Ok(())
}

/// Deletes guild messages that trip an enabled censor
async fn enforce_censors(
    ctx: &serenity::all::Context,
    msg: &Message,
    data: &Data,
) -> Result<(), Error> {
    if msg.author.bot || msg.guild_id != Some(data.config.guild_id) {
        return Ok(());
    }

    if data.censors.is_empty() || msg.content.is_empty() {
        return Ok(());
    }

    let roles = msg
        .member
        .as_ref()
        .map(|m| m.roles.clone())
        .unwrap_or_default();

    let Some(hit) = data.censors.find_match(&msg.content, msg.author.id, &roles) else {
        return Ok(());
    };

    info!(
        "Censor {} ({}) matched message {} by {} in {}",
        hit.censor.id, hit.censor.censor_type, msg.id, msg.author.id, msg.channel_id
    );

    msg.delete(ctx).await?;

    Ok(())
}

pub async fn start(config: Arc<Config>) -> Result<(), Error> {
    let start_time = chrono::Utc::now().timestamp();

    info!("Connecting to database");

    let pool = crate::db::connect(&config.database_url).await?;
    crate::cmds::migrations::apply(&pool).await?;

    let censors = CensorCache::default();
    censors.refresh(&pool).await?;

    let reqwest = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(30))
        .timeout(std::time::Duration::from_secs(90))
        .build()?;

    let data = Data {
        pool,
        reqwest,
        config: config.clone(),
        censors,
        start_time,
    };

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT // automod reads every message
        | GatewayIntents::GUILD_MEMBERS;

    let framework_opts = poise::FrameworkOptions {
        initialize_owners: true,
        event_handler: |ctx, event, _framework, data| Box::pin(event_listener(ctx, event, data)),
        commands: crate::bot::raw_commands(),
        pre_command: |ctx| {
            Box::pin(async move {
                info!(
                    "Executing command {} for user {} ({})...",
                    ctx.command().qualified_name,
                    ctx.author().name,
                    ctx.author().id
                );
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                info!(
                    "Done executing command {} for user {} ({})...",
                    ctx.command().qualified_name,
                    ctx.author().name,
                    ctx.author().id
                );
            })
        },
        on_error: |error| Box::pin(crate::binutils::on_error(error)),
        ..Default::default()
    };

    let guild_id = config.guild_id;

    let framework = poise::Framework::builder()
        .options(framework_opts)
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);

                poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                    .await?;

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::all::ClientBuilder::new(&config.discord_auth.token, intents)
        .framework(framework)
        .await?;

    info!("Starting client");

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
        return Err(why.into());
    }

    Ok(())
}
