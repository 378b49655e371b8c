use serenity::all::{CreateAttachment, EditChannel, EditGuild, GuildChannel};

use crate::botlib::embeds::{error_message, make_embed, success_message, SOFT_GREEN};
use crate::{Context, Error};
use poise::CreateReply;

const MAX_CHANNEL_TOPIC_LENGTH: usize = 1024;

/// Server management
#[poise::command(slash_command, guild_only, subcommands("pop", "banner", "topic"))]
pub async fn server(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Gets the current server population
#[poise::command(slash_command, guild_only, check = "crate::binutils::is_staff")]
pub async fn pop(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let cached = ctx.guild().map(|g| g.member_count);

    let count = match cached {
        Some(count) => count,
        None => guild_id
            .to_partial_guild_with_counts(ctx.http())
            .await?
            .approximate_member_count
            .unwrap_or_default(),
    };

    ctx.say(count.to_string()).await?;

    Ok(())
}

/// Sets the banner to the image provided
#[poise::command(
    slash_command,
    guild_only,
    check = "crate::binutils::is_staff",
    required_bot_permissions = "MANAGE_GUILD"
)]
pub async fn banner(
    ctx: Context<'_>,
    #[description = "The link to the image to be set"] link: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let resp = match ctx.data().reqwest.get(&link).send().await {
        Ok(resp) if resp.status() == reqwest::StatusCode::OK => resp,
        Ok(resp) => {
            log::info!("Banner link {} returned {}", link, resp.status());
            return error_message(ctx, "The link you entered was not accessible.").await;
        }
        Err(e) => {
            log::info!("Banner link {} failed: {}", link, e);
            return error_message(ctx, "The link you entered was not accessible.").await;
        }
    };

    let image = CreateAttachment::bytes(resp.bytes().await?.to_vec(), "banner");

    if let Err(e) = guild_id
        .edit(
            ctx.serenity_context(),
            EditGuild::new().banner(Some(image.to_base64())),
        )
        .await
    {
        log::warn!("Could not set banner: {}", e);
        return error_message(ctx, "Unable to set banner, verify the link is correct.").await;
    }

    ctx.send(
        CreateReply::default().embed(
            make_embed(ctx.author())
                .title("Banner updated")
                .description(format!("Banner [image]({}) updated by <@{}>", link, ctx.author().id))
                .color(SOFT_GREEN),
        ),
    )
    .await?;

    Ok(())
}

/// Sets the channel to the topic provided
#[poise::command(
    slash_command,
    guild_only,
    check = "crate::binutils::is_staff",
    required_bot_permissions = "MANAGE_CHANNELS"
)]
pub async fn topic(
    ctx: Context<'_>,
    #[description = "The channel to edit"] channel: GuildChannel,
    #[description = "The topic message to set"] topic: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    if topic.chars().count() >= MAX_CHANNEL_TOPIC_LENGTH {
        return error_message(ctx, "Topic message must be less than 1024 characters.").await;
    }

    channel
        .id
        .edit(ctx.serenity_context(), EditChannel::new().topic(topic))
        .await?;

    success_message(ctx, "Successfully updated the channel topic.").await
}
