use poise::CreateReply;
use serenity::all::{Color, CreateEmbed, CreateEmbedAuthor, Timestamp, User};

use crate::{Context, Error};

pub const SOFT_RED: Color = Color::new(0xcd6d6d);
pub const SOFT_GREEN: Color = Color::new(0x68c290);
pub const SOFT_ORANGE: Color = Color::new(0xf9b45a);
pub const GOLD: Color = Color::new(0xf1c40f);
pub const NITRO_PINK: Color = Color::new(0xf47fff);
pub const TICKET_ARCHIVE: Color = Color::new(0x00ffdf);

/// Discord rejects embed field values longer than this
pub const MAX_FIELD_LENGTH: usize = 1024;

/// Base embed, authored by whoever ran the command
pub fn make_embed(author: &User) -> CreateEmbed {
    CreateEmbed::new()
        .author(
            CreateEmbedAuthor::new(super::helpers::username(author)).icon_url(author.face()),
        )
        .timestamp(Timestamp::now())
}

/// Base embed for DMs, carries no author
pub fn make_dm_embed(title: &str, description: &str, color: Color) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(description)
        .color(color)
}

pub fn error_embed(description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .color(Color::RED)
        .title("Error")
        .description(description)
}

/// Replies with a red error embed without failing the command
pub async fn error_message(ctx: Context<'_>, description: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().embed(error_embed(description)))
        .await?;
    Ok(())
}

pub async fn success_message(
    ctx: Context<'_>,
    description: impl Into<String>,
) -> Result<(), Error> {
    ctx.send(
        CreateReply::default().embed(
            make_embed(ctx.author())
                .color(SOFT_GREEN)
                .description(description),
        ),
    )
    .await?;
    Ok(())
}

/// Field appended when the target of an action couldn't be DMed
pub fn dm_failed_notice(embed: CreateEmbed, mention: &str) -> CreateEmbed {
    embed.field(
        "Notice:",
        format!(
            "Unable to message {} about this action. \
            This can be caused by the user not being in the server, \
            having DMs disabled, or having the bot blocked.",
            mention
        ),
        false,
    )
}
