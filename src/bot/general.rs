use poise::CreateReply;
use serenity::all::{Mentionable, User};

use crate::botlib::embeds::{make_embed, MAX_FIELD_LENGTH};
use crate::botlib::helpers::join_capped;
use crate::{Context, Error};

/// Returns the profile picture of the invoker or the given user
#[poise::command(slash_command, guild_only)]
pub async fn pfp(
    ctx: Context<'_>,
    #[description = "The user to get the profile picture of"] user: Option<User>,
) -> Result<(), Error> {
    let user = user.as_ref().unwrap_or_else(|| ctx.author());

    ctx.send(CreateReply::default().embed(make_embed(ctx.author()).image(user.face())))
        .await?;

    Ok(())
}

/// Returns the user info of the invoker or the given user
#[poise::command(slash_command, guild_only)]
pub async fn userinfo(
    ctx: Context<'_>,
    #[description = "The user to look up"] user: Option<User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let user_id = user.map(|u| u.id).unwrap_or(ctx.author().id);

    let Ok(member) = guild_id.member(ctx.serenity_context(), user_id).await else {
        return Err(format!("Could not find <@{}> in this server", user_id).into());
    };

    let mut embed = make_embed(ctx.author())
        .thumbnail(member.face())
        .field("User ID", member.user.id.to_string(), true)
        .field("Username", member.user.tag(), true)
        .field(
            "Nickname",
            member.nick.clone().unwrap_or_else(|| "None".to_string()),
            true,
        )
        .field(
            "Joined Guild at",
            member
                .joined_at
                .map(|t| format!("<t:{}:f>", t.unix_timestamp()))
                .unwrap_or_else(|| "Unknown".to_string()),
            true,
        )
        .field(
            "Joined Discord at",
            format!("<t:{}:f>", member.user.created_at().unix_timestamp()),
            true,
        )
        .field("Is Bot?", if member.user.bot { "Yes" } else { "No" }, true);

    if !member.roles.is_empty() {
        embed = embed.field(
            "Roles",
            join_capped(
                &member
                    .roles
                    .iter()
                    .map(|r| r.mention().to_string())
                    .collect::<Vec<_>>(),
                " ",
                MAX_FIELD_LENGTH,
            ),
            false,
        );
    }

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}
