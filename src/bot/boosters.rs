use futures_util::StreamExt;
use poise::CreateReply;
use serenity::all::{CreateEmbedFooter, Mentionable};

use crate::botlib::embeds::{make_embed, NITRO_PINK};
use crate::botlib::helpers::join_capped;
use crate::{Context, Error};

/// Embed descriptions are capped at 4096 characters
const MAX_DESCRIPTION_LENGTH: usize = 4096;

/// Joins booster mentions one per line, cutting off whatever doesn't fit
pub fn booster_description(mentions: &[String]) -> String {
    join_capped(mentions, "\n", MAX_DESCRIPTION_LENGTH)
}

/// List all the current server boosters
#[poise::command(slash_command, guild_only, check = "crate::binutils::is_staff")]
pub async fn boosters(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let total_boosts = ctx
        .guild()
        .and_then(|g| g.premium_subscription_count)
        .unwrap_or_default();

    let mut boosters = Vec::new();
    let mut members = guild_id.members_iter(ctx.http()).boxed();
    while let Some(member) = members.next().await {
        let member = member?;
        if member.premium_since.is_some() {
            boosters.push(member.mention().to_string());
        }
    }

    let embed = make_embed(ctx.author())
        .title(format!("Total boosts: {}", total_boosts))
        .color(NITRO_PINK)
        .description(booster_description(&boosters))
        .footer(CreateEmbedFooter::new(format!(
            "Total boosters: {}",
            boosters.len()
        )));

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lists_are_joined() {
        let mentions = vec!["<@1>".to_string(), "<@2>".to_string()];
        assert_eq!(booster_description(&mentions), "<@1>\n<@2>");
        assert_eq!(booster_description(&[]), "");
    }

    #[test]
    fn long_lists_are_cut() {
        let mentions = (0..1000)
            .map(|i| format!("<@{}>", 100000000000000000u64 + i))
            .collect::<Vec<_>>();

        let description = booster_description(&mentions);
        assert!(description.len() <= MAX_DESCRIPTION_LENGTH);
        assert!(description.contains("more"));
    }
}
