use crate::{Context, Error};
use poise::{serenity_prelude::CreateEmbed, CreateReply};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn format_uptime(secs: u64) -> String {
    let seconds = secs % 60;
    let minutes = (secs / 60) % 60;
    let hours = (secs / 60) / 60;

    format!("{}h{}m{}s", hours, minutes, seconds)
}

#[poise::command(category = "Stats", slash_command, user_cooldown = 1)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let total_cached_guilds = ctx.cache().guild_count();

    let total_users = {
        let mut count = 0;

        for guild in ctx.cache().guilds() {
            {
                let guild = guild.to_guild_cached(ctx.cache());

                if let Some(guild) = guild {
                    count += guild.member_count;
                }
            }
        }

        count
    };

    let data = ctx.data();
    let uptime = (chrono::Utc::now().timestamp() - data.start_time).max(0) as u64;

    let msg = CreateReply::default().embed(
        CreateEmbed::default()
            .title("Bot Stats")
            .field(
                "Bot name",
                ctx.serenity_context().cache.current_user().name.to_string(),
                true,
            )
            .field("Bot version", VERSION, true)
            .field("Uptime", format_uptime(uptime), true)
            .field("Cached Servers", total_cached_guilds.to_string(), true)
            .field("Users", total_users.to_string(), true)
            .field("Active Censors", data.censors.len().to_string(), true),
    );

    ctx.send(msg).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime() {
        assert_eq!(format_uptime(0), "0h0m0s");
        assert_eq!(format_uptime(3_725), "1h2m5s");
        assert_eq!(format_uptime(90_000), "25h0m0s");
    }
}
