use crate::botlib::durationstring::parse_duration;
use crate::botlib::embeds::{dm_failed_notice, error_message, make_dm_embed, make_embed};
use crate::botlib::embeds::{GOLD, SOFT_GREEN, SOFT_ORANGE, SOFT_RED};
use crate::botlib::helpers::{to_log_format, truncate, username, validate_reason};
use crate::botlib::permission_checks::can_action;
use crate::db::mod_logs::{self, ModAction, ModLog};
use crate::{Context, Error};
use poise::CreateReply;
use serenity::all::{
    CreateEmbed, CreateMessage, EditMember, GuildId, Member, Mentionable, Timestamp, User,
    UserId, UserPagination,
};

/// Longest timeout Discord accepts
const MAX_MUTE_SECONDS: u64 = 28 * 24 * 60 * 60;

/// Bans fetched per request while looking for a user
const BAN_PAGE_SIZE: u8 = 200;

fn guild_name(ctx: &Context<'_>) -> String {
    ctx.guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "the server".to_string())
}

/// Tries to DM `user`, returns whether the message went through
async fn notify_user(ctx: &Context<'_>, user: &User, embed: CreateEmbed) -> bool {
    match user
        .direct_message(ctx.serenity_context(), CreateMessage::new().embed(embed))
        .await
    {
        Ok(_) => true,
        Err(e) => {
            log::info!("Could not DM {} ({}): {}", user.name, user.id, e);
            false
        }
    }
}

fn action_dm(
    ctx: &Context<'_>,
    verb: &str,
    color: serenity::all::Color,
    reason: &str,
) -> CreateEmbed {
    make_dm_embed(
        &format!("You have been {}!", verb),
        &format!("You have been {} in {}", verb, guild_name(ctx)),
        color,
    )
    .field("Moderator", ctx.author().mention().to_string(), true)
    .field("Reason", reason, true)
}

async fn is_banned(ctx: &Context<'_>, guild_id: GuildId, user_id: UserId) -> Result<bool, Error> {
    let mut after = None;

    loop {
        let bans = guild_id
            .bans(ctx.http(), after, Some(BAN_PAGE_SIZE))
            .await?;

        if bans.iter().any(|b| b.user.id == user_id) {
            return Ok(true);
        }

        match bans.last() {
            Some(last) if bans.len() == BAN_PAGE_SIZE as usize => {
                after = Some(UserPagination::After(last.user.id));
            }
            _ => return Ok(false),
        }
    }
}

/// Sends the channel reply for a completed action
async fn action_reply(
    ctx: &Context<'_>,
    target: &User,
    description: String,
    color: serenity::all::Color,
    reason: &str,
    dm_sent: bool,
) -> Result<(), Error> {
    let mut embed = make_embed(ctx.author())
        .color(color)
        .description(description)
        .thumbnail(target.face())
        .field("Reason:", reason, false);

    if !dm_sent {
        embed = dm_failed_notice(embed, &target.mention().to_string());
    }

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Bans a user from the server, they don't need to be a member
#[poise::command(
    slash_command,
    guild_only,
    check = "crate::binutils::is_staff",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "The user to ban"] user: User,
    #[description = "The reason for the ban"]
    #[max_length = 512]
    reason: Option<String>,
    #[description = "Days worth of messages to delete from the user, up to 7"]
    #[min = 0]
    #[max = 7]
    daystodelete: Option<u8>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let reason = validate_reason(reason)?;
    let daystodelete = daystodelete.unwrap_or(0);

    if daystodelete > 7 {
        return Err("The amount of days to delete messages for must be between 0 and 7".into());
    }

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    if is_banned(&ctx, guild_id, user.id).await? {
        return error_message(ctx, format!("{} is already banned.", user.mention())).await;
    }

    // Users outside the server have no roles to compare against
    if let Ok(member) = guild_id.member(ctx.serenity_context(), user.id).await {
        if !can_action(&ctx, &member).await? {
            return error_message(ctx, format!("You cannot action {}.", member.mention())).await;
        }
    }

    let mut dm = action_dm(&ctx, "banned", SOFT_RED, &reason);
    if let Some(ref appeal_url) = ctx.data().config.meta.appeal_url {
        dm = dm.field("Appeal", format!("You can appeal the ban at {}", appeal_url), false);
    }

    let dm_sent = notify_user(&ctx, &user, dm).await;

    guild_id
        .ban_with_reason(
            ctx.http(),
            user.id,
            daystodelete,
            to_log_format(&username(ctx.author()), &username(&user), &reason),
        )
        .await?;

    mod_logs::record(&ctx.data().pool, user.id, ctx.author().id, &reason, ModAction::Ban).await?;

    action_reply(
        &ctx,
        &user,
        format!("{} was banned", user.mention()),
        SOFT_RED,
        &reason,
        dm_sent,
    )
    .await
}

/// Lifts the ban of a user
#[poise::command(
    slash_command,
    guild_only,
    check = "crate::binutils::is_staff",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "The user to unban"] user: User,
    #[description = "The reason for the unban"]
    #[max_length = 512]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let reason = validate_reason(reason)?;

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    if !is_banned(&ctx, guild_id, user.id).await? {
        return error_message(ctx, format!("{} is not banned.", user.mention())).await;
    }

    let dm_sent = notify_user(
        &ctx,
        &user,
        action_dm(&ctx, "unbanned", SOFT_GREEN, &reason).field(
            "Invite",
            ctx.data().config.meta.server_invite.clone(),
            false,
        ),
    )
    .await;

    ctx.http()
        .remove_ban(
            guild_id,
            user.id,
            Some(&to_log_format(&username(ctx.author()), &username(&user), &reason)[..]),
        )
        .await?;

    mod_logs::record(&ctx.data().pool, user.id, ctx.author().id, &reason, ModAction::Unban)
        .await?;

    action_reply(
        &ctx,
        &user,
        format!("{} was unbanned", user.mention()),
        SOFT_GREEN,
        &reason,
        dm_sent,
    )
    .await
}

/// Kicks a member from the server
#[poise::command(
    slash_command,
    guild_only,
    check = "crate::binutils::is_staff",
    required_bot_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "The member to kick"] member: Member,
    #[description = "The reason for the kick"]
    #[max_length = 512]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let reason = validate_reason(reason)?;

    if !can_action(&ctx, &member).await? {
        return error_message(ctx, format!("You cannot action {}.", member.mention())).await;
    }

    let dm_sent = notify_user(
        &ctx,
        &member.user,
        action_dm(&ctx, "kicked", SOFT_RED, &reason),
    )
    .await;

    member
        .kick_with_reason(
            ctx.serenity_context(),
            &to_log_format(&username(ctx.author()), &username(&member.user), &reason),
        )
        .await?;

    mod_logs::record(
        &ctx.data().pool,
        member.user.id,
        ctx.author().id,
        &reason,
        ModAction::Kick,
    )
    .await?;

    action_reply(
        &ctx,
        &member.user,
        format!("{} was kicked", member.mention()),
        SOFT_RED,
        &reason,
        dm_sent,
    )
    .await
}

/// Warns a member and records the warning
#[poise::command(slash_command, guild_only, check = "crate::binutils::is_staff")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "The member to warn"] member: Member,
    #[description = "The reason for the warn"]
    #[max_length = 512]
    reason: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let reason = validate_reason(Some(reason))?;

    let dm_sent = notify_user(
        &ctx,
        &member.user,
        action_dm(&ctx, "warned", GOLD, &reason),
    )
    .await;

    mod_logs::record(
        &ctx.data().pool,
        member.user.id,
        ctx.author().id,
        &reason,
        ModAction::Warn,
    )
    .await?;

    action_reply(
        &ctx,
        &member.user,
        format!("{} was warned", member.mention()),
        GOLD,
        &reason,
        dm_sent,
    )
    .await
}

/// Times out a member for a duration such as `1d12h` or `30m`
#[poise::command(
    slash_command,
    guild_only,
    check = "crate::binutils::is_staff",
    required_bot_permissions = "MODERATE_MEMBERS"
)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "The member to mute"] member: Member,
    #[description = "How long to mute for, e.g. 1d12h"] duration: String,
    #[description = "The reason for the mute"]
    #[max_length = 512]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let reason = validate_reason(reason)?;

    let duration = match parse_duration(&duration) {
        Ok(duration) => duration,
        Err(e) => return error_message(ctx, e.to_string()).await,
    };

    if duration.total_seconds() > MAX_MUTE_SECONDS {
        return error_message(ctx, "Mutes cannot be longer than 28 days.").await;
    }

    if !can_action(&ctx, &member).await? {
        return error_message(ctx, format!("You cannot action {}.", member.mention())).await;
    }

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let dm_sent = notify_user(
        &ctx,
        &member.user,
        action_dm(&ctx, "muted", SOFT_ORANGE, &reason)
            .field("Length", duration.display.clone(), true)
            .field("Expires", format!("<t:{}:R>", duration.expires_at), true),
    )
    .await;

    let until = Timestamp::from_unix_timestamp(duration.expires_at)?;
    let audit = to_log_format(&username(ctx.author()), &username(&member.user), &reason);

    guild_id
        .edit_member(
            ctx.serenity_context(),
            member.user.id,
            EditMember::new()
                .disable_communication_until(until.to_string())
                .audit_log_reason(&audit),
        )
        .await?;

    mod_logs::record(
        &ctx.data().pool,
        member.user.id,
        ctx.author().id,
        &reason,
        ModAction::Mute,
    )
    .await?;

    let mut embed = make_embed(ctx.author())
        .color(SOFT_ORANGE)
        .description(format!(
            "{} was muted for {}",
            member.mention(),
            duration.display
        ))
        .thumbnail(member.user.face())
        .field("Reason:", &reason, false)
        .field("Expires:", format!("<t:{}:R>", duration.expires_at), false);

    if !dm_sent {
        embed = dm_failed_notice(embed, &member.mention().to_string());
    }

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Removes the timeout of a member
#[poise::command(
    slash_command,
    guild_only,
    check = "crate::binutils::is_staff",
    required_bot_permissions = "MODERATE_MEMBERS"
)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "The member to unmute"] member: Member,
    #[description = "The reason for the unmute"]
    #[max_length = 512]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let reason = validate_reason(reason)?;

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    if member.communication_disabled_until.is_none() {
        return error_message(ctx, format!("{} is not muted.", member.mention())).await;
    }

    let audit = to_log_format(&username(ctx.author()), &username(&member.user), &reason);

    guild_id
        .edit_member(
            ctx.serenity_context(),
            member.user.id,
            EditMember::new()
                .enable_communication()
                .audit_log_reason(&audit),
        )
        .await?;

    let dm_sent = notify_user(
        &ctx,
        &member.user,
        action_dm(&ctx, "unmuted", SOFT_GREEN, &reason),
    )
    .await;

    mod_logs::record(
        &ctx.data().pool,
        member.user.id,
        ctx.author().id,
        &reason,
        ModAction::Unmute,
    )
    .await?;

    action_reply(
        &ctx,
        &member.user,
        format!("{} was unmuted", member.mention()),
        SOFT_GREEN,
        &reason,
        dm_sent,
    )
    .await
}

/// Cases shown by `/modlogs`, one embed field each
const MODLOGS_LIMIT: i64 = 25;

/// Room left for case fields once the title and author take their share of the 6000 embed limit
const MODLOGS_FIELD_BUDGET: usize = 5000;

const MODLOGS_REASON_LENGTH: usize = 200;

/// One `(name, value)` field per case, stopping with a count once the embed budget is spent
pub fn modlog_fields(logs: &[ModLog]) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut used = 0;

    for (i, log) in logs.iter().enumerate() {
        let name = format!("Case {} | {}", log.id, log.action);
        let value = format!(
            "Moderator: <@{}>\nReason: {}\nDate: <t:{}:f>",
            log.mod_id,
            truncate(&log.reason, MODLOGS_REASON_LENGTH),
            log.timestamp
        );

        let more = ("More".to_string(), format!("...and {} more cases", logs.len() - i));

        if used + name.len() + value.len() + more.0.len() + more.1.len() > MODLOGS_FIELD_BUDGET {
            fields.push(more);
            break;
        }

        used += name.len() + value.len();
        fields.push((name, value));
    }

    fields
}

/// Lists the moderation history of a user
#[poise::command(slash_command, guild_only, check = "crate::binutils::is_staff")]
pub async fn modlogs(
    ctx: Context<'_>,
    #[description = "The user to look up"] user: User,
) -> Result<(), Error> {
    ctx.defer().await?;

    let logs = mod_logs::for_user(&ctx.data().pool, user.id, MODLOGS_LIMIT).await?;

    let mut embed = make_embed(ctx.author())
        .color(GOLD)
        .title(format!("Mod logs for {}", username(&user)))
        .thumbnail(user.face());

    if logs.is_empty() {
        embed = embed.description("No mod logs found for this user.");
    }

    for (name, value) in modlog_fields(&logs) {
        embed = embed.field(name, value, false);
    }

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: i64, reason: &str) -> ModLog {
        ModLog {
            id,
            mod_id: "123456789012345678".to_string(),
            timestamp: 1_700_000_000,
            reason: reason.to_string(),
            action: "warn".to_string(),
        }
    }

    #[test]
    fn short_histories_are_listed_in_full() {
        let fields = modlog_fields(&[case(2, "spam"), case(1, "more spam")]);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].0, "Case 2 | warn");
        assert_eq!(
            fields[0].1,
            "Moderator: <@123456789012345678>\nReason: spam\nDate: <t:1700000000:f>"
        );
    }

    #[test]
    fn long_histories_fit_in_one_embed() {
        let reason = "a".repeat(512);
        let logs = (1..=25).map(|i| case(i, &reason)).collect::<Vec<_>>();

        let fields = modlog_fields(&logs);
        let total = fields
            .iter()
            .map(|(name, value)| name.len() + value.len())
            .sum::<usize>();

        assert!(total <= MODLOGS_FIELD_BUDGET);
        assert!(fields.iter().all(|(_, value)| value.len() <= 1024));

        let (name, value) = fields.last().unwrap();
        assert_eq!(name, "More");
        assert_eq!(
            value,
            &format!("...and {} more cases", logs.len() - (fields.len() - 1))
        );
    }
}
