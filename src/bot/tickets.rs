use std::collections::HashSet;

use futures_util::StreamExt;
use poise::CreateReply;
use serenity::all::{
    ChannelId, ChannelType, CreateAttachment, CreateChannel, CreateEmbed, CreateMessage,
    GuildChannel, Mentionable, PermissionOverwrite, PermissionOverwriteType, Permissions, UserId,
};

use crate::botlib::embeds::{
    error_message, make_dm_embed, make_embed, MAX_FIELD_LENGTH, TICKET_ARCHIVE,
};
use crate::botlib::helpers::{join_capped, username};
use crate::db::tickets;
use crate::{Context, Error};

/// Embed fields cap out at 1024 characters
const MAX_TOPIC_LENGTH: usize = 1024;

const TICKET_PREFIX: &str = "ticket-";

pub fn ticket_channel_name(user_id: UserId) -> String {
    format!("{}{}", TICKET_PREFIX, user_id)
}

/// The user a ticket channel belongs to, parsed from its name
pub fn ticket_creator(channel_name: &str) -> Option<UserId> {
    channel_name
        .strip_prefix(TICKET_PREFIX)?
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
}

pub fn transcript_header(creator: &str, creator_id: UserId, topic: &str) -> String {
    format!(
        "Ticket Creator: {}\nUser ID: {}\nTicket Topic: {}\n\n",
        creator, creator_id, topic
    )
}

pub fn transcript_line(timestamp: i64, author: &str, content: &str) -> String {
    let time = chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();

    format!("[{}] {}: {}\n", time, author, content)
}

fn is_ticket_channel(channel: &GuildChannel, category: ChannelId) -> bool {
    channel.parent_id == Some(category) && channel.name.starts_with(TICKET_PREFIX)
}

/// Opens a new modmail ticket
#[poise::command(slash_command, guild_only)]
pub async fn ticket(
    ctx: Context<'_>,
    #[description = "A brief summary of the topic you would like to discuss"]
    #[max_length = 1024]
    topic: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    if topic.chars().count() > MAX_TOPIC_LENGTH {
        return error_message(
            ctx,
            "Your ticket topic exceeded 1024 characters. \
            Please keep the topic concise and further elaborate it in the ticket instead.",
        )
        .await;
    }

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let data = ctx.data();
    let config = &data.config;
    let author = ctx.author();
    let name = ticket_channel_name(author.id);

    let existing = guild_id
        .channels(ctx.http())
        .await?
        .into_values()
        .find(|c| c.name == name && c.parent_id == Some(config.categories.tickets));

    if let Some(existing) = existing {
        log::info!(
            "{} tried to create a new ticket but already had one open: {}",
            author.name,
            existing.id
        );
        return error_message(
            ctx,
            format!("You already have a ticket open! {}", existing.mention()),
        )
        .await;
    }

    let overwrites = vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(config.roles.trial_mod),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(config.roles.staff),
        },
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(guild_id.everyone_role()),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(author.id),
        },
    ];

    let channel = guild_id
        .create_channel(
            ctx.serenity_context(),
            CreateChannel::new(&name)
                .kind(ChannelType::Text)
                .category(config.categories.tickets)
                .topic(&topic)
                .permissions(overwrites),
        )
        .await?;

    let is_vip = ctx
        .author_member()
        .await
        .is_some_and(|m| m.roles.contains(&config.roles.vip));

    if is_vip {
        channel
            .id
            .say(ctx.http(), config.roles.staff.mention().to_string())
            .await?;
    }

    channel
        .id
        .send_message(
            ctx.http(),
            CreateMessage::new().embed(
                make_embed(author)
                    .title("🎫  Ticket created")
                    .description("Please remain patient for a staff member to assist you.")
                    .field("Ticket Creator:", author.mention().to_string(), false)
                    .field("Ticket Topic:", &topic, false),
            ),
        )
        .await?;

    tickets::open(&data.pool, author.id, guild_id, &topic).await?;

    // Mentions inside embeds don't ping
    let ping = channel.id.say(ctx.http(), author.mention().to_string()).await?;
    ping.delete(ctx.serenity_context()).await?;

    ctx.send(
        CreateReply::default()
            .embed(
                make_embed(author)
                    .title("Created a ticket")
                    .description(format!("Opened a ticket: {} for: {}.", channel.mention(), topic)),
            )
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Closes a ticket when sent in the ticket channel
#[poise::command(slash_command, guild_only, check = "crate::binutils::is_staff")]
pub async fn close(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let data = ctx.data();
    let config = &data.config;

    let channel = match ctx.guild_channel().await {
        Some(channel) if is_ticket_channel(&channel, config.categories.tickets) => channel,
        _ => {
            return error_message(ctx, "You can only run this command in active ticket channels.")
                .await
        }
    };

    let Some(creator_id) = ticket_creator(&channel.name) else {
        return error_message(ctx, "Could not find the creator of this ticket.").await;
    };

    let open_ticket = tickets::find_open(&data.pool, creator_id).await?;

    let topic = channel
        .topic
        .clone()
        .or_else(|| open_ticket.as_ref().map(|t| t.ticket_topic.clone()))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "No topic provided.".to_string());

    let creator = creator_id.to_user(ctx.serenity_context()).await?;

    let mut transcript = transcript_header(&creator.tag(), creator.id, &topic);

    // Oldest message last, the transcript wants them oldest first
    let mut messages = Vec::new();
    let mut stream = channel.id.messages_iter(ctx.http()).boxed();
    while let Some(message) = stream.next().await {
        messages.push(message?);
    }
    messages.reverse();

    let mut authors = HashSet::new();
    for message in messages.iter().filter(|m| !m.author.bot) {
        let mut content = message.content.clone();
        for attachment in &message.attachments {
            content.push(' ');
            content.push_str(&attachment.url);
        }

        transcript.push_str(&transcript_line(
            message.timestamp.unix_timestamp(),
            &message.author.tag(),
            &content,
        ));

        authors.insert(message.author.id);
    }

    let mut moderators = Vec::new();
    for author_id in authors {
        // Authors that left the server can't be staff
        let Ok(member) = guild_id.member(ctx.serenity_context(), author_id).await else {
            continue;
        };

        if member.roles.contains(&config.roles.staff)
            || member.roles.contains(&config.roles.trial_mod)
        {
            moderators.push(member.mention().to_string());
        }
    }

    if moderators.is_empty() {
        moderators.push(ctx.cache().current_user().id.mention().to_string());
    }

    let archive = CreateMessage::new()
        .embed(
            CreateEmbed::new()
                .title(format!("{} archived", channel.name))
                .color(TICKET_ARCHIVE)
                .timestamp(serenity::all::Timestamp::now())
                .field("Ticket Creator:", creator.mention().to_string(), true)
                .field("Closed By:", ctx.author().mention().to_string(), true)
                .field("Ticket Topic:", &topic, false)
                .field(
                    "Participating Moderators:",
                    join_capped(&moderators, " ", MAX_FIELD_LENGTH),
                    false,
                ),
        )
        .add_file(CreateAttachment::bytes(
            transcript.into_bytes(),
            format!("{}.txt", channel.name),
        ));

    let archived = config
        .channels
        .ticket_log
        .send_message(ctx.http(), archive)
        .await?;

    let Some(log_url) = archived.attachments.first().map(|a| a.url.clone()) else {
        return Err("The ticket log was sent without its transcript".into());
    };

    let dm = make_dm_embed(
        "Ticket closed",
        "Your ticket was closed. \
        Please feel free to create a new ticket should you have any further inquiries.",
        TICKET_ARCHIVE,
    )
    .field(
        "Server:",
        format!(
            "[{}]({})",
            ctx.guild().map(|g| g.name.clone()).unwrap_or_default(),
            config.meta.server_invite
        ),
        false,
    )
    .field("Ticket Log:", &log_url, false);

    if let Err(e) = creator
        .direct_message(ctx.serenity_context(), CreateMessage::new().embed(dm))
        .await
    {
        log::info!(
            "Attempted to send ticket log DM to {} but they are not accepting DMs: {}",
            username(&creator),
            e
        );
    }

    match open_ticket {
        Some(ticket) => tickets::complete(&data.pool, ticket.id, &log_url).await?,
        None => {
            tickets::insert_completed(&data.pool, creator_id, guild_id, &topic, &log_url).await?;
        }
    }

    ctx.send(CreateReply::default().content("Closing ticket...")).await?;

    channel.delete(ctx.serenity_context()).await?;

    Ok(())
}
