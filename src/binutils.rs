use crate::{Context, Data, Error};
use log::error;

fn invite_button(ctx: Context<'_>) -> serenity::all::CreateActionRow {
    serenity::all::CreateActionRow::Buttons(vec![serenity::all::CreateButton::new_link(
        &ctx.data().config.meta.server_invite,
    )
    .label("Server Invite")])
}

/// Standard error handler for chiya
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error,);

            let err = ctx
                .send(
                    poise::CreateReply::default().embed(
                        serenity::all::CreateEmbed::new()
                            .color(serenity::all::Color::RED)
                            .title("An error has occurred")
                            .description(error.to_string()),
                    ),
                )
                .await;

            if let Err(e) = err {
                error!("Message send error for FrameworkError::Command: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            error!(
                "[Possible] error in command `{}`: {:?}",
                ctx.command().qualified_name,
                error,
            );

            let description = match error {
                Some(error) => error.to_string(),
                None => "You do not have permission to run this command.".to_string(),
            };

            let err = ctx
                .send(
                    poise::CreateReply::default()
                        .embed(
                            serenity::all::CreateEmbed::new()
                                .color(serenity::all::Color::RED)
                                .title("Command Check Failed")
                                .description(description),
                        )
                        .ephemeral(true),
                )
                .await;

            if let Err(e) = err {
                error!(
                    "Message send error for FrameworkError::CommandCheckFailed: {}",
                    e
                );
            }
        }
        poise::FrameworkError::CommandPanic { payload, ctx, .. } => {
            error!(
                "Command `{}` panicked: {:?}",
                ctx.command().qualified_name,
                payload,
            );

            let err = ctx
                .send(
                    poise::CreateReply::default()
                    .embed(
                        serenity::all::CreateEmbed::new()
                            .color(serenity::all::Color::RED)
                            .title("Command Panic")
                            .description(format!("The command panicked. Please let the server staff know.\n\n```{}```", payload.unwrap_or("No payload provided".to_string()))),
                    )
                    .components(vec![invite_button(ctx)]),
                )
                .await;

            if let Err(e) = err {
                error!("Message send error for FrameworkError::CommandPanic: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Whether the author may use staff commands: holds the staff or trial mod role, or owns the guild
pub async fn is_staff(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be run from servers".into());
    };

    let roles = &ctx.data().config.roles;

    let Some(member) = ctx.author_member().await else {
        return Err("Could not find you in this server".into());
    };

    if member.roles.contains(&roles.staff) || member.roles.contains(&roles.trial_mod) {
        return Ok(true);
    }

    let owner_id = ctx.guild().map(|g| g.owner_id);

    let owner_id = match owner_id {
        Some(owner_id) => owner_id,
        None => guild_id.to_partial_guild(ctx.http()).await?.owner_id,
    };

    Ok(owner_id == member.user.id)
}
