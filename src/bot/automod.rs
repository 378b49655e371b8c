use poise::CreateReply;
use serenity::all::{Mentionable, Role, User};

use crate::botlib::embeds::{
    error_message, make_embed, GOLD, MAX_FIELD_LENGTH, SOFT_GREEN, SOFT_RED,
};
use crate::botlib::helpers::{join_capped, truncate};
use crate::db::censors::{self, Censor, CensorType, DEFAULT_THRESHOLD};
use crate::{Context, Error};

/// Lines shown per page of `/automod term search`
const LINES_PER_PAGE: usize = 5;

const MAX_PAGE_SIZE: usize = 2000;

/// Longest term shown in listings
const MAX_TERM_DISPLAY: usize = 500;

const NO_SUCH_CENSOR: &str = "The censor with that ID does not exist!";

fn enabled_marker(enabled: bool) -> &'static str {
    if enabled {
        "✅"
    } else {
        "❌"
    }
}

/// One listing line per censor, grouped into pages of at most `MAX_PAGE_SIZE` characters
pub fn censor_pages(censors: &[Censor]) -> Vec<String> {
    let mut pages = Vec::new();
    let mut page = String::new();
    let mut lines = 0;

    for c in censors {
        let line = format!(
            "**ID: {}** | **{}** | {}\n```{}```",
            c.id,
            c.censor_type,
            enabled_marker(c.enabled),
            truncate(&c.display_term(), MAX_TERM_DISPLAY)
        );

        if lines == LINES_PER_PAGE || (lines > 0 && page.len() + 1 + line.len() > MAX_PAGE_SIZE)
        {
            pages.push(std::mem::take(&mut page));
            lines = 0;
        }

        if lines > 0 {
            page.push('\n');
        }
        page.push_str(&line);
        lines += 1;
    }

    if lines > 0 {
        pages.push(page);
    }

    pages
}

/// Validates a new censor, returning the trimmed term and the threshold to store
pub fn validate_censor(
    censor_type: CensorType,
    term: &str,
    threshold: Option<i64>,
) -> Result<(String, i64), Error> {
    let term = term.trim();

    if term.is_empty() {
        return Err("The censor term cannot be empty!".into());
    }

    let threshold = match threshold {
        Some(t) if t > 0 => t,
        _ => DEFAULT_THRESHOLD,
    };

    match censor_type {
        CensorType::Fuzzy if threshold > 100 => {
            Err("Fuzziness threshold must be between 1 and 100!".into())
        }
        CensorType::Regex => match regex::Regex::new(term) {
            Ok(_) => Ok((term.to_string(), threshold)),
            Err(e) => Err(format!("That is not a valid regex: {}", e).into()),
        },
        _ => Ok((term.to_string(), threshold)),
    }
}

/// Adds `id` to an exclusion list, fails if it is already there
pub fn add_exclusion(list: &[u64], id: u64) -> Option<Vec<u64>> {
    if list.contains(&id) {
        return None;
    }

    let mut list = list.to_vec();
    list.push(id);
    Some(list)
}

/// Removes `id` from an exclusion list, fails if it isn't there
pub fn remove_exclusion(list: &[u64], id: u64) -> Option<Vec<u64>> {
    if !list.contains(&id) {
        return None;
    }

    Some(list.iter().copied().filter(|i| *i != id).collect())
}

async fn find_censor(ctx: Context<'_>, id: i64) -> Result<Option<Censor>, Error> {
    let censor = censors::find(&ctx.data().pool, id).await?;

    if censor.is_none() {
        error_message(ctx, NO_SUCH_CENSOR).await?;
    }

    Ok(censor)
}

async fn refresh_cache(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    data.censors.refresh(&data.pool).await
}

async fn reply(
    ctx: Context<'_>,
    title: Option<&str>,
    description: String,
    color: serenity::all::Color,
) -> Result<(), Error> {
    let mut embed = make_embed(ctx.author()).description(description).color(color);

    if let Some(title) = title {
        embed = embed.title(title);
    }

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Automod term management
#[poise::command(
    slash_command,
    guild_only,
    subcommands("term", "user_exclusion", "role_exclusion", "details")
)]
pub async fn automod(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Censored terms
#[poise::command(
    slash_command,
    guild_only,
    subcommands("term_search", "term_add", "term_enable", "term_disable", "term_delete")
)]
pub async fn term(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Searches and/or lists all the currently censored terms
#[poise::command(
    slash_command,
    guild_only,
    rename = "search",
    check = "crate::binutils::is_staff"
)]
pub async fn term_search(
    ctx: Context<'_>,
    #[description = "Term to search for (supports % and _ wildcards)"] search_term: Option<
        String,
    >,
    #[description = "The censor type"] censor_type: Option<CensorType>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let censors =
        censors::search(&ctx.data().pool, search_term.as_deref(), censor_type).await?;

    if censors.is_empty() {
        return reply(
            ctx,
            Some("Censored Terms"),
            "No censored terms found.".to_string(),
            GOLD,
        )
        .await;
    }

    let pages = censor_pages(&censors);
    let pages = pages.iter().map(|p| p.as_str()).collect::<Vec<_>>();

    poise::builtins::paginate(ctx, &pages).await?;

    Ok(())
}

/// Adds a term to the censor list
#[poise::command(
    slash_command,
    guild_only,
    rename = "add",
    check = "crate::binutils::is_staff"
)]
pub async fn term_add(
    ctx: Context<'_>,
    #[description = "The censor type"] censor_type: CensorType,
    #[description = "The censor term"] censor_term: String,
    #[description = "The censor threshold (only for fuzzy)"] censor_threshold: Option<i64>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let (term, threshold) = match validate_censor(censor_type, &censor_term, censor_threshold) {
        Ok(v) => v,
        Err(e) => return error_message(ctx, e.to_string()).await,
    };

    let id = censors::insert(&ctx.data().pool, &term, censor_type, threshold).await?;
    refresh_cache(ctx).await?;

    log::info!(
        "{} added censor {} ({}): {}",
        ctx.author().name,
        id,
        censor_type.as_str(),
        term
    );

    reply(
        ctx,
        None,
        format!(
            "Censor term `{}` of type `{}` was added.",
            term,
            censor_type.as_str()
        ),
        SOFT_GREEN,
    )
    .await
}

/// Shared body of enable/disable
async fn toggle(ctx: Context<'_>, id: i64, enabled: bool) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(censor) = find_censor(ctx, id).await? else {
        return Ok(());
    };

    censors::set_enabled(&ctx.data().pool, id, enabled).await?;
    refresh_cache(ctx).await?;

    let (state, color) = if enabled {
        ("enabled", SOFT_GREEN)
    } else {
        ("disabled", SOFT_RED)
    };

    reply(
        ctx,
        None,
        format!(
            "Term `{}` of type `{}` was {}.",
            censor.censor_term, censor.censor_type, state
        ),
        color,
    )
    .await
}

/// Enables a term from the censor list
#[poise::command(
    slash_command,
    guild_only,
    rename = "enable",
    check = "crate::binutils::is_staff"
)]
pub async fn term_enable(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
) -> Result<(), Error> {
    toggle(ctx, id, true).await
}

/// Disables a term from the censor list
#[poise::command(
    slash_command,
    guild_only,
    rename = "disable",
    check = "crate::binutils::is_staff"
)]
pub async fn term_disable(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
) -> Result<(), Error> {
    toggle(ctx, id, false).await
}

/// Deletes a term from the censor list
#[poise::command(
    slash_command,
    guild_only,
    rename = "delete",
    check = "crate::binutils::is_staff"
)]
pub async fn term_delete(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(censor) = find_censor(ctx, id).await? else {
        return Ok(());
    };

    censors::delete(&ctx.data().pool, id).await?;
    refresh_cache(ctx).await?;

    reply(
        ctx,
        None,
        format!(
            "Term `{}` of type `{}` was deleted.",
            censor.censor_term, censor.censor_type
        ),
        SOFT_RED,
    )
    .await
}

/// Users a censor doesn't apply to
#[poise::command(
    slash_command,
    guild_only,
    subcommands("user_exclusion_add", "user_exclusion_remove")
)]
pub async fn user_exclusion(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Excludes a user from an automod listing
#[poise::command(
    slash_command,
    guild_only,
    rename = "add",
    check = "crate::binutils::is_staff"
)]
pub async fn user_exclusion_add(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
    #[description = "The member that will be excluded"] excluded_user: User,
) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(censor) = find_censor(ctx, id).await? else {
        return Ok(());
    };

    let Some(users) = add_exclusion(&censor.excluded_users.0, excluded_user.id.get()) else {
        return error_message(
            ctx,
            format!("The user {} is already excluded!", excluded_user.mention()),
        )
        .await;
    };

    censors::set_excluded_users(&ctx.data().pool, id, &users).await?;
    refresh_cache(ctx).await?;

    reply(
        ctx,
        Some("User Excluded"),
        format!(
            "User {} was excluded from automod for the term `{}` of type `{}`.",
            excluded_user.mention(),
            censor.censor_term,
            censor.censor_type
        ),
        SOFT_GREEN,
    )
    .await
}

/// Removes the exclusion of a user from an automod listing
#[poise::command(
    slash_command,
    guild_only,
    rename = "remove",
    check = "crate::binutils::is_staff"
)]
pub async fn user_exclusion_remove(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
    #[description = "The member whose exclusion will be removed"] unexcluded_user: User,
) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(censor) = find_censor(ctx, id).await? else {
        return Ok(());
    };

    let Some(users) = remove_exclusion(&censor.excluded_users.0, unexcluded_user.id.get())
    else {
        return error_message(
            ctx,
            format!("The user {} isn't excluded!", unexcluded_user.mention()),
        )
        .await;
    };

    censors::set_excluded_users(&ctx.data().pool, id, &users).await?;
    refresh_cache(ctx).await?;

    reply(
        ctx,
        Some("User Exclusion Removed"),
        format!(
            "User {}'s exclusion from automod for the term `{}` of type `{}` was removed.",
            unexcluded_user.mention(),
            censor.censor_term,
            censor.censor_type
        ),
        SOFT_RED,
    )
    .await
}

/// Roles a censor doesn't apply to
#[poise::command(
    slash_command,
    guild_only,
    subcommands("role_exclusion_add", "role_exclusion_remove")
)]
pub async fn role_exclusion(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

#[poise::command(
    slash_command,
    guild_only,
    rename = "add",
    check = "crate::binutils::is_staff"
)]
pub async fn role_exclusion_add(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
    #[description = "The role that will be excluded"] excluded_role: Role,
) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(censor) = find_censor(ctx, id).await? else {
        return Ok(());
    };

    let Some(roles) = add_exclusion(&censor.excluded_roles.0, excluded_role.id.get()) else {
        return error_message(
            ctx,
            format!("The role {} is already excluded!", excluded_role.mention()),
        )
        .await;
    };

    censors::set_excluded_roles(&ctx.data().pool, id, &roles).await?;
    refresh_cache(ctx).await?;

    reply(
        ctx,
        Some("Role Excluded"),
        format!(
            "Role {} was excluded from automod for the term `{}` of type `{}`.",
            excluded_role.mention(),
            censor.censor_term,
            censor.censor_type
        ),
        SOFT_GREEN,
    )
    .await
}

#[poise::command(
    slash_command,
    guild_only,
    rename = "remove",
    check = "crate::binutils::is_staff"
)]
pub async fn role_exclusion_remove(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
    #[description = "The role whose exclusion will be removed"] unexcluded_role: Role,
) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(censor) = find_censor(ctx, id).await? else {
        return Ok(());
    };

    let Some(roles) = remove_exclusion(&censor.excluded_roles.0, unexcluded_role.id.get())
    else {
        return error_message(
            ctx,
            format!("The role {} isn't excluded!", unexcluded_role.mention()),
        )
        .await;
    };

    censors::set_excluded_roles(&ctx.data().pool, id, &roles).await?;
    refresh_cache(ctx).await?;

    reply(
        ctx,
        Some("Role Exclusion Removed"),
        format!(
            "Role {}'s exclusion was removed from automod for the term `{}` of type `{}`.",
            unexcluded_role.mention(),
            censor.censor_term,
            censor.censor_type
        ),
        SOFT_RED,
    )
    .await
}

/// Displays the advanced details for an automod listing
#[poise::command(slash_command, guild_only, check = "crate::binutils::is_staff")]
pub async fn details(
    ctx: Context<'_>,
    #[description = "ID of the censored term"] id: i64,
) -> Result<(), Error> {
    ctx.defer().await?;

    let Some(censor) = find_censor(ctx, id).await? else {
        return Ok(());
    };

    let mut embed = make_embed(ctx.author())
        .title("Automod Listing details")
        .color(GOLD)
        .description(format!(
            "**ID:** {} | **Censor Term:** `{}` | **Type:** {} | {}",
            censor.id,
            truncate(&censor.display_term(), MAX_TERM_DISPLAY),
            censor.censor_type,
            enabled_marker(censor.enabled)
        ));

    if !censor.excluded_users.0.is_empty() {
        embed = embed.field(
            "Excluded Users:",
            join_capped(
                &censor
                    .excluded_users
                    .0
                    .iter()
                    .map(|id| format!("<@{}>", id))
                    .collect::<Vec<_>>(),
                " ",
                MAX_FIELD_LENGTH,
            ),
            false,
        );
    }

    if !censor.excluded_roles.0.is_empty() {
        embed = embed.field(
            "Excluded Roles:",
            join_capped(
                &censor
                    .excluded_roles
                    .0
                    .iter()
                    .map(|id| format!("<@&{}>", id))
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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn censor(id: i64) -> Censor {
        Censor {
            id,
            censor_term: format!("term{}", id),
            censor_type: "exact".to_string(),
            censor_threshold: 65,
            enabled: id % 2 == 0,
            excluded_users: Json(vec![]),
            excluded_roles: Json(vec![]),
        }
    }

    #[test]
    fn pages_hold_five_censors() {
        let censors = (1..=11).map(censor).collect::<Vec<_>>();
        let pages = censor_pages(&censors);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].matches("**ID:").count(), 5);
        assert_eq!(pages[2].matches("**ID:").count(), 1);
        assert!(pages[0].starts_with("**ID: 1** | **exact** | ❌\n```term1```"));
        assert!(pages[0].contains("**ID: 2** | **exact** | ✅"));
    }

    #[test]
    fn pages_stay_under_size_limit() {
        let censors = (1..=5)
            .map(|id| Censor {
                censor_term: "x".repeat(1500),
                ..censor(id)
            })
            .collect::<Vec<_>>();
        let pages = censor_pages(&censors);

        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.len() <= MAX_PAGE_SIZE));
        assert_eq!(pages.iter().map(|p| p.matches("**ID:").count()).sum::<usize>(), 5);
        assert!(pages[0].contains("..."));
    }

    #[test]
    fn censor_validation() {
        assert_eq!(
            validate_censor(CensorType::Exact, "  word ", None).unwrap(),
            ("word".to_string(), DEFAULT_THRESHOLD)
        );
        assert_eq!(
            validate_censor(CensorType::Fuzzy, "word", Some(80)).unwrap().1,
            80
        );
        assert_eq!(
            validate_censor(CensorType::Fuzzy, "word", Some(0)).unwrap().1,
            DEFAULT_THRESHOLD
        );
        assert!(validate_censor(CensorType::Fuzzy, "word", Some(101)).is_err());
        assert!(validate_censor(CensorType::Regex, "a(b", None).is_err());
        assert!(validate_censor(CensorType::Regex, r"fr[e3]+", None).is_ok());
        assert!(validate_censor(CensorType::Substring, "   ", None).is_err());
    }

    #[test]
    fn exclusions() {
        assert_eq!(add_exclusion(&[1], 2), Some(vec![1, 2]));
        assert_eq!(add_exclusion(&[1, 2], 2), None);
        assert_eq!(remove_exclusion(&[1, 2], 1), Some(vec![2]));
        assert_eq!(remove_exclusion(&[2], 1), None);
    }
}
