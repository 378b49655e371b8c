use std::collections::HashMap;

use serenity::all::{Member, RoleId, UserId};

use crate::{Context, Error};

/// Position of a member's highest role. `None` (no known role) ranks below every role
pub type Rank = Option<u16>;

/// The parts of a guild member the action check looks at
pub trait Moderatable {
    fn highest_role_rank(&self) -> Rank;
    fn is_bot(&self) -> bool;
    fn is_guild_owner(&self) -> bool;
}

/// Returns whether `actor` may perform a moderative action (ban, kick, mute...) on `target`
///
/// `bot` is the bot's own member in the guild. The checks run in a fixed order:
/// bots are never actionable, the bot must outrank the target, the guild owner
/// is always actionable past that point and otherwise the actor must outrank the target
pub fn can_action_member(
    actor: &impl Moderatable,
    target: &impl Moderatable,
    bot: &impl Moderatable,
) -> bool {
    // Stop mods from actioning on bots
    if target.is_bot() {
        return false;
    }

    // The bot can't enforce anything on members at or above its own role
    if target.highest_role_rank() >= bot.highest_role_rank() {
        return false;
    }

    if target.is_guild_owner() {
        return true;
    }

    // Prevents mods from actioning other mods
    if actor.highest_role_rank() <= target.highest_role_rank() {
        return false;
    }

    true
}

/// Snapshot of a member taken from the guild cache
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MemberRank {
    pub rank: Rank,
    pub bot: bool,
    pub owner: bool,
}

impl MemberRank {
    /// `positions` maps every role of the guild to its position in the hierarchy
    pub fn new(positions: &HashMap<RoleId, u16>, owner_id: UserId, member: &Member) -> Self {
        Self {
            rank: highest_rank(&member.roles, positions),
            bot: member.user.bot,
            owner: member.user.id == owner_id,
        }
    }
}

impl Moderatable for MemberRank {
    fn highest_role_rank(&self) -> Rank {
        self.rank
    }

    fn is_bot(&self) -> bool {
        self.bot
    }

    fn is_guild_owner(&self) -> bool {
        self.owner
    }
}

/// Highest position among `roles`, ignoring roles the guild doesn't know about
pub fn highest_rank(roles: &[RoleId], positions: &HashMap<RoleId, u16>) -> Rank {
    roles.iter().filter_map(|r| positions.get(r).copied()).max()
}

/// Checks whether the author of `ctx` may action `target` in the current guild
pub async fn can_action(ctx: &Context<'_>, target: &Member) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Err("This command can only be used in a guild".into());
    };

    let Some(author) = ctx.author_member().await else {
        return Err("Message author not found".into());
    };
    let author = author.into_owned();

    let bot_id = ctx.cache().current_user().id;
    let bot = guild_id.member(ctx.serenity_context(), bot_id).await?;

    let (positions, owner_id) = {
        let Some(guild) = ctx.guild() else {
            return Err("Guild not found in cache".into());
        };

        (
            guild
                .roles
                .iter()
                .map(|(id, role)| (*id, role.position))
                .collect::<HashMap<_, _>>(),
            guild.owner_id,
        )
    };

    let allowed = can_action_member(
        &MemberRank::new(&positions, owner_id, &author),
        &MemberRank::new(&positions, owner_id, target),
        &MemberRank::new(&positions, owner_id, &bot),
    );

    if !allowed {
        log::info!(
            "{} ({}) is not allowed to action {} ({})",
            author.user.name,
            author.user.id,
            target.user.name,
            target.user.id
        );
    }

    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(rank: u16) -> MemberRank {
        MemberRank {
            rank: Some(rank),
            bot: false,
            owner: false,
        }
    }

    #[test]
    fn equal_rank_is_denied() {
        assert!(!can_action_member(&member(5), &member(5), &member(10)));
    }

    #[test]
    fn higher_actor_is_allowed() {
        assert!(can_action_member(&member(6), &member(5), &member(10)));
    }

    #[test]
    fn lower_actor_is_denied() {
        assert!(!can_action_member(&member(4), &member(5), &member(10)));
    }

    #[test]
    fn bots_are_never_actionable() {
        let target = MemberRank {
            bot: true,
            ..member(1)
        };
        assert!(!can_action_member(&member(100), &target, &member(200)));
    }

    #[test]
    fn owner_skips_actor_rank() {
        let target = MemberRank {
            owner: true,
            ..member(5)
        };
        assert!(can_action_member(&member(1), &target, &member(10)));
    }

    #[test]
    fn bot_rank_check_comes_before_owner_override() {
        let target = MemberRank {
            owner: true,
            ..member(10)
        };
        assert!(!can_action_member(&member(50), &target, &member(10)));
        assert!(!can_action_member(&member(50), &member(11), &member(10)));
    }

    #[test]
    fn missing_rank_is_lowest() {
        let unranked = MemberRank {
            rank: None,
            bot: false,
            owner: false,
        };

        assert!(can_action_member(&member(0), &unranked, &member(10)));
        assert!(!can_action_member(&unranked, &member(0), &member(10)));
        assert!(!can_action_member(&member(5), &unranked, &unranked));
    }

    #[test]
    fn highest_rank_ignores_unknown_roles() {
        let positions = HashMap::from([(RoleId::new(1), 3), (RoleId::new(2), 7)]);

        assert_eq!(
            highest_rank(&[RoleId::new(1), RoleId::new(2), RoleId::new(99)], &positions),
            Some(7)
        );
        assert_eq!(highest_rank(&[RoleId::new(99)], &positions), None);
        assert_eq!(highest_rank(&[], &positions), None);
    }
}
