mod automod;
mod boosters;
mod general;
mod moderation;
mod ping;
mod server;
mod stats;
mod tickets;

pub fn raw_commands() -> Vec<crate::Command> {
    vec![
        stats::stats(),
        ping::ping(),
        general::pfp(),
        general::userinfo(),
        moderation::ban(),
        moderation::unban(),
        moderation::kick(),
        moderation::warn(),
        moderation::mute(),
        moderation::unmute(),
        moderation::modlogs(),
        tickets::ticket(),
        tickets::close(),
        automod::automod(),
        boosters::boosters(),
        server::server(),
    ]
}
