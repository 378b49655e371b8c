use std::path::Path;

use serde::{Deserialize, Serialize};
use serenity::all::{ChannelId, GuildId, RoleId};

use crate::Error;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DiscordAuth {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Roles {
    pub staff: RoleId,
    pub trial_mod: RoleId,
    /// Ticket authors with this role get staff pinged on open
    pub vip: RoleId,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Channels {
    pub ticket_log: ChannelId,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Categories {
    pub tickets: ChannelId,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Meta {
    /// Invite link shown in DMs sent to actioned users
    pub server_invite: String,
    /// Where banned users can appeal, shown in the ban DM
    #[serde(default)]
    pub appeal_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub discord_auth: DiscordAuth,
    /// The guild commands are registered in
    pub guild_id: GuildId,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    pub roles: Roles,
    pub channels: Channels,
    pub categories: Categories,
    pub meta: Meta,
}

fn default_database_url() -> String {
    "sqlite://chiya.db?mode=rwc".to_string()
}

impl Config {
    pub fn from_yaml(s: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = std::fs::read_to_string(path)
            .map_err(|e| format!("Could not read config file {}: {}", path.display(), e))?;

        Self::from_yaml(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
discord_auth:
  token: "abc"
guild_id: 622243127435984927
roles:
  staff: 763031634379276308
  trial_mod: 729535437447757838
  vip: 809261905855643668
channels:
  ticket_log: 838819743894142976
categories:
  tickets: 832704547528523796
meta:
  server_invite: "https://discord.gg/piracy"
"#;

    #[test]
    fn parses_yaml_with_defaults() {
        let config = Config::from_yaml(CONFIG).unwrap();

        assert_eq!(config.guild_id, GuildId::new(622243127435984927));
        assert_eq!(config.roles.staff, RoleId::new(763031634379276308));
        assert_eq!(config.categories.tickets, ChannelId::new(832704547528523796));
        assert_eq!(config.database_url, "sqlite://chiya.db?mode=rwc");
        assert!(config.meta.appeal_url.is_none());
    }

    #[test]
    fn missing_sections_fail() {
        assert!(Config::from_yaml("discord_auth:\n  token: abc\n").is_err());
    }
}
