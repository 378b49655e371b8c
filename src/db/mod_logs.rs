use serenity::all::UserId;
use sqlx::SqlitePool;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ModAction {
    Ban,
    Unban,
    Kick,
    Warn,
    Mute,
    Unmute,
}

impl ModAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModAction::Ban => "ban",
            ModAction::Unban => "unban",
            ModAction::Kick => "kick",
            ModAction::Warn => "warn",
            ModAction::Mute => "mute",
            ModAction::Unmute => "unmute",
        }
    }
}

impl std::fmt::Display for ModAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the moderation case log
#[derive(sqlx::FromRow, Clone, Debug)]
pub struct ModLog {
    pub id: i64,
    pub mod_id: String,
    pub timestamp: i64,
    pub reason: String,
    #[sqlx(rename = "type")]
    pub action: String,
}

/// Records a moderation action taken by `moderator` against `user`
pub async fn record(
    pool: &SqlitePool,
    user: UserId,
    moderator: UserId,
    reason: &str,
    action: ModAction,
) -> Result<i64, crate::Error> {
    let res = sqlx::query(
        "INSERT INTO mod_logs (user_id, mod_id, timestamp, reason, type) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user.to_string())
    .bind(moderator.to_string())
    .bind(super::now())
    .bind(reason)
    .bind(action.as_str())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Every case recorded against `user`, newest first
pub async fn for_user(
    pool: &SqlitePool,
    user: UserId,
    limit: i64,
) -> Result<Vec<ModLog>, crate::Error> {
    let logs = sqlx::query_as::<_, ModLog>(
        "SELECT id, mod_id, timestamp, reason, type FROM mod_logs WHERE user_id = $1 ORDER BY timestamp DESC, id DESC LIMIT $2",
    )
    .bind(user.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_lists_cases() {
        let pool = crate::db::test_pool().await;

        let user = UserId::new(10);
        let moderator = UserId::new(20);

        record(&pool, user, moderator, "spam", ModAction::Warn)
            .await
            .unwrap();
        record(&pool, user, moderator, "more spam", ModAction::Kick)
            .await
            .unwrap();
        record(&pool, UserId::new(11), moderator, "other", ModAction::Ban)
            .await
            .unwrap();

        let logs = for_user(&pool, user, 25).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, "kick");
        assert_eq!(logs[0].reason, "more spam");
        assert_eq!(logs[1].action, "warn");
        assert_eq!(logs[1].mod_id, "20");

        assert_eq!(for_user(&pool, user, 1).await.unwrap().len(), 1);
    }
}
