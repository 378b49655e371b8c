use serenity::all::{GuildId, UserId};
use sqlx::SqlitePool;

pub const STATUS_IN_PROGRESS: &str = "in-progress";
pub const STATUS_COMPLETED: &str = "completed";

/// The parts of an open ticket needed to close it
#[derive(sqlx::FromRow, Clone, Debug)]
pub struct Ticket {
    pub id: i64,
    pub ticket_topic: String,
}

/// Records a freshly opened ticket
pub async fn open(
    pool: &SqlitePool,
    user: UserId,
    guild: GuildId,
    topic: &str,
) -> Result<i64, crate::Error> {
    let res = sqlx::query(
        "INSERT INTO tickets (user_id, status, guild, timestamp, ticket_topic, log_url) VALUES ($1, $2, $3, $4, $5, NULL)",
    )
    .bind(user.to_string())
    .bind(STATUS_IN_PROGRESS)
    .bind(guild.to_string())
    .bind(super::now())
    .bind(topic)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// The in-progress ticket of `user`, if any
pub async fn find_open(pool: &SqlitePool, user: UserId) -> Result<Option<Ticket>, crate::Error> {
    let ticket = sqlx::query_as::<_, Ticket>(
        "SELECT id, ticket_topic FROM tickets WHERE user_id = $1 AND status = $2 ORDER BY id DESC LIMIT 1",
    )
    .bind(user.to_string())
    .bind(STATUS_IN_PROGRESS)
    .fetch_optional(pool)
    .await?;

    Ok(ticket)
}

/// Marks a ticket as completed and stores where its transcript lives
pub async fn complete(pool: &SqlitePool, id: i64, log_url: &str) -> Result<(), crate::Error> {
    sqlx::query("UPDATE tickets SET status = $1, log_url = $2 WHERE id = $3")
        .bind(STATUS_COMPLETED)
        .bind(log_url)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Records a ticket that was closed without ever being written on open
pub async fn insert_completed(
    pool: &SqlitePool,
    user: UserId,
    guild: GuildId,
    topic: &str,
    log_url: &str,
) -> Result<i64, crate::Error> {
    let res = sqlx::query(
        "INSERT INTO tickets (user_id, status, guild, timestamp, ticket_topic, log_url) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(user.to_string())
    .bind(STATUS_COMPLETED)
    .bind(guild.to_string())
    .bind(super::now())
    .bind(topic)
    .bind(log_url)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_of(pool: &SqlitePool, id: i64) -> (String, Option<String>) {
        sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT status, log_url FROM tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn ticket_lifecycle() {
        let pool = crate::db::test_pool().await;
        let user = UserId::new(42);
        let guild = GuildId::new(1);

        assert!(find_open(&pool, user).await.unwrap().is_none());

        let id = open(&pool, user, guild, "help").await.unwrap();

        let ticket = find_open(&pool, user).await.unwrap().unwrap();
        assert_eq!(ticket.id, id);
        assert_eq!(ticket.ticket_topic, "help");
        assert_eq!(status_of(&pool, id).await, (STATUS_IN_PROGRESS.to_string(), None));

        complete(&pool, id, "https://cdn.example/log.txt")
            .await
            .unwrap();

        assert!(find_open(&pool, user).await.unwrap().is_none());

        assert_eq!(
            status_of(&pool, id).await,
            (
                STATUS_COMPLETED.to_string(),
                Some("https://cdn.example/log.txt".to_string())
            )
        );
    }

    #[tokio::test]
    async fn completed_insert_is_not_open() {
        let pool = crate::db::test_pool().await;
        let user = UserId::new(7);

        let id = insert_completed(&pool, user, GuildId::new(1), "old", "url")
            .await
            .unwrap();

        assert!(find_open(&pool, user).await.unwrap().is_none());
        assert_eq!(
            status_of(&pool, id).await,
            (STATUS_COMPLETED.to_string(), Some("url".to_string()))
        );
    }
}
