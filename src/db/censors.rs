use sqlx::types::Json;
use sqlx::SqlitePool;

/// Threshold used for new censors when none is given
pub const DEFAULT_THRESHOLD: i64 = 65;

#[derive(poise::ChoiceParameter, Clone, Copy, PartialEq, Eq, Debug)]
pub enum CensorType {
    #[name = "Exact"]
    Exact,
    #[name = "Substring"]
    Substring,
    #[name = "Regex"]
    Regex,
    #[name = "Links"]
    Links,
    #[name = "Fuzzy"]
    Fuzzy,
}

impl CensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CensorType::Exact => "exact",
            CensorType::Substring => "substring",
            CensorType::Regex => "regex",
            CensorType::Links => "links",
            CensorType::Fuzzy => "fuzzy",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(CensorType::Exact),
            "substring" => Some(CensorType::Substring),
            "regex" => Some(CensorType::Regex),
            "links" => Some(CensorType::Links),
            "fuzzy" => Some(CensorType::Fuzzy),
            _ => None,
        }
    }
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct Censor {
    pub id: i64,
    pub censor_term: String,
    pub censor_type: String,
    pub censor_threshold: i64,
    pub enabled: bool,
    pub excluded_users: Json<Vec<u64>>,
    pub excluded_roles: Json<Vec<u64>>,
}

impl Censor {
    /// Term as shown in listings, fuzzy censors carry their threshold
    pub fn display_term(&self) -> String {
        if self.censor_type == CensorType::Fuzzy.as_str() {
            format!("{} ({}%)", self.censor_term, self.censor_threshold)
        } else {
            self.censor_term.clone()
        }
    }
}

const SELECT: &str = "SELECT id, censor_term, censor_type, censor_threshold, enabled, excluded_users, excluded_roles FROM censor";

pub async fn insert(
    pool: &SqlitePool,
    term: &str,
    censor_type: CensorType,
    threshold: i64,
) -> Result<i64, crate::Error> {
    let res = sqlx::query(
        "INSERT INTO censor (censor_term, censor_type, censor_threshold, enabled, excluded_users, excluded_roles) VALUES ($1, $2, $3, TRUE, $4, $5)",
    )
    .bind(term)
    .bind(censor_type.as_str())
    .bind(threshold)
    .bind(Json(Vec::<u64>::new()))
    .bind(Json(Vec::<u64>::new()))
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Censor>, crate::Error> {
    let censor = sqlx::query_as::<_, Censor>(&format!("{} WHERE id = $1", SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(censor)
}

/// Lists censors, optionally filtered by a case-insensitive `LIKE` pattern and/or a type
pub async fn search(
    pool: &SqlitePool,
    pattern: Option<&str>,
    censor_type: Option<CensorType>,
) -> Result<Vec<Censor>, crate::Error> {
    let censors = sqlx::query_as::<_, Censor>(&format!(
        "{} WHERE ($1 IS NULL OR censor_term LIKE $1) AND ($2 IS NULL OR censor_type = $2) ORDER BY id",
        SELECT
    ))
    .bind(pattern)
    .bind(censor_type.map(|t| t.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(censors)
}

/// Every enabled censor, used to fill the censor cache
pub async fn enabled(pool: &SqlitePool) -> Result<Vec<Censor>, crate::Error> {
    let censors =
        sqlx::query_as::<_, Censor>(&format!("{} WHERE enabled = TRUE ORDER BY id", SELECT))
            .fetch_all(pool)
            .await?;

    Ok(censors)
}

pub async fn set_enabled(pool: &SqlitePool, id: i64, enabled: bool) -> Result<(), crate::Error> {
    sqlx::query("UPDATE censor SET enabled = $1 WHERE id = $2")
        .bind(enabled)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), crate::Error> {
    sqlx::query("DELETE FROM censor WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_excluded_users(
    pool: &SqlitePool,
    id: i64,
    users: &[u64],
) -> Result<(), crate::Error> {
    sqlx::query("UPDATE censor SET excluded_users = $1 WHERE id = $2")
        .bind(Json(users))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_excluded_roles(
    pool: &SqlitePool,
    id: i64,
    roles: &[u64],
) -> Result<(), crate::Error> {
    sqlx::query("UPDATE censor SET excluded_roles = $1 WHERE id = $2")
        .bind(Json(roles))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_toggle_delete() {
        let pool = crate::db::test_pool().await;

        let id = insert(&pool, "badword", CensorType::Exact, DEFAULT_THRESHOLD)
            .await
            .unwrap();

        let censor = find(&pool, id).await.unwrap().unwrap();
        assert_eq!(censor.censor_term, "badword");
        assert_eq!(censor.censor_type, "exact");
        assert!(censor.enabled);
        assert!(censor.excluded_users.0.is_empty());

        set_enabled(&pool, id, false).await.unwrap();
        assert!(!find(&pool, id).await.unwrap().unwrap().enabled);
        assert!(enabled(&pool).await.unwrap().is_empty());

        set_enabled(&pool, id, true).await.unwrap();
        assert_eq!(enabled(&pool).await.unwrap().len(), 1);

        delete(&pool, id).await.unwrap();
        assert!(find(&pool, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_filters() {
        let pool = crate::db::test_pool().await;

        insert(&pool, "BadWord", CensorType::Exact, 65).await.unwrap();
        insert(&pool, "badsite.com", CensorType::Links, 65)
            .await
            .unwrap();
        insert(&pool, "hello", CensorType::Fuzzy, 80).await.unwrap();

        assert_eq!(search(&pool, None, None).await.unwrap().len(), 3);
        assert_eq!(search(&pool, Some("bad%"), None).await.unwrap().len(), 2);
        assert_eq!(search(&pool, Some("badword"), None).await.unwrap().len(), 1);

        let links = search(&pool, Some("bad%"), Some(CensorType::Links))
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].censor_term, "badsite.com");

        let fuzzy = search(&pool, None, Some(CensorType::Fuzzy)).await.unwrap();
        assert_eq!(fuzzy[0].display_term(), "hello (80%)");
    }

    #[tokio::test]
    async fn exclusions_round_trip() {
        let pool = crate::db::test_pool().await;
        let id = insert(&pool, "x", CensorType::Substring, 65).await.unwrap();

        set_excluded_users(&pool, id, &[1, 2]).await.unwrap();
        set_excluded_roles(&pool, id, &[3]).await.unwrap();

        let censor = find(&pool, id).await.unwrap().unwrap();
        assert_eq!(censor.excluded_users.0, vec![1, 2]);
        assert_eq!(censor.excluded_roles.0, vec![3]);
    }

    #[test]
    fn censor_type_names() {
        for t in [
            CensorType::Exact,
            CensorType::Substring,
            CensorType::Regex,
            CensorType::Links,
            CensorType::Fuzzy,
        ] {
            assert_eq!(CensorType::from_db(t.as_str()), Some(t));
        }
        assert_eq!(CensorType::from_db("other"), None);
    }
}
