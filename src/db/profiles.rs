use sqlx::SqlitePool;

use crate::db::now_timestamp;
use crate::models::{Profile, UpsertProfileRequest};

pub async fn find_profile(db: &SqlitePool, user_id: &str) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "SELECT user_id, email, full_name, avatar_url, created_at, updated_at
         FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn upsert_profile(
    db: &SqlitePool,
    user_id: &str,
    req: UpsertProfileRequest,
) -> Result<Profile, sqlx::Error> {
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, email, full_name, avatar_url, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, NULL)
        ON CONFLICT(user_id) DO UPDATE SET
            email = excluded.email,
            full_name = excluded.full_name,
            avatar_url = excluded.avatar_url,
            updated_at = ?5
        "#,
    )
    .bind(user_id)
    .bind(&req.email)
    .bind(&req.full_name)
    .bind(&req.avatar_url)
    .bind(&now)
    .execute(db)
    .await?;

    find_profile(db, user_id)
        .await?
        .ok_or_else(|| sqlx::Error::RowNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect, connect_in_memory};

    #[tokio::test]
    async fn test_upsert_profile() {
        let pool = connect_in_memory().await.expect("Failed to create test db");

        let created = upsert_profile(
            &pool,
            "alice",
            UpsertProfileRequest {
                email: "alice@example.com".to_string(),
                full_name: None,
                avatar_url: None,
            },
        )
        .await
        .unwrap();
        assert!(created.updated_at.is_none());

        let updated = upsert_profile(
            &pool,
            "alice",
            UpsertProfileRequest {
                email: "alice@example.com".to_string(),
                full_name: Some("Alice".to_string()),
                avatar_url: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Alice"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_first_upserts_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("profiles.db").display());
        let pool = connect(&url).await.expect("Failed to create test db");

        let request = |name: &str| UpsertProfileRequest {
            email: "bob@example.com".to_string(),
            full_name: Some(name.to_string()),
            avatar_url: None,
        };
        let (first, second) = tokio::join!(
            upsert_profile(&pool, "bob", request("Bob")),
            upsert_profile(&pool, "bob", request("Robert")),
        );
        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.created_at, second.created_at);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = 'bob'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
