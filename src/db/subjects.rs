use sqlx::SqlitePool;

use crate::db::now_timestamp;
use crate::models::{NewSubjectRequest, Subject, UpdateSubjectRequest};

pub async fn fetch_subjects(db: &SqlitePool, user_id: &str) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "SELECT id, name, color, created_at FROM subjects WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_subject(
    db: &SqlitePool,
    user_id: &str,
    id: i64,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "SELECT id, name, color, created_at FROM subjects WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_subject(
    db: &SqlitePool,
    user_id: &str,
    req: NewSubjectRequest,
) -> Result<Subject, sqlx::Error> {
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO subjects (user_id, name, color, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.color)
    .bind(&now)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(Subject {
        id,
        name: req.name,
        color: req.color,
        created_at: now,
    })
}

pub async fn update_subject(
    db: &SqlitePool,
    user_id: &str,
    id: i64,
    req: UpdateSubjectRequest,
) -> Result<Option<Subject>, sqlx::Error> {
    let mut current = match find_subject(db, user_id, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(color) = req.color {
        current.color = color;
    }

    sqlx::query("UPDATE subjects SET name = ?1, color = ?2 WHERE id = ?3 AND user_id = ?4")
        .bind(&current.name)
        .bind(&current.color)
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

    // Keep the denormalized name on past sessions in step with the subject.
    sqlx::query("UPDATE study_sessions SET subject_name = ?1 WHERE subject_id = ?2")
        .bind(&current.name)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

pub async fn delete_subject(db: &SqlitePool, user_id: &str, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
