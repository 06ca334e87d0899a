use sqlx::SqlitePool;

use crate::db::now_timestamp;
use crate::models::{NewStudySessionRequest, StudySession, Subject, UpdateStudySessionRequest};

const SESSION_COLUMNS: &str =
    "id, subject_id, subject_name, duration_minutes, notes, created_at";

pub async fn fetch_sessions(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<StudySession>, sqlx::Error> {
    sqlx::query_as::<_, StudySession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Sessions created in `[start, end)`.
pub async fn fetch_sessions_between(
    db: &SqlitePool,
    user_id: &str,
    start: &str,
    end: &str,
) -> Result<Vec<StudySession>, sqlx::Error> {
    sqlx::query_as::<_, StudySession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM study_sessions
         WHERE user_id = ? AND created_at >= ? AND created_at < ?
         ORDER BY created_at"
    ))
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

pub async fn find_session(
    db: &SqlitePool,
    user_id: &str,
    id: i64,
) -> Result<Option<StudySession>, sqlx::Error> {
    sqlx::query_as::<_, StudySession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_session(
    db: &SqlitePool,
    user_id: &str,
    subject: &Subject,
    req: NewStudySessionRequest,
) -> Result<StudySession, sqlx::Error> {
    insert_session_at(db, user_id, subject, req, &now_timestamp()).await
}

pub async fn insert_session_at(
    db: &SqlitePool,
    user_id: &str,
    subject: &Subject,
    req: NewStudySessionRequest,
    created_at: &str,
) -> Result<StudySession, sqlx::Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO study_sessions
            (user_id, subject_id, subject_name, duration_minutes, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(user_id)
    .bind(subject.id)
    .bind(&subject.name)
    .bind(req.duration_minutes)
    .bind(&req.notes)
    .bind(created_at)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(StudySession {
        id,
        subject_id: Some(subject.id),
        subject_name: Some(subject.name.clone()),
        duration_minutes: req.duration_minutes,
        notes: req.notes,
        created_at: created_at.to_string(),
    })
}

/// `new_subject` is the already-validated subject when the request moves
/// the session to another subject.
pub async fn update_session(
    db: &SqlitePool,
    user_id: &str,
    id: i64,
    req: UpdateStudySessionRequest,
    new_subject: Option<&Subject>,
) -> Result<Option<StudySession>, sqlx::Error> {
    let mut current = match find_session(db, user_id, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(subject) = new_subject {
        current.subject_id = Some(subject.id);
        current.subject_name = Some(subject.name.clone());
    }
    if let Some(duration) = req.duration_minutes {
        current.duration_minutes = duration;
    }
    if let Some(notes) = req.notes {
        current.notes = Some(notes);
    }

    sqlx::query(
        r#"
        UPDATE study_sessions
        SET subject_id = ?1,
            subject_name = ?2,
            duration_minutes = ?3,
            notes = ?4
        WHERE id = ?5 AND user_id = ?6
        "#,
    )
    .bind(current.subject_id)
    .bind(&current.subject_name)
    .bind(current.duration_minutes)
    .bind(&current.notes)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_session(db: &SqlitePool, user_id: &str, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM study_sessions WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
