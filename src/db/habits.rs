use sqlx::SqlitePool;

use crate::db::now_timestamp;
use crate::models::{Habit, HabitLog, NewHabitRequest, UpdateHabitRequest};

const HABIT_COLUMNS: &str = "id, name, description, target_frequency, color, created_at";

pub async fn fetch_habits(db: &SqlitePool, user_id: &str) -> Result<Vec<Habit>, sqlx::Error> {
    sqlx::query_as::<_, Habit>(&format!(
        "SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_habit(
    db: &SqlitePool,
    user_id: &str,
    id: i64,
) -> Result<Option<Habit>, sqlx::Error> {
    sqlx::query_as::<_, Habit>(&format!(
        "SELECT {HABIT_COLUMNS} FROM habits WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_habit(
    db: &SqlitePool,
    user_id: &str,
    req: NewHabitRequest,
) -> Result<Habit, sqlx::Error> {
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO habits (user_id, name, description, target_frequency, color, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.target_frequency)
    .bind(&req.color)
    .bind(&now)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(Habit {
        id,
        name: req.name,
        description: req.description,
        target_frequency: req.target_frequency,
        color: req.color,
        created_at: now,
    })
}

pub async fn update_habit(
    db: &SqlitePool,
    user_id: &str,
    id: i64,
    req: UpdateHabitRequest,
) -> Result<Option<Habit>, sqlx::Error> {
    let mut current = match find_habit(db, user_id, id).await? {
        Some(h) => h,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(description) = req.description {
        current.description = Some(description);
    }
    if let Some(target_frequency) = req.target_frequency {
        current.target_frequency = target_frequency;
    }
    if let Some(color) = req.color {
        current.color = color;
    }

    sqlx::query(
        r#"
        UPDATE habits
        SET name = ?1,
            description = ?2,
            target_frequency = ?3,
            color = ?4
        WHERE id = ?5 AND user_id = ?6
        "#,
    )
    .bind(&current.name)
    .bind(&current.description)
    .bind(current.target_frequency)
    .bind(&current.color)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_habit(db: &SqlitePool, user_id: &str, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM habits WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// `completed_date` must already be in stored form.
pub async fn insert_log(
    db: &SqlitePool,
    habit_id: i64,
    completed_date: &str,
    notes: Option<String>,
) -> Result<HabitLog, sqlx::Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO habit_logs (habit_id, completed_date, notes, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(habit_id)
    .bind(completed_date)
    .bind(&notes)
    .bind(now_timestamp())
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(HabitLog {
        id,
        habit_id,
        completed_date: completed_date.to_string(),
        notes,
    })
}

pub async fn fetch_logs_for_habit(
    db: &SqlitePool,
    habit_id: i64,
) -> Result<Vec<HabitLog>, sqlx::Error> {
    sqlx::query_as::<_, HabitLog>(
        "SELECT id, habit_id, completed_date, notes FROM habit_logs
         WHERE habit_id = ? ORDER BY completed_date, id",
    )
    .bind(habit_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_logs_for_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<HabitLog>, sqlx::Error> {
    sqlx::query_as::<_, HabitLog>(
        "SELECT l.id, l.habit_id, l.completed_date, l.notes
         FROM habit_logs l JOIN habits h ON h.id = l.habit_id
         WHERE h.user_id = ?
         ORDER BY l.completed_date, l.id",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Logs of the user's habits completed in `[start, end)`.
pub async fn fetch_logs_between(
    db: &SqlitePool,
    user_id: &str,
    start: &str,
    end: &str,
) -> Result<Vec<HabitLog>, sqlx::Error> {
    sqlx::query_as::<_, HabitLog>(
        "SELECT l.id, l.habit_id, l.completed_date, l.notes
         FROM habit_logs l JOIN habits h ON h.id = l.habit_id
         WHERE h.user_id = ? AND l.completed_date >= ? AND l.completed_date < ?
         ORDER BY l.completed_date, l.id",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

pub async fn find_log_for_user(
    db: &SqlitePool,
    user_id: &str,
    log_id: i64,
) -> Result<Option<HabitLog>, sqlx::Error> {
    sqlx::query_as::<_, HabitLog>(
        "SELECT l.id, l.habit_id, l.completed_date, l.notes
         FROM habit_logs l JOIN habits h ON h.id = l.habit_id
         WHERE l.id = ? AND h.user_id = ?",
    )
    .bind(log_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn delete_log(db: &SqlitePool, log_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM habit_logs WHERE id = ?")
        .bind(log_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
