use sqlx::SqlitePool;

use crate::db::now_timestamp;
use crate::models::{Goal, NewGoalRequest, UpdateGoalRequest};

const GOAL_COLUMNS: &str =
    "id, user_id, goal_type, target_value, target_unit, period, description, is_active, created_at";

pub async fn fetch_goals(db: &SqlitePool, user_id: &str) -> Result<Vec<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_goal(db: &SqlitePool, user_id: &str, id: i64) -> Result<Option<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Most recently created active goal of `goal_type`.
pub async fn find_active_goal(
    db: &SqlitePool,
    user_id: &str,
    goal_type: &str,
) -> Result<Option<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals
         WHERE user_id = ? AND goal_type = ? AND is_active = 1
         ORDER BY id DESC LIMIT 1"
    ))
    .bind(user_id)
    .bind(goal_type)
    .fetch_optional(db)
    .await
}

pub async fn insert_goal(
    db: &SqlitePool,
    user_id: &str,
    req: NewGoalRequest,
) -> Result<Goal, sqlx::Error> {
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO goals
            (user_id, goal_type, target_value, target_unit, period, description, is_active, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(user_id)
    .bind(&req.goal_type)
    .bind(req.target_value)
    .bind(&req.target_unit)
    .bind(&req.period)
    .bind(&req.description)
    .bind(req.is_active)
    .bind(&now)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(Goal {
        id,
        user_id: user_id.to_string(),
        goal_type: req.goal_type,
        target_value: req.target_value,
        target_unit: req.target_unit,
        period: req.period,
        description: req.description,
        is_active: req.is_active,
        created_at: now,
    })
}

pub async fn update_goal(
    db: &SqlitePool,
    user_id: &str,
    id: i64,
    req: UpdateGoalRequest,
) -> Result<Option<Goal>, sqlx::Error> {
    let mut current = match find_goal(db, user_id, id).await? {
        Some(g) => g,
        None => return Ok(None),
    };

    if let Some(goal_type) = req.goal_type {
        current.goal_type = goal_type;
    }
    if let Some(target_value) = req.target_value {
        current.target_value = target_value;
    }
    if let Some(target_unit) = req.target_unit {
        current.target_unit = target_unit;
    }
    if let Some(period) = req.period {
        current.period = period;
    }
    if let Some(description) = req.description {
        current.description = Some(description);
    }
    if let Some(is_active) = req.is_active {
        current.is_active = is_active;
    }

    sqlx::query(
        r#"
        UPDATE goals
        SET goal_type = ?1,
            target_value = ?2,
            target_unit = ?3,
            period = ?4,
            description = ?5,
            is_active = ?6
        WHERE id = ?7 AND user_id = ?8
        "#,
    )
    .bind(&current.goal_type)
    .bind(current.target_value)
    .bind(&current.target_unit)
    .bind(&current.period)
    .bind(&current.description)
    .bind(current.is_active)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_goal(db: &SqlitePool, user_id: &str, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM goals WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
