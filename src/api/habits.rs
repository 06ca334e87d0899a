use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::require_text;
use crate::auth::AuthUser;
use crate::db::{habits, normalize_timestamp};
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

fn validate_frequency(target_frequency: i64) -> Result<(), AppError> {
    if !(1..=7).contains(&target_frequency) {
        return Err(AppError::BadRequest(
            "target_frequency must be between 1 and 7".to_string(),
        ));
    }
    Ok(())
}

pub(super) async fn list_habits(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Habit>>, AppError> {
    let habits = habits::fetch_habits(&state.db, &user.user_id).await?;
    Ok(Json(habits))
}

pub(super) async fn create_habit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewHabitRequest>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    require_text("name", &req.name)?;
    validate_frequency(req.target_frequency)?;

    let habit = habits::insert_habit(&state.db, &user.user_id, req).await?;
    state.cache.clear_user(&user.user_id);
    Ok((StatusCode::CREATED, Json(habit)))
}

pub(super) async fn get_habit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Habit>, AppError> {
    let habit = habits::find_habit(&state.db, &user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(habit))
}

pub(super) async fn update_habit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateHabitRequest>,
) -> Result<Json<Habit>, AppError> {
    if let Some(name) = &req.name {
        require_text("name", name)?;
    }
    if let Some(target_frequency) = req.target_frequency {
        validate_frequency(target_frequency)?;
    }

    let habit = habits::update_habit(&state.db, &user.user_id, id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    state.cache.clear_user(&user.user_id);
    Ok(Json(habit))
}

pub(super) async fn delete_habit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if habits::delete_habit(&state.db, &user.user_id, id).await? {
        state.cache.clear_user(&user.user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

pub(super) async fn create_habit_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<NewHabitLogRequest>,
) -> Result<(StatusCode, Json<HabitLog>), AppError> {
    let habit = habits::find_habit(&state.db, &user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let completed_date = normalize_timestamp(&req.completed_date).ok_or_else(|| {
        AppError::BadRequest(format!("Invalid completed_date: {}", req.completed_date))
    })?;

    let log = habits::insert_log(&state.db, habit.id, &completed_date, req.notes).await?;
    state.cache.clear_user(&user.user_id);
    Ok((StatusCode::CREATED, Json(log)))
}

pub(super) async fn list_habit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HabitLog>>, AppError> {
    let habit = habits::find_habit(&state.db, &user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let logs = habits::fetch_logs_for_habit(&state.db, habit.id).await?;
    Ok(Json(logs))
}

pub(super) async fn list_all_logs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<HabitLog>>, AppError> {
    let logs = habits::fetch_logs_for_user(&state.db, &user.user_id).await?;
    Ok(Json(logs))
}

pub(super) async fn delete_habit_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let log = habits::find_log_for_user(&state.db, &user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;

    habits::delete_log(&state.db, log.id).await?;
    state.cache.clear_user(&user.user_id);
    Ok(StatusCode::NO_CONTENT)
}
