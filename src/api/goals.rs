use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::require_text;
use crate::auth::AuthUser;
use crate::db::{goals, profiles};
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{field} must be one of {}",
            allowed.join(", ")
        )))
    }
}

fn positive_target(target_value: i64) -> Result<(), AppError> {
    if target_value <= 0 {
        return Err(AppError::BadRequest(
            "target_value must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub(super) async fn list_goals(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Goal>>, AppError> {
    let goals = goals::fetch_goals(&state.db, &user.user_id).await?;
    Ok(Json(goals))
}

pub(super) async fn create_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), AppError> {
    one_of("goal_type", &req.goal_type, &GOAL_TYPES)?;
    one_of("target_unit", &req.target_unit, &GOAL_UNITS)?;
    one_of("period", &req.period, &GOAL_PERIODS)?;
    positive_target(req.target_value)?;

    let goal = goals::insert_goal(&state.db, &user.user_id, req).await?;
    state.cache.clear_user(&user.user_id);
    Ok((StatusCode::CREATED, Json(goal)))
}

pub(super) async fn get_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Goal>, AppError> {
    let goal = goals::find_goal(&state.db, &user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(goal))
}

pub(super) async fn update_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGoalRequest>,
) -> Result<Json<Goal>, AppError> {
    if let Some(goal_type) = &req.goal_type {
        one_of("goal_type", goal_type, &GOAL_TYPES)?;
    }
    if let Some(target_unit) = &req.target_unit {
        one_of("target_unit", target_unit, &GOAL_UNITS)?;
    }
    if let Some(period) = &req.period {
        one_of("period", period, &GOAL_PERIODS)?;
    }
    if let Some(target_value) = req.target_value {
        positive_target(target_value)?;
    }

    let goal = goals::update_goal(&state.db, &user.user_id, id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    state.cache.clear_user(&user.user_id);
    Ok(Json(goal))
}

pub(super) async fn delete_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if goals::delete_goal(&state.db, &user.user_id, id).await? {
        state.cache.clear_user(&user.user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

pub(super) async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Profile>, AppError> {
    let profile = profiles::find_profile(&state.db, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(profile))
}

pub(super) async fn put_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    require_text("email", &req.email)?;
    let profile = profiles::upsert_profile(&state.db, &user.user_id, req).await?;
    Ok(Json(profile))
}
