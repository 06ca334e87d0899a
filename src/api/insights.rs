use std::future::Future;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::auth::AuthUser;
use crate::cache::ResponseCache;
use crate::error::AppError;
use crate::services::{analytics, dashboard};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub(super) struct RangeParams {
    days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct HeatmapParams {
    year: Option<i32>,
    #[serde(default)]
    activity_type: analytics::ActivityType,
}

/// Serves `load` through the per-user response cache.
async fn cached_json<T, F>(
    state: &AppState,
    key: String,
    load: F,
) -> Result<Json<Value>, AppError>
where
    T: Serialize,
    F: Future<Output = Result<T, AppError>>,
{
    if let Some(hit) = state.cache.get(&key) {
        debug!("cache hit for {}", key);
        return Ok(Json(hit));
    }

    let value = serde_json::to_value(load.await?).map_err(|e| {
        error!("failed to serialize {}: {}", key, e);
        AppError::InternalServerError
    })?;
    state.cache.set(key, value.clone());
    Ok(Json(value))
}

fn days_param(params: &RangeParams) -> Vec<(&'static str, String)> {
    let days = params
        .days
        .unwrap_or(analytics::DEFAULT_DAYS)
        .clamp(1, analytics::MAX_DAYS);
    vec![("days", days.to_string())]
}

pub(super) async fn dashboard_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let key = ResponseCache::key(&user.user_id, "dashboard/summary", &[]);
    let today = Utc::now().date_naive();
    cached_json(
        &state,
        key,
        dashboard::summary(&state.db, &user.user_id, today, state.config.default_study_goal),
    )
    .await
}

pub(super) async fn dashboard_weekly(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let key = ResponseCache::key(&user.user_id, "dashboard/weekly", &[]);
    let today = Utc::now().date_naive();
    cached_json(&state, key, dashboard::weekly(&state.db, &user.user_id, today)).await
}

pub(super) async fn study_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>, AppError> {
    let key = ResponseCache::key(&user.user_id, "analytics/study-stats", &days_param(&params));
    let (from, to) = analytics::window(Utc::now().date_naive(), params.days);
    cached_json(&state, key, analytics::study_stats(&state.db, &user.user_id, from, to)).await
}

pub(super) async fn habit_completion(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>, AppError> {
    let key = ResponseCache::key(
        &user.user_id,
        "analytics/habit-completion",
        &days_param(&params),
    );
    let (from, to) = analytics::window(Utc::now().date_naive(), params.days);
    cached_json(
        &state,
        key,
        analytics::habit_completion(&state.db, &user.user_id, from, to),
    )
    .await
}

pub(super) async fn correlation(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>, AppError> {
    let key = ResponseCache::key(&user.user_id, "analytics/correlation", &days_param(&params));
    let (from, to) = analytics::window(Utc::now().date_naive(), params.days);
    cached_json(&state, key, analytics::correlation(&state.db, &user.user_id, from, to)).await
}

pub(super) async fn heatmap(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HeatmapParams>,
) -> Result<Json<Value>, AppError> {
    let year = analytics::check_heatmap_year(params.year.unwrap_or_else(|| Utc::now().year()))?;
    let activity = params.activity_type;
    let key = ResponseCache::key(
        &user.user_id,
        "analytics/heatmap",
        &[
            ("year", year.to_string()),
            ("activity_type", activity.as_str().to_string()),
        ],
    );
    cached_json(
        &state,
        key,
        analytics::heatmap(&state.db, &user.user_id, year, activity),
    )
    .await
}
