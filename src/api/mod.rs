mod goals;
mod groups;
mod habits;
mod insights;
mod study;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use axum::routing::{delete, post, put};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/subjects", get(study::list_subjects).post(study::create_subject))
        .route(
            "/subjects/{id}",
            put(study::update_subject).delete(study::delete_subject),
        )
        .route(
            "/study-sessions",
            get(study::list_sessions).post(study::create_session),
        )
        .route(
            "/study-sessions/{id}",
            put(study::update_session).delete(study::delete_session),
        )
        .route("/habits", get(habits::list_habits).post(habits::create_habit))
        .route(
            "/habits/{id}",
            get(habits::get_habit)
                .put(habits::update_habit)
                .delete(habits::delete_habit),
        )
        .route(
            "/habits/{id}/logs",
            get(habits::list_habit_logs).post(habits::create_habit_log),
        )
        .route("/habit-logs", get(habits::list_all_logs))
        .route("/habit-logs/{id}", delete(habits::delete_habit_log))
        .route("/dashboard/summary", get(insights::dashboard_summary))
        .route("/dashboard/weekly", get(insights::dashboard_weekly))
        .route("/analytics/study-stats", get(insights::study_stats))
        .route("/analytics/habit-completion", get(insights::habit_completion))
        .route("/analytics/correlation", get(insights::correlation))
        .route("/analytics/heatmap", get(insights::heatmap))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/join/{invite_code}", post(groups::join_group))
        .route("/groups/{id}/leaderboard", get(groups::leaderboard))
        .route("/groups/{id}/leave", delete(groups::leave_group))
        .route("/goals", get(goals::list_goals).post(goals::create_goal))
        .route(
            "/goals/{id}",
            get(goals::get_goal)
                .put(goals::update_goal)
                .delete(goals::delete_goal),
        )
        .route("/profile", get(goals::get_profile).put(goals::put_profile))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(e) => {
            warn!("invalid CORS origin {:?}: {}, cross-origin requests disabled", origin, e);
            layer
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Study Habit Tracker API!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}
