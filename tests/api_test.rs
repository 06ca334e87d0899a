use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use studyhabit::api::router;
use studyhabit::auth::unsigned_token;
use studyhabit::config::Config;
use studyhabit::db::connect_in_memory;
use studyhabit::state::AppState;

async fn test_app() -> Router {
    let pool = connect_in_memory().await.expect("Failed to create test db");
    router(AppState::new(pool, Config::default()))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", unsigned_token(user)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create_subject(app: &Router, user: &str, name: &str) -> i64 {
    let (status, subject) = call(
        app,
        "POST",
        "/subjects",
        Some(user),
        Some(json!({ "name": name, "color": "#3B82F6" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    subject["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_public_endpoints() {
    let app = test_app().await;

    let (status, body) = call(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Study Habit Tracker"));

    let (status, _) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/subjects").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/subjects")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_study_session_flow() {
    let app = test_app().await;
    let subject_id = create_subject(&app, "alice", "Maths").await;

    let (status, session) = call(
        &app,
        "POST",
        "/study-sessions",
        Some("alice"),
        Some(json!({ "subject_id": subject_id, "duration_minutes": 25 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["subject_name"], "Maths");
    assert_eq!(session["duration_minutes"], 25);

    let (status, _) = call(
        &app,
        "POST",
        "/study-sessions",
        Some("alice"),
        Some(json!({ "subject_id": subject_id, "duration_minutes": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, sessions) = call(&app, "GET", "/study-sessions", Some("alice"), None).await;
    assert_eq!(sessions.as_array().unwrap().len(), 1);

    let session_id = session["id"].as_i64().unwrap();
    let (status, updated) = call(
        &app,
        "PUT",
        &format!("/study-sessions/{session_id}"),
        Some("alice"),
        Some(json!({ "duration_minutes": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["duration_minutes"], 40);

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/study-sessions/{session_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let app = test_app().await;
    let subject_id = create_subject(&app, "alice", "Maths").await;

    let (_, subjects) = call(&app, "GET", "/subjects", Some("bob"), None).await;
    assert!(subjects.as_array().unwrap().is_empty());

    let (status, _) = call(
        &app,
        "POST",
        "/study-sessions",
        Some("bob"),
        Some(json!({ "subject_id": subject_id, "duration_minutes": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "DELETE", &format!("/subjects/{subject_id}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_habit_logs() {
    let app = test_app().await;

    let (status, habit) = call(
        &app,
        "POST",
        "/habits",
        Some("alice"),
        Some(json!({ "name": "Read" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(habit["target_frequency"], 7);
    assert_eq!(habit["color"], "#10B981");
    let habit_id = habit["id"].as_i64().unwrap();

    let (status, log) = call(
        &app,
        "POST",
        &format!("/habits/{habit_id}/logs"),
        Some("alice"),
        Some(json!({ "completed_date": "2026-10-17" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(log["completed_date"], "2026-10-17T00:00:00Z");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/habits/{habit_id}/logs"),
        Some("alice"),
        Some(json!({ "completed_date": "yesterday" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "GET",
        &format!("/habits/{habit_id}/logs"),
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let log_id = log["id"].as_i64().unwrap();
    let (status, _) = call(&app, "DELETE", &format!("/habit-logs/{log_id}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", &format!("/habit-logs/{log_id}"), Some("alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, logs) = call(&app, "GET", "/habit-logs", Some("alice"), None).await;
    assert!(logs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_follows_goal_and_invalidates_cache() {
    let app = test_app().await;

    let (status, summary) = call(&app, "GET", "/dashboard/summary", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["study_goal"], 180);
    assert_eq!(summary["study_today"], 0);

    let subject_id = create_subject(&app, "alice", "Maths").await;
    call(
        &app,
        "POST",
        "/study-sessions",
        Some("alice"),
        Some(json!({ "subject_id": subject_id, "duration_minutes": 45 })),
    )
    .await;
    let (status, _) = call(
        &app,
        "POST",
        "/goals",
        Some("alice"),
        Some(json!({ "goal_type": "daily_study", "target_value": 90, "period": "daily" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, summary) = call(&app, "GET", "/dashboard/summary", Some("alice"), None).await;
    assert_eq!(summary["study_goal"], 90);
    assert_eq!(summary["study_today"], 45);

    let (_, weekly) = call(&app, "GET", "/dashboard/weekly", Some("alice"), None).await;
    assert_eq!(weekly["labels"].as_array().unwrap().len(), 7);
    assert_eq!(weekly["study_data"][6], 45);
}

#[tokio::test]
async fn test_goal_validation() {
    let app = test_app().await;

    let (status, _) = call(
        &app,
        "POST",
        "/goals",
        Some("alice"),
        Some(json!({ "goal_type": "yearly_study", "target_value": 90, "period": "daily" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/goals",
        Some("alice"),
        Some(json!({ "goal_type": "weekly_habit", "target_value": 0, "period": "weekly" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_group_membership_rules() {
    let app = test_app().await;

    let (status, group) = call(
        &app,
        "POST",
        "/groups",
        Some("alice"),
        Some(json!({ "name": "Exam prep" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_i64().unwrap();
    let invite = group["invite_code"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "GET", &format!("/groups/{group_id}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, joined) = call(&app, "POST", &format!("/groups/join/{invite}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["group_name"], "Exam prep");

    let (status, _) = call(&app, "POST", &format!("/groups/join/{invite}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/groups/join/nope", Some("bob"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "DELETE", &format!("/groups/{group_id}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "DELETE", &format!("/groups/{group_id}/leave"), Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let subject_id = create_subject(&app, "bob", "Physics").await;
    call(
        &app,
        "POST",
        "/study-sessions",
        Some("bob"),
        Some(json!({ "subject_id": subject_id, "duration_minutes": 30 })),
    )
    .await;

    let (status, board) = call(
        &app,
        "GET",
        &format!("/groups/{group_id}/leaderboard"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["total_members"], 2);
    assert_eq!(board["leaderboard"][0]["user_id"], "bob");
    assert_eq!(board["leaderboard"][0]["rank"], 1);
    assert_eq!(board["leaderboard"][0]["total_study_minutes"], 30);
    assert_eq!(board["leaderboard"][1]["username"], "Unknown User");

    let (status, _) = call(&app, "DELETE", &format!("/groups/{group_id}/leave"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, groups) = call(&app, "GET", "/groups", Some("bob"), None).await;
    assert!(groups.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_analytics_window() {
    let app = test_app().await;
    let subject_id = create_subject(&app, "alice", "Maths").await;
    call(
        &app,
        "POST",
        "/study-sessions",
        Some("alice"),
        Some(json!({ "subject_id": subject_id, "duration_minutes": 50 })),
    )
    .await;

    let (status, stats) = call(&app, "GET", "/analytics/study-stats?days=7", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["daily_stats"].as_array().unwrap().len(), 7);
    assert_eq!(stats["daily_stats"][6]["total_minutes"], 50);
    assert_eq!(stats["subject_stats"][0]["subject"], "Maths");

    let (status, correlation) = call(&app, "GET", "/analytics/correlation", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(correlation["correlation_data"].as_array().unwrap().len(), 30);
    assert_eq!(correlation["coefficient"], 0.0);

    let (status, heatmap) = call(&app, "GET", "/analytics/heatmap?year=2024", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(heatmap["data"].as_array().unwrap().len(), 366);
    assert_eq!(heatmap["summary"]["activity_type"], "all");

    let (status, heatmap) = call(
        &app,
        "GET",
        "/analytics/heatmap?year=2024&activity_type=study",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(heatmap["summary"]["activity_type"], "study");

    let (status, _) = call(&app, "GET", "/analytics/heatmap?year=99999", Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(
        &app,
        "GET",
        "/analytics/heatmap?activity_type=sleep",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_upsert() {
    let app = test_app().await;

    let (status, _) = call(&app, "GET", "/profile", Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, profile) = call(
        &app,
        "PUT",
        "/profile",
        Some("alice"),
        Some(json!({ "email": "alice@example.com", "full_name": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["full_name"], "Alice");

    let (_, profile) = call(&app, "GET", "/profile", Some("alice"), None).await;
    assert_eq!(profile["email"], "alice@example.com");
}
