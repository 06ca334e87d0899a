use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::net::TcpListener;

use studyhabit::api::router;
use studyhabit::auth::unsigned_token;
use studyhabit::client::{HabitChecklist, HttpStudyApi, StudyApi};
use studyhabit::config::Config;
use studyhabit::db::{connect_in_memory, habits, sessions, subjects};
use studyhabit::models::{NewHabitRequest, NewSubjectRequest};
use studyhabit::state::AppState;
use studyhabit::timer::{FileTimerStore, ManualClock, Phase, StopOutcome, Timer, TimerStore};

/// Serves the API on an ephemeral port and returns its base URL.
async fn spawn_server() -> (String, SqlitePool) {
    let pool = connect_in_memory().await.expect("Failed to create test db");
    let app = router(AppState::new(pool.clone(), Config::default()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), pool)
}

async fn seed_subjects(pool: &SqlitePool, user: &str, count: usize) {
    for i in 0..count {
        subjects::insert_subject(
            pool,
            user,
            NewSubjectRequest {
                name: format!("Subject {}", i + 1),
                color: "#3B82F6".to_string(),
            },
        )
        .await
        .unwrap();
    }
}

fn api_for(base_url: &str, user: &str) -> HttpStudyApi {
    HttpStudyApi::new(base_url, Some(unsigned_token(user)), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_stop_submits_exactly_one_session() {
    let (base_url, pool) = spawn_server().await;
    seed_subjects(&pool, "alice", 3).await;
    let api = api_for(&base_url, "alice");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timerState.json");
    let clock = Arc::new(ManualClock::new(1_000));
    let store = Arc::new(FileTimerStore::new(&path));

    let mut timer = Timer::restore(clock.clone(), store.clone()).unwrap();
    timer.select_subject("3").unwrap();
    timer.start().unwrap();
    assert!(path.exists());

    clock.advance(Duration::from_secs(125));
    let outcome = timer.stop(&api).await.unwrap();

    let StopOutcome::Saved(session) = outcome else {
        panic!("expected the session to be saved, got {outcome:?}");
    };
    assert_eq!(session.subject_id, Some(3));
    assert_eq!(session.duration_minutes, 2);
    assert_eq!(session.subject_name.as_deref(), Some("Subject 3"));

    let stored = sessions::fetch_sessions(&pool, "alice").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!path.exists());
    assert_eq!(timer.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_restart_resumes_from_stored_start() {
    let (base_url, pool) = spawn_server().await;
    seed_subjects(&pool, "alice", 1).await;
    let api = api_for(&base_url, "alice");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timerState.json");
    let clock = Arc::new(ManualClock::new(50_000));

    {
        let store = Arc::new(FileTimerStore::new(&path));
        let mut timer = Timer::restore(clock.clone(), store).unwrap();
        timer.select_subject("1").unwrap();
        timer.start().unwrap();
    }

    clock.advance(Duration::from_secs(30 * 60));
    let store = Arc::new(FileTimerStore::new(&path));
    let mut timer = Timer::restore(clock.clone(), store.clone()).unwrap();
    assert_eq!(timer.phase(), Phase::Running);
    assert_eq!(timer.elapsed_seconds(), 1_800);

    let outcome = timer.stop(&api).await.unwrap();
    assert!(matches!(outcome, StopOutcome::Saved(ref s) if s.duration_minutes == 30));
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_subject_is_reported_not_retried() {
    let (base_url, pool) = spawn_server().await;
    seed_subjects(&pool, "alice", 1).await;
    let api = api_for(&base_url, "alice");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timerState.json");
    let clock = Arc::new(ManualClock::new(0));
    let mut timer = Timer::restore(clock.clone(), Arc::new(FileTimerStore::new(&path))).unwrap();

    timer.select_subject("42").unwrap();
    timer.start().unwrap();
    clock.advance(Duration::from_secs(90));

    let outcome = timer.stop(&api).await.unwrap();
    assert!(matches!(outcome, StopOutcome::SaveFailed(ref reason) if reason.contains("400")));
    assert!(sessions::fetch_sessions(&pool, "alice").await.unwrap().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_wrong_token_is_unauthorized() {
    let (base_url, _pool) = spawn_server().await;
    let api = HttpStudyApi::new(&base_url, None, Duration::from_secs(5)).unwrap();

    let result = api.list_subjects().await;
    assert!(matches!(result, Err(studyhabit::client::ClientError::Unauthorized)));
}

#[tokio::test]
async fn test_checklist_against_server() {
    let (base_url, pool) = spawn_server().await;
    let habit = habits::insert_habit(
        &pool,
        "alice",
        NewHabitRequest {
            name: "Read".to_string(),
            description: None,
            target_frequency: 7,
            color: "#10B981".to_string(),
        },
    )
    .await
    .unwrap();
    let api = api_for(&base_url, "alice");
    let today = chrono::Utc::now().date_naive();

    let mut checklist = HabitChecklist::load(&api, today).await.unwrap();
    assert!(!checklist.is_done(habit.id));

    assert!(checklist.toggle(&api, habit.id).await.unwrap());
    let reloaded = HabitChecklist::load(&api, today).await.unwrap();
    assert!(reloaded.is_done(habit.id));

    assert!(!checklist.toggle(&api, habit.id).await.unwrap());
    assert!(api.list_habit_logs(habit.id).await.unwrap().is_empty());
}
