use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

use super::require_text;
use crate::auth::AuthUser;
use crate::db::{sessions, subjects};
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub(super) async fn list_subjects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Subject>>, AppError> {
    let subjects = subjects::fetch_subjects(&state.db, &user.user_id).await?;
    Ok(Json(subjects))
}

pub(super) async fn create_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewSubjectRequest>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    require_text("name", &req.name)?;
    let subject = subjects::insert_subject(&state.db, &user.user_id, req).await?;
    state.cache.clear_user(&user.user_id);
    Ok((StatusCode::CREATED, Json(subject)))
}

pub(super) async fn update_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSubjectRequest>,
) -> Result<Json<Subject>, AppError> {
    if let Some(name) = &req.name {
        require_text("name", name)?;
    }
    let subject = subjects::update_subject(&state.db, &user.user_id, id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    state.cache.clear_user(&user.user_id);
    Ok(Json(subject))
}

pub(super) async fn delete_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if subjects::delete_subject(&state.db, &user.user_id, id).await? {
        state.cache.clear_user(&user.user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

pub(super) async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<StudySession>>, AppError> {
    let sessions = sessions::fetch_sessions(&state.db, &user.user_id).await?;
    Ok(Json(sessions))
}

pub(super) async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewStudySessionRequest>,
) -> Result<(StatusCode, Json<StudySession>), AppError> {
    if req.duration_minutes < 0 {
        return Err(AppError::BadRequest(
            "duration_minutes must not be negative".to_string(),
        ));
    }
    let subject = owned_subject(&state, &user, req.subject_id).await?;

    let session = sessions::insert_session(&state.db, &user.user_id, &subject, req).await?;
    info!(
        "recorded {} minute session on {} for {}",
        session.duration_minutes, subject.name, user.user_id
    );
    state.cache.clear_user(&user.user_id);
    Ok((StatusCode::CREATED, Json(session)))
}

pub(super) async fn update_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStudySessionRequest>,
) -> Result<Json<StudySession>, AppError> {
    if req.duration_minutes.is_some_and(|d| d < 0) {
        return Err(AppError::BadRequest(
            "duration_minutes must not be negative".to_string(),
        ));
    }
    let new_subject = match req.subject_id {
        Some(subject_id) => Some(owned_subject(&state, &user, subject_id).await?),
        None => None,
    };

    let session = sessions::update_session(&state.db, &user.user_id, id, req, new_subject.as_ref())
        .await?
        .ok_or(AppError::NotFound)?;
    state.cache.clear_user(&user.user_id);
    Ok(Json(session))
}

pub(super) async fn delete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if sessions::delete_session(&state.db, &user.user_id, id).await? {
        state.cache.clear_user(&user.user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn owned_subject(state: &AppState, user: &AuthUser, subject_id: i64) -> Result<Subject, AppError> {
    subjects::find_subject(&state.db, &user.user_id, subject_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Subject {subject_id} not found")))
}
