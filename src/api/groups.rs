use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::require_text;
use crate::auth::AuthUser;
use crate::db::groups::{self, ROLE_ADMIN, ROLE_MEMBER};
use crate::error::AppError;
use crate::models::*;
use crate::services::group_leaderboard;
use crate::state::AppState;

const INVITE_CODE_LEN: usize = 12;

fn new_invite_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(INVITE_CODE_LEN);
    code
}

/// Loads the group and the caller's membership; 404 before 403.
async fn member_of(
    state: &AppState,
    user: &AuthUser,
    group_id: i64,
) -> Result<(StudyGroup, GroupMembership), AppError> {
    let group = groups::find_group(&state.db, group_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let membership = groups::find_membership(&state.db, group_id, &user.user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Not a member of this group".to_string()))?;
    Ok((group, membership))
}

async fn admin_of(state: &AppState, user: &AuthUser, group_id: i64) -> Result<StudyGroup, AppError> {
    let (group, membership) = member_of(state, user, group_id).await?;
    if membership.role != ROLE_ADMIN {
        return Err(AppError::Forbidden(
            "Only group admins can do that".to_string(),
        ));
    }
    Ok(group)
}

pub(super) async fn list_groups(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<StudyGroup>>, AppError> {
    let groups = groups::fetch_groups_for_user(&state.db, &user.user_id).await?;
    Ok(Json(groups))
}

pub(super) async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewGroupRequest>,
) -> Result<(StatusCode, Json<StudyGroup>), AppError> {
    require_text("name", &req.name)?;

    let group = groups::insert_group(&state.db, &user.user_id, req, &new_invite_code()).await?;
    info!("group {} created by {}", group.id, user.user_id);
    Ok((StatusCode::CREATED, Json(group)))
}

pub(super) async fn get_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<StudyGroup>, AppError> {
    let (group, _) = member_of(&state, &user, id).await?;
    Ok(Json(group))
}

pub(super) async fn update_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<StudyGroup>, AppError> {
    if let Some(name) = &req.name {
        require_text("name", name)?;
    }
    admin_of(&state, &user, id).await?;

    let group = groups::update_group(&state.db, id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(group))
}

pub(super) async fn delete_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    admin_of(&state, &user, id).await?;

    if groups::delete_group(&state.db, id).await? {
        info!("group {} deleted by {}", id, user.user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

pub(super) async fn join_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invite_code): Path<String>,
) -> Result<Json<JoinGroupResponse>, AppError> {
    let group = groups::find_group_by_invite_code(&state.db, &invite_code)
        .await?
        .ok_or(AppError::NotFound)?;

    if groups::find_membership(&state.db, group.id, &user.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "Already a member of this group".to_string(),
        ));
    }

    groups::insert_membership(&state.db, group.id, &user.user_id, ROLE_MEMBER)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Already a member of this group".to_string())
            }
            e => e.into(),
        })?;
    Ok(Json(JoinGroupResponse {
        message: "Successfully joined group".to_string(),
        group_name: group.name,
    }))
}

pub(super) async fn leaderboard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<GroupLeaderboardResponse>, AppError> {
    let (group, _) = member_of(&state, &user, id).await?;
    let board = group_leaderboard(&state.db, &group, Utc::now().date_naive()).await?;
    Ok(Json(board))
}

pub(super) async fn leave_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let (_, membership) = member_of(&state, &user, id).await?;

    if membership.role == ROLE_ADMIN && groups::count_admins(&state.db, id).await? <= 1 {
        return Err(AppError::BadRequest(
            "The only admin cannot leave the group".to_string(),
        ));
    }

    groups::delete_membership(&state.db, membership.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_codes_are_url_safe() {
        let code = new_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(code, new_invite_code());
    }
}
