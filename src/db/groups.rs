use sqlx::SqlitePool;

use crate::db::now_timestamp;
use crate::models::{GroupMembership, NewGroupRequest, StudyGroup, UpdateGroupRequest};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

const GROUP_COLUMNS: &str = "id, name, description, created_by, invite_code, created_at";

/// Creates the group and makes `user_id` its admin in one transaction.
pub async fn insert_group(
    db: &SqlitePool,
    user_id: &str,
    req: NewGroupRequest,
    invite_code: &str,
) -> Result<StudyGroup, sqlx::Error> {
    let now = now_timestamp();
    let mut tx = db.begin().await?;

    let id = sqlx::query(
        r#"
        INSERT INTO study_groups (name, description, created_by, invite_code, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(user_id)
    .bind(invite_code)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO group_memberships (group_id, user_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(user_id)
    .bind(ROLE_ADMIN)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(StudyGroup {
        id,
        name: req.name,
        description: req.description,
        created_by: user_id.to_string(),
        invite_code: invite_code.to_string(),
        created_at: now,
    })
}

pub async fn fetch_groups_for_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<StudyGroup>, sqlx::Error> {
    sqlx::query_as::<_, StudyGroup>(
        "SELECT g.id, g.name, g.description, g.created_by, g.invite_code, g.created_at
         FROM study_groups g JOIN group_memberships m ON m.group_id = g.id
         WHERE m.user_id = ?
         ORDER BY g.id",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_group(db: &SqlitePool, id: i64) -> Result<Option<StudyGroup>, sqlx::Error> {
    sqlx::query_as::<_, StudyGroup>(&format!(
        "SELECT {GROUP_COLUMNS} FROM study_groups WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_group_by_invite_code(
    db: &SqlitePool,
    invite_code: &str,
) -> Result<Option<StudyGroup>, sqlx::Error> {
    sqlx::query_as::<_, StudyGroup>(&format!(
        "SELECT {GROUP_COLUMNS} FROM study_groups WHERE invite_code = ?"
    ))
    .bind(invite_code)
    .fetch_optional(db)
    .await
}

pub async fn update_group(
    db: &SqlitePool,
    id: i64,
    req: UpdateGroupRequest,
) -> Result<Option<StudyGroup>, sqlx::Error> {
    let mut current = match find_group(db, id).await? {
        Some(g) => g,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(description) = req.description {
        current.description = Some(description);
    }

    sqlx::query("UPDATE study_groups SET name = ?1, description = ?2 WHERE id = ?3")
        .bind(&current.name)
        .bind(&current.description)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

/// Memberships go with the group via the foreign key cascade.
pub async fn delete_group(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM study_groups WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn find_membership(
    db: &SqlitePool,
    group_id: i64,
    user_id: &str,
) -> Result<Option<GroupMembership>, sqlx::Error> {
    sqlx::query_as::<_, GroupMembership>(
        "SELECT id, group_id, user_id, role, joined_at FROM group_memberships
         WHERE group_id = ? AND user_id = ?",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_members(
    db: &SqlitePool,
    group_id: i64,
) -> Result<Vec<GroupMembership>, sqlx::Error> {
    sqlx::query_as::<_, GroupMembership>(
        "SELECT id, group_id, user_id, role, joined_at FROM group_memberships
         WHERE group_id = ? ORDER BY id",
    )
    .bind(group_id)
    .fetch_all(db)
    .await
}

pub async fn insert_membership(
    db: &SqlitePool,
    group_id: i64,
    user_id: &str,
    role: &str,
) -> Result<GroupMembership, sqlx::Error> {
    let now = now_timestamp();
    let id = sqlx::query(
        "INSERT INTO group_memberships (group_id, user_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(role)
    .bind(&now)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(GroupMembership {
        id,
        group_id,
        user_id: user_id.to_string(),
        role: role.to_string(),
        joined_at: now,
    })
}

pub async fn delete_membership(db: &SqlitePool, membership_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM group_memberships WHERE id = ?")
        .bind(membership_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn count_admins(db: &SqlitePool, group_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM group_memberships WHERE group_id = ? AND role = ?",
    )
    .bind(group_id)
    .bind(ROLE_ADMIN)
    .fetch_one(db)
    .await
}
