use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StudyGroup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub invite_code: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GroupMembership {
    pub id: i64,
    pub group_id: i64,
    pub user_id: String,
    pub role: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGroupResponse {
    pub message: String,
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub total_study_minutes: i64,
    pub study_sessions_count: i64,
    pub habit_completion_rate: f64,
    pub total_habits: i64,
    pub completed_habits: i64,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupLeaderboardResponse {
    pub group_id: i64,
    pub group_name: String,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub total_members: usize,
    pub week_start: String,
    pub week_end: String,
}
