use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const GOAL_TYPES: [&str; 5] = [
    "daily_study",
    "weekly_study",
    "monthly_study",
    "daily_habit",
    "weekly_habit",
];
pub const GOAL_UNITS: [&str; 3] = ["minutes", "sessions", "habits"];
pub const GOAL_PERIODS: [&str; 3] = ["daily", "weekly", "monthly"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: i64,
    pub user_id: String,
    pub goal_type: String,
    pub target_value: i64,
    pub target_unit: String,
    pub period: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoalRequest {
    pub goal_type: String,
    pub target_value: i64,
    #[serde(default = "default_unit")]
    pub target_unit: String,
    pub period: String,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGoalRequest {
    pub goal_type: Option<String>,
    pub target_value: Option<i64>,
    pub target_unit: Option<String>,
    pub period: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

fn default_unit() -> String {
    "minutes".to_string()
}

fn default_active() -> bool {
    true
}
