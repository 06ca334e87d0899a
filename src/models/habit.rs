use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_TARGET_FREQUENCY: i64 = 7;
pub const DEFAULT_HABIT_COLOR: &str = "#10B981";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_frequency: i64,
    pub color: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHabitRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_target_frequency")]
    pub target_frequency: i64,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateHabitRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_frequency: Option<i64>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HabitLog {
    pub id: i64,
    pub habit_id: i64,
    pub completed_date: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHabitLogRequest {
    pub completed_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_target_frequency() -> i64 {
    DEFAULT_TARGET_FREQUENCY
}

fn default_color() -> String {
    DEFAULT_HABIT_COLOR.to_string()
}
