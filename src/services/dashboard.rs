use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::{day_range, goals, habits, sessions, timestamp_date};
use crate::error::AppError;
use crate::models::{HabitLog, StudySession};

pub const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub study_today: i64,
    pub study_goal: i64,
    pub habit_done: i64,
    pub habit_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyDashboard {
    pub labels: Vec<String>,
    pub study_data: Vec<i64>,
    pub habit_data: Vec<i64>,
}

pub async fn summary(
    db: &SqlitePool,
    user_id: &str,
    today: NaiveDate,
    default_goal: i64,
) -> Result<DashboardSummary, AppError> {
    let (start, end) = day_range(today, today);

    let study_today = sessions::fetch_sessions_between(db, user_id, &start, &end)
        .await?
        .iter()
        .map(|s| s.duration_minutes)
        .sum();
    let habit_done = habits::fetch_logs_between(db, user_id, &start, &end).await?.len() as i64;
    let habit_total = habits::fetch_habits(db, user_id).await?.len() as i64;

    let study_goal = goals::find_active_goal(db, user_id, "daily_study")
        .await?
        .map(|g| g.target_value)
        .unwrap_or(default_goal);

    Ok(DashboardSummary {
        study_today,
        study_goal,
        habit_done,
        habit_total,
    })
}

pub async fn weekly(
    db: &SqlitePool,
    user_id: &str,
    today: NaiveDate,
) -> Result<WeeklyDashboard, AppError> {
    let first = today.checked_sub_days(Days::new(6)).unwrap_or(today);
    let (start, end) = day_range(first, today);

    let sessions = sessions::fetch_sessions_between(db, user_id, &start, &end).await?;
    let logs = habits::fetch_logs_between(db, user_id, &start, &end).await?;

    Ok(weekly_from(today, &sessions, &logs))
}

/// The seven days ending `today`, oldest first.
pub fn weekly_from(today: NaiveDate, sessions: &[StudySession], logs: &[HabitLog]) -> WeeklyDashboard {
    let mut weekly = WeeklyDashboard {
        labels: Vec::with_capacity(7),
        study_data: Vec::with_capacity(7),
        habit_data: Vec::with_capacity(7),
    };

    for offset in (0..7u64).rev() {
        let Some(date) = today.checked_sub_days(Days::new(offset)) else {
            continue;
        };

        let study_time = sessions
            .iter()
            .filter(|s| timestamp_date(&s.created_at) == Some(date))
            .map(|s| s.duration_minutes)
            .sum();
        let habit_count = logs
            .iter()
            .filter(|l| timestamp_date(&l.completed_date) == Some(date))
            .count() as i64;

        weekly
            .labels
            .push(DAY_NAMES[date.weekday().num_days_from_monday() as usize].to_string());
        weekly.study_data.push(study_time);
        weekly.habit_data.push(habit_count);
    }

    weekly
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(created_at: &str, minutes: i64) -> StudySession {
        StudySession {
            id: 0,
            subject_id: Some(1),
            subject_name: None,
            duration_minutes: minutes,
            notes: None,
            created_at: created_at.to_string(),
        }
    }

    fn log(date: &str) -> HabitLog {
        HabitLog {
            id: 0,
            habit_id: 1,
            completed_date: date.to_string(),
            notes: None,
        }
    }

    #[test]
    fn weekly_ends_on_today() {
        // 2026-10-17 is a Saturday.
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let sessions = vec![
            session("2026-10-17T08:00:00Z", 30),
            session("2026-10-17T20:00:00Z", 15),
            session("2026-10-11T09:00:00Z", 60),
            session("2026-10-10T09:00:00Z", 99),
        ];
        let logs = vec![log("2026-10-16T00:00:00Z"), log("2026-10-16T00:00:00Z")];

        let weekly = weekly_from(today, &sessions, &logs);
        assert_eq!(weekly.labels, vec!["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]);
        assert_eq!(weekly.study_data, vec![60, 0, 0, 0, 0, 0, 45]);
        assert_eq!(weekly.habit_data, vec![0, 0, 0, 0, 0, 2, 0]);
    }
}
