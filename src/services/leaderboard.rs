use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};
use sqlx::SqlitePool;

use crate::db::{day_range, groups, habits, profiles, sessions};
use crate::error::AppError;
use crate::models::{GroupLeaderboardResponse, LeaderboardEntry, StudyGroup};

/// Monday and Sunday of the week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = u64::from(today.weekday().num_days_from_monday());
    let monday = today.checked_sub_days(Days::new(offset)).unwrap_or(today);
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
    (monday, sunday)
}

pub async fn group_leaderboard(
    db: &SqlitePool,
    group: &StudyGroup,
    today: NaiveDate,
) -> Result<GroupLeaderboardResponse, AppError> {
    let (monday, sunday) = week_bounds(today);
    let (start, end) = day_range(monday, sunday);

    let members = groups::fetch_members(db, group.id).await?;
    let mut entries = Vec::with_capacity(members.len());

    for member in &members {
        let username = profiles::find_profile(db, &member.user_id)
            .await?
            .and_then(|p| p.full_name)
            .unwrap_or_else(|| "Unknown User".to_string());

        let week_sessions =
            sessions::fetch_sessions_between(db, &member.user_id, &start, &end).await?;
        let member_habits = habits::fetch_habits(db, &member.user_id).await?;
        let week_logs = habits::fetch_logs_between(db, &member.user_id, &start, &end).await?;

        let mut logs_per_habit: HashMap<i64, i64> = HashMap::new();
        for log in &week_logs {
            *logs_per_habit.entry(log.habit_id).or_default() += 1;
        }

        let total_habits = member_habits.len() as i64;
        let completed_habits = member_habits
            .iter()
            .filter(|h| logs_per_habit.get(&h.id).copied().unwrap_or(0) >= h.target_frequency)
            .count() as i64;

        entries.push(LeaderboardEntry {
            user_id: member.user_id.clone(),
            username,
            total_study_minutes: week_sessions.iter().map(|s| s.duration_minutes).sum(),
            study_sessions_count: week_sessions.len() as i64,
            habit_completion_rate: if total_habits > 0 {
                completed_habits as f64 / total_habits as f64
            } else {
                0.0
            },
            total_habits,
            completed_habits,
            rank: 0,
        });
    }

    Ok(GroupLeaderboardResponse {
        group_id: group.id,
        group_name: group.name.clone(),
        total_members: members.len(),
        leaderboard: rank(entries),
        week_start: monday.to_string(),
        week_end: sunday.to_string(),
    })
}

/// Orders by study minutes, then session count, then user id; ranks start at 1.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.total_study_minutes
            .cmp(&a.total_study_minutes)
            .then_with(|| b.study_sessions_count.cmp(&a.study_sessions_count))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: &str, minutes: i64, sessions: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
            total_study_minutes: minutes,
            study_sessions_count: sessions,
            habit_completion_rate: 0.0,
            total_habits: 0,
            completed_habits: 0,
            rank: 0,
        }
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        let saturday = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let (monday, sunday) = week_bounds(saturday);
        assert_eq!(monday, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(sunday, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());

        assert_eq!(week_bounds(monday).0, monday);
        assert_eq!(week_bounds(sunday).0, monday);
    }

    #[test]
    fn ties_break_on_sessions_then_user() {
        let ranked = rank(vec![
            entry("carol", 120, 2),
            entry("bob", 120, 3),
            entry("alice", 120, 2),
            entry("dave", 200, 1),
        ]);

        let order: Vec<_> = ranked.iter().map(|e| (e.user_id.as_str(), e.rank)).collect();
        assert_eq!(
            order,
            vec![("dave", 1), ("bob", 2), ("alice", 3), ("carol", 4)]
        );
    }
}
