use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::{day_range, habits, sessions, subjects, timestamp_date};
use crate::error::AppError;
use crate::models::{Habit, HabitLog, StudySession, Subject};
use crate::services::dashboard::DAY_NAMES;

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 365;

const UNKNOWN_SUBJECT_COLOR: &str = "#9CA3AF";
/// Study minutes that earn the full study half of a heatmap score.
const HEATMAP_STUDY_CAP: i64 = 120;
pub const HEATMAP_MIN_YEAR: i32 = 2000;
pub const HEATMAP_MAX_YEAR: i32 = 2100;

/// Which activity a heatmap scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    All,
    Study,
    Habit,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::All => "all",
            ActivityType::Study => "study",
            ActivityType::Habit => "habit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStudy {
    pub date: String,
    pub total_minutes: i64,
    pub session_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStat {
    pub subject: String,
    pub color: String,
    pub total_minutes: i64,
    pub session_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyStats {
    pub daily_stats: Vec<DailyStudy>,
    pub subject_stats: Vec<SubjectStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCompletion {
    pub date: String,
    pub completed_habits: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayCompletion {
    pub weekday: u32,
    pub weekday_name: String,
    pub completion_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStat {
    pub habit_name: String,
    pub color: String,
    pub completion_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCompletion {
    pub daily_completion: Vec<DailyCompletion>,
    pub weekday_completion: Vec<WeekdayCompletion>,
    pub habit_stats: Vec<HabitStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPoint {
    pub date: String,
    pub study_minutes: i64,
    pub habit_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub correlation_data: Vec<CorrelationPoint>,
    pub coefficient: f64,
    pub strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapDay {
    pub date: String,
    pub value: i64,
    pub level: u8,
    pub study_time: i64,
    pub habit_completion_rate: f64,
    pub total_habits: i64,
    pub completed_habits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSummary {
    pub total_days: i64,
    pub active_days: i64,
    pub total_study_time: i64,
    pub total_habit_completions: i64,
    pub average_score: f64,
    pub max_score: i64,
    pub activity_type: ActivityType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub year: i32,
    pub data: Vec<HeatmapDay>,
    pub summary: HeatmapSummary,
}

/// Inclusive window of `days` days ending `today`.
pub fn window(today: NaiveDate, days: Option<u32>) -> (NaiveDate, NaiveDate) {
    let days = days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    let first = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(today);
    (first, today)
}

pub async fn study_stats(
    db: &SqlitePool,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<StudyStats, AppError> {
    let (start, end) = day_range(from, to);
    let sessions = sessions::fetch_sessions_between(db, user_id, &start, &end).await?;
    let subjects = subjects::fetch_subjects(db, user_id).await?;
    Ok(study_stats_from(from, to, &sessions, &subjects))
}

pub async fn habit_completion(
    db: &SqlitePool,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<HabitCompletion, AppError> {
    let (start, end) = day_range(from, to);
    let habits = habits::fetch_habits(db, user_id).await?;
    let logs = habits::fetch_logs_between(db, user_id, &start, &end).await?;
    Ok(habit_completion_from(from, to, &habits, &logs))
}

pub async fn correlation(
    db: &SqlitePool,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Correlation, AppError> {
    let (start, end) = day_range(from, to);
    let sessions = sessions::fetch_sessions_between(db, user_id, &start, &end).await?;
    let logs = habits::fetch_logs_between(db, user_id, &start, &end).await?;
    Ok(correlation_from(from, to, &sessions, &logs))
}

pub fn check_heatmap_year(year: i32) -> Result<i32, AppError> {
    if (HEATMAP_MIN_YEAR..=HEATMAP_MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(AppError::BadRequest(format!(
            "year must be between {HEATMAP_MIN_YEAR} and {HEATMAP_MAX_YEAR}"
        )))
    }
}

pub async fn heatmap(
    db: &SqlitePool,
    user_id: &str,
    year: i32,
    activity: ActivityType,
) -> Result<Heatmap, AppError> {
    let year = check_heatmap_year(year)?;
    let (Some(from), Some(to)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Err(AppError::BadRequest(format!("Unsupported year: {year}")));
    };

    let (start, end) = day_range(from, to);
    let sessions = sessions::fetch_sessions_between(db, user_id, &start, &end).await?;
    let habits = habits::fetch_habits(db, user_id).await?;
    let logs = habits::fetch_logs_between(db, user_id, &start, &end).await?;
    Ok(heatmap_from(
        year,
        activity,
        (from, to),
        &sessions,
        habits.len() as i64,
        &logs,
    ))
}

fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

fn minutes_by_day(sessions: &[StudySession]) -> HashMap<NaiveDate, (i64, i64)> {
    let mut by_day: HashMap<NaiveDate, (i64, i64)> = HashMap::new();
    for session in sessions {
        if let Some(date) = timestamp_date(&session.created_at) {
            let entry = by_day.entry(date).or_default();
            entry.0 += session.duration_minutes;
            entry.1 += 1;
        }
    }
    by_day
}

fn logs_by_day(logs: &[HabitLog]) -> HashMap<NaiveDate, Vec<&HabitLog>> {
    let mut by_day: HashMap<NaiveDate, Vec<&HabitLog>> = HashMap::new();
    for log in logs {
        if let Some(date) = timestamp_date(&log.completed_date) {
            by_day.entry(date).or_default().push(log);
        }
    }
    by_day
}

fn distinct_habits(logs: &[&HabitLog]) -> i64 {
    logs.iter().map(|l| l.habit_id).collect::<HashSet<_>>().len() as i64
}

pub fn study_stats_from(
    from: NaiveDate,
    to: NaiveDate,
    sessions: &[StudySession],
    subjects: &[Subject],
) -> StudyStats {
    let by_day = minutes_by_day(sessions);
    let daily_stats = days_between(from, to)
        .map(|date| {
            let (total_minutes, session_count) = by_day.get(&date).copied().unwrap_or_default();
            DailyStudy {
                date: date.to_string(),
                total_minutes,
                session_count,
            }
        })
        .collect();

    let colors: HashMap<i64, &str> = subjects.iter().map(|s| (s.id, s.color.as_str())).collect();
    let mut per_subject: BTreeMap<String, SubjectStat> = BTreeMap::new();
    for session in sessions {
        let name = session
            .subject_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let color = session
            .subject_id
            .and_then(|id| colors.get(&id).copied())
            .unwrap_or(UNKNOWN_SUBJECT_COLOR);
        let stat = per_subject.entry(name.clone()).or_insert_with(|| SubjectStat {
            subject: name,
            color: color.to_string(),
            total_minutes: 0,
            session_count: 0,
        });
        stat.total_minutes += session.duration_minutes;
        stat.session_count += 1;
    }

    let mut subject_stats: Vec<SubjectStat> = per_subject.into_values().collect();
    subject_stats.sort_by(|a, b| b.total_minutes.cmp(&a.total_minutes));

    StudyStats {
        daily_stats,
        subject_stats,
    }
}

pub fn habit_completion_from(
    from: NaiveDate,
    to: NaiveDate,
    habits: &[Habit],
    logs: &[HabitLog],
) -> HabitCompletion {
    let total = habits.len() as i64;
    let by_day = logs_by_day(logs);

    let daily_completion = days_between(from, to)
        .map(|date| {
            let completed_habits = by_day.get(&date).map(|l| distinct_habits(l)).unwrap_or(0);
            DailyCompletion {
                date: date.to_string(),
                completed_habits,
                completion_rate: rate(completed_habits, total),
            }
        })
        .collect();

    let mut weekday_counts = [0i64; 7];
    for log in logs {
        if let Some(date) = timestamp_date(&log.completed_date) {
            weekday_counts[date.weekday().num_days_from_monday() as usize] += 1;
        }
    }
    let weekday_completion = weekday_counts
        .iter()
        .enumerate()
        .map(|(i, count)| WeekdayCompletion {
            weekday: i as u32,
            weekday_name: DAY_NAMES[i].to_string(),
            completion_count: *count,
        })
        .collect();

    let mut habit_stats: Vec<HabitStat> = habits
        .iter()
        .map(|habit| HabitStat {
            habit_name: habit.name.clone(),
            color: habit.color.clone(),
            completion_count: logs.iter().filter(|l| l.habit_id == habit.id).count() as i64,
        })
        .collect();
    habit_stats.sort_by(|a, b| {
        b.completion_count
            .cmp(&a.completion_count)
            .then_with(|| a.habit_name.cmp(&b.habit_name))
    });

    HabitCompletion {
        daily_completion,
        weekday_completion,
        habit_stats,
    }
}

pub fn correlation_from(
    from: NaiveDate,
    to: NaiveDate,
    sessions: &[StudySession],
    logs: &[HabitLog],
) -> Correlation {
    let minutes = minutes_by_day(sessions);
    let by_day = logs_by_day(logs);

    let correlation_data: Vec<CorrelationPoint> = days_between(from, to)
        .map(|date| CorrelationPoint {
            date: date.to_string(),
            study_minutes: minutes.get(&date).map(|m| m.0).unwrap_or(0),
            habit_count: by_day.get(&date).map(|l| l.len() as i64).unwrap_or(0),
        })
        .collect();

    let points: Vec<(f64, f64)> = correlation_data
        .iter()
        .map(|p| (p.study_minutes as f64, p.habit_count as f64))
        .collect();
    let coefficient = pearson(&points);

    Correlation {
        correlation_data,
        coefficient,
        strength: strength(coefficient).to_string(),
    }
}

/// Pearson coefficient over the days where both values are positive.
pub fn pearson(points: &[(f64, f64)]) -> f64 {
    let valid: Vec<&(f64, f64)> = points.iter().filter(|(x, y)| *x > 0.0 && *y > 0.0).collect();
    if valid.len() < 2 {
        return 0.0;
    }

    let n = valid.len() as f64;
    let sum_x: f64 = valid.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = valid.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = valid.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = valid.iter().map(|(x, _)| x * x).sum();
    let sum_yy: f64 = valid.iter().map(|(_, y)| y * y).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_xx - sum_x * sum_x) * (n * sum_yy - sum_y * sum_y)).sqrt();

    if denominator == 0.0 || denominator.is_nan() {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn strength(coefficient: f64) -> &'static str {
    if coefficient > 0.7 {
        "strong_positive"
    } else if coefficient > 0.3 {
        "moderate_positive"
    } else if coefficient > -0.3 {
        "weak"
    } else if coefficient > -0.7 {
        "moderate_negative"
    } else {
        "strong_negative"
    }
}

/// Day score in 0..=100. `All` splits the points evenly between study and habits.
pub fn heatmap_score(activity: ActivityType, study_minutes: i64, completion_rate: f64) -> i64 {
    let study = study_minutes.clamp(0, HEATMAP_STUDY_CAP) as f64 / HEATMAP_STUDY_CAP as f64;
    let habits = completion_rate.clamp(0.0, 1.0);
    let score = match activity {
        ActivityType::All => (study + habits) * 50.0,
        ActivityType::Study => study * 100.0,
        ActivityType::Habit => habits * 100.0,
    };
    score.round() as i64
}

pub fn heatmap_level(value: i64) -> u8 {
    match value {
        v if v <= 0 => 0,
        v if v < 25 => 1,
        v if v < 50 => 2,
        v if v < 75 => 3,
        _ => 4,
    }
}

pub fn heatmap_from(
    year: i32,
    activity: ActivityType,
    (from, to): (NaiveDate, NaiveDate),
    sessions: &[StudySession],
    total_habits: i64,
    logs: &[HabitLog],
) -> Heatmap {
    let minutes = minutes_by_day(sessions);
    let by_day = logs_by_day(logs);

    let data: Vec<HeatmapDay> = days_between(from, to)
        .map(|date| {
            let study_time = minutes.get(&date).map(|m| m.0).unwrap_or(0);
            let completed_habits = by_day.get(&date).map(|l| distinct_habits(l)).unwrap_or(0);
            let habit_completion_rate = rate(completed_habits, total_habits);
            let value = heatmap_score(activity, study_time, habit_completion_rate);
            HeatmapDay {
                date: date.to_string(),
                value,
                level: heatmap_level(value),
                study_time,
                habit_completion_rate,
                total_habits,
                completed_habits,
            }
        })
        .collect();

    let active: Vec<&HeatmapDay> = data.iter().filter(|d| d.value > 0).collect();
    let summary = HeatmapSummary {
        total_days: data.len() as i64,
        active_days: active.len() as i64,
        total_study_time: data.iter().map(|d| d.study_time).sum(),
        total_habit_completions: logs.len() as i64,
        average_score: if active.is_empty() {
            0.0
        } else {
            active.iter().map(|d| d.value as f64).sum::<f64>() / active.len() as f64
        },
        max_score: data.iter().map(|d| d.value).max().unwrap_or(0),
        activity_type: activity,
    };

    Heatmap { year, data, summary }
}

fn rate(done: i64, total: i64) -> f64 {
    if total > 0 {
        (done as f64 / total as f64).min(1.0)
    } else {
        0.0
    }
}
