use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use super::{ClientError, StudyApi};
use crate::db::timestamp_date;
use crate::models::Habit;

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("Unknown habit {0}")]
    UnknownHabit(i64),

    #[error("Habit {0} is already being updated")]
    InFlight(i64),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone)]
pub struct ChecklistItem {
    pub habit: Habit,
    pub done: bool,
    log_id: Option<i64>,
    in_flight: bool,
}

/// A local change waiting for the backend to confirm it.
#[derive(Debug)]
#[must_use = "a pending toggle must be finished or the habit stays locked"]
pub struct PendingToggle {
    habit_id: i64,
    done: bool,
    log_id: Option<i64>,
}

/// Today's habits with optimistic check/uncheck.
///
/// A toggle shows up locally at once, then the backend is asked to create
/// or delete the day's log; if that fails the item flips back.
pub struct HabitChecklist {
    today: NaiveDate,
    items: Vec<ChecklistItem>,
}

impl HabitChecklist {
    pub async fn load(api: &dyn StudyApi, today: NaiveDate) -> Result<Self, ClientError> {
        let habits = api.list_habits().await?;
        let mut items = Vec::with_capacity(habits.len());

        for habit in habits {
            let log_id = api
                .list_habit_logs(habit.id)
                .await?
                .into_iter()
                .find(|log| timestamp_date(&log.completed_date) == Some(today))
                .map(|log| log.id);
            items.push(ChecklistItem {
                habit,
                done: log_id.is_some(),
                log_id,
                in_flight: false,
            });
        }

        Ok(Self { today, items })
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn completed(&self) -> usize {
        self.items.iter().filter(|i| i.done).count()
    }

    pub fn is_done(&self, habit_id: i64) -> bool {
        self.item(habit_id).is_some_and(|i| i.done)
    }

    fn item(&self, habit_id: i64) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.habit.id == habit_id)
    }

    fn item_mut(&mut self, habit_id: i64) -> Option<&mut ChecklistItem> {
        self.items.iter_mut().find(|i| i.habit.id == habit_id)
    }

    /// Flips the habit locally and locks it until [`finish`](Self::finish).
    pub fn begin(&mut self, habit_id: i64) -> Result<PendingToggle, ToggleError> {
        let item = self
            .item_mut(habit_id)
            .ok_or(ToggleError::UnknownHabit(habit_id))?;
        if item.in_flight {
            return Err(ToggleError::InFlight(habit_id));
        }

        item.in_flight = true;
        item.done = !item.done;
        Ok(PendingToggle {
            habit_id,
            done: item.done,
            log_id: item.log_id,
        })
    }

    /// Confirms a pending toggle with the backend, reverting it on failure.
    pub async fn finish(
        &mut self,
        api: &dyn StudyApi,
        pending: PendingToggle,
    ) -> Result<bool, ToggleError> {
        let result = match (pending.done, pending.log_id) {
            (true, _) => api
                .create_habit_log(pending.habit_id, &self.today.to_string())
                .await
                .map(|log| Some(log.id)),
            (false, Some(log_id)) => api.delete_habit_log(log_id).await.map(|()| None),
            (false, None) => Ok(None),
        };

        let item = self
            .item_mut(pending.habit_id)
            .ok_or(ToggleError::UnknownHabit(pending.habit_id))?;
        item.in_flight = false;

        match result {
            Ok(log_id) => {
                item.log_id = log_id;
                Ok(item.done)
            }
            Err(e) => {
                warn!("reverting habit {}: {}", pending.habit_id, e);
                item.done = !pending.done;
                Err(e.into())
            }
        }
    }

    pub async fn toggle(&mut self, api: &dyn StudyApi, habit_id: i64) -> Result<bool, ToggleError> {
        let pending = self.begin(habit_id)?;
        self.finish(api, pending).await
    }
}
