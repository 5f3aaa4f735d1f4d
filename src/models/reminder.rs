use chrono::{DateTime, Datelike, Days, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: EntityId,
    pub remind_at: DateTime<Utc>,
    #[serde(default)]
    pub sent: bool,
    pub card_id: EntityId,
}

/// Body of `POST /reminder`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminder {
    pub remind_at: DateTime<Utc>,
    pub card_id: i64,
}

/// Quick-pick reminder times offered next to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderPreset {
    Later,
    Tomorrow,
    NextWeek,
}

const LATER_HOURS: [u32; 6] = [13, 15, 17, 19, 21, 23];

fn at_hour(date: chrono::NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
}

impl ReminderPreset {
    pub fn label(&self) -> &'static str {
        match self {
            ReminderPreset::Later => "Later",
            ReminderPreset::Tomorrow => "Tomorrow",
            ReminderPreset::NextWeek => "Next week",
        }
    }

    /// Remind-at time for this preset, in the caller's local wall-clock time.
    pub fn remind_at(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        let tomorrow = today + Days::new(1);

        match self {
            ReminderPreset::Later => LATER_HOURS
                .iter()
                .map(|&h| at_hour(today, h))
                .find(|candidate| *candidate > now)
                .unwrap_or_else(|| at_hour(tomorrow, 13)),
            ReminderPreset::Tomorrow => at_hour(tomorrow, 9),
            ReminderPreset::NextWeek => {
                let from_monday = u64::from(today.weekday().num_days_from_monday());
                at_hour(today + Days::new(7 - from_monday), 9)
            }
        }
    }
}
