use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Card;

/// Completed cards sharing one time bucket (the start of their week).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGroup {
    pub time: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl CompletedGroup {
    pub fn week_start(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.time)
            .map(|dt| dt.date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(&self.time, "%Y-%m-%d").ok())
    }

    /// Heading shown above the group; falls back to the raw bucket key.
    pub fn title(&self) -> String {
        match self.week_start() {
            Some(date) => format!("Week starting {}", date.format("%d/%m/%Y")),
            None => self.time.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(time: &str) -> CompletedGroup {
        CompletedGroup {
            time: time.to_string(),
            cards: vec![],
        }
    }

    #[test]
    fn test_title_from_timestamp_or_date() {
        assert_eq!(group("2025-09-08T00:00:00.000Z").title(), "Week starting 08/09/2025");
        assert_eq!(group("2025-09-08").title(), "Week starting 08/09/2025");
    }

    #[test]
    fn test_title_falls_back_to_raw_key() {
        assert_eq!(group("last week").title(), "last week");
        assert!(group("last week").week_start().is_none());
    }
}
