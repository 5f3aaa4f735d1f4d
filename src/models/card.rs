use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, Reminder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "1")]
    P1,
    #[serde(rename = "2")]
    P2,
    #[serde(rename = "3")]
    P3,
    #[default]
    #[serde(rename = "4")]
    P4,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::P1 => write!(f, "1"),
            Priority::P2 => write!(f, "2"),
            Priority::P3 => write!(f, "3"),
            Priority::P4 => write!(f, "4"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "p1" => Ok(Priority::P1),
            "2" | "p2" => Ok(Priority::P2),
            "3" | "p3" => Ok(Priority::P3),
            "4" | "p4" => Ok(Priority::P4),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub order: f64,
    #[serde(default)]
    pub due_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub complete_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub column_id: Option<EntityId>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

impl Card {
    pub fn is_completed(&self) -> bool {
        self.complete_at.is_some()
    }

    /// Merge a partial update into this card. Timestamps are left to the server.
    pub fn apply(&mut self, patch: &UpdateCard) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(due_to) = patch.due_to {
            self.due_to = Some(due_to);
        }
        if let Some(column_id) = patch.column_id {
            self.column_id = Some(column_id);
        }
    }
}

/// Body of `POST /cards`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCard {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    #[serde(rename = "columnId")]
    pub column_id: i64,
    pub due_to: DateTime<Utc>,
}

/// Partial card fields, sent as-is to `PUT /cards/{id}`.
///
/// A present `column_id` turns the update into a move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<EntityId>,
}

impl UpdateCard {
    pub fn move_to(column_id: EntityId, order: Option<f64>) -> Self {
        Self {
            column_id: Some(column_id),
            order,
            ..Default::default()
        }
    }

    pub fn is_move(&self) -> bool {
        self.column_id.is_some()
    }
}
