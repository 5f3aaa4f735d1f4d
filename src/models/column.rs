use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Card, EntityId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub order: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateColumn {
    pub title: String,
}

impl Column {
    pub fn contains_card(&self, card_id: EntityId) -> bool {
        self.cards.iter().any(|c| c.id == card_id)
    }

    pub fn card(&self, card_id: EntityId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    /// Highest order key among the cards, i.e. the last card once sorted.
    pub fn last_card_order(&self) -> Option<f64> {
        self.cards.iter().map(|c| c.order).reduce(f64::max)
    }

    pub fn sort_cards(&mut self) {
        self.cards.sort_by(|a, b| a.order.total_cmp(&b.order));
    }
}
