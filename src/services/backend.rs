use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Card, Column, CompletedGroup, CreateCard, CreateColumn, CreateReminder, Reminder, UpdateCard,
};

/// REST operations the stores depend on.
///
/// `HttpBackend` is the production implementation; tests use
/// `test_utils::MockBackend`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /columns`, columns with their nested cards.
    async fn list_columns(&self) -> Result<Vec<Column>>;

    async fn create_column(&self, input: &CreateColumn) -> Result<Column>;

    async fn duplicate_column(&self, column_id: i64) -> Result<Column>;

    async fn delete_column(&self, column_id: i64) -> Result<()>;

    async fn create_card(&self, input: &CreateCard) -> Result<Card>;

    async fn update_card(&self, card_id: i64, input: &UpdateCard) -> Result<Card>;

    async fn delete_card(&self, card_id: i64) -> Result<()>;

    async fn complete_card(&self, card_id: i64) -> Result<Card>;

    /// Completed cards bucketed by week.
    async fn list_completed_cards(&self) -> Result<Vec<CompletedGroup>>;

    async fn create_reminder(&self, input: &CreateReminder) -> Result<Reminder>;
}
