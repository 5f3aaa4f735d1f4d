use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, error, info, warn};

use super::board::{find_card, find_card_mut, remove_card, replace_card};
use super::order::next_order;
use super::{CompletionHandle, CompletionWorkflow, SharedBoard, Transaction};
use crate::error::Result;
use crate::models::{
    Card, Column, CreateCard, CreateReminder, EntityId, Priority, Reminder, ReminderPreset,
    UpdateCard,
};
use crate::services::{Backend, NotificationKind, Notifier};

/// Owns card placement: the only writer of the column-to-cards relation.
#[derive(Clone)]
pub struct CardStore {
    board: SharedBoard,
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    completions: CompletionWorkflow,
}

impl CardStore {
    pub fn new(
        board: SharedBoard,
        backend: Arc<dyn Backend>,
        notifier: Arc<dyn Notifier>,
        completions: CompletionWorkflow,
    ) -> Self {
        Self {
            board,
            backend,
            notifier,
            completions,
        }
    }

    pub fn card(&self, card_id: EntityId) -> Option<Card> {
        self.board.card(card_id)
    }

    pub fn completions(&self) -> &CompletionWorkflow {
        &self.completions
    }

    /// Append a card to `column_id` with a temporary ID, then swap in the
    /// server's record. Input is not validated here.
    pub async fn create_card(
        &self,
        title: &str,
        description: Option<&str>,
        priority: Priority,
        column_id: EntityId,
        due_to: DateTime<Utc>,
    ) {
        let temp_id = EntityId::temp();
        let tx = Transaction::cards(&self.board, "create_card", &[temp_id]);

        let inserted = tx.apply(|columns| {
            let Some(column) = columns.iter_mut().find(|c| c.id == column_id) else {
                return false;
            };
            let now = Utc::now();
            column.cards.push(Card {
                id: temp_id,
                title: title.to_string(),
                description: description.map(str::to_string),
                priority,
                order: next_order(column.last_card_order()),
                due_to: Some(due_to),
                complete_at: None,
                created_at: now,
                updated_at: now,
                column_id: Some(column_id),
                reminders: vec![],
            });
            true
        });
        if !inserted {
            warn!(column_id = %column_id, "Target column not on the board, creating card without placeholder");
        }

        let result = match column_id.require_server() {
            Ok(server_column_id) => {
                let input = CreateCard {
                    title: title.to_string(),
                    description: description.map(str::to_string),
                    priority,
                    column_id: server_column_id,
                    due_to,
                };
                self.backend.create_card(&input).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(card) => {
                info!(card_id = %card.id, column_id = %column_id, "Card created");
                let placed = tx.commit(|columns| {
                    if find_card(columns, temp_id).is_some() {
                        return replace_card(columns, temp_id, card);
                    }
                    match columns.iter_mut().find(|c| c.id == column_id) {
                        Some(column) => {
                            column.cards.push(card);
                            column.sort_cards();
                            true
                        }
                        None => false,
                    }
                });

                if placed {
                    self.notifier
                        .notify(NotificationKind::Success, "Card created successfully");
                } else {
                    warn!(column_id = %column_id, "Created card's column is not on the board");
                }
            }
            Err(e) => {
                error!(error = %e, column_id = %column_id, "Failed to create card");
                tx.rollback();
                self.notifier
                    .notify(NotificationKind::Error, "Failed to create card");
            }
        }
    }

    /// Patch a card, moving it when the patch names a column.
    ///
    /// Successful updates are silent; failures roll back and notify.
    pub async fn update_card(&self, card_id: EntityId, patch: UpdateCard) {
        let tx = Transaction::cards(&self.board, "update_card", &[card_id]);
        tx.apply(|columns| apply_update(columns, card_id, &patch));

        // A move into a column the server has not stored yet cannot be sent.
        let target = patch.column_id.map(|c| c.require_server()).transpose();
        let result = match (card_id.require_server(), target) {
            (Ok(id), Ok(_)) => self.backend.update_card(id, &patch).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        match result {
            Ok(_) => {
                debug!(card_id = %card_id, moved = patch.is_move(), "Card updated");
                tx.commit(|_| ());
            }
            Err(e) => {
                error!(error = %e, card_id = %card_id, "Failed to update card");
                tx.rollback();
                self.notifier
                    .notify(NotificationKind::Error, "Failed to update card");
            }
        }
    }

    pub async fn delete_card(&self, card_id: EntityId) {
        let tx = Transaction::cards(&self.board, "delete_card", &[card_id]);
        tx.apply(|columns| remove_card(columns, card_id));

        let result = match card_id.require_server() {
            Ok(id) => self.backend.delete_card(id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(card_id = %card_id, "Card deleted");
                tx.commit(|_| ());
                self.notifier
                    .notify(NotificationKind::Success, "Card deleted successfully");
            }
            Err(e) => {
                error!(error = %e, card_id = %card_id, "Failed to delete card");
                tx.rollback();
                self.notifier
                    .notify(NotificationKind::Error, "Failed to delete card");
            }
        }
    }

    /// Take the card off the board and commit the completion once the undo
    /// window has passed. See [`CompletionWorkflow::request`].
    pub fn complete_card(&self, card_id: EntityId) -> Result<CompletionHandle> {
        self.completions.request(card_id)
    }

    /// Create a reminder for a saved card and attach it once the server
    /// has stored it.
    pub async fn add_reminder(&self, card_id: EntityId, remind_at: DateTime<Utc>) -> Option<Reminder> {
        let result = match card_id.require_server() {
            Ok(id) => {
                let input = CreateReminder {
                    remind_at,
                    card_id: id,
                };
                self.backend.create_reminder(&input).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(reminder) => {
                info!(card_id = %card_id, reminder_id = %reminder.id, "Reminder created");
                let attached = reminder.clone();
                self.board.update(|columns| {
                    if let Some(card) = find_card_mut(columns, card_id) {
                        card.reminders.push(attached);
                    }
                });
                self.notifier.notify(
                    NotificationKind::Success,
                    &format!("Reminder set for {}", remind_at.format("%b %-d, %Y at %-I:%M %p")),
                );
                Some(reminder)
            }
            Err(e) => {
                error!(error = %e, card_id = %card_id, "Failed to create reminder");
                self.notifier
                    .notify(NotificationKind::Error, "Failed to create reminder");
                None
            }
        }
    }

    /// [`add_reminder`](Self::add_reminder) at the time a preset picks
    /// relative to the local clock.
    pub async fn add_reminder_preset(
        &self,
        card_id: EntityId,
        preset: ReminderPreset,
    ) -> Option<Reminder> {
        let local = preset.remind_at(Local::now().naive_local());
        let remind_at = match local.and_local_timezone(Local).earliest() {
            Some(at) => at.with_timezone(&Utc),
            None => local.and_utc(),
        };
        debug!(card_id = %card_id, preset = preset.label(), "Reminder preset chosen");
        self.add_reminder(card_id, remind_at).await
    }
}

/// Apply `patch` to the card in place, or move it when `patch.column_id`
/// is set.
///
/// A move removes the card from every other column and inserts it into the
/// target by order key; when the target already holds the card it is only
/// patched, so repeating a move is a no-op. Returns whether the board
/// changed.
pub fn apply_update(columns: &mut [Column], card_id: EntityId, patch: &UpdateCard) -> bool {
    let Some(target) = patch.column_id else {
        let Some(column) = columns.iter_mut().find(|c| c.contains_card(card_id)) else {
            return false;
        };
        if let Some(card) = column.cards.iter_mut().find(|c| c.id == card_id) {
            card.apply(patch);
        }
        if patch.order.is_some() {
            column.sort_cards();
        }
        return true;
    };

    let Some(mut moved) = find_card(columns, card_id).cloned() else {
        return false;
    };
    if !columns.iter().any(|c| c.id == target) {
        warn!(card_id = %card_id, column_id = %target, "Move target not on the board");
        return false;
    }
    moved.apply(patch);

    for column in columns.iter_mut() {
        if column.id != target {
            column.cards.retain(|c| c.id != card_id);
            continue;
        }
        match column.cards.iter_mut().find(|c| c.id == card_id) {
            Some(existing) => existing.apply(patch),
            None => {
                let at = column
                    .cards
                    .iter()
                    .position(|c| c.order > moved.order)
                    .unwrap_or(column.cards.len());
                column.cards.insert(at, moved.clone());
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{card, column};

    fn columns() -> Vec<Column> {
        let mut todo = column(1, "Todo", 10000.0);
        todo.cards = vec![card(10, 1, 10000.0), card(11, 1, 20000.0)];
        let mut doing = column(2, "Doing", 20000.0);
        doing.cards = vec![card(20, 2, 10000.0), card(21, 2, 30000.0)];
        vec![todo, doing]
    }

    #[test]
    fn test_patch_in_place() {
        let mut columns = columns();
        let patch = UpdateCard {
            title: Some("Renamed".to_string()),
            priority: Some(Priority::P1),
            ..Default::default()
        };

        assert!(apply_update(&mut columns, EntityId::Server(11), &patch));
        let card = &columns[0].cards[1];
        assert_eq!(card.title, "Renamed");
        assert_eq!(card.priority, Priority::P1);
    }

    #[test]
    fn test_move_inserts_by_order_and_is_idempotent() {
        let mut columns = columns();
        let patch = UpdateCard::move_to(EntityId::Server(2), Some(20000.0));

        assert!(apply_update(&mut columns, EntityId::Server(10), &patch));
        let once = columns.clone();
        assert!(apply_update(&mut columns, EntityId::Server(10), &patch));

        assert_eq!(columns, once);
        assert!(!columns[0].contains_card(EntityId::Server(10)));
        let ids: Vec<EntityId> = columns[1].cards.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![EntityId::Server(20), EntityId::Server(10), EntityId::Server(21)]
        );
        assert_eq!(columns[1].cards[1].column_id, Some(EntityId::Server(2)));
    }

    #[test]
    fn test_move_to_unknown_column_leaves_board() {
        let mut columns = columns();
        let before = columns.clone();
        let patch = UpdateCard::move_to(EntityId::Server(99), None);

        assert!(!apply_update(&mut columns, EntityId::Server(10), &patch));
        assert_eq!(columns, before);
    }

    #[test]
    fn test_reorder_within_column_sorts() {
        let mut columns = columns();
        let patch = UpdateCard {
            order: Some(5000.0),
            ..Default::default()
        };

        assert!(apply_update(&mut columns, EntityId::Server(11), &patch));
        assert_eq!(columns[0].cards[0].id, EntityId::Server(11));
    }
}
