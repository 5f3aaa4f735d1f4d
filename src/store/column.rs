use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::board::{replace_column, sort_columns};
use super::order::{needs_compaction, next_order};
use super::{SharedBoard, Transaction};
use crate::error::Result;
use crate::models::{Column, CreateColumn, EntityId};
use crate::services::{Backend, NotificationKind, Notifier};

/// Owns the ordered list of columns.
#[derive(Clone)]
pub struct ColumnStore {
    board: SharedBoard,
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    loading: Arc<AtomicBool>,
}

/// Clears the loading flag however the fetch ends.
struct Loading<'a>(&'a AtomicBool);

impl<'a> Loading<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ColumnStore {
    pub fn new(board: SharedBoard, backend: Arc<dyn Backend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            board,
            backend,
            notifier,
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        self.board.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Replace the board with the backend's columns.
    ///
    /// Columns are sorted by order key, cards within each column likewise,
    /// and completed cards are left out. On failure the board is kept.
    pub async fn fetch_columns(&self) {
        let _loading = Loading::start(&self.loading);

        match self.backend.list_columns().await {
            Ok(mut columns) => {
                sort_columns(&mut columns);
                for column in columns.iter_mut() {
                    column.cards.retain(|card| !card.is_completed());
                    column.sort_cards();

                    let keys: Vec<f64> = column.cards.iter().map(|c| c.order).collect();
                    if needs_compaction(&keys) {
                        warn!(column_id = %column.id, "Card order keys have collapsed");
                    }
                }

                info!(count = columns.len(), "Fetched columns");
                self.board.replace(columns);
            }
            Err(e) => error!(error = %e, "Failed to fetch columns"),
        }
    }

    /// Append a column. Blank titles are ignored.
    pub async fn add_column(&self, title: &str) {
        if title.trim().is_empty() {
            debug!("Ignoring blank column title");
            return;
        }

        let temp_id = EntityId::temp();
        let tx = Transaction::columns(&self.board, "add_column", &[temp_id]);
        tx.apply(|columns| {
            let order = next_order(columns.iter().filter_map(|c| c.order).reduce(f64::max));
            columns.push(Column {
                id: temp_id,
                title: title.to_string(),
                order: Some(order),
                created_at: Some(Utc::now()),
                updated_at: None,
                cards: vec![],
            });
        });

        let input = CreateColumn {
            title: title.to_string(),
        };

        match self.backend.create_column(&input).await {
            Ok(column) => {
                info!(column_id = %column.id, "Column created");
                tx.commit(|columns| replace_column(columns, temp_id, column));
                self.notifier
                    .notify(NotificationKind::Success, "Column created successfully");
            }
            Err(e) => {
                error!(error = %e, "Failed to create column");
                tx.rollback();
                self.notifier
                    .notify(NotificationKind::Error, "Failed to create new column");
            }
        }
    }

    /// Insert a copy of `source` at `target_order` and ask the backend to
    /// duplicate `source_column_id`.
    ///
    /// On success the server's duplicate is written over the column whose ID
    /// is `source_column_id`; the optimistic copy keeps its temporary ID.
    /// This is the observed contract of the backend integration and is kept
    /// as is. On failure the list is restored and the error is returned, so
    /// callers can skip work that depends on the duplicate.
    pub async fn duplicate_column(
        &self,
        source: &Column,
        source_column_id: EntityId,
        target_order: f64,
    ) -> Result<()> {
        let temp_id = EntityId::temp();
        let tx = Transaction::columns(&self.board, "duplicate_column", &[temp_id]);
        tx.apply(|columns| {
            columns.push(Column {
                id: temp_id,
                order: Some(target_order),
                ..source.clone()
            });
            sort_columns(columns);
        });

        let result = match source_column_id.require_server() {
            Ok(id) => self.backend.duplicate_column(id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(duplicate) => {
                info!(source_id = %source_column_id, duplicate_id = %duplicate.id, "Column duplicated");
                tx.commit(|columns| replace_column(columns, source_column_id, duplicate));
                self.notifier
                    .notify(NotificationKind::Success, "Column duplicated successfully");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, source_id = %source_column_id, "Failed to duplicate column");
                tx.rollback();
                self.notifier
                    .notify(NotificationKind::Error, "Failed to duplicate column");
                Err(e)
            }
        }
    }

    pub async fn delete_column(&self, column_id: EntityId) {
        let tx = Transaction::columns(&self.board, "delete_column", &[column_id]);
        tx.apply(|columns| columns.retain(|c| c.id != column_id));

        let result = match column_id.require_server() {
            Ok(id) => self.backend.delete_column(id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(column_id = %column_id, "Column deleted");
                tx.commit(|_| ());
                self.notifier
                    .notify(NotificationKind::Success, "Column deleted successfully");
            }
            Err(e) => {
                error!(error = %e, column_id = %column_id, "Failed to delete column");
                tx.rollback();
                self.notifier
                    .notify(NotificationKind::Error, "Failed to delete this column");
            }
        }
    }

    /// Merge a column record into the board without calling the backend.
    ///
    /// A record without nested cards keeps the cards already on the board.
    pub fn update_column(&self, column_id: EntityId, column: Column) -> bool {
        self.board.update(|columns| {
            let Some(slot) = columns.iter_mut().find(|c| c.id == column_id) else {
                return false;
            };
            let cards = if column.cards.is_empty() {
                std::mem::take(&mut slot.cards)
            } else {
                column.cards
            };
            *slot = Column { cards, ..column };
            true
        })
    }
}
