use tracing::{debug, warn};

use super::SharedBoard;
use crate::models::{Column, EntityId};

#[derive(Debug, Clone)]
enum Scope {
    Columns(Vec<EntityId>),
    Cards(Vec<EntityId>),
}

/// One in-flight optimistic mutation of the board.
///
/// `begin` captures the pre-image, `apply` performs the optimistic change,
/// and the operation ends in exactly one of `commit` or `rollback`.
///
/// Rollback restores only the entities the transaction was opened for,
/// taken from its pre-image at their original positions. With nothing else
/// in flight the board ends up equal to the pre-image; mutations of other
/// entities that interleaved with this one survive the rollback.
#[must_use = "an optimistic transaction must be committed or rolled back"]
pub struct Transaction {
    board: SharedBoard,
    snapshot: Vec<Column>,
    scope: Scope,
    operation: &'static str,
}

impl Transaction {
    /// Open a transaction touching the given columns (and their cards).
    pub fn columns(board: &SharedBoard, operation: &'static str, ids: &[EntityId]) -> Self {
        Self::begin(board, operation, Scope::Columns(ids.to_vec()))
    }

    /// Open a transaction touching the given cards.
    pub fn cards(board: &SharedBoard, operation: &'static str, ids: &[EntityId]) -> Self {
        Self::begin(board, operation, Scope::Cards(ids.to_vec()))
    }

    fn begin(board: &SharedBoard, operation: &'static str, scope: Scope) -> Self {
        debug!(operation, "Opening optimistic transaction");
        Self {
            board: board.clone(),
            snapshot: board.snapshot(),
            scope,
            operation,
        }
    }

    pub fn snapshot(&self) -> &[Column] {
        &self.snapshot
    }

    pub fn apply<R>(&self, f: impl FnOnce(&mut Vec<Column>) -> R) -> R {
        self.board.update(f)
    }

    /// Reconcile the optimistic state with the server's answer.
    pub fn commit<R>(self, reconcile: impl FnOnce(&mut Vec<Column>) -> R) -> R {
        debug!(operation = self.operation, "Committing optimistic transaction");
        self.board.update(reconcile)
    }

    pub fn rollback(self) {
        debug!(operation = self.operation, "Rolling back optimistic transaction");
        let snapshot = self.snapshot;
        let operation = self.operation;
        self.board.update(|columns| match &self.scope {
            Scope::Columns(ids) => restore_columns(columns, &snapshot, ids),
            Scope::Cards(ids) => restore_cards(columns, &snapshot, ids, operation),
        });
    }
}

fn restore_columns(columns: &mut Vec<Column>, snapshot: &[Column], ids: &[EntityId]) {
    columns.retain(|c| !ids.contains(&c.id));
    for (index, column) in snapshot.iter().enumerate() {
        if ids.contains(&column.id) {
            let at = index.min(columns.len());
            columns.insert(at, column.clone());
        }
    }
}

fn restore_cards(
    columns: &mut [Column],
    snapshot: &[Column],
    ids: &[EntityId],
    operation: &'static str,
) {
    for column in columns.iter_mut() {
        column.cards.retain(|c| !ids.contains(&c.id));
    }

    for original in snapshot {
        for (index, card) in original.cards.iter().enumerate() {
            if !ids.contains(&card.id) {
                continue;
            }
            match columns.iter_mut().find(|c| c.id == original.id) {
                Some(column) => {
                    let at = index.min(column.cards.len());
                    column.cards.insert(at, card.clone());
                }
                None => warn!(
                    operation,
                    card_id = %card.id,
                    column_id = %original.id,
                    "Column no longer exists, card not restored"
                ),
            }
        }
    }
}
