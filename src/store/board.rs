use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::models::{Card, Column, EntityId};

/// The in-memory board shared by all stores.
///
/// The lock is only ever held for a synchronous closure, never across an
/// `.await`, so optimistic changes land before the network call suspends.
/// Every write bumps a revision that observers can subscribe to.
#[derive(Clone)]
pub struct SharedBoard {
    columns: Arc<Mutex<Vec<Column>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for SharedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedBoard {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            columns: Arc::new(Mutex::new(Vec::new())),
            revision: Arc::new(revision),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Column>> {
        self.columns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Deep copy of the current columns.
    pub fn snapshot(&self) -> Vec<Column> {
        self.lock().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&[Column]) -> R) -> R {
        f(&self.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<Column>) -> R) -> R {
        let result = f(&mut self.lock());
        self.bump();
        result
    }

    pub fn replace(&self, columns: Vec<Column>) {
        *self.lock() = columns;
        self.bump();
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn column(&self, column_id: EntityId) -> Option<Column> {
        self.read(|columns| columns.iter().find(|c| c.id == column_id).cloned())
    }

    pub fn card(&self, card_id: EntityId) -> Option<Card> {
        self.read(|columns| find_card(columns, card_id).cloned())
    }

    /// Column currently holding the card.
    pub fn column_of(&self, card_id: EntityId) -> Option<EntityId> {
        self.read(|columns| {
            columns
                .iter()
                .find(|c| c.contains_card(card_id))
                .map(|c| c.id)
        })
    }
}

pub fn find_card(columns: &[Column], card_id: EntityId) -> Option<&Card> {
    columns.iter().find_map(|c| c.card(card_id))
}

pub fn find_card_mut(columns: &mut [Column], card_id: EntityId) -> Option<&mut Card> {
    columns
        .iter_mut()
        .find_map(|c| c.cards.iter_mut().find(|card| card.id == card_id))
}

/// Remove the card from every column holding it; returns the first copy found.
pub fn remove_card(columns: &mut [Column], card_id: EntityId) -> Option<Card> {
    let mut removed = None;
    for column in columns.iter_mut() {
        if let Some(index) = column.cards.iter().position(|c| c.id == card_id) {
            let card = column.cards.remove(index);
            column.cards.retain(|c| c.id != card_id);
            removed.get_or_insert(card);
        }
    }
    removed
}

/// Swap the card with ID `card_id` for `card`, keeping its list position.
pub fn replace_card(columns: &mut [Column], card_id: EntityId, card: Card) -> bool {
    match find_card_mut(columns, card_id) {
        Some(slot) => {
            *slot = card;
            true
        }
        None => false,
    }
}

/// Swap the column with ID `column_id` for `column`, keeping its position.
pub fn replace_column(columns: &mut [Column], column_id: EntityId, column: Column) -> bool {
    match columns.iter_mut().find(|c| c.id == column_id) {
        Some(slot) => {
            *slot = column;
            true
        }
        None => false,
    }
}

/// Ascending by order key. Columns without a key go last, in their current
/// relative order.
pub fn sort_columns(columns: &mut [Column]) {
    columns.sort_by(|a, b| match (a.order, b.order) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
