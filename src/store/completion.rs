//! Completing a card with an undo window.
//!
//! ```text
//! Active -> PendingCompletion -> Cancelled
//!                             -> Committing -> Committed
//!                                           -> RolledBack (backend refused)
//! ```
//!
//! The card leaves the board as soon as completion is requested. Until the
//! window elapses the request can be cancelled, which puts the card back
//! and never reaches the backend. Afterwards the backend is called once; if
//! that call fails the card is put back as well.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::board::remove_card;
use super::{SharedBoard, Transaction};
use crate::error::{AppError, Result};
use crate::models::EntityId;
use crate::services::{Backend, NotificationKind, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Active,
    PendingCompletion,
    /// Window elapsed, backend call in flight.
    Committing,
    Committed,
    Cancelled,
    RolledBack,
}

impl CompletionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CompletionState::Committed | CompletionState::Cancelled | CompletionState::RolledBack
        )
    }
}

impl std::fmt::Display for CompletionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionState::Active => write!(f, "active"),
            CompletionState::PendingCompletion => write!(f, "pending"),
            CompletionState::Committing => write!(f, "committing"),
            CompletionState::Committed => write!(f, "committed"),
            CompletionState::Cancelled => write!(f, "cancelled"),
            CompletionState::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// Shared between the handle, the registry and the timer task.
struct Pending {
    card_id: EntityId,
    state: watch::Sender<CompletionState>,
    transaction: Mutex<Option<Transaction>>,
    wake: Notify,
}

impl Pending {
    /// Move from `PendingCompletion` to `next`; false if already decided.
    fn decide(&self, next: CompletionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == CompletionState::PendingCompletion {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn take_transaction(&self) -> Option<Transaction> {
        self.transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

type Registry = Arc<Mutex<HashMap<EntityId, Arc<Pending>>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<EntityId, Arc<Pending>>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unregister(registry: &Registry, pending: &Arc<Pending>) {
    let mut map = lock(registry);
    if map
        .get(&pending.card_id)
        .is_some_and(|current| Arc::ptr_eq(current, pending))
    {
        map.remove(&pending.card_id);
    }
}

fn cancel_pending(registry: &Registry, pending: &Arc<Pending>) -> bool {
    if !pending.decide(CompletionState::Cancelled) {
        return false;
    }
    if let Some(tx) = pending.take_transaction() {
        tx.rollback();
    }
    unregister(registry, pending);
    pending.wake.notify_one();
    info!(card_id = %pending.card_id, "Completion cancelled");
    true
}

#[derive(Clone)]
pub struct CompletionWorkflow {
    board: SharedBoard,
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    window: Duration,
    registry: Registry,
}

impl CompletionWorkflow {
    pub fn new(
        board: SharedBoard,
        backend: Arc<dyn Backend>,
        notifier: Arc<dyn Notifier>,
        window: Duration,
    ) -> Self {
        Self {
            board,
            backend,
            notifier,
            window,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `Active` unless a completion for the card is still undecided or in flight.
    pub fn state_of(&self, card_id: EntityId) -> CompletionState {
        lock(&self.registry)
            .get(&card_id)
            .map(|pending| *pending.state.borrow())
            .unwrap_or(CompletionState::Active)
    }

    /// Cancel the pending completion of `card_id`, if its window is still open.
    pub fn cancel(&self, card_id: EntityId) -> bool {
        let pending = lock(&self.registry).get(&card_id).cloned();
        match pending {
            Some(pending) => cancel_pending(&self.registry, &pending),
            None => false,
        }
    }

    /// Remove the card from the board and schedule the backend completion.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// `CompletionPending` if this card already has a completion underway.
    pub fn request(&self, card_id: EntityId) -> Result<CompletionHandle> {
        let mut registry = lock(&self.registry);
        if registry.contains_key(&card_id) {
            warn!(card_id = %card_id, "Completion already pending");
            return Err(AppError::CompletionPending(card_id));
        }

        let tx = Transaction::cards(&self.board, "complete_card", &[card_id]);
        if tx.apply(|columns| remove_card(columns, card_id)).is_none() {
            warn!(card_id = %card_id, "Completing a card that is not on the board");
        }

        let (state, _) = watch::channel(CompletionState::PendingCompletion);
        let pending = Arc::new(Pending {
            card_id,
            state,
            transaction: Mutex::new(Some(tx)),
            wake: Notify::new(),
        });
        registry.insert(card_id, pending.clone());
        drop(registry);

        info!(card_id = %card_id, window_ms = self.window.as_millis() as u64, "Completion pending");
        self.notifier
            .notify(NotificationKind::Info, "Task completed - undo available");

        let task = tokio::spawn(self.clone().run(pending.clone()));

        Ok(CompletionHandle {
            pending,
            registry: self.registry.clone(),
            task,
        })
    }

    async fn run(self, pending: Arc<Pending>) -> CompletionState {
        tokio::select! {
            _ = pending.wake.notified() => {}
            _ = tokio::time::sleep(self.window) => {}
        }

        if !pending.decide(CompletionState::Committing) {
            return *pending.state.borrow();
        }

        let card_id = pending.card_id;
        let tx = pending.take_transaction();
        let result = match card_id.require_server() {
            Ok(id) => self.backend.complete_card(id).await,
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(card) => {
                info!(card_id = %card_id, complete_at = ?card.complete_at, "Card completed");
                if let Some(tx) = tx {
                    tx.commit(|_| ());
                }
                pending.state.send_replace(CompletionState::Committed);
                CompletionState::Committed
            }
            Err(e) => {
                error!(error = %e, card_id = %card_id, "Failed to complete card");
                if let Some(tx) = tx {
                    tx.rollback();
                }
                pending.state.send_replace(CompletionState::RolledBack);
                self.notifier
                    .notify(NotificationKind::Error, "Failed to complete task");
                CompletionState::RolledBack
            }
        };

        unregister(&self.registry, &pending);
        outcome
    }
}

/// Handle to one completion request.
pub struct CompletionHandle {
    pending: Arc<Pending>,
    registry: Registry,
    task: JoinHandle<CompletionState>,
}

impl CompletionHandle {
    pub fn card_id(&self) -> EntityId {
        self.pending.card_id
    }

    pub fn state(&self) -> CompletionState {
        *self.pending.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CompletionState> {
        self.pending.state.subscribe()
    }

    /// Undo the completion. Only succeeds while the window is open; the card
    /// is back on the board when this returns true.
    pub fn cancel(&self) -> bool {
        cancel_pending(&self.registry, &self.pending)
    }

    /// Wait for the request to reach its final state.
    pub async fn outcome(self) -> Result<CompletionState> {
        self.task
            .await
            .map_err(|e| AppError::Internal(format!("Completion task failed: {}", e)))
    }
}
