use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::SharedBoard;
use crate::models::CompletedGroup;
use crate::services::Backend;

/// Read-only history of completed cards, grouped by week.
///
/// The live board is only used as a change signal: every board revision
/// triggers a refetch from the backend, so the history can lag the board
/// until that fetch returns.
#[derive(Clone)]
pub struct CompletedCards {
    board: SharedBoard,
    backend: Arc<dyn Backend>,
    groups: Arc<RwLock<Vec<CompletedGroup>>>,
}

impl CompletedCards {
    pub fn new(board: SharedBoard, backend: Arc<dyn Backend>) -> Self {
        Self {
            board,
            backend,
            groups: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn groups(&self) -> Vec<CompletedGroup> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn card_count(&self) -> usize {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|g| g.cards.len())
            .sum()
    }

    /// Refetch the history. On failure the previous groups are kept.
    pub async fn refresh(&self) -> bool {
        match self.backend.list_completed_cards().await {
            Ok(groups) => {
                debug!(groups = groups.len(), "Fetched completed cards");
                *self.groups.write().unwrap_or_else(PoisonError::into_inner) = groups;
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch completed cards");
                false
            }
        }
    }

    /// Fetch once, then again after every board change, until aborted.
    pub fn spawn_watch(&self) -> JoinHandle<()> {
        let this = self.clone();
        let mut revisions = self.board.subscribe();

        tokio::spawn(async move {
            this.refresh().await;
            while revisions.changed().await.is_ok() {
                this.refresh().await;
            }
        })
    }
}
