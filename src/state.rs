use std::sync::Arc;

use crate::config::Config;
use crate::services::{Backend, Notifier};
use crate::store::{CardStore, ColumnStore, CompletedCards, CompletionWorkflow, SharedBoard};

/// The stores of one session, all sharing a single board.
#[derive(Clone)]
pub struct AppState {
    pub board: SharedBoard,
    pub columns: ColumnStore,
    pub cards: CardStore,
    pub completed: CompletedCards,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        let board = SharedBoard::new();
        let completions = CompletionWorkflow::new(
            board.clone(),
            backend.clone(),
            notifier.clone(),
            config.completion_window,
        );

        Self {
            columns: ColumnStore::new(board.clone(), backend.clone(), notifier.clone()),
            cards: CardStore::new(board.clone(), backend.clone(), notifier, completions),
            completed: CompletedCards::new(board.clone(), backend),
            board,
        }
    }
}
