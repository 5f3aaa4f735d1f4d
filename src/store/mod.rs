//! Client-side mirror of the board and the stores that mutate it.
//!
//! Every mutation goes through [`SharedBoard`]: stores apply an optimistic
//! change inside a [`Transaction`], call the backend, then either commit
//! (reconciling server IDs) or roll back.

pub mod board;
pub mod card;
pub mod column;
pub mod completed;
pub mod completion;
pub mod order;
pub mod transaction;

pub use board::SharedBoard;
pub use card::CardStore;
pub use column::ColumnStore;
pub use completed::CompletedCards;
pub use completion::{CompletionHandle, CompletionState, CompletionWorkflow};
pub use transaction::Transaction;
