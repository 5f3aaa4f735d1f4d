//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, TimeZone, Utc};
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    Card, Column, CompletedGroup, CreateCard, CreateColumn, CreateReminder, EntityId, Reminder,
    UpdateCard,
};
use crate::services::{Backend, NotificationKind, Notifier};
use crate::state::AppState;
use crate::store::order::{between_order, next_order};

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()
}

pub fn column(id: i64, title: &str, order: f64) -> Column {
    Column {
        id: EntityId::Server(id),
        title: title.to_string(),
        order: Some(order),
        created_at: Some(timestamp()),
        updated_at: Some(timestamp()),
        cards: vec![],
    }
}

pub fn card(id: i64, column_id: i64, order: f64) -> Card {
    Card {
        id: EntityId::Server(id),
        title: format!("Card {}", id),
        description: None,
        priority: Default::default(),
        order,
        due_to: Some(timestamp()),
        complete_at: None,
        created_at: timestamp(),
        updated_at: timestamp(),
        column_id: Some(EntityId::Server(column_id)),
        reminders: vec![],
    }
}

/// Backend operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListColumns,
    CreateColumn,
    DuplicateColumn,
    DeleteColumn,
    CreateCard,
    UpdateCard,
    DeleteCard,
    CompleteCard,
    ListCompleted,
    CreateReminder,
}

#[derive(Default)]
struct MockState {
    columns: Vec<Column>,
    completed: Vec<CompletedGroup>,
    next_id: i64,
    calls: HashMap<Op, usize>,
    failing: HashSet<Op>,
    gates: HashMap<Op, Arc<Semaphore>>,
}

impl MockState {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn column_mut(&mut self, id: i64) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.id == EntityId::Server(id))
            .ok_or(AppError::NotFound)
    }

    fn take_card(&mut self, id: i64) -> Result<Card> {
        for column in self.columns.iter_mut() {
            if let Some(index) = column.cards.iter().position(|c| c.id == EntityId::Server(id)) {
                return Ok(column.cards.remove(index));
            }
        }
        Err(AppError::NotFound)
    }

    fn card_mut(&mut self, id: i64) -> Result<&mut Card> {
        self.columns
            .iter_mut()
            .flat_map(|c| c.cards.iter_mut())
            .find(|c| c.id == EntityId::Server(id))
            .ok_or(AppError::NotFound)
    }
}

/// A small in-memory server.
///
/// Every call yields to the runtime once before it is handled, so calls
/// issued together overlap the way network requests do.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the server with `columns`; new IDs start above any seeded one.
    pub fn with_columns(columns: Vec<Column>) -> Self {
        let max_id = columns
            .iter()
            .flat_map(|c| std::iter::once(c.id).chain(c.cards.iter().map(|card| card.id)))
            .filter_map(|id| id.server_id())
            .max()
            .unwrap_or(0);

        Self {
            state: Mutex::new(MockState {
                columns,
                next_id: max_id,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail(&self, op: Op) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.lock().failing.remove(&op);
    }

    /// Hold every `op` call before it reaches the server until [`release`](Self::release).
    pub fn hold(&self, op: Op) {
        self.lock().gates.insert(op, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, op: Op) {
        if let Some(gate) = self.lock().gates.remove(&op) {
            gate.close();
        }
    }

    pub fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn server_columns(&self) -> Vec<Column> {
        self.lock().columns.clone()
    }

    pub fn set_completed(&self, groups: Vec<CompletedGroup>) {
        self.lock().completed = groups;
    }

    async fn enter(&self, op: Op) -> Result<MutexGuard<'_, MockState>> {
        tokio::task::yield_now().await;
        let gate = self.lock().gates.get(&op).cloned();
        if let Some(gate) = gate {
            // Closed on release; the acquire error is the signal to go on.
            let _ = gate.acquire().await;
        }

        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(&op) {
            return Err(AppError::Status {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("{:?} failed", op),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_columns(&self) -> Result<Vec<Column>> {
        let state = self.enter(Op::ListColumns).await?;
        Ok(state.columns.clone())
    }

    async fn create_column(&self, input: &CreateColumn) -> Result<Column> {
        let mut state = self.enter(Op::CreateColumn).await?;
        let id = state.id();
        let order = next_order(state.columns.iter().filter_map(|c| c.order).reduce(f64::max));
        let column = Column {
            id: EntityId::Server(id),
            title: input.title.clone(),
            order: Some(order),
            created_at: Some(timestamp()),
            updated_at: Some(timestamp()),
            cards: vec![],
        };
        state.columns.push(column.clone());
        Ok(column)
    }

    async fn duplicate_column(&self, column_id: i64) -> Result<Column> {
        let mut state = self.enter(Op::DuplicateColumn).await?;
        let index = state
            .columns
            .iter()
            .position(|c| c.id == EntityId::Server(column_id))
            .ok_or(AppError::NotFound)?;

        let source = state.columns[index].clone();
        let upper = source.order.unwrap_or_default();
        let order = match state.columns.get(index + 1).and_then(|c| c.order) {
            Some(next) => between_order(Some(upper), next),
            None => next_order(Some(upper)),
        };

        let id = state.id();
        let mut cards = Vec::with_capacity(source.cards.len());
        for card in &source.cards {
            let card_id = state.id();
            cards.push(Card {
                id: EntityId::Server(card_id),
                column_id: Some(EntityId::Server(id)),
                ..card.clone()
            });
        }

        let duplicate = Column {
            id: EntityId::Server(id),
            title: format!("{} (copy)", source.title),
            order: Some(order),
            cards,
            ..source
        };
        state.columns.insert(index + 1, duplicate.clone());
        Ok(duplicate)
    }

    async fn delete_column(&self, column_id: i64) -> Result<()> {
        let mut state = self.enter(Op::DeleteColumn).await?;
        let before = state.columns.len();
        state.columns.retain(|c| c.id != EntityId::Server(column_id));
        if state.columns.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn create_card(&self, input: &CreateCard) -> Result<Card> {
        let mut state = self.enter(Op::CreateCard).await?;
        let id = state.id();
        let column = state.column_mut(input.column_id)?;
        let card = Card {
            id: EntityId::Server(id),
            title: input.title.clone(),
            description: input.description.clone(),
            priority: input.priority,
            order: next_order(column.last_card_order()),
            due_to: Some(input.due_to),
            complete_at: None,
            created_at: timestamp(),
            updated_at: timestamp(),
            column_id: Some(EntityId::Server(input.column_id)),
            reminders: vec![],
        };
        column.cards.push(card.clone());
        Ok(card)
    }

    async fn update_card(&self, card_id: i64, input: &UpdateCard) -> Result<Card> {
        let mut state = self.enter(Op::UpdateCard).await?;
        let Some(target) = input.column_id else {
            let card = state.card_mut(card_id)?;
            card.apply(input);
            return Ok(card.clone());
        };

        let target = target.server_id().ok_or_else(|| {
            AppError::BadRequest("columnId must be a saved column".to_string())
        })?;
        state.column_mut(target)?;
        let mut card = state.take_card(card_id)?;
        card.apply(input);
        state.column_mut(target)?.cards.push(card.clone());
        Ok(card)
    }

    async fn delete_card(&self, card_id: i64) -> Result<()> {
        let mut state = self.enter(Op::DeleteCard).await?;
        state.take_card(card_id)?;
        Ok(())
    }

    async fn complete_card(&self, card_id: i64) -> Result<Card> {
        let mut state = self.enter(Op::CompleteCard).await?;
        let mut card = state.take_card(card_id)?;
        let now = Utc::now();
        card.complete_at = Some(now);

        let today = now.date_naive();
        let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
        let time = monday.format("%Y-%m-%d").to_string();
        match state.completed.iter_mut().find(|g| g.time == time) {
            Some(group) => group.cards.push(card.clone()),
            None => state.completed.insert(
                0,
                CompletedGroup {
                    time,
                    cards: vec![card.clone()],
                },
            ),
        }
        Ok(card)
    }

    async fn list_completed_cards(&self) -> Result<Vec<CompletedGroup>> {
        let state = self.enter(Op::ListCompleted).await?;
        Ok(state.completed.clone())
    }

    async fn create_reminder(&self, input: &CreateReminder) -> Result<Reminder> {
        let mut state = self.enter(Op::CreateReminder).await?;
        let id = state.id();
        let card = state.card_mut(input.card_id)?;
        let reminder = Reminder {
            id: EntityId::Server(id),
            remind_at: input.remind_at,
            sent: false,
            card_id: card.id,
        };
        card.reminders.push(reminder.clone());
        Ok(reminder)
    }
}

/// Notifier that keeps every notification for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(NotificationKind, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.messages().iter().filter(|(k, _)| *k == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, message.to_string()));
    }
}

pub struct TestApp {
    pub state: AppState,
    pub backend: Arc<MockBackend>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Stores wired to `backend` with a recording notifier and the given
/// completion window.
pub fn create_test_app(backend: MockBackend, completion_window: Duration) -> TestApp {
    let backend = Arc::new(backend);
    let notifier = Arc::new(RecordingNotifier::new());
    let config = Config {
        completion_window,
        ..Config::default()
    };
    let state = AppState::new(backend.clone(), notifier.clone(), &config);

    TestApp {
        state,
        backend,
        notifier,
    }
}

/// A test app whose board has been loaded from a server seeded with `columns`.
pub async fn create_loaded_app(columns: Vec<Column>) -> TestApp {
    let app = create_test_app(MockBackend::with_columns(columns), Duration::from_secs(3));
    app.state.columns.fetch_columns().await;
    app
}
