use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanban_sync::auth::TokenSession;
use kanban_sync::config::Config;
use kanban_sync::services::{HttpBackend, TracingNotifier};
use kanban_sync::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kanban_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let session = Arc::new(TokenSession::new(
        &config.api_url,
        config.access_token.clone(),
        config.refresh_token.clone(),
    ));
    let backend = Arc::new(HttpBackend::from_config(&config, session)?);
    tracing::info!("Using backend at {}", backend.base_url());

    let state = AppState::new(backend, Arc::new(TracingNotifier), &config);

    let command = std::env::args().nth(1).unwrap_or_else(|| "board".to_string());
    match command.as_str() {
        "board" => print_board(&state).await,
        "completed" => print_completed(&state).await,
        other => anyhow::bail!("Unknown command {:?}, expected `board` or `completed`", other),
    }

    Ok(())
}

async fn print_board(state: &AppState) {
    state.columns.fetch_columns().await;

    for column in state.columns.columns() {
        println!("{} [{}]", column.title, column.id);
        for card in &column.cards {
            let due = card
                .due_to
                .map(|d| d.format(" (due %Y-%m-%d)").to_string())
                .unwrap_or_default();
            println!("  - P{} {}{}", card.priority, card.title, due);
        }
    }
}

async fn print_completed(state: &AppState) {
    if !state.completed.refresh().await {
        return;
    }

    for group in state.completed.groups() {
        println!("{}", group.title());
        for card in &group.cards {
            println!("  - {}", card.title);
        }
    }
}
