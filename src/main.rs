use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotthebot::{
    app::AppState, config::GameConfig, prompts::PromptDeck, scheduler, state::GameEngine,
    store::RoomStore, ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotthebot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting spotthebot...");

    let config = GameConfig::from_env();
    tracing::info!(
        response_secs = config.response_time_limit,
        guessing_secs = config.guessing_time_limit,
        results_secs = config.results_display_time,
        max_players = config.max_players_per_room,
        "Game config loaded"
    );

    let prompts = match PromptDeck::load(config.prompts_file.as_deref()) {
        Ok(deck) => {
            tracing::info!("Loaded {} prompts", deck.len());
            deck
        }
        Err(e) => {
            tracing::warn!("Failed to load prompt deck: {}. Using built-in prompts.", e);
            PromptDeck::builtin()
        }
    };

    let bind_addr = config.bind_addr;
    let poll = config.deadline_poll;
    let store = Arc::new(RoomStore::new(config.max_players_per_room));
    let engine = GameEngine::new(store, config);
    let state = Arc::new(AppState::new(engine, prompts));

    // Spawn background task for forcing phases whose deadline has passed
    scheduler::spawn_phase_deadline_watcher(state.clone(), poll);

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", bind_addr);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
