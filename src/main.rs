//! Agenda bot - conversational scheduling assistant
//!
//! Receives chat messages over a webhook, turns natural-language event
//! descriptions into stored events and answers agenda questions.

mod api;
mod clock;
mod config;
mod db;
mod extraction;
mod intent;
mod llm;
mod replies;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use clock::SystemClock;
use config::AppConfig;
use db::Database;
use extraction::EventExtractor;
use llm::ModelRegistry;
use runtime::{Assistant, DatabaseStorage, ProductionAssistant, RegistryLlmClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agenda_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));
    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!(
            "No LLM API keys configured. Set GEMINI_API_KEY, ANTHROPIC_API_KEY or LLM_GATEWAY. \
             Event descriptions will be answered with a clarification request."
        );
    }

    let llm_client = RegistryLlmClient::new(
        llm_registry.clone(),
        llm_registry.default_model_id().to_string(),
    );
    let assistant: ProductionAssistant = Assistant::new(
        DatabaseStorage::new(db),
        EventExtractor::new(llm_client, config.extraction_timeout),
        Arc::new(SystemClock::new(config.utc_offset)),
    );

    let app = create_router(AppState::new(Arc::new(assistant))).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(utc_offset = %config.utc_offset, "Agenda bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
