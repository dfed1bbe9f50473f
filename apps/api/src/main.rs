mod answers;
mod auth;
mod config;
mod db;
mod documents;
mod errors;
mod extract;
mod grading;
mod interviews;
mod llm_client;
mod models;
mod quota;
mod ratings;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod test_support;
mod users;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::grading::evaluator::LlmEvaluator;
use crate::grading::queue::{ChannelGradingQueue, GradingQueue, RedisGradingQueue};
use crate::grading::worker::GradingWorker;
use crate::interviews::generator::LlmQuestionGenerator;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{EntityStore, PgEntityStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview Coach API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    let store: Arc<dyn EntityStore> = Arc::new(PgEntityStore::new(pool));

    // Grading queue: Redis when configured, in-process channel otherwise
    let grading_queue: Arc<dyn GradingQueue> = match &config.redis_url {
        Some(url) => {
            let queue = RedisGradingQueue::connect(url).await?;
            info!("Grading queue: Redis");
            Arc::new(queue)
        }
        None => {
            info!("Grading queue: in-process channel (jobs do not survive restarts)");
            Arc::new(ChannelGradingQueue::new())
        }
    };

    // Initialize LLM-backed collaborators
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let evaluator = Arc::new(LlmEvaluator::new(llm.clone()));
    let generator = Arc::new(LlmQuestionGenerator::new(llm));

    // Background grading workers
    let workers = GradingWorker::new(
        store.clone(),
        evaluator.clone(),
        grading_queue.clone(),
        config.grading.clone(),
    )
    .spawn();
    info!(
        "Started {} grading workers (max {} attempts, inline timeout {:?})",
        workers.len(),
        config.grading.max_attempts,
        config.grading.inline_timeout
    );

    let state = AppState {
        store,
        evaluator,
        generator,
        grading_queue,
        grading: config.grading.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
