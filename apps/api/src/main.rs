mod config;
mod consultation;
mod dashboard;
mod db;
mod errors;
mod feedback;
mod llm_client;
mod models;
mod policy;
mod routes;
mod safety;
mod state;
mod storage;
mod submission_guard;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, GuardBackend, StorageBackend};
use crate::consultation::pipeline::ConsultationPipeline;
use crate::consultation::topics::TopicClassifier;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::safety::SafetyLexicon;
use crate::state::AppState;
use crate::storage::{InteractionStore, JsonFileStore, MemoryStore, PgStore, PolicyStore};
use crate::submission_guard::{InMemoryGuard, RedisGuard, SubmissionGuard};

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

    info!("Starting Albert API v{}", env!("CARGO_PKG_VERSION"));

    // Compile safety patterns (an invalid override aborts startup)
    let lexicon = match &config.safety_lexicon_path {
        Some(path) => {
            info!("Loading safety lexicon from {}", path.display());
            SafetyLexicon::from_file(path)?
        }
        None => SafetyLexicon::default(),
    };
    let rules = lexicon.compile()?;
    info!(
        "Safety rules compiled: {} sensitive, {} forbidden patterns",
        rules.sensitivity.pattern_count(),
        rules.compliance.pattern_count()
    );
    let topics = TopicClassifier::new()?;

    // Initialize storage
    let (interactions, policies): (Arc<dyn InteractionStore>, Arc<dyn PolicyStore>) =
        match &config.storage {
            StorageBackend::Postgres { database_url } => {
                let store = Arc::new(PgStore::new(create_pool(database_url).await?));
                (store.clone(), store)
            }
            StorageBackend::JsonFiles { data_dir } => {
                let store = Arc::new(JsonFileStore::open(data_dir).await?);
                info!("JSON-lines storage at {}", data_dir.display());
                (store.clone(), store)
            }
            StorageBackend::Memory => {
                info!("In-memory storage; records are lost on restart");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    // Initialize submission guard
    let guard: Arc<dyn SubmissionGuard> = match &config.guard {
        GuardBackend::Memory => Arc::new(InMemoryGuard::new()),
        GuardBackend::Redis { redis_url } => {
            let client = redis::Client::open(redis_url.as_str())?;
            info!("Redis submission guard initialized");
            Arc::new(RedisGuard::new(client, config.submission_ttl))
        }
    };

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_timeout,
    )?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let pipeline = ConsultationPipeline::new(
        llm,
        interactions.clone(),
        policies.clone(),
        rules,
        topics,
        config.triage_fallback,
    );
    info!("Triage fallback: {:?}", config.triage_fallback);

    // Build app state
    let state = AppState {
        pipeline,
        interactions,
        policies,
        guard,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
