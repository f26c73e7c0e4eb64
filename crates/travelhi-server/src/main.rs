//! API server binary for Travel Hi.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `travelhi-config.yaml` (or `TRAVELHI_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the configured store and run migrations
//! 4. Build moderation and, when an LLM is configured, the predictor
//! 5. Prepare the upload directory
//! 6. Serve until `Ctrl-C`

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use travelhi_ai::{
    AiError, CompletionBackend, DisruptionPredictor, Moderator, ProfanityFilter, PromptEngine,
    create_backend,
};
use travelhi_core::{EventStore, InMemoryStore, ReportStore};
use travelhi_db::{Database, PgStore, PoolSettings};
use travelhi_server::config::{LogFormat, LoggingConfig, StorageBackend, StorageConfig};
use travelhi_server::images::ImageStore;
use travelhi_server::{AppConfig, AppState, ConnectionRegistry, start_server};

type Stores = (Arc<dyn ReportStore>, Arc<dyn EventStore>);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage, or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    info!(
        host = config.server.host,
        port = config.server.port,
        storage = ?config.storage.backend,
        upload_dir = %config.images.upload_dir.display(),
        "travelhi-server starting"
    );

    let (reports, events) = open_stores(&config.storage).await?;

    let prompts = Arc::new(PromptEngine::new()?);
    let backend = config
        .llm
        .backend_config()
        .map(|llm| -> Result<Arc<dyn CompletionBackend>, AiError> {
            let backend: Arc<dyn CompletionBackend> = Arc::new(create_backend(&llm)?);
            info!(backend = backend.name(), model = llm.model, "LLM backend configured");
            Ok(backend)
        })
        .transpose()?;
    if backend.is_none() {
        info!("LLM disabled or no API key set, disruption prediction unavailable");
    }

    let mut moderator = Moderator::new(ProfanityFilter::new()?);
    if config.llm.moderation_classifier
        && let Some(backend) = &backend
    {
        moderator = moderator.with_classifier(Arc::clone(backend), Arc::clone(&prompts));
    }
    let moderator = Arc::new(moderator);

    let images = ImageStore::new(config.images.upload_dir.clone(), config.images.max_bytes);
    images.ensure_dir().await?;

    let registry = Arc::new(ConnectionRegistry::new(config.realtime.send_timeout()));
    let mut state = AppState::new(reports, events, registry, images, Arc::clone(&moderator))
        .with_public_base_url(config.server.public_base_url.clone());
    if let Some(backend) = backend {
        state = state.with_predictor(Arc::new(DisruptionPredictor::new(
            backend,
            prompts,
            moderator,
        )));
    }

    start_server(&config.server, Arc::new(state)).await?;
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Open the configured store. `PostgreSQL` migrations run before the
/// store is handed out.
async fn open_stores(storage: &StorageConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    match storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store, data is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            Ok((
                Arc::clone(&store) as Arc<dyn ReportStore>,
                store as Arc<dyn EventStore>,
            ))
        }
        StorageBackend::Postgres => {
            let settings = PoolSettings::from_url(storage.postgres_url.as_str())
                .max_connections(storage.max_connections);
            let db = Database::connect(&settings).await?;
            db.migrate().await?;
            info!(max_connections = storage.max_connections, "PostgreSQL store ready");
            let store = Arc::new(PgStore::new(&db));
            Ok((
                Arc::clone(&store) as Arc<dyn ReportStore>,
                store as Arc<dyn EventStore>,
            ))
        }
    }
}
