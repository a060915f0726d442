use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academia::api::router;
use academia::config::AppConfig;
use academia::db::{KeyValueStore, SqliteKeyValueStore};
use academia::document::{DocumentService, DocumentServiceConfig, HttpDocumentService, NoopDocumentService};
use academia::notify::LogSink;
use academia::services::ReminderScheduler;
use academia::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "academia=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(pool));

    let documents: Arc<dyn DocumentService> = match &config.document_service_url {
        Some(base_url) => Arc::new(HttpDocumentService::new(DocumentServiceConfig {
            base_url: base_url.clone(),
            api_token: config.document_service_token.clone(),
        })?),
        None => {
            warn!("DOCUMENT_SERVICE_URL is not set; document extraction is disabled");
            Arc::new(NoopDocumentService)
        }
    };

    let state = AppState::load(kv, documents, config.grid.clone()).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = ReminderScheduler::new(
        state.lessons.clone(),
        state.permission.clone(),
        Arc::new(LogSink),
        config.reminder_interval_secs,
        config.reminder_policy,
    );
    let reminders = tokio::spawn(scheduler.start(shutdown_rx));

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    reminders.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
    }
    info!("shutting down");
}
