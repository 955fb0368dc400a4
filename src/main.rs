use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use swimsmart::api::create_routes;
use swimsmart::config::{AppConfig, StorageBackend};
use swimsmart::store::{MemoryStore, PgStore, SwimStore};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store: Arc<dyn SwimStore> = match &config.storage_backend {
        StorageBackend::Postgres(database) => {
            let store = PgStore::connect(database)
                .await
                .context("Failed to prepare PostgreSQL storage")?;
            info!(max_connections = database.max_connections, "Using PostgreSQL storage");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let app = create_routes(store, &config);

    let address = config.server_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(env = %config.environment, version = %config.version, "SwimSmart listening on http://{}", address);

    // The login limiter keys on the peer address
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("Received SIGINT, shutting down");
}
