use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use landbook::application::handlers::router;
use landbook::application::state::AppState;
use landbook::auth::ApiKeys;
use landbook::config::AppConfig;
use landbook::domain::services::calendar::SystemCalendar;
use landbook::infrastructure::local_blob_store::LocalBlobStore;
use landbook::persistence::{init_database_with, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "landbook=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Landbook starting...");

    let config = AppConfig::from_env();
    info!("Configuration loaded: {:?}", config);

    let api_keys = match ApiKeys::from_env() {
        Ok(keys) => keys,
        Err(e) => {
            error!("API keys are not usable: {}", e);
            return Err(e.into());
        }
    };
    info!("{} API key(s) loaded", api_keys.len());

    let db_config = DatabaseConfig::from_env();
    let pool = init_database_with(&db_config).await?;

    tokio::fs::create_dir_all(&config.storage_root).await?;
    let blobs = Arc::new(LocalBlobStore::new(
        config.storage_root.clone(),
        config.public_base_url.clone(),
        config.storage_signing_key.clone(),
    ));

    let addr = config.bind_addr;
    let state = AppState::new(pool.clone(), config, blobs, Arc::new(SystemCalendar), api_keys);
    let app = router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutting down gracefully...");
    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}
