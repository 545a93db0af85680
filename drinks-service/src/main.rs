use drinks_service::{
    auth::{spawn_refresh, KeyStore},
    build_router,
    config::{DrinksConfig, StorageBackend},
    services::{Database, DrinkRepository, InMemoryDrinkRepository},
    AppState,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = DrinksConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.log_format,
        config.otlp_endpoint.as_deref(),
    )?;

    drinks_service::services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting drinks service"
    );

    let repo: Arc<dyn DrinkRepository> = match config.storage.backend {
        StorageBackend::Postgres => {
            let url = config.storage.database_url.as_deref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is not set"))
            })?;
            let db = Database::new(
                url,
                config.storage.max_connections,
                config.storage.min_connections,
            )
            .await?;
            if config.storage.run_migrations {
                db.run_migrations().await?;
            }
            Arc::new(db)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; drinks are lost on restart");
            Arc::new(InMemoryDrinkRepository::new())
        }
    };

    let key_source = config.auth.key_source().ok_or_else(|| {
        AppError::ConfigError(anyhow::anyhow!("No signing key source configured"))
    })?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

    let signing_keys = key_source
        .load(&http)
        .await
        .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
    tracing::info!(keys = signing_keys.len(), "Signing keys loaded");
    let keys = Arc::new(KeyStore::new(signing_keys));

    let refresh_task = config
        .auth
        .refresh_interval()
        .map(|every| spawn_refresh(keys.clone(), key_source.clone(), http.clone(), every));

    let addr = config.common.socket_addr();
    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );

    let state = AppState::new(config, repo, keys);
    let app = build_router(state)?;

    let _guard = service_span.enter();
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = refresh_task {
        task.abort();
    }

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
