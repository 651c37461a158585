//! Arcade Back binary entrypoint wiring configuration, storage and the REST layer.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arcade_back::{
    config::{AppConfig, StorageConfig},
    dao::{storage::StorageError, store::Store},
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let port = config.server.port;
    let app_state = AppState::new(config);

    app_state
        .paths()
        .ensure_roots()
        .await
        .context("creating storage roots")?;

    spawn_storage(&app_state);
    // Build the HTTP router once the shared state is ready.
    let app = routes::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the supervisor of the backend selected by the database URL scheme.
fn spawn_storage(state: &SharedState) {
    let storage = state.config().storage.clone();

    #[cfg(feature = "mongo-store")]
    if is_mongo_url(&storage.database_url) {
        info!("using MongoDB storage backend");
        tokio::spawn(storage_supervisor::run(state.clone(), move || {
            connect_mongo(storage.clone())
        }));
        return;
    }

    info!("using SQLite storage backend");
    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        connect_sqlite(storage.clone())
    }));
}

#[cfg(feature = "mongo-store")]
fn is_mongo_url(url: &str) -> bool {
    url.starts_with("mongodb://") || url.starts_with("mongodb+srv://")
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(storage: StorageConfig) -> Result<Arc<dyn Store>, StorageError> {
    use arcade_back::dao::store::mongodb::{MongoConfig, MongoStore};

    let config =
        MongoConfig::from_uri(&storage.database_url, storage.mongo_database.as_deref()).await?;
    let store = MongoStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "sqlite-store")]
async fn connect_sqlite(storage: StorageConfig) -> Result<Arc<dyn Store>, StorageError> {
    use arcade_back::dao::store::sqlite::{SqliteConfig, SqliteStore};

    let config = SqliteConfig::from_url(&storage.database_url)?;
    let store = SqliteStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite-store"))]
async fn connect_sqlite(storage: StorageConfig) -> Result<Arc<dyn Store>, StorageError> {
    Err(StorageError::unavailable(
        format!("no backend compiled in for `{}`", storage.database_url),
        std::io::Error::from(std::io::ErrorKind::Unsupported),
    ))
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
