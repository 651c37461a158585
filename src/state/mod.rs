use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::store::Store,
    error::ServiceError,
    services::{ai_service::AiService, auth_service::TokenKeys, storage_paths::StoragePaths},
};

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, the storage handle and long-lived services.
pub struct AppState {
    store: RwLock<Option<Arc<dyn Store>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    paths: StoragePaths,
    tokens: TokenKeys,
    ai: AiService,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let ai = AiService::from_config(config.ai.clone());
        Self::with_ai(config, ai)
    }

    /// Same as [`AppState::new`] with an explicitly built AI service.
    pub fn with_ai(config: AppConfig, ai: AiService) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            degraded: degraded_tx,
            paths: StoragePaths::new(&config.storage),
            tokens: TokenKeys::new(&config.auth),
            ai,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }

    pub fn ai(&self) -> &AiService {
        &self.ai
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn Store>> {
        self.store.read().await.as_ref().cloned()
    }

    /// Store handle for request handlers; fails with [`ServiceError::Degraded`] while storage is
    /// unavailable.
    pub async fn require_store(&self) -> Result<Arc<dyn Store>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn Store>) {
        *self.store.write().await = Some(store);
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        self.store.write().await.take();
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
