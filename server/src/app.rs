//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{CatalogRules, ServerConfig};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{IdentityStore, ListingService, NoteCatalog, SessionStore};
use crate::storage::BlobStore;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub identity: IdentityStore,
    pub catalog: NoteCatalog,
    pub listing: ListingService,
    pub sessions: SessionStore,
}

impl AppState {
    /// Wire services over an open pool and an initialized blob store
    pub fn new(config: ServerConfig, pool: SqlitePool, blob_store: BlobStore) -> Result<Self> {
        let repo = Repository::new(pool);
        let rules = Arc::new(CatalogRules::default());

        Ok(Self {
            config: Arc::new(config),
            identity: IdentityStore::new(repo.clone())?,
            catalog: NoteCatalog::new(repo.clone(), blob_store, rules),
            listing: ListingService::new(repo),
            sessions: SessionStore::new(),
        })
    }
}

/// Application setup - called once on startup
pub async fn setup(config: ServerConfig) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Data directory: {:?}", config.data_dir);

    std::fs::create_dir_all(&config.data_dir)?;

    let pool = create_pool(&config.database_path()).await?;

    let blob_store = BlobStore::new(config.uploads_dir());
    blob_store.initialize().await?;

    let state = AppState::new(config, pool, blob_store)?;

    tracing::info!("Application initialized successfully");

    Ok(state)
}

/// State over an in-memory database and a temporary uploads directory
#[cfg(test)]
pub(crate) async fn test_state() -> (AppState, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = ServerConfig {
        data_dir: temp_dir.path().to_path_buf(),
        ..ServerConfig::default()
    };

    let blob_store = BlobStore::new(config.uploads_dir());
    blob_store.initialize().await.unwrap();

    let pool = crate::database::create_test_pool().await;
    let state = AppState::new(config, pool, blob_store).unwrap();

    (state, temp_dir)
}
