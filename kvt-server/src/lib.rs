//! kvt-server library - media library backend
//!
//! Wires the entity store, ingestion pipeline and HTTP API around one
//! [`AppContext`] built at startup.

use axum::Router;
use kvt_common::auth::{PasswordHasher, Sha256PasswordHasher};
use kvt_common::config::{AppConfig, ConfirmMode};
use kvt_common::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod executor;
pub mod services;
pub mod store;
pub mod utils;

use executor::TaskExecutor;
use services::{
    AutoConfirm, ConsoleConfirm, DiskFileStore, FileStore, IngestionPipeline, LoftyTagParser,
    MetadataConfirmer,
};
use store::{LibraryStore, SqliteEntityStore};

/// Shared application state, constructed once in `main`
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn LibraryStore>,
    pub files: Arc<dyn FileStore>,
    pub passwords: Arc<dyn PasswordHasher>,
}

impl AppContext {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn LibraryStore>,
        files: Arc<dyn FileStore>,
        passwords: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            config,
            store,
            files,
            passwords,
        }
    }

    /// Open the database and build the production collaborators
    ///
    /// Store operations are cancelled when `cancel` fires.
    pub async fn open(config: Arc<AppConfig>, cancel: CancellationToken) -> Result<Self> {
        let db_path = config.database_path();
        let pool = db::init_database_pool(&db_path, &config.database).await?;

        let executor = TaskExecutor::from_config(&config.executor).with_cancellation(cancel);
        let store = SqliteEntityStore::from_config(pool, executor, &config);
        let files = DiskFileStore::new(config.root_folder());

        Ok(Self::new(
            Arc::clone(&config),
            Arc::new(store),
            Arc::new(files),
            Arc::new(Sha256PasswordHasher::new()),
        ))
    }

    /// Ingestion pipeline over this context's store and file store
    pub fn ingestion_pipeline(&self) -> IngestionPipeline {
        let confirmer: Arc<dyn MetadataConfirmer> = match self.config.ingest.confirm {
            ConfirmMode::Auto => Arc::new(AutoConfirm),
            ConfirmMode::Console => Arc::new(ConsoleConfirm::stdio()),
        };

        IngestionPipeline::new(
            self.config.staging_dir(),
            Arc::clone(&self.store),
            Arc::clone(&self.files),
            Arc::new(LoftyTagParser::new()),
            confirmer,
        )
        .with_scan_interval(Duration::from_secs(self.config.ingest.scan_interval_secs))
    }
}

/// Build application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .merge(api::health_routes())
        .nest("/api/v1", api::library_routes())
        .merge(api::file_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
