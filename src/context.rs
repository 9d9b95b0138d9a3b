/// Application context and dependency injection
use crate::{
    assets::{self, AssetBackend},
    config::{AssetBackendConfig, ServerConfig},
    db::{self, VideoStore},
    error::{TubelyError, TubelyResult},
    upload::UploadPipeline,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub videos: Arc<VideoStore>,
    pub uploads: Arc<UploadPipeline>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> TubelyResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        // Backend is fixed for the life of the process
        let backend = assets::backend_from_config(&config).await?;

        Ok(Self::from_parts(config, db, backend))
    }

    /// Assemble a context from already-initialized parts
    pub fn from_parts(
        config: ServerConfig,
        db: SqlitePool,
        backend: Arc<dyn AssetBackend>,
    ) -> Self {
        let config = Arc::new(config);
        let videos = Arc::new(VideoStore::new(db.clone()));
        let uploads = Arc::new(UploadPipeline::new(
            Arc::clone(&config),
            Arc::clone(&videos),
            backend,
        ));

        Self {
            config,
            db,
            videos,
            uploads,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> TubelyResult<()> {
        let dirs = vec![&config.storage.data_directory, &config.storage.tmp_location];

        for dir in dirs {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                TubelyError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        if let AssetBackendConfig::Disk { assets_root } = &config.storage.backend {
            tokio::fs::create_dir_all(assets_root).await?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
