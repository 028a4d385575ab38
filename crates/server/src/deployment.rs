use std::sync::Arc;

use db::DBService;
use services::services::file_storage::{FileStorage, FileStorageError};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] FileStorageError),
}

/// Shared state behind every handler
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    config: Arc<Config>,
    storage: FileStorage,
}

impl Deployment {
    pub async fn new(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        let deployment = Self::with_db(db, config);
        deployment.storage.ensure_root().await?;
        Ok(deployment)
    }

    /// Wraps an already opened database, e.g. an in-memory one in tests.
    pub fn with_db(db: DBService, config: Config) -> Self {
        let storage = FileStorage::new(config.upload_dir.clone(), config.max_upload_bytes);
        Self {
            db,
            config: Arc::new(config),
            storage,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }
}
