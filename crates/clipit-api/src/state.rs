//! Application state.

use std::sync::Arc;

use tracing::info;

use clipit_firestore::{FirestoreClient, UserRepository, UserStore};
use clipit_storage::{ClipGateway, GcsClient, ObjectStore, UploadRelay};
use clipit_worker::{CommandProcessor, DetachedJobLauncher, JobLauncher, WorkerConfig};

use crate::config::{ApiConfig, ConfigError, ServiceConfig};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub clips: ClipGateway,
    pub users: Arc<dyn UserStore>,
    pub launcher: Arc<dyn JobLauncher>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        clips: ClipGateway,
        users: Arc<dyn UserStore>,
        launcher: Arc<dyn JobLauncher>,
    ) -> Self {
        Self {
            config,
            clips,
            users,
            launcher,
        }
    }

    /// Build every client from the environment.
    pub fn from_env(config: ApiConfig, service: &ServiceConfig) -> Result<Self, ConfigError> {
        let firestore = FirestoreClient::from_key_file(&service.key.path)?;
        info!(
            project_id = %firestore.config().project_id,
            database_id = %firestore.config().database_id,
            base_url = %firestore.config().base_url,
            "Firestore client ready"
        );
        let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(firestore));

        let store: Arc<dyn ObjectStore> = Arc::new(GcsClient::new(service.storage.clone()));
        info!(bucket = store.bucket(), "Object store client ready");

        let worker = WorkerConfig::from_env();
        info!(
            processor = %worker.processor_cmd,
            work_dir = %worker.work_dir.display(),
            "Clip processor configured"
        );
        let launcher = DetachedJobLauncher::new(
            Arc::clone(&users),
            Arc::new(CommandProcessor::from_config(&worker)),
            UploadRelay::new(Arc::clone(&store)),
            worker.enhanced_mode,
        );

        Ok(Self::new(
            config,
            ClipGateway::new(store),
            users,
            Arc::new(launcher),
        ))
    }
}
