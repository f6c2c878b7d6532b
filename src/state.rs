use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::services::cache::ResponseCache;
use crate::services::file_service::FileService;
use crate::services::github::GithubClient;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub files: Arc<dyn FileService>,
    pub cache: ResponseCache,
    pub config: Arc<Config>,
    pub github: Option<GithubClient>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, files: Arc<dyn FileService>, config: Config) -> Self {
        let github = config
            .github
            .clone()
            .map(|github| GithubClient::new(github, config.github_callback_url()));

        Self {
            db,
            files,
            cache: ResponseCache::new(),
            config: Arc::new(config),
            github,
        }
    }
}
