use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::{error, info};

use crate::services::sessions;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

pub struct CleanupService {
    db: DatabaseConnection,
}

impl CleanupService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Purges expired sessions once an hour, starting immediately.
    pub async fn run_scheduler(self) {
        info!("cleanup scheduler started");
        let mut interval = tokio::time::interval(PURGE_INTERVAL);

        loop {
            interval.tick().await;
            match sessions::purge_expired(&self.db).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "removed expired sessions"),
                Err(e) => error!(error = %e, "failed to purge expired sessions"),
            }
        }
    }
}
