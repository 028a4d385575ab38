use db::models::{
    activity_log::{ActivityLog, EntityType},
    stats::DashboardStats,
};
use serde::Serialize;
use uuid::Uuid;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Serialize)]
struct HistoryQuery {
    entity_type: EntityType,
    entity_id: Uuid,
}

#[derive(Debug, Serialize)]
struct RecentQuery {
    limit: Option<i64>,
}

/// Activity feed and dashboard figures
#[derive(Debug, Clone)]
pub struct ActivityApi {
    client: ApiClient,
}

impl ActivityApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn recent(&self, limit: Option<i64>) -> Result<Vec<ActivityLog>, ClientError> {
        self.client.get_with("activity", &RecentQuery { limit }).await
    }

    pub async fn history(&self, entity_type: EntityType, entity_id: Uuid) -> Result<Vec<ActivityLog>, ClientError> {
        self.client
            .get_with("activity", &HistoryQuery { entity_type, entity_id })
            .await
    }

    pub async fn stats(&self) -> Result<DashboardStats, ClientError> {
        self.client.get("stats").await
    }
}
