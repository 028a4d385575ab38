use db::models::activity_log::{ActivityLog, EntityType};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::error::ServiceError;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

pub struct ActivityService;

impl ActivityService {
    /// Most recent entries first. `limit` is clamped to `1..=MAX_LIMIT`.
    pub async fn recent(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<ActivityLog>, ServiceError> {
        Ok(ActivityLog::find_recent(pool, clamp_limit(limit)).await?)
    }

    pub async fn for_entity(
        pool: &SqlitePool,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<ActivityLog>, ServiceError> {
        Ok(ActivityLog::find_by_entity(pool, entity_type, entity_id).await?)
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
