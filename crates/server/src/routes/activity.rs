use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::activity_log::{ActivityLog, EntityType};
use serde::Deserialize;
use services::services::activity::ActivityService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{deployment::Deployment, error::ApiError};

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
}

/// Recent activity, or the full history of one record when both
/// `entity_type` and `entity_id` are given.
pub async fn list_activity(
    State(deployment): State<Deployment>,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityLog>>>, ApiError> {
    let pool = &deployment.db().pool;
    let entries = match (query.entity_type, query.entity_id) {
        (Some(entity_type), Some(entity_id)) => ActivityService::for_entity(pool, entity_type, entity_id).await?,
        (None, None) => ActivityService::recent(pool, query.limit).await?,
        (Some(_), None) => return Err(ApiError::invalid("entity_id", "is required when entity_type is set")),
        (None, Some(_)) => return Err(ApiError::invalid("entity_type", "is required when entity_id is set")),
    };
    Ok(ResponseJson(ApiResponse::success(entries)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/activity", get(list_activity))
}
