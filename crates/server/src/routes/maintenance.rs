//! Dashboard figures and database upkeep.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::Utc;
use db::models::stats::DashboardStats;
use services::services::{
    database_maintenance::{CleanupReport, DatabaseMaintenance, HealthReport, OptimizeReport},
    maintenance::{MaintenanceRun, MaintenanceService},
};
use utils::response::ApiResponse;

use crate::{deployment::Deployment, error::ApiError};

pub async fn get_stats(State(deployment): State<Deployment>) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let stats = DatabaseMaintenance::new(deployment.db().pool.clone())
        .stats(Utc::now().date_naive())
        .await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn database_health(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<HealthReport>>, ApiError> {
    let report = DatabaseMaintenance::new(deployment.db().pool.clone()).health().await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub async fn optimize_database(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<OptimizeReport>>, ApiError> {
    let report = DatabaseMaintenance::new(deployment.db().pool.clone()).optimize().await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub async fn cleanup_database(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<CleanupReport>>, ApiError> {
    let report = DatabaseMaintenance::new(deployment.db().pool.clone())
        .cleanup(deployment.storage(), deployment.config().activity_retention_days)
        .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// Runs the overdue/expiry pass now instead of waiting for the next tick.
pub async fn update_statuses(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<MaintenanceRun>>, ApiError> {
    let run = MaintenanceService::update_statuses(deployment.db(), Utc::now().date_naive()).await?;
    Ok(ResponseJson(ApiResponse::success(run)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/stats", get(get_stats)).nest(
        "/maintenance",
        Router::new()
            .route("/health", get(database_health))
            .route("/optimize", post(optimize_database))
            .route("/cleanup", post(cleanup_database))
            .route("/statuses", post(update_statuses)),
    )
}
