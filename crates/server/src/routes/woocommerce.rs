use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::woocommerce::{UpdateWooCommerceSettings, WooCommerceExportLog, WooCommerceSettingsView};
use services::services::woocommerce::{ExportRequest, WooCommerceService};
use utils::response::ApiResponse;

use crate::{deployment::Deployment, error::ApiError};

/// `data` is null until the store has been configured.
pub async fn get_settings(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Option<WooCommerceSettingsView>>>, ApiError> {
    let settings = WooCommerceService::settings(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub async fn update_settings(
    State(deployment): State<Deployment>,
    Json(payload): Json<UpdateWooCommerceSettings>,
) -> Result<ResponseJson<ApiResponse<WooCommerceSettingsView>>, ApiError> {
    let settings = WooCommerceService::update_settings(&deployment.db().pool, payload).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub async fn test_connection(State(deployment): State<Deployment>) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    WooCommerceService::test_connection(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn export_products(
    State(deployment): State<Deployment>,
    Json(request): Json<ExportRequest>,
) -> Result<ResponseJson<ApiResponse<WooCommerceExportLog>>, ApiError> {
    let log = WooCommerceService::export(&deployment.db().pool, request).await?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

pub async fn export_logs(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<WooCommerceExportLog>>>, ApiError> {
    let logs = WooCommerceService::export_logs(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(logs)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/woocommerce-products",
        Router::new()
            .route("/settings", get(get_settings).put(update_settings))
            .route("/test-connection", post(test_connection))
            .route("/export", post(export_products))
            .route("/logs", get(export_logs)),
    )
}
