use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::estimate::{
    Estimate, EstimateConversion, EstimatePayload, EstimateQuery, EstimateStatusChange, EstimateWithItems,
};
use services::services::estimates::EstimateService;
use utils::{response::ApiResponse, share_token::ShareLink};
use uuid::Uuid;

use crate::{deployment::Deployment, error::ApiError};

pub async fn list_estimates(
    State(deployment): State<Deployment>,
    Query(query): Query<EstimateQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Estimate>>>, ApiError> {
    let estimates = EstimateService::list(&deployment.db().pool, &query).await?;
    Ok(ResponseJson(ApiResponse::success(estimates)))
}

pub async fn get_estimate(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<EstimateWithItems>>, ApiError> {
    let estimate = EstimateService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

pub async fn create_estimate(
    State(deployment): State<Deployment>,
    Json(payload): Json<EstimatePayload>,
) -> Result<ResponseJson<ApiResponse<EstimateWithItems>>, ApiError> {
    let validity = deployment.config().estimate_validity_days;
    let estimate = EstimateService::create(&deployment.db().pool, payload, validity).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

pub async fn update_estimate(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EstimatePayload>,
) -> Result<ResponseJson<ApiResponse<EstimateWithItems>>, ApiError> {
    let estimate = EstimateService::update(&deployment.db().pool, id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

pub async fn delete_estimate(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    EstimateService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn change_estimate_status(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
    Json(change): Json<EstimateStatusChange>,
) -> Result<ResponseJson<ApiResponse<Estimate>>, ApiError> {
    let estimate = EstimateService::change_status(&deployment.db().pool, id, change).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

/// Creates a draft invoice from the estimate and marks it converted.
pub async fn convert_estimate(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<EstimateConversion>>, ApiError> {
    let terms = deployment.config().default_payment_terms_days;
    let conversion = EstimateService::convert_to_invoice(&deployment.db().pool, id, terms).await?;
    Ok(ResponseJson(ApiResponse::success(conversion)))
}

pub async fn share_estimate(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ShareLink>>, ApiError> {
    let link = EstimateService::share(&deployment.db().pool, id, &deployment.config().public_base_url).await?;
    Ok(ResponseJson(ApiResponse::success(link)))
}

pub async fn unshare_estimate(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Estimate>>, ApiError> {
    let estimate = EstimateService::unshare(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/estimates",
        Router::new()
            .route("/", get(list_estimates).post(create_estimate))
            .route("/{id}", get(get_estimate).put(update_estimate).delete(delete_estimate))
            .route("/{id}/status", post(change_estimate_status))
            .route("/{id}/convert", post(convert_estimate))
            .route("/{id}/share", post(share_estimate).delete(unshare_estimate)),
    )
}
