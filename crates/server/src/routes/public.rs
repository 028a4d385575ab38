//! Unauthenticated views behind share tokens. Drafts and unknown tokens are
//! both reported as not found.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::Utc;
use db::models::{estimate::PublicEstimate, invoice::PublicInvoice};
use services::services::{
    estimates::{EstimateService, PublicResponse},
    invoices::InvoiceService,
};
use utils::response::ApiResponse;

use crate::{deployment::Deployment, error::ApiError};

pub async fn public_invoice(
    State(deployment): State<Deployment>,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<PublicInvoice>>, ApiError> {
    let invoice = InvoiceService::public_view(&deployment.db().pool, &token).await?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub async fn public_estimate(
    State(deployment): State<Deployment>,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<PublicEstimate>>, ApiError> {
    let today = Utc::now().date_naive();
    let estimate = EstimateService::public_view(&deployment.db().pool, &token, today).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

pub async fn accept_estimate(
    State(deployment): State<Deployment>,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<PublicEstimate>>, ApiError> {
    respond(&deployment, &token, PublicResponse::Accept).await
}

pub async fn reject_estimate(
    State(deployment): State<Deployment>,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<PublicEstimate>>, ApiError> {
    respond(&deployment, &token, PublicResponse::Reject).await
}

async fn respond(
    deployment: &Deployment,
    token: &str,
    response: PublicResponse,
) -> Result<ResponseJson<ApiResponse<PublicEstimate>>, ApiError> {
    let today = Utc::now().date_naive();
    let estimate = EstimateService::respond_public(&deployment.db().pool, token, response, today).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/public",
        Router::new()
            .route("/invoices/{token}", get(public_invoice))
            .route("/estimates/{token}", get(public_estimate))
            .route("/estimates/{token}/accept", post(accept_estimate))
            .route("/estimates/{token}/reject", post(reject_estimate)),
    )
}
