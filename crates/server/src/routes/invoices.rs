use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::invoice::{Invoice, InvoicePayload, InvoiceQuery, InvoiceStatusChange, InvoiceWithItems};
use services::services::invoices::InvoiceService;
use utils::{response::ApiResponse, share_token::ShareLink};
use uuid::Uuid;

use crate::{deployment::Deployment, error::ApiError};

pub async fn list_invoices(
    State(deployment): State<Deployment>,
    Query(query): Query<InvoiceQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Invoice>>>, ApiError> {
    let invoices = InvoiceService::list(&deployment.db().pool, &query).await?;
    Ok(ResponseJson(ApiResponse::success(invoices)))
}

pub async fn get_invoice(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<InvoiceWithItems>>, ApiError> {
    let invoice = InvoiceService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub async fn create_invoice(
    State(deployment): State<Deployment>,
    Json(payload): Json<InvoicePayload>,
) -> Result<ResponseJson<ApiResponse<InvoiceWithItems>>, ApiError> {
    let terms = deployment.config().default_payment_terms_days;
    let invoice = InvoiceService::create(&deployment.db().pool, payload, terms).await?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub async fn update_invoice(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoicePayload>,
) -> Result<ResponseJson<ApiResponse<InvoiceWithItems>>, ApiError> {
    let invoice = InvoiceService::update(&deployment.db().pool, id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub async fn delete_invoice(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    InvoiceService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Responds 409 with `confirmation_required` for guarded transitions sent
/// without `confirmed: true`.
pub async fn change_invoice_status(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
    Json(change): Json<InvoiceStatusChange>,
) -> Result<ResponseJson<ApiResponse<Invoice>>, ApiError> {
    let invoice = InvoiceService::change_status(&deployment.db().pool, id, change).await?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub async fn share_invoice(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ShareLink>>, ApiError> {
    let link = InvoiceService::share(&deployment.db().pool, id, &deployment.config().public_base_url).await?;
    Ok(ResponseJson(ApiResponse::success(link)))
}

pub async fn unshare_invoice(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Invoice>>, ApiError> {
    let invoice = InvoiceService::unshare(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/invoices",
        Router::new()
            .route("/", get(list_invoices).post(create_invoice))
            .route("/{id}", get(get_invoice).put(update_invoice).delete(delete_invoice))
            .route("/{id}/status", post(change_invoice_status))
            .route("/{id}/share", post(share_invoice).delete(unshare_invoice)),
    )
}
