use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::product::{Product, ProductPayload, ProductQuery};
use services::services::products::ProductService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{deployment::Deployment, error::ApiError};

pub async fn list_products(
    State(deployment): State<Deployment>,
    Query(query): Query<ProductQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Product>>>, ApiError> {
    let products = ProductService::list(&deployment.db().pool, &query).await?;
    Ok(ResponseJson(ApiResponse::success(products)))
}

pub async fn get_product(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Product>>, ApiError> {
    let product = ProductService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(product)))
}

pub async fn create_product(
    State(deployment): State<Deployment>,
    Json(payload): Json<ProductPayload>,
) -> Result<ResponseJson<ApiResponse<Product>>, ApiError> {
    let product = ProductService::create(&deployment.db().pool, payload).await?;
    Ok(ResponseJson(ApiResponse::success(product)))
}

pub async fn update_product(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<ResponseJson<ApiResponse<Product>>, ApiError> {
    let product = ProductService::update(&deployment.db().pool, id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(product)))
}

pub async fn delete_product(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ProductService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/products",
        Router::new()
            .route("/", get(list_products).post(create_product))
            .route("/{id}", get(get_product).put(update_product).delete(delete_product)),
    )
}
