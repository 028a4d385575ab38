use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::contact::{Contact, ContactPayload, ContactQuery};
use services::services::contacts::ContactService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{deployment::Deployment, error::ApiError};

pub async fn list_contacts(
    State(deployment): State<Deployment>,
    Query(query): Query<ContactQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Contact>>>, ApiError> {
    let contacts = ContactService::list(&deployment.db().pool, &query).await?;
    Ok(ResponseJson(ApiResponse::success(contacts)))
}

pub async fn get_contact(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Contact>>, ApiError> {
    let contact = ContactService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(contact)))
}

pub async fn create_contact(
    State(deployment): State<Deployment>,
    Json(payload): Json<ContactPayload>,
) -> Result<ResponseJson<ApiResponse<Contact>>, ApiError> {
    let contact = ContactService::create(&deployment.db().pool, payload).await?;
    Ok(ResponseJson(ApiResponse::success(contact)))
}

pub async fn update_contact(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContactPayload>,
) -> Result<ResponseJson<ApiResponse<Contact>>, ApiError> {
    let contact = ContactService::update(&deployment.db().pool, id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(contact)))
}

pub async fn delete_contact(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ContactService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/contacts",
        Router::new()
            .route("/", get(list_contacts).post(create_contact))
            .route("/{id}", get(get_contact).put(update_contact).delete(delete_contact)),
    )
}
