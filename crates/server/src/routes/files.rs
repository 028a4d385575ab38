use std::str::FromStr;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::get,
};
use db::models::{
    activity_log::EntityType,
    file_item::{FileItem, FileQuery},
};
use services::services::file_storage::NewUpload;
use tracing::debug;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{deployment::Deployment, error::ApiError};

/// Room for multipart boundaries and the small text fields
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub async fn list_files(
    State(deployment): State<Deployment>,
    Query(query): Query<FileQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<FileItem>>>, ApiError> {
    let files = deployment.storage().list(&deployment.db().pool, &query).await?;
    Ok(ResponseJson(ApiResponse::success(files)))
}

pub async fn get_file(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<FileItem>>, ApiError> {
    let file = deployment.storage().get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(file)))
}

/// Multipart fields: `file` (required), `entity_type` and `entity_id` (optional, together).
pub async fn upload_file(
    State(deployment): State<Deployment>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<FileItem>>, ApiError> {
    let storage = deployment.storage();
    let mut upload: Option<NewUpload> = None;
    let mut entity_type = None;
    let mut entity_id = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .filter(|mime| mime != "application/octet-stream")
                    .or_else(|| mime_guess::from_path(&original_name).first().map(|m| m.to_string()));

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    storage.check_size((bytes.len() + chunk.len()) as u64)?;
                    bytes.extend_from_slice(&chunk);
                }

                upload = Some(NewUpload {
                    original_name,
                    mime_type,
                    entity_type: None,
                    entity_id: None,
                    bytes,
                });
            }
            Some("entity_type") => {
                let value = field.text().await?;
                let parsed = EntityType::from_str(value.trim())
                    .map_err(|_| ApiError::invalid("entity_type", "is not a known record type"))?;
                entity_type = Some(parsed);
            }
            Some("entity_id") => {
                let value = field.text().await?;
                let parsed = Uuid::parse_str(value.trim())
                    .map_err(|_| ApiError::invalid("entity_id", "must be a valid id"))?;
                entity_id = Some(parsed);
            }
            other => debug!(field = ?other, "Ignoring unknown multipart field"),
        }
    }

    let mut upload = upload.ok_or_else(|| ApiError::invalid("file", "is required"))?;
    upload.entity_type = entity_type;
    upload.entity_id = entity_id;

    let file = storage.save(&deployment.db().pool, upload).await?;
    Ok(ResponseJson(ApiResponse::success(file)))
}

pub async fn download_file(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (file, bytes) = deployment.storage().read(&deployment.db().pool, id).await?;
    let disposition = format!("attachment; filename=\"{}\"", ascii_file_name(&file.original_name));
    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn delete_file(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.storage().delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Header-safe variant of a stored file name
fn ascii_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect()
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let body_limit = deployment.storage().max_bytes().saturating_add(MULTIPART_OVERHEAD);
    Router::new().nest(
        "/files",
        Router::new()
            .route("/", get(list_files).post(upload_file))
            .route("/{id}", get(get_file).delete(delete_file))
            .route("/{id}/download", get(download_file))
            .layer(DefaultBodyLimit::max(usize::try_from(body_limit).unwrap_or(usize::MAX))),
    )
}
