use db::models::{
    activity_log::EntityType,
    file_item::{FileItem, FileQuery},
};
use reqwest::{
    Method,
    multipart::{Form, Part},
};
use uuid::Uuid;

use super::{ApiClient, error_from_body};
use crate::error::ClientError;

/// File to upload, optionally attached to a record
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub attach_to: Option<(EntityType, Uuid)>,
}

/// Bytes of a download plus the headers the server sent with them
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FilesApi {
    client: ApiClient,
}

impl FilesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &FileQuery) -> Result<Vec<FileItem>, ClientError> {
        self.client.get_with("files", query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<FileItem, ClientError> {
        self.client.get(&format!("files/{id}")).await
    }

    /// Too-large files come back as `Http { status: 413, .. }`.
    pub async fn upload(&self, upload: Upload) -> Result<FileItem, ClientError> {
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(mime_type) = &upload.mime_type {
            part = part.mime_str(mime_type)?;
        }

        let mut form = Form::new().part("file", part);
        if let Some((entity_type, entity_id)) = upload.attach_to {
            form = form
                .text("entity_type", entity_type.to_string())
                .text("entity_id", entity_id.to_string());
        }

        let request = self.client.request(Method::POST, "files")?.multipart(form);
        self.client.send(request).await
    }

    /// Raw bytes; errors still arrive as JSON envelopes.
    pub async fn download(&self, id: Uuid) -> Result<Download, ClientError> {
        let response = self
            .client
            .request(Method::GET, &format!("files/{id}/download"))?
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(error_from_body(status, &body));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        Ok(Download { content_type, bytes })
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        self.client.delete(&format!("files/{id}")).await
    }
}
