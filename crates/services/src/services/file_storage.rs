//! Upload storage: metadata rows in `files`, bytes in a flat directory keyed
//! by a generated name so user-supplied names never touch the filesystem.

use std::{
    io,
    path::{Path, PathBuf},
};

use db::models::{
    activity_log::{ActivityAction, ActivityLog, EntityType},
    file_item::{CreateFileItem, FileItem, FileQuery},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use utils::validation::FieldErrors;
use uuid::Uuid;

const FALLBACK_MIME: &str = "application/octet-stream";
const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("file is empty")]
    Empty,
    #[error("file not found")]
    NotFound,
    #[error("invalid attachment: {0}")]
    Validation(FieldErrors),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// An incoming upload before it is written
pub struct NewUpload {
    pub original_name: String,
    pub mime_type: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    max_bytes: u64,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub async fn ensure_root(&self) -> Result<(), FileStorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Rejects sizes above the limit before the body is buffered any further.
    pub fn check_size(&self, size: u64) -> Result<(), FileStorageError> {
        if size > self.max_bytes {
            return Err(FileStorageError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    pub async fn list(&self, pool: &SqlitePool, query: &FileQuery) -> Result<Vec<FileItem>, FileStorageError> {
        Ok(FileItem::find_all(pool, query).await?)
    }

    pub async fn get(&self, pool: &SqlitePool, id: Uuid) -> Result<FileItem, FileStorageError> {
        FileItem::find_by_id(pool, id)
            .await?
            .ok_or(FileStorageError::NotFound)
    }

    /// Writes the bytes to disk, then records the metadata row. The file is
    /// removed again if the insert fails.
    pub async fn save(&self, pool: &SqlitePool, upload: NewUpload) -> Result<FileItem, FileStorageError> {
        if upload.bytes.is_empty() {
            return Err(FileStorageError::Empty);
        }
        self.check_size(upload.bytes.len() as u64)?;
        check_attachment(upload.entity_type, upload.entity_id)?;

        let id = Uuid::new_v4();
        let original_name = sanitize_file_name(&upload.original_name);
        let stored_name = stored_name_for(id, &original_name);
        let mime_type = upload
            .mime_type
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        self.ensure_root().await?;
        let path = self.root.join(&stored_name);
        tokio::fs::write(&path, &upload.bytes).await?;

        let data = CreateFileItem {
            original_name,
            stored_name,
            mime_type,
            size_bytes: upload.bytes.len() as i64,
            entity_type: upload.entity_type,
            entity_id: upload.entity_id,
        };

        let file = match FileItem::create(pool, id, &data).await {
            Ok(file) => file,
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove orphaned upload");
                }
                return Err(err.into());
            }
        };

        ActivityLog::create(
            pool,
            EntityType::File,
            file.id,
            ActivityAction::Uploaded,
            Some(format!("Uploaded {} ({} bytes)", file.original_name, file.size_bytes)),
        )
        .await?;

        info!(file_id = %file.id, size_bytes = file.size_bytes, mime_type = %file.mime_type, "File uploaded");
        Ok(file)
    }

    /// Metadata plus the stored bytes.
    pub async fn read(&self, pool: &SqlitePool, id: Uuid) -> Result<(FileItem, Vec<u8>), FileStorageError> {
        let file = self.get(pool, id).await?;
        let bytes = match tokio::fs::read(self.root.join(&file.stored_name)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(file_id = %id, "File row exists but bytes are missing");
                return Err(FileStorageError::NotFound);
            }
            Err(err) => return Err(err.into()),
        };
        Ok((file, bytes))
    }

    /// Deletes the row and the bytes. Missing bytes are not an error.
    pub async fn delete(&self, pool: &SqlitePool, id: Uuid) -> Result<(), FileStorageError> {
        let file = self.get(pool, id).await?;
        self.remove(pool, &file).await?;
        ActivityLog::create(
            pool,
            EntityType::File,
            id,
            ActivityAction::Deleted,
            Some(format!("Deleted {}", file.original_name)),
        )
        .await?;
        info!(file_id = %id, "File deleted");
        Ok(())
    }

    /// Removes row and bytes without logging activity; used by cleanup.
    pub async fn remove(&self, pool: &SqlitePool, file: &FileItem) -> Result<(), FileStorageError> {
        FileItem::delete(pool, file.id).await?;
        match tokio::fs::remove_file(self.root.join(&file.stored_name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(file_id = %file.id, "Bytes already gone while deleting file");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn check_attachment(entity_type: Option<EntityType>, entity_id: Option<Uuid>) -> Result<(), FileStorageError> {
    let mut errors = FieldErrors::new();
    match (entity_type, entity_id) {
        (Some(_), None) => errors.add("entity_id", "is required when entity_type is set"),
        (None, Some(_)) => errors.add("entity_type", "is required when entity_id is set"),
        _ => {}
    }
    errors.into_result().map_err(FileStorageError::Validation)
}

/// Keeps only the final path component and replaces characters that are
/// unsafe in file names.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|ch| match ch {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

fn stored_name_for(id: Uuid, original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= MAX_EXTENSION_LEN && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}.{}", id, ext.to_ascii_lowercase()),
        None => id.to_string(),
    }
}
