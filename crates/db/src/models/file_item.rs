use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::activity_log::EntityType;

/// Metadata of an uploaded file; bytes live on disk under `stored_name`
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct FileItem {
    pub id: Uuid,
    pub original_name: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

pub struct CreateFileItem {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
pub struct FileQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
}

impl FileItem {
    pub async fn find_all(pool: &SqlitePool, query: &FileQuery) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileItem>(
            r#"SELECT * FROM files
               WHERE ($1 IS NULL OR entity_type = $1)
                 AND ($2 IS NULL OR entity_id = $2)
               ORDER BY created_at DESC"#,
        )
        .bind(query.entity_type)
        .bind(query.entity_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileItem>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create<'e, E>(executor: E, id: Uuid, data: &CreateFileItem) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FileItem>(
            r#"INSERT INTO files (id, original_name, stored_name, mime_type, size_bytes, entity_type, entity_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.original_name)
        .bind(&data.stored_name)
        .bind(&data.mime_type)
        .bind(data.size_bytes)
        .bind(data.entity_type)
        .bind(data.entity_id)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Attachments whose owning record has been deleted
    pub async fn find_orphaned(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileItem>(
            r#"SELECT * FROM files f
               WHERE f.entity_id IS NOT NULL
                 AND (
                      (f.entity_type = 'contact'  AND NOT EXISTS (SELECT 1 FROM contacts  WHERE id = f.entity_id))
                   OR (f.entity_type = 'product'  AND NOT EXISTS (SELECT 1 FROM products  WHERE id = f.entity_id))
                   OR (f.entity_type = 'invoice'  AND NOT EXISTS (SELECT 1 FROM invoices  WHERE id = f.entity_id))
                   OR (f.entity_type = 'estimate' AND NOT EXISTS (SELECT 1 FROM estimates WHERE id = f.entity_id))
                 )"#,
        )
        .fetch_all(pool)
        .await
    }
}
