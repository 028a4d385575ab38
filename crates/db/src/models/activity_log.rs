use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Kind of record an activity entry refers to
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "entity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    Contact,
    Product,
    Invoice,
    Estimate,
    File,
    WoocommerceExport,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Shared,
    Unshared,
    Converted,
    Uploaded,
    Exported,
    Accepted,
    Rejected,
    MarkedOverdue,
    Expired,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ActivityLog {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: ActivityAction,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub async fn create<'e, E>(
        executor: E,
        entity_type: EntityType,
        entity_id: Uuid,
        action: ActivityAction,
        description: Option<String>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ActivityLog>(
            r#"INSERT INTO activity_logs (id, entity_type, entity_id, action, description)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(entity_type)
        .bind(entity_id)
        .bind(action)
        .bind(description)
        .fetch_one(executor)
        .await
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            r#"SELECT * FROM activity_logs
               ORDER BY created_at DESC, rowid DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_entity(
        pool: &SqlitePool,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            r#"SELECT * FROM activity_logs
               WHERE entity_type = $1 AND entity_id = $2
               ORDER BY created_at DESC, rowid DESC"#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes entries older than `retention_days`, returning how many went.
    pub async fn delete_older_than(pool: &SqlitePool, retention_days: i64) -> Result<u64, sqlx::Error> {
        let cutoff = format!("-{} days", retention_days);
        let result = sqlx::query(
            "DELETE FROM activity_logs WHERE datetime(created_at) < datetime('now', $1)",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
