//! Schema checks, index upkeep and cleanup of data that lost its owner.

use chrono::NaiveDate;
use db::models::{
    file_item::FileItem,
    line_item::{DocumentKind, LineItem},
    activity_log::ActivityLog,
    stats::DashboardStats,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

use super::file_storage::{FileStorage, FileStorageError};

pub const REQUIRED_TABLES: &[&str] = &[
    "contacts",
    "products",
    "invoices",
    "invoice_items",
    "estimates",
    "estimate_items",
    "files",
    "woocommerce_settings",
    "woocommerce_export_logs",
    "activity_logs",
];

/// Indexes the list and filter queries rely on, as (name, definition)
const QUERY_INDEXES: &[(&str, &str)] = &[
    ("idx_invoices_contact_id", "invoices(contact_id)"),
    ("idx_invoices_status_due_date", "invoices(status, due_date)"),
    ("idx_invoice_items_document_id", "invoice_items(document_id, position)"),
    ("idx_estimates_contact_id", "estimates(contact_id)"),
    ("idx_estimates_status_valid_until", "estimates(status, valid_until)"),
    ("idx_estimate_items_document_id", "estimate_items(document_id, position)"),
    ("idx_files_entity", "files(entity_type, entity_id)"),
    ("idx_activity_logs_created_at", "activity_logs(created_at)"),
    ("idx_activity_logs_entity", "activity_logs(entity_type, entity_id)"),
];

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Files(#[from] FileStorageError),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct HealthReport {
    pub is_initialized: bool,
    pub migrations_applied: i64,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.missing_tables.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct OptimizeReport {
    /// Indexes that were missing and have been created
    pub created_indexes: Vec<String>,
    pub analyzed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
pub struct CleanupReport {
    pub orphan_invoice_items: u64,
    pub orphan_estimate_items: u64,
    pub orphaned_files: u64,
    pub freed_bytes: i64,
    pub activity_removed: u64,
}

pub struct DatabaseMaintenance {
    pool: SqlitePool,
}

impl DatabaseMaintenance {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn health(&self) -> Result<HealthReport, MaintenanceError> {
        let migrations_table_exists = self.table_exists("_sqlx_migrations").await?;
        if !migrations_table_exists {
            warn!("Database not initialized - _sqlx_migrations table does not exist");
            return Ok(HealthReport {
                is_initialized: false,
                migrations_applied: 0,
                latest_migration: None,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let migrations_applied =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;
        let latest_migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let mut missing_tables = Vec::new();
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }
        if !missing_tables.is_empty() {
            warn!(missing = ?missing_tables, "Database is missing tables");
        }

        Ok(HealthReport {
            is_initialized: true,
            migrations_applied,
            latest_migration,
            missing_tables,
        })
    }

    /// Recreates any missing query index and refreshes planner statistics.
    pub async fn optimize(&self) -> Result<OptimizeReport, MaintenanceError> {
        let mut created_indexes = Vec::new();
        for (name, definition) in QUERY_INDEXES {
            if self.index_exists(name).await? {
                continue;
            }
            let sql = format!("CREATE INDEX IF NOT EXISTS {name} ON {definition}");
            sqlx::query(&sql).execute(&self.pool).await?;
            created_indexes.push(name.to_string());
        }

        sqlx::query("ANALYZE").execute(&self.pool).await?;
        info!(created = created_indexes.len(), "Database optimized");

        Ok(OptimizeReport {
            created_indexes,
            analyzed: true,
        })
    }

    /// Drops line items without a document, attachments whose record is
    /// gone (row and bytes) and activity older than `retention_days`.
    pub async fn cleanup(
        &self,
        storage: &FileStorage,
        retention_days: i64,
    ) -> Result<CleanupReport, MaintenanceError> {
        let mut report = CleanupReport {
            orphan_invoice_items: LineItem::delete_orphans(&self.pool, DocumentKind::Invoice).await?,
            orphan_estimate_items: LineItem::delete_orphans(&self.pool, DocumentKind::Estimate).await?,
            ..Default::default()
        };

        for file in FileItem::find_orphaned(&self.pool).await? {
            storage.remove(&self.pool, &file).await?;
            report.orphaned_files += 1;
            report.freed_bytes += file.size_bytes;
        }

        report.activity_removed = ActivityLog::delete_older_than(&self.pool, retention_days).await?;

        info!(
            orphan_invoice_items = report.orphan_invoice_items,
            orphan_estimate_items = report.orphan_estimate_items,
            orphaned_files = report.orphaned_files,
            freed_bytes = report.freed_bytes,
            activity_removed = report.activity_removed,
            "Database cleanup complete"
        );
        Ok(report)
    }

    pub async fn stats(&self, today: NaiveDate) -> Result<DashboardStats, MaintenanceError> {
        Ok(DashboardStats::load(&self.pool, today).await?)
    }

    async fn table_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn index_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = $1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            activity_log::EntityType,
            contact::{Contact, ContactPayload},
        },
    };
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::services::file_storage::NewUpload;

    #[tokio::test]
    async fn fresh_database_is_healthy() {
        let db = DBService::new_in_memory().await.unwrap();
        let report = DatabaseMaintenance::new(db.pool.clone()).health().await.unwrap();
        assert!(report.is_ok());
        assert_eq!(report.migrations_applied, 2);
        assert_eq!(report.latest_migration.as_deref(), Some("query indexes"));
    }

    #[tokio::test]
    async fn optimize_restores_dropped_indexes() {
        let db = DBService::new_in_memory().await.unwrap();
        let maintenance = DatabaseMaintenance::new(db.pool.clone());
        assert!(maintenance.optimize().await.unwrap().created_indexes.is_empty());

        sqlx::query("DROP INDEX idx_files_entity").execute(&db.pool).await.unwrap();
        let report = maintenance.optimize().await.unwrap();
        assert_eq!(report.created_indexes, vec!["idx_files_entity".to_string()]);
        assert!(report.analyzed);
    }

    #[tokio::test]
    async fn cleanup_removes_orphaned_attachments() {
        let db = DBService::new_in_memory().await.unwrap();
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 1024);
        let contact = Contact::create(
            &db.pool,
            &ContactPayload {
                name: "Hooli".to_string(),
                ..Default::default()
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let file = storage
            .save(
                &db.pool,
                NewUpload {
                    original_name: "contract.pdf".to_string(),
                    mime_type: Some("application/pdf".to_string()),
                    entity_type: Some(EntityType::Contact),
                    entity_id: Some(contact.id),
                    bytes: vec![1; 64],
                },
            )
            .await
            .unwrap();
        Contact::delete(&db.pool, contact.id).await.unwrap();

        let report = DatabaseMaintenance::new(db.pool.clone())
            .cleanup(&storage, 365)
            .await
            .unwrap();
        assert_eq!(report.orphaned_files, 1);
        assert_eq!(report.freed_bytes, 64);
        assert_eq!(report.activity_removed, 0);
        assert!(!dir.path().join(&file.stored_name).exists());
    }
}
