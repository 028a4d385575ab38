use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate};
use uuid::Uuid;

/// Connection settings for the store; a single row with id 1
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WooCommerceSettings {
    #[serde(skip)]
    #[ts(skip)]
    pub id: i64,
    pub store_url: String,
    pub consumer_key: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub consumer_secret: String,
    pub enabled: bool,
    pub last_export_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl WooCommerceSettings {
    pub fn has_secret(&self) -> bool {
        !self.consumer_secret.is_empty()
    }
}

/// Settings as returned to the UI; the secret is only reported as present
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WooCommerceSettingsView {
    pub store_url: String,
    pub consumer_key: String,
    pub has_secret: bool,
    pub enabled: bool,
    pub last_export_at: Option<DateTime<Utc>>,
}

impl From<WooCommerceSettings> for WooCommerceSettingsView {
    fn from(settings: WooCommerceSettings) -> Self {
        Self {
            has_secret: settings.has_secret(),
            store_url: settings.store_url,
            consumer_key: settings.consumer_key,
            enabled: settings.enabled,
            last_export_at: settings.last_export_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateWooCommerceSettings {
    pub store_url: String,
    pub consumer_key: String,
    /// Keeps the stored secret when absent
    pub consumer_secret: Option<String>,
    pub enabled: bool,
}

impl Validate for UpdateWooCommerceSettings {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("store_url", &self.store_url);
        let url = self.store_url.trim();
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            errors.add("store_url", "must start with http:// or https://");
        }
        errors.required("consumer_key", &self.consumer_key);
        errors.into_result()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WooCommerceExportLog {
    pub id: Uuid,
    pub product_count: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub failed_count: i64,
    pub errors: Option<String>, // JSON array of messages
    pub created_at: DateTime<Utc>,
}

impl WooCommerceExportLog {
    pub fn parsed_errors(&self) -> Vec<String> {
        self.errors
            .as_ref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }

    pub async fn create(
        pool: &SqlitePool,
        product_count: i64,
        created_count: i64,
        updated_count: i64,
        errors: &[String],
    ) -> Result<Self, sqlx::Error> {
        let errors_json = if errors.is_empty() {
            None
        } else {
            serde_json::to_string(errors).ok()
        };
        sqlx::query_as::<_, WooCommerceExportLog>(
            r#"INSERT INTO woocommerce_export_logs (id, product_count, created_count, updated_count, failed_count, errors)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(product_count)
        .bind(created_count)
        .bind(updated_count)
        .bind(errors.len() as i64)
        .bind(errors_json)
        .fetch_one(pool)
        .await
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WooCommerceExportLog>(
            "SELECT * FROM woocommerce_export_logs ORDER BY created_at DESC, rowid DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

impl WooCommerceSettings {
    pub async fn find(pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WooCommerceSettings>("SELECT * FROM woocommerce_settings WHERE id = 1")
            .fetch_optional(pool)
            .await
    }

    pub async fn upsert(
        pool: &SqlitePool,
        data: &UpdateWooCommerceSettings,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, WooCommerceSettings>(
            r#"INSERT INTO woocommerce_settings (id, store_url, consumer_key, consumer_secret, enabled)
               VALUES (1, $1, $2, coalesce($3, ''), $4)
               ON CONFLICT(id) DO UPDATE SET
                   store_url = excluded.store_url,
                   consumer_key = excluded.consumer_key,
                   consumer_secret = coalesce($3, woocommerce_settings.consumer_secret),
                   enabled = excluded.enabled,
                   updated_at = datetime('now', 'subsec')
               RETURNING *"#,
        )
        .bind(data.store_url.trim().trim_end_matches('/'))
        .bind(data.consumer_key.trim())
        .bind(data.consumer_secret.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .bind(data.enabled)
        .fetch_one(pool)
        .await
    }

    pub async fn touch_last_export(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE woocommerce_settings SET last_export_at = datetime('now', 'subsec') WHERE id = 1")
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn update(secret: Option<&str>) -> UpdateWooCommerceSettings {
        UpdateWooCommerceSettings {
            store_url: "https://shop.example.com/".to_string(),
            consumer_key: "ck_123".to_string(),
            consumer_secret: secret.map(str::to_string),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_secret_when_omitted() {
        let db = DBService::new_in_memory().await.unwrap();
        let first = WooCommerceSettings::upsert(&db.pool, &update(Some("cs_abc"))).await.unwrap();
        assert_eq!(first.store_url, "https://shop.example.com");
        assert_eq!(first.consumer_secret, "cs_abc");

        let second = WooCommerceSettings::upsert(&db.pool, &update(None)).await.unwrap();
        assert_eq!(second.consumer_secret, "cs_abc");

        let view = WooCommerceSettingsView::from(second);
        assert!(view.has_secret);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("consumer_secret").is_none());
    }

    #[test]
    fn store_url_must_be_http() {
        let mut data = update(None);
        data.store_url = "ftp://shop".to_string();
        assert!(data.validate().unwrap_err().get("store_url").is_some());
    }

    #[tokio::test]
    async fn export_log_round_trips_errors() {
        let db = DBService::new_in_memory().await.unwrap();
        let log = WooCommerceExportLog::create(&db.pool, 3, 1, 1, &["SKU X: duplicate".to_string()])
            .await
            .unwrap();
        assert_eq!(log.failed_count, 1);
        assert_eq!(log.parsed_errors(), vec!["SKU X: duplicate".to_string()]);
    }
}
