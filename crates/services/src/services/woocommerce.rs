//! Store settings and the product export run built on [`WooCommerceClient`].

use std::collections::HashSet;

use db::models::{
    activity_log::{ActivityAction, ActivityLog, EntityType},
    product::{Product, ProductQuery},
    woocommerce::{
        UpdateWooCommerceSettings, WooCommerceExportLog, WooCommerceSettings,
        WooCommerceSettingsView,
    },
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate};
use uuid::Uuid;

use super::woocommerce_client::{BatchItemResult, WooCommerceClient, WooCommerceError, plan_batches};

const EXPORT_LOG_LIMIT: i64 = 20;

#[derive(Debug, Error)]
pub enum WooCommerceServiceError {
    #[error("WooCommerce is not configured")]
    NotConfigured,
    #[error("WooCommerce export is disabled")]
    Disabled,
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("no products to export")]
    NothingToExport,
    #[error(transparent)]
    Upstream(#[from] WooCommerceError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct ExportRequest {
    /// Export only these products; all active products when empty
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

pub struct WooCommerceService;

impl WooCommerceService {
    pub async fn settings(pool: &SqlitePool) -> Result<Option<WooCommerceSettingsView>, WooCommerceServiceError> {
        Ok(WooCommerceSettings::find(pool).await?.map(WooCommerceSettingsView::from))
    }

    pub async fn update_settings(
        pool: &SqlitePool,
        data: UpdateWooCommerceSettings,
    ) -> Result<WooCommerceSettingsView, WooCommerceServiceError> {
        data.validate().map_err(WooCommerceServiceError::Validation)?;
        let new_secret = data
            .consumer_secret
            .as_deref()
            .is_some_and(|secret| !secret.trim().is_empty());
        if !new_secret {
            let stored = WooCommerceSettings::find(pool).await?;
            if !stored.is_some_and(|settings| settings.has_secret()) {
                return Err(WooCommerceServiceError::Validation(FieldErrors::single(
                    "consumer_secret",
                    "is required",
                )));
            }
        }

        let saved = WooCommerceSettings::upsert(pool, &data).await?;
        info!(store_url = %saved.store_url, enabled = saved.enabled, "WooCommerce settings saved");
        Ok(saved.into())
    }

    pub async fn test_connection(pool: &SqlitePool) -> Result<(), WooCommerceServiceError> {
        let client = Self::client(&Self::load_settings(pool).await?)?;
        client.test_connection().await?;
        Ok(())
    }

    pub async fn export_logs(pool: &SqlitePool) -> Result<Vec<WooCommerceExportLog>, WooCommerceServiceError> {
        Ok(WooCommerceExportLog::find_recent(pool, EXPORT_LOG_LIMIT).await?)
    }

    /// Pushes products to the store in batches and records the run.
    ///
    /// Per-product rejections and failed batches count as failures in the
    /// log. The call only fails outright when every batch failed.
    pub async fn export(
        pool: &SqlitePool,
        request: ExportRequest,
    ) -> Result<WooCommerceExportLog, WooCommerceServiceError> {
        let settings = Self::load_settings(pool).await?;
        if !settings.enabled {
            return Err(WooCommerceServiceError::Disabled);
        }
        let client = Self::client(&settings)?;

        let mut errors = Vec::new();
        let products = if request.product_ids.is_empty() {
            Product::find_all(pool, &ProductQuery { active: Some(true) }).await?
        } else {
            let ids = unique_ids(&request.product_ids);
            let products = Product::find_by_ids(pool, &ids).await?;
            for id in ids.iter().filter(|id| !products.iter().any(|p| p.id == **id)) {
                warn!(product_id = %id, "product selected for export does not exist");
                errors.push(format!("{id}: product not found"));
            }
            products
        };
        if products.is_empty() {
            return Err(WooCommerceServiceError::NothingToExport);
        }
        let product_count = (products.len() + errors.len()) as i64;

        let mut created = 0i64;
        let mut updated = 0i64;
        let mut last_batch_error = None;
        let batches = plan_batches(&products);
        let batch_count = batches.len();
        let mut failed_batches = 0usize;

        for (ordered, batch) in &batches {
            let response = match client.batch_products(batch).await {
                Ok(response) => response,
                Err(err) => {
                    error!(products = ordered.len(), error = %err, "WooCommerce batch failed");
                    errors.extend(ordered.iter().map(|p| format!("{}: {}", p.name, err)));
                    failed_batches += 1;
                    last_batch_error = Some(err);
                    continue;
                }
            };

            let results = response.create.iter().chain(response.update.iter());
            let mut seen = 0usize;
            for (product, result) in ordered.iter().zip(results) {
                seen += 1;
                match outcome(result) {
                    Ok(woocommerce_id) => {
                        Product::mark_synced(pool, product.id, woocommerce_id).await?;
                        if product.woocommerce_id.is_some() {
                            updated += 1;
                        } else {
                            created += 1;
                        }
                    }
                    Err(message) => errors.push(format!("{}: {}", product.name, message)),
                }
            }
            for product in ordered.iter().skip(seen) {
                warn!(product_id = %product.id, "WooCommerce returned no result for product");
                errors.push(format!("{}: no result returned by the store", product.name));
            }
        }

        let log = WooCommerceExportLog::create(pool, product_count, created, updated, &errors).await?;
        WooCommerceSettings::touch_last_export(pool).await?;
        ActivityLog::create(
            pool,
            EntityType::WoocommerceExport,
            log.id,
            ActivityAction::Exported,
            Some(format!(
                "Exported {} products: {} created, {} updated, {} failed",
                log.product_count, log.created_count, log.updated_count, log.failed_count
            )),
        )
        .await?;

        info!(
            export_id = %log.id,
            created = log.created_count,
            updated = log.updated_count,
            failed = log.failed_count,
            "WooCommerce export finished"
        );

        match last_batch_error {
            Some(err) if failed_batches == batch_count => Err(err.into()),
            _ => Ok(log),
        }
    }

    async fn load_settings(pool: &SqlitePool) -> Result<WooCommerceSettings, WooCommerceServiceError> {
        match WooCommerceSettings::find(pool).await? {
            Some(settings) if settings.has_secret() => Ok(settings),
            _ => Err(WooCommerceServiceError::NotConfigured),
        }
    }

    fn client(settings: &WooCommerceSettings) -> Result<WooCommerceClient, WooCommerceServiceError> {
        Ok(WooCommerceClient::new(
            &settings.store_url,
            settings.consumer_key.clone(),
            settings.consumer_secret.clone(),
        )?)
    }
}

/// Drops repeated ids, keeping the first occurrence.
fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn outcome(result: &BatchItemResult) -> Result<i64, String> {
    match &result.error {
        Some(err) => Err(format!("{} ({})", err.message, err.code)),
        None if result.id > 0 => Ok(result.id),
        None => Err("store returned no product id".to_string()),
    }
}
