use db::models::woocommerce::{UpdateWooCommerceSettings, WooCommerceExportLog, WooCommerceSettingsView};
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Serialize)]
struct ExportBody<'a> {
    product_ids: &'a [Uuid],
}

#[derive(Debug, Clone)]
pub struct WooCommerceApi {
    client: ApiClient,
}

impl WooCommerceApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `None` until the store has been configured.
    pub async fn settings(&self) -> Result<Option<WooCommerceSettingsView>, ClientError> {
        let request = self.client.request(Method::GET, "woocommerce-products/settings")?;
        self.client.send_optional(request).await
    }

    pub async fn update_settings(
        &self,
        settings: &UpdateWooCommerceSettings,
    ) -> Result<WooCommerceSettingsView, ClientError> {
        self.client.put("woocommerce-products/settings", settings).await
    }

    pub async fn test_connection(&self) -> Result<(), ClientError> {
        let request = self.client.request(Method::POST, "woocommerce-products/test-connection")?;
        self.client.send_empty(request).await
    }

    /// Exports every active product when `product_ids` is empty.
    pub async fn export(&self, product_ids: &[Uuid]) -> Result<WooCommerceExportLog, ClientError> {
        self.client
            .post("woocommerce-products/export", &ExportBody { product_ids })
            .await
    }

    pub async fn logs(&self) -> Result<Vec<WooCommerceExportLog>, ClientError> {
        self.client.get("woocommerce-products/logs").await
    }
}
