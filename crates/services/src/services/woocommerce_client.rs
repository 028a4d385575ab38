//! WooCommerce REST client for the product batch endpoint.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use db::models::product::Product;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;

const BATCH_PATH: &str = "wp-json/wc/v3/products/batch";
const PRODUCTS_PATH: &str = "wp-json/wc/v3/products";
/// WooCommerce rejects batches with more than 100 objects.
pub const BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone, Error)]
pub enum WooCommerceError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("store rejected the consumer key or secret")]
    Unauthorized,
    #[error("json error: {0}")]
    Serde(String),
    #[error("invalid store url: {0}")]
    InvalidUrl(String),
}

impl WooCommerceError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Product as WooCommerce expects it in a batch create/update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WooProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// WooCommerce takes prices as strings
    pub regular_price: String,
    pub description: String,
    pub status: &'static str,
    pub manage_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
}

impl From<&Product> for WooProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.woocommerce_id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            regular_price: format!("{:.2}", product.price),
            description: product.description.clone().unwrap_or_default(),
            status: if product.active { "publish" } else { "draft" },
            manage_stock: product.stock_quantity.is_some(),
            stock_quantity: product.stock_quantity,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create: Vec<WooProduct>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<WooProduct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub create: Vec<BatchItemResult>,
    #[serde(default)]
    pub update: Vec<BatchItemResult>,
}

/// One entry of a batch response; failed entries carry `error` and id 0
#[derive(Debug, Clone, Deserialize)]
pub struct BatchItemResult {
    #[serde(default)]
    pub id: i64,
    pub error: Option<BatchItemError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchItemError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct WooCommerceClient {
    http: Client,
    base_url: Url,
    consumer_key: String,
    consumer_secret: String,
    backoff: ExponentialBuilder,
}

impl WooCommerceClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(
        store_url: &str,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Result<Self, WooCommerceError> {
        // A trailing slash makes `join` append instead of replacing the last segment
        let base_url = Url::parse(&format!("{}/", store_url.trim_end_matches('/')))
            .map_err(|e| WooCommerceError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("backoffice/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WooCommerceError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(30))
                .with_max_times(3)
                .with_jitter(),
        })
    }

    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sends one batch; callers keep each batch within [`BATCH_LIMIT`].
    pub async fn batch_products(&self, request: &BatchRequest) -> Result<BatchResponse, WooCommerceError> {
        let url = self.endpoint(BATCH_PATH)?;
        (|| async { self.send_batch(&url, request).await })
            .retry(self.backoff)
            .when(|e: &WooCommerceError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "WooCommerce batch failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    /// Lists a single product to prove the URL and credentials work.
    pub async fn test_connection(&self) -> Result<(), WooCommerceError> {
        let url = self.endpoint(PRODUCTS_PATH)?;
        let res = self
            .http
            .get(url)
            .query(&[("per_page", "1")])
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(res).await.map(|_| ())
    }

    async fn send_batch(&self, url: &Url, request: &BatchRequest) -> Result<BatchResponse, WooCommerceError> {
        let res = self
            .http
            .post(url.clone())
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        check_status(res)
            .await?
            .json::<BatchResponse>()
            .await
            .map_err(|e| WooCommerceError::Serde(e.to_string()))
    }

    fn endpoint(&self, path: &str) -> Result<Url, WooCommerceError> {
        self.base_url
            .join(path)
            .map_err(|e| WooCommerceError::InvalidUrl(e.to_string()))
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, WooCommerceError> {
    match res.status() {
        s if s.is_success() => Ok(res),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(WooCommerceError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => Err(WooCommerceError::RateLimited),
        s => {
            let status = s.as_u16();
            let body = res.text().await.unwrap_or_default();
            Err(WooCommerceError::Http { status, body })
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> WooCommerceError {
    if e.is_timeout() {
        WooCommerceError::Timeout
    } else {
        WooCommerceError::Transport(e.to_string())
    }
}

/// Splits products into batches of at most [`BATCH_LIMIT`] objects, products
/// already known to the store going to `update`.
pub fn plan_batches(products: &[Product]) -> Vec<(Vec<&Product>, BatchRequest)> {
    products
        .chunks(BATCH_LIMIT)
        .map(|chunk| {
            let mut request = BatchRequest::default();
            let mut ordered = Vec::with_capacity(chunk.len());
            // Response entries follow request order: creates first, then updates
            for product in chunk.iter().filter(|p| p.woocommerce_id.is_none()) {
                request.create.push(WooProduct::from(product));
                ordered.push(product);
            }
            for product in chunk.iter().filter(|p| p.woocommerce_id.is_some()) {
                request.update.push(WooProduct::from(product));
                ordered.push(product);
            }
            (ordered, request)
        })
        .collect()
}
