//! Typed HTTP clients, one per resource, over a shared [`ApiClient`].

pub mod activity;
pub mod contacts;
pub mod estimates;
pub mod files;
pub mod invoices;
pub mod products;
pub mod woocommerce;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use url::Url;
use utils::response::ApiResponse;

use crate::error::ClientError;

/// Base URL plus a pooled `reqwest` client; cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// `base_url` is the server origin, e.g. `http://127.0.0.1:3001`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(&format!("{}/api/", base_url.trim_end_matches('/')))?;
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("backoffice-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        debug!(%method, %url, "api request");
        Ok(self.http.request(method, url))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path)?).await
    }

    pub(crate) async fn get_with<Q, T>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::GET, path)?.query(query)).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, path)?.json(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, path)?).await
    }

    /// Sends and unwraps `data`; a missing `data` is a decode error.
    pub(crate) async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        self.send_optional(request)
            .await?
            .ok_or_else(|| ClientError::Decode("response has no data".to_string()))
    }

    /// Sends and unwraps `data`, which the endpoint may leave null.
    pub(crate) async fn send_optional<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let response = request.send().await?;
        let envelope: ApiResponse<T, Value> = decode(response).await?;
        Ok(envelope.into_data())
    }

    /// For endpoints whose `data` is unit.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let response = request.send().await?;
        let _: ApiResponse<Value, Value> = decode(response).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T, Value>, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()));
    }

    Err(error_from_body(status, &body))
}

/// Error bodies may not be envelopes when a proxy answers.
pub(crate) fn error_from_body(status: StatusCode, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ApiResponse<Value, Value>>(body) {
        Ok(envelope) => {
            let (_, error_data, message) = envelope.into_parts();
            ClientError::from_envelope(status, error_data, message)
        }
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            ClientError::from_envelope(status, None, (!text.is_empty()).then_some(text))
        }
    }
}
