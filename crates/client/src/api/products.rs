use db::models::product::{Product, ProductPayload, ProductQuery};
use uuid::Uuid;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct ProductsApi {
    client: ApiClient,
}

impl ProductsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, ClientError> {
        self.client.get_with("products", query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, ClientError> {
        self.client.get(&format!("products/{id}")).await
    }

    pub async fn create(&self, payload: &ProductPayload) -> Result<Product, ClientError> {
        self.client.post("products", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &ProductPayload) -> Result<Product, ClientError> {
        self.client.put(&format!("products/{id}"), payload).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        self.client.delete(&format!("products/{id}")).await
    }
}
