use db::models::contact::{Contact, ContactPayload, ContactQuery};
use uuid::Uuid;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct ContactsApi {
    client: ApiClient,
}

impl ContactsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &ContactQuery) -> Result<Vec<Contact>, ClientError> {
        self.client.get_with("contacts", query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Contact, ClientError> {
        self.client.get(&format!("contacts/{id}")).await
    }

    pub async fn create(&self, payload: &ContactPayload) -> Result<Contact, ClientError> {
        self.client.post("contacts", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &ContactPayload) -> Result<Contact, ClientError> {
        self.client.put(&format!("contacts/{id}"), payload).await
    }

    /// Fails with a `contact` conflict while documents still reference it.
    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        self.client.delete(&format!("contacts/{id}")).await
    }
}
