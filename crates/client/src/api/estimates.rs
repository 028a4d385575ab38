use db::models::estimate::{
    Estimate, EstimateConversion, EstimatePayload, EstimateQuery, EstimateStatus, EstimateStatusChange,
    EstimateWithItems, PublicEstimate,
};
use reqwest::Method;
use utils::share_token::ShareLink;
use uuid::Uuid;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct EstimatesApi {
    client: ApiClient,
}

impl EstimatesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &EstimateQuery) -> Result<Vec<Estimate>, ClientError> {
        self.client.get_with("estimates", query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<EstimateWithItems, ClientError> {
        self.client.get(&format!("estimates/{id}")).await
    }

    pub async fn create(&self, payload: &EstimatePayload) -> Result<EstimateWithItems, ClientError> {
        self.client.post("estimates", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &EstimatePayload) -> Result<EstimateWithItems, ClientError> {
        self.client.put(&format!("estimates/{id}"), payload).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        self.client.delete(&format!("estimates/{id}")).await
    }

    pub async fn change_status(
        &self,
        id: Uuid,
        status: EstimateStatus,
        confirmed: bool,
    ) -> Result<Estimate, ClientError> {
        let change = EstimateStatusChange { status, confirmed };
        self.client.post(&format!("estimates/{id}/status"), &change).await
    }

    pub async fn convert(&self, id: Uuid) -> Result<EstimateConversion, ClientError> {
        let request = self.client.request(Method::POST, &format!("estimates/{id}/convert"))?;
        self.client.send(request).await
    }

    pub async fn share(&self, id: Uuid) -> Result<ShareLink, ClientError> {
        let request = self.client.request(Method::POST, &format!("estimates/{id}/share"))?;
        self.client.send(request).await
    }

    pub async fn unshare(&self, id: Uuid) -> Result<Estimate, ClientError> {
        let request = self.client.request(Method::DELETE, &format!("estimates/{id}/share"))?;
        self.client.send(request).await
    }

    pub async fn public_view(&self, token: &str) -> Result<PublicEstimate, ClientError> {
        self.client.get(&format!("public/estimates/{token}")).await
    }

    pub async fn accept(&self, token: &str) -> Result<PublicEstimate, ClientError> {
        let request = self.client.request(Method::POST, &format!("public/estimates/{token}/accept"))?;
        self.client.send(request).await
    }

    pub async fn reject(&self, token: &str) -> Result<PublicEstimate, ClientError> {
        let request = self.client.request(Method::POST, &format!("public/estimates/{token}/reject"))?;
        self.client.send(request).await
    }
}
