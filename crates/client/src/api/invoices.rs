use db::models::invoice::{
    Invoice, InvoicePayload, InvoiceQuery, InvoiceStatus, InvoiceStatusChange, InvoiceWithItems, PublicInvoice,
};
use reqwest::Method;
use utils::share_token::ShareLink;
use uuid::Uuid;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct InvoicesApi {
    client: ApiClient,
}

impl InvoicesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, ClientError> {
        self.client.get_with("invoices", query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<InvoiceWithItems, ClientError> {
        self.client.get(&format!("invoices/{id}")).await
    }

    pub async fn create(&self, payload: &InvoicePayload) -> Result<InvoiceWithItems, ClientError> {
        self.client.post("invoices", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &InvoicePayload) -> Result<InvoiceWithItems, ClientError> {
        self.client.put(&format!("invoices/{id}"), payload).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        self.client.delete(&format!("invoices/{id}")).await
    }

    /// Returns [`ClientError::ConfirmationRequired`] for guarded transitions
    /// unless `confirmed` is set.
    pub async fn change_status(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        confirmed: bool,
    ) -> Result<Invoice, ClientError> {
        let change = InvoiceStatusChange { status, confirmed };
        self.client.post(&format!("invoices/{id}/status"), &change).await
    }

    pub async fn share(&self, id: Uuid) -> Result<ShareLink, ClientError> {
        let request = self.client.request(Method::POST, &format!("invoices/{id}/share"))?;
        self.client.send(request).await
    }

    pub async fn unshare(&self, id: Uuid) -> Result<Invoice, ClientError> {
        let request = self.client.request(Method::DELETE, &format!("invoices/{id}/share"))?;
        self.client.send(request).await
    }

    pub async fn public_view(&self, token: &str) -> Result<PublicInvoice, ClientError> {
        self.client.get(&format!("public/invoices/{token}")).await
    }
}
