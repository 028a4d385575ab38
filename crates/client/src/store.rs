//! Per-resource state a UI binds to: the loaded list, which side panel is
//! open, and the errors of the last save.

use async_trait::async_trait;
use db::models::{
    contact::{Contact, ContactPayload, ContactQuery},
    estimate::{Estimate, EstimatePayload, EstimateQuery},
    invoice::{Invoice, InvoicePayload, InvoiceQuery},
    product::{Product, ProductPayload, ProductQuery},
};
use tracing::debug;
use utils::validation::{FieldErrors, Normalize, Validate};
use uuid::Uuid;

use crate::{
    api::{contacts::ContactsApi, estimates::EstimatesApi, invoices::InvoicesApi, products::ProductsApi},
    error::ClientError,
};

/// CRUD surface a [`Store`] drives.
#[async_trait]
pub trait Resource: Send + Sync {
    type Item: Clone + Send + Sync;
    type Payload: Validate + Normalize + Clone + Send + Sync;

    fn id(item: &Self::Item) -> Uuid;

    async fn list(&self) -> Result<Vec<Self::Item>, ClientError>;
    async fn create(&self, payload: &Self::Payload) -> Result<Self::Item, ClientError>;
    async fn update(&self, id: Uuid, payload: &Self::Payload) -> Result<Self::Item, ClientError>;
    async fn delete(&self, id: Uuid) -> Result<(), ClientError>;
}

#[async_trait]
impl Resource for ContactsApi {
    type Item = Contact;
    type Payload = ContactPayload;

    fn id(item: &Contact) -> Uuid {
        item.id
    }

    async fn list(&self) -> Result<Vec<Contact>, ClientError> {
        ContactsApi::list(self, &ContactQuery::default()).await
    }

    async fn create(&self, payload: &ContactPayload) -> Result<Contact, ClientError> {
        ContactsApi::create(self, payload).await
    }

    async fn update(&self, id: Uuid, payload: &ContactPayload) -> Result<Contact, ClientError> {
        ContactsApi::update(self, id, payload).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        ContactsApi::delete(self, id).await
    }
}

#[async_trait]
impl Resource for ProductsApi {
    type Item = Product;
    type Payload = ProductPayload;

    fn id(item: &Product) -> Uuid {
        item.id
    }

    async fn list(&self) -> Result<Vec<Product>, ClientError> {
        ProductsApi::list(self, &ProductQuery::default()).await
    }

    async fn create(&self, payload: &ProductPayload) -> Result<Product, ClientError> {
        ProductsApi::create(self, payload).await
    }

    async fn update(&self, id: Uuid, payload: &ProductPayload) -> Result<Product, ClientError> {
        ProductsApi::update(self, id, payload).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        ProductsApi::delete(self, id).await
    }
}

// Document lists hold headers only; the panel fetches items on demand.
#[async_trait]
impl Resource for InvoicesApi {
    type Item = Invoice;
    type Payload = InvoicePayload;

    fn id(item: &Invoice) -> Uuid {
        item.id
    }

    async fn list(&self) -> Result<Vec<Invoice>, ClientError> {
        InvoicesApi::list(self, &InvoiceQuery::default()).await
    }

    async fn create(&self, payload: &InvoicePayload) -> Result<Invoice, ClientError> {
        Ok(InvoicesApi::create(self, payload).await?.invoice)
    }

    async fn update(&self, id: Uuid, payload: &InvoicePayload) -> Result<Invoice, ClientError> {
        Ok(InvoicesApi::update(self, id, payload).await?.invoice)
    }

    async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        InvoicesApi::delete(self, id).await
    }
}

#[async_trait]
impl Resource for EstimatesApi {
    type Item = Estimate;
    type Payload = EstimatePayload;

    fn id(item: &Estimate) -> Uuid {
        item.id
    }

    async fn list(&self) -> Result<Vec<Estimate>, ClientError> {
        EstimatesApi::list(self, &EstimateQuery::default()).await
    }

    async fn create(&self, payload: &EstimatePayload) -> Result<Estimate, ClientError> {
        Ok(EstimatesApi::create(self, payload).await?.estimate)
    }

    async fn update(&self, id: Uuid, payload: &EstimatePayload) -> Result<Estimate, ClientError> {
        Ok(EstimatesApi::update(self, id, payload).await?.estimate)
    }

    async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        EstimatesApi::delete(self, id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Create,
    View(Uuid),
    Edit(Uuid),
}

impl PanelState {
    pub fn selected_id(self) -> Option<Uuid> {
        match self {
            PanelState::View(id) | PanelState::Edit(id) => Some(id),
            PanelState::Closed | PanelState::Create => None,
        }
    }
}

pub struct Store<R: Resource> {
    resource: R,
    items: Vec<R::Item>,
    panel: PanelState,
    errors: FieldErrors,
    message: Option<String>,
    busy: bool,
}

impl<R: Resource> Store<R> {
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            items: Vec::new(),
            panel: PanelState::Closed,
            errors: FieldErrors::new(),
            message: None,
            busy: false,
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn items(&self) -> &[R::Item] {
        &self.items
    }

    pub fn panel(&self) -> PanelState {
        self.panel
    }

    /// Field errors of the last save, client-side and server-side merged.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Error without a field to attach to, e.g. a network failure.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Record shown in the view or edit panel.
    pub fn selected(&self) -> Option<&R::Item> {
        let id = self.panel.selected_id()?;
        self.find(id)
    }

    pub fn find(&self, id: Uuid) -> Option<&R::Item> {
        self.items.iter().find(|item| R::id(item) == id)
    }

    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.busy = true;
        let result = self.resource.list().await;
        self.busy = false;

        match result {
            Ok(items) => {
                self.items = items;
                self.message = None;
                if let Some(id) = self.panel.selected_id() {
                    if self.find(id).is_none() {
                        self.panel = PanelState::Closed;
                    }
                }
                Ok(())
            }
            Err(err) => {
                self.message = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn open_create(&mut self) {
        self.clear_errors();
        self.panel = PanelState::Create;
    }

    pub fn open_view(&mut self, id: Uuid) {
        self.clear_errors();
        self.panel = PanelState::View(id);
    }

    pub fn open_edit(&mut self, id: Uuid) {
        self.clear_errors();
        self.panel = PanelState::Edit(id);
    }

    pub fn close(&mut self) {
        self.clear_errors();
        self.panel = PanelState::Closed;
    }

    /// Creates or updates depending on the open panel. The payload is
    /// normalized the way the server does it, then validated; nothing is sent
    /// while validation fails.
    pub async fn save(&mut self, payload: &R::Payload) -> Result<R::Item, ClientError> {
        let target = match self.panel {
            PanelState::Create => None,
            PanelState::Edit(id) => Some(id),
            PanelState::Closed | PanelState::View(_) => return Err(ClientError::NoOpenForm),
        };

        self.clear_errors();
        let payload = payload.clone().normalized();
        if let Err(errors) = payload.validate() {
            debug!(fields = errors.len(), "save blocked by client-side validation");
            self.errors = errors.clone();
            return Err(ClientError::Validation(errors));
        }

        self.busy = true;
        let result = match target {
            None => self.resource.create(&payload).await,
            Some(id) => self.resource.update(id, &payload).await,
        };
        self.busy = false;

        match result {
            Ok(item) => {
                let id = R::id(&item);
                self.upsert(item.clone());
                self.panel = PanelState::View(id);
                Ok(item)
            }
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<(), ClientError> {
        self.clear_errors();
        self.busy = true;
        let result = self.resource.delete(id).await;
        self.busy = false;

        match result {
            Ok(()) => {
                self.items.retain(|item| R::id(item) != id);
                if self.panel.selected_id() == Some(id) {
                    self.panel = PanelState::Closed;
                }
                Ok(())
            }
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }

    fn upsert(&mut self, item: R::Item) {
        let id = R::id(&item);
        match self.items.iter_mut().find(|existing| R::id(existing) == id) {
            Some(existing) => *existing = item,
            // Lists come back newest first
            None => self.items.insert(0, item),
        }
    }

    fn record_error(&mut self, err: &ClientError) {
        match err.field_errors() {
            Some(errors) => self.errors.merge(errors),
            None => self.message = Some(err.to_string()),
        }
    }

    fn clear_errors(&mut self) {
        self.errors = FieldErrors::new();
        self.message = None;
    }
}
