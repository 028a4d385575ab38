//! Contact CRUD: validate, enforce unique e-mail, persist, log activity.

use db::{
    is_unique_violation,
    models::{
        activity_log::{ActivityAction, ActivityLog, EntityType},
        contact::{Contact, ContactPayload, ContactQuery},
    },
};
use sqlx::SqlitePool;
use tracing::info;
use utils::validation::{Normalize, Validate};
use uuid::Uuid;

use super::error::ServiceError;

pub struct ContactService;

impl ContactService {
    pub async fn list(pool: &SqlitePool, query: &ContactQuery) -> Result<Vec<Contact>, ServiceError> {
        Ok(Contact::find_all(pool, query).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Contact, ServiceError> {
        Contact::find_by_id(pool, id)
            .await?
            .ok_or(ServiceError::NotFound("contact"))
    }

    pub async fn create(pool: &SqlitePool, payload: ContactPayload) -> Result<Contact, ServiceError> {
        let payload = payload.normalized();
        payload.validate()?;
        Self::ensure_email_free(pool, payload.email.as_deref(), None).await?;

        let mut tx = pool.begin().await?;
        let contact = Contact::create(&mut *tx, &payload, Uuid::new_v4())
            .await
            .map_err(map_unique)?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Contact,
            contact.id,
            ActivityAction::Created,
            Some(format!("Contact {} created", contact.name)),
        )
        .await?;
        tx.commit().await?;

        info!(contact_id = %contact.id, "Contact created");
        Ok(contact)
    }

    pub async fn update(pool: &SqlitePool, id: Uuid, payload: ContactPayload) -> Result<Contact, ServiceError> {
        let payload = payload.normalized();
        payload.validate()?;
        Self::ensure_email_free(pool, payload.email.as_deref(), Some(id)).await?;

        let mut tx = pool.begin().await?;
        let contact = Contact::update(&mut *tx, id, &payload)
            .await
            .map_err(map_unique)?
            .ok_or(ServiceError::NotFound("contact"))?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Contact,
            contact.id,
            ActivityAction::Updated,
            Some(format!("Contact {} updated", contact.name)),
        )
        .await?;
        tx.commit().await?;

        Ok(contact)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), ServiceError> {
        let contact = Self::get(pool, id).await?;
        if Contact::count_documents(pool, id).await? > 0 {
            return Err(ServiceError::conflict(
                "contact",
                "contact still has invoices or estimates",
            ));
        }

        let mut tx = pool.begin().await?;
        Contact::delete(&mut *tx, id).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Contact,
            id,
            ActivityAction::Deleted,
            Some(format!("Contact {} deleted", contact.name)),
        )
        .await?;
        tx.commit().await?;

        info!(contact_id = %id, "Contact deleted");
        Ok(())
    }

    async fn ensure_email_free(
        pool: &SqlitePool,
        email: Option<&str>,
        own_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let Some(email) = email else {
            return Ok(());
        };
        match Contact::find_by_email(pool, email).await? {
            Some(existing) if Some(existing.id) != own_id => Err(ServiceError::conflict(
                "email",
                "a contact with this email already exists",
            )),
            _ => Ok(()),
        }
    }
}

/// Turns a race on the unique index into the same 409 the pre-check gives.
fn map_unique(err: sqlx::Error) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::conflict("email", "a contact with this email already exists")
    } else {
        ServiceError::Database(err)
    }
}
