//! Pieces shared by the invoice and estimate services.

use chrono::{NaiveDate, Utc};
use db::models::{contact::Contact, line_item::LineItemInput, product::Product};
use sqlx::SqlitePool;
use utils::validation::FieldErrors;
use uuid::Uuid;

use super::error::ServiceError;

pub const DEFAULT_CURRENCY: &str = "EUR";

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Rejects an end date (due date, validity) before the resolved issue date.
pub fn check_date_order(field: &str, issue_date: NaiveDate, end: Option<NaiveDate>) -> Result<(), ServiceError> {
    match end {
        Some(end) if end < issue_date => Err(ServiceError::invalid(field, "must not be before the issue date")),
        _ => Ok(()),
    }
}

pub fn sequence_exhausted() -> ServiceError {
    ServiceError::conflict("number", "the number sequence for this year is exhausted; enter a number")
}

/// Verifies that the contact and every referenced product exist.
///
/// Runs on the pool, so call it before opening a transaction.
pub async fn check_references(
    pool: &SqlitePool,
    contact_id: Uuid,
    items: &[LineItemInput],
) -> Result<Contact, ServiceError> {
    let mut errors = FieldErrors::new();
    let contact = Contact::find_by_id(pool, contact_id).await?;
    if contact.is_none() {
        errors.add("contact_id", "does not exist");
    }

    for (index, item) in items.iter().enumerate() {
        if let Some(product_id) = item.product_id {
            if Product::find_by_id(pool, product_id).await?.is_none() {
                errors.add(format!("items.{index}.product_id"), "does not exist");
            }
        }
    }

    match contact {
        Some(contact) if errors.is_empty() => Ok(contact),
        _ => Err(ServiceError::Validation(errors)),
    }
}
